//! Visualization block rendering for Folio posts.
//!
//! This crate rewrites fenced visualization blocks in markdown post bodies
//! into HTML fragments before display:
//! - `VizProcessor` scans a post and dispatches each block by kind
//! - `flow` diagrams are rendered server-side to SVG
//! - Rendered diagrams are content addressed and uploaded once to an object store
//! - `chart`, `plotly` and `mermaid` blocks are handed to client-side libraries
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - `kind`: Block kinds (`VizKind`)
//! - `scanner`: Fenced block discovery (`scan`, `Block`)
//! - `flow`: Diagram model and SVG renderer (`DiagramSpec`, `render_svg`)
//! - `cache`: Content hashing and the memo/store pair (`VizKey`, `AssetCache`)
//! - `processor`: `VizProcessor`, dispatch and single-pass replacement
//!
//! # Example
//!
//! ```
//! use folio_viz::VizProcessor;
//!
//! let processor = VizProcessor::new();
//! let html = processor.process("Intro\n```mermaid\ngraph TD; A-->B;\n```\n");
//! assert_eq!(html, "Intro\n<div class=\"mermaid\">graph TD; A-->B;</div>\n");
//! ```

mod cache;
mod consts;
mod error;
mod flow;
mod html;
mod kind;
mod processor;
mod scanner;

pub use cache::{AssetBody, AssetCache, RenderedAsset, VizKey};
pub use consts::DEFAULT_KEY_PREFIX;
pub use error::VizError;
pub use flow::{Canvas, DiagramSpec, Edge, Node, NodeData, Position, render_svg};
pub use kind::VizKind;
pub use processor::{ProcessStats, Processed, VizProcessor};
pub use scanner::{Block, scan};
