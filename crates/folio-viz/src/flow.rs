//! Flow diagram model and SVG renderer.
//!
//! A flow block describes boxes at absolute positions connected by directed
//! edges (the React Flow JSON shape). [`render_svg`] lays the boxes out on a
//! canvas sized to their bounding box and draws edges underneath the nodes.
//!
//! Rendering is pure: equal specs always produce byte-identical SVG, which is
//! what makes content-addressed caching of the output sound.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::VizError;
use crate::html::escape_html;

/// Node box width.
pub const NODE_WIDTH: f64 = 120.0;
/// Node box height.
pub const NODE_HEIGHT: f64 = 40.0;
/// Blank margin around the bounding box.
pub const PADDING: f64 = 80.0;
/// Minimum canvas width.
pub const MIN_WIDTH: f64 = 300.0;

const EDGE_COLOR: &str = "#89b4fa";
const NODE_FILL: &str = "#313244";
const NODE_STROKE: &str = "#585b70";
const LABEL_COLOR: &str = "#cdd6f4";

/// SVG returned for a diagram without nodes.
pub const EMPTY_DIAGRAM_SVG: &str = r#"<svg width="200" height="100" xmlns="http://www.w3.org/2000/svg"><text x="10" y="50" fill="gray">No nodes</text></svg>"#;

/// Parsed `flow` block payload.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DiagramSpec {
    /// Nodes in drawing order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Directed edges between node ids.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A diagram box.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Node {
    /// Identifier referenced by edges.
    pub id: String,
    /// Top-left corner in diagram coordinates.
    pub position: Position,
    /// Display data.
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    /// Text drawn inside the box: the label, or the id when the label is missing or empty.
    #[must_use]
    pub fn label(&self) -> &str {
        self.data
            .label
            .as_deref()
            .filter(|label| !label.is_empty())
            .unwrap_or(&self.id)
    }
}

/// Diagram coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Node display data.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub label: Option<String>,
}

/// A directed connector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Draw with a dashed stroke.
    #[serde(default)]
    pub animated: bool,
}

impl DiagramSpec {
    /// Parse a `flow` payload.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Edges whose source or target id matches no node.
    ///
    /// These are skipped by [`render_svg`].
    #[must_use]
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        let index = self.node_index();
        self.edges
            .iter()
            .filter(|e| {
                !index.contains_key(e.source.as_str()) || !index.contains_key(e.target.as_str())
            })
            .collect()
    }

    /// Reject diagrams whose canvas cannot be expressed in finite coordinates.
    ///
    /// Positions far apart (e.g. `1e308` and `-1e308`) overflow the bounding box.
    pub fn check_bounds(&self) -> Result<(), VizError> {
        match Canvas::fit(&self.nodes) {
            Some(canvas) if !canvas.is_finite() => Err(VizError::CanvasOverflow {
                width: canvas.width,
                height: canvas.height,
            }),
            _ => Ok(()),
        }
    }

    /// Map node ids to nodes. The first node wins on duplicate ids.
    fn node_index(&self) -> HashMap<&str, &Node> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            index.entry(node.id.as_str()).or_insert(node);
        }
        index
    }
}

/// Canvas size and the translation applied to node positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Canvas {
    /// Fit a canvas around `nodes`. Returns None when there are no nodes.
    #[must_use]
    pub fn fit(nodes: &[Node]) -> Option<Self> {
        let first = nodes.first()?;
        let (mut min_x, mut min_y) = (first.position.x, first.position.y);
        let (mut max_x, mut max_y) = (min_x, min_y);
        for node in &nodes[1..] {
            min_x = min_x.min(node.position.x);
            min_y = min_y.min(node.position.y);
            max_x = max_x.max(node.position.x);
            max_y = max_y.max(node.position.y);
        }

        Some(Self {
            width: MIN_WIDTH.max(max_x - min_x + NODE_WIDTH + PADDING * 2.0),
            height: max_y - min_y + NODE_HEIGHT + PADDING * 2.0,
            offset_x: PADDING - min_x,
            offset_y: PADDING - min_y,
        })
    }

    /// Whether every dimension and offset is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [self.width, self.height, self.offset_x, self.offset_y]
            .into_iter()
            .all(f64::is_finite)
    }

    fn translate(&self, position: Position) -> (f64, f64) {
        (position.x + self.offset_x, position.y + self.offset_y)
    }
}

/// Render a diagram to a standalone SVG document.
///
/// Edges are drawn before nodes so boxes sit on top of connector lines.
/// Edges referencing unknown node ids are skipped. Callers rendering untrusted
/// payloads should run [`DiagramSpec::check_bounds`] first.
#[must_use]
pub fn render_svg(spec: &DiagramSpec) -> String {
    let Some(canvas) = Canvas::fit(&spec.nodes) else {
        return EMPTY_DIAGRAM_SVG.to_owned();
    };
    let index = spec.node_index();

    let mut svg = format!(
        r#"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg">"#,
        w = canvas.width,
        h = canvas.height,
    );
    svg.push_str(&format!(
        r#"<defs><marker id="arrow" markerWidth="10" markerHeight="10" refX="9" refY="3" orient="auto"><path d="M0,0 L0,6 L9,3 z" fill="{EDGE_COLOR}"/></marker></defs>"#
    ));

    for edge in &spec.edges {
        let (Some(source), Some(target)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            continue;
        };
        let (sx, sy) = canvas.translate(source.position);
        let (tx, ty) = canvas.translate(target.position);
        let dash = if edge.animated {
            r#" stroke-dasharray="5,5""#
        } else {
            ""
        };
        svg.push_str(&format!(
            r#"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{EDGE_COLOR}" stroke-width="2"{dash} marker-end="url(#arrow)"/>"#,
            x1 = sx + NODE_WIDTH / 2.0,
            y1 = sy + NODE_HEIGHT,
            x2 = tx + NODE_WIDTH / 2.0,
            y2 = ty,
        ));
    }

    for node in &spec.nodes {
        let (x, y) = canvas.translate(node.position);
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{NODE_WIDTH}" height="{NODE_HEIGHT}" rx="8" fill="{NODE_FILL}" stroke="{NODE_STROKE}" stroke-width="1"/>"#
        ));
        svg.push_str(&format!(
            r#"<text x="{tx}" y="{ty}" text-anchor="middle" fill="{LABEL_COLOR}" font-size="14" font-family="system-ui, sans-serif">{label}</text>"#,
            tx = x + NODE_WIDTH / 2.0,
            ty = y + NODE_HEIGHT / 2.0 + 5.0,
            label = escape_html(node.label()),
        ));
    }

    svg.push_str("</svg>");
    svg
}
