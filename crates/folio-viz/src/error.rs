//! Per-block rendering errors.

/// Failure to render a single visualization block.
///
/// These never abort document processing. Each one becomes an inline error
/// marker in place of the offending block.
#[derive(Debug, thiserror::Error)]
pub enum VizError {
    /// `chart` or `plotly` payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// `flow` payload does not describe a diagram.
    #[error("invalid diagram: {0}")]
    InvalidDiagram(#[source] serde_json::Error),

    /// `flow` node positions are too far apart to lay out.
    #[error("diagram canvas is too large ({width} x {height})")]
    CanvasOverflow { width: f64, height: f64 },
}
