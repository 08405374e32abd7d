//! Internal constants for visualization rendering.

/// Default object-store prefix for rendered visualizations.
pub const DEFAULT_KEY_PREFIX: &str = "portfolio/viz";

/// Content type of rendered flow diagrams.
pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// CSS classes shared by server-rendered images and client-side chart canvases.
pub const MEDIA_CLASSES: &str = "w-full h-auto max-w-[600px] mx-auto";
