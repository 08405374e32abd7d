//! Visualization block processor.
//!
//! This module provides [`VizProcessor`], which rewrites every recognized
//! fenced block in a post into an HTML fragment.

use std::collections::HashMap;
use std::sync::Arc;

use folio_cache::CacheBucket;
use folio_storage::AssetStore;

use crate::cache::{AssetBody, AssetCache, RenderedAsset, VizKey};
use crate::consts::{MEDIA_CLASSES, SVG_CONTENT_TYPE};
use crate::error::VizError;
use crate::flow::{DiagramSpec, render_svg};
use crate::html::{encode_component, escape_html};
use crate::kind::VizKind;
use crate::scanner::{self, Block};

/// Counters collected while processing one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    /// Recognized blocks, duplicates included.
    pub blocks: usize,
    /// Distinct blocks replaced by an error marker.
    pub errors: usize,
    /// Flow diagrams served from the memo table or the store.
    pub remote: usize,
    /// Flow diagrams embedded inline because no store accepted them.
    pub inlined: usize,
}

/// Result of [`VizProcessor::process_with_stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub content: String,
    pub stats: ProcessStats,
}

/// Rewrites `chart`, `flow`, `plotly` and `mermaid` blocks into HTML.
///
/// - `mermaid` and `plotly` are wrapped for client-side rendering.
/// - `chart` becomes a client-side canvas, or an image when a pre-rendered
///   URL was remembered for the payload.
/// - `flow` is rendered to SVG, stored once per payload, and referenced by URL.
///   When the store is missing or fails, the SVG is embedded inline.
///
/// Processing never fails: a malformed block becomes an inline error marker
/// and the rest of the document is unaffected.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use folio_storage::FsAssetStore;
/// use folio_viz::VizProcessor;
///
/// let store = FsAssetStore::new("public/assets".into()).with_public_url("/assets");
/// let processor = VizProcessor::new().with_store(Arc::new(store));
/// let html = processor.process("```mermaid\ngraph TD; A-->B;\n```");
/// ```
#[derive(Default)]
pub struct VizProcessor {
    assets: AssetCache,
}

impl VizProcessor {
    /// Create a processor with an empty in-memory memo table and no store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish flow diagrams to `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.assets = self.assets.with_store(store);
        self
    }

    /// Replace the memo table.
    ///
    /// Passing a bucket shared with other processors lets them reuse each
    /// other's uploads.
    #[must_use]
    pub fn with_memo(mut self, memo: Box<dyn CacheBucket>) -> Self {
        self.assets = self.assets.with_memo(memo);
        self
    }

    /// Set the object key prefix for stored diagrams.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.assets = self.assets.key_prefix(prefix);
        self
    }

    /// The asset cache, for seeding pre-rendered chart images.
    #[must_use]
    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    /// Transform a document.
    #[must_use]
    pub fn process(&self, document: &str) -> String {
        self.process_with_stats(document).content
    }

    /// Transform a document and report what happened to its blocks.
    #[must_use]
    pub fn process_with_stats(&self, document: &str) -> Processed {
        let blocks = scanner::scan(document);
        let mut stats = ProcessStats {
            blocks: blocks.len(),
            ..ProcessStats::default()
        };
        if blocks.is_empty() {
            return Processed {
                content: document.to_owned(),
                stats,
            };
        }

        let mut replacements = Replacements::with_capacity(blocks.len());
        for block in &blocks {
            // Replacement is a function of the block text, so duplicates reuse it.
            if replacements.contains(block.raw) {
                continue;
            }
            match self.render_block(block, &mut stats) {
                Ok(html) => replacements.add(block.raw, html),
                Err(e) => {
                    tracing::warn!(kind = %block.kind, error = %e, "Failed to render visualization block");
                    stats.errors += 1;
                    replacements.add_error(block.raw, block.kind, &e.to_string());
                }
            }
        }

        Processed {
            content: replacements.apply(document),
            stats,
        }
    }

    fn render_block(&self, block: &Block<'_>, stats: &mut ProcessStats) -> Result<String, VizError> {
        let payload = block.trimmed_payload();
        match block.kind {
            VizKind::Mermaid => Ok(format!(r#"<div class="mermaid">{payload}</div>"#)),
            VizKind::Plotly => {
                let config = compact_json(payload)?;
                Ok(format!(
                    r#"<div class="plotly-container" style="width: 100%; height: 400px;" data-config="{}"></div>"#,
                    encode_component(&config)
                ))
            }
            VizKind::Chart => self.render_chart(payload),
            VizKind::Flow => self.render_flow(payload, stats),
        }
    }

    fn render_chart(&self, payload: &str) -> Result<String, VizError> {
        let config = compact_json(payload)?;
        if let Some(asset) = self.assets.get(&VizKey::new(VizKind::Chart, payload)) {
            return Ok(asset.to_html());
        }
        Ok(format!(
            r#"<canvas class="chart-js {MEDIA_CLASSES}" data-config="{}"></canvas>"#,
            encode_component(&config)
        ))
    }

    fn render_flow(&self, payload: &str, stats: &mut ProcessStats) -> Result<String, VizError> {
        let key = VizKey::new(VizKind::Flow, payload);
        if let Some(asset) = self.assets.get(&key) {
            stats.remote += 1;
            return Ok(asset.to_html());
        }

        let spec = DiagramSpec::from_json(payload).map_err(VizError::InvalidDiagram)?;
        spec.check_bounds()?;
        let dangling = spec.dangling_edges().len();
        if dangling > 0 {
            tracing::debug!(count = dangling, "Skipping edges with unknown endpoints");
        }
        let svg = render_svg(&spec);

        let asset = match self.assets.put(&key, svg.clone().into_bytes(), SVG_CONTENT_TYPE) {
            Ok(asset) => {
                stats.remote += 1;
                asset
            }
            Err(e) => {
                if self.assets.has_store() {
                    tracing::warn!(error = %e, "Failed to store flow diagram, embedding inline");
                } else {
                    tracing::debug!("No asset store configured, embedding flow diagram inline");
                }
                stats.inlined += 1;
                RenderedAsset {
                    hash: key.compute_hash(),
                    kind: VizKind::Flow,
                    body: AssetBody::Inline(svg),
                }
            }
        };
        Ok(asset.to_html())
    }
}

/// Parse a JSON payload and re-serialize it compactly. Object keys keep their source order.
fn compact_json(payload: &str) -> Result<String, VizError> {
    let value: serde_json::Value = serde_json::from_str(payload).map_err(VizError::InvalidJson)?;
    Ok(value.to_string())
}

/// Collects block replacements for single-pass application.
///
/// Entries are keyed by the full fenced text of a block, so every occurrence
/// of an identical block receives the same replacement.
struct Replacements {
    map: HashMap<String, String>,
}

impl Replacements {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
        }
    }

    fn contains(&self, raw: &str) -> bool {
        self.map.contains_key(raw)
    }

    fn add(&mut self, raw: &str, content: String) {
        self.map.insert(raw.to_owned(), content);
    }

    /// Add an inline error marker for a block.
    fn add_error(&mut self, raw: &str, kind: VizKind, error_msg: &str) {
        let marker = format!(
            r#"<div class="viz-error text-red-400">Error rendering {kind} visualization: {}</div>"#,
            escape_html(error_msg)
        );
        self.add(raw, marker);
    }

    /// Rescan `document` once, substituting every block with an entry.
    fn apply(&self, document: &str) -> String {
        if self.map.is_empty() {
            return document.to_owned();
        }
        scanner::rewrite(document, |block| self.map.get(block.raw).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use folio_cache::{Cache, MemoryCache, NullCache};
    use folio_storage::{MockAssetStore, StorageErrorKind};
    use pretty_assertions::assert_eq;

    use super::*;

    const START_FLOW: &str =
        r#"{"nodes":[{"id":"1","position":{"x":0,"y":0},"data":{"label":"Start"}}],"edges":[]}"#;

    fn fence(kind: &str, payload: &str) -> String {
        format!("```{kind}\n{payload}\n```")
    }

    fn flow_url(payload: &str) -> String {
        format!(
            "https://assets.test/portfolio/viz/flow-{}.svg",
            VizKey::new(VizKind::Flow, payload).compute_hash()
        )
    }

    #[test]
    fn test_processor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VizProcessor>();
    }

    #[test]
    fn test_no_blocks_is_unchanged() {
        let doc = "# Post\n\nSome prose.\n\n```rust\nfn main() {}\n```\n";

        let processed = VizProcessor::new().process_with_stats(doc);

        assert_eq!(processed.content, doc);
        assert_eq!(processed.stats, ProcessStats::default());
    }

    #[test]
    fn test_mermaid_passthrough() {
        let doc = format!("Before\n{}\nAfter", fence("mermaid", "graph TD; A-->B;"));

        let result = VizProcessor::new().process(&doc);

        assert_eq!(
            result,
            "Before\n<div class=\"mermaid\">graph TD; A-->B;</div>\nAfter"
        );
    }

    #[test]
    fn test_mermaid_is_not_parsed() {
        let doc = fence("mermaid", "{ not json");

        let result = VizProcessor::new().process(&doc);

        assert_eq!(result, r#"<div class="mermaid">{ not json</div>"#);
    }

    #[test]
    fn test_plotly_config_is_compacted_and_encoded() {
        let doc = fence("plotly", "{ \"data\": [ {\"x\": [1, 2]} ] }");

        let result = VizProcessor::new().process(&doc);

        assert_eq!(
            result,
            r#"<div class="plotly-container" style="width: 100%; height: 400px;" data-config="%7B%22data%22%3A%5B%7B%22x%22%3A%5B1%2C2%5D%7D%5D%7D"></div>"#
        );
    }

    #[test]
    fn test_chart_renders_client_side_canvas() {
        let doc = fence("chart", r#"{"type": "bar"}"#);

        let result = VizProcessor::new().process(&doc);

        assert_eq!(
            result,
            r#"<canvas class="chart-js w-full h-auto max-w-[600px] mx-auto" data-config="%7B%22type%22%3A%22bar%22%7D"></canvas>"#
        );
    }

    #[test]
    fn test_chart_uses_remembered_image() {
        let payload = r#"{"type": "line"}"#;
        let processor = VizProcessor::new();
        processor
            .assets()
            .remember(&VizKey::new(VizKind::Chart, payload), "https://cdn.test/line.png");

        let result = processor.process(&fence("chart", payload));

        assert_eq!(
            result,
            r#"<img src="https://cdn.test/line.png" alt="Chart Visualization" class="w-full h-auto max-w-[600px] mx-auto" loading="lazy" />"#
        );
    }

    #[test]
    fn test_invalid_chart_is_error_marker() {
        let result = VizProcessor::new().process(&fence("chart", "{type: bar"));

        assert!(result.starts_with(
            r#"<div class="viz-error text-red-400">Error rendering chart visualization: invalid JSON:"#
        ));
        assert!(result.ends_with("</div>"));
    }

    #[test]
    fn test_invalid_flow_is_error_marker() {
        let result = VizProcessor::new().process(&fence("flow", r#"{"nodes": "nope"}"#));

        assert!(result.contains("Error rendering flow visualization: invalid diagram:"));
    }

    #[test]
    fn test_error_reason_is_escaped() {
        let result = VizProcessor::new().process(&fence("plotly", "<script>"));

        assert!(!result.contains("<script>"));
        assert!(result.contains("viz-error"));
    }

    #[test]
    fn test_malformed_block_does_not_affect_others() {
        let store = Arc::new(MockAssetStore::new());
        let processor = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));
        let doc = format!(
            "intro\n{}\nmiddle\n{}\noutro",
            fence("flow", START_FLOW),
            fence("chart", "not json at all")
        );

        let processed = processor.process_with_stats(&doc);

        let expected_img = format!(
            r#"<img src="{}" alt="Flow Diagram" class="w-full h-auto max-w-[600px] mx-auto" loading="lazy" />"#,
            flow_url(START_FLOW)
        );
        assert!(processed.content.starts_with(&format!("intro\n{expected_img}\nmiddle\n")));
        assert!(processed.content.contains("Error rendering chart visualization"));
        assert!(processed.content.ends_with("</div>\noutro"));
        assert_eq!(processed.stats.errors, 1);
        assert_eq!(processed.stats.remote, 1);
        assert_eq!(store.put_count(), 1);
    }

    #[test]
    fn test_flow_cache_convergence() {
        let store = Arc::new(MockAssetStore::new());
        let processor = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));
        let doc = fence("flow", START_FLOW);

        let first = processor.process(&doc);
        let second = processor.process(&doc);

        assert_eq!(first, second);
        assert!(first.contains(&flow_url(START_FLOW)));
        assert_eq!(store.put_count(), 1);
        // The second render is served from the memo table.
        assert_eq!(store.head_count(), 1);
    }

    #[test]
    fn test_flow_convergence_across_processors() {
        // Two processes share the store but not the memo table.
        let store = Arc::new(MockAssetStore::new());
        let first = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));
        let second = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));
        let doc = fence("flow", START_FLOW);

        let a = first.process(&doc);
        let b = second.process(&doc);

        assert_eq!(a, b);
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.head_count(), 2);
    }

    #[test]
    fn test_shared_memo_skips_store() {
        let memo = MemoryCache::new();
        let store = Arc::new(MockAssetStore::new());
        let first = VizProcessor::new()
            .with_store(Arc::<MockAssetStore>::clone(&store))
            .with_memo(memo.bucket("viz"));
        let second = VizProcessor::new()
            .with_store(Arc::<MockAssetStore>::clone(&store))
            .with_memo(memo.bucket("viz"));
        let doc = fence("flow", START_FLOW);

        let a = first.process(&doc);
        let b = second.process(&doc);

        assert_eq!(a, b);
        assert_eq!(store.head_count(), 1);
        assert_eq!(store.put_count(), 1);
    }

    #[test]
    fn test_disabled_memo_relies_on_existence_check() {
        let store = Arc::new(MockAssetStore::new());
        let processor = VizProcessor::new()
            .with_store(Arc::<MockAssetStore>::clone(&store))
            .with_memo(NullCache.bucket("viz"));
        let doc = fence("flow", START_FLOW);

        let first = processor.process(&doc);
        let second = processor.process(&doc);

        assert_eq!(first, second);
        assert_eq!(store.head_count(), 2);
        assert_eq!(store.put_count(), 1);
    }

    #[test]
    fn test_flow_stored_svg_is_rendering() {
        let store = Arc::new(MockAssetStore::new());
        let processor = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));

        let result = processor.process(&fence("flow", START_FLOW));

        assert!(result.starts_with("<img "));
        let key = format!(
            "portfolio/viz/flow-{}.svg",
            VizKey::new(VizKind::Flow, START_FLOW).compute_hash()
        );
        let spec = DiagramSpec::from_json(START_FLOW).unwrap();
        assert_eq!(store.object(&key), Some(render_svg(&spec).into_bytes()));
        assert_eq!(store.content_type(&key).as_deref(), Some("image/svg+xml"));
    }

    #[test]
    fn test_flow_without_store_is_inline() {
        let processed = VizProcessor::new().process_with_stats(&fence("flow", START_FLOW));

        let spec = DiagramSpec::from_json(START_FLOW).unwrap();
        assert_eq!(processed.content, render_svg(&spec));
        assert_eq!(processed.stats.inlined, 1);
    }

    #[test]
    fn test_upload_failure_falls_back_inline() {
        let store = Arc::new(MockAssetStore::new().failing_puts(StorageErrorKind::Unavailable));
        let processor = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));
        let doc = fence("flow", START_FLOW);

        let first = processor.process(&doc);
        let second = processor.process(&doc);

        assert!(first.starts_with("<svg "));
        assert!(first.contains(">Start</text>"));
        assert!(!first.contains("viz-error"));
        // Failures are not memoized, so the upload is retried.
        assert_eq!(first, second);
        assert_eq!(store.put_count(), 2);
    }

    #[test]
    fn test_existence_check_failure_falls_back_inline() {
        let store = Arc::new(MockAssetStore::new().failing_heads(StorageErrorKind::PermissionDenied));
        let processor = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));

        let result = processor.process(&fence("flow", START_FLOW));

        assert!(result.starts_with("<svg "));
        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_duplicate_blocks_rendered_once() {
        let store = Arc::new(MockAssetStore::new());
        let processor = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));
        let block = fence("flow", START_FLOW);
        let doc = format!("{block}\n\ntext\n\n{block}");

        let processed = processor.process_with_stats(&doc);

        let img = format!(
            r#"<img src="{}" alt="Flow Diagram" class="w-full h-auto max-w-[600px] mx-auto" loading="lazy" />"#,
            flow_url(START_FLOW)
        );
        assert_eq!(processed.content, format!("{img}\n\ntext\n\n{img}"));
        assert_eq!(processed.stats.blocks, 2);
        assert_eq!(store.head_count(), 1);
    }

    #[test]
    fn test_shared_memo_is_scoped_by_key_prefix() {
        let memo = MemoryCache::new();
        let store = Arc::new(MockAssetStore::new());
        let blog = VizProcessor::new()
            .with_store(Arc::<MockAssetStore>::clone(&store))
            .with_memo(memo.bucket("viz"))
            .key_prefix("a");
        let notes = VizProcessor::new()
            .with_store(Arc::<MockAssetStore>::clone(&store))
            .with_memo(memo.bucket("viz"))
            .key_prefix("b");
        let doc = fence("flow", START_FLOW);

        let a = blog.process(&doc);
        let b = notes.process(&doc);

        let hash = VizKey::new(VizKind::Flow, START_FLOW).compute_hash();
        assert!(a.contains(&format!("https://assets.test/a/flow-{hash}.svg")));
        assert!(b.contains(&format!("https://assets.test/b/flow-{hash}.svg")));
        assert_eq!(store.put_count(), 2);
    }

    #[test]
    fn test_plotly_keeps_author_key_order() {
        let result = VizProcessor::new().process(&fence("plotly", r#"{"layout": 1, "data": 2}"#));

        assert_eq!(
            result,
            r#"<div class="plotly-container" style="width: 100%; height: 400px;" data-config="%7B%22layout%22%3A1%2C%22data%22%3A2%7D"></div>"#
        );
    }

    #[test]
    fn test_overflowing_flow_is_error_marker() {
        let store = Arc::new(MockAssetStore::new());
        let processor = VizProcessor::new().with_store(Arc::<MockAssetStore>::clone(&store));
        let payload = r#"{"nodes":[{"id":"a","position":{"x":1e308,"y":0}},{"id":"b","position":{"x":-1e308,"y":0}}],"edges":[]}"#;

        let processed = processor.process_with_stats(&fence("flow", payload));

        assert!(
            processed
                .content
                .starts_with("<div class=\"viz-error text-red-400\">Error rendering flow visualization: diagram canvas is too large")
        );
        assert!(!processed.content.contains("<svg"));
        assert_eq!(processed.stats.errors, 1);
        assert_eq!(store.put_count(), 0);
    }

    #[test]
    fn test_custom_key_prefix() {
        let store = Arc::new(MockAssetStore::new().with_public_url(Some("https://cdn.test/")));
        let processor = VizProcessor::new()
            .with_store(store)
            .key_prefix("blog/viz");

        let result = processor.process(&fence("flow", START_FLOW));

        let hash = VizKey::new(VizKind::Flow, START_FLOW).compute_hash();
        assert!(result.contains(&format!(r#"src="https://cdn.test/blog/viz/flow-{hash}.svg""#)));
    }

    #[test]
    fn test_mixed_document() {
        let doc = format!(
            "# Title\n\n{}\n\n```python\nprint(1)\n```\n\n{}\n",
            fence("MERMAID", "graph LR; X-->Y;"),
            fence("plotly", "[]")
        );

        let result = VizProcessor::new().process(&doc);

        assert_eq!(
            result,
            concat!(
                "# Title\n\n",
                "<div class=\"mermaid\">graph LR; X-->Y;</div>",
                "\n\n```python\nprint(1)\n```\n\n",
                "<div class=\"plotly-container\" style=\"width: 100%; height: 400px;\" data-config=\"%5B%5D\"></div>",
                "\n"
            )
        );
    }
}
