//! Fenced visualization block scanner.
//!
//! Finds fenced blocks tagged with a [`VizKind`] in raw post text. The text is
//! not parsed as markdown: a block is three backticks, an optional run of
//! whitespace, the kind tag, a line break, the payload, and the closing three
//! backticks. Fences with other tags are ignored.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::kind::VizKind;

/// Fenced block with a visualization tag (case-insensitive).
static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)```\s*(chart|flow|plotly|mermaid)\s*[\r\n]+([\s\S]*?)```").unwrap()
});

/// A located visualization block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    /// Block kind from the fence tag.
    pub kind: VizKind,
    /// Full fenced text, delimiters included.
    pub raw: &'a str,
    /// Text between the fence line and the closing delimiter, untrimmed.
    pub payload: &'a str,
    /// Byte range of `raw` within the document.
    pub span: Range<usize>,
}

impl Block<'_> {
    /// Payload with surrounding whitespace removed.
    ///
    /// This is the exact text that is hashed and handed to handlers.
    #[must_use]
    pub fn trimmed_payload(&self) -> &str {
        self.payload.trim()
    }
}

/// Find all visualization blocks in document order.
///
/// Blocks never overlap.
#[must_use]
pub fn scan(document: &str) -> Vec<Block<'_>> {
    BLOCK_RE
        .captures_iter(document)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = VizKind::parse(caps.get(1)?.as_str())?;
            Some(Block {
                kind,
                raw: whole.as_str(),
                payload: caps.get(2)?.as_str(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Visit every block in `document`, copying the text between blocks verbatim.
///
/// `replace` returns the text to emit for a block, or `None` to keep the
/// block unchanged.
pub(crate) fn rewrite<'r, F>(document: &str, mut replace: F) -> String
where
    F: FnMut(&Block<'_>) -> Option<&'r str>,
{
    let mut result = String::with_capacity(document.len());
    let mut last = 0;

    for block in scan(document) {
        result.push_str(&document[last..block.span.start]);
        match replace(&block) {
            Some(replacement) => result.push_str(replacement),
            None => result.push_str(block.raw),
        }
        last = block.span.end;
    }

    result.push_str(&document[last..]);
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_scan_single_block() {
        let doc = "Intro\n```mermaid\ngraph TD; A-->B;\n```\nOutro";

        let blocks = scan(doc);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, VizKind::Mermaid);
        assert_eq!(blocks[0].raw, "```mermaid\ngraph TD; A-->B;\n```");
        assert_eq!(blocks[0].trimmed_payload(), "graph TD; A-->B;");
        assert_eq!(&doc[blocks[0].span.clone()], blocks[0].raw);
    }

    #[test]
    fn test_scan_document_order() {
        let doc = "```flow\n{}\n```\ntext\n```chart\n{}\n```\n```plotly\n{}\n```";

        let kinds: Vec<_> = scan(doc).into_iter().map(|b| b.kind).collect();

        assert_eq!(kinds, vec![VizKind::Flow, VizKind::Chart, VizKind::Plotly]);
    }

    #[test]
    fn test_scan_case_insensitive_with_whitespace() {
        let doc = "``` FLOW  \r\n{\"nodes\":[]}\r\n```";

        let blocks = scan(doc);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, VizKind::Flow);
        assert_eq!(blocks[0].trimmed_payload(), "{\"nodes\":[]}");
    }

    #[test]
    fn test_scan_ignores_other_fences() {
        let doc = "```rust\nfn main() {}\n```\n```flowchart\nx\n```\n```\nplain\n```";

        assert!(scan(doc).is_empty());
    }

    #[test]
    fn test_scan_requires_line_break_after_tag() {
        assert!(scan("```chart {}```").is_empty());
    }

    #[test]
    fn test_scan_unterminated_block() {
        assert!(scan("```mermaid\ngraph TD;\n").is_empty());
    }

    #[test]
    fn test_scan_payload_stops_at_first_closing_fence() {
        let doc = "```mermaid\nA\n```\nmiddle\n```";

        let blocks = scan(doc);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].trimmed_payload(), "A");
    }

    #[test]
    fn test_rewrite_preserves_surrounding_text() {
        let doc = "before\n```mermaid\nA\n```\nbetween\n```chart\n{}\n```\nafter";

        let result = rewrite(doc, |block| match block.kind {
            VizKind::Mermaid => Some("M"),
            _ => None,
        });

        assert_eq!(result, "before\nM\nbetween\n```chart\n{}\n```\nafter");
    }

    #[test]
    fn test_rewrite_no_blocks() {
        let doc = "# Title\n\nJust prose with `code`.";
        assert_eq!(rewrite(doc, |_| Some("x")), doc);
    }
}
