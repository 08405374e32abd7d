//! Visualization block kinds.
//!
//! A post can embed four kinds of fenced visualization blocks. Only `flow`
//! diagrams are rendered on the server; the rest are handed to client-side
//! libraries.

/// Supported visualization block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VizKind {
    /// Chart.js configuration, rendered client-side.
    Chart,
    /// Node/edge diagram, rendered server-side to SVG.
    Flow,
    /// Plotly figure, rendered client-side.
    Plotly,
    /// Mermaid source, rendered client-side.
    Mermaid,
}

impl VizKind {
    /// Parse a kind from a code fence tag.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Returns None if the tag is not a visualization kind.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        [Self::Chart, Self::Flow, Self::Plotly, Self::Mermaid]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
    }

    /// Canonical lowercase tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Flow => "flow",
            Self::Plotly => "plotly",
            Self::Mermaid => "mermaid",
        }
    }

    /// Whether the payload must be valid JSON.
    ///
    /// Mermaid source is embedded verbatim.
    #[must_use]
    pub fn expects_json(self) -> bool {
        !matches!(self, Self::Mermaid)
    }

    /// Alt text for `<img>` tags referencing a stored rendering.
    #[must_use]
    pub fn alt_text(self) -> &'static str {
        match self {
            Self::Chart => "Chart Visualization",
            Self::Flow => "Flow Diagram",
            Self::Plotly => "Plotly Visualization",
            Self::Mermaid => "Mermaid Diagram",
        }
    }
}

impl std::fmt::Display for VizKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_kinds() {
        let kinds = [
            ("chart", VizKind::Chart),
            ("flow", VizKind::Flow),
            ("plotly", VizKind::Plotly),
            ("mermaid", VizKind::Mermaid),
        ];

        for (tag, expected) in kinds {
            assert_eq!(VizKind::parse(tag), Some(expected), "Failed to parse: {tag}");
            assert_eq!(expected.as_str(), tag);
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(VizKind::parse("FLOW"), Some(VizKind::Flow));
        assert_eq!(VizKind::parse("Mermaid"), Some(VizKind::Mermaid));
        assert_eq!(VizKind::parse("  chart "), Some(VizKind::Chart));
    }

    #[test]
    fn test_parse_unknown() {
        assert!(VizKind::parse("rust").is_none());
        assert!(VizKind::parse("plantuml").is_none());
        assert!(VizKind::parse("").is_none());
        assert!(VizKind::parse("flowchart").is_none());
    }

    #[test]
    fn test_expects_json() {
        assert!(VizKind::Chart.expects_json());
        assert!(VizKind::Flow.expects_json());
        assert!(VizKind::Plotly.expects_json());
        assert!(!VizKind::Mermaid.expects_json());
    }

    #[test]
    fn test_display() {
        assert_eq!(VizKind::Plotly.to_string(), "plotly");
    }
}
