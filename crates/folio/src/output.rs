//! Terminal reporting for CLI commands.

use std::path::Path;

use console::{Style, Term};
use folio_viz::ProcessStats;

/// Status reporter.
///
/// Writes to stderr so stdout stays free for the transformed document.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    fn line(&self, style: Option<&Style>, msg: &str) {
        let text = match style {
            Some(style) => style.apply_to(msg).to_string(),
            None => msg.to_owned(),
        };
        let _ = self.term.write_line(&text);
    }

    /// Plain status line.
    pub(crate) fn info(&self, msg: &str) {
        self.line(None, msg);
    }

    /// Fatal error line (red).
    pub(crate) fn error(&self, msg: &str) {
        self.line(Some(&self.red), msg);
    }

    /// Report how the blocks of `file` were rendered.
    ///
    /// Failed blocks are reported in yellow; the document itself is still written.
    pub(crate) fn render_summary(&self, file: &Path, stats: &ProcessStats) {
        if stats.errors > 0 {
            self.line(
                Some(&self.yellow),
                &format!(
                    "{} block(s) failed to render, see inline error markers",
                    stats.errors
                ),
            );
        }
        self.line(
            Some(&self.green),
            &format!(
                "Rendered {} block(s) from {} ({} stored, {} inline)",
                stats.blocks,
                file.display(),
                stats.remote,
                stats.inlined
            ),
        );
    }
}
