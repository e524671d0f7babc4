//! Colored terminal output utilities.

use std::io;

use console::{Style, Term};

/// Terminal output formatter.
///
/// Reports go to stdout and fail on write errors; status messages go to
/// stderr and never fail.
pub(crate) struct Output {
    out: Term,
    term: Term,
    green: Style,
    red: Style,
    dim: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            out: Term::stdout(),
            term: Term::stderr(),
            green: Style::new().green(),
            red: Style::new().red(),
            dim: Style::new().dim(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print a report line.
    pub(crate) fn line(&self, msg: &str) -> io::Result<()> {
        self.out.write_line(msg)
    }

    /// Print a report line followed by dimmed detail.
    pub(crate) fn line_with_detail(&self, msg: &str, detail: &str) -> io::Result<()> {
        self.out
            .write_line(&format!("{msg}  {}", self.dim.apply_to(detail)))
    }

    /// Print a highlighted report heading (cyan bold).
    pub(crate) fn heading(&self, msg: &str) -> io::Result<()> {
        self.out.write_line(&self.cyan_bold.apply_to(msg).to_string())
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }
}
