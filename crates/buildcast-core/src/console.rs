//! Build console output.

/// Append-only line sink for the build's console. Implementations must not
/// panic or fail; a line that cannot be written is dropped.
pub trait ConsoleSink: Send + Sync {
    fn println(&self, line: &str);
}

/// Writes console lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn println(&self, line: &str) {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}
