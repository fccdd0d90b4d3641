
use std::fmt::Display;
use std::io::{self, Write};

const RULE_WIDTH: usize = 70;

/// Operator-facing report writer. Output errors (closed pipe) are ignored.
pub struct Console<W: Write> {
    out: W,
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn line(&mut self, text: impl Display) {
        let _ = writeln!(self.out, "{}", text);
    }

    pub fn blank(&mut self) {
        let _ = writeln!(self.out);
    }

    pub fn rule(&mut self) {
        self.line("=".repeat(RULE_WIDTH));
    }

    pub fn banner(&mut self, title: &str) {
        self.rule();
        self.line(format!("  {}", title));
        self.rule();
    }

    /// Writes `text` without a newline and flushes so it shows before input is read.
    pub fn prompt(&mut self, text: &str) {
        let _ = write!(self.out, "{}", text);
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_layout() {
        let mut console = Console::new(Vec::new());
        console.banner("CHECK");
        console.prompt("ok? ");
        let text = String::from_utf8(console.into_inner()).unwrap();
        let rule = "=".repeat(70);
        assert_eq!(text, format!("{rule}\n  CHECK\n{rule}\nok? "));
    }
}
