//! Status lines written to stderr.

use owo_colors::OwoColorize;

use super::colors_enabled;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    fn symbol(self) -> &'static str {
        match self {
            Level::Success => "✓",
            Level::Info => "ℹ",
            Level::Warning => "⚠",
            Level::Error => "✗",
        }
    }
}

/// One status line, without the trailing newline.
fn render(level: Level, message: &str, colored: bool) -> String {
    let symbol = level.symbol();
    if !colored {
        return format!("{} {}", symbol, message);
    }
    match level {
        Level::Success => format!("{} {}", symbol.green().bold(), message),
        Level::Info => format!("{} {}", symbol.blue().bold(), message),
        Level::Warning => format!("{} {}", symbol.yellow().bold(), message.yellow()),
        Level::Error => format!("{} {}", symbol.red().bold(), message.red()),
    }
}

fn print(level: Level, message: &str) {
    eprintln!("{}", render(level, message, colors_enabled()));
}

pub fn success(message: &str) {
    print(Level::Success, message);
}

pub fn info(message: &str) {
    print(Level::Info, message);
}

pub fn warning(message: &str) {
    print(Level::Warning, message);
}

pub fn error(message: &str) {
    print(Level::Error, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_status_lines() {
        assert_eq!(render(Level::Success, "Build done", false), "✓ Build done");
        assert_eq!(render(Level::Info, "Watching src", false), "ℹ Watching src");
        assert_eq!(render(Level::Warning, "Slow build", false), "⚠ Slow build");
        assert_eq!(render(Level::Error, "Rebuild failed", false), "✗ Rebuild failed");
    }

    #[test]
    fn test_colored_status_lines() {
        let line = render(Level::Success, "Build done", true);
        assert!(line.starts_with("\u{1b}[1m\u{1b}[32m✓"));
        assert!(line.ends_with("\u{1b}[0m Build done"));

        let line = render(Level::Error, "Rebuild failed", true);
        assert!(line.starts_with("\u{1b}[1m\u{1b}[31m✗"));
        assert!(line.ends_with("\u{1b}[31mRebuild failed\u{1b}[39m"));
    }
}
