//! Terminal capability detection and utilities

use owo_colors::{OwoColorize, colors::css};
use stressspec::SeverityLevel;

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Check if terminal is narrow (< 60 columns)
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < 60)
}

/// Shorten `text` to at most `width` characters, marking the cut with `...`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (amber)
    fn warning(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
    /// Color by severity, from blue (low) to red (blocker)
    fn severity(&self, severity: SeverityLevel) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        if supports_color() {
            self.fg::<css::Green>().to_string()
        } else {
            self.to_string()
        }
    }

    fn warning(&self) -> String {
        if supports_color() {
            self.fg::<css::Orange>().to_string()
        } else {
            self.to_string()
        }
    }

    fn dim(&self) -> String {
        if supports_color() {
            self.dimmed().to_string()
        } else {
            self.to_string()
        }
    }

    fn severity(&self, severity: SeverityLevel) -> String {
        if !supports_color() {
            return self.to_string();
        }
        match severity {
            SeverityLevel::Low => self.fg::<css::LightBlue>().to_string(),
            SeverityLevel::Medium => self.fg::<css::Gold>().to_string(),
            SeverityLevel::High => self.fg::<css::Orange>().to_string(),
            SeverityLevel::Critical => self.fg::<css::Red>().to_string(),
            SeverityLevel::Blocker => self.fg::<css::Red>().bold().to_string(),
        }
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }

    fn severity(&self, severity: SeverityLevel) -> String {
        self.as_str().severity(severity)
    }
}
