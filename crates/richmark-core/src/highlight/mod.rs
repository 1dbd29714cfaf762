//! Syntax highlighting for code blocks.
//!
//! A [`CodeHighlighter`] returns coloured byte ranges over a code block's text. The renderer
//! splits the block's run at those ranges, so every piece keeps the block's tag and
//! background. The `syntect` feature provides [`SyntectHighlighter`].

#[cfg(feature = "syntect")]
mod syntect;

#[cfg(feature = "syntect")]
pub use self::syntect::SyntectHighlighter;

use ratatui::style::Color;
use std::ops::Range;

/// One coloured stretch of code, as a byte range of the highlighted text.
#[derive(Clone, Debug, PartialEq)]
pub struct HighlightSpan {
    pub range: Range<usize>,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
}

impl HighlightSpan {
    pub fn new(range: Range<usize>, color: Color) -> Self {
        Self {
            range,
            color,
            bold: false,
            italic: false,
        }
    }
}

pub trait CodeHighlighter: Send + Sync {
    /// Spans over `code` in ascending, non-overlapping order. Gaps keep the block's own
    /// style. `None` leaves the whole block unstyled.
    fn highlight(&self, language: Option<&str>, code: &str) -> Option<Vec<HighlightSpan>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoHighlight;

impl CodeHighlighter for NoHighlight {
    fn highlight(&self, _language: Option<&str>, _code: &str) -> Option<Vec<HighlightSpan>> {
        None
    }
}

/// Maps common fence aliases onto names syntax definitions know.
pub fn normalize_language(language: &str) -> String {
    let lower = language.trim().to_ascii_lowercase();
    match lower.as_str() {
        "shell" | "zsh" => "bash".to_string(),
        "yml" => "yaml".to_string(),
        "c++" | "cxx" | "cc" => "cpp".to_string(),
        "c#" | "csharp" => "cs".to_string(),
        "objc" | "obj-c" | "objectivec" => "m".to_string(),
        "golang" => "go".to_string(),
        "rs" => "rust".to_string(),
        "py" => "python".to_string(),
        "rb" => "ruby".to_string(),
        _ => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_normalized() {
        assert_eq!(normalize_language("Shell"), "bash");
        assert_eq!(normalize_language(" c++ "), "cpp");
        assert_eq!(normalize_language("rs"), "rust");
        assert_eq!(normalize_language("toml"), "toml");
    }

    #[test]
    fn no_highlight_leaves_code_alone() {
        assert_eq!(NoHighlight.highlight(Some("rust"), "fn main() {}"), None);
    }
}
