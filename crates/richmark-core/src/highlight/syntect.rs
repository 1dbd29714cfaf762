use super::{CodeHighlighter, HighlightSpan, normalize_language};
use ratatui::style::Color;
use syntect::easy::HighlightLines;
use syntect::highlighting::FontStyle;
use syntect::highlighting::Theme;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxReference;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Light theme matching the default code background.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Uses the bundled theme `name`, falling back to any bundled theme.
    pub fn with_theme(name: &str) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .get(name)
            .cloned()
            .or_else(|| theme_set.themes.values().next().cloned())
            .unwrap_or_default();
        Self { syntax_set, theme }
    }

    fn syntax_for(&self, language: Option<&str>) -> Option<&SyntaxReference> {
        let lang = normalize_language(language?);
        self.syntax_set
            .find_syntax_by_extension(&lang)
            .or_else(|| self.syntax_set.find_syntax_by_token(&lang))
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeHighlighter for SyntectHighlighter {
    fn highlight(&self, language: Option<&str>, code: &str) -> Option<Vec<HighlightSpan>> {
        let syntax = self.syntax_for(language)?;
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut spans = Vec::new();
        let mut offset = 0usize;
        for line in LinesWithEndings::from(code) {
            let regions = match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(regions) => regions,
                Err(e) => {
                    tracing::debug!(error = %e, language = %syntax.name, "Highlighting failed");
                    return None;
                }
            };
            for (style, text) in regions {
                let start = offset;
                offset += text.len();
                if text.trim().is_empty() {
                    continue;
                }
                let fg = style.foreground;
                spans.push(HighlightSpan {
                    range: start..offset,
                    color: Color::Rgb(fg.r, fg.g, fg.b),
                    bold: style.font_style.contains(FontStyle::BOLD),
                    italic: style.font_style.contains(FontStyle::ITALIC),
                });
            }
        }
        Some(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_cover_known_languages_only() {
        let h = SyntectHighlighter::new();
        let code = "fn main() {\n    let x = 1;\n}";
        let spans = h.highlight(Some("rust"), code).unwrap_or_default();
        assert!(!spans.is_empty());
        assert!(spans.windows(2).all(|w| w[0].range.end <= w[1].range.start));
        assert!(spans.iter().all(|s| s.range.end <= code.len()));
        assert!(spans.iter().all(|s| code.get(s.range.clone()).is_some()));

        assert_eq!(h.highlight(None, code), None);
        assert_eq!(h.highlight(Some("no-such-language"), code), None);
    }
}
