//! User-facing style configuration.
//!
//! Every attribute is optional. A missing attribute falls back to the built-in default for
//! its node kind and then to the inherited value, see [`crate::resolve`]. Configurations are
//! plain values; share one as `Arc<StyleConfig>` and swap the `Arc` to reconfigure.
//!
//! ```toml
//! soft_break = "newline"
//!
//! [base]
//! font_family = "Georgia"
//! font_size = 15
//!
//! [h1]
//! font_size = 36
//! color = "#1f2328"
//!
//! [code_block]
//! background_color = "#f6f8fa"
//! padding = 10
//!
//! [[list.depth]]
//! color = "blue"
//! ```

use ratatui::style::Color;
use richmark_core::decoration::DecorationOptions;
use richmark_core::style::FontWeight;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Style configuration not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How a soft line break inside a paragraph is rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoftBreak {
    #[default]
    Space,
    Newline,
}

impl SoftBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            SoftBreak::Space => " ",
            SoftBreak::Newline => "\n",
        }
    }
}

/// Font and spacing attributes shared by every block kind.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<FontWeight>,
    pub color: Option<Color>,
    pub background_color: Option<Color>,
    pub margin_bottom: Option<f32>,
    pub line_height: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlockquoteStyle {
    #[serde(flatten)]
    pub text: TextStyle,
    pub border_color: Option<Color>,
    pub border_width: Option<f32>,
    /// Indent of quoted content, measured from the border's left edge.
    pub gap_width: Option<f32>,
    /// Text emitted before each quoted block. Empty by default.
    pub marker: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListStyle {
    #[serde(flatten)]
    pub text: TextStyle,
    pub bullet: Option<String>,
    pub marker_color: Option<Color>,
    pub marker_font_weight: Option<FontWeight>,
    /// Indent added per nesting level.
    pub margin_left: Option<f32>,
    /// Overrides per nesting depth; the first entry applies to top-level lists.
    pub depth: Vec<TextStyle>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CodeBlockStyle {
    #[serde(flatten)]
    pub text: TextStyle,
    pub padding: Option<f32>,
    pub border_color: Option<Color>,
    pub border_width: Option<f32>,
    pub border_radius: Option<f32>,
}

/// Attributes for inline kinds that keep the surrounding font size.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InlineStyle {
    pub font_family: Option<String>,
    pub color: Option<Color>,
    pub background_color: Option<Color>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkStyle {
    pub color: Option<Color>,
    pub underline: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageStyle {
    pub height: Option<f32>,
    pub margin_bottom: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub soft_break: SoftBreak,
    pub base: TextStyle,
    pub paragraph: TextStyle,
    pub h1: TextStyle,
    pub h2: TextStyle,
    pub h3: TextStyle,
    pub h4: TextStyle,
    pub h5: TextStyle,
    pub h6: TextStyle,
    pub blockquote: BlockquoteStyle,
    pub list: ListStyle,
    pub code_block: CodeBlockStyle,
    pub code: InlineStyle,
    pub link: LinkStyle,
    pub strong: InlineStyle,
    pub em: InlineStyle,
    pub math: InlineStyle,
    pub image: ImageStyle,
}

pub(crate) mod defaults {
    use ratatui::style::Color;

    pub const HEADING_SIZES: [f32; 6] = [32.0, 26.0, 22.0, 20.0, 18.0, 17.0];
    pub const BLOCK_MARGIN: f32 = 12.0;
    pub const ITEM_MARGIN: f32 = 4.0;
    pub const MONOSPACE_FAMILY: &str = "Menlo";
    pub const CODE_BACKGROUND: Color = Color::Rgb(0xf6, 0xf8, 0xfa);
    pub const LINK_COLOR: Color = Color::Rgb(0x09, 0x69, 0xda);
    pub const QUOTE_BORDER_COLOR: Color = Color::Rgb(0xd0, 0xd7, 0xde);
    pub const QUOTE_BORDER_WIDTH: f32 = 3.0;
    pub const QUOTE_GAP: f32 = 16.0;
    pub const LIST_MARGIN: f32 = 16.0;
    pub const CODE_PADDING: f32 = 8.0;
    pub const BULLET: &str = "•";
}

impl StyleConfig {
    /// Parses TOML. Invalid numeric values are dropped with a warning.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut config: StyleConfig = toml::from_str(s)?;
        config.sanitize();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn with_soft_break(mut self, soft_break: SoftBreak) -> Self {
        self.soft_break = soft_break;
        self
    }

    /// Style for heading `level`, clamped to 1..=6.
    pub fn heading(&self, level: u8) -> &TextStyle {
        match level.clamp(1, 6) {
            1 => &self.h1,
            2 => &self.h2,
            3 => &self.h3,
            4 => &self.h4,
            5 => &self.h5,
            _ => &self.h6,
        }
    }

    /// Per-depth list override; `depth` starts at 1.
    pub fn list_depth(&self, depth: usize) -> Option<&TextStyle> {
        depth.checked_sub(1).and_then(|i| self.list.depth.get(i))
    }

    pub fn blockquote_marker(&self) -> &str {
        self.blockquote.marker.as_deref().unwrap_or("")
    }

    pub fn bullet(&self) -> &str {
        self.list.bullet.as_deref().unwrap_or(defaults::BULLET)
    }

    /// Geometry used by the decoration pass and by portable markup.
    pub fn decoration_options(&self) -> DecorationOptions {
        DecorationOptions {
            code_block_padding: self.code_block.padding.unwrap_or(defaults::CODE_PADDING),
            quote_border_width: self
                .blockquote
                .border_width
                .unwrap_or(defaults::QUOTE_BORDER_WIDTH),
            quote_indent: self.blockquote.gap_width.unwrap_or(defaults::QUOTE_GAP),
            quote_border_color: Some(
                self.blockquote
                    .border_color
                    .unwrap_or(defaults::QUOTE_BORDER_COLOR),
            ),
            code_block_border_width: self.code_block.border_width.unwrap_or(0.0),
            code_block_border_color: self.code_block.border_color,
            code_block_border_radius: self.code_block.border_radius.unwrap_or(0.0),
        }
    }

    fn sanitize(&mut self) {
        sanitize_text(&mut self.base, "base");
        sanitize_text(&mut self.paragraph, "paragraph");
        for (style, name) in [
            (&mut self.h1, "h1"),
            (&mut self.h2, "h2"),
            (&mut self.h3, "h3"),
            (&mut self.h4, "h4"),
            (&mut self.h5, "h5"),
            (&mut self.h6, "h6"),
        ] {
            sanitize_text(style, name);
        }
        sanitize_text(&mut self.blockquote.text, "blockquote");
        sanitize_len(&mut self.blockquote.border_width, "blockquote.border_width", true);
        sanitize_len(&mut self.blockquote.gap_width, "blockquote.gap_width", true);
        sanitize_text(&mut self.list.text, "list");
        sanitize_len(&mut self.list.margin_left, "list.margin_left", true);
        for depth in &mut self.list.depth {
            sanitize_text(depth, "list.depth");
        }
        sanitize_text(&mut self.code_block.text, "code_block");
        sanitize_len(&mut self.code_block.padding, "code_block.padding", true);
        sanitize_len(&mut self.code_block.border_width, "code_block.border_width", true);
        sanitize_len(&mut self.code_block.border_radius, "code_block.border_radius", true);
        sanitize_len(&mut self.image.height, "image.height", false);
        sanitize_len(&mut self.image.margin_bottom, "image.margin_bottom", true);
    }
}

fn sanitize_text(style: &mut TextStyle, section: &str) {
    sanitize_len(&mut style.font_size, section, false);
    sanitize_len(&mut style.line_height, section, false);
    sanitize_len(&mut style.margin_bottom, section, true);
    if style.font_family.as_deref().is_some_and(|f| f.trim().is_empty()) {
        tracing::warn!(section, "Ignoring empty font family");
        style.font_family = None;
    }
}

fn sanitize_len(value: &mut Option<f32>, field: &str, allow_zero: bool) {
    let Some(v) = *value else {
        return;
    };
    if !valid_len(v, allow_zero) {
        tracing::warn!(field, value = v, "Ignoring invalid style length");
        *value = None;
    }
}

pub(crate) fn valid_len(v: f32, allow_zero: bool) -> bool {
    v.is_finite() && (v > 0.0 || (allow_zero && v == 0.0))
}
