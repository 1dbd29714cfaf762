//! Cascading style resolution.
//!
//! A node's [`ResolvedStyle`] is the baseline, refined by the configured `base` section, then
//! by each ancestor outside-in, then by the node's own kind. Sizes are always absolute: a
//! configured size replaces the inherited one rather than scaling it.

use crate::ast::NodeKind;
use crate::config::{defaults, InlineStyle, StyleConfig, TextStyle};
use ratatui::style::Color;
use richmark_core::style::{FontSlant, FontWeight, ResolvedStyle};

/// Position-dependent inputs supplied by the renderer while walking the tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveParams {
    /// Level of the enclosing heading. Takes precedence over the level stored on the node.
    pub heading_level: Option<u8>,
    /// Number of enclosing lists, counting the node itself when it is a list.
    pub list_depth: usize,
    /// Number of enclosing blockquotes, counting the node itself when it is a blockquote.
    pub quote_depth: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct StyleResolver<'c> {
    config: &'c StyleConfig,
}

impl<'c> StyleResolver<'c> {
    pub fn new(config: &'c StyleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'c StyleConfig {
        self.config
    }

    /// The baseline refined by the `base` section.
    pub fn root(&self) -> ResolvedStyle {
        let mut style = ResolvedStyle::default();
        apply_text(&mut style, &self.config.base);
        style
    }

    /// Resolves `kind` below `ancestors` (outermost first).
    ///
    /// Pure: the same arguments always produce the same style.
    pub fn resolve(
        &self,
        kind: &NodeKind,
        ancestors: &[&NodeKind],
        params: ResolveParams,
    ) -> ResolvedStyle {
        let mut style = self.root();
        // Each list on the path takes the depth override for its own nesting level.
        let mut list_depth = 0;
        for kind in ancestors.iter().copied().chain(std::iter::once(kind)) {
            if matches!(kind, NodeKind::List { .. }) {
                list_depth += 1;
            }
            self.apply(&mut style, kind, params, list_depth);
        }

        let quote_gap = self
            .config
            .blockquote
            .gap_width
            .unwrap_or(defaults::QUOTE_GAP);
        let list_margin = self
            .config
            .list
            .margin_left
            .unwrap_or(defaults::LIST_MARGIN);
        style.indent =
            params.quote_depth as f32 * quote_gap + params.list_depth as f32 * list_margin;
        style
    }

    /// Style of a list item's bullet or number, derived from the item's own style.
    pub fn resolve_marker(&self, item: &ResolvedStyle) -> ResolvedStyle {
        let list = &self.config.list;
        let mut style = item.clone();
        style.underline = false;
        if let Some(color) = list.marker_color {
            style.color = color;
        }
        if let Some(weight) = list.marker_font_weight {
            style.font_weight = weight;
        }
        style
    }

    /// Applies one kind's contribution on top of `style`. `list_depth` counts the lists from
    /// the root down to `kind`.
    fn apply(
        &self,
        style: &mut ResolvedStyle,
        kind: &NodeKind,
        params: ResolveParams,
        list_depth: usize,
    ) {
        let config = self.config;
        match kind {
            NodeKind::Document
            | NodeKind::LineBreak { .. }
            | NodeKind::Text { .. } => {}
            NodeKind::Paragraph => {
                style.margin_bottom = defaults::BLOCK_MARGIN;
                apply_text(style, &config.paragraph);
            }
            NodeKind::Heading { level } => {
                let level = params.heading_level.unwrap_or(*level).clamp(1, 6);
                style.font_size = defaults::HEADING_SIZES[usize::from(level - 1)];
                style.font_weight = FontWeight::BOLD;
                style.margin_bottom = defaults::BLOCK_MARGIN;
                apply_text(style, config.heading(level));
            }
            NodeKind::Blockquote => {
                apply_text(style, &config.blockquote.text);
            }
            NodeKind::List { .. } => {
                style.margin_bottom = defaults::BLOCK_MARGIN;
                apply_text(style, &config.list.text);
                if let Some(depth) = config.list_depth(list_depth) {
                    apply_text(style, depth);
                }
            }
            NodeKind::ListItem => {
                style.margin_bottom = defaults::ITEM_MARGIN;
            }
            NodeKind::CodeBlock { .. } => {
                style.font_family = defaults::MONOSPACE_FAMILY.to_string();
                style.font_weight = FontWeight::NORMAL;
                style.slant = FontSlant::Normal;
                style.background = Some(defaults::CODE_BACKGROUND);
                style.underline = false;
                style.margin_bottom = defaults::BLOCK_MARGIN;
                style.preserve_whitespace = true;
                apply_text(style, &config.code_block.text);
            }
            NodeKind::InlineCode { .. } => {
                style.font_family = config
                    .code
                    .font_family
                    .clone()
                    .or_else(|| config.code_block.text.font_family.clone())
                    .unwrap_or_else(|| defaults::MONOSPACE_FAMILY.to_string());
                style.background = Some(
                    config
                        .code
                        .background_color
                        .unwrap_or(defaults::CODE_BACKGROUND),
                );
                style.preserve_whitespace = true;
                if let Some(color) = config.code.color {
                    style.color = color;
                }
            }
            NodeKind::Emphasis => {
                style.slant = FontSlant::Italic;
                apply_inline(style, &config.em);
            }
            NodeKind::Strong => {
                style.font_weight = FontWeight::BOLD;
                apply_inline(style, &config.strong);
            }
            NodeKind::Link { .. } => {
                style.color = config.link.color.unwrap_or(defaults::LINK_COLOR);
                style.underline = config.link.underline.unwrap_or(true);
            }
            NodeKind::Image { .. } => {
                if let Some(height) = config.image.height {
                    style.line_height = Some(height);
                }
                if let Some(margin) = config.image.margin_bottom {
                    style.margin_bottom = margin;
                }
            }
            NodeKind::Math { display, .. } => {
                if *display {
                    style.margin_bottom = defaults::BLOCK_MARGIN;
                }
                apply_inline(style, &config.math);
            }
        }
    }
}

fn apply_text(style: &mut ResolvedStyle, text: &TextStyle) {
    if let Some(family) = &text.font_family {
        style.font_family.clone_from(family);
    }
    if let Some(size) = text.font_size {
        style.font_size = size;
    }
    if let Some(weight) = text.font_weight {
        style.font_weight = weight;
    }
    set_color(style, text.color, text.background_color);
    if let Some(margin) = text.margin_bottom {
        style.margin_bottom = margin;
    }
    if let Some(line_height) = text.line_height {
        style.line_height = Some(line_height);
    }
}

fn apply_inline(style: &mut ResolvedStyle, inline: &InlineStyle) {
    if let Some(family) = &inline.font_family {
        style.font_family.clone_from(family);
    }
    set_color(style, inline.color, inline.background_color);
}

fn set_color(style: &mut ResolvedStyle, color: Option<Color>, background: Option<Color>) {
    if let Some(color) = color {
        style.color = color;
    }
    if background.is_some() {
        style.background = background;
    }
}
