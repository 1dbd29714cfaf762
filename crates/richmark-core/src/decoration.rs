//! Layout-dependent decorations: code-block backgrounds and blockquote borders.
//!
//! [`decorate`] is a pure function of the buffer's semantic tags and the final line geometry.
//! It can be re-run whenever geometry changes and never needs the document tree.

use crate::buffer::{Container, NodeTag, StyledBuffer};
use crate::layout::{LayoutRect, LineGeometry, TextLayout};
use ratatui::style::Color;
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecorationKind {
    CodeBlockBackground,
    BlockquoteBorder,
}

/// Stroke drawn around a region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionBorder {
    pub width: f32,
    pub color: Option<Color>,
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecorationRegion {
    pub kind: DecorationKind,
    pub rect: LayoutRect,
    /// Fill colour.
    pub color: Option<Color>,
    pub border: Option<RegionBorder>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecorationOptions {
    /// Vertical padding added above and below a code block's lines.
    pub code_block_padding: f32,
    /// Zero draws no code block border.
    pub code_block_border_width: f32,
    pub code_block_border_color: Option<Color>,
    pub code_block_border_radius: f32,
    pub quote_border_width: f32,
    /// Horizontal offset between nested blockquote borders.
    pub quote_indent: f32,
    pub quote_border_color: Option<Color>,
}

impl Default for DecorationOptions {
    fn default() -> Self {
        Self {
            code_block_padding: 8.0,
            code_block_border_width: 0.0,
            code_block_border_color: None,
            code_block_border_radius: 0.0,
            quote_border_width: 3.0,
            quote_indent: 16.0,
            quote_border_color: None,
        }
    }
}

impl DecorationOptions {
    fn code_block_border(&self) -> Option<RegionBorder> {
        (self.code_block_border_width > 0.0 || self.code_block_border_radius > 0.0).then_some(
            RegionBorder {
                width: self.code_block_border_width,
                color: self.code_block_border_color,
                radius: self.code_block_border_radius,
            },
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decorations {
    pub regions: Vec<DecorationRegion>,
    /// Height the host must reserve. Exceeds the laid-out content height when a trailing
    /// code block's background extends past the last measured line.
    pub required_height: f32,
}

struct CodeBlockSpan {
    block_id: usize,
    range: Range<usize>,
    background: Option<Color>,
}

struct QuoteSpan {
    id: usize,
    level: usize,
    range: Range<usize>,
}

pub fn decorate(
    buffer: &StyledBuffer,
    layout: &TextLayout,
    options: &DecorationOptions,
) -> Decorations {
    let content_height = layout.content_height;
    let mut out = Decorations {
        regions: Vec::new(),
        required_height: content_height,
    };

    let trailing_block = buffer
        .last_semantic_tag()
        .filter(|tag| tag.node == NodeTag::CodeBlock)
        .map(|tag| tag.block_id);

    let text = buffer.text();
    for block in code_blocks(buffer) {
        // A block ending in a newline owns the empty line after it, and so does an empty
        // block. Mid-document that line holds only the following separator.
        let owns_next_line =
            block.range.is_empty() || text[block.range.clone()].ends_with('\n');
        let empty_last_line = layout.lines.iter().find(|l| {
            owns_next_line
                && l.range.start == block.range.end
                && text.get(l.range.clone()) == Some("\n")
        });
        let lines = layout.lines_intersecting(&block.range).chain(empty_last_line);
        let trailing = trailing_block == Some(block.block_id);
        let mut rect = match union_of(lines) {
            Some(rect) => rect,
            // An empty block at the end has no measured line at all.
            None if trailing => LayoutRect::new(0.0, content_height, 0.0, 0.0),
            None => continue,
        };
        rect.width = rect.width.max(layout.content_width - rect.x);
        rect.y -= options.code_block_padding;
        rect.height += options.code_block_padding * 2.0;

        if trailing {
            // Layout engines skip a final empty line; cover it explicitly.
            if block.range.end == buffer.len()
                && owns_next_line
                && let Some(last) = layout.lines.last()
            {
                rect.height += last.rect.height;
            }
            rect = clip_top(rect);
            out.required_height = out.required_height.max(rect.bottom());
        } else {
            rect = clip(rect, content_height);
        }

        out.regions.push(DecorationRegion {
            kind: DecorationKind::CodeBlockBackground,
            rect,
            color: block.background,
            border: options.code_block_border(),
        });
    }

    for quote in quotes(buffer) {
        let Some(lines) = union_of(layout.lines_intersecting(&quote.range)) else {
            continue;
        };
        let rect = LayoutRect::new(
            quote.level as f32 * options.quote_indent,
            lines.y,
            options.quote_border_width,
            lines.height,
        );
        out.regions.push(DecorationRegion {
            kind: DecorationKind::BlockquoteBorder,
            rect: clip(rect, content_height),
            color: options.quote_border_color,
            border: None,
        });
    }

    out
}

fn code_blocks(buffer: &StyledBuffer) -> Vec<CodeBlockSpan> {
    let mut out: Vec<CodeBlockSpan> = Vec::new();
    for (span, run) in buffer.ranges() {
        let Some(tag) = run.tag.as_ref().filter(|t| t.node == NodeTag::CodeBlock) else {
            continue;
        };
        match out.last_mut() {
            Some(last) if last.block_id == tag.block_id => last.range.end = span.end,
            _ => out.push(CodeBlockSpan {
                block_id: tag.block_id,
                range: span,
                background: run.style.background,
            }),
        }
    }
    out
}

fn quotes(buffer: &StyledBuffer) -> Vec<QuoteSpan> {
    let mut out: Vec<QuoteSpan> = Vec::new();
    for (span, run) in buffer.ranges() {
        let Some(tag) = run.tag.as_ref() else {
            continue;
        };
        if run.is_separator() {
            continue;
        }
        let mut level = 0usize;
        for container in &tag.containers {
            let Container::Quote { id } = container else {
                continue;
            };
            match out.iter_mut().find(|q| q.id == *id) {
                Some(q) => q.range.end = span.end,
                None => out.push(QuoteSpan {
                    id: *id,
                    level,
                    range: span.clone(),
                }),
            }
            level += 1;
        }
    }
    out
}

fn union_of<'a>(lines: impl Iterator<Item = &'a LineGeometry>) -> Option<LayoutRect> {
    let mut acc: Option<(f32, f32, f32, f32)> = None;
    for line in lines {
        let r = line.rect;
        acc = Some(match acc {
            None => (r.x, r.y, r.right(), r.bottom()),
            Some((x, y, right, bottom)) => (
                x.min(r.x),
                y.min(r.y),
                right.max(r.right()),
                bottom.max(r.bottom()),
            ),
        });
    }
    acc.map(|(x, y, right, bottom)| LayoutRect::new(x, y, right - x, bottom - y))
}

fn clip_top(mut rect: LayoutRect) -> LayoutRect {
    if rect.y < 0.0 {
        rect.height += rect.y;
        rect.y = 0.0;
    }
    rect
}

fn clip(rect: LayoutRect, content_height: f32) -> LayoutRect {
    let mut rect = clip_top(rect);
    if rect.bottom() > content_height {
        rect.height = (content_height - rect.y).max(0.0);
    }
    rect
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BlockTag, InlineMarks, Run, SemanticTag};
    use crate::style::ResolvedStyle;
    use std::sync::Arc;

    fn tagged(text: &str, node: NodeTag, block_id: usize, containers: Vec<Container>) -> Run {
        let style = ResolvedStyle {
            background: (node == NodeTag::CodeBlock).then_some(Color::Gray),
            ..ResolvedStyle::default()
        };
        Run::new(text, style.clone()).with_tag(SemanticTag {
            node,
            block: if node == NodeTag::CodeBlock {
                BlockTag::CodeBlock { language: None }
            } else {
                BlockTag::Paragraph
            },
            block_id,
            block_style: Arc::new(style),
            containers,
            marks: InlineMarks::default(),
        })
    }

    fn line(range: Range<usize>, y: f32) -> LineGeometry {
        LineGeometry {
            rect: LayoutRect::new(0.0, y, 50.0, 10.0),
            range,
        }
    }

    #[test]
    fn code_block_region_spans_its_lines_with_padding() {
        let buf: StyledBuffer = [
            tagged("p", NodeTag::Text, 0, vec![]),
            tagged("\n", NodeTag::BlockSeparator, 0, vec![]),
            tagged("a\nb", NodeTag::CodeBlock, 1, vec![]),
            tagged("\n", NodeTag::BlockSeparator, 1, vec![]),
            tagged("q", NodeTag::Text, 2, vec![]),
        ]
        .into_iter()
        .collect();
        let layout = TextLayout::from_lines(vec![
            line(0..2, 0.0),
            line(2..4, 20.0),
            line(4..6, 30.0),
            line(6..7, 50.0),
        ]);
        let options = DecorationOptions {
            code_block_padding: 5.0,
            ..DecorationOptions::default()
        };

        let out = decorate(&buf, &layout, &options);
        assert_eq!(out.regions.len(), 1);
        let region = &out.regions[0];
        assert_eq!(region.kind, DecorationKind::CodeBlockBackground);
        assert_eq!(region.color, Some(Color::Gray));
        assert_eq!(region.rect, LayoutRect::new(0.0, 15.0, 50.0, 30.0));
        assert_eq!(out.required_height, 60.0);
    }

    #[test]
    fn trailing_code_block_is_extended_not_clipped() {
        let buf: StyledBuffer = [
            tagged("p", NodeTag::Text, 0, vec![]),
            tagged("\n", NodeTag::BlockSeparator, 0, vec![]),
            tagged("x", NodeTag::CodeBlock, 1, vec![]),
        ]
        .into_iter()
        .collect();
        let layout = TextLayout::from_lines(vec![line(0..2, 0.0), line(2..3, 10.0)]);
        let options = DecorationOptions {
            code_block_padding: 4.0,
            ..DecorationOptions::default()
        };

        let out = decorate(&buf, &layout, &options);
        assert_eq!(out.regions[0].rect, LayoutRect::new(0.0, 6.0, 50.0, 18.0));
        assert_eq!(out.required_height, 24.0);
    }

    #[test]
    fn omitted_final_empty_line_is_covered() {
        let buf: StyledBuffer = [tagged("x\n", NodeTag::CodeBlock, 0, vec![])]
            .into_iter()
            .collect();
        let layout = TextLayout::from_lines(vec![line(0..2, 0.0)]);
        let options = DecorationOptions {
            code_block_padding: 0.0,
            ..DecorationOptions::default()
        };
        let out = decorate(&buf, &layout, &options);
        assert_eq!(out.regions[0].rect.height, 20.0);
    }

    #[test]
    fn code_block_owns_its_empty_last_line_mid_document() {
        let buf: StyledBuffer = [
            tagged("x\n", NodeTag::CodeBlock, 0, vec![]),
            tagged("\n", NodeTag::BlockSeparator, 0, vec![]),
            tagged("q", NodeTag::Text, 1, vec![]),
        ]
        .into_iter()
        .collect();
        let layout =
            TextLayout::from_lines(vec![line(0..2, 0.0), line(2..3, 10.0), line(3..4, 20.0)]);
        let options = DecorationOptions {
            code_block_padding: 0.0,
            ..DecorationOptions::default()
        };
        let out = decorate(&buf, &layout, &options);
        assert_eq!(out.regions[0].rect, LayoutRect::new(0.0, 0.0, 50.0, 20.0));
    }

    #[test]
    fn empty_code_block_covers_one_line_anywhere() {
        let empty = || tagged("", NodeTag::CodeBlock, 1, vec![]);
        let middle: StyledBuffer = [
            tagged("p", NodeTag::Text, 0, vec![]),
            tagged("\n", NodeTag::BlockSeparator, 0, vec![]),
            empty(),
            tagged("\n", NodeTag::BlockSeparator, 1, vec![]),
            tagged("q", NodeTag::Text, 2, vec![]),
        ]
        .into_iter()
        .collect();
        let layout =
            TextLayout::from_lines(vec![line(0..2, 0.0), line(2..3, 10.0), line(3..4, 20.0)]);
        let options = DecorationOptions {
            code_block_padding: 0.0,
            ..DecorationOptions::default()
        };
        let out = decorate(&middle, &layout, &options);
        assert_eq!(out.regions[0].rect, LayoutRect::new(0.0, 10.0, 50.0, 10.0));

        let trailing: StyledBuffer = [
            tagged("p", NodeTag::Text, 0, vec![]),
            tagged("\n", NodeTag::BlockSeparator, 0, vec![]),
            empty(),
        ]
        .into_iter()
        .collect();
        let layout = TextLayout::from_lines(vec![line(0..2, 0.0)]);
        let out = decorate(&trailing, &layout, &options);
        assert_eq!(out.regions[0].rect, LayoutRect::new(0.0, 10.0, 50.0, 10.0));
        assert_eq!(out.required_height, 20.0);
    }

    #[test]
    fn code_block_border_comes_from_options() {
        let buf: StyledBuffer = [tagged("x", NodeTag::CodeBlock, 0, vec![])]
            .into_iter()
            .collect();
        let layout = TextLayout::from_lines(vec![line(0..1, 0.0)]);
        let plain = decorate(&buf, &layout, &DecorationOptions::default());
        assert_eq!(plain.regions[0].border, None);

        let options = DecorationOptions {
            code_block_border_width: 1.0,
            code_block_border_color: Some(Color::Black),
            code_block_border_radius: 4.0,
            ..DecorationOptions::default()
        };
        let bordered = decorate(&buf, &layout, &options);
        assert_eq!(
            bordered.regions[0].border,
            Some(RegionBorder {
                width: 1.0,
                color: Some(Color::Black),
                radius: 4.0,
            })
        );
    }

    #[test]
    fn nested_quotes_get_offset_borders() {
        let outer = Container::Quote { id: 0 };
        let inner = Container::Quote { id: 1 };
        let buf: StyledBuffer = [
            tagged("a", NodeTag::Text, 0, vec![outer.clone()]),
            tagged("\n", NodeTag::BlockSeparator, 0, vec![outer.clone()]),
            tagged("b", NodeTag::Text, 1, vec![outer, inner]),
        ]
        .into_iter()
        .collect();
        let layout = TextLayout::from_lines(vec![line(0..2, 0.0), line(2..3, 10.0)]);
        let out = decorate(&buf, &layout, &DecorationOptions::default());

        let borders = out
            .regions
            .iter()
            .filter(|r| r.kind == DecorationKind::BlockquoteBorder)
            .map(|r| r.rect)
            .collect::<Vec<_>>();
        assert_eq!(
            borders,
            vec![
                LayoutRect::new(0.0, 0.0, 3.0, 20.0),
                LayoutRect::new(16.0, 10.0, 3.0, 10.0),
            ]
        );
    }

    #[test]
    fn decorate_is_idempotent() {
        let buf: StyledBuffer = [tagged("x", NodeTag::CodeBlock, 0, vec![])]
            .into_iter()
            .collect();
        let layout = TextLayout::from_lines(vec![line(0..1, 0.0)]);
        let options = DecorationOptions::default();
        assert_eq!(
            decorate(&buf, &layout, &options),
            decorate(&buf, &layout, &options)
        );
    }
}
