//! Line geometry for a styled buffer.
//!
//! Hosts normally supply their own line geometry to the decoration pass. [`layout`] is a
//! reference implementation built on the font cache: word wrapping on whitespace, per-line
//! heights from the tallest run, block spacing after separators.

use crate::buffer::StyledBuffer;
use crate::font::{FontCache, FontMetrics};
use crate::style::ResolvedStyle;
use std::ops::Range;
use unicode_width::UnicodeWidthChar;

const TAB_COLS: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// One laid-out line. `range` is the byte range in the buffer text, including the line's
/// terminating newline if it has one.
#[derive(Clone, Debug, PartialEq)]
pub struct LineGeometry {
    pub rect: LayoutRect,
    pub range: Range<usize>,
}

impl LineGeometry {
    pub fn intersects(&self, range: &Range<usize>) -> bool {
        self.range.start < range.end && range.start < self.range.end
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<LineGeometry>,
    pub content_width: f32,
    pub content_height: f32,
}

impl TextLayout {
    /// Geometry supplied by a host; content size is derived from the lines.
    pub fn from_lines(lines: Vec<LineGeometry>) -> Self {
        let content_width = lines.iter().map(|l| l.rect.right()).fold(0.0, f32::max);
        let content_height = lines.iter().map(|l| l.rect.bottom()).fold(0.0, f32::max);
        Self {
            lines,
            content_width,
            content_height,
        }
    }

    pub fn lines_intersecting<'a>(
        &'a self,
        range: &'a Range<usize>,
    ) -> impl Iterator<Item = &'a LineGeometry> + 'a {
        self.lines.iter().filter(move |l| l.intersects(range))
    }
}

struct PendingLine {
    range: Range<usize>,
    x: f32,
    width: f32,
    margin_after: f32,
}

/// Lays out `buffer`, wrapping at `max_width` when given.
///
/// A trailing newline does not produce a final empty line.
pub fn layout(buffer: &StyledBuffer, fonts: &FontCache, max_width: Option<f32>) -> TextLayout {
    let metrics = buffer
        .runs()
        .iter()
        .map(|run| fonts.metrics_for(&fonts.font_for(&run.style)))
        .collect::<Vec<_>>();

    let mut pending: Vec<PendingLine> = Vec::new();
    let mut start = 0usize;
    let mut x0 = 0.0f32;
    let mut width = 0.0f32;
    let mut soft: Option<(usize, f32)> = None;
    let mut block_margin = 0.0f32;

    for (idx, (span, run)) in buffer.ranges().enumerate() {
        let m = metrics[idx];
        if !run.is_separator() {
            block_margin = margin_of(run);
        }

        for (off, ch) in run.text.char_indices() {
            let byte = span.start + off;
            if byte == start {
                x0 = run.style.indent;
            }

            if ch == '\n' {
                pending.push(PendingLine {
                    range: start..byte + 1,
                    x: x0,
                    width,
                    margin_after: if run.is_separator() { block_margin } else { 0.0 },
                });
                start = byte + 1;
                width = 0.0;
                soft = None;
                continue;
            }

            let w = if run.attachment.is_some() {
                m.line_height
            } else {
                glyph_width(ch, &m)
            };

            if let Some(max) = max_width
                && width > 0.0
                && x0 + width + w > max
            {
                if let Some((brk, brk_width)) = soft.take() {
                    pending.push(PendingLine {
                        range: start..brk,
                        x: x0,
                        width: brk_width,
                        margin_after: 0.0,
                    });
                    start = brk;
                    width -= brk_width;
                } else {
                    pending.push(PendingLine {
                        range: start..byte,
                        x: x0,
                        width,
                        margin_after: 0.0,
                    });
                    start = byte;
                    width = 0.0;
                }
                x0 = run.style.indent;
            }

            width += w;
            if ch.is_whitespace() {
                soft = Some((byte + ch.len_utf8(), width));
            }
        }
    }
    if start < buffer.len() {
        pending.push(PendingLine {
            range: start..buffer.len(),
            x: x0,
            width,
            margin_after: 0.0,
        });
    }

    let runs = buffer.ranges().collect::<Vec<_>>();
    let mut lines = Vec::with_capacity(pending.len());
    let mut y = 0.0f32;
    let mut first = 0usize;
    for line in pending {
        // Lines are ordered, so runs ending before this one are done with.
        while runs.get(first).is_some_and(|(span, _)| span.end <= line.range.start) {
            first += 1;
        }
        let mut height = 0.0f32;
        for (idx, (span, run)) in runs.iter().enumerate().skip(first) {
            if span.start >= line.range.end {
                break;
            }
            if span.end > line.range.start {
                height = height.max(style_line_height(&run.style, &metrics[idx]));
            }
        }
        lines.push(LineGeometry {
            rect: LayoutRect::new(line.x, y, line.width, height),
            range: line.range,
        });
        y += height + line.margin_after;
    }

    TextLayout::from_lines(lines)
}

fn margin_of(run: &crate::buffer::Run) -> f32 {
    match &run.tag {
        Some(tag) => tag.block_style.margin_bottom,
        None => run.style.margin_bottom,
    }
}

fn glyph_width(ch: char, m: &FontMetrics) -> f32 {
    let cols = if ch == '\t' {
        TAB_COLS
    } else {
        UnicodeWidthChar::width(ch).unwrap_or(0)
    };
    cols as f32 * m.advance
}

fn style_line_height(style: &ResolvedStyle, m: &FontMetrics) -> f32 {
    style.line_height.unwrap_or(m.line_height)
}

/// Byte offset of the character under the point `(x, y)` in `layout`.
///
/// `None` when the point misses every line or lies past the end of its line. Widths are
/// measured the way [`layout`] measures them, so `layout` must come from the same buffer and
/// font cache.
pub fn offset_at(
    buffer: &StyledBuffer,
    layout: &TextLayout,
    fonts: &FontCache,
    x: f32,
    y: f32,
) -> Option<usize> {
    let line = layout
        .lines
        .iter()
        .find(|l| l.rect.y <= y && y < l.rect.bottom())?;
    if x < line.rect.x {
        return None;
    }

    let mut cursor = line.rect.x;
    for (span, run) in buffer.ranges() {
        if span.start >= line.range.end {
            break;
        }
        if span.end <= line.range.start {
            continue;
        }
        let m = fonts.metrics_for(&fonts.font_for(&run.style));
        for (off, ch) in run.text.char_indices() {
            let byte = span.start + off;
            if byte < line.range.start || byte >= line.range.end || ch == '\n' {
                continue;
            }
            let w = if run.attachment.is_some() {
                m.line_height
            } else {
                glyph_width(ch, &m)
            };
            if x < cursor + w {
                return Some(byte);
            }
            cursor += w;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Run;

    fn body() -> ResolvedStyle {
        ResolvedStyle {
            font_family: "Helvetica".into(),
            font_size: 10.0,
            ..ResolvedStyle::default()
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn wraps_at_whitespace_and_keeps_byte_ranges() {
        let fonts = FontCache::default();
        let buf: StyledBuffer = [Run::new("hello world", body())].into_iter().collect();
        // 5 points per column at 10pt.
        let out = layout(&buf, &fonts, Some(40.0));
        let ranges = out.lines.iter().map(|l| l.range.clone()).collect::<Vec<_>>();
        assert_eq!(ranges, vec![0..6, 6..11]);
        assert!(approx(out.lines[1].rect.y, 12.0));
        assert!(approx(out.content_height, 24.0));
    }

    #[test]
    fn long_word_breaks_without_soft_point() {
        let fonts = FontCache::default();
        let buf: StyledBuffer = [Run::new("abcdefgh", body())].into_iter().collect();
        let out = layout(&buf, &fonts, Some(20.0));
        let ranges = out.lines.iter().map(|l| l.range.clone()).collect::<Vec<_>>();
        assert_eq!(ranges, vec![0..4, 4..8]);
    }

    #[test]
    fn trailing_newline_has_no_empty_line() {
        let fonts = FontCache::default();
        let buf: StyledBuffer = [Run::new("a\nb\n", body())].into_iter().collect();
        let out = layout(&buf, &fonts, None);
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.lines[1].range, 2..4);
    }

    #[test]
    fn tallest_run_sets_line_height() {
        let fonts = FontCache::default();
        let big = ResolvedStyle {
            font_size: 20.0,
            ..body()
        };
        let buf: StyledBuffer = [Run::new("a", body()), Run::new("B", big)]
            .into_iter()
            .collect();
        let out = layout(&buf, &fonts, None);
        assert!(approx(out.lines[0].rect.height, 24.0));
    }

    #[test]
    fn offset_at_maps_points_back_to_bytes() {
        let fonts = FontCache::default();
        let buf: StyledBuffer = [Run::new("ab\ncd", body())].into_iter().collect();
        let out = layout(&buf, &fonts, None);

        assert_eq!(offset_at(&buf, &out, &fonts, 1.0, 1.0), Some(0));
        assert_eq!(offset_at(&buf, &out, &fonts, 6.0, 1.0), Some(1));
        assert_eq!(offset_at(&buf, &out, &fonts, 6.0, 13.0), Some(4));
        assert_eq!(offset_at(&buf, &out, &fonts, 11.0, 1.0), None);
        assert_eq!(offset_at(&buf, &out, &fonts, 1.0, 30.0), None);
    }

    #[test]
    fn line_heights_follow_runs_across_many_lines() {
        let fonts = FontCache::default();
        let big = ResolvedStyle {
            font_size: 20.0,
            ..body()
        };
        let buf: StyledBuffer = [
            Run::new("a\nb\n", body()),
            Run::new("C", big),
            Run::new("\nd", body()),
        ]
        .into_iter()
        .collect();
        let out = layout(&buf, &fonts, None);
        let heights = out.lines.iter().map(|l| l.rect.height).collect::<Vec<_>>();
        assert_eq!(heights.len(), 4);
        assert!(approx(heights[0], 12.0));
        assert!(approx(heights[1], 12.0));
        assert!(approx(heights[2], 24.0));
        assert!(approx(heights[3], 12.0));
    }

    #[test]
    fn indent_offsets_line_origin() {
        let fonts = FontCache::default();
        let indented = ResolvedStyle {
            indent: 12.0,
            ..body()
        };
        let buf: StyledBuffer = [Run::new("q", indented)].into_iter().collect();
        let out = layout(&buf, &fonts, None);
        assert!(approx(out.lines[0].rect.x, 12.0));
        assert!(approx(out.content_width, 17.0));
    }
}
