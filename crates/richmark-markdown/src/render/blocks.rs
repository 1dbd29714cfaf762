use super::{Dispatcher, NodeRenderer, RenderContext, RenderOutput};
use crate::ast::{Node, NodeKind};
use richmark_core::buffer::{NodeTag, Run};
use richmark_core::highlight::{CodeHighlighter, HighlightSpan};
use richmark_core::style::{FontSlant, FontWeight, ResolvedStyle};
use std::fmt;
use std::sync::Arc;

/// Renders nothing of its own; used for documents, paragraphs, headings, lists and inline marks.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContainerRenderer;

impl NodeRenderer for ContainerRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        dispatch.render_children(node, cx, out);
    }
}

/// Emits the configured quote marker before each quoted block.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockquoteRenderer;

impl NodeRenderer for BlockquoteRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        let marker = cx.config().blockquote_marker();
        dispatch.render_children_with(node, cx, out, |_, cx, out| {
            out.push(cx.run(marker, NodeTag::QuoteMarker));
        });
    }
}

/// Emits `"• "` or `"{n}. "` in the marker style, then the item's content.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListItemRenderer;

impl NodeRenderer for ListItemRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        let marker = match cx.item_number() {
            Some(n) if cx.ordered_list() => format!("{n}. "),
            _ => format!("{} ", cx.config().bullet()),
        };
        let style = dispatch.resolver().resolve_marker(cx.style());
        out.push(Run::new(marker, style).with_tag(cx.tag(NodeTag::ListMarker)));
        dispatch.render_children(node, cx, out);
    }
}

/// Emits the block's code as one run, or as one run per highlighted span when a
/// highlighter is installed. Every piece shares the block's tag.
#[derive(Clone, Default)]
pub struct CodeBlockRenderer {
    highlighter: Option<Arc<dyn CodeHighlighter>>,
}

impl CodeBlockRenderer {
    pub fn with_highlighter(mut self, highlighter: Arc<dyn CodeHighlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    fn push_highlighted(
        &self,
        text: &str,
        spans: &[HighlightSpan],
        cx: &RenderContext<'_>,
        out: &mut RenderOutput,
    ) {
        let base = cx.style();
        let mut cursor = 0usize;
        for span in spans {
            // Out-of-order, overlapping or non-boundary spans are skipped.
            if span.range.start < cursor || text.get(span.range.clone()).is_none() {
                continue;
            }
            if span.range.start > cursor {
                out.push(code_run(&text[cursor..span.range.start], base.clone(), cx));
            }
            let mut style = base.clone();
            style.color = span.color;
            if span.bold {
                style.font_weight = FontWeight::BOLD;
            }
            if span.italic {
                style.slant = FontSlant::Italic;
            }
            out.push(code_run(&text[span.range.clone()], style, cx));
            cursor = span.range.end;
        }
        if cursor < text.len() {
            out.push(code_run(&text[cursor..], base.clone(), cx));
        }
    }
}

fn code_run(text: &str, style: ResolvedStyle, cx: &RenderContext<'_>) -> Run {
    Run::new(text, style).with_tag(cx.tag(NodeTag::CodeBlock))
}

impl fmt::Debug for CodeBlockRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeBlockRenderer")
            .field("highlighter", &self.highlighter.is_some())
            .finish()
    }
}

impl NodeRenderer for CodeBlockRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        let NodeKind::CodeBlock { language, literal } = node.kind() else {
            dispatch.render_children(node, cx, out);
            return;
        };
        // The fence's closing newline is a block boundary, not content.
        let text = literal.strip_suffix('\n').unwrap_or(literal);
        let spans = self
            .highlighter
            .as_ref()
            .filter(|_| !text.is_empty())
            .and_then(|h| h.highlight(language.as_deref(), text));
        match spans {
            Some(spans) => self.push_highlighted(text, &spans, cx, out),
            None => out.push(cx.run(text, NodeTag::CodeBlock)),
        }
    }
}
