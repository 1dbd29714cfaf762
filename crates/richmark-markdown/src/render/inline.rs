use super::{Dispatcher, NodeRenderer, RenderContext, RenderOutput};
use crate::ast::{Node, NodeKind};
use richmark_core::buffer::{Attachment, NodeTag, Run};

#[derive(Clone, Copy, Debug, Default)]
pub struct TextRenderer;

impl NodeRenderer for TextRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        match node.kind() {
            NodeKind::Text { literal } => out.push(cx.run(literal.as_str(), NodeTag::Text)),
            _ => dispatch.render_children(node, cx, out),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InlineCodeRenderer;

impl NodeRenderer for InlineCodeRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        match node.kind() {
            NodeKind::InlineCode { literal } => {
                out.push(cx.run(literal.as_str(), NodeTag::InlineCode));
            }
            _ => dispatch.render_children(node, cx, out),
        }
    }
}

/// Hard breaks emit `"\n"`; soft breaks follow [`crate::config::SoftBreak`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LineBreakRenderer;

impl NodeRenderer for LineBreakRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        let NodeKind::LineBreak { hard } = *node.kind() else {
            dispatch.render_children(node, cx, out);
            return;
        };
        let text = if hard {
            "\n"
        } else {
            cx.config().soft_break.as_str()
        };
        out.push(cx.run(text, NodeTag::LineBreak { hard }));
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ImageRenderer;

impl NodeRenderer for ImageRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        let NodeKind::Image { source, alt, title } = node.kind() else {
            dispatch.render_children(node, cx, out);
            return;
        };
        let attachment = Attachment::Image {
            source: source.clone(),
            alt: alt.clone(),
            title: title.clone(),
        };
        out.push(
            Run::attachment(attachment, cx.style().clone()).with_tag(cx.tag(NodeTag::Image)),
        );
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MathRenderer;

impl NodeRenderer for MathRenderer {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    ) {
        let NodeKind::Math { display, literal } = node.kind() else {
            dispatch.render_children(node, cx, out);
            return;
        };
        let attachment = Attachment::Math {
            expression: literal.clone(),
            display: *display,
        };
        out.push(
            Run::attachment(attachment, cx.style().clone())
                .with_tag(cx.tag(NodeTag::Math { display: *display })),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{SoftBreak, StyleConfig};
    use crate::parser::parse;
    use crate::render::render;
    use pretty_assertions::assert_eq;
    use richmark_core::buffer::{ATTACHMENT_STR, Attachment, NodeTag};

    #[test]
    fn soft_break_policy_is_configurable() {
        let doc = parse("one\ntwo  \nthree");
        let spaced = render(&doc, &StyleConfig::default());
        assert_eq!(spaced.text(), "one two\nthree");

        let config = StyleConfig::default().with_soft_break(SoftBreak::Newline);
        assert_eq!(render(&doc, &config).text(), "one\ntwo\nthree");
    }

    #[test]
    fn image_is_an_attachment_run() {
        let buffer = render(&parse("![a cat](cat.png \"Cat\")"), &StyleConfig::default());
        assert_eq!(buffer.text(), ATTACHMENT_STR);
        let run = &buffer.runs()[0];
        assert_eq!(run.node(), Some(NodeTag::Image));
        assert_eq!(
            run.attachment,
            Some(Attachment::Image {
                source: "cat.png".into(),
                alt: "a cat".into(),
                title: Some("Cat".into()),
            })
        );
    }

    #[test]
    fn inline_code_and_math_runs() {
        let buffer = render(&parse("`x` and $y^2$"), &StyleConfig::default());
        let nodes = buffer.runs().iter().filter_map(|r| r.node()).collect::<Vec<_>>();
        assert_eq!(
            nodes,
            vec![
                NodeTag::InlineCode,
                NodeTag::Text,
                NodeTag::Math { display: false }
            ]
        );
        assert!(buffer.runs()[0].tag.as_ref().unwrap().marks.code);
        assert_eq!(buffer.runs()[2].display_text(), "y^2");
    }
}
