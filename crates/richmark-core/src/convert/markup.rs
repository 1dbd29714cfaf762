//! Portable markup: semantic HTML whose visual attributes are inline `style` declarations, so
//! the fragment renders the same when pasted into a mail client or opened standalone.

use crate::buffer::{Attachment, BlockTag, Container, LinkTarget, NodeTag, Run, SemanticTag};
use crate::buffer::StyledBuffer;
use crate::decoration::DecorationOptions;
use crate::font::is_monospace_family;
use crate::style::{DEFAULT_FONT_FAMILY, ResolvedStyle, color_to_hex};

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

pub fn to_portable_markup(buffer: &StyledBuffer) -> String {
    to_portable_markup_with(buffer, &DecorationOptions::default())
}

/// Like [`to_portable_markup`], taking code-block padding and quote borders from `options`.
pub fn to_portable_markup_with(buffer: &StyledBuffer, options: &DecorationOptions) -> String {
    let mut writer = MarkupWriter {
        options,
        out: String::new(),
        containers: Vec::new(),
        block: None,
        link: None,
    };
    for run in buffer.runs() {
        writer.run(run);
    }
    writer.finish()
}

struct OpenBlock {
    id: usize,
    tag: BlockTag,
}

struct MarkupWriter<'a> {
    options: &'a DecorationOptions,
    out: String,
    containers: Vec<Container>,
    block: Option<OpenBlock>,
    link: Option<LinkTarget>,
}

impl MarkupWriter<'_> {
    fn run(&mut self, run: &Run) {
        let Some(tag) = run.tag.as_ref() else {
            self.close_link();
            self.out
                .push_str(&escape_html(run.display_text()).replace('\n', "<br>"));
            return;
        };
        match tag.node {
            NodeTag::BlockSeparator | NodeTag::QuoteMarker => return,
            // The marker opens its item even when the item has no content.
            NodeTag::ListMarker => {
                self.enter(tag);
                return;
            }
            _ => {}
        }

        self.enter(tag);
        self.sync_link(tag.marks.link.as_ref(), &run.style);
        match tag.node {
            NodeTag::LineBreak { hard: true } => self.out.push_str("<br>"),
            NodeTag::LineBreak { hard: false } => self.out.push_str(&escape_html(&run.text)),
            NodeTag::CodeBlock => self.code(run, tag),
            NodeTag::Image | NodeTag::Math { .. } if run.attachment.is_some() => {
                self.attachment(run);
            }
            _ => self.inline(run, tag),
        }
    }

    fn finish(mut self) -> String {
        self.close_link();
        self.close_block();
        self.sync_containers(&[]);
        self.out
    }

    fn enter(&mut self, tag: &SemanticTag) {
        let same_block = self.block.as_ref().is_some_and(|b| b.id == tag.block_id);
        if same_block && self.containers == tag.containers {
            return;
        }
        self.close_link();
        self.close_block();
        self.sync_containers(&tag.containers);
        self.open_block(tag);
    }

    fn sync_containers(&mut self, target: &[Container]) {
        let common = self
            .containers
            .iter()
            .zip(target)
            .take_while(|(a, b)| a == b)
            .count();
        while self.containers.len() > common {
            if let Some(container) = self.containers.pop() {
                self.out.push_str(match container {
                    Container::Quote { .. } => "</blockquote>\n",
                    Container::List { ordered: true, .. } => "</ol>\n",
                    Container::List { ordered: false, .. } => "</ul>\n",
                    Container::Item { .. } => "</li>\n",
                });
            }
        }
        for container in &target[common..] {
            self.open_container(container);
            self.containers.push(container.clone());
        }
    }

    fn open_container(&mut self, container: &Container) {
        match container {
            Container::Quote { .. } => {
                let width = self.options.quote_border_width;
                let color = self
                    .options
                    .quote_border_color
                    .and_then(color_to_hex)
                    .unwrap_or_else(|| "#d0d7de".to_string());
                let padding = (self.options.quote_indent - width).max(0.0);
                self.out.push_str(&format!(
                    "<blockquote style=\"margin:0;border-left:{}px solid {color};padding-left:{}px\">\n",
                    num(width),
                    num(padding)
                ));
            }
            Container::List { ordered, start, .. } => {
                let name = if *ordered { "ol" } else { "ul" };
                let start_attr = if *ordered && *start != 1 {
                    format!(" start=\"{start}\"")
                } else {
                    String::new()
                };
                self.out.push_str(&format!(
                    "<{name}{start_attr} style=\"margin:0;padding-left:24px\">\n"
                ));
            }
            Container::Item { .. } => self.out.push_str("<li>"),
        }
    }

    fn open_block(&mut self, tag: &SemanticTag) {
        let css = block_css(&tag.block_style);
        match &tag.block {
            BlockTag::Plain => {}
            BlockTag::Paragraph => self.out.push_str(&format!("<p style=\"{css}\">")),
            BlockTag::Heading(level) => {
                let level = (*level).clamp(1, 6);
                self.out.push_str(&format!("<h{level} style=\"{css}\">"));
            }
            BlockTag::CodeBlock { language } => {
                let class = language
                    .as_deref()
                    .map(|l| format!(" class=\"language-{}\"", escape_html(l)))
                    .unwrap_or_default();
                let mut border = String::new();
                if self.options.code_block_border_width > 0.0 {
                    let color = self
                        .options
                        .code_block_border_color
                        .and_then(color_to_hex)
                        .unwrap_or_else(|| "#d0d7de".to_string());
                    border.push_str(&format!(
                        ";border:{}px solid {color}",
                        num(self.options.code_block_border_width)
                    ));
                }
                if self.options.code_block_border_radius > 0.0 {
                    border.push_str(&format!(
                        ";border-radius:{}px",
                        num(self.options.code_block_border_radius)
                    ));
                }
                self.out.push_str(&format!(
                    "<pre style=\"{css};padding:{}px{border};white-space:pre-wrap\"><code{class}>",
                    num(self.options.code_block_padding)
                ));
            }
            BlockTag::Math => {
                self.out
                    .push_str(&format!("<div style=\"{css};text-align:center\">"));
            }
        }
        self.block = Some(OpenBlock {
            id: tag.block_id,
            tag: tag.block.clone(),
        });
    }

    fn close_block(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };
        match block.tag {
            BlockTag::Plain => {}
            BlockTag::Paragraph => self.out.push_str("</p>\n"),
            BlockTag::Heading(level) => {
                self.out
                    .push_str(&format!("</h{}>\n", level.clamp(1, 6)));
            }
            BlockTag::CodeBlock { .. } => self.out.push_str("</code></pre>\n"),
            BlockTag::Math => self.out.push_str("</div>\n"),
        }
    }

    fn sync_link(&mut self, target: Option<&LinkTarget>, style: &ResolvedStyle) {
        if self.link.as_ref() == target {
            return;
        }
        self.close_link();
        let Some(link) = target else {
            return;
        };
        let mut css = Vec::new();
        if let Some(color) = color_to_hex(style.color) {
            css.push(format!("color:{color}"));
        }
        css.push(
            if style.underline {
                "text-decoration:underline"
            } else {
                "text-decoration:none"
            }
            .to_string(),
        );
        let title = link
            .title
            .as_deref()
            .map(|t| format!(" title=\"{}\"", escape_html(t)))
            .unwrap_or_default();
        self.out.push_str(&format!(
            "<a href=\"{}\"{title} style=\"{}\">",
            escape_html(&link.destination),
            css.join(";")
        ));
        self.link = Some(link.clone());
    }

    fn close_link(&mut self) {
        if self.link.take().is_some() {
            self.out.push_str("</a>");
        }
    }

    fn inline(&mut self, run: &Run, tag: &SemanticTag) {
        let mut open = String::new();
        let mut close: Vec<&str> = Vec::new();
        if tag.marks.strong {
            open.push_str("<strong>");
            close.push("</strong>");
        }
        if tag.marks.emphasis {
            open.push_str("<em>");
            close.push("</em>");
        }

        let css = inline_css(&run.style, &tag.block_style, tag.marks.link.is_some());
        if tag.node == NodeTag::InlineCode {
            open.push_str(&format!("<code style=\"{}\">", css.join(";")));
            close.push("</code>");
        } else if !css.is_empty() {
            open.push_str(&format!("<span style=\"{}\">", css.join(";")));
            close.push("</span>");
        }

        self.out.push_str(&open);
        self.out.push_str(&escape_html(run.display_text()));
        for tag in close.iter().rev() {
            self.out.push_str(tag);
        }
    }

    /// Code block text; highlighted runs carry their own colour.
    fn code(&mut self, run: &Run, tag: &SemanticTag) {
        let text = escape_html(&run.text);
        let css = inline_css(&run.style, &tag.block_style, false);
        if css.is_empty() {
            self.out.push_str(&text);
        } else {
            self.out
                .push_str(&format!("<span style=\"{}\">{text}</span>", css.join(";")));
        }
    }

    fn attachment(&mut self, run: &Run) {
        match &run.attachment {
            Some(Attachment::Image { source, alt, title }) => {
                let title = title
                    .as_deref()
                    .map(|t| format!(" title=\"{}\"", escape_html(t)))
                    .unwrap_or_default();
                self.out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"{title} style=\"max-width:100%\">",
                    escape_html(source),
                    escape_html(alt)
                ));
            }
            Some(Attachment::Math { expression, .. }) => {
                let mut css = vec![format!("font-family:{}", css_family("monospace"))];
                if let Some(color) = color_to_hex(run.style.color) {
                    css.push(format!("color:{color}"));
                }
                self.out.push_str(&format!(
                    "<code style=\"{}\">{}</code>",
                    css.join(";"),
                    escape_html(expression)
                ));
            }
            None => {}
        }
    }
}

fn block_css(style: &ResolvedStyle) -> String {
    let mut css = vec![
        format!("font-family:{}", css_family(&style.font_family)),
        format!("font-size:{}px", num(style.font_size)),
    ];
    if style.is_bold() {
        css.push(format!("font-weight:{}", style.font_weight.0));
    }
    if style.is_italic() {
        css.push("font-style:italic".to_string());
    }
    if let Some(color) = color_to_hex(style.color) {
        css.push(format!("color:{color}"));
    }
    if let Some(bg) = style.background.and_then(color_to_hex) {
        css.push(format!("background-color:{bg}"));
    }
    if let Some(lh) = style.line_height {
        css.push(format!("line-height:{}px", num(lh)));
    }
    css.push(format!("margin:0 0 {}px 0", num(style.margin_bottom)));
    css.join(";")
}

/// Declarations where an inline run differs from its block.
fn inline_css(style: &ResolvedStyle, block: &ResolvedStyle, in_link: bool) -> Vec<String> {
    let mut css = Vec::new();
    if style.font_family != block.font_family {
        css.push(format!("font-family:{}", css_family(&style.font_family)));
    }
    if style.font_size != block.font_size {
        css.push(format!("font-size:{}px", num(style.font_size)));
    }
    if !in_link
        && style.color != block.color
        && let Some(color) = color_to_hex(style.color)
    {
        css.push(format!("color:{color}"));
    }
    if style.background != block.background
        && let Some(bg) = style.background.and_then(color_to_hex)
    {
        css.push(format!("background-color:{bg}"));
    }
    if style.underline && !block.underline && !in_link {
        css.push("text-decoration:underline".to_string());
    }
    css
}

fn css_family(family: &str) -> String {
    if family == DEFAULT_FONT_FAMILY {
        return "system-ui,sans-serif".to_string();
    }
    let generic = if is_monospace_family(family) {
        "monospace"
    } else {
        "sans-serif"
    };
    if family == generic {
        return generic.to_string();
    }
    let name = escape_html(family);
    if family.contains(' ') {
        format!("&#x27;{name}&#x27;,{generic}")
    } else {
        format!("{name},{generic}")
    }
}

fn num(v: f32) -> String {
    let r = (v * 100.0).round() / 100.0;
    if r.fract() == 0.0 {
        format!("{}", r as i64)
    } else {
        format!("{r}")
    }
}
