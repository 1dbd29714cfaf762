//! Builds the [`Node`] tree from pulldown-cmark events.
//!
//! Parsing never fails. Events with no counterpart in [`NodeKind`] are dropped, and container
//! events without a counterpart (tables, footnote definitions, strikethrough) contribute their
//! children to the enclosing node. An end event closes every frame opened after its matching
//! start, so a badly nested stream still produces a well-formed tree.

use crate::ast::{Node, NodeKind};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use url::Url;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Base used to resolve relative link and image destinations.
    pub base_url: Option<String>,
}

pub fn parse(source: &str) -> Node {
    parse_with(source, &ParseOptions::default())
}

pub fn parse_with(source: &str, options: &ParseOptions) -> Node {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts.insert(Options::ENABLE_MATH);
    parse_events(Parser::new_ext(source, opts), options)
}

/// Assembles a tree from any event stream, repairing bad nesting.
pub fn parse_events<'a, I>(events: I, options: &ParseOptions) -> Node
where
    I: IntoIterator<Item = Event<'a>>,
{
    let mut b = TreeBuilder::new(options);
    for ev in events {
        match ev {
            Event::Start(tag) => b.start(tag),
            Event::End(end) => b.end(end_key(&end)),
            Event::Text(text) => b.text(&text),
            Event::Code(code) => b.leaf(NodeKind::InlineCode {
                literal: code.to_string(),
            }),
            Event::InlineMath(math) => b.leaf(NodeKind::Math {
                display: false,
                literal: math.to_string(),
            }),
            Event::DisplayMath(math) => b.leaf(NodeKind::Math {
                display: true,
                literal: math.to_string(),
            }),
            Event::SoftBreak => b.leaf(NodeKind::LineBreak { hard: false }),
            Event::HardBreak => b.leaf(NodeKind::LineBreak { hard: true }),
            other => tracing::trace!(event = ?other, "Dropping unmapped markdown event"),
        }
    }
    b.finish()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKey {
    Document,
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    List,
    Item,
    Emphasis,
    Strong,
    Link,
    Image,
    Unmapped(&'static str),
}

struct Frame {
    key: FrameKey,
    kind: Option<NodeKind>,
    children: Vec<Node>,
    /// Literal of a code block, or alt text of an image.
    text: String,
}

impl Frame {
    fn new(key: FrameKey, kind: Option<NodeKind>) -> Self {
        Self {
            key,
            kind,
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn collects_text(&self) -> bool {
        matches!(self.key, FrameKey::CodeBlock | FrameKey::Image)
    }
}

struct TreeBuilder<'o> {
    options: &'o ParseOptions,
    stack: Vec<Frame>,
}

impl<'o> TreeBuilder<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            stack: vec![Frame::new(FrameKey::Document, Some(NodeKind::Document))],
        }
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn start(&mut self, tag: Tag<'_>) {
        let (key, kind) = match tag {
            Tag::Paragraph => (FrameKey::Paragraph, Some(NodeKind::Paragraph)),
            Tag::Heading { level, .. } => (
                FrameKey::Heading,
                Some(NodeKind::Heading {
                    level: heading_level(level),
                }),
            ),
            Tag::BlockQuote(_) => (FrameKey::BlockQuote, Some(NodeKind::Blockquote)),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => normalize_fenced_lang(&lang),
                    CodeBlockKind::Indented => None,
                };
                (
                    FrameKey::CodeBlock,
                    Some(NodeKind::CodeBlock {
                        language,
                        literal: String::new(),
                    }),
                )
            }
            Tag::List(start) => (
                FrameKey::List,
                Some(NodeKind::List {
                    ordered: start.is_some(),
                    start: start.unwrap_or(1),
                }),
            ),
            Tag::Item => (FrameKey::Item, Some(NodeKind::ListItem)),
            Tag::Emphasis => (FrameKey::Emphasis, Some(NodeKind::Emphasis)),
            Tag::Strong => (FrameKey::Strong, Some(NodeKind::Strong)),
            Tag::Link {
                dest_url, title, ..
            } => (
                FrameKey::Link,
                Some(NodeKind::Link {
                    destination: resolve_url(self.options.base_url.as_deref(), &dest_url),
                    title: non_empty(&title),
                }),
            ),
            Tag::Image {
                dest_url, title, ..
            } => (
                FrameKey::Image,
                Some(NodeKind::Image {
                    source: resolve_url(self.options.base_url.as_deref(), &dest_url),
                    alt: String::new(),
                    title: non_empty(&title),
                }),
            ),
            // Table rows read as one paragraph each; cells are separated by a space.
            Tag::TableHead => (FrameKey::Unmapped("table_head"), Some(NodeKind::Paragraph)),
            Tag::TableRow => (FrameKey::Unmapped("table_row"), Some(NodeKind::Paragraph)),
            Tag::TableCell => {
                let row = self.top();
                if !row.children.is_empty() {
                    row.children.push(Node::text(" "));
                }
                (FrameKey::Unmapped("table_cell"), None)
            }
            other => (unmapped_key(&other), None),
        };
        // Markup inside alt text only contributes its literal text.
        let kind = if self.text_sink().is_some() { None } else { kind };
        self.stack.push(Frame::new(key, kind));
    }

    fn end(&mut self, key: FrameKey) {
        let Some(pos) = self.stack.iter().rposition(|f| f.key == key) else {
            tracing::trace!(?key, "Dropping end event without a matching start");
            return;
        };
        if pos == 0 {
            return;
        }
        if self.stack.len() - pos > 1 {
            tracing::trace!(?key, open = self.stack.len() - pos - 1, "Closing mis-nested nodes");
        }
        while self.stack.len() > pos {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let Frame {
            kind,
            children,
            text,
            ..
        } = frame;
        let Some(kind) = kind else {
            // A nested image inside alt text hands its own alt text outward.
            if !text.is_empty()
                && let Some(sink) = self.text_sink()
            {
                sink.push_str(&text);
            }
            self.top().children.extend(children);
            return;
        };
        let kind = match kind {
            NodeKind::CodeBlock { language, .. } => NodeKind::CodeBlock {
                language,
                literal: text,
            },
            NodeKind::Image { source, title, .. } => NodeKind::Image {
                source,
                alt: text,
                title,
            },
            kind => kind,
        };
        self.top().children.push(Node::new(kind, children));
    }

    /// Nearest open frame that gathers literal text instead of child nodes.
    fn text_sink(&mut self) -> Option<&mut String> {
        self.stack
            .iter_mut()
            .rev()
            .find(|f| f.collects_text())
            .map(|f| &mut f.text)
    }

    fn text(&mut self, text: &str) {
        if let Some(sink) = self.text_sink() {
            sink.push_str(text);
            return;
        }
        self.top().children.push(Node::text(text));
    }

    fn leaf(&mut self, kind: NodeKind) {
        if let Some(sink) = self.text_sink() {
            match &kind {
                NodeKind::InlineCode { literal } | NodeKind::Math { literal, .. } => {
                    sink.push_str(literal);
                }
                NodeKind::LineBreak { .. } => sink.push(' '),
                _ => {}
            }
            return;
        }
        self.top().children.push(Node::leaf(kind));
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close_top();
        }
        let root = self.stack.pop().map(|f| f.children).unwrap_or_default();
        Node::document(root)
    }
}

fn end_key(end: &TagEnd) -> FrameKey {
    match end {
        TagEnd::Paragraph => FrameKey::Paragraph,
        TagEnd::Heading(_) => FrameKey::Heading,
        TagEnd::BlockQuote(_) => FrameKey::BlockQuote,
        TagEnd::CodeBlock => FrameKey::CodeBlock,
        TagEnd::List(_) => FrameKey::List,
        TagEnd::Item => FrameKey::Item,
        TagEnd::Emphasis => FrameKey::Emphasis,
        TagEnd::Strong => FrameKey::Strong,
        TagEnd::Link => FrameKey::Link,
        TagEnd::Image => FrameKey::Image,
        TagEnd::TableHead => FrameKey::Unmapped("table_head"),
        TagEnd::TableRow => FrameKey::Unmapped("table_row"),
        TagEnd::TableCell => FrameKey::Unmapped("table_cell"),
        TagEnd::Table => FrameKey::Unmapped("table"),
        TagEnd::Strikethrough => FrameKey::Unmapped("strikethrough"),
        TagEnd::FootnoteDefinition => FrameKey::Unmapped("footnote_definition"),
        TagEnd::HtmlBlock => FrameKey::Unmapped("html_block"),
        _ => FrameKey::Unmapped("other"),
    }
}

fn unmapped_key(tag: &Tag<'_>) -> FrameKey {
    match tag {
        Tag::Table(_) => FrameKey::Unmapped("table"),
        Tag::Strikethrough => FrameKey::Unmapped("strikethrough"),
        Tag::FootnoteDefinition(_) => FrameKey::Unmapped("footnote_definition"),
        Tag::HtmlBlock => FrameKey::Unmapped("html_block"),
        _ => FrameKey::Unmapped("other"),
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn non_empty(s: &CowStr<'_>) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn normalize_fenced_lang(lang: &CowStr<'_>) -> Option<String> {
    let first = lang.trim().split_whitespace().next().unwrap_or("");
    let first = first.split(',').next().unwrap_or("").trim();
    let first = first.strip_prefix("language-").unwrap_or(first);
    let first = first.strip_prefix('{').unwrap_or(first);
    let first = first.strip_suffix('}').unwrap_or(first).trim();
    (!first.is_empty()).then(|| first.to_string())
}

fn resolve_url(base_url: Option<&str>, dest: &str) -> String {
    let dest = dest.trim();
    if dest.is_empty() || is_absolute_url(dest) {
        return dest.to_string();
    }
    let Some(base) = base_url.map(str::trim).filter(|s| !s.is_empty()) else {
        return dest.to_string();
    };

    if let Ok(base) = Url::parse(base) {
        return base
            .join(dest)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| dest.to_string());
    }

    let base = base.trim_end_matches(['/', '\\']);
    let dest = dest.trim_start_matches("./").trim_start_matches('/');
    format!("{base}/{dest}")
}

fn is_absolute_url(dest: &str) -> bool {
    dest.starts_with('#')
        || dest.starts_with('/')
        || Url::parse(dest).is_ok_and(|u| !u.cannot_be_a_base() || u.scheme() == "mailto")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeType;

    fn kinds(node: &Node) -> Vec<NodeType> {
        node.walk().map(Node::node_type).collect()
    }

    fn first_block(doc: &Node) -> &Node {
        &doc.children()[0]
    }

    #[test]
    fn blank_input_is_an_empty_document() {
        let doc = parse("");
        assert_eq!(doc.kind(), &NodeKind::Document);
        assert!(doc.is_empty());
        assert!(parse("   \n\n").is_empty());
    }

    #[test]
    fn nested_inline_marks() {
        let doc = parse("**_bold italic_**");
        assert_eq!(
            kinds(&doc),
            vec![
                NodeType::Document,
                NodeType::Paragraph,
                NodeType::Strong,
                NodeType::Emphasis,
                NodeType::Text,
            ]
        );
    }

    #[test]
    fn heading_levels_map_one_to_six() {
        let doc = parse("# a\n## b\n### c\n#### d\n##### e\n###### f\n");
        let levels = doc
            .children()
            .iter()
            .map(|n| match n.kind() {
                NodeKind::Heading { level } => *level,
                _ => 0,
            })
            .collect::<Vec<_>>();
        assert_eq!(levels, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn fenced_code_keeps_literal_and_normalizes_language() {
        let doc = parse("```{language-rust}\nfn main() {}\n```\n");
        assert_eq!(
            first_block(&doc).kind(),
            &NodeKind::CodeBlock {
                language: Some("rust".into()),
                literal: "fn main() {}\n".into(),
            }
        );
    }

    #[test]
    fn image_alt_text_is_collected() {
        let doc = parse("![a *cat* `pic`](cat.png \"Cat\")");
        let image = &first_block(&doc).children()[0];
        assert_eq!(
            image.kind(),
            &NodeKind::Image {
                source: "cat.png".into(),
                alt: "a cat pic".into(),
                title: Some("Cat".into()),
            }
        );
        assert!(image.is_empty());
    }

    #[test]
    fn nested_image_alt_text_is_kept() {
        let doc = parse("![a ![b](x.png) c](y.png)");
        let paragraph = first_block(&doc);
        assert_eq!(paragraph.children().len(), 1);
        assert_eq!(
            paragraph.children()[0].kind(),
            &NodeKind::Image {
                source: "y.png".into(),
                alt: "a b c".into(),
                title: None,
            }
        );
    }

    #[test]
    fn empty_fence_is_an_empty_code_block() {
        let doc = parse("```\n```\n");
        assert_eq!(
            first_block(&doc).kind(),
            &NodeKind::CodeBlock {
                language: None,
                literal: String::new(),
            }
        );
    }

    #[test]
    fn ordered_list_start_is_kept() {
        let doc = parse("3. a\n4. b\n");
        let list = first_block(&doc);
        assert_eq!(
            list.kind(),
            &NodeKind::List {
                ordered: true,
                start: 3
            }
        );
        assert_eq!(list.children().len(), 2);
    }

    #[test]
    fn html_and_rules_are_dropped() {
        let doc = parse("a <b>x</b>\n\n---\n");
        assert_eq!(doc.children().len(), 1);
        assert_eq!(doc.plain_text(), "a x");
    }

    #[test]
    fn tables_degrade_to_paragraph_rows() {
        let doc = parse("| a | b |\n|---|---|\n| 1 | 2 |\n");
        let rows = doc
            .children()
            .iter()
            .map(|n| (n.node_type(), n.plain_text()))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec![
                (NodeType::Paragraph, "a b".to_string()),
                (NodeType::Paragraph, "1 2".to_string()),
            ]
        );
    }

    #[test]
    fn math_events_become_math_nodes() {
        let doc = parse("$x^2$");
        assert_eq!(
            first_block(&doc).children()[0].kind(),
            &NodeKind::Math {
                display: false,
                literal: "x^2".into(),
            }
        );
    }

    #[test]
    fn mis_nested_end_closes_open_children() {
        let events = vec![
            Event::Start(Tag::Paragraph),
            Event::Start(Tag::Emphasis),
            Event::Text("a".into()),
            Event::End(TagEnd::Paragraph),
            Event::End(TagEnd::Emphasis),
            Event::Text("b".into()),
        ];
        let doc = parse_events(events, &ParseOptions::default());
        assert_eq!(
            kinds(&doc),
            vec![
                NodeType::Document,
                NodeType::Paragraph,
                NodeType::Emphasis,
                NodeType::Text,
                NodeType::Text,
            ]
        );
        assert_eq!(doc.children().len(), 2);
    }

    #[test]
    fn unterminated_frames_are_closed_at_end_of_input() {
        let events = vec![Event::Start(Tag::Strong), Event::Text("x".into())];
        let doc = parse_events(events, &ParseOptions::default());
        assert_eq!(
            kinds(&doc),
            vec![NodeType::Document, NodeType::Strong, NodeType::Text]
        );
    }

    #[test]
    fn parse_is_deterministic() {
        let src = "# T\n\n> quote *em*\n\n- a\n- b\n\n```\ncode\n```\n";
        assert_eq!(parse(src), parse(src));
    }

    #[test]
    fn relative_destinations_resolve_against_base_url() {
        let options = ParseOptions {
            base_url: Some("https://example.com/docs/".into()),
        };
        let doc = parse_with("[a](guide.md) [b](https://x.dev) [c](#top)", &options);
        let dests = doc
            .walk()
            .filter_map(|n| match n.kind() {
                NodeKind::Link { destination, .. } => Some(destination.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            dests,
            vec!["https://example.com/docs/guide.md", "https://x.dev", "#top"]
        );
    }
}
