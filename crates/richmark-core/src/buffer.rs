//! The styled-text buffer: an ordered, gap-free sequence of styled runs.
//!
//! Every run optionally carries a [`SemanticTag`] describing the node that emitted it. The
//! decoration pass and the output converters work from these tags alone, so they never need
//! the document tree.

use crate::style::ResolvedStyle;
use ratatui::text::{Line, Span, Text};
use std::ops::Range;
use std::sync::Arc;

/// Object replacement character used as the text of attachment runs.
pub const ATTACHMENT_CHAR: char = '\u{FFFC}';
pub const ATTACHMENT_STR: &str = "\u{FFFC}";

/// The node kind that produced a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Text,
    InlineCode,
    CodeBlock,
    Image,
    Math { display: bool },
    LineBreak { hard: bool },
    ListMarker,
    QuoteMarker,
    BlockSeparator,
}

/// The innermost leaf block a run belongs to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockTag {
    /// Inline content that is not wrapped in a paragraph (tight list items, bare document text).
    #[default]
    Plain,
    Paragraph,
    Heading(u8),
    CodeBlock {
        language: Option<String>,
    },
    Math,
}

/// One enclosing container, outermost first in [`SemanticTag::containers`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Container {
    Quote { id: usize },
    List { id: usize, ordered: bool, start: u64 },
    Item { id: usize, number: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LinkTarget {
    pub destination: String,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct InlineMarks {
    pub emphasis: bool,
    pub strong: bool,
    pub code: bool,
    pub link: Option<LinkTarget>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SemanticTag {
    pub node: NodeTag,
    pub block: BlockTag,
    pub block_id: usize,
    /// Resolved style of the enclosing block; inline runs are expressed relative to it.
    pub block_style: Arc<ResolvedStyle>,
    pub containers: Vec<Container>,
    pub marks: InlineMarks,
}

impl SemanticTag {
    pub fn quote_depth(&self) -> usize {
        self.containers
            .iter()
            .filter(|c| matches!(c, Container::Quote { .. }))
            .count()
    }

    pub fn quote_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.containers.iter().filter_map(|c| match c {
            Container::Quote { id } => Some(*id),
            _ => None,
        })
    }
}

/// Non-text content occupying a single [`ATTACHMENT_CHAR`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attachment {
    Image {
        source: String,
        alt: String,
        title: Option<String>,
    },
    Math {
        expression: String,
        display: bool,
    },
}

impl Attachment {
    /// Textual stand-in: alt text for images, the raw expression for math.
    pub fn fallback_text(&self) -> &str {
        match self {
            Attachment::Image { alt, .. } => alt,
            Attachment::Math { expression, .. } => expression,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: ResolvedStyle,
    pub tag: Option<SemanticTag>,
    pub attachment: Option<Attachment>,
}

impl Run {
    pub fn new(text: impl Into<String>, style: ResolvedStyle) -> Self {
        Self {
            text: text.into(),
            style,
            tag: None,
            attachment: None,
        }
    }

    pub fn attachment(attachment: Attachment, style: ResolvedStyle) -> Self {
        Self {
            text: ATTACHMENT_STR.to_string(),
            style,
            tag: None,
            attachment: Some(attachment),
        }
    }

    pub fn with_tag(mut self, tag: SemanticTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn node(&self) -> Option<NodeTag> {
        self.tag.as_ref().map(|t| t.node)
    }

    pub fn is_separator(&self) -> bool {
        self.node() == Some(NodeTag::BlockSeparator)
    }

    /// A zero-length code block run. It is the only empty run a buffer stores, so an empty
    /// fenced block still has a position for decorations and markup.
    pub fn is_empty_code_block(&self) -> bool {
        self.text.is_empty() && self.node() == Some(NodeTag::CodeBlock)
    }

    /// What a reader sees: the run text, or the attachment's fallback text.
    pub fn display_text(&self) -> &str {
        match &self.attachment {
            Some(a) => a.fallback_text(),
            None => &self.text,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyledBuffer {
    runs: Vec<Run>,
    len: usize,
}

impl StyledBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a run. Empty runs are discarded, except [`Run::is_empty_code_block`].
    pub fn push(&mut self, run: Run) {
        if run.text.is_empty() && !run.is_empty_code_block() {
            return;
        }
        self.len += run.text.len();
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn into_runs(self) -> Vec<Run> {
        self.runs
    }

    /// Byte length of the rendered text.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len);
        for run in &self.runs {
            out.push_str(&run.text);
        }
        out
    }

    /// Each run with its byte range in [`StyledBuffer::text`].
    pub fn ranges(&self) -> impl Iterator<Item = (Range<usize>, &Run)> + '_ {
        let mut global = 0usize;
        self.runs.iter().map(move |run| {
            let start = global;
            global += run.text.len();
            (start..global, run)
        })
    }

    /// The run covering byte `offset` of [`StyledBuffer::text`].
    pub fn run_at(&self, offset: usize) -> Option<&Run> {
        self.ranges()
            .find(|(span, _)| span.contains(&offset))
            .map(|(_, run)| run)
    }

    /// Link target of the text at byte `offset`.
    pub fn link_at(&self, offset: usize) -> Option<&LinkTarget> {
        self.run_at(offset)?.tag.as_ref()?.marks.link.as_ref()
    }

    /// Tag of the last run that is not a block separator.
    pub fn last_semantic_tag(&self) -> Option<&SemanticTag> {
        self.runs
            .iter()
            .rev()
            .filter(|r| !r.is_separator())
            .find_map(|r| r.tag.as_ref())
    }

    /// Copies the runs overlapping `range`, cutting partial runs at char boundaries.
    ///
    /// Attachment runs are kept whole or dropped; they cannot be split.
    pub fn slice(&self, range: Range<usize>) -> StyledBuffer {
        let mut out = StyledBuffer::new();
        if range.start >= range.end {
            return out;
        }

        for (span, run) in self.ranges() {
            if range.end <= span.start {
                break;
            }
            if range.start >= span.end {
                continue;
            }

            let s = run.text.as_str();
            let lo = floor_char_boundary(s, range.start.saturating_sub(span.start).min(s.len()));
            let hi = floor_char_boundary(s, range.end.saturating_sub(span.start).min(s.len()));
            if lo >= hi {
                continue;
            }
            if run.attachment.is_some() && (lo, hi) != (0, s.len()) {
                continue;
            }

            let mut piece = run.clone();
            piece.text = s[lo..hi].to_string();
            out.push(piece);
        }
        out
    }

    /// Hands the buffer to a ratatui host, one [`Line`] per newline-separated line.
    pub fn to_text(&self) -> Text<'static> {
        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut current: Vec<Span<'static>> = Vec::new();

        for run in &self.runs {
            let style = run.style.to_ratatui();
            if run.attachment.is_some() {
                current.push(Span::styled(run.display_text().to_string(), style));
                continue;
            }
            let mut parts = run.text.split('\n').peekable();
            while let Some(part) = parts.next() {
                if !part.is_empty() {
                    current.push(Span::styled(part.to_string(), style));
                }
                if parts.peek().is_some() {
                    lines.push(Line::from(std::mem::take(&mut current)));
                }
            }
        }
        if !current.is_empty() {
            lines.push(Line::from(current));
        }
        Text::from(lines)
    }
}

impl FromIterator<Run> for StyledBuffer {
    fn from_iter<I: IntoIterator<Item = Run>>(iter: I) -> Self {
        let mut out = StyledBuffer::new();
        for run in iter {
            out.push(run);
        }
        out
    }
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
