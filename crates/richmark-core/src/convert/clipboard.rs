use super::{to_plain_text, to_portable_markup_with, to_rich_text};
use crate::buffer::{Attachment, StyledBuffer};
use crate::decoration::DecorationOptions;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipboardFormat {
    PlainText,
    Html,
    RichText,
    Markdown,
}

impl ClipboardFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ClipboardFormat::PlainText => "text/plain",
            ClipboardFormat::Html => "text/html",
            ClipboardFormat::RichText => "text/rtf",
            ClipboardFormat::Markdown => "text/markdown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub format: ClipboardFormat,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClipboardOptions {
    /// Whether the host clipboard accepts a rich-text payload.
    pub rich_text: bool,
    pub markup: DecorationOptions,
}

impl Default for ClipboardOptions {
    fn default() -> Self {
        Self {
            rich_text: true,
            markup: DecorationOptions::default(),
        }
    }
}

/// Every representation of `buffer` a host can place on its clipboard.
///
/// Plain text and HTML are always present. Rich text is included when the host supports it and
/// it was produced without error. The Markdown source is passed through verbatim, never
/// regenerated from the buffer.
pub fn to_clipboard_payloads(
    buffer: &StyledBuffer,
    original_source: Option<&str>,
    options: &ClipboardOptions,
) -> Vec<ClipboardPayload> {
    let mut out = vec![
        ClipboardPayload {
            format: ClipboardFormat::PlainText,
            content: to_plain_text(buffer),
        },
        ClipboardPayload {
            format: ClipboardFormat::Html,
            content: to_portable_markup_with(buffer, &options.markup),
        },
    ];

    if options.rich_text {
        match to_rich_text(buffer) {
            Ok(content) => out.push(ClipboardPayload {
                format: ClipboardFormat::RichText,
                content,
            }),
            Err(e) => tracing::debug!(error = %e, "Omitting rich text clipboard payload"),
        }
    }

    if let Some(source) = original_source {
        out.push(ClipboardPayload {
            format: ClipboardFormat::Markdown,
            content: source.to_string(),
        });
    }
    out
}

/// Destinations of all image attachments, in document order.
pub fn image_sources(buffer: &StyledBuffer) -> Vec<&str> {
    buffer
        .runs()
        .iter()
        .filter_map(|run| match &run.attachment {
            Some(Attachment::Image { source, .. }) => Some(source.as_str()),
            _ => None,
        })
        .collect()
}
