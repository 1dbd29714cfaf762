//! Pure conversions from a finished [`StyledBuffer`](crate::buffer::StyledBuffer) into other
//! representations.
//!
//! Converters read only runs and their semantic tags. None of them re-walk the document tree,
//! so they can be tested with hand-built buffers.

mod clipboard;
mod markup;
mod plain;
mod rtf;

pub use clipboard::{
    ClipboardFormat, ClipboardOptions, ClipboardPayload, image_sources, to_clipboard_payloads,
};
pub use markup::{escape_html, to_portable_markup, to_portable_markup_with};
pub use plain::to_plain_text;
pub use rtf::to_rich_text;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to format output: {0}")]
    Format(#[from] std::fmt::Error),
}
