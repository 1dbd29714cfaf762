//! `richmark-core` holds the host-neutral half of the richmark pipeline.
//!
//! Nothing here knows about Markdown. The markdown crate renders a document into a
//! [`buffer::StyledBuffer`]; everything downstream of that lives in this crate.
//!
//! ## Pieces
//!
//! - [`style::ResolvedStyle`]: concrete attributes for one rendered node.
//! - [`buffer::StyledBuffer`]: gap-free runs with semantic tags and attachments.
//! - [`font::FontCache`]: memoized font handles and metrics, shared across sessions.
//! - [`layout::layout`]: reference line geometry for hosts without their own text system.
//! - [`decoration::decorate`]: code-block backgrounds and quote borders from final geometry.
//! - [`convert`]: plain text, portable HTML, RTF and clipboard payloads.
//! - [`highlight`]: the code highlighting seam, backed by syntect with the `syntect` feature.
//!
//! ## Terminal hosts
//!
//! [`buffer::StyledBuffer::to_text`] converts a buffer into a ratatui `Text`, approximating
//! sizes and families with modifiers.
pub mod buffer;
pub mod convert;
pub mod decoration;
pub mod font;
pub mod highlight;
pub mod layout;
pub mod style;

pub use convert::ConvertError;
