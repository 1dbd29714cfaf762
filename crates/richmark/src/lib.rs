//! Render Markdown into styled text, then derive HTML, RTF and clipboard payloads from it.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`core`]: styled buffer, font cache, layout, decorations, converters.
//! - [`markdown`] (feature `markdown`, on by default): parser, style configuration, renderer
//!   dispatch and [`MarkdownSession`].
//!
//! ## Features
//!
//! - `serde`: deserialize core style types.
//! - `system-fonts`: font acquisition from the platform font database.
//! - `syntect`: code block highlighting through `core::highlight::SyntectHighlighter`.
pub use richmark_core as core;

pub use richmark_core::buffer::StyledBuffer;
pub use richmark_core::convert;
pub use richmark_core::style::ResolvedStyle;

#[cfg(feature = "markdown")]
pub use richmark_markdown as markdown;

#[cfg(feature = "markdown")]
pub use richmark_markdown::{MarkdownSession, StyleConfig, parse, render};
