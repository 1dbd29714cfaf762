//! Markdown front end for richmark: parse, resolve styles, render into a styled buffer.
//!
//! ## Pipeline
//!
//! - [`parser::parse`] turns source text into an immutable [`ast::Node`] tree.
//! - [`resolve::StyleResolver`] computes a [`richmark_core::style::ResolvedStyle`] for any
//!   position from a [`config::StyleConfig`].
//! - [`render::render`] walks the tree through a [`render::RendererRegistry`] and produces a
//!   [`richmark_core::buffer::StyledBuffer`].
//!
//! Layout, decorations and output conversion live in `richmark-core` and only need the
//! buffer. [`session::MarkdownSession`] ties the pieces together for a host view.
//!
//! ```
//! use richmark_markdown::{StyleConfig, parse, render};
//! use richmark_core::convert::to_plain_text;
//!
//! let buffer = render(&parse("**hi** [link](https://example.com)"), &StyleConfig::default());
//! assert_eq!(to_plain_text(&buffer), "hi link");
//! ```
pub mod ast;
pub mod config;
pub mod parser;
pub mod render;
pub mod resolve;
pub mod session;

pub use ast::{Node, NodeKind, NodeType};
pub use config::{ConfigError, SoftBreak, StyleConfig};
pub use parser::{ParseOptions, parse, parse_with};
pub use render::{NodeRenderer, RendererRegistry, render, render_with, render_with_fonts};
pub use resolve::{ResolveParams, StyleResolver};
pub use session::MarkdownSession;
