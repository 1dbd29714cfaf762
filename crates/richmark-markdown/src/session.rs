//! A render session: one document, one style configuration, one rendered buffer.
//!
//! The session re-renders eagerly whenever its source or style changes, and exposes
//! [`MarkdownSession::measure_key`] as the host's remeasurement signal.
//!
//! Several sessions may share one [`FontCache`]. Entries are keyed by every font attribute, so
//! sessions with different configurations coexist in it; only [`MarkdownSession::set_style`]
//! and [`MarkdownSession::invalidate_metrics`] clear it.

use crate::ast::Node;
use crate::config::StyleConfig;
use crate::parser::{ParseOptions, parse_with};
use crate::render::{RendererRegistry, render_with_fonts};
use richmark_core::buffer::{LinkTarget, StyledBuffer};
use richmark_core::convert::{ClipboardOptions, ClipboardPayload, to_clipboard_payloads};
use richmark_core::decoration::{Decorations, decorate};
use richmark_core::font::FontCache;
use richmark_core::layout::{TextLayout, layout, offset_at};
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug)]
pub struct MarkdownSession {
    source: String,
    parse_options: ParseOptions,
    document: Node,
    config: Arc<StyleConfig>,
    fonts: Arc<FontCache>,
    registry: RendererRegistry,
    buffer: StyledBuffer,
    measure_key: u64,
}

impl Default for MarkdownSession {
    fn default() -> Self {
        Self::new(Arc::new(StyleConfig::default()))
    }
}

impl MarkdownSession {
    pub fn new(config: Arc<StyleConfig>) -> Self {
        Self::with_font_cache(config, Arc::new(FontCache::default()))
    }

    /// Creates a session sharing `fonts` with other sessions.
    pub fn with_font_cache(config: Arc<StyleConfig>, fonts: Arc<FontCache>) -> Self {
        Self {
            source: String::new(),
            parse_options: ParseOptions::default(),
            document: Node::document(Vec::new()),
            config,
            fonts,
            registry: RendererRegistry::with_defaults(),
            buffer: StyledBuffer::new(),
            measure_key: 0,
        }
    }

    pub fn with_registry(mut self, registry: RendererRegistry) -> Self {
        self.registry = registry;
        self.rerender();
        self
    }

    /// Sets parse options. Takes effect immediately by re-parsing the current source.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self.document = parse_with(&self.source, &self.parse_options);
        self.rerender();
        self
    }

    /// Replaces the source, re-parsing and re-rendering.
    pub fn set_markdown(&mut self, source: &str) {
        self.source = source.to_string();
        self.document = parse_with(&self.source, &self.parse_options);
        self.rerender();
    }

    /// Replaces the style configuration.
    ///
    /// Passing the `Arc` already in use is a no-op. Any other `Arc`, even one holding an equal
    /// value, invalidates the font cache.
    pub fn set_style(&mut self, config: Arc<StyleConfig>) {
        if Arc::ptr_eq(&self.config, &config) {
            return;
        }
        self.config = config;
        self.fonts.invalidate();
        self.rerender();
    }

    /// Drops cached fonts and metrics, e.g. after the platform's fonts changed.
    ///
    /// The content is unchanged but prior measurements are stale, so the measure key moves.
    pub fn invalidate_metrics(&mut self) {
        self.fonts.invalidate();
        self.measure_key += 1;
    }

    /// Cache-busting key for host measurement. Increases on every change that can alter the
    /// rendered size.
    pub fn measure_key(&self) -> u64 {
        self.measure_key
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn document(&self) -> &Node {
        &self.document
    }

    pub fn config(&self) -> &Arc<StyleConfig> {
        &self.config
    }

    pub fn fonts(&self) -> &Arc<FontCache> {
        &self.fonts
    }

    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    pub fn buffer(&self) -> &StyledBuffer {
        &self.buffer
    }

    /// Reference line layout of the current buffer.
    pub fn layout(&self, max_width: Option<f32>) -> TextLayout {
        layout(&self.buffer, &self.fonts, max_width)
    }

    /// Link under byte `offset` of the rendered text.
    pub fn link_at(&self, offset: usize) -> Option<&LinkTarget> {
        self.buffer.link_at(offset)
    }

    /// Link under the point `(x, y)` of the reference layout at `max_width`.
    pub fn link_at_point(&self, x: f32, y: f32, max_width: Option<f32>) -> Option<&LinkTarget> {
        let geometry = self.layout(max_width);
        let offset = offset_at(&self.buffer, &geometry, &self.fonts, x, y)?;
        self.buffer.link_at(offset)
    }

    /// Lays out the buffer and computes its decorations.
    pub fn decorations(&self, max_width: Option<f32>) -> Decorations {
        let geometry = self.layout(max_width);
        decorate(&self.buffer, &geometry, &self.config.decoration_options())
    }

    /// Clipboard options matching this session's configuration.
    pub fn clipboard_options(&self) -> ClipboardOptions {
        ClipboardOptions {
            markup: self.config.decoration_options(),
            ..ClipboardOptions::default()
        }
    }

    /// Clipboard payloads for the byte range `range` of the rendered text.
    ///
    /// The Markdown source is only attached when the whole document is selected; a partial
    /// selection has no corresponding source text.
    pub fn copy(&self, range: Range<usize>) -> Vec<ClipboardPayload> {
        let whole = range.start == 0 && range.end >= self.buffer.len();
        let selection = if whole {
            self.buffer.clone()
        } else {
            self.buffer.slice(range)
        };
        let source = whole.then_some(self.source.as_str());
        to_clipboard_payloads(&selection, source, &self.clipboard_options())
    }

    /// Payloads for the whole document.
    pub fn copy_all(&self) -> Vec<ClipboardPayload> {
        self.copy(0..self.buffer.len())
    }

    fn rerender(&mut self) {
        self.buffer =
            render_with_fonts(&self.document, &self.config, &self.registry, &self.fonts);
        self.measure_key += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use richmark_core::convert::ClipboardFormat;

    #[test]
    fn every_change_bumps_measure_key() {
        let mut session = MarkdownSession::default();
        let k0 = session.measure_key();

        session.set_markdown("hello");
        let k1 = session.measure_key();
        assert!(k1 > k0);

        session.set_markdown("hello");
        let k2 = session.measure_key();
        assert!(k2 > k1);

        session.set_style(Arc::new(StyleConfig::default()));
        let k3 = session.measure_key();
        assert!(k3 > k2);

        session.invalidate_metrics();
        assert!(session.measure_key() > k3);
    }

    #[test]
    fn same_config_arc_is_a_noop() {
        let config = Arc::new(StyleConfig::default());
        let mut session = MarkdownSession::new(config.clone());
        session.set_markdown("x");
        let key = session.measure_key();
        session.set_style(config);
        assert_eq!(session.measure_key(), key);
    }

    #[test]
    fn new_config_invalidates_cached_fonts() {
        let mut session = MarkdownSession::default();
        session.set_markdown("text");
        let _ = session.layout(None);
        assert!(!session.fonts().is_empty());
        let generation = session.fonts().generation();

        session.set_style(Arc::new(StyleConfig::default()));
        assert!(session.fonts().is_empty());
        assert!(session.fonts().generation() > generation);
    }

    #[test]
    fn sessions_sharing_a_cache_do_not_clear_each_other() {
        let fonts = Arc::new(FontCache::default());
        let mut big = StyleConfig::default();
        big.base.font_size = Some(24.0);

        let small = Arc::new(StyleConfig::default());
        let mut a = MarkdownSession::with_font_cache(small, fonts.clone());
        let mut b = MarkdownSession::with_font_cache(Arc::new(big), fonts.clone());
        a.set_markdown("small");
        b.set_markdown("large");
        let generation = fonts.generation();

        let _ = a.layout(None);
        let held = fonts.font_for(&a.buffer().runs()[0].style);
        let _ = b.layout(None);
        let _ = a.layout(Some(200.0));

        assert_eq!(fonts.generation(), generation);
        assert_eq!(fonts.len(), 2);
        assert!(held.ptr_eq(&fonts.font_for(&a.buffer().runs()[0].style)));
    }

    #[test]
    fn links_are_found_by_offset_and_point() {
        let mut session = MarkdownSession::default();
        session.set_markdown("go [here](https://example.com) now");

        assert_eq!(session.link_at(0), None);
        let link = session.link_at(3).map(|l| l.destination.as_str());
        assert_eq!(link, Some("https://example.com"));

        // Body text is 16pt in a proportional family: 8pt per column.
        let at = |x: f32| session.link_at_point(x, 1.0, None).map(|l| l.destination.clone());
        assert_eq!(at(4.0), None);
        assert_eq!(at(3.0 * 8.0 + 1.0).as_deref(), Some("https://example.com"));
        assert_eq!(at(6.0 * 8.0 + 1.0).as_deref(), Some("https://example.com"));
        assert_eq!(at(7.0 * 8.0 + 1.0), None);
        assert_eq!(session.link_at_point(1.0, 500.0, None), None);
    }

    #[test]
    fn partial_copy_omits_markdown_source() {
        let mut session = MarkdownSession::default();
        session.set_markdown("**bold** text");

        let all = session.copy_all();
        assert!(all.iter().any(|p| p.format == ClipboardFormat::Markdown));

        let part = session.copy(0..4);
        assert!(part.iter().all(|p| p.format != ClipboardFormat::Markdown));
        assert_eq!(part[0].content, "bold");
    }

    #[test]
    fn parse_options_apply_to_current_source() {
        let mut session = MarkdownSession::default();
        session.set_markdown("[a](docs/x.md)");
        let session = session.with_parse_options(ParseOptions {
            base_url: Some("https://example.com/".into()),
        });
        let link = session.buffer().runs()[0]
            .tag
            .as_ref()
            .and_then(|t| t.marks.link.clone())
            .map(|l| l.destination);
        assert_eq!(link.as_deref(), Some("https://example.com/docs/x.md"));
    }
}
