//! Renderer dispatch: walks the tree and asks one [`NodeRenderer`] per node kind to append runs.
//!
//! Renderers are looked up in a [`RendererRegistry`] keyed by [`NodeType`]. Container renderers
//! recurse through the [`Dispatcher`], which derives each child's [`RenderContext`] (resolved
//! style, nesting depths, enclosing block and link) so no renderer mutates shared state.
//!
//! Runs are appended in pre-order. Consecutive siblings are joined by one `"\n"` separator run
//! whenever either of them is a block.

mod blocks;
mod inline;

pub use blocks::{BlockquoteRenderer, CodeBlockRenderer, ContainerRenderer, ListItemRenderer};
pub use inline::{
    ImageRenderer, InlineCodeRenderer, LineBreakRenderer, MathRenderer, TextRenderer,
};

use crate::ast::{Node, NodeKind, NodeType};
use crate::config::StyleConfig;
use crate::resolve::{ResolveParams, StyleResolver};
use richmark_core::buffer::{
    BlockTag, Container, InlineMarks, LinkTarget, NodeTag, Run, SemanticTag, StyledBuffer,
};
use richmark_core::font::FontCache;
use richmark_core::highlight::CodeHighlighter;
use richmark_core::style::ResolvedStyle;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Renders one node kind.
///
/// Implementations append runs for `node` using `cx`, and render children through `dispatch`.
pub trait NodeRenderer: Send + Sync {
    fn render<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        dispatch: &Dispatcher<'_>,
    );
}

#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<NodeType, Arc<dyn NodeRenderer>>,
}

impl RendererRegistry {
    /// A registry with no renderers; every node falls back to its plain text.
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Built-in renderers for every [`NodeType`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let container: Arc<dyn NodeRenderer> = Arc::new(ContainerRenderer);
        for ty in [
            NodeType::Document,
            NodeType::Paragraph,
            NodeType::Heading,
            NodeType::List,
            NodeType::Emphasis,
            NodeType::Strong,
            NodeType::Link,
        ] {
            registry.renderers.insert(ty, container.clone());
        }
        registry.register(NodeType::Blockquote, BlockquoteRenderer);
        registry.register(NodeType::ListItem, ListItemRenderer);
        registry.register(NodeType::CodeBlock, CodeBlockRenderer::default());
        registry.register(NodeType::InlineCode, InlineCodeRenderer);
        registry.register(NodeType::Text, TextRenderer);
        registry.register(NodeType::LineBreak, LineBreakRenderer);
        registry.register(NodeType::Image, ImageRenderer);
        registry.register(NodeType::Math, MathRenderer);
        registry
    }

    /// Built-in renderers, with code blocks coloured by `highlighter`.
    pub fn with_highlighter(highlighter: Arc<dyn CodeHighlighter>) -> Self {
        let mut registry = Self::with_defaults();
        registry.register(
            NodeType::CodeBlock,
            CodeBlockRenderer::default().with_highlighter(highlighter),
        );
        registry
    }

    /// Installs `renderer` for `ty`, replacing any previous one.
    pub fn register(&mut self, ty: NodeType, renderer: impl NodeRenderer + 'static) {
        self.renderers.insert(ty, Arc::new(renderer));
    }

    pub fn unregister(&mut self, ty: NodeType) -> Option<Arc<dyn NodeRenderer>> {
        self.renderers.remove(&ty)
    }

    pub fn get(&self, ty: NodeType) -> Option<&Arc<dyn NodeRenderer>> {
        self.renderers.get(&ty)
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types = self.renderers.keys().copied().collect::<Vec<_>>();
        types.sort_by_key(|ty| NodeType::ALL.iter().position(|t| t == ty));
        f.debug_struct("RendererRegistry")
            .field("types", &types)
            .finish()
    }
}

/// Immutable per-node render state, derived from the parent's by [`Dispatcher`].
#[derive(Clone, Debug)]
pub struct RenderContext<'a> {
    config: &'a StyleConfig,
    fonts: Option<&'a FontCache>,
    /// Kinds from the document root down to and including the current node.
    path: Vec<&'a NodeKind>,
    style: Arc<ResolvedStyle>,
    params: ResolveParams,
    block: BlockTag,
    block_id: usize,
    block_style: Arc<ResolvedStyle>,
    containers: Vec<Container>,
    marks: InlineMarks,
}

impl<'a> RenderContext<'a> {
    /// Context above the document node.
    pub fn root(config: &'a StyleConfig) -> Self {
        let style = Arc::new(StyleResolver::new(config).root());
        Self {
            config,
            fonts: None,
            path: Vec::new(),
            style: style.clone(),
            params: ResolveParams::default(),
            block: BlockTag::Plain,
            block_id: 0,
            block_style: style,
            containers: Vec::new(),
            marks: InlineMarks::default(),
        }
    }

    /// Makes `fonts` available to renderers for measurement.
    pub fn with_fonts(mut self, fonts: &'a FontCache) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn config(&self) -> &'a StyleConfig {
        self.config
    }

    /// The session's font cache, when rendering on behalf of one.
    pub fn fonts(&self) -> Option<&'a FontCache> {
        self.fonts
    }

    pub fn style(&self) -> &ResolvedStyle {
        &self.style
    }

    pub fn params(&self) -> ResolveParams {
        self.params
    }

    pub fn block(&self) -> &BlockTag {
        &self.block
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn marks(&self) -> &InlineMarks {
        &self.marks
    }

    pub fn in_link(&self) -> bool {
        self.marks.link.is_some()
    }

    /// Number of the innermost list item, if any.
    pub fn item_number(&self) -> Option<u64> {
        self.containers.iter().rev().find_map(|c| match c {
            Container::Item { number, .. } => Some(*number),
            _ => None,
        })
    }

    /// Whether the innermost list is ordered.
    pub fn ordered_list(&self) -> bool {
        self.containers.iter().rev().find_map(|c| match c {
            Container::List { ordered, .. } => Some(*ordered),
            _ => None,
        }) == Some(true)
    }

    pub fn tag(&self, node: NodeTag) -> SemanticTag {
        SemanticTag {
            node,
            block: self.block.clone(),
            block_id: self.block_id,
            block_style: self.block_style.clone(),
            containers: self.containers.clone(),
            marks: self.marks.clone(),
        }
    }

    /// A run in this context's style.
    pub fn run(&self, text: impl Into<String>, node: NodeTag) -> Run {
        Run::new(text, (*self.style).clone()).with_tag(self.tag(node))
    }
}

/// The buffer being built plus id allocation for blocks and containers.
#[derive(Debug, Default)]
pub struct RenderOutput {
    buffer: StyledBuffer,
    next_id: usize,
    pending_separator: Option<Run>,
}

impl RenderOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `run`, first flushing a separator queued between blocks.
    ///
    /// Empty runs are dropped, except an empty code block's, which still owns a line.
    pub fn push(&mut self, run: Run) {
        if run.text.is_empty() && !run.is_empty_code_block() {
            return;
        }
        if let Some(separator) = self.pending_separator.take() {
            self.buffer.push(separator);
        }
        self.buffer.push(run);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn run_count(&self) -> usize {
        self.buffer.runs().len()
    }

    pub fn next_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    pub fn into_buffer(self) -> StyledBuffer {
        self.buffer
    }
}

pub struct Dispatcher<'r> {
    registry: &'r RendererRegistry,
    resolver: StyleResolver<'r>,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r RendererRegistry, config: &'r StyleConfig) -> Self {
        Self {
            registry,
            resolver: StyleResolver::new(config),
        }
    }

    pub fn resolver(&self) -> &StyleResolver<'r> {
        &self.resolver
    }

    /// Renders `node` as a child of `parent`.
    pub fn render<'a>(&self, node: &'a Node, parent: &RenderContext<'a>, out: &mut RenderOutput) {
        self.render_at(node, 0, parent, out);
    }

    /// Renders every child of the node owning `cx`, separating blocks.
    pub fn render_children<'a>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
    ) {
        self.render_children_with(node, cx, out, |_, _, _| {});
    }

    /// Like [`Dispatcher::render_children`], calling `before` ahead of each child.
    pub fn render_children_with<'a, F>(
        &self,
        node: &'a Node,
        cx: &RenderContext<'a>,
        out: &mut RenderOutput,
        mut before: F,
    ) where
        F: FnMut(&'a Node, &RenderContext<'a>, &mut RenderOutput),
    {
        // Whether the last child that produced output was a block.
        let mut prev_block: Option<bool> = None;
        for (index, child) in node.children().iter().enumerate() {
            let is_block = child.kind().is_block();
            if prev_block.is_some_and(|prev| prev || is_block) {
                out.pending_separator = Some(cx.run("\n", NodeTag::BlockSeparator));
            }
            let runs = out.run_count();
            before(child, cx, out);
            self.render_at(child, index, cx, out);
            if out.run_count() > runs {
                prev_block = Some(is_block);
            }
        }
        if prev_block.is_some() {
            out.pending_separator = None;
        }
    }

    fn render_at<'a>(
        &self,
        node: &'a Node,
        index: usize,
        parent: &RenderContext<'a>,
        out: &mut RenderOutput,
    ) {
        let Some(renderer) = self.registry.get(node.node_type()) else {
            tracing::debug!(
                node = ?node.node_type(),
                "No renderer registered; rendering plain text"
            );
            out.push(parent.run(node.plain_text(), NodeTag::Text));
            return;
        };
        let cx = self.derive(node, index, parent, out);
        renderer.render(node, &cx, out, self);
    }

    fn derive<'a>(
        &self,
        node: &'a Node,
        index: usize,
        parent: &RenderContext<'a>,
        out: &mut RenderOutput,
    ) -> RenderContext<'a> {
        let kind = node.kind();
        let mut cx = parent.clone();

        match kind {
            NodeKind::Heading { level } => cx.params.heading_level = Some(*level),
            NodeKind::Blockquote => cx.params.quote_depth += 1,
            NodeKind::List { .. } => cx.params.list_depth += 1,
            _ => {}
        }

        cx.style = Arc::new(self.resolver.resolve(kind, &parent.path, cx.params));
        cx.path.push(kind);

        match kind {
            NodeKind::Blockquote => cx.containers.push(Container::Quote { id: out.next_id() }),
            NodeKind::List { ordered, start } => cx.containers.push(Container::List {
                id: out.next_id(),
                ordered: *ordered,
                start: *start,
            }),
            NodeKind::ListItem => {
                let start = parent
                    .containers
                    .last()
                    .and_then(|c| match c {
                        Container::List { start, .. } => Some(*start),
                        _ => None,
                    })
                    .unwrap_or(1);
                cx.containers.push(Container::Item {
                    id: out.next_id(),
                    number: start.saturating_add(index as u64),
                });
            }
            NodeKind::Emphasis => cx.marks.emphasis = true,
            NodeKind::Strong => cx.marks.strong = true,
            NodeKind::InlineCode { .. } => cx.marks.code = true,
            NodeKind::Link { destination, title } if cx.marks.link.is_none() => {
                cx.marks.link = Some(LinkTarget {
                    destination: destination.clone(),
                    title: title.clone(),
                });
            }
            _ => {}
        }

        let block = match kind {
            NodeKind::Paragraph => Some(BlockTag::Paragraph),
            NodeKind::Heading { level } => Some(BlockTag::Heading((*level).clamp(1, 6))),
            NodeKind::CodeBlock { language, .. } => Some(BlockTag::CodeBlock {
                language: language.clone(),
            }),
            NodeKind::Math { display: true, .. } => Some(BlockTag::Math),
            k if k.is_block() => Some(BlockTag::Plain),
            _ => None,
        };
        if let Some(block) = block {
            cx.block = block;
            cx.block_id = out.next_id();
            cx.block_style = cx.style.clone();
        }
        cx
    }
}

/// Renders `document` with the built-in renderers.
pub fn render(document: &Node, config: &StyleConfig) -> StyledBuffer {
    render_with(document, config, &RendererRegistry::with_defaults())
}

/// Renders `document` with `registry`.
///
/// Total: any tree renders, and an empty document yields an empty buffer.
pub fn render_with(
    document: &Node,
    config: &StyleConfig,
    registry: &RendererRegistry,
) -> StyledBuffer {
    render_root(document, RenderContext::root(config), registry)
}

/// Like [`render_with`], exposing `fonts` to renderers through [`RenderContext::fonts`].
pub fn render_with_fonts(
    document: &Node,
    config: &StyleConfig,
    registry: &RendererRegistry,
    fonts: &FontCache,
) -> StyledBuffer {
    render_root(
        document,
        RenderContext::root(config).with_fonts(fonts),
        registry,
    )
}

fn render_root(
    document: &Node,
    root: RenderContext<'_>,
    registry: &RendererRegistry,
) -> StyledBuffer {
    let dispatch = Dispatcher::new(registry, root.config());
    let mut out = RenderOutput::new();
    dispatch.render(document, &root, &mut out);
    out.into_buffer()
}
