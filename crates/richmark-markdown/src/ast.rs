//! Immutable document tree produced by [`crate::parser`].
//!
//! Nodes own their children, so every non-root node has exactly one parent and the tree is
//! finite. Nothing is mutated after construction; a new source produces a new tree.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading {
        level: u8,
    },
    Blockquote,
    CodeBlock {
        language: Option<String>,
        literal: String,
    },
    InlineCode {
        literal: String,
    },
    Emphasis,
    Strong,
    Link {
        destination: String,
        title: Option<String>,
    },
    Image {
        source: String,
        alt: String,
        title: Option<String>,
    },
    List {
        ordered: bool,
        start: u64,
    },
    ListItem,
    LineBreak {
        hard: bool,
    },
    Text {
        literal: String,
    },
    Math {
        display: bool,
        literal: String,
    },
}

/// Field-less discriminant of [`NodeKind`], used to key renderer lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Paragraph,
    Heading,
    Blockquote,
    CodeBlock,
    InlineCode,
    Emphasis,
    Strong,
    Link,
    Image,
    List,
    ListItem,
    LineBreak,
    Text,
    Math,
}

impl NodeType {
    pub const ALL: [NodeType; 15] = [
        NodeType::Document,
        NodeType::Paragraph,
        NodeType::Heading,
        NodeType::Blockquote,
        NodeType::CodeBlock,
        NodeType::InlineCode,
        NodeType::Emphasis,
        NodeType::Strong,
        NodeType::Link,
        NodeType::Image,
        NodeType::List,
        NodeType::ListItem,
        NodeType::LineBreak,
        NodeType::Text,
        NodeType::Math,
    ];
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Document => NodeType::Document,
            NodeKind::Paragraph => NodeType::Paragraph,
            NodeKind::Heading { .. } => NodeType::Heading,
            NodeKind::Blockquote => NodeType::Blockquote,
            NodeKind::CodeBlock { .. } => NodeType::CodeBlock,
            NodeKind::InlineCode { .. } => NodeType::InlineCode,
            NodeKind::Emphasis => NodeType::Emphasis,
            NodeKind::Strong => NodeType::Strong,
            NodeKind::Link { .. } => NodeType::Link,
            NodeKind::Image { .. } => NodeType::Image,
            NodeKind::List { .. } => NodeType::List,
            NodeKind::ListItem => NodeType::ListItem,
            NodeKind::LineBreak { .. } => NodeType::LineBreak,
            NodeKind::Text { .. } => NodeType::Text,
            NodeKind::Math { .. } => NodeType::Math,
        }
    }

    /// Whether this kind occupies its own block and is separated from its siblings.
    pub fn is_block(&self) -> bool {
        match self {
            NodeKind::Document
            | NodeKind::Paragraph
            | NodeKind::Heading { .. }
            | NodeKind::Blockquote
            | NodeKind::CodeBlock { .. }
            | NodeKind::List { .. }
            | NodeKind::ListItem => true,
            NodeKind::Math { display, .. } => *display,
            _ => false,
        }
    }

    /// Leaf kinds never carry children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeKind::CodeBlock { .. }
                | NodeKind::InlineCode { .. }
                | NodeKind::Image { .. }
                | NodeKind::LineBreak { .. }
                | NodeKind::Text { .. }
                | NodeKind::Math { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    /// Builds a node. Children given to a leaf kind are dropped.
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        let children = if kind.is_leaf() { Vec::new() } else { children };
        Self { kind, children }
    }

    pub fn leaf(kind: NodeKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn text(literal: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text {
            literal: literal.into(),
        })
    }

    pub fn document(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Document, children)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Literal content of this node and its descendants in pre-order.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text { literal }
            | NodeKind::InlineCode { literal }
            | NodeKind::CodeBlock { literal, .. }
            | NodeKind::Math { literal, .. } => out.push_str(literal),
            NodeKind::Image { alt, .. } => out.push_str(alt),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Pre-order traversal including `self`.
    pub fn walk(&self) -> impl Iterator<Item = &Node> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_kinds_drop_children() {
        let node = Node::new(
            NodeKind::Text {
                literal: "a".into(),
            },
            vec![Node::text("b")],
        );
        assert!(node.is_empty());
    }

    #[test]
    fn walk_is_pre_order() {
        let doc = Node::document(vec![
            Node::new(NodeKind::Paragraph, vec![Node::text("a"), Node::text("b")]),
            Node::new(NodeKind::Paragraph, vec![Node::text("c")]),
        ]);
        let types = doc.walk().map(Node::node_type).collect::<Vec<_>>();
        assert_eq!(
            types,
            vec![
                NodeType::Document,
                NodeType::Paragraph,
                NodeType::Text,
                NodeType::Text,
                NodeType::Paragraph,
                NodeType::Text,
            ]
        );
        assert_eq!(doc.plain_text(), "abc");
    }

    #[test]
    fn display_math_is_a_block() {
        let block = NodeKind::Math {
            display: true,
            literal: "x".into(),
        };
        let inline = NodeKind::Math {
            display: false,
            literal: "x".into(),
        };
        assert!(block.is_block());
        assert!(!inline.is_block());
    }
}
