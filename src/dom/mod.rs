//! Position-preserving document tree.
//!
//! A [`Dom`] owns the chapter text and an arena of [`Node`]s. Every node
//! records the exact byte span it was parsed from, and the spans of a node's
//! children tile its interior: the bytes before the first child are the
//! node's head (its start tag), the bytes after the last child are its tail
//! (its end tag). Concatenating heads, leaf spans and tails in document order
//! reproduces the input byte for byte, which is what lets
//! [`Dom::substitute_all`] splice replacements without touching any other
//! character.
//!
//! Nodes are addressed by [`NodeId`] paths and runs of siblings by
//! [`Partition`]s. Both are positional, so they are only meaningful against
//! the snapshot they were computed from.

pub mod errors;
pub mod merge;
pub mod parser;
pub mod substitute;
pub mod traverse;

pub use errors::DomError;
pub use substitute::Substitution;
pub use traverse::{Step, Token, Traversal, Traverse};

use crate::path::{NodeId, Partition, PathError};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

pub(crate) type NodeIndex = usize;

pub(crate) const ROOT: NodeIndex = 0;

/// What a node was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic root spanning the whole text.
    Document,
    Element { name: String },
    Text,
    Comment,
    CData,
    /// `<?xml ...?>`
    Declaration,
    DocType,
    ProcessingInstruction,
    /// An end tag with no matching open element, kept as a leaf so its bytes
    /// survive a round trip.
    StrayEndTag { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte range in [`Dom::text`].
    pub span: Range<usize>,
    pub(crate) children: Vec<NodeIndex>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, span: Range<usize>) -> Self {
        Self {
            kind,
            span,
            children: Vec::new(),
        }
    }

    /// Element or stray end tag name.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { name } | NodeKind::StrayEndTag { name } => Some(name),
            _ => None,
        }
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parsed chapter: the original text plus its node tree.
///
/// Immutable once loaded, so a `Dom` can be shared across threads behind an
/// `Arc` and queried concurrently.
#[derive(Debug, Clone)]
pub struct Dom {
    text: String,
    nodes: Vec<Node>,
}

impl Dom {
    /// Parse `text` into a tree.
    ///
    /// Parsing is lenient about nesting (mismatched end tags are recovered
    /// from, unclosed elements run to the end of input) but fails on
    /// malformed markup such as an unterminated tag.
    pub fn load(text: impl Into<String>) -> Result<Self, DomError> {
        let text = text.into();
        let nodes = parser::parse(&text)?;
        Ok(Self { text, nodes })
    }

    /// Same result as [`Dom::load`], yielding to the async runtime between
    /// chunks of input so large chapters do not starve other tasks.
    pub async fn load_async(text: impl Into<String>) -> Result<Self, DomError> {
        let text = text.into();
        let nodes = parser::parse_async(&text).await?;
        Ok(Self { text, nodes })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT]
    }

    /// Total number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: &NodeId) -> Result<&Node, DomError> {
        self.resolve(id).map(|index| &self.nodes[index])
    }

    /// Children of `node`, in document order.
    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children.iter().map(move |&index| &self.nodes[index])
    }

    /// Source text of a node, or of a run of siblings from the first member's
    /// start to the last member's end.
    pub fn extract_content(&self, selector: impl Into<Selector>) -> Result<&str, DomError> {
        let span = match selector.into() {
            Selector::Node(id) => self.node(&id)?.span.clone(),
            Selector::Partition(partition) => {
                let first = self.node(partition.first())?;
                let last = self.node(&partition.last())?;
                first.span.start..last.span.end
            }
        };
        Ok(&self.text[span])
    }

    /// Head of a node: the bytes before its first child. For a leaf, the whole
    /// span.
    pub fn head(&self, id: &NodeId) -> Result<&str, DomError> {
        let node = self.node(id)?;
        Ok(&self.text[self.head_span(node)])
    }

    /// Tail of a node: the bytes after its last child. Empty for a leaf.
    pub fn tail(&self, id: &NodeId) -> Result<&str, DomError> {
        let node = self.node(id)?;
        Ok(&self.text[self.tail_span(node)])
    }

    /// `node` must belong to this tree's arena.
    pub(crate) fn head_span(&self, node: &Node) -> Range<usize> {
        match node.children.first() {
            Some(&child) => node.span.start..self.nodes[child].span.start,
            None => node.span.clone(),
        }
    }

    pub(crate) fn tail_span(&self, node: &Node) -> Range<usize> {
        match node.children.last() {
            Some(&child) => self.nodes[child].span.end..node.span.end,
            None => node.span.end..node.span.end,
        }
    }

    pub(crate) fn get(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    pub(crate) fn resolve(&self, id: &NodeId) -> Result<NodeIndex, DomError> {
        id.path().iter().try_fold(ROOT, |index, &order| {
            self.nodes[index]
                .children
                .get(order)
                .copied()
                .ok_or_else(|| DomError::NodeNotFound { id: id.to_string() })
        })
    }
}

/// Target of [`Dom::extract_content`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Node(NodeId),
    Partition(Partition),
}

impl From<NodeId> for Selector {
    fn from(id: NodeId) -> Self {
        Selector::Node(id)
    }
}

impl From<&NodeId> for Selector {
    fn from(id: &NodeId) -> Self {
        Selector::Node(id.clone())
    }
}

impl From<Partition> for Selector {
    fn from(partition: Partition) -> Self {
        Selector::Partition(partition)
    }
}

impl From<&Partition> for Selector {
    fn from(partition: &Partition) -> Self {
        Selector::Partition(partition.clone())
    }
}

impl FromStr for Selector {
    type Err = PathError;

    /// `"2/1-3"` is a partition, anything else a node id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('-') {
            Partition::parse(s).map(Selector::Partition)
        } else {
            NodeId::parse(s).map(Selector::Node)
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Node(id) => write!(f, "{id}"),
            Selector::Partition(partition) => write!(f, "{partition}"),
        }
    }
}
