use crate::dom::{Dom, Node, NodeIndex, ROOT};
use crate::path::NodeId;
use std::ops::Range;

/// Whether a traversal event enters or leaves a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal<'a> {
    pub node_id: NodeId,
    pub node: &'a Node,
    pub step: Step,
}

/// Source slice emitted for one traversal event.
///
/// An `Open` token carries the node's head, a `Close` token its tail. The
/// contents of all tokens concatenate to the document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub node_id: NodeId,
    pub step: Step,
    pub span: Range<usize>,
    pub content: &'a str,
}

/// Depth-first walk yielding `Open` before a node's children and `Close`
/// after them; leaves yield `Open` then `Close` back to back.
///
/// Lazy and cheap to clone: a clone resumes from the same point.
#[derive(Debug, Clone)]
pub struct Traverse<'a> {
    dom: &'a Dom,
    started: bool,
    /// Ancestors of `cursor`, the root first.
    parents: Vec<NodeIndex>,
    cursor: Option<NodeId>,
    queued: Option<(NodeId, NodeIndex)>,
}

impl<'a> Traverse<'a> {
    fn new(dom: &'a Dom) -> Self {
        Self {
            dom,
            started: false,
            parents: Vec::new(),
            cursor: None,
            queued: None,
        }
    }

    fn event(&self, node_id: NodeId, index: NodeIndex, step: Step) -> Traversal<'a> {
        Traversal {
            node_id,
            node: self.dom.get(index),
            step,
        }
    }
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Traversal<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((id, index)) = self.queued.take() {
            return Some(self.event(id, index, Step::Close));
        }

        if !self.started {
            self.started = true;
            if self.dom.root().is_leaf() {
                self.queued = Some((NodeId::root(), ROOT));
            } else {
                self.parents.push(ROOT);
                self.cursor = Some(NodeId::root().first_child());
            }
            return Some(self.event(NodeId::root(), ROOT, Step::Open));
        }

        let cursor = self.cursor.take()?;
        let parent = *self.parents.last()?;
        let order = cursor.leaf_order().unwrap_or_default();

        match self.dom.get(parent).children.get(order) {
            None => {
                self.parents.pop();
                let parent_id = cursor.parent().unwrap_or_default();
                self.cursor = parent_id.sibling(1);
                Some(self.event(parent_id, parent, Step::Close))
            }
            Some(&index) => {
                if self.dom.get(index).is_leaf() {
                    self.queued = Some((cursor.clone(), index));
                    self.cursor = cursor.sibling(1);
                } else {
                    self.parents.push(index);
                    self.cursor = Some(cursor.first_child());
                }
                Some(self.event(cursor, index, Step::Open))
            }
        }
    }
}

impl Dom {
    /// Walk the whole tree. Call again, or clone the iterator, to restart.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse::new(self)
    }

    /// Traversal events paired with the source slice each one covers.
    pub fn tokens(&self) -> impl Iterator<Item = Token<'_>> + Clone + '_ {
        self.traverse().map(move |event| {
            let span = match event.step {
                Step::Open => self.head_span(event.node),
                Step::Close => self.tail_span(event.node),
            };
            Token {
                node_id: event.node_id,
                step: event.step,
                content: &self.text()[span.clone()],
                span,
            }
        })
    }
}
