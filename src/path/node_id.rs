use crate::path::errors::PathError;
use crate::path::order::PathOrdering;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Position of a node as the child indices walked from the document root.
///
/// The empty path is the root. A `NodeId` only means something relative to
/// one parsed snapshot: after the document changes, the same path may name a
/// different node.
///
/// `Ord` is document (pre-)order, see [`NodeId::total_order_cmp`]. Use
/// [`NodeId::compare`] for sibling order with ancestor detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    path: Vec<usize>,
}

impl NodeId {
    pub fn new(path: impl Into<Vec<usize>>) -> Self {
        Self { path: path.into() }
    }

    pub fn root() -> Self {
        Self { path: Vec::new() }
    }

    /// Parse the slash-separated form (`"2/1/0"`); the empty string is the root.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Ok(Self::root());
        }

        let path = input
            .split('/')
            .map(|part| {
                let invalid = || {
                    PathError::invalid(format!(
                        "node id '{input}' has invalid component '{part}'"
                    ))
                };
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<usize>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Depth of the node; the root has length 0.
    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Index among the parent's children, `None` for the root.
    pub fn leaf_order(&self) -> Option<usize> {
        self.path.last().copied()
    }

    /// The root has no parent.
    pub fn parent(&self) -> Option<NodeId> {
        let (_, init) = self.path.split_last()?;
        Some(Self::new(init))
    }

    /// Sibling `delta` positions away. `None` for the root, or when the index
    /// would fall below zero.
    pub fn sibling(&self, delta: isize) -> Option<NodeId> {
        let (last, init) = self.path.split_last()?;
        let order = last.checked_add_signed(delta)?;
        let mut path = init.to_vec();
        path.push(order);
        Some(Self { path })
    }

    pub fn first_child(&self) -> NodeId {
        self.nth_child(0)
    }

    pub fn nth_child(&self, n: usize) -> NodeId {
        let mut path = self.path.clone();
        path.push(n);
        Self { path }
    }

    /// Like [`NodeId::nth_child`] for callers holding signed indices.
    pub fn nth_child_signed(&self, n: isize) -> Result<NodeId, PathError> {
        let n = usize::try_from(n)
            .map_err(|_| PathError::invalid(format!("child index must be >= 0, got {n}")))?;
        Ok(self.nth_child(n))
    }

    /// Ancestor-or-self test: `other`'s path starts with this path.
    pub fn contains(&self, other: &NodeId) -> bool {
        other.path.starts_with(&self.path)
    }

    /// Path tail below `ancestor`.
    pub fn relative_from(&self, ancestor: &NodeId) -> Result<NodeId, PathError> {
        if !ancestor.contains(self) {
            return Err(PathError::NotAnAncestor {
                id: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(Self::new(&self.path[ancestor.len()..]))
    }

    /// Append `tail` below this node; inverse of [`NodeId::relative_from`].
    pub fn join(&self, tail: &NodeId) -> NodeId {
        let mut path = self.path.clone();
        path.extend_from_slice(&tail.path);
        Self { path }
    }

    /// Longest shared prefix.
    pub fn common_ancestor(a: &NodeId, b: &NodeId) -> NodeId {
        let shared = a
            .path
            .iter()
            .zip(&b.path)
            .take_while(|(x, y)| x == y)
            .count();
        Self::new(&a.path[..shared])
    }

    /// Sibling order.
    ///
    /// The first index where the paths differ decides. Identical paths are
    /// equal. When one path is a strict prefix of the other the nodes are an
    /// ancestor and a descendant, which have no sibling order: the result is
    /// [`PathOrdering::Incomparable`].
    pub fn compare(a: &NodeId, b: &NodeId) -> PathOrdering {
        if let Some((x, y)) = a.path.iter().zip(&b.path).find(|(x, y)| x != y) {
            return PathOrdering::from_difference(*x, *y);
        }
        if a.len() == b.len() {
            PathOrdering::Equal
        } else {
            PathOrdering::Incomparable
        }
    }

    /// Document (pre-)order: like [`NodeId::compare`], but an ancestor sorts
    /// before its descendants.
    pub fn total_order_cmp(a: &NodeId, b: &NodeId) -> Ordering {
        a.path
            .iter()
            .zip(&b.path)
            .find(|(x, y)| x != y)
            .map(|(x, y)| x.cmp(y))
            .unwrap_or_else(|| a.len().cmp(&b.len()))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, order) in self.path.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            write!(f, "{order}")?;
        }
        Ok(())
    }
}

impl FromStr for NodeId {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        NodeId::total_order_cmp(self, other)
    }
}
