//! Partial ordering over tree positions.
//!
//! Sibling order is only defined between positions that diverge somewhere
//! along their paths. When one path is a prefix of the other the pair is an
//! ancestor and a descendant, and the comparison reports
//! [`PathOrdering::Incomparable`] instead of collapsing into equal/less/greater.
//! Overlap detection relies on that signal surviving every comparison.

use std::cmp::Ordering;

/// Outcome of a partial (sibling-order) comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathOrdering {
    Less,
    Equal,
    Greater,
    /// Ancestor/descendant pair, or partitions that overlap.
    Incomparable,
}

impl PathOrdering {
    /// Signed difference used when two paths diverge at some index.
    pub(crate) fn from_difference(a: usize, b: usize) -> Self {
        match a.cmp(&b) {
            Ordering::Less => PathOrdering::Less,
            Ordering::Equal => PathOrdering::Equal,
            Ordering::Greater => PathOrdering::Greater,
        }
    }

    /// Convert to a total [`Ordering`] when the pair is comparable.
    ///
    /// Returns `None` for [`PathOrdering::Incomparable`], so the result can
    /// never be fed to a sort routine by accident.
    pub fn to_ordering(self) -> Option<Ordering> {
        match self {
            PathOrdering::Less => Some(Ordering::Less),
            PathOrdering::Equal => Some(Ordering::Equal),
            PathOrdering::Greater => Some(Ordering::Greater),
            PathOrdering::Incomparable => None,
        }
    }

    pub fn is_lt(self) -> bool {
        self == PathOrdering::Less
    }

    pub fn is_gt(self) -> bool {
        self == PathOrdering::Greater
    }

    /// Swap the sides of the comparison.
    pub fn reverse(self) -> Self {
        match self {
            PathOrdering::Less => PathOrdering::Greater,
            PathOrdering::Greater => PathOrdering::Less,
            other => other,
        }
    }
}

impl From<Ordering> for PathOrdering {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => PathOrdering::Less,
            Ordering::Equal => PathOrdering::Equal,
            Ordering::Greater => PathOrdering::Greater,
        }
    }
}
