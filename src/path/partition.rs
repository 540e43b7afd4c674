use crate::path::errors::PathError;
use crate::path::node_id::NodeId;
use crate::path::order::PathOrdering;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A run of `size` consecutive siblings starting at `offset`, together with
/// everything nested beneath them.
///
/// The string form is `"<offset>-<last leaf order>"`: `"2/1/0-1"` covers
/// `2/1/0` and `2/1/1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Partition {
    offset: NodeId,
    size: usize,
}

impl Partition {
    pub fn new(offset: NodeId, size: usize) -> Result<Self, PathError> {
        if offset.is_root() {
            return Err(PathError::invalid("partition offset must not be the root"));
        }
        if size == 0 {
            return Err(PathError::invalid("partition size must be positive"));
        }
        Ok(Self { offset, size })
    }

    /// Partition holding a single node.
    pub fn single(offset: NodeId) -> Result<Self, PathError> {
        Self::new(offset, 1)
    }

    /// Like [`Partition::new`] for callers holding signed sizes.
    pub fn new_signed(offset: NodeId, size: isize) -> Result<Self, PathError> {
        let size = usize::try_from(size)
            .map_err(|_| PathError::invalid(format!("partition size must be positive, got {size}")))?;
        Self::new(offset, size)
    }

    pub fn parse(input: &str) -> Result<Self, PathError> {
        let (offset, last) = input.rsplit_once('-').ok_or_else(|| {
            PathError::invalid(format!("partition '{input}' is missing '-<last>'"))
        })?;
        let offset = NodeId::parse(offset)?;
        let invalid_last =
            || PathError::invalid(format!("partition '{input}' has invalid last order '{last}'"));
        if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid_last());
        }
        let last: usize = last.parse().map_err(|_| invalid_last())?;
        let first = offset
            .leaf_order()
            .ok_or_else(|| PathError::invalid("partition offset must not be the root"))?;
        if last < first {
            return Err(PathError::invalid(format!(
                "partition '{input}' ends before it starts"
            )));
        }
        Self::new(offset, last - first + 1)
    }

    pub fn offset(&self) -> &NodeId {
        &self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn first(&self) -> &NodeId {
        &self.offset
    }

    pub fn last(&self) -> NodeId {
        let mut path = self.offset.path().to_vec();
        if let Some(order) = path.last_mut() {
            *order += self.size - 1;
        }
        NodeId::new(path)
    }

    /// Parent shared by every member of the partition.
    pub fn parent(&self) -> NodeId {
        self.offset.parent().unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.offset.len()
    }

    /// Member ids from `first` to `last`.
    pub fn members(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.size).filter_map(move |delta| self.offset.sibling(delta as isize))
    }

    /// Whether `id` is one of the members or lies beneath one of them.
    ///
    /// When `id` descends from a boundary the sibling comparison is
    /// incomparable, and the decision falls back to the depth difference: a
    /// deeper `id` counts as inside that boundary, a shallower one (an
    /// ancestor of the partition) as outside.
    pub fn contains(&self, id: &NodeId) -> bool {
        let start = signed(NodeId::compare(self.first(), id), || {
            self.first().len() as isize - id.len() as isize
        });
        let end = signed(NodeId::compare(&self.last(), id), || {
            id.len() as isize - self.last().len() as isize
        });
        start <= 0 && end >= 0
    }

    /// Whether `other` sits strictly deeper than this partition and inside it.
    pub fn encloses(&self, other: &Partition) -> bool {
        other.depth() > self.depth() && self.contains(other.first()) && self.contains(&other.last())
    }

    /// Sibling order between partitions.
    ///
    /// [`PathOrdering::Incomparable`] covers both overlapping ranges and
    /// partitions where one lies inside the other at a different depth.
    pub fn compare(a: &Partition, b: &Partition) -> PathOrdering {
        if a == b {
            return PathOrdering::Equal;
        }
        if NodeId::compare(&a.last(), b.first()).is_lt() {
            return PathOrdering::Less;
        }
        if NodeId::compare(a.first(), &b.last()).is_gt() {
            return PathOrdering::Greater;
        }
        PathOrdering::Incomparable
    }

    /// Document order on the offset, then size. Only meant for sorting.
    pub fn total_order_cmp(a: &Partition, b: &Partition) -> Ordering {
        NodeId::total_order_cmp(&a.offset, &b.offset).then(a.size.cmp(&b.size))
    }

    /// Smallest partition whose range contains both ids.
    ///
    /// If one id is an ancestor-or-self of the other, the result is that
    /// ancestor alone.
    pub fn covering(start: &NodeId, end: &NodeId) -> Result<Partition, PathError> {
        let ancestor = NodeId::common_ancestor(start, end);
        let depth = ancestor.len();
        if depth == start.len() || depth == end.len() {
            return Partition::single(ancestor);
        }

        let first = start.path()[depth];
        let last = end.path()[depth];
        let (lo, hi) = (first.min(last), first.max(last));
        Partition::new(ancestor.nth_child(lo), hi - lo + 1)
    }

    /// Smallest partition covering every partition in the collection.
    pub fn covering_all<'a, I>(partitions: I) -> Result<Partition, PathError>
    where
        I: IntoIterator<Item = &'a Partition>,
    {
        let mut bounds: Option<(NodeId, NodeId)> = None;
        for partition in partitions {
            bounds = Some(match bounds.take() {
                None => (partition.first().clone(), partition.last()),
                Some((first, last)) => (
                    outer_start(first, partition.first().clone()),
                    outer_end(last, partition.last()),
                ),
            });
        }

        let (first, last) =
            bounds.ok_or_else(|| PathError::invalid("cannot cover an empty set of partitions"))?;
        Partition::covering(&first, &last)
    }

    /// Re-express this partition in the coordinates of a document holding
    /// only `anchor`'s members, as produced by parsing the anchor's content.
    pub fn relative_to(&self, anchor: &Partition) -> Result<Partition, PathError> {
        if !anchor.contains(self.first()) || !anchor.contains(&self.last()) {
            return Err(PathError::NotAnAncestor {
                id: self.to_string(),
                ancestor: anchor.to_string(),
            });
        }

        let tail = self.first().relative_from(&anchor.parent())?;
        let mut path = tail.path().to_vec();
        if let (Some(order), Some(base)) = (path.first_mut(), anchor.first().leaf_order()) {
            *order -= base;
        }
        Partition::new(NodeId::new(path), self.size)
    }

    /// No two partitions overlap or nest.
    pub fn check_disjoint<'a, I>(partitions: I) -> bool
    where
        I: IntoIterator<Item = &'a Partition>,
    {
        Self::find_overlap(partitions).is_none()
    }

    /// First adjacent pair, in document order, that is not strictly ordered.
    pub fn find_overlap<'a, I>(partitions: I) -> Option<(&'a Partition, &'a Partition)>
    where
        I: IntoIterator<Item = &'a Partition>,
    {
        let mut sorted: Vec<&Partition> = partitions.into_iter().collect();
        sorted.sort_by(|a, b| Partition::total_order_cmp(a, b));
        sorted
            .windows(2)
            .find(|pair| !Partition::compare(pair[0], pair[1]).is_lt())
            .map(|pair| (pair[0], pair[1]))
    }
}

fn signed(ordering: PathOrdering, fallback: impl FnOnce() -> isize) -> isize {
    match ordering {
        PathOrdering::Less => -1,
        PathOrdering::Equal => 0,
        PathOrdering::Greater => 1,
        PathOrdering::Incomparable => fallback(),
    }
}

/// Earlier of two start bounds; on an ancestor/descendant tie the shallower wins.
fn outer_start(a: NodeId, b: NodeId) -> NodeId {
    match NodeId::compare(&a, &b) {
        PathOrdering::Less | PathOrdering::Equal => a,
        PathOrdering::Greater => b,
        PathOrdering::Incomparable => shallower(a, b),
    }
}

/// Later of two end bounds; on an ancestor/descendant tie the shallower wins.
fn outer_end(a: NodeId, b: NodeId) -> NodeId {
    match NodeId::compare(&a, &b) {
        PathOrdering::Greater | PathOrdering::Equal => a,
        PathOrdering::Less => b,
        PathOrdering::Incomparable => shallower(a, b),
    }
}

fn shallower(a: NodeId, b: NodeId) -> NodeId {
    if a.len() <= b.len() {
        a
    } else {
        b
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.last().leaf_order().unwrap_or_default();
        write!(f, "{}-{}", self.offset, last)
    }
}

impl FromStr for Partition {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Partition {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Partition> for String {
    fn from(partition: Partition) -> Self {
        partition.to_string()
    }
}

impl PartialOrd for Partition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Partition {
    fn cmp(&self, other: &Self) -> Ordering {
        Partition::total_order_cmp(self, other)
    }
}
