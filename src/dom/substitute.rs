use crate::dom::errors::DomError;
use crate::dom::{Dom, ROOT};
use crate::path::{NodeId, Partition};
use serde::{Deserialize, Serialize};

/// Replacement text for every node in a partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Substitution {
    pub partition: Partition,
    pub content: String,
}

impl Substitution {
    pub fn new(partition: Partition, content: impl Into<String>) -> Self {
        Self {
            partition,
            content: content.into(),
        }
    }
}

impl Dom {
    /// Render the document with each substitution's partition replaced by its
    /// content. Every byte outside the substituted partitions is copied from
    /// the source unchanged.
    ///
    /// Fails without producing output if any two partitions overlap or nest,
    /// or if a partition names a node the document does not have.
    pub fn substitute_all(&self, substitutions: &[Substitution]) -> Result<String, DomError> {
        if let Some((first, second)) =
            Partition::find_overlap(substitutions.iter().map(|s| &s.partition))
        {
            return Err(DomError::OverlappingPartitions {
                first: first.to_string(),
                second: second.to_string(),
            });
        }

        let mut pending: Vec<&Substitution> = substitutions.iter().collect();
        pending.sort_by(|a, b| Partition::total_order_cmp(&a.partition, &b.partition));
        for substitution in &pending {
            self.resolve(substitution.partition.first())?;
            self.resolve(&substitution.partition.last())?;
        }
        log::debug!("rendering {} substitutions", pending.len());

        let root = self.get(ROOT);
        if root.children.is_empty() {
            return Ok(self.text().to_string());
        }

        let text = self.text();
        let mut out = String::with_capacity(text.len());
        out.push_str(&text[self.head_span(root)]);

        let mut pending = pending.into_iter().peekable();
        let mut parents = vec![ROOT];
        let mut cursor = NodeId::root().first_child();

        while let Some(&parent) = parents.last() {
            let siblings = &self.get(parent).children;
            let order = cursor.leaf_order().unwrap_or_default();

            let Some(&index) = siblings.get(order) else {
                out.push_str(&text[self.tail_span(self.get(parent))]);
                parents.pop();
                match cursor.parent().and_then(|id| id.sibling(1)) {
                    Some(next) => cursor = next,
                    None => break,
                }
                continue;
            };

            if let Some(substitution) = pending.next_if(|s| s.partition.contains(&cursor)) {
                out.push_str(&substitution.content);
                cursor = step_over(&cursor, substitution.partition.size());
                continue;
            }

            let node = self.get(index);
            out.push_str(&text[self.head_span(node)]);
            if node.is_leaf() {
                cursor = step_over(&cursor, 1);
            } else {
                parents.push(index);
                cursor = cursor.first_child();
            }
        }

        debug_assert!(pending.next().is_none());
        Ok(out)
    }
}

/// Sibling `count` positions after `cursor`.
fn step_over(cursor: &NodeId, count: usize) -> NodeId {
    let order = cursor.leaf_order().unwrap_or_default();
    cursor.parent().unwrap_or_default().nth_child(order + count)
}
