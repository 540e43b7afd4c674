//! Folding nested substitutions into one.
//!
//! Translators often replace a paragraph and then, separately, refine a span
//! inside it. Those two substitutions nest, so [`Dom::substitute_all`] rejects
//! them. [`Dom::merge_substitutions`] resolves the nesting by applying each
//! inner substitution to the content of the one enclosing it, then combines
//! the outermost results under the smallest partition covering all of them.

use crate::dom::errors::DomError;
use crate::dom::{Dom, Substitution};
use crate::path::{Partition, PathError, PathOrdering};

impl Dom {
    /// Combine substitutions into a single equivalent one.
    ///
    /// Every pair must either be strictly ordered or strictly nested (one
    /// partition enclosing the other's nodes). Nested content is interpreted
    /// in the coordinates of the enclosing substitution's content: the
    /// enclosing partition's members become the top-level nodes.
    pub fn merge_substitutions(
        &self,
        substitutions: &[Substitution],
    ) -> Result<Substitution, DomError> {
        if substitutions.is_empty() {
            return Err(PathError::invalid("nothing to merge").into());
        }

        for (i, a) in substitutions.iter().enumerate() {
            for b in &substitutions[i + 1..] {
                let nested =
                    a.partition.encloses(&b.partition) || b.partition.encloses(&a.partition);
                match Partition::compare(&a.partition, &b.partition) {
                    PathOrdering::Less | PathOrdering::Greater => {}
                    PathOrdering::Incomparable if nested => {}
                    PathOrdering::Equal | PathOrdering::Incomparable => {
                        return Err(DomError::OverlappingPartitions {
                            first: a.partition.to_string(),
                            second: b.partition.to_string(),
                        });
                    }
                }
            }
        }

        let parents = enclosing_parents(substitutions);
        let mut order: Vec<usize> = (0..substitutions.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(substitutions[i].partition.depth()));

        let mut resolved: Vec<Option<String>> = vec![None; substitutions.len()];
        for &index in &order {
            let outer = &substitutions[index];
            let inner = children_of(&parents, index);
            let content = if inner.is_empty() {
                outer.content.clone()
            } else {
                let local = inner
                    .iter()
                    .map(|&child| {
                        let partition =
                            substitutions[child].partition.relative_to(&outer.partition)?;
                        let content = resolved[child].take().unwrap_or_default();
                        Ok(Substitution::new(partition, content))
                    })
                    .collect::<Result<Vec<_>, DomError>>()?;
                Dom::load(outer.content.as_str())?.substitute_all(&local)?
            };
            resolved[index] = Some(content);
        }

        let roots = children_of(&parents, usize::MAX);
        log::debug!(
            "merging {} substitutions into {} outermost",
            substitutions.len(),
            roots.len()
        );

        if let [root] = roots.as_slice() {
            let content = resolved[*root].take().unwrap_or_default();
            return Ok(Substitution::new(substitutions[*root].partition.clone(), content));
        }

        let covering = Partition::covering_all(roots.iter().map(|&i| &substitutions[i].partition))?;
        let local = roots
            .iter()
            .map(|&root| {
                let partition = substitutions[root].partition.relative_to(&covering)?;
                let content = resolved[root].take().unwrap_or_default();
                Ok(Substitution::new(partition, content))
            })
            .collect::<Result<Vec<_>, DomError>>()?;
        let base = Dom::load(self.extract_content(&covering)?)?;
        let content = base.substitute_all(&local)?;
        Ok(Substitution::new(covering, content))
    }

    /// [`Dom::merge_substitutions`] followed by [`Dom::substitute_all`].
    pub fn substitute_all_merged(&self, substitutions: &[Substitution]) -> Result<String, DomError> {
        if substitutions.is_empty() {
            return Ok(self.text().to_string());
        }
        let merged = self.merge_substitutions(substitutions)?;
        self.substitute_all(std::slice::from_ref(&merged))
    }
}

/// For each substitution, the index of the deepest other substitution
/// enclosing it, or `usize::MAX` when it is outermost.
fn enclosing_parents(substitutions: &[Substitution]) -> Vec<usize> {
    substitutions
        .iter()
        .map(|inner| {
            substitutions
                .iter()
                .enumerate()
                .filter(|(_, outer)| outer.partition.encloses(&inner.partition))
                .max_by_key(|(_, outer)| outer.partition.depth())
                .map(|(index, _)| index)
                .unwrap_or(usize::MAX)
        })
        .collect()
}

fn children_of(parents: &[usize], parent: usize) -> Vec<usize> {
    parents
        .iter()
        .enumerate()
        .filter(|(_, p)| **p == parent)
        .map(|(index, _)| index)
        .collect()
}
