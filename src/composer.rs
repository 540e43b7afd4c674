//! Registry of substitutions over one chapter.
//!
//! A [`Composer`] keeps a parsed chapter and any number of candidate
//! substitutions, each under its own id. Callers can look up which
//! substitutions cover a node, check whether a chosen subset can be rendered
//! together, and render that subset, without touching the chapter on disk.

use crate::dom::{Dom, DomError, Selector, Substitution};
use crate::path::{NodeId, Partition};
use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposerError {
    #[error("no substitution registered under '{id}'")]
    UnknownSubstitution { id: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Substitutions registered against one parsed chapter, in registration order.
#[derive(Debug, Clone)]
pub struct Composer {
    dom: Dom,
    substitutions: IndexMap<String, Substitution>,
}

impl Composer {
    pub fn new(dom: Dom) -> Self {
        Self {
            dom,
            substitutions: IndexMap::new(),
        }
    }

    pub fn load(text: impl Into<String>) -> Result<Self, DomError> {
        Ok(Self::new(Dom::load(text)?))
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Source text of a node or partition in the unmodified chapter.
    pub fn original_content(&self, selector: impl Into<Selector>) -> Result<&str, DomError> {
        self.dom.extract_content(selector)
    }

    /// Register a substitution under a fresh random id and return the id.
    pub fn add(&mut self, partition: Partition, content: impl Into<String>) -> String {
        let id = Uuid::new_v4().to_string();
        self.substitutions
            .insert(id.clone(), Substitution::new(partition, content));
        id
    }

    pub fn remove(&mut self, id: &str) -> Option<Substitution> {
        self.substitutions.shift_remove(id)
    }

    /// Replace the content of a registered substitution; its partition stays.
    pub fn update(&mut self, id: &str, content: impl Into<String>) -> Result<(), ComposerError> {
        let substitution = self
            .substitutions
            .get_mut(id)
            .ok_or_else(|| unknown(id))?;
        substitution.content = content.into();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Substitution> {
        self.substitutions.get(id)
    }

    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Substitution)> + '_ {
        self.substitutions
            .iter()
            .map(|(id, substitution)| (id.as_str(), substitution))
    }

    /// Ids of the substitutions whose partition covers `node` or one of its
    /// ancestors.
    pub fn find_ids(&self, node: &NodeId) -> Vec<&str> {
        self.iter()
            .filter(|(_, substitution)| substitution.partition.contains(node))
            .map(|(id, _)| id)
            .collect()
    }

    /// Whether any two of the selected substitutions overlap or nest.
    pub fn has_overlaps<S: AsRef<str>>(&self, ids: &[S]) -> Result<bool, ComposerError> {
        let selected = self.select(ids)?;
        Ok(!Partition::check_disjoint(
            selected.iter().map(|substitution| &substitution.partition),
        ))
    }

    /// Render the chapter with the selected substitutions, which must be
    /// disjoint. An empty selection renders the original text.
    pub fn render<S: AsRef<str>>(&self, ids: &[S]) -> Result<String, ComposerError> {
        let selected = self.select(ids)?;
        Ok(self.dom.substitute_all(&selected)?)
    }

    /// Like [`Composer::render`], but nested selections are merged first.
    pub fn render_merged<S: AsRef<str>>(&self, ids: &[S]) -> Result<String, ComposerError> {
        let selected = self.select(ids)?;
        Ok(self.dom.substitute_all_merged(&selected)?)
    }

    fn select<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Substitution>, ComposerError> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                self.substitutions.get(id).cloned().ok_or_else(|| unknown(id))
            })
            .collect()
    }
}

fn unknown(id: &str) -> ComposerError {
    ComposerError::UnknownSubstitution { id: id.to_string() }
}
