//! Parsed chapter cache.
//!
//! A plan usually carries many substitutions per chapter; each chapter is
//! read and parsed once and shared as `Arc<Dom>`. The cache is capped at 256
//! entries; when full it is cleared and rebuilt on demand.

use crate::dom::{Dom, DomError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const MAX_CACHE_ENTRIES: usize = 256;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: DomError,
    },
}

#[derive(Debug, Default)]
pub struct DomCache {
    entries: HashMap<PathBuf, Arc<Dom>>,
}

impl DomCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parsed chapter from cache, or read and parse it.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<Dom>, LoadError> {
        if let Some(dom) = self.entries.get(path) {
            return Ok(Arc::clone(dom));
        }

        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dom = Dom::load(text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded {} ({} nodes)", path.display(), dom.node_count());

        Ok(self.insert(path.to_path_buf(), dom))
    }

    pub fn insert(&mut self, path: PathBuf, dom: Dom) -> Arc<Dom> {
        if self.entries.len() >= MAX_CACHE_ENTRIES {
            self.entries.clear();
        }
        let dom = Arc::new(dom);
        self.entries.insert(path, Arc::clone(&dom));
        dom
    }

    /// Drop a chapter after it has been rewritten.
    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
