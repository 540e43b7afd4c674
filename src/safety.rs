use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories inside a book that chapter edits must never touch.
pub const FORBIDDEN_DIRS: &[&str] = &["META-INF"];

/// Book boundary checks: chapter paths must resolve inside the unpacked book
/// and outside its container metadata.
#[derive(Debug, Clone)]
pub struct BookGuard {
    /// Canonical path to the book root
    book_root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside book: {path} (book: {book})")]
    OutsideBook { path: PathBuf, book: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl BookGuard {
    /// The root is canonicalized so symlinked books resolve correctly.
    pub fn new(book_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let book_root = book_root.as_ref().canonicalize()?;
        let forbidden_paths = FORBIDDEN_DIRS
            .iter()
            .map(|dir| book_root.join(dir))
            .collect();

        Ok(Self {
            book_root,
            forbidden_paths,
        })
    }

    /// Check that a chapter is safe to read and rewrite.
    ///
    /// Relative paths resolve against the book root. Returns the canonical
    /// absolute path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.book_root.join(path)
        };

        let canonical = absolute.canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.book_root) {
            return Err(SafetyError::OutsideBook {
                path: canonical.to_path_buf(),
                book: self.book_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn book_root(&self) -> &Path {
        &self.book_root
    }

    /// Path of a validated chapter relative to the book root.
    pub fn relative(&self, canonical: &Path) -> PathBuf {
        canonical
            .strip_prefix(&self.book_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| canonical.to_path_buf())
    }
}
