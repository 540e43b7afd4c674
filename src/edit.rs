use crate::verify::Verification;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rewrite of one chapter file.
///
/// The substitution engine renders whole chapters, so the write primitive is
/// a full-file replacement guarded by a check that the source still holds the
/// text the rendering was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "ChapterEdit does nothing until apply() is called"]
pub struct ChapterEdit {
    /// Chapter the rendering was computed from
    pub source: PathBuf,
    /// Where the rendered chapter goes; equal to `source` for in-place edits
    pub target: PathBuf,
    pub new_text: String,
    /// What `source` must still contain
    pub expected_before: Verification,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("{file} changed since it was loaded ({found_len} bytes now)")]
    BeforeTextMismatch { file: PathBuf, found_len: usize },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for written/unchanged"]
pub enum EditResult {
    Written { file: PathBuf, bytes: usize },
    /// Target already holds the new text
    Unchanged { file: PathBuf },
}

impl ChapterEdit {
    /// In-place rewrite of `file`, verified against `original`.
    pub fn new(file: impl Into<PathBuf>, original: &str, new_text: impl Into<String>) -> Self {
        let file = file.into();
        Self {
            source: file.clone(),
            target: file,
            new_text: new_text.into(),
            expected_before: Verification::from_text(original),
        }
    }

    /// Write the rendering somewhere other than the source chapter.
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = target.into();
        self
    }

    fn validate(&self) -> Result<(), EditError> {
        let current = fs::read(&self.source)?;
        let current_text = std::str::from_utf8(&current)?;

        // A rerun over an in-place edit sees its own output.
        if self.source == self.target && current_text == self.new_text {
            return Ok(());
        }

        if !self.expected_before.matches(current_text) {
            return Err(EditError::BeforeTextMismatch {
                file: self.source.clone(),
                found_len: current.len(),
            });
        }
        Ok(())
    }

    /// Verify the source, then write the target atomically.
    pub fn apply(&self) -> Result<EditResult, EditError> {
        self.validate()?;
        self.write()
    }

    fn write(&self) -> Result<EditResult, EditError> {
        match fs::read(&self.target) {
            Ok(existing) if existing == self.new_text.as_bytes() => {
                return Ok(EditResult::Unchanged {
                    file: self.target.clone(),
                });
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        atomic_write(&self.target, self.new_text.as_bytes())?;
        Ok(EditResult::Written {
            file: self.target.clone(),
            bytes: self.new_text.len(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes. Missing parent
/// directories are created.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
