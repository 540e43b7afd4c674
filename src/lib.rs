//! Chapter Patcher: structural substitution for EPUB chapter markup
//!
//! Translated fragments are spliced back into XHTML chapters by position in
//! the document tree, while every byte outside the replaced nodes (prolog,
//! doctype, whitespace, entity spellings, attribute quoting) stays exactly as
//! it was.
//!
//! # Architecture
//!
//! - [`path`]: [`NodeId`] paths and [`Partition`] sibling runs, with the
//!   partial and total orders used to validate substitutions.
//! - [`dom`]: position-preserving parse ([`Dom::load`]), traversal and
//!   tokens, [`Dom::substitute_all`] and [`Dom::merge_substitutions`].
//! - [`composer`]: a [`Composer`] registry of candidate substitutions over one
//!   chapter, for picking and rendering subsets.
//! - [`config`]: TOML substitution plans and the applicator that renders them
//!   into a book, chapter by chapter.
//! - [`edit`], [`safety`], [`verify`], [`cache`]: atomic chapter writes, book
//!   boundary checks, stale-selection detection and parsed chapter reuse.
//!
//! # Example
//!
//! ```
//! use chapter_patcher::{Dom, Partition, Substitution};
//!
//! let dom = Dom::load("<body><p>Hello</p><p>World</p></body>").unwrap();
//! let partition = Partition::parse("0/1-1").unwrap();
//! assert_eq!(dom.extract_content(&partition).unwrap(), "<p>World</p>");
//!
//! let out = dom
//!     .substitute_all(&[Substitution::new(partition, "<p>Monde</p>")])
//!     .unwrap();
//! assert_eq!(out, "<body><p>Hello</p><p>Monde</p></body>");
//! ```

pub mod cache;
pub mod composer;
pub mod config;
pub mod dom;
pub mod edit;
pub mod path;
pub mod safety;
pub mod verify;

// Re-exports
pub use cache::{DomCache, LoadError};
pub use composer::{Composer, ComposerError};
pub use config::{
    apply_plan, check_plan, load_from_path, load_from_str, ApplicationError, ApplyOptions,
    ConfigError, SubstitutionPlan, SubstitutionResult,
};
pub use dom::{Dom, DomError, Node, NodeKind, Selector, Step, Substitution, Token, Traversal};
pub use edit::{ChapterEdit, EditError, EditResult};
pub use path::{NodeId, PathError, PathOrdering, Partition};
pub use safety::{BookGuard, SafetyError};
pub use verify::Verification;
