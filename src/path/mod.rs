//! Structural addressing: node paths, sibling ranges and their orderings.
//!
//! A [`NodeId`] names one node of one parsed snapshot by the child indices
//! walked from the root. A [`Partition`] names a run of consecutive siblings
//! and everything beneath them; it is the unit a substitution replaces.

pub mod errors;
pub mod node_id;
pub mod order;
pub mod partition;

pub use errors::PathError;
pub use node_id::NodeId;
pub use order::PathOrdering;
pub use partition::Partition;
