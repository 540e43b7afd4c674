use crate::path::PathError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("failed to parse markup at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("node not found: '{id}'")]
    NodeNotFound { id: String },

    #[error("overlapping partitions: '{first}' and '{second}'")]
    OverlappingPartitions { first: String, second: String },

    #[error(transparent)]
    Path(#[from] PathError),
}
