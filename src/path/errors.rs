use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("'{ancestor}' is not an ancestor of '{id}'")]
    NotAnAncestor { id: String, ancestor: String },
}

impl PathError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        PathError::InvalidArgument {
            message: message.into(),
        }
    }
}
