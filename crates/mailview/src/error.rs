//! Error types surfaced by the view-state components
//!
//! Every variant is recoverable: the record list, flag overrides and color
//! map stay usable after any of them is returned.

use crate::models::Flag;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// A page fetch failed; the list is untouched and `load_more` can be retried
    #[error("Failed to fetch message list: {message}")]
    SyncFetchFailed { message: String },

    /// A flag update was rejected; the optimistic change has been reverted
    #[error("Failed to update {flag} flag: {message}")]
    MutationFailed { flag: Flag, message: String },

    /// The HTML body could not be sanitized; callers render the text fallback
    #[error("Message body could not be sanitized: {reason}")]
    SanitizationFailure { reason: String },

    #[error("Invalid cursor: {message}")]
    InvalidCursor { message: String },

    /// The record or attachment lacks the identifiers needed to reach the backend
    #[error("Not addressable on the backend: {what}")]
    NotAddressable { what: String },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

impl ViewError {
    pub(crate) fn sync(err: &anyhow::Error) -> Self {
        Self::SyncFetchFailed {
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn backend(err: &anyhow::Error) -> Self {
        Self::Backend {
            message: format!("{err:#}"),
        }
    }
}

pub type Result<T, E = ViewError> = std::result::Result<T, E>;
