//! Error types for the to-do domain.

use crate::types::TodoId;
use serde::{Deserialize, Serialize};
use statecraft_runtime::StoreError;
use thiserror::Error;

/// Why the reducer refused an action
///
/// A refused action leaves state exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The title was empty or only whitespace
    #[error("{action}: title must not be empty")]
    EmptyTitle {
        /// Catalog tag of the refused action
        action: &'static str,
    },

    /// An item with this id already exists
    #[error("an item with id {0} already exists")]
    DuplicateId(TodoId),
}

/// Failure reported by a [`DataSource`](crate::environment::DataSource)
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceError {
    /// The source could not be reached; worth retrying
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with something that is not a list of items
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl DataSourceError {
    /// Whether a retry might succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors from [`refresh`](crate::store::refresh)
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The store did not accept the fetch or no result arrived in time
    #[error(transparent)]
    Store(#[from] StoreError<ValidationError>),

    /// The data source failed after retries
    #[error("fetch failed: {0}")]
    Source(#[from] DataSourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_transient() {
        assert!(DataSourceError::Unavailable("timeout".into()).is_transient());
        assert!(!DataSourceError::Malformed("not json".into()).is_transient());
    }

    #[test]
    fn validation_messages_name_the_action() {
        let error = ValidationError::EmptyTitle { action: "[Todo] Add" };
        assert_eq!(error.to_string(), "[Todo] Add: title must not be empty");
    }
}
