//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The index root or the forum store could not be reached
    #[error("Search engine unreachable: {0}")]
    Unreachable(String),

    /// No index has been set up yet
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Index setup failed
    #[error("Index setup failed: {0}")]
    IndexSetupFailed(String),

    /// Query execution failed. The cause is logged, not carried.
    #[error("Search failed")]
    SearchFailed,

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Document deletion failed
    #[error("Document deletion failed: {0}")]
    DeletionFailed(String),

    /// Forum store failure while syncing or merging results
    #[error("Forum store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tantivy error
    #[error("Tantivy error: {0}")]
    Tantivy(String),
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        SearchError::Tantivy(err.to_string())
    }
}

impl From<AppError> for SearchError {
    fn from(err: AppError) -> Self {
        SearchError::Store(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Unreachable(msg) | SearchError::IndexNotFound(msg) => {
                AppError::SearchUnavailable(msg)
            }
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::Store(msg) => AppError::Database(msg),
            SearchError::Io(err) => AppError::Io(err),
            _ => AppError::Search(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_failed_is_generic() {
        assert_eq!(SearchError::SearchFailed.to_string(), "Search failed");

        let app: AppError = SearchError::SearchFailed.into();
        assert_eq!(app.to_string(), "Search failed");
    }

    #[test]
    fn test_io_and_tantivy_conversions() {
        let err: SearchError = std::io::Error::other("disk full").into();
        assert!(matches!(err, SearchError::Io(_)));
        assert!(matches!(AppError::from(err), AppError::Io(_)));

        let err = SearchError::from(tantivy::TantivyError::InvalidArgument("bad".to_string()));
        assert!(matches!(err, SearchError::Tantivy(_)));
    }

    #[test]
    fn test_unreachable_maps_to_unavailable() {
        let app: AppError = SearchError::Unreachable("no index root".to_string()).into();
        assert!(matches!(app, AppError::SearchUnavailable(_)));
    }
}
