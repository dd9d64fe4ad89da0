//! PostgreSQL backend error types

use thiserror::Error;

use super::extract::ExtractError;
use crate::data::cache::CacheError;
use crate::output::FormatError;

#[derive(Error, Debug)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported PostgreSQL server version {found}; 9.3+ is required")]
    UnsupportedServerVersion { found: i32 },

    #[error("Malformed row: {0}")]
    MalformedRow(#[from] ExtractError),

    #[error("Changeset cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Formatter error: {0}")]
    Format(#[from] FormatError),

    /// Bounding-box selection ran against an engine whose working sets were
    /// already populated. The bulk insert deliberately skips the anti-join
    /// for speed, so running it on a non-empty set would corrupt the
    /// selection; the caller's request sequencing is at fault and the
    /// request cannot be salvaged.
    #[error(
        "bounding-box node selection requires empty working sets but the engine \
         has already selected content; this is a bug in the request handler"
    )]
    WorkingSetsNotEmpty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_version_display() {
        let err = PostgresError::UnsupportedServerVersion { found: 90200 };
        assert_eq!(
            err.to_string(),
            "Unsupported PostgreSQL server version 90200; 9.3+ is required"
        );
    }

    #[test]
    fn test_malformed_row_wraps_extract_error() {
        let err = PostgresError::from(ExtractError::TagArityMismatch { keys: 2, values: 1 });
        assert!(err.to_string().starts_with("Malformed row:"));
    }
}
