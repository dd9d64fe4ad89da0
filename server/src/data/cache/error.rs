//! Cache error types

use thiserror::Error;

/// Errors surfaced by the changeset metadata cache.
///
/// Cloneable so that concurrent waiters sharing one in-flight load all
/// receive the failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("changeset metadata load failed: {0}")]
    Loader(String),
}
