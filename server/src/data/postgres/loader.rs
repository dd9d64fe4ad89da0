//! Changeset metadata loader
//!
//! Backs the shared changeset cache. Queries run on the factory's dedicated
//! single-connection pool, never on a selection engine's session; the single
//! connection also serializes loads process-wide.

use async_trait::async_trait;
use sqlx::PgPool;

use super::sql;
use crate::data::cache::{CacheError, ChangesetLoader};
use crate::data::types::{CachedChangeset, ChangesetId};

pub struct ChangesetMetadataLoader {
    pool: PgPool,
}

impl ChangesetMetadataLoader {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangesetLoader for ChangesetMetadataLoader {
    async fn load(&self, id: ChangesetId) -> Result<CachedChangeset, CacheError> {
        let row: Option<(i64, String, bool)> = sqlx::query_as(sql::CHANGESET_AUTHOR)
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CacheError::Loader(e.to_string()))?;
        Ok(author_from_row(row))
    }
}

/// A missing changeset row is represented as the synthetic private entry so
/// emission degrades to author-less instead of failing.
fn author_from_row(row: Option<(i64, String, bool)>) -> CachedChangeset {
    match row {
        Some((user_id, display_name, data_public)) => CachedChangeset {
            user_id: Some(user_id),
            display_name: Some(display_name),
            data_public,
        },
        None => CachedChangeset::private(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_row_carries_author() {
        let entry = author_from_row(Some((17, "alice".to_string(), true)));
        assert_eq!(entry.user_id, Some(17));
        assert_eq!(entry.display_name.as_deref(), Some("alice"));
        assert!(entry.data_public);
    }

    #[test]
    fn test_present_row_can_be_private() {
        let entry = author_from_row(Some((17, "alice".to_string(), false)));
        assert!(!entry.data_public);
        // fields are still cached; emission is responsible for withholding them
        assert_eq!(entry.user_id, Some(17));
    }

    #[test]
    fn test_missing_row_is_synthetic_private() {
        assert_eq!(author_from_row(None), CachedChangeset::private());
    }
}
