//! Changeset types

use serde::{Deserialize, Serialize};

use super::elements::{Bbox, ChangesetId};

/// Changeset header as emitted to the formatter.
///
/// The author privacy rule from [`CachedChangeset`] applies to `uid` and
/// `display_name` here too: both are `None` when the author's data is not
/// public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangesetInfo {
    pub id: ChangesetId,
    /// Pre-formatted `YYYY-MM-DDTHH:MM:SSZ` timestamp from the database
    pub created_at: String,
    /// Pre-formatted `YYYY-MM-DDTHH:MM:SSZ` timestamp from the database
    pub closed_at: String,
    pub uid: Option<i64>,
    pub display_name: Option<String>,
    pub bounding_box: Option<Bbox>,
    pub num_changes: i32,
    /// Count of visible discussion comments; reported even when the
    /// discussion bodies themselves are not emitted
    pub comments_count: usize,
}

/// One visible comment in a changeset discussion, in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesetComment {
    pub author_id: i64,
    pub author_display_name: String,
    pub body: String,
    /// Pre-formatted `YYYY-MM-DDTHH:MM:SSZ` timestamp from the database
    pub created_at: String,
}

/// Author metadata held by the changeset cache.
///
/// Invariant: when `data_public` is false the author fields must not reach
/// any emitted record. A changeset id with no backing row is represented by
/// [`CachedChangeset::private`], which degrades emission to author-less
/// rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedChangeset {
    pub user_id: Option<i64>,
    pub display_name: Option<String>,
    pub data_public: bool,
}

impl CachedChangeset {
    /// Synthetic entry for a missing or withheld changeset row
    pub fn private() -> Self {
        Self {
            user_id: None,
            display_name: None,
            data_public: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_changeset_has_no_author() {
        let cs = CachedChangeset::private();
        assert!(!cs.data_public);
        assert_eq!(cs.user_id, None);
        assert_eq!(cs.display_name, None);
    }
}
