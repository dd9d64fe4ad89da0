//! Row extractors
//!
//! Projections from one extraction-query row into the canonical entity
//! shapes. Child collections arrive as parallel array literals (see
//! [`super::pg_array`]); their parsed lengths must agree or the row is
//! malformed. Author fields are looked up through the changeset metadata
//! cache and withheld when the author's data is not public.

use sqlx::Row;
use sqlx::postgres::PgRow;
use thiserror::Error;

use super::pg_array::{ArrayLiteralError, parse_array_literal};
use crate::data::cache::ChangesetCache;
use crate::data::types::{
    Bbox, ChangesetComment, ChangesetId, ChangesetInfo, ElementId, ElementInfo, MemberType,
    RelationMember, Tags,
};

use super::error::PostgresError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error(transparent)]
    Array(#[from] ArrayLiteralError),

    #[error("tag key and value arrays differ in length ({keys} keys, {values} values)")]
    TagArityMismatch { keys: usize, values: usize },

    #[error(
        "member arrays differ in length ({types} types, {ids} ids, {roles} roles)"
    )]
    MemberArityMismatch {
        types: usize,
        ids: usize,
        roles: usize,
    },

    #[error(
        "comment arrays differ in length ({author_ids} authors, {display_names} names, \
         {bodies} bodies, {created_ats} timestamps)"
    )]
    CommentArityMismatch {
        author_ids: usize,
        display_names: usize,
        bodies: usize,
        created_ats: usize,
    },

    #[error("unexpected member type {0:?}")]
    UnknownMemberType(String),

    #[error("unexpected NULL element in {0} array")]
    UnexpectedNull(&'static str),

    #[error("invalid integer {value:?} in {column} array")]
    BadNumber {
        column: &'static str,
        value: String,
    },
}

// ============================================================================
// Array column helpers
// ============================================================================

/// Parse an optional array-literal column; SQL NULL reads as empty.
fn parse_column(column: Option<&str>) -> Result<Vec<Option<String>>, ExtractError> {
    match column {
        Some(text) => Ok(parse_array_literal(text)?),
        None => Ok(Vec::new()),
    }
}

/// Reject null elements inside an array whose schema forbids them
fn required_elements(
    column: &'static str,
    values: Vec<Option<String>>,
) -> Result<Vec<String>, ExtractError> {
    values
        .into_iter()
        .map(|v| v.ok_or(ExtractError::UnexpectedNull(column)))
        .collect()
}

fn parse_id(column: &'static str, value: &str) -> Result<ElementId, ExtractError> {
    value.parse().map_err(|_| ExtractError::BadNumber {
        column,
        value: value.to_string(),
    })
}

fn parse_author_id(column: &'static str, value: &str) -> Result<i64, ExtractError> {
    value.parse().map_err(|_| ExtractError::BadNumber {
        column,
        value: value.to_string(),
    })
}

// ============================================================================
// Pure extractors
// ============================================================================

/// Member type from its stored name; matched case-insensitively on the
/// first character.
pub fn member_type_from_db(name: &str) -> Result<MemberType, ExtractError> {
    match name.chars().next() {
        Some('N' | 'n') => Ok(MemberType::Node),
        Some('W' | 'w') => Ok(MemberType::Way),
        Some('R' | 'r') => Ok(MemberType::Relation),
        _ => Err(ExtractError::UnknownMemberType(name.to_string())),
    }
}

/// Tags from the parallel `tag_k` / `tag_v` aggregates
pub fn extract_tags(tag_k: Option<&str>, tag_v: Option<&str>) -> Result<Tags, ExtractError> {
    let keys = required_elements("tag_k", parse_column(tag_k)?)?;
    let values = required_elements("tag_v", parse_column(tag_v)?)?;

    if keys.len() != values.len() {
        return Err(ExtractError::TagArityMismatch {
            keys: keys.len(),
            values: values.len(),
        });
    }

    Ok(keys.into_iter().zip(values).collect())
}

/// Way node list from the `node_ids` aggregate, in stored sequence order
pub fn extract_way_nodes(node_ids: Option<&str>) -> Result<Vec<ElementId>, ExtractError> {
    required_elements("node_ids", parse_column(node_ids)?)?
        .iter()
        .map(|id| parse_id("node_ids", id))
        .collect()
}

/// Relation members from the three parallel member aggregates
pub fn extract_members(
    member_types: Option<&str>,
    member_ids: Option<&str>,
    member_roles: Option<&str>,
) -> Result<Vec<RelationMember>, ExtractError> {
    let types = required_elements("member_types", parse_column(member_types)?)?;
    let ids = required_elements("member_ids", parse_column(member_ids)?)?;
    let roles = required_elements("member_roles", parse_column(member_roles)?)?;

    if types.len() != ids.len() || ids.len() != roles.len() {
        return Err(ExtractError::MemberArityMismatch {
            types: types.len(),
            ids: ids.len(),
            roles: roles.len(),
        });
    }

    types
        .iter()
        .zip(ids.iter())
        .zip(roles)
        .map(|((member_type, ref_id), role)| {
            Ok(RelationMember {
                member_type: member_type_from_db(member_type)?,
                ref_id: parse_id("member_ids", ref_id)?,
                role,
            })
        })
        .collect()
}

/// Changeset discussion comments from the four parallel comment aggregates
pub fn extract_comments(
    author_ids: Option<&str>,
    display_names: Option<&str>,
    bodies: Option<&str>,
    created_ats: Option<&str>,
) -> Result<Vec<ChangesetComment>, ExtractError> {
    let author_ids = required_elements("comment_author_ids", parse_column(author_ids)?)?;
    let display_names = required_elements("comment_display_names", parse_column(display_names)?)?;
    let bodies = required_elements("comment_bodies", parse_column(bodies)?)?;
    let created_ats = required_elements("comment_created_ats", parse_column(created_ats)?)?;

    if author_ids.len() != display_names.len()
        || display_names.len() != bodies.len()
        || bodies.len() != created_ats.len()
    {
        return Err(ExtractError::CommentArityMismatch {
            author_ids: author_ids.len(),
            display_names: display_names.len(),
            bodies: bodies.len(),
            created_ats: created_ats.len(),
        });
    }

    author_ids
        .iter()
        .zip(display_names)
        .zip(bodies)
        .zip(created_ats)
        .map(|(((author_id, author_display_name), body), created_at)| {
            Ok(ChangesetComment {
                author_id: parse_author_id("comment_author_ids", author_id)?,
                author_display_name,
                body,
                created_at,
            })
        })
        .collect()
}

// ============================================================================
// Row projections
// ============================================================================

fn array_column(row: &PgRow, column: &str) -> Result<Option<String>, sqlx::Error> {
    row.try_get::<Option<String>, _>(column)
}

/// Tags from a row's `tag_k` / `tag_v` columns
pub(crate) fn row_tags(row: &PgRow) -> Result<Tags, PostgresError> {
    let tag_k = array_column(row, "tag_k")?;
    let tag_v = array_column(row, "tag_v")?;
    Ok(extract_tags(tag_k.as_deref(), tag_v.as_deref())?)
}

/// Element header, with author fields resolved through the cache
pub(crate) async fn row_element_info(
    row: &PgRow,
    cache: &ChangesetCache,
) -> Result<ElementInfo, PostgresError> {
    let id: i64 = row.try_get("id")?;
    let version: i32 = row.try_get("version")?;
    let timestamp: String = row.try_get("timestamp")?;
    let changeset: i64 = row.try_get("changeset_id")?;
    let visible: bool = row.try_get("visible")?;

    let author = cache.get(changeset as ChangesetId).await?;
    let (uid, display_name) = if author.data_public {
        (author.user_id, author.display_name.clone())
    } else {
        (None, None)
    };

    Ok(ElementInfo {
        id: id as ElementId,
        version,
        timestamp,
        changeset: changeset as ChangesetId,
        visible,
        uid,
        display_name,
    })
}

/// Way node list from a row's `node_ids` column
pub(crate) fn row_way_nodes(row: &PgRow) -> Result<Vec<ElementId>, PostgresError> {
    let node_ids = array_column(row, "node_ids")?;
    Ok(extract_way_nodes(node_ids.as_deref())?)
}

/// Relation members from a row's member columns
pub(crate) fn row_members(row: &PgRow) -> Result<Vec<RelationMember>, PostgresError> {
    let member_types = array_column(row, "member_types")?;
    let member_ids = array_column(row, "member_ids")?;
    let member_roles = array_column(row, "member_roles")?;
    Ok(extract_members(
        member_types.as_deref(),
        member_ids.as_deref(),
        member_roles.as_deref(),
    )?)
}

/// Discussion comments from a row's comment columns
pub(crate) fn row_comments(row: &PgRow) -> Result<Vec<ChangesetComment>, PostgresError> {
    let author_ids = array_column(row, "comment_author_ids")?;
    let display_names = array_column(row, "comment_display_names")?;
    let bodies = array_column(row, "comment_bodies")?;
    let created_ats = array_column(row, "comment_created_ats")?;
    Ok(extract_comments(
        author_ids.as_deref(),
        display_names.as_deref(),
        bodies.as_deref(),
        created_ats.as_deref(),
    )?)
}

/// Scaled coordinates from a node row, converted to degrees
pub(crate) fn row_node_position(row: &PgRow) -> Result<(f64, f64), PostgresError> {
    use crate::core::constants::SCALE;

    let latitude: i32 = row.try_get("latitude")?;
    let longitude: i32 = row.try_get("longitude")?;
    Ok((f64::from(longitude) / SCALE, f64::from(latitude) / SCALE))
}

/// Changeset header, with author fields resolved through the cache and the
/// bounding box assembled all-or-nothing from the four scaled coordinates
pub(crate) async fn row_changeset_info(
    row: &PgRow,
    cache: &ChangesetCache,
    comments_count: usize,
) -> Result<ChangesetInfo, PostgresError> {
    let id: i64 = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    let closed_at: String = row.try_get("closed_at")?;
    let min_lat: Option<i32> = row.try_get("min_lat")?;
    let max_lat: Option<i32> = row.try_get("max_lat")?;
    let min_lon: Option<i32> = row.try_get("min_lon")?;
    let max_lon: Option<i32> = row.try_get("max_lon")?;
    let num_changes: i32 = row.try_get("num_changes")?;

    let author = cache.get(id as ChangesetId).await?;
    let (uid, display_name) = if author.data_public {
        (author.user_id, author.display_name.clone())
    } else {
        (None, None)
    };

    Ok(ChangesetInfo {
        id: id as ChangesetId,
        created_at,
        closed_at,
        uid,
        display_name,
        bounding_box: Bbox::from_scaled(
            min_lat.map(i64::from),
            min_lon.map(i64::from),
            max_lat.map(i64::from),
            max_lon.map(i64::from),
        ),
        num_changes,
        comments_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_type_first_character_match() {
        assert_eq!(member_type_from_db("Node").unwrap(), MemberType::Node);
        assert_eq!(member_type_from_db("node").unwrap(), MemberType::Node);
        assert_eq!(member_type_from_db("Way").unwrap(), MemberType::Way);
        assert_eq!(member_type_from_db("w").unwrap(), MemberType::Way);
        assert_eq!(
            member_type_from_db("Relation").unwrap(),
            MemberType::Relation
        );
        assert_eq!(member_type_from_db("r").unwrap(), MemberType::Relation);
    }

    #[test]
    fn test_member_type_unknown() {
        assert_eq!(
            member_type_from_db("Changeset"),
            Err(ExtractError::UnknownMemberType("Changeset".to_string()))
        );
        assert_eq!(
            member_type_from_db(""),
            Err(ExtractError::UnknownMemberType(String::new()))
        );
    }

    #[test]
    fn test_tags_parallel_arrays() {
        let tags = extract_tags(Some("{highway,name}"), Some(r#"{residential,"Main, St"}"#))
            .unwrap();
        assert_eq!(
            tags,
            vec![
                ("highway".to_string(), "residential".to_string()),
                ("name".to_string(), "Main, St".to_string()),
            ]
        );
    }

    #[test]
    fn test_tags_null_arrays_are_empty() {
        assert_eq!(extract_tags(None, None).unwrap(), Tags::new());
    }

    #[test]
    fn test_tags_length_mismatch() {
        assert_eq!(
            extract_tags(Some("{a,b}"), Some("{x}")),
            Err(ExtractError::TagArityMismatch { keys: 2, values: 1 })
        );
        // one side missing entirely counts as zero length
        assert_eq!(
            extract_tags(Some("{a}"), None),
            Err(ExtractError::TagArityMismatch { keys: 1, values: 0 })
        );
    }

    #[test]
    fn test_tags_reject_null_elements() {
        assert_eq!(
            extract_tags(Some("{NULL}"), Some("{x}")),
            Err(ExtractError::UnexpectedNull("tag_k"))
        );
    }

    #[test]
    fn test_way_nodes_preserve_order_and_repeats() {
        assert_eq!(
            extract_way_nodes(Some("{5,7,5,9}")).unwrap(),
            vec![5, 7, 5, 9]
        );
    }

    #[test]
    fn test_way_nodes_empty() {
        assert_eq!(extract_way_nodes(None).unwrap(), Vec::<ElementId>::new());
    }

    #[test]
    fn test_way_nodes_bad_number() {
        assert!(matches!(
            extract_way_nodes(Some("{5,x}")),
            Err(ExtractError::BadNumber { column: "node_ids", .. })
        ));
    }

    #[test]
    fn test_members_parallel_arrays() {
        let members = extract_members(
            Some("{Node,Way,Relation}"),
            Some("{1,2,3}"),
            Some(r#"{from,"",via}"#),
        )
        .unwrap();
        assert_eq!(
            members,
            vec![
                RelationMember {
                    member_type: MemberType::Node,
                    ref_id: 1,
                    role: "from".to_string(),
                },
                RelationMember {
                    member_type: MemberType::Way,
                    ref_id: 2,
                    role: String::new(),
                },
                RelationMember {
                    member_type: MemberType::Relation,
                    ref_id: 3,
                    role: "via".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_members_empty() {
        assert_eq!(extract_members(None, None, None).unwrap(), Vec::new());
    }

    #[test]
    fn test_members_length_mismatch() {
        assert_eq!(
            extract_members(Some("{Node,Way}"), Some("{1}"), Some("{a}")),
            Err(ExtractError::MemberArityMismatch {
                types: 2,
                ids: 1,
                roles: 1,
            })
        );
    }

    #[test]
    fn test_members_unknown_type() {
        assert!(matches!(
            extract_members(Some("{Changeset}"), Some("{1}"), Some("{a}")),
            Err(ExtractError::UnknownMemberType(_))
        ));
    }

    #[test]
    fn test_comments_parallel_arrays() {
        let comments = extract_comments(
            Some("{7,9}"),
            Some(r#"{alice,"bob jones"}"#),
            Some(r#"{"looks good","needs, work"}"#),
            Some("{2024-01-01T00:00:00Z,2024-01-02T00:00:00Z}"),
        )
        .unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author_id, 7);
        assert_eq!(comments[0].author_display_name, "alice");
        assert_eq!(comments[1].body, "needs, work");
        assert_eq!(comments[1].created_at, "2024-01-02T00:00:00Z");
    }

    #[test]
    fn test_comments_empty() {
        assert_eq!(
            extract_comments(None, None, None, None).unwrap(),
            Vec::new()
        );
    }

    #[test]
    fn test_comments_length_mismatch() {
        assert_eq!(
            extract_comments(
                Some("{7}"),
                Some("{alice}"),
                Some("{hi}"),
                Some("{a,b}"),
            ),
            Err(ExtractError::CommentArityMismatch {
                author_ids: 1,
                display_names: 1,
                bodies: 1,
                created_ats: 2,
            })
        );
    }
}
