//! Output formatter contract
//!
//! The selection engine streams entities through this trait one at a time;
//! concrete XML/JSON formatters live with the HTTP layer and are outside
//! this crate. Each `write_*` call hands over one self-contained entity and
//! the formatter decides framing.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data::types::{
    ChangesetComment, ChangesetInfo, ElementId, ElementInfo, RelationMember, Tags,
};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Formatter error: {0}")]
    Message(String),
}

/// Sink for fully-assembled entities.
///
/// Calls arrive in ascending id order per entity kind; tag, member and
/// way-node order within an entity follows stored sequence order.
pub trait OutputFormatter {
    fn write_node(
        &mut self,
        elem: &ElementInfo,
        lon: f64,
        lat: f64,
        tags: &Tags,
    ) -> Result<(), FormatError>;

    fn write_way(
        &mut self,
        elem: &ElementInfo,
        nodes: &[ElementId],
        tags: &Tags,
    ) -> Result<(), FormatError>;

    fn write_relation(
        &mut self,
        elem: &ElementInfo,
        members: &[RelationMember],
        tags: &Tags,
    ) -> Result<(), FormatError>;

    fn write_changeset(
        &mut self,
        elem: &ChangesetInfo,
        tags: &Tags,
        include_discussions: bool,
        comments: &[ChangesetComment],
        now: DateTime<Utc>,
    ) -> Result<(), FormatError>;
}
