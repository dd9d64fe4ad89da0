//! Shared data types for the selection backend
//!
//! Canonical in-memory shapes for map elements and changesets, used by the
//! selection engine, the row extractors, the metadata cache and the output
//! formatter contract.

mod changesets;
mod elements;

pub use changesets::{CachedChangeset, ChangesetComment, ChangesetInfo};
pub use elements::{
    Bbox, ChangesetId, ElementId, ElementInfo, MemberType, RelationMember, Tags, Visibility,
};
