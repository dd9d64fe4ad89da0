//! Read-optimized OSM map-data selection backend
//!
//! Answers bulk read queries - map data by bounding box, elements by id
//! list, changesets with their discussions - against the authoritative
//! `current_*` tables of an OSM-style database. The embedding HTTP layer
//! drives one [`data::Selection`] engine per request: zero or more
//! selection operations grow transient working sets of element ids, then
//! emission operations stream the full entities through an
//! [`output::OutputFormatter`].
//!
//! Engines come from a process-wide [`data::SelectionFactory`], which owns
//! the connection pools and the shared changeset metadata cache.

pub mod core;
pub mod data;
pub mod domain;
pub mod output;
