//! Data storage layer
//!
//! - `postgres` - selection factory and per-request selection engine
//! - `cache` - changeset metadata cache shared across engines
//! - `types` - canonical entity shapes shared across the layer

pub mod cache;
pub mod postgres;
pub mod types;

pub use postgres::{PostgresError, Selection, SelectionFactory};
