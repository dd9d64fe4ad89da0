//! Domain logic independent of any storage backend

pub mod tiles;
