// =============================================================================
// Coordinates
// =============================================================================

/// Fixed scale factor between degrees and the integer coordinates stored in
/// the database. Latitudes and longitudes are persisted as `degrees * SCALE`
/// and every human-facing conversion divides by it.
pub const SCALE: f64 = 10_000_000.0;

// =============================================================================
// Changeset Metadata Cache
// =============================================================================

/// Default capacity of the changeset metadata cache (entries)
pub const DEFAULT_CHANGESET_CACHE_ENTRIES: u64 = 100_000;

// =============================================================================
// PostgreSQL
// =============================================================================

/// Minimum supported server version, as reported by `server_version_num`
/// (9.3, the oldest release with the LATERAL joins the extraction queries use)
pub const POSTGRES_MIN_SERVER_VERSION: i32 = 90300;

/// Default maximum connections in the primary (selection engine) pool
pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Default statement timeout in seconds (0 = disabled)
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;
