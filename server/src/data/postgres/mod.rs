//! PostgreSQL selection backend
//!
//! Process-wide factory plus the per-request selection engine. The factory
//! owns two pools over the same server:
//! - the primary pool, from which each engine borrows one connection for
//!   its whole lifetime;
//! - a single-connection pool dedicated to the changeset metadata loader,
//!   kept apart so cache misses can be filled while an engine is
//!   mid-stream on its own session.
//!
//! Statement text lives in [`sql`]; the driver's per-connection statement
//! cache keeps every statement prepared after first use.

mod error;
mod extract;
mod loader;
mod pg_array;
mod selection;
mod sql;

pub use error::PostgresError;
pub use extract::ExtractError;
pub use pg_array::ArrayLiteralError;
pub use selection::Selection;

use std::sync::Arc;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Executor;

use crate::core::config::DatabaseConfig;
use crate::core::constants::{
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
    POSTGRES_MIN_SERVER_VERSION,
};
use crate::data::cache::ChangesetCache;
use loader::ChangesetMetadataLoader;

/// Hands out selection engines; one instance per process.
///
/// Engines share the primary pool and one changeset metadata cache. Should
/// be created once at startup and shared across request workers.
pub struct SelectionFactory {
    pool: PgPool,
    loader_pool: PgPool,
    cache: ChangesetCache,
}

impl SelectionFactory {
    /// Connect both pools, verify the server version, and build the shared
    /// cache.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, PostgresError> {
        if config.dbname.is_empty() {
            return Err(PostgresError::Config("dbname is required".into()));
        }
        if config.charset.is_empty() {
            return Err(PostgresError::Config("charset is required".into()));
        }

        let max_connections = if config.max_connections > 0 {
            config.max_connections
        } else {
            POSTGRES_DEFAULT_MAX_CONNECTIONS
        };

        let statement_timeout = if config.statement_timeout_secs > 0 {
            config.statement_timeout_secs
        } else {
            POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS
        };

        let options = connect_options(config, statement_timeout);

        let pool = pool_options(&config.charset, max_connections)
            .connect_with(options.clone())
            .await?;
        let loader_pool = pool_options(&config.charset, 1)
            .connect_with(options)
            .await?;

        let (server_version,): (i32,) =
            sqlx::query_as(sql::SERVER_VERSION).fetch_one(&pool).await?;
        if server_version < POSTGRES_MIN_SERVER_VERSION {
            return Err(PostgresError::UnsupportedServerVersion {
                found: server_version,
            });
        }

        let loader = Arc::new(ChangesetMetadataLoader::new(loader_pool.clone()));
        let cache = ChangesetCache::new(config.cachesize.entries(), loader);

        tracing::debug!(
            max_connections,
            statement_timeout_secs = statement_timeout,
            server_version,
            cachesize = %config.cachesize,
            "selection factory initialized"
        );

        Ok(Self {
            pool,
            loader_pool,
            cache,
        })
    }

    /// A fresh engine on the primary pool, sharing the process-wide cache
    pub async fn make_selection(&self) -> Result<Selection, PostgresError> {
        Selection::new(&self.pool, self.cache.clone()).await
    }

    pub async fn health_check(&self) -> Result<(), PostgresError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close both pools gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        self.loader_pool.close().await;
        tracing::debug!("selection factory pools closed");
    }
}

fn connect_options(config: &DatabaseConfig, statement_timeout_secs: u64) -> PgConnectOptions {
    let mut options = PgConnectOptions::new().database(&config.dbname);
    if let Some(host) = &config.host {
        options = options.host(host);
    }
    if let Some(username) = &config.username {
        options = options.username(username);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(port) = config.dbport {
        options = options.port(port);
    }
    if statement_timeout_secs > 0 {
        options = options.options([(
            "statement_timeout",
            format!("{statement_timeout_secs}s"),
        )]);
    }
    options
}

/// Pool options applying the per-connection session setup: client text
/// encoding from the configured charset, and notice suppression.
fn pool_options(charset: &str, max_connections: u32) -> PgPoolOptions {
    let charset = charset.replace('\'', "''");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .after_connect(move |conn, _meta| {
            let encoding = format!("SET client_encoding TO '{charset}'");
            Box::pin(async move {
                conn.execute(encoding.as_str()).await?;
                conn.execute("SET client_min_messages TO WARNING").await?;
                Ok(())
            })
        })
}

#[cfg(test)]
mod tests {
    // Factory construction requires a running PostgreSQL instance and is
    // covered by integration tests.
}
