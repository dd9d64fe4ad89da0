//! Selection engine
//!
//! One engine serves one request. It owns a transaction on the primary pool
//! for its whole lifetime; the four working-set tables are created inside
//! that transaction, so dropping the engine (or calling [`Selection::close`])
//! rolls everything back and the session comes back clean.
//!
//! Selection operations grow the working sets (monotonically, idempotently,
//! and only with ids present in the authoritative tables); emission
//! operations stream the selected entities through an [`OutputFormatter`]
//! row by row without materializing the result set.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};

use super::error::PostgresError;
use super::{extract, sql};
use crate::core::constants::SCALE;
use crate::data::cache::ChangesetCache;
use crate::data::types::{Bbox, ChangesetId, ElementId, Visibility};
use crate::domain::tiles::tiles_for_area;
use crate::output::OutputFormatter;

pub struct Selection {
    tx: Transaction<'static, Postgres>,
    cache: ChangesetCache,
    include_changeset_discussions: bool,
    tables_empty: bool,
}

impl Selection {
    pub(crate) async fn new(pool: &PgPool, cache: ChangesetCache) -> Result<Self, PostgresError> {
        let mut tx = pool.begin().await?;
        for ddl in sql::WORKING_SET_DDL {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        Ok(Self {
            tx,
            cache,
            include_changeset_discussions: false,
            tables_empty: true,
        })
    }

    /// Roll back the engine's transaction, dropping the working-set tables.
    ///
    /// Dropping the engine without calling this has the same effect; the
    /// rollback then happens when the connection returns to the pool.
    pub async fn close(self) -> Result<(), PostgresError> {
        self.tx.rollback().await?;
        Ok(())
    }

    // ========================================================================
    // Visibility probes
    // ========================================================================

    pub async fn check_node_visibility(
        &mut self,
        id: ElementId,
    ) -> Result<Visibility, PostgresError> {
        self.check_visibility(sql::NODE_VISIBILITY, id).await
    }

    pub async fn check_way_visibility(
        &mut self,
        id: ElementId,
    ) -> Result<Visibility, PostgresError> {
        self.check_visibility(sql::WAY_VISIBILITY, id).await
    }

    pub async fn check_relation_visibility(
        &mut self,
        id: ElementId,
    ) -> Result<Visibility, PostgresError> {
        self.check_visibility(sql::RELATION_VISIBILITY, id).await
    }

    async fn check_visibility(
        &mut self,
        statement: &'static str,
        id: ElementId,
    ) -> Result<Visibility, PostgresError> {
        let row: Option<(bool,)> = sqlx::query_as(statement)
            .bind(id as i64)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(match row {
            Some((true,)) => Visibility::Exists,
            Some((false,)) => Visibility::Deleted,
            None => Visibility::NotFound,
        })
    }

    // ========================================================================
    // Selection by id list
    // ========================================================================

    /// Add the listed nodes to the working set. Ids absent from
    /// `current_nodes` and ids already selected are skipped; the count of
    /// ids actually inserted is returned.
    pub async fn select_nodes(&mut self, ids: &[ElementId]) -> Result<u64, PostgresError> {
        self.tables_empty = false;
        self.insert_id_list(sql::ADD_NODES_BY_ID, ids).await
    }

    pub async fn select_ways(&mut self, ids: &[ElementId]) -> Result<u64, PostgresError> {
        self.tables_empty = false;
        self.insert_id_list(sql::ADD_WAYS_BY_ID, ids).await
    }

    pub async fn select_relations(&mut self, ids: &[ElementId]) -> Result<u64, PostgresError> {
        self.tables_empty = false;
        self.insert_id_list(sql::ADD_RELATIONS_BY_ID, ids).await
    }

    /// Changeset selection never feeds the bounding-box path, so it leaves
    /// the empty-sets flag alone.
    pub async fn select_changesets(&mut self, ids: &[ChangesetId]) -> Result<u64, PostgresError> {
        self.insert_id_list(sql::ADD_CHANGESETS_BY_ID, ids).await
    }

    async fn insert_id_list(
        &mut self,
        statement: &'static str,
        ids: &[u64],
    ) -> Result<u64, PostgresError> {
        let ids: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
        let result = sqlx::query(statement)
            .bind(&ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Selection by bounding box
    // ========================================================================

    /// Bulk-select visible nodes inside `bbox`, at most `max_nodes + 1` of
    /// them; a returned count of `max_nodes + 1` tells the caller the box
    /// overflowed its limit without a separate count query.
    ///
    /// Only valid as the first selection on a fresh engine: the insert
    /// skips the anti-join against `tmp_nodes` for speed, which is safe
    /// exactly when all working sets are still empty.
    pub async fn select_nodes_from_bbox(
        &mut self,
        bbox: &Bbox,
        max_nodes: u32,
    ) -> Result<u64, PostgresError> {
        if !self.tables_empty {
            return Err(PostgresError::WorkingSetsNotEmpty);
        }
        self.tables_empty = false;

        let tiles: Vec<i64> = tiles_for_area(bbox).into_iter().map(|t| t as i64).collect();

        // work around planner misestimation on the tile probe; scoped to
        // this transaction
        sqlx::query(sql::DISABLE_MERGEJOIN)
            .execute(&mut *self.tx)
            .await?;
        sqlx::query(sql::DISABLE_HASHJOIN)
            .execute(&mut *self.tx)
            .await?;

        tracing::debug!(
            tiles = tiles.len(),
            max_nodes,
            "filling tmp_nodes from bounding box"
        );

        let result = sqlx::query(sql::ADD_NODES_BY_BBOX)
            .bind(&tiles)
            .bind((bbox.minlat * SCALE) as i32)
            .bind((bbox.maxlat * SCALE) as i32)
            .bind((bbox.minlon * SCALE) as i32)
            .bind((bbox.maxlon * SCALE) as i32)
            .bind(i64::from(max_nodes) + 1)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Graph expansion
    // ========================================================================

    /// Add the Node-typed members of every selected relation
    pub async fn select_nodes_from_relations(&mut self) -> Result<(), PostgresError> {
        tracing::debug!("filling tmp_nodes from relation members");
        self.expand(sql::ADD_NODES_FROM_RELATIONS).await
    }

    /// Add every way that contains a selected node
    pub async fn select_ways_from_nodes(&mut self) -> Result<(), PostgresError> {
        tracing::debug!("filling tmp_ways from selected nodes");
        self.expand(sql::ADD_WAYS_FROM_NODES).await
    }

    /// Add the Way-typed members of every selected relation
    pub async fn select_ways_from_relations(&mut self) -> Result<(), PostgresError> {
        tracing::debug!("filling tmp_ways from relation members");
        self.expand(sql::ADD_WAYS_FROM_RELATIONS).await
    }

    /// Add every node referenced by a selected way
    pub async fn select_nodes_from_way_nodes(&mut self) -> Result<(), PostgresError> {
        self.expand(sql::ADD_NODES_FROM_WAY_NODES).await
    }

    /// Add every relation with a selected node as a Node member
    pub async fn select_relations_from_nodes(&mut self) -> Result<(), PostgresError> {
        self.expand(sql::ADD_RELATIONS_FROM_NODES).await
    }

    /// Add every relation with a selected way as a Way member
    pub async fn select_relations_from_ways(&mut self) -> Result<(), PostgresError> {
        tracing::debug!("filling tmp_relations from selected ways");
        self.expand(sql::ADD_RELATIONS_FROM_WAYS).await
    }

    /// Add every relation with a selected relation as a Relation member
    pub async fn select_relations_from_relations(&mut self) -> Result<(), PostgresError> {
        self.expand(sql::ADD_RELATIONS_FROM_RELATIONS).await
    }

    /// Add the Relation-typed members of every selected relation; one hop,
    /// not the transitive closure
    pub async fn select_relations_members_of_relations(&mut self) -> Result<(), PostgresError> {
        self.expand(sql::ADD_RELATION_MEMBERS_OF_RELATIONS).await
    }

    async fn expand(&mut self, statement: &'static str) -> Result<(), PostgresError> {
        sqlx::query(statement).execute(&mut *self.tx).await?;
        Ok(())
    }

    // ========================================================================
    // Changeset discussions
    // ========================================================================

    /// Include full discussion comments in changeset emission. Off by
    /// default; `comments_count` is reported either way.
    pub fn select_changeset_discussions(&mut self) {
        self.include_changeset_discussions = true;
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Stream every selected node through the formatter, in ascending id
    /// order. Intended to be called at most once per engine.
    pub async fn write_nodes(
        &mut self,
        formatter: &mut dyn OutputFormatter,
    ) -> Result<(), PostgresError> {
        tracing::debug!("fetching nodes");
        let Self { tx, cache, .. } = self;

        let mut rows = sqlx::query(sql::EXTRACT_NODES).fetch(&mut **tx);
        while let Some(row) = rows.try_next().await? {
            let elem = extract::row_element_info(&row, cache).await?;
            let (lon, lat) = extract::row_node_position(&row)?;
            let tags = extract::row_tags(&row)?;
            formatter.write_node(&elem, lon, lat, &tags)?;
        }
        Ok(())
    }

    /// Stream every selected way through the formatter, in ascending id
    /// order, node lists in stored sequence order.
    pub async fn write_ways(
        &mut self,
        formatter: &mut dyn OutputFormatter,
    ) -> Result<(), PostgresError> {
        tracing::debug!("fetching ways");
        let Self { tx, cache, .. } = self;

        let mut rows = sqlx::query(sql::EXTRACT_WAYS).fetch(&mut **tx);
        while let Some(row) = rows.try_next().await? {
            let elem = extract::row_element_info(&row, cache).await?;
            let nodes = extract::row_way_nodes(&row)?;
            let tags = extract::row_tags(&row)?;
            formatter.write_way(&elem, &nodes, &tags)?;
        }
        Ok(())
    }

    /// Stream every selected relation through the formatter, in ascending
    /// id order, member lists in stored sequence order.
    pub async fn write_relations(
        &mut self,
        formatter: &mut dyn OutputFormatter,
    ) -> Result<(), PostgresError> {
        tracing::debug!("fetching relations");
        let Self { tx, cache, .. } = self;

        let mut rows = sqlx::query(sql::EXTRACT_RELATIONS).fetch(&mut **tx);
        while let Some(row) = rows.try_next().await? {
            let elem = extract::row_element_info(&row, cache).await?;
            let members = extract::row_members(&row)?;
            let tags = extract::row_tags(&row)?;
            formatter.write_relation(&elem, &members, &tags)?;
        }
        Ok(())
    }

    /// Stream every selected changeset through the formatter, in ascending
    /// id order. Comments are always counted; their bodies are passed along
    /// only when [`Selection::select_changeset_discussions`] was called.
    pub async fn write_changesets(
        &mut self,
        formatter: &mut dyn OutputFormatter,
        now: DateTime<Utc>,
    ) -> Result<(), PostgresError> {
        tracing::debug!("fetching changesets");
        let include_discussions = self.include_changeset_discussions;
        let Self { tx, cache, .. } = self;

        let mut rows = sqlx::query(sql::EXTRACT_CHANGESETS).fetch(&mut **tx);
        while let Some(row) = rows.try_next().await? {
            let comments = extract::row_comments(&row)?;
            let tags = extract::row_tags(&row)?;
            let elem = extract::row_changeset_info(&row, cache, comments.len()).await?;
            formatter.write_changeset(&elem, &tags, include_discussions, &comments, now)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // The engine's working-set and emission semantics run against live
    // PostgreSQL and are covered by integration tests; see the extract,
    // pg_array, cache and tiles modules for the unit-testable pieces.
}
