//! SQL statements for the selection backend
//!
//! Every statement the engine runs is a named constant here, bound by
//! position. The driver's per-connection statement cache keeps each of these
//! prepared after first use, so the constants double as the prepared
//! statement registry.
//!
//! Working sets are session-private temporary tables created inside the
//! engine's transaction; every selection statement is an anti-join upsert
//! against them, and every extraction statement joins through them.

// =============================================================================
// Working set DDL
// =============================================================================

pub const CREATE_TMP_NODES: &str = "CREATE TEMPORARY TABLE tmp_nodes (id bigint PRIMARY KEY)";
pub const CREATE_TMP_WAYS: &str = "CREATE TEMPORARY TABLE tmp_ways (id bigint PRIMARY KEY)";
pub const CREATE_TMP_RELATIONS: &str =
    "CREATE TEMPORARY TABLE tmp_relations (id bigint PRIMARY KEY)";
pub const CREATE_TMP_CHANGESETS: &str =
    "CREATE TEMPORARY TABLE tmp_changesets (id bigint PRIMARY KEY)";

pub const WORKING_SET_DDL: [&str; 4] = [
    CREATE_TMP_NODES,
    CREATE_TMP_WAYS,
    CREATE_TMP_RELATIONS,
    CREATE_TMP_CHANGESETS,
];

// =============================================================================
// Session / planner settings
// =============================================================================

/// The planner's row estimates for tile-index probes push it towards merge
/// or hash joins that seq-scan the node table. Both are switched off for the
/// remainder of the transaction before the bounding-box insert runs.
pub const DISABLE_MERGEJOIN: &str = "SET LOCAL enable_mergejoin = off";
pub const DISABLE_HASHJOIN: &str = "SET LOCAL enable_hashjoin = off";

/// Reported protocol version, e.g. 90300 for 9.3
pub const SERVER_VERSION: &str = "SELECT current_setting('server_version_num')::int";

// =============================================================================
// Visibility probes
// =============================================================================

pub const NODE_VISIBILITY: &str = "SELECT visible FROM current_nodes WHERE id = $1";
pub const WAY_VISIBILITY: &str = "SELECT visible FROM current_ways WHERE id = $1";
pub const RELATION_VISIBILITY: &str = "SELECT visible FROM current_relations WHERE id = $1";

// =============================================================================
// Selection by id list
// =============================================================================

pub const ADD_NODES_BY_ID: &str = r#"
INSERT INTO tmp_nodes
SELECT n.id
FROM current_nodes n
LEFT JOIN tmp_nodes tn ON n.id = tn.id
WHERE n.id = ANY($1)
  AND tn.id IS NULL
"#;

pub const ADD_WAYS_BY_ID: &str = r#"
INSERT INTO tmp_ways
SELECT w.id
FROM current_ways w
LEFT JOIN tmp_ways tw ON w.id = tw.id
WHERE w.id = ANY($1)
  AND tw.id IS NULL
"#;

pub const ADD_RELATIONS_BY_ID: &str = r#"
INSERT INTO tmp_relations
SELECT r.id
FROM current_relations r
LEFT JOIN tmp_relations tr ON r.id = tr.id
WHERE r.id = ANY($1)
  AND tr.id IS NULL
"#;

pub const ADD_CHANGESETS_BY_ID: &str = r#"
INSERT INTO tmp_changesets
SELECT c.id
FROM changesets c
LEFT JOIN tmp_changesets tc ON c.id = tc.id
WHERE c.id = ANY($1)
  AND tc.id IS NULL
"#;

// =============================================================================
// Selection by bounding box
// =============================================================================

/// Bulk insert of visible nodes matching the tile pre-filter and the exact
/// scaled coordinate ranges. No anti-join: this statement assumes
/// `tmp_nodes` is empty and the caller enforces that. The limit is bound as
/// one more than the caller's maximum so overflow is detectable from the
/// returned count alone.
pub const ADD_NODES_BY_BBOX: &str = r#"
INSERT INTO tmp_nodes
SELECT id
FROM current_nodes
WHERE tile = ANY($1)
  AND latitude BETWEEN $2 AND $3
  AND longitude BETWEEN $4 AND $5
  AND visible = true
LIMIT $6
"#;

// =============================================================================
// Graph expansion
// =============================================================================

pub const ADD_NODES_FROM_RELATIONS: &str = r#"
INSERT INTO tmp_nodes
SELECT DISTINCT rm.member_id
FROM tmp_relations tr
JOIN current_relation_members rm ON rm.relation_id = tr.id
LEFT JOIN tmp_nodes tn ON rm.member_id = tn.id
WHERE rm.member_type = 'Node'
  AND tn.id IS NULL
"#;

pub const ADD_WAYS_FROM_RELATIONS: &str = r#"
INSERT INTO tmp_ways
SELECT DISTINCT rm.member_id
FROM tmp_relations tr
JOIN current_relation_members rm ON rm.relation_id = tr.id
LEFT JOIN tmp_ways tw ON rm.member_id = tw.id
WHERE rm.member_type = 'Way'
  AND tw.id IS NULL
"#;

/// One hop only: members of already-selected relations, not the transitive
/// closure
pub const ADD_RELATION_MEMBERS_OF_RELATIONS: &str = r#"
INSERT INTO tmp_relations
SELECT DISTINCT rm.member_id
FROM tmp_relations tr
JOIN current_relation_members rm ON rm.relation_id = tr.id
LEFT JOIN tmp_relations xr ON rm.member_id = xr.id
WHERE rm.member_type = 'Relation'
  AND xr.id IS NULL
"#;

pub const ADD_WAYS_FROM_NODES: &str = r#"
INSERT INTO tmp_ways
SELECT DISTINCT wn.way_id
FROM current_way_nodes wn
JOIN tmp_nodes tn ON wn.node_id = tn.id
LEFT JOIN tmp_ways tw ON wn.way_id = tw.id
WHERE tw.id IS NULL
"#;

pub const ADD_NODES_FROM_WAY_NODES: &str = r#"
INSERT INTO tmp_nodes
SELECT DISTINCT wn.node_id
FROM tmp_ways tw
JOIN current_way_nodes wn ON tw.id = wn.way_id
LEFT JOIN tmp_nodes tn ON wn.node_id = tn.id
WHERE tn.id IS NULL
"#;

pub const ADD_RELATIONS_FROM_NODES: &str = r#"
INSERT INTO tmp_relations
SELECT DISTINCT rm.relation_id
FROM tmp_nodes tn
JOIN current_relation_members rm
  ON tn.id = rm.member_id AND rm.member_type = 'Node'
LEFT JOIN tmp_relations tr ON rm.relation_id = tr.id
WHERE tr.id IS NULL
"#;

pub const ADD_RELATIONS_FROM_WAYS: &str = r#"
INSERT INTO tmp_relations
SELECT DISTINCT rm.relation_id
FROM tmp_ways tw
JOIN current_relation_members rm
  ON tw.id = rm.member_id AND rm.member_type = 'Way'
LEFT JOIN tmp_relations tr ON rm.relation_id = tr.id
WHERE tr.id IS NULL
"#;

pub const ADD_RELATIONS_FROM_RELATIONS: &str = r#"
INSERT INTO tmp_relations
SELECT DISTINCT rm.relation_id
FROM tmp_relations tr
JOIN current_relation_members rm
  ON tr.id = rm.member_id AND rm.member_type = 'Relation'
LEFT JOIN tmp_relations xr ON rm.relation_id = xr.id
WHERE xr.id IS NULL
"#;

// =============================================================================
// Extraction
// =============================================================================

// Child collections are aggregated per row by lateral subqueries and cast to
// their array literal form; aggregation over no rows yields SQL NULL, which
// the extractors read as an empty collection. Timestamps are formatted by
// the server so output is byte-identical across implementations.

pub const EXTRACT_NODES: &str = r#"
SELECT n.id, n.latitude, n.longitude, n.visible,
       to_char(n.timestamp, 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS timestamp,
       n.changeset_id, n.version::int AS version,
       t.keys::text AS tag_k, t.values::text AS tag_v
FROM current_nodes n
JOIN tmp_nodes tn ON n.id = tn.id
LEFT JOIN LATERAL (
    SELECT array_agg(k) AS keys, array_agg(v) AS values
    FROM current_node_tags
    WHERE node_id = n.id
) t ON true
ORDER BY n.id
"#;

pub const EXTRACT_WAYS: &str = r#"
SELECT w.id, w.visible, w.version::int AS version, w.changeset_id,
       to_char(w.timestamp, 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS timestamp,
       t.keys::text AS tag_k, t.values::text AS tag_v,
       wn.node_ids::text AS node_ids
FROM current_ways w
JOIN tmp_ways tw ON w.id = tw.id
LEFT JOIN LATERAL (
    SELECT array_agg(k) AS keys, array_agg(v) AS values
    FROM current_way_tags
    WHERE way_id = w.id
) t ON true
LEFT JOIN LATERAL (
    SELECT array_agg(node_id ORDER BY sequence_id) AS node_ids
    FROM current_way_nodes
    WHERE way_id = w.id
) wn ON true
ORDER BY w.id
"#;

pub const EXTRACT_RELATIONS: &str = r#"
SELECT r.id, r.visible, r.version::int AS version, r.changeset_id,
       to_char(r.timestamp, 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS timestamp,
       t.keys::text AS tag_k, t.values::text AS tag_v,
       rm.types::text AS member_types,
       rm.ids::text AS member_ids,
       rm.roles::text AS member_roles
FROM current_relations r
JOIN tmp_relations tr ON r.id = tr.id
LEFT JOIN LATERAL (
    SELECT array_agg(k) AS keys, array_agg(v) AS values
    FROM current_relation_tags
    WHERE relation_id = r.id
) t ON true
LEFT JOIN LATERAL (
    SELECT array_agg(member_type ORDER BY sequence_id) AS types,
           array_agg(member_id ORDER BY sequence_id) AS ids,
           array_agg(member_role ORDER BY sequence_id) AS roles
    FROM current_relation_members
    WHERE relation_id = r.id
) rm ON true
ORDER BY r.id
"#;

pub const EXTRACT_CHANGESETS: &str = r#"
SELECT c.id,
       to_char(c.created_at, 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
       to_char(c.closed_at, 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS closed_at,
       c.min_lat, c.max_lat, c.min_lon, c.max_lon, c.num_changes,
       t.keys::text AS tag_k, t.values::text AS tag_v,
       cc.author_ids::text AS comment_author_ids,
       cc.display_names::text AS comment_display_names,
       cc.bodies::text AS comment_bodies,
       cc.created_ats::text AS comment_created_ats
FROM changesets c
JOIN tmp_changesets tc ON c.id = tc.id
LEFT JOIN LATERAL (
    SELECT array_agg(k) AS keys, array_agg(v) AS values
    FROM changeset_tags
    WHERE changeset_id = c.id
) t ON true
LEFT JOIN LATERAL (
    SELECT array_agg(x.author_id) AS author_ids,
           array_agg(x.display_name) AS display_names,
           array_agg(x.body) AS bodies,
           array_agg(x.created_at) AS created_ats
    FROM (
        SELECT cm.author_id, u.display_name, cm.body,
               to_char(cm.created_at, 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM changeset_comments cm
        JOIN users u ON cm.author_id = u.id
        WHERE cm.changeset_id = c.id
          AND cm.visible
        ORDER BY cm.created_at
    ) x
) cc ON true
ORDER BY c.id
"#;

// =============================================================================
// Changeset metadata loader
// =============================================================================

pub const CHANGESET_AUTHOR: &str = r#"
SELECT u.id, u.display_name, u.data_public
FROM changesets c
JOIN users u ON c.user_id = u.id
WHERE c.id = $1
"#;
