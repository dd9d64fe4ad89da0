//! Map element types (nodes, ways, relations)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::constants::SCALE;

/// Identifier for a node, way or relation. The three element kinds share one
/// 64-bit id space.
pub type ElementId = u64;

/// Identifier for a changeset; a separate id space from [`ElementId`]
pub type ChangesetId = u64;

/// Ordered sequence of (key, value) tag pairs.
///
/// Duplicate keys are representable; the storage layer permits them even
/// though the API treats them as input errors on write.
pub type Tags = Vec<(String, String)>;

// ============================================================================
// Element info
// ============================================================================

/// Common header shared by every element kind.
///
/// `uid` and `display_name` are filled from the changeset metadata cache and
/// are present iff the changeset's author has made their data public.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub id: ElementId,
    pub version: i32,
    /// Pre-formatted `YYYY-MM-DDTHH:MM:SSZ` timestamp, as emitted by the
    /// database
    pub timestamp: String,
    pub changeset: ChangesetId,
    pub visible: bool,
    pub uid: Option<i64>,
    pub display_name: Option<String>,
}

// ============================================================================
// Relation members
// ============================================================================

/// Element kind of a relation member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member of a relation, in stored sequence order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMember {
    pub member_type: MemberType,
    pub ref_id: ElementId,
    pub role: String,
}

// ============================================================================
// Visibility
// ============================================================================

/// Result of a single-id visibility probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Present with `visible = true`
    Exists,
    /// Present with `visible = false`
    Deleted,
    /// No row with that id
    NotFound,
}

// ============================================================================
// Bounding box
// ============================================================================

/// Bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub minlat: f64,
    pub minlon: f64,
    pub maxlat: f64,
    pub maxlon: f64,
}

impl Bbox {
    pub fn new(minlat: f64, minlon: f64, maxlat: f64, maxlon: f64) -> Self {
        Self {
            minlat,
            minlon,
            maxlat,
            maxlon,
        }
    }

    /// Build a box from the four scaled integer coordinates stored on a
    /// changeset row. Returns `None` unless all four are present.
    pub fn from_scaled(
        min_lat: Option<i64>,
        min_lon: Option<i64>,
        max_lat: Option<i64>,
        max_lon: Option<i64>,
    ) -> Option<Self> {
        match (min_lat, min_lon, max_lat, max_lon) {
            (Some(min_lat), Some(min_lon), Some(max_lat), Some(max_lon)) => Some(Self {
                minlat: min_lat as f64 / SCALE,
                minlon: min_lon as f64 / SCALE,
                maxlat: max_lat as f64 / SCALE,
                maxlon: max_lon as f64 / SCALE,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_type_display() {
        assert_eq!(MemberType::Node.to_string(), "node");
        assert_eq!(MemberType::Way.to_string(), "way");
        assert_eq!(MemberType::Relation.to_string(), "relation");
    }

    #[test]
    fn test_bbox_from_scaled_complete() {
        let bbox = Bbox::from_scaled(
            Some(-10_000_000),
            Some(20_000_000),
            Some(30_000_000),
            Some(40_000_000),
        )
        .unwrap();
        assert_eq!(bbox.minlat, -1.0);
        assert_eq!(bbox.minlon, 2.0);
        assert_eq!(bbox.maxlat, 3.0);
        assert_eq!(bbox.maxlon, 4.0);
    }

    #[test]
    fn test_bbox_from_scaled_partial_is_none() {
        assert!(Bbox::from_scaled(Some(1), Some(2), Some(3), None).is_none());
        assert!(Bbox::from_scaled(None, None, None, None).is_none());
    }
}
