//! Spatial query engine.
//!
//! Tests the current primitive against a reference layer:
//!
//! ```text
//! subject bbox ──► registry.query(layer, bbox)    (bbox candidates)
//!                        │
//!                        ▼
//!              exact Intersects refine (geo crate)
//!                        │
//!                        ▼
//!              dedup by candidate id ──► names / presence
//! ```
//!
//! Index hits are bounding-box matches only; a candidate is accepted only
//! after its stored geometry intersects the subject exactly.

use crate::error::Result;
use crate::geometry::BBox;
use crate::index::SpatialIndexRegistry;
use geo::Intersects;
use geo_types::{Coord, Line, Point};
use rustc_hash::FxHashSet;

/// Shape of the current primitive as seen by spatial queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuerySubject {
    /// A node location.
    Point(Coord<f64>),

    /// A way, represented by the segment between its first and last node.
    Segment(Coord<f64>, Coord<f64>),

    /// A multi-polygon relation, or no primitive at all. Not supported as a
    /// subject: always matches nothing.
    Unsupported,
}

impl QuerySubject {
    /// Bounding box used for the index lookup, `None` for unsupported subjects.
    pub fn bbox(&self) -> Option<BBox> {
        match *self {
            QuerySubject::Point(c) => Some(BBox::from_corners(c, c)),
            QuerySubject::Segment(a, b) => Some(BBox::from_corners(a, b)),
            QuerySubject::Unsupported => None,
        }
    }

    fn intersects(&self, geom: &geo_types::Geometry<f64>) -> bool {
        match *self {
            QuerySubject::Point(c) => geom.intersects(&Point::from(c)),
            QuerySubject::Segment(a, b) => geom.intersects(&Line::new(a, b)),
            QuerySubject::Unsupported => false,
        }
    }
}

/// Counters from one query, for tracing selectivity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Candidates returned by the index.
    pub candidates: usize,

    /// Exact predicate checks performed.
    pub exact_checks: usize,

    /// Candidates that passed the exact check.
    pub matches: usize,
}

/// Verified candidate ids (in index order, deduplicated) and query stats.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub ids: Vec<u32>,
    pub stats: QueryStats,
}

/// Candidates of `layer` whose geometry exactly intersects `subject`.
pub fn find_intersecting(
    indices: &dyn SpatialIndexRegistry,
    layer: &str,
    subject: &QuerySubject,
) -> Result<QueryOutcome> {
    let Some(bbox) = subject.bbox() else {
        tracing::trace!(layer, "Spatial query on unsupported subject; no match");
        return Ok(QueryOutcome::default());
    };

    let candidates = indices.query(layer, &bbox)?;
    let mut stats = QueryStats {
        candidates: candidates.len(),
        ..QueryStats::default()
    };

    let mut seen = FxHashSet::default();
    let mut ids = Vec::new();
    for candidate in candidates {
        if !seen.insert(candidate.id) {
            continue;
        }
        let Some(geom) = indices.resolve_geometry(candidate.id) else {
            tracing::debug!(layer, id = candidate.id, "Index candidate has no geometry");
            continue;
        };
        stats.exact_checks += 1;
        if subject.intersects(geom) {
            ids.push(candidate.id);
        } else {
            tracing::trace!(layer, id = candidate.id, "Rejected bbox-only candidate");
        }
    }
    stats.matches = ids.len();

    tracing::trace!(
        layer,
        candidates = stats.candidates,
        exact_checks = stats.exact_checks,
        matches = stats.matches,
        "Spatial query"
    );
    Ok(QueryOutcome { ids, stats })
}

/// Resolve ids to names: unnamed ids are skipped, repeated names kept once,
/// first-seen order preserved.
pub fn names_of(indices: &dyn SpatialIndexRegistry, ids: &[u32]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    ids.iter()
        .filter_map(|&id| indices.resolve_name(id))
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
