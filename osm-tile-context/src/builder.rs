//! Geometry builder.
//!
//! Materializes the current primitive's geometry from node and way
//! references:
//! 1. Line: every node id resolved through the [`OsmStore`], in order
//! 2. Polygon: the line's coordinates taken as the exterior ring
//! 3. Multi-polygon: outer and inner member ways resolved to rings, each
//!    inner ring attached to the outer polygon that holds it
//!
//! Results are memoized per primitive in a [`GeometryCache`]; the context
//! clears it whenever a new primitive begins.

use crate::error::{Result, TileError};
use crate::store::{NodeId, OsmStore, WayId};
use geo::{Contains, Euclidean, Length};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};

/// A value computed on first access and dropped on [`Memo::clear`].
#[derive(Debug, Clone)]
pub struct Memo<T>(Option<T>);

impl<T> Memo<T> {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self(None)
    }

    /// The cached value, if computed.
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Check whether the value has been computed.
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Drop the cached value.
    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// Return the cached value, computing it with `init` on first access.
    ///
    /// A failed `init` leaves the cell empty.
    pub fn get_or_try_init<E>(
        &mut self,
        init: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<&T, E> {
        let value = match self.0.take() {
            Some(v) => v,
            None => init()?,
        };
        Ok(self.0.insert(value))
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Memoized geometries of one primitive.
#[derive(Debug, Default)]
pub struct GeometryCache {
    pub line: Memo<LineString<f64>>,
    pub polygon: Memo<Polygon<f64>>,
    pub multi_polygon: Memo<MultiPolygon<f64>>,
}

impl GeometryCache {
    /// Invalidate all three geometries.
    pub fn clear(&mut self) {
        self.line.clear();
        self.polygon.clear();
        self.multi_polygon.clear();
    }
}

/// Resolve `nodes` into a line, failing on the first node the store lacks.
///
/// `object_id` is the way reported in [`TileError::MissingNode`].
pub fn build_line(
    store: &dyn OsmStore,
    object_id: u64,
    nodes: &[NodeId],
) -> Result<LineString<f64>> {
    let coords = nodes
        .iter()
        .map(|&node_id| {
            store
                .node(node_id)
                .ok_or(TileError::MissingNode { object_id, node_id })
        })
        .collect::<Result<Vec<Coord<f64>>>>()?;

    tracing::trace!(object_id, points = coords.len(), "Built line geometry");
    Ok(LineString::new(coords))
}

/// Take a line as the exterior ring of a polygon.
///
/// geo-types closes an unclosed ring; asking for the polygon of an open way
/// is the caller's mistake and is not reported here.
pub fn build_polygon(line: &LineString<f64>) -> Polygon<f64> {
    Polygon::new(line.clone(), Vec::new())
}

/// Assemble a relation's multi-polygon from its outer and inner member ways.
///
/// Member roles are taken as given; rings are neither merged nor reoriented.
/// Each inner ring goes to the first outer polygon containing its first
/// vertex, falling back to the first outer polygon.
pub fn build_multi_polygon(
    store: &dyn OsmStore,
    relation_id: u64,
    outer: &[WayId],
    inner: &[WayId],
) -> Result<MultiPolygon<f64>> {
    let mut polygons = outer
        .iter()
        .map(|&way_id| {
            way_ring(store, relation_id, way_id).map(|ring| Polygon::new(ring, Vec::new()))
        })
        .collect::<Result<Vec<_>>>()?;

    let holes = inner
        .iter()
        .map(|&way_id| way_ring(store, relation_id, way_id))
        .collect::<Result<Vec<_>>>()?;

    if polygons.is_empty() {
        if !holes.is_empty() {
            tracing::debug!(
                relation_id,
                inner = holes.len(),
                "Relation has inner rings but no outer ring"
            );
        }
        return Ok(MultiPolygon::new(Vec::new()));
    }

    let targets: Vec<usize> = holes
        .iter()
        .map(|hole| {
            hole.0
                .first()
                .and_then(|first| polygons.iter().position(|p| p.contains(first)))
                .unwrap_or(0)
        })
        .collect();

    for (hole, target) in holes.into_iter().zip(targets) {
        polygons[target].interiors_push(hole);
    }

    tracing::trace!(
        relation_id,
        polygons = polygons.len(),
        "Built multi-polygon geometry"
    );
    Ok(MultiPolygon::new(polygons))
}

/// Total ring length of a multi-polygon.
pub fn multi_polygon_perimeter(mp: &MultiPolygon<f64>) -> f64 {
    mp.0.iter()
        .map(|p| {
            p.exterior().length::<Euclidean>()
                + p.interiors()
                    .iter()
                    .map(|r| r.length::<Euclidean>())
                    .sum::<f64>()
        })
        .sum()
}

fn way_ring(store: &dyn OsmStore, relation_id: u64, way_id: WayId) -> Result<LineString<f64>> {
    let nodes = store.way_nodes(way_id).ok_or(TileError::MissingWay {
        relation_id,
        way_id: u64::from(way_id),
    })?;
    build_line(store, u64::from(way_id), nodes)
}
