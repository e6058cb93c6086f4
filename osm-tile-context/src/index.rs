//! Reference-layer spatial indices.
//!
//! A reference layer is a named set of pre-loaded geometries (coastlines,
//! urban areas, admin boundaries) that scripts test the current feature
//! against. The index only answers bounding-box candidates; exact
//! verification happens in [`crate::query`].
//!
//! [`MemorySpatialIndex`] keeps every geometry in one append-only arena with a
//! precomputed bounding box, so a candidate id resolves to its geometry and
//! name without re-deriving anything at query time.

use crate::error::{Result, TileError};
use crate::geometry::{parse_wkt, BBox, GeometryKind};
use geo_types::Geometry;
use rustc_hash::FxHashMap;

/// Bounding-box match returned by an index query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexCandidate {
    /// Arena handle of the candidate geometry.
    pub id: u32,

    /// Bounding box the index matched on.
    pub bbox: BBox,
}

/// Registry of named spatial indices, shared read-only by every worker.
pub trait SpatialIndexRegistry: Send + Sync {
    /// Candidates in `layer` whose bounding box overlaps `bbox`.
    ///
    /// Fails with [`TileError::UnknownIndexLayer`] if no index is registered
    /// under `layer`.
    fn query(&self, layer: &str, bbox: &BBox) -> Result<Vec<IndexCandidate>>;

    /// Name attached to a candidate, if it has one.
    fn resolve_name(&self, id: u32) -> Option<&str>;

    /// Exact geometry of a candidate.
    fn resolve_geometry(&self, id: u32) -> Option<&Geometry<f64>>;
}

/// Entry in the geometry arena.
#[derive(Debug, Clone)]
pub struct ArenaEntry {
    /// Handle (index) into the arena.
    pub handle: u32,

    /// Geometry in projected coordinates.
    pub geometry: Geometry<f64>,

    /// Precomputed bounding box.
    pub bbox: BBox,

    /// Geometry kind.
    pub kind: GeometryKind,

    /// Optional name reported by intersection queries.
    pub name: Option<String>,
}

/// In-memory registry: a geometry arena plus per-layer handle lists.
#[derive(Debug, Default)]
pub struct MemorySpatialIndex {
    /// All entries in handle order.
    entries: Vec<ArenaEntry>,

    /// Layer name → handles in insertion order.
    layers: FxHashMap<String, Vec<u32>>,
}

impl MemorySpatialIndex {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer with no geometries yet.
    pub fn add_layer(&mut self, layer: &str) {
        self.layers.entry(layer.to_string()).or_default();
    }

    /// Add a geometry to `layer`, returning its handle.
    ///
    /// The layer is created on first use.
    pub fn add_geometry(
        &mut self,
        layer: &str,
        geometry: Geometry<f64>,
        name: Option<&str>,
    ) -> Result<u32> {
        let handle = self.entries.len() as u32;
        let bbox =
            BBox::from_geometry(&geometry).ok_or(TileError::EmptyGeometry(u64::from(handle)))?;
        let kind = GeometryKind::from_geometry(&geometry);

        self.entries.push(ArenaEntry {
            handle,
            geometry,
            bbox,
            kind,
            name: name.map(str::to_string),
        });
        self.layers.entry(layer.to_string()).or_default().push(handle);

        tracing::trace!(layer, handle, ?kind, "Indexed reference geometry");
        Ok(handle)
    }

    /// Parse WKT (already in projected coordinates) and add it to `layer`.
    pub fn add_wkt(&mut self, layer: &str, wkt: &str, name: Option<&str>) -> Result<u32> {
        let geometry = parse_wkt(wkt)?;
        self.add_geometry(layer, geometry, name)
    }

    /// Get an entry by handle.
    pub fn get(&self, handle: u32) -> Option<&ArenaEntry> {
        self.entries.get(handle as usize)
    }

    /// Number of geometries across all layers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no geometry has been indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of geometries in one layer, `None` for unknown layers.
    pub fn layer_len(&self, layer: &str) -> Option<usize> {
        self.layers.get(layer).map(Vec::len)
    }
}

impl SpatialIndexRegistry for MemorySpatialIndex {
    fn query(&self, layer: &str, bbox: &BBox) -> Result<Vec<IndexCandidate>> {
        let handles = self
            .layers
            .get(layer)
            .ok_or_else(|| TileError::UnknownIndexLayer(layer.to_string()))?;

        Ok(handles
            .iter()
            .filter_map(|&h| self.get(h))
            .filter(|entry| entry.bbox.intersects(bbox))
            .map(|entry| IndexCandidate {
                id: entry.handle,
                bbox: entry.bbox,
            })
            .collect())
    }

    fn resolve_name(&self, id: u32) -> Option<&str> {
        self.get(id).and_then(|e| e.name.as_deref())
    }

    fn resolve_geometry(&self, id: u32) -> Option<&Geometry<f64>> {
        self.get(id).map(|e| &e.geometry)
    }
}
