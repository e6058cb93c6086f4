//! Node and way store.
//!
//! The context only reads from the store. Population (usually a first pass
//! over the PBF file) belongs to the caller.

use crate::projection::lat_to_latp;
use geo_types::Coord;
use rustc_hash::FxHashMap;

/// OSM node id.
pub type NodeId = u64;

/// OSM way id. Relations borrow this id space through synthetic ids.
pub type WayId = u32;

/// Upper bound for way ids.
///
/// Synthetic relation ids count down from here, so genuine way ids must stay
/// below the lowest synthetic id handed out during a run.
pub const MAX_WAY_ID: WayId = WayId::MAX;

/// Read access to projected node coordinates and way node lists.
pub trait OsmStore: Send + Sync {
    /// Projected `(lon, latp)` of a node, `None` if unknown.
    fn node(&self, id: NodeId) -> Option<Coord<f64>>;

    /// Node references of a way, `None` if unknown.
    fn way_nodes(&self, id: WayId) -> Option<&[NodeId]>;
}

/// In-memory store backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryOsmStore {
    nodes: FxHashMap<NodeId, Coord<f64>>,
    ways: FxHashMap<WayId, Vec<NodeId>>,
}

impl MemoryOsmStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node already in projected coordinates.
    pub fn insert_node(&mut self, id: NodeId, coord: Coord<f64>) {
        self.nodes.insert(id, coord);
    }

    /// Insert a node from WGS84 longitude/latitude.
    pub fn insert_node_lonlat(&mut self, id: NodeId, lon: f64, lat: f64) {
        self.insert_node(
            id,
            Coord {
                x: lon,
                y: lat_to_latp(lat),
            },
        );
    }

    /// Insert a way's node list (needed for relation members).
    pub fn insert_way(&mut self, id: WayId, nodes: Vec<NodeId>) {
        self.ways.insert(id, nodes);
    }

    /// Number of stored nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of stored ways.
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }
}

impl OsmStore for MemoryOsmStore {
    fn node(&self, id: NodeId) -> Option<Coord<f64>> {
        self.nodes.get(&id).copied()
    }

    fn way_nodes(&self, id: WayId) -> Option<&[NodeId]> {
        self.ways.get(&id).map(Vec::as_slice)
    }
}
