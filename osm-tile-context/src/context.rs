//! Per-primitive processing context.
//!
//! One [`FeatureContext`] is created per worker and reused for every
//! primitive the worker decodes:
//!
//! ```text
//! load_string_table(block strings)          once per block
//!   └─ begin_node / begin_way / begin_relation
//!        └─ script queries tags, geometry, reference layers
//!        └─ script emits features and sets attributes
//!   └─ take_outputs()                       hand features to the encoder
//! ```
//!
//! `begin_*` resets the previous primitive's outputs and geometry cache.
//! The store and the spatial indices are shared and only read; the layer
//! registry is owned, since emitting attributes records their types.

use crate::builder::{
    build_line, build_multi_polygon, build_polygon, multi_polygon_perimeter, GeometryCache,
};
use crate::error::{Result, TileError};
use crate::index::SpatialIndexRegistry;
use crate::layer::LayerRegistry;
use crate::output::{AttributeValue, OutputFeature};
use crate::projection::degp_to_meters;
use crate::query::{find_intersecting, names_of, QuerySubject};
use crate::store::{NodeId, OsmStore, WayId, MAX_WAY_ID};
use crate::tags::{StringTable, TagSource};
use geo::{Area, BoundingRect, Centroid, Euclidean, Length};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use std::ops::Range;
use std::sync::Arc;

/// Which kind of primitive is active, and its id.
///
/// Relations carry a synthetic id from the way id space, so every
/// way-oriented path treats them as ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    None,
    Node(NodeId),
    Way(WayId),
    Relation(WayId),
}

impl Identity {
    /// Numeric id, 0 when nothing is active.
    pub fn id(&self) -> u64 {
        match *self {
            Identity::None => 0,
            Identity::Node(id) => id,
            Identity::Way(id) | Identity::Relation(id) => u64::from(id),
        }
    }

    /// True for ways and relations.
    pub fn is_way(&self) -> bool {
        matches!(self, Identity::Way(_) | Identity::Relation(_))
    }

    /// True for relations.
    pub fn is_relation(&self) -> bool {
        matches!(self, Identity::Relation(_))
    }
}

/// Processing state for the primitive currently handed to the script.
pub struct FeatureContext {
    store: Arc<dyn OsmStore>,
    indices: Arc<dyn SpatialIndexRegistry>,
    layers: LayerRegistry,
    strings: StringTable,

    identity: Identity,
    /// Next synthetic relation id is `next_relation_id - 1`.
    next_relation_id: WayId,

    /// First and last node location (the node itself for nodes).
    start: Coord<f64>,
    end: Coord<f64>,

    node_refs: Vec<NodeId>,
    outer_ways: Vec<WayId>,
    inner_ways: Vec<WayId>,

    tags: TagSource,
    geometry: GeometryCache,
    outputs: Vec<OutputFeature>,
}

impl FeatureContext {
    /// Create a context reading from `store` and `indices`, emitting to
    /// the layers of `layers`.
    pub fn new(
        store: Arc<dyn OsmStore>,
        indices: Arc<dyn SpatialIndexRegistry>,
        layers: LayerRegistry,
    ) -> Self {
        Self {
            store,
            indices,
            layers,
            strings: StringTable::new(),
            identity: Identity::None,
            next_relation_id: MAX_WAY_ID,
            start: Coord { x: 0.0, y: 0.0 },
            end: Coord { x: 0.0, y: 0.0 },
            node_refs: Vec::new(),
            outer_ways: Vec::new(),
            inner_ways: Vec::new(),
            tags: TagSource::None,
            geometry: GeometryCache::default(),
            outputs: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Replace the string table with a new block's strings.
    ///
    /// The current primitive's tags are dropped with the old table.
    pub fn load_string_table(&mut self, strings: Vec<String>) {
        self.strings.load(strings);
        self.tags = TagSource::None;
        tracing::trace!(
            generation = self.strings.generation(),
            strings = self.strings.len(),
            "Loaded string table"
        );
    }

    /// Drop queued outputs and memoized geometry.
    pub fn reset(&mut self) {
        self.outputs.clear();
        self.geometry.clear();
    }

    /// Start processing a node from a dense group.
    ///
    /// `key_vals` is the group's shared tag array and `tags` this node's
    /// slice of it.
    pub fn begin_node(
        &mut self,
        id: NodeId,
        coord: Coord<f64>,
        key_vals: &Arc<[u32]>,
        tags: Range<usize>,
    ) -> Result<()> {
        self.reset();
        let generation = self.current_generation()?;
        self.identity = Identity::Node(id);
        self.start = coord;
        self.end = coord;
        self.node_refs.clear();
        self.tags = TagSource::Dense {
            key_vals: Arc::clone(key_vals),
            range: tags,
            generation,
        };
        Ok(())
    }

    /// Start processing a way.
    ///
    /// Fails with [`TileError::MissingNode`] if the first or last node is not
    /// in the store; the caller decides whether to skip the way. A failed
    /// way leaves no primitive active.
    pub fn begin_way(
        &mut self,
        id: WayId,
        nodes: &[NodeId],
        keys: &[u32],
        vals: &[u32],
    ) -> Result<()> {
        self.reset();
        let generation = self.current_generation()?;
        if id >= self.next_relation_id {
            tracing::warn!(
                way_id = id,
                lowest_relation_id = self.next_relation_id,
                "Way id overlaps synthetic relation ids"
            );
        }

        let (start, end) = match self.way_endpoints(u64::from(id), nodes) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                self.identity = Identity::None;
                self.node_refs.clear();
                self.tags = TagSource::None;
                return Err(e);
            }
        };

        self.identity = Identity::Way(id);
        self.start = start;
        self.end = end;
        self.node_refs.clear();
        self.node_refs.extend_from_slice(nodes);
        self.tags = TagSource::List {
            keys: keys.to_vec(),
            vals: vals.to_vec(),
            generation,
        };
        Ok(())
    }

    /// Start processing a multi-polygon relation; returns its synthetic id.
    pub fn begin_relation(
        &mut self,
        outer: &[WayId],
        inner: &[WayId],
        keys: &[u32],
        vals: &[u32],
    ) -> Result<WayId> {
        self.reset();
        let generation = self.current_generation()?;
        let id = self
            .next_relation_id
            .checked_sub(1)
            .ok_or_else(|| TileError::Config("synthetic relation ids exhausted".into()))?;
        self.next_relation_id = id;

        self.identity = Identity::Relation(id);
        self.node_refs.clear();
        self.outer_ways.clear();
        self.outer_ways.extend_from_slice(outer);
        self.inner_ways.clear();
        self.inner_ways.extend_from_slice(inner);
        self.tags = TagSource::List {
            keys: keys.to_vec(),
            vals: vals.to_vec(),
            generation,
        };
        Ok(id)
    }

    fn current_generation(&self) -> Result<u64> {
        if self.strings.is_loaded() {
            Ok(self.strings.generation())
        } else {
            Err(TileError::StringTableNotLoaded)
        }
    }

    fn way_endpoints(
        &self,
        object_id: u64,
        nodes: &[NodeId],
    ) -> Result<(Coord<f64>, Coord<f64>)> {
        match (nodes.first(), nodes.last()) {
            (Some(&first), Some(&last)) => Ok((
                self.node_coord(object_id, first)?,
                self.node_coord(object_id, last)?,
            )),
            _ => Err(TileError::MissingNode {
                object_id,
                node_id: 0,
            }),
        }
    }

    fn node_coord(&self, object_id: u64, node_id: NodeId) -> Result<Coord<f64>> {
        self.store
            .node(node_id)
            .ok_or(TileError::MissingNode { object_id, node_id })
    }

    // ------------------------------------------------------------------
    // Identity and outputs
    // ------------------------------------------------------------------

    /// Active primitive.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Id of the active primitive (synthetic for relations).
    pub fn id(&self) -> u64 {
        self.identity.id()
    }

    /// Id of the active primitive as a string.
    pub fn id_string(&self) -> String {
        self.id().to_string()
    }

    /// True if nothing has been emitted for the current primitive.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Features emitted for the current primitive so far.
    pub fn outputs(&self) -> &[OutputFeature] {
        &self.outputs
    }

    /// Hand the emitted features over, leaving the queue empty.
    pub fn take_outputs(&mut self) -> Vec<OutputFeature> {
        std::mem::take(&mut self.outputs)
    }

    /// Layer registry, including attribute types recorded so far.
    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    /// Give the layer registry back, e.g. to merge and serialize metadata.
    pub fn into_layers(self) -> LayerRegistry {
        self.layers
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Position of `s` in the current block's string table.
    pub fn string_table_position(&self, s: &str) -> Option<u32> {
        self.strings.position(s)
    }

    /// Check whether the primitive has tag `key`.
    pub fn has_tag(&self, key: &str) -> bool {
        self.value_id(key).is_some()
    }

    /// Value of tag `key`, empty if absent.
    pub fn get_tag(&self, key: &str) -> String {
        self.value_id(key)
            .map(|v| self.strings.get(v).to_string())
            .unwrap_or_default()
    }

    /// All tags of the primitive, in storage order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.tags
            .pairs()
            .map(move |(k, v)| (self.strings.get(k), self.strings.get(v)))
    }

    fn value_id(&self, key: &str) -> Option<u32> {
        debug_assert!(
            self.tags
                .generation()
                .map_or(true, |g| g == self.strings.generation()),
            "tag source decoded against a replaced string table"
        );
        let key_id = self.strings.position(key)?;
        self.tags.find_value_id(key_id)
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Line through the way's nodes, built on first access.
    ///
    /// Nodes and relations have no node references and yield an empty line.
    pub fn as_line(&mut self) -> Result<&LineString<f64>> {
        let object_id = self.id();
        let store = &*self.store;
        let nodes = &self.node_refs;
        self.geometry
            .line
            .get_or_try_init(|| build_line(store, object_id, nodes))
    }

    /// Polygon with the way's line as exterior ring, built on first access.
    pub fn as_polygon(&mut self) -> Result<&Polygon<f64>> {
        let object_id = self.id();
        let store = &*self.store;
        let nodes = &self.node_refs;
        let GeometryCache { line, polygon, .. } = &mut self.geometry;
        polygon.get_or_try_init(|| {
            let line = line.get_or_try_init(|| build_line(store, object_id, nodes))?;
            Ok::<_, TileError>(build_polygon(line))
        })
    }

    /// Multi-polygon, built on first access.
    ///
    /// Relations assemble their member rings; a way yields its single
    /// polygon; a node yields an empty multi-polygon.
    pub fn as_multi_polygon(&mut self) -> Result<&MultiPolygon<f64>> {
        let identity = self.identity;
        let store = &*self.store;
        let nodes = &self.node_refs;
        let (outer, inner) = (&self.outer_ways, &self.inner_ways);
        let GeometryCache {
            line,
            polygon,
            multi_polygon,
        } = &mut self.geometry;

        multi_polygon.get_or_try_init(|| match identity {
            Identity::Relation(id) => build_multi_polygon(store, u64::from(id), outer, inner),
            Identity::Way(id) => {
                let polygon = polygon.get_or_try_init(|| {
                    let line =
                        line.get_or_try_init(|| build_line(store, u64::from(id), nodes))?;
                    Ok::<_, TileError>(build_polygon(line))
                })?;
                Ok(MultiPolygon::new(vec![polygon.clone()]))
            }
            Identity::Node(_) | Identity::None => Ok(MultiPolygon::new(Vec::new())),
        })
    }

    /// True for ways whose first and last node are the same, and for
    /// relations (always areas). False for nodes.
    pub fn is_closed(&self) -> bool {
        match self.identity {
            Identity::Way(_) => match (self.node_refs.first(), self.node_refs.last()) {
                (Some(first), Some(last)) => first == last,
                _ => false,
            },
            Identity::Relation(_) => true,
            Identity::Node(_) | Identity::None => false,
        }
    }

    /// Planar area in projected square degrees; 0 for anything not closed.
    pub fn area(&mut self) -> Result<f64> {
        if !self.is_closed() {
            return Ok(0.0);
        }
        match self.identity {
            Identity::Relation(_) => Ok(self.as_multi_polygon()?.unsigned_area()),
            Identity::Way(_) => Ok(self.as_polygon()?.unsigned_area()),
            Identity::Node(_) | Identity::None => Ok(0.0),
        }
    }

    /// Planar length in projected degrees: the line for ways, the ring
    /// perimeter for relations, 0 for nodes.
    pub fn length(&mut self) -> Result<f64> {
        match self.identity {
            Identity::Relation(_) => Ok(multi_polygon_perimeter(self.as_multi_polygon()?)),
            Identity::Way(_) => Ok(self.as_line()?.length::<Euclidean>()),
            Identity::Node(_) | Identity::None => Ok(0.0),
        }
    }

    /// Meters per projected degree at the primitive's location.
    ///
    /// Multiply [`length`](Self::length) by this, and
    /// [`area`](Self::area) by its square.
    pub fn scale_to_meters(&mut self) -> Result<f64> {
        let latp = match self.identity {
            Identity::Relation(id) => {
                let rect = self
                    .as_multi_polygon()?
                    .bounding_rect()
                    .ok_or(TileError::EmptyGeometry(u64::from(id)))?;
                rect.center().y
            }
            _ => (self.start.y + self.end.y) / 2.0,
        };
        Ok(degp_to_meters(1.0, latp))
    }

    /// Kilometers per projected degree at the primitive's location.
    pub fn scale_to_kilometers(&mut self) -> Result<f64> {
        Ok(self.scale_to_meters()? / 1000.0)
    }

    // ------------------------------------------------------------------
    // Spatial queries
    // ------------------------------------------------------------------

    fn query_subject(&self) -> QuerySubject {
        match self.identity {
            Identity::Node(_) => QuerySubject::Point(self.start),
            Identity::Way(_) => QuerySubject::Segment(self.start, self.end),
            // multi-polygon subjects are not supported
            Identity::Relation(_) | Identity::None => QuerySubject::Unsupported,
        }
    }

    /// Names of the geometries in reference layer `layer` that the
    /// primitive intersects. Always empty for relations.
    pub fn intersecting_names(&self, layer: &str) -> Result<Vec<String>> {
        let outcome = find_intersecting(&*self.indices, layer, &self.query_subject())?;
        Ok(names_of(&*self.indices, &outcome.ids))
    }

    /// Check whether the primitive intersects anything in reference layer
    /// `layer`. Always false for relations.
    pub fn intersects(&self, layer: &str) -> Result<bool> {
        let outcome = find_intersecting(&*self.indices, layer, &self.query_subject())?;
        Ok(!outcome.ids.is_empty())
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    fn layer_index(&self, name: &str) -> Result<usize> {
        self.layers
            .index_of(name)
            .ok_or_else(|| TileError::UnknownLayer(name.to_string()))
    }

    /// Emit the primitive's geometry to `layer`.
    ///
    /// Nodes emit a point, relations their multi-polygon, ways a polygon when
    /// `is_area` and a line otherwise.
    pub fn emit_to_layer(&mut self, layer: &str, is_area: bool) -> Result<()> {
        let index = self.layer_index(layer)?;
        let geometry: Geometry<f64> = match self.identity {
            Identity::Node(_) => Point::from(self.start).into(),
            Identity::Way(_) if is_area => self.as_polygon()?.clone().into(),
            Identity::Way(_) => self.as_line()?.clone().into(),
            Identity::Relation(_) => self.as_multi_polygon()?.clone().into(),
            Identity::None => return Err(TileError::NoActivePrimitive),
        };
        self.push_output(index, geometry);
        Ok(())
    }

    /// Emit a single point at the primitive's centroid to `layer`.
    pub fn emit_centroid_to_layer(&mut self, layer: &str) -> Result<()> {
        let index = self.layer_index(layer)?;
        let object_id = self.id();
        let centroid = match self.identity {
            Identity::Node(_) => Some(Point::from(self.start)),
            Identity::Way(_) => self.as_polygon()?.centroid(),
            Identity::Relation(_) => self.as_multi_polygon()?.centroid(),
            Identity::None => return Err(TileError::NoActivePrimitive),
        };
        let point = centroid.ok_or(TileError::EmptyGeometry(object_id))?;
        self.push_output(index, point.into());
        Ok(())
    }

    fn push_output(&mut self, layer: usize, geometry: Geometry<f64>) {
        let object_id = self.id();
        tracing::trace!(object_id, layer, "Emitted feature");
        self.outputs
            .push(OutputFeature::new(layer, object_id, geometry));
    }

    /// Set a string attribute on the most recently emitted feature.
    pub fn set_attribute(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_attribute_value(key, AttributeValue::String(value.to_string()))
    }

    /// Set a numeric attribute on the most recently emitted feature.
    pub fn set_attribute_numeric(&mut self, key: &str, value: f32) -> Result<()> {
        self.set_attribute_value(key, AttributeValue::Number(value))
    }

    /// Set a boolean attribute on the most recently emitted feature.
    pub fn set_attribute_boolean(&mut self, key: &str, value: bool) -> Result<()> {
        self.set_attribute_value(key, AttributeValue::Boolean(value))
    }

    fn set_attribute_value(&mut self, key: &str, value: AttributeValue) -> Result<()> {
        let feature = self
            .outputs
            .last_mut()
            .ok_or(TileError::NoOutputFeature)?;
        let layer = feature.layer;
        let ty = value.attribute_type();
        feature.set_attribute(key, value);
        self.layers.record_attribute_type(layer, key, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemorySpatialIndex;
    use crate::layer::{AttributeType, LayerSpec};
    use crate::store::MemoryOsmStore;

    fn context() -> FeatureContext {
        let mut store = MemoryOsmStore::new();
        store.insert_node(1, Coord { x: 0.0, y: 0.0 });
        store.insert_node(2, Coord { x: 1.0, y: 0.0 });
        store.insert_node(3, Coord { x: 1.0, y: 1.0 });
        store.insert_node(4, Coord { x: 0.0, y: 1.0 });
        store.insert_node(5, Coord { x: 5.0, y: 5.0 });
        store.insert_way(10, vec![1, 2, 3, 4, 1]);

        let mut layers = LayerRegistry::new();
        layers.register_layer(LayerSpec::new("roads", 8, 14)).unwrap();
        layers.register_layer(LayerSpec::new("pois", 12, 14)).unwrap();

        let mut ctx = FeatureContext::new(
            Arc::new(store),
            Arc::new(MemorySpatialIndex::new()),
            layers,
        );
        ctx.load_string_table(
            ["", "highway", "primary", "name", "Main St"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        ctx
    }

    #[test]
    fn test_reset_without_begin() {
        let mut ctx = context();
        ctx.reset();
        ctx.reset();
        assert!(ctx.is_empty());
        assert_eq!(ctx.identity(), Identity::None);
        assert!(!ctx.has_tag("highway"));
    }

    #[test]
    fn test_begin_requires_string_table() {
        let mut ctx = FeatureContext::new(
            Arc::new(MemoryOsmStore::new()),
            Arc::new(MemorySpatialIndex::new()),
            LayerRegistry::new(),
        );
        let err = ctx.begin_way(1, &[1], &[], &[]).unwrap_err();
        assert!(matches!(err, TileError::StringTableNotLoaded));
    }

    #[test]
    fn test_way_tags() {
        let mut ctx = context();
        ctx.begin_way(7, &[1, 2], &[1, 3], &[2, 4]).unwrap();
        assert!(ctx.has_tag("highway"));
        assert_eq!(ctx.get_tag("name"), "Main St");
        assert_eq!(ctx.get_tag("surface"), "");
        assert_eq!(
            ctx.tags().collect::<Vec<_>>(),
            vec![("highway", "primary"), ("name", "Main St")]
        );
    }

    #[test]
    fn test_reloading_table_drops_current_tags() {
        let mut ctx = context();
        ctx.begin_way(7, &[1, 2], &[1], &[2]).unwrap();
        ctx.load_string_table(vec![String::new(), "highway".into()]);
        assert!(!ctx.has_tag("highway"));
    }

    #[test]
    fn test_way_missing_endpoint() {
        let mut ctx = context();
        let err = ctx.begin_way(8, &[1, 99], &[], &[]).unwrap_err();
        assert!(matches!(
            err,
            TileError::MissingNode {
                object_id: 8,
                node_id: 99
            }
        ));
    }

    #[test]
    fn test_failed_way_leaves_no_primitive_active() {
        let mut ctx = context();
        let kv: Arc<[u32]> = Arc::from(vec![1, 2, 0]);
        ctx.begin_node(5, Coord { x: 5.0, y: 5.0 }, &kv, 0..2).unwrap();

        assert!(ctx.begin_way(8, &[1, 99], &[1], &[2]).is_err());
        assert_eq!(ctx.identity(), Identity::None);
        assert!(!ctx.has_tag("highway"));
        assert!(!ctx.is_closed());
        assert!(matches!(
            ctx.emit_to_layer("roads", false),
            Err(TileError::NoActivePrimitive)
        ));

        assert!(matches!(
            ctx.begin_way(8, &[], &[], &[]),
            Err(TileError::MissingNode { node_id: 0, .. })
        ));
        assert_eq!(ctx.identity(), Identity::None);
    }

    #[test]
    fn test_closed_unit_square() {
        let mut ctx = context();
        ctx.begin_way(9, &[1, 2, 3, 4, 1], &[], &[]).unwrap();
        assert!(ctx.is_closed());
        assert_eq!(ctx.area().unwrap(), 1.0);
        assert_eq!(ctx.length().unwrap(), 4.0);
    }

    #[test]
    fn test_open_way_has_no_area_but_polygon_still_builds() {
        let mut ctx = context();
        ctx.begin_way(9, &[1, 2, 3, 4], &[], &[]).unwrap();
        assert!(!ctx.is_closed());
        assert_eq!(ctx.area().unwrap(), 0.0);
        assert_eq!(ctx.as_polygon().unwrap().unsigned_area(), 1.0);
    }

    #[test]
    fn test_attribute_before_emission() {
        let mut ctx = context();
        ctx.begin_way(9, &[1, 2], &[], &[]).unwrap();
        assert!(matches!(
            ctx.set_attribute("name", "x"),
            Err(TileError::NoOutputFeature)
        ));
    }

    #[test]
    fn test_attributes_target_last_emission_and_record_types() {
        let mut ctx = context();
        ctx.begin_way(9, &[1, 2, 3], &[], &[]).unwrap();
        ctx.emit_to_layer("roads", false).unwrap();
        ctx.set_attribute("name", "A").unwrap();
        ctx.emit_centroid_to_layer("pois").unwrap();
        ctx.set_attribute_numeric("rank", 3.0).unwrap();
        ctx.set_attribute_boolean("lit", true).unwrap();

        let outputs = ctx.outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].attributes.len(), 1);
        assert_eq!(outputs[1].attributes.len(), 2);
        assert!(matches!(outputs[0].geometry, Geometry::LineString(_)));
        assert!(matches!(outputs[1].geometry, Geometry::Point(_)));

        let pois = ctx.layers().get(1).unwrap();
        assert_eq!(pois.attributes["rank"], AttributeType::Number);
        assert_eq!(pois.attributes["lit"], AttributeType::Boolean);
    }

    #[test]
    fn test_unknown_layer_is_reported() {
        let mut ctx = context();
        ctx.begin_way(9, &[1, 2], &[], &[]).unwrap();
        let err = ctx.emit_to_layer("buildings", true).unwrap_err();
        assert!(matches!(err, TileError::UnknownLayer(name) if name == "buildings"));
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_node_emits_point_and_has_no_length() {
        let mut ctx = context();
        let kv: Arc<[u32]> = Arc::from(vec![1, 2, 0]);
        ctx.begin_node(5, Coord { x: 5.0, y: 5.0 }, &kv, 0..2).unwrap();
        assert_eq!(ctx.get_tag("highway"), "primary");
        assert!(!ctx.is_closed());
        assert_eq!(ctx.length().unwrap(), 0.0);
        ctx.emit_to_layer("pois", true).unwrap();
        assert_eq!(
            ctx.take_outputs()[0].geometry,
            Geometry::Point(Point::new(5.0, 5.0))
        );
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_emit_with_no_primitive() {
        let mut ctx = context();
        assert!(matches!(
            ctx.emit_to_layer("roads", false),
            Err(TileError::NoActivePrimitive)
        ));
    }

    #[test]
    fn test_relation_multi_polygon_area() {
        let mut ctx = context();
        let id = ctx.begin_relation(&[10], &[], &[], &[]).unwrap();
        assert_eq!(id, MAX_WAY_ID - 1);
        assert!(ctx.identity().is_relation());
        assert!(ctx.is_closed());
        assert_eq!(ctx.area().unwrap(), 1.0);
        assert_eq!(ctx.length().unwrap(), 4.0);
        ctx.emit_to_layer("roads", false).unwrap();
        assert!(matches!(
            ctx.outputs()[0].geometry,
            Geometry::MultiPolygon(_)
        ));
    }

    #[test]
    fn test_scale_at_equator() {
        let mut ctx = context();
        ctx.begin_way(9, &[1, 2], &[], &[]).unwrap();
        let m = ctx.scale_to_meters().unwrap();
        assert!((m - 111_194.93).abs() < 0.01);
        assert!((ctx.scale_to_kilometers().unwrap() - m / 1000.0).abs() < 1e-9);
    }
}
