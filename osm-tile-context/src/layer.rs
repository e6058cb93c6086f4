//! Output layer registry and `vector_layers` metadata.
//!
//! Layers are registered once at configuration time, in order. Each layer
//! carries its zoom range, its simplification policy, and the attribute
//! schema accumulated while features are emitted. The registry also keeps
//! the grouping of layers the tile encoder writes together:
//!
//! ```text
//! layers:  [water, ocean, roads, road_labels, pois]
//! groups:  [[0, 1], [2, 3], [4]]      (ocean and road_labels use write_to)
//! ```

use crate::error::{Result, TileError};
use crate::projection::degp_to_meters;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute value type recorded in the layer schema.
///
/// The discriminant is the stable numeric tag; serialization uses the
/// TileJSON type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AttributeType {
    String = 0,
    Number = 1,
    Boolean = 2,
}

impl AttributeType {
    /// Numeric tag of this type.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Type for a numeric tag. Unknown tags read as `String`.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            1 => AttributeType::Number,
            2 => AttributeType::Boolean,
            _ => AttributeType::String,
        }
    }
}

/// Parameters for registering a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub name: String,
    pub minzoom: u8,
    pub maxzoom: u8,

    /// Simplify at zooms strictly below this one; 0 disables simplification.
    pub simplify_below: u8,

    /// Simplification tolerance (projected degrees) at `simplify_below - 1`.
    pub simplify_level: f64,

    /// Tolerance in meters; overrides `simplify_level` when positive.
    pub simplify_length: f64,

    /// Tolerance multiplier per zoom level further out.
    pub simplify_ratio: f64,

    /// Name of an earlier layer whose group this layer joins.
    pub write_to: Option<String>,
}

impl LayerSpec {
    /// Default simplification tolerance.
    pub const DEFAULT_SIMPLIFY_LEVEL: f64 = 0.01;

    /// Create a spec with no simplification and its own group.
    pub fn new(name: impl Into<String>, minzoom: u8, maxzoom: u8) -> Self {
        Self {
            name: name.into(),
            minzoom,
            maxzoom,
            simplify_below: 0,
            simplify_level: Self::DEFAULT_SIMPLIFY_LEVEL,
            simplify_length: 0.0,
            simplify_ratio: 1.0,
            write_to: None,
        }
    }

    /// Set the simplification policy.
    pub fn with_simplify(mut self, below: u8, level: f64, length: f64, ratio: f64) -> Self {
        self.simplify_below = below;
        self.simplify_level = level;
        self.simplify_length = length;
        self.simplify_ratio = ratio;
        self
    }

    /// Join the group of an already registered layer.
    pub fn with_write_to(mut self, layer: impl Into<String>) -> Self {
        self.write_to = Some(layer.into());
        self
    }
}

/// A registered output layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDef {
    pub name: String,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub simplify_below: u8,
    pub simplify_level: f64,
    pub simplify_length: f64,
    pub simplify_ratio: f64,

    /// Attribute key → type, for every attribute ever written to the layer.
    pub attributes: BTreeMap<String, AttributeType>,
}

impl LayerDef {
    /// Check if the layer is written at `zoom`.
    pub fn covers_zoom(&self, zoom: u8) -> bool {
        zoom >= self.minzoom && zoom <= self.maxzoom
    }

    /// Simplification tolerance at `zoom`, in projected degrees.
    ///
    /// `latp` is the projected latitude the meter-based tolerance is
    /// converted at. `None` when the layer is not simplified at this zoom.
    pub fn simplify_level_at(&self, zoom: u8, latp: f64) -> Option<f64> {
        if zoom >= self.simplify_below {
            return None;
        }
        let base = if self.simplify_length > 0.0 {
            self.simplify_length / degp_to_meters(1.0, latp)
        } else {
            self.simplify_level
        };
        let steps = i32::from(self.simplify_below) - 1 - i32::from(zoom);
        Some(base * self.simplify_ratio.powi(steps))
    }
}

/// One entry of the `vector_layers` metadata array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    pub id: String,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub fields: BTreeMap<String, AttributeType>,
}

/// Layer metadata document consumed by tile viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLayersMetadata {
    pub vector_layers: Vec<VectorLayer>,
}

/// Ordered set of output layers.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    /// Definitions in registration order.
    layers: Vec<LayerDef>,

    /// Name → index.
    by_name: FxHashMap<String, usize>,

    /// Layer indices grouped for writing, e.g. `[[0], [1, 2, 3], [4]]`.
    groups: Vec<Vec<usize>>,
}

impl LayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer and return its index.
    ///
    /// Duplicate names are rejected and leave the registry unchanged, as does
    /// a `write_to` naming an unregistered layer.
    pub fn register_layer(&mut self, spec: LayerSpec) -> Result<usize> {
        if self.by_name.contains_key(&spec.name) {
            return Err(TileError::DuplicateLayer(spec.name));
        }

        let index = self.layers.len();
        match spec.write_to.as_deref() {
            Some(target) if !target.is_empty() => {
                let target_index = self
                    .index_of(target)
                    .ok_or_else(|| TileError::UnknownLayer(target.to_string()))?;
                let group = self
                    .groups
                    .iter_mut()
                    .find(|g| g.contains(&target_index))
                    .ok_or_else(|| {
                        TileError::Config(format!("layer {target} is in no group"))
                    })?;
                group.push(index);
            }
            _ => self.groups.push(vec![index]),
        }

        tracing::debug!(
            layer = %spec.name,
            index,
            minzoom = spec.minzoom,
            maxzoom = spec.maxzoom,
            "Registered layer"
        );

        self.by_name.insert(spec.name.clone(), index);
        self.layers.push(LayerDef {
            name: spec.name,
            minzoom: spec.minzoom,
            maxzoom: spec.maxzoom,
            simplify_below: spec.simplify_below,
            simplify_level: spec.simplify_level,
            simplify_length: spec.simplify_length,
            simplify_ratio: spec.simplify_ratio,
            attributes: BTreeMap::new(),
        });
        Ok(index)
    }

    /// Index of a layer by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Layer definition by index.
    pub fn get(&self, index: usize) -> Option<&LayerDef> {
        self.layers.get(index)
    }

    /// All layers in registration order.
    pub fn layers(&self) -> &[LayerDef] {
        &self.layers
    }

    /// Write groups, in order of their first layer.
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    /// Number of registered layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if no layer is registered.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Record that attribute `key` of type `ty` was written to a layer.
    ///
    /// Recording the same key again overwrites its type; the key appears once.
    pub fn record_attribute_type(
        &mut self,
        layer_index: usize,
        key: &str,
        ty: AttributeType,
    ) -> Result<()> {
        let layer = self
            .layers
            .get_mut(layer_index)
            .ok_or_else(|| TileError::Config(format!("no layer at index {layer_index}")))?;
        match layer.attributes.get_mut(key) {
            Some(existing) => *existing = ty,
            None => {
                layer.attributes.insert(key.to_string(), ty);
            }
        }
        Ok(())
    }

    /// Fold attribute types recorded by another registry (e.g. another
    /// worker's copy) into this one, matching layers by name.
    pub fn merge_attribute_types(&mut self, other: &LayerRegistry) {
        for theirs in &other.layers {
            let Some(index) = self.index_of(&theirs.name) else {
                tracing::warn!(layer = %theirs.name, "Skipping attributes of unknown layer");
                continue;
            };
            self.layers[index]
                .attributes
                .extend(theirs.attributes.iter().map(|(k, v)| (k.clone(), *v)));
        }
    }

    /// Build the `vector_layers` document for every registered layer.
    pub fn metadata(&self) -> VectorLayersMetadata {
        VectorLayersMetadata {
            vector_layers: self
                .layers
                .iter()
                .map(|l| VectorLayer {
                    id: l.name.clone(),
                    minzoom: l.minzoom,
                    maxzoom: l.maxzoom,
                    fields: l.attributes.clone(),
                })
                .collect(),
        }
    }

    /// Serialize the `vector_layers` document to JSON.
    pub fn serialize_metadata(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.metadata())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LayerRegistry {
        let mut reg = LayerRegistry::new();
        reg.register_layer(LayerSpec::new("water", 6, 14)).unwrap();
        reg.register_layer(LayerSpec::new("roads", 10, 14)).unwrap();
        reg.register_layer(LayerSpec::new("ocean", 0, 14).with_write_to("water"))
            .unwrap();
        reg.register_layer(LayerSpec::new("pois", 12, 14)).unwrap();
        reg
    }

    #[test]
    fn test_indices_and_groups() {
        let reg = registry();
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.index_of("ocean"), Some(2));
        assert_eq!(reg.index_of("rail"), None);
        assert_eq!(reg.groups(), &[vec![0, 2], vec![1], vec![3]]);
        assert_eq!(reg.get(1).unwrap().name, "roads");
    }

    #[test]
    fn test_duplicate_name_rejected_without_side_effects() {
        let mut reg = registry();
        let err = reg.register_layer(LayerSpec::new("roads", 0, 5)).unwrap_err();
        assert!(matches!(err, TileError::DuplicateLayer(name) if name == "roads"));
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.groups().len(), 3);
        assert_eq!(reg.get(1).unwrap().minzoom, 10);
    }

    #[test]
    fn test_write_to_unknown_layer_rejected() {
        let mut reg = registry();
        let err = reg
            .register_layer(LayerSpec::new("labels", 0, 14).with_write_to("missing"))
            .unwrap_err();
        assert!(matches!(err, TileError::UnknownLayer(name) if name == "missing"));
        assert_eq!(reg.index_of("labels"), None);
    }

    #[test]
    fn test_record_attribute_type_is_idempotent() {
        let mut reg = registry();
        reg.record_attribute_type(1, "name", AttributeType::String).unwrap();
        reg.record_attribute_type(1, "name", AttributeType::String).unwrap();
        reg.record_attribute_type(1, "lanes", AttributeType::Number).unwrap();
        let attrs = &reg.get(1).unwrap().attributes;
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["lanes"], AttributeType::Number);
        assert!(reg.record_attribute_type(9, "x", AttributeType::Boolean).is_err());
    }

    #[test]
    fn test_attribute_type_tags() {
        assert_eq!(AttributeType::Number.tag(), 1);
        assert_eq!(AttributeType::from_tag(0), AttributeType::String);
        assert_eq!(AttributeType::from_tag(2), AttributeType::Boolean);
        assert_eq!(AttributeType::from_tag(7), AttributeType::String);
        assert_eq!(
            serde_json::to_string(&AttributeType::Boolean).unwrap(),
            "\"Boolean\""
        );
    }

    #[test]
    fn test_simplify_level_by_zoom() {
        let def = LayerDef {
            name: "landuse".into(),
            minzoom: 4,
            maxzoom: 14,
            simplify_below: 12,
            simplify_level: 0.001,
            simplify_length: 0.0,
            simplify_ratio: 2.0,
            attributes: BTreeMap::new(),
        };
        assert_eq!(def.simplify_level_at(12, 0.0), None);
        assert_eq!(def.simplify_level_at(11, 0.0), Some(0.001));
        assert_eq!(def.simplify_level_at(8, 0.0), Some(0.008));
        assert!(def.covers_zoom(4));
        assert!(!def.covers_zoom(3));
    }

    #[test]
    fn test_simplify_length_in_meters() {
        let def = LayerDef {
            name: "roads".into(),
            minzoom: 0,
            maxzoom: 14,
            simplify_below: 10,
            simplify_level: 0.5,
            simplify_length: degp_to_meters(1.0, 0.0),
            simplify_ratio: 1.0,
            attributes: BTreeMap::new(),
        };
        let level = def.simplify_level_at(5, 0.0).unwrap();
        assert!((level - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_metadata_entry_keys() {
        let mut reg = LayerRegistry::new();
        reg.register_layer(LayerSpec::new("a", 0, 14)).unwrap();
        reg.record_attribute_type(0, "name", AttributeType::String)
            .unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&reg.serialize_metadata().unwrap()).unwrap();
        let keys: Vec<&str> = doc["vector_layers"][0]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["id", "minzoom", "maxzoom", "fields"]);
    }

    #[test]
    fn test_merge_attribute_types() {
        let mut a = registry();
        let mut b = registry();
        a.record_attribute_type(0, "name", AttributeType::String).unwrap();
        b.record_attribute_type(0, "depth", AttributeType::Number).unwrap();
        b.record_attribute_type(3, "open", AttributeType::Boolean).unwrap();
        a.merge_attribute_types(&b);
        assert_eq!(a.get(0).unwrap().attributes.len(), 2);
        assert_eq!(a.get(3).unwrap().attributes["open"], AttributeType::Boolean);
    }
}
