//! Scripting boundary.
//!
//! An embedded scripting binding sees the current primitive only through
//! [`FeatureApi`]: plain strings and numbers in and out, no context internals.
//! User logic implements [`FeatureScript`], which the context runs once per
//! primitive.

use crate::context::FeatureContext;
use crate::error::Result;
use crate::output::OutputFeature;
use crate::store::{NodeId, WayId};
use geo_types::Coord;
use std::ops::Range;
use std::sync::Arc;

/// Operations a script may call on the current primitive.
pub trait FeatureApi {
    /// Id of the primitive, as a string.
    fn id(&self) -> String;

    /// Check whether the primitive has tag `key`.
    fn holds(&self, key: &str) -> bool;

    /// Value of tag `key`, empty if absent.
    fn find(&self, key: &str) -> String;

    /// Names of intersecting geometries in a reference layer.
    fn find_intersecting(&self, layer: &str) -> Result<Vec<String>>;

    /// Check whether anything in a reference layer intersects the primitive.
    fn intersects(&self, layer: &str) -> Result<bool>;

    /// Check whether the primitive is a closed ring (or an area relation).
    fn is_closed(&self) -> bool;

    /// Area in projected square degrees.
    fn area(&mut self) -> Result<f64>;

    /// Length in projected degrees.
    fn length(&mut self) -> Result<f64>;

    /// Meters per projected degree at the primitive.
    fn scale_to_meter(&mut self) -> Result<f64>;

    /// Kilometers per projected degree at the primitive.
    fn scale_to_kilometer(&mut self) -> Result<f64>;

    /// Emit the primitive to an output layer.
    fn layer(&mut self, name: &str, area: bool) -> Result<()>;

    /// Emit the primitive's centroid to an output layer.
    fn layer_as_centroid(&mut self, name: &str) -> Result<()>;

    /// Set a string attribute on the last emitted feature.
    fn attribute(&mut self, key: &str, value: &str) -> Result<()>;

    /// Set a numeric attribute on the last emitted feature.
    fn attribute_numeric(&mut self, key: &str, value: f32) -> Result<()>;

    /// Set a boolean attribute on the last emitted feature.
    fn attribute_boolean(&mut self, key: &str, value: bool) -> Result<()>;
}

/// Per-primitive user logic.
pub trait FeatureScript {
    /// Tag keys a node must carry to reach [`node_function`](Self::node_function).
    /// `None` sends every node.
    fn node_keys(&self) -> Option<&[String]> {
        None
    }

    /// Called for each node.
    fn node_function(&mut self, feature: &mut dyn FeatureApi) -> Result<()>;

    /// Called for each way and each multi-polygon relation.
    fn way_function(&mut self, feature: &mut dyn FeatureApi) -> Result<()>;
}

impl FeatureApi for FeatureContext {
    fn id(&self) -> String {
        self.id_string()
    }

    fn holds(&self, key: &str) -> bool {
        self.has_tag(key)
    }

    fn find(&self, key: &str) -> String {
        self.get_tag(key)
    }

    fn find_intersecting(&self, layer: &str) -> Result<Vec<String>> {
        self.intersecting_names(layer)
    }

    fn intersects(&self, layer: &str) -> Result<bool> {
        FeatureContext::intersects(self, layer)
    }

    fn is_closed(&self) -> bool {
        FeatureContext::is_closed(self)
    }

    fn area(&mut self) -> Result<f64> {
        FeatureContext::area(self)
    }

    fn length(&mut self) -> Result<f64> {
        FeatureContext::length(self)
    }

    fn scale_to_meter(&mut self) -> Result<f64> {
        self.scale_to_meters()
    }

    fn scale_to_kilometer(&mut self) -> Result<f64> {
        self.scale_to_kilometers()
    }

    fn layer(&mut self, name: &str, area: bool) -> Result<()> {
        self.emit_to_layer(name, area)
    }

    fn layer_as_centroid(&mut self, name: &str) -> Result<()> {
        self.emit_centroid_to_layer(name)
    }

    fn attribute(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_attribute(key, value)
    }

    fn attribute_numeric(&mut self, key: &str, value: f32) -> Result<()> {
        self.set_attribute_numeric(key, value)
    }

    fn attribute_boolean(&mut self, key: &str, value: bool) -> Result<()> {
        self.set_attribute_boolean(key, value)
    }
}

impl FeatureContext {
    /// Run `script` on one dense node and return what it emitted.
    ///
    /// Nodes carrying none of the script's `node_keys` are not passed to
    /// the script.
    pub fn process_node(
        &mut self,
        script: &mut dyn FeatureScript,
        id: NodeId,
        coord: Coord<f64>,
        key_vals: &Arc<[u32]>,
        tags: Range<usize>,
    ) -> Result<Vec<OutputFeature>> {
        self.begin_node(id, coord, key_vals, tags)?;
        if let Some(keys) = script.node_keys() {
            if !keys.iter().any(|k| self.has_tag(k)) {
                return Ok(Vec::new());
            }
        }
        script.node_function(self)?;
        Ok(self.take_outputs())
    }

    /// Run `script` on one way and return what it emitted.
    pub fn process_way(
        &mut self,
        script: &mut dyn FeatureScript,
        id: WayId,
        nodes: &[NodeId],
        keys: &[u32],
        vals: &[u32],
    ) -> Result<Vec<OutputFeature>> {
        self.begin_way(id, nodes, keys, vals)?;
        script.way_function(self)?;
        Ok(self.take_outputs())
    }

    /// Run `script` on one multi-polygon relation and return what it emitted.
    pub fn process_relation(
        &mut self,
        script: &mut dyn FeatureScript,
        outer: &[WayId],
        inner: &[WayId],
        keys: &[u32],
        vals: &[u32],
    ) -> Result<Vec<OutputFeature>> {
        self.begin_relation(outer, inner, keys, vals)?;
        script.way_function(self)?;
        Ok(self.take_outputs())
    }
}
