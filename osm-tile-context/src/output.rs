//! Output features queued for the tile encoder.

use crate::layer::AttributeType;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Number(f32),
    Boolean(bool),
}

impl AttributeValue {
    /// Schema type of this value.
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Number(_) => AttributeType::Number,
            AttributeValue::Boolean(_) => AttributeType::Boolean,
        }
    }
}

/// A geometry bound to an output layer, with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFeature {
    /// Index into the layer registry.
    pub layer: usize,

    /// Id of the primitive that produced the feature (synthetic for relations).
    pub object_id: u64,

    /// Geometry in projected coordinates.
    pub geometry: Geometry<f64>,

    /// Attribute key → value.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl OutputFeature {
    /// Create a feature with no attributes.
    pub fn new(layer: usize, object_id: u64, geometry: Geometry<f64>) -> Self {
        Self {
            layer,
            object_id,
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Set or overwrite an attribute.
    pub fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        self.attributes.insert(key.to_string(), value);
    }

    /// Attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}
