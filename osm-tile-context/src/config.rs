//! Layer configuration.
//!
//! Read from the `layers` object of a tile `config.json`:
//!
//! ```json
//! {
//!   "layers": {
//!     "water":    { "minzoom": 6, "maxzoom": 14, "simplify_below": 12 },
//!     "ocean":    { "minzoom": 0, "maxzoom": 14, "write_to": "water" }
//!   }
//! }
//! ```
//!
//! Layers are registered in the order they appear in the document. Other
//! top-level keys (such as `settings`) are ignored here.

use crate::error::{Result, TileError};
use crate::layer::{LayerRegistry, LayerSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_simplify_level() -> f64 {
    LayerSpec::DEFAULT_SIMPLIFY_LEVEL
}

fn default_simplify_ratio() -> f64 {
    1.0
}

/// Configuration of one output layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub minzoom: u8,
    pub maxzoom: u8,

    /// Simplify below this zoom. Default: 0 (never)
    #[serde(default)]
    pub simplify_below: u8,

    /// Tolerance in projected degrees. Default: 0.01
    #[serde(default = "default_simplify_level")]
    pub simplify_level: f64,

    /// Tolerance in meters, overriding `simplify_level` when set. Default: 0
    #[serde(default)]
    pub simplify_length: f64,

    /// Tolerance growth per zoom level. Default: 1
    #[serde(default = "default_simplify_ratio")]
    pub simplify_ratio: f64,

    /// Earlier layer whose group this one joins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_to: Option<String>,
}

impl LayerConfig {
    /// Registration parameters for a layer called `name`.
    pub fn to_spec(&self, name: &str) -> LayerSpec {
        let spec = LayerSpec::new(name, self.minzoom, self.maxzoom).with_simplify(
            self.simplify_below,
            self.simplify_level,
            self.simplify_length,
            self.simplify_ratio,
        );
        match &self.write_to {
            Some(target) => spec.with_write_to(target.as_str()),
            None => spec,
        }
    }
}

/// Ordered layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ContextConfig {
    layers: Vec<(String, LayerConfig)>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    layers: serde_json::Map<String, serde_json::Value>,
}

impl ContextConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer.
    pub fn with_layer(mut self, name: impl Into<String>, layer: LayerConfig) -> Self {
        self.layers.push((name.into(), layer));
        self
    }

    /// Parse a `config.json` document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let mut layers = Vec::with_capacity(raw.layers.len());
        for (name, value) in raw.layers {
            let layer: LayerConfig = serde_json::from_value(value)
                .map_err(|e| TileError::Config(format!("layer {name}: {e}")))?;
            if layer.minzoom > layer.maxzoom {
                return Err(TileError::Config(format!(
                    "layer {name}: minzoom {} above maxzoom {}",
                    layer.minzoom, layer.maxzoom
                )));
            }
            layers.push((name, layer));
        }
        Ok(Self { layers })
    }

    /// Read and parse a `config.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            layers = config.layers.len(),
            "Loaded layer configuration"
        );
        Ok(config)
    }

    /// Configured layers, in registration order.
    pub fn layers(&self) -> &[(String, LayerConfig)] {
        &self.layers
    }

    /// Register every layer, in order, into a new registry.
    pub fn build_registry(&self) -> Result<LayerRegistry> {
        let mut registry = LayerRegistry::new();
        for (name, layer) in &self.layers {
            registry.register_layer(layer.to_spec(name))?;
        }
        tracing::info!(
            layers = registry.len(),
            groups = registry.groups().len(),
            "Built layer registry"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "settings": { "minzoom": 0, "maxzoom": 14 },
        "layers": {
            "water": { "minzoom": 6, "maxzoom": 14, "simplify_below": 12, "simplify_level": 0.0003 },
            "ocean": { "minzoom": 0, "maxzoom": 14, "write_to": "water" },
            "place": { "minzoom": 4, "maxzoom": 14 }
        }
    }"#;

    #[test]
    fn test_layers_keep_document_order_and_defaults() {
        let config = ContextConfig::from_json_str(CONFIG).unwrap();
        let names: Vec<&str> = config.layers().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["water", "ocean", "place"]);

        let place = &config.layers()[2].1;
        assert_eq!(place.simplify_below, 0);
        assert_eq!(place.simplify_level, 0.01);
        assert_eq!(place.simplify_length, 0.0);
        assert_eq!(place.simplify_ratio, 1.0);
        assert_eq!(place.write_to, None);
    }

    #[test]
    fn test_build_registry_groups_write_to() {
        let registry = ContextConfig::from_json_str(CONFIG)
            .unwrap()
            .build_registry()
            .unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.index_of("ocean"), Some(1));
        assert_eq!(registry.groups(), &[vec![0, 1], vec![2]]);
        assert_eq!(registry.get(0).unwrap().simplify_level, 0.0003);
    }

    #[test]
    fn test_write_to_unknown_layer_fails() {
        let json = r#"{"layers": {"a": {"minzoom": 0, "maxzoom": 5, "write_to": "b"}}}"#;
        let err = ContextConfig::from_json_str(json)
            .unwrap()
            .build_registry()
            .unwrap_err();
        assert!(matches!(err, TileError::UnknownLayer(name) if name == "b"));
    }

    #[test]
    fn test_invalid_layer_reported_by_name() {
        let json = r#"{"layers": {"roads": {"minzoom": 9}}}"#;
        let err = ContextConfig::from_json_str(json).unwrap_err();
        assert!(matches!(&err, TileError::Config(msg) if msg.starts_with("layer roads")));

        let json = r#"{"layers": {"roads": {"minzoom": 9, "maxzoom": 3}}}"#;
        assert!(matches!(
            ContextConfig::from_json_str(json),
            Err(TileError::Config(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = ContextConfig::from_path(file.path()).unwrap();
        assert_eq!(config.layers().len(), 3);

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            ContextConfig::from_path(missing),
            Err(TileError::Io(_))
        ));
    }

    #[test]
    fn test_builder_matches_parsed_layer() {
        let layer = LayerConfig {
            minzoom: 0,
            maxzoom: 14,
            simplify_below: 0,
            simplify_level: 0.01,
            simplify_length: 0.0,
            simplify_ratio: 1.0,
            write_to: None,
        };
        let config = ContextConfig::new().with_layer("place", layer.clone());
        let spec = layer.to_spec("place");
        assert_eq!(spec, LayerSpec::new("place", 0, 14));
        assert_eq!(config.build_registry().unwrap().len(), 1);
    }
}
