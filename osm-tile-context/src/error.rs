//! Error types for feature processing.

use thiserror::Error;

/// Errors raised while processing a primitive or configuring layers.
#[derive(Error, Debug)]
pub enum TileError {
    /// A way (or the way behind a relation member) references a node that the
    /// store does not hold. Fatal to the current primitive.
    #[error("Way {object_id} is missing node {node_id}")]
    MissingNode { object_id: u64, node_id: u64 },

    /// A relation references a way that the store does not hold.
    #[error("Relation {relation_id} is missing way {way_id}")]
    MissingWay { relation_id: u64, way_id: u64 },

    /// Emission to a layer name that was never registered.
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    /// A layer name was registered twice.
    #[error("Duplicate layer: {0}")]
    DuplicateLayer(String),

    /// Spatial query against a reference layer with no index.
    #[error("Unknown index layer: {0}")]
    UnknownIndexLayer(String),

    /// Attribute set before anything was emitted for the current primitive.
    #[error("Attribute set before any output feature was emitted")]
    NoOutputFeature,

    /// A primitive was started before the block's string table was loaded.
    #[error("No string table loaded for the current block")]
    StringTableNotLoaded,

    /// Emission or geometry access with no primitive begun.
    #[error("No primitive is being processed")]
    NoActivePrimitive,

    /// Error raised by the scripting layer while processing a primitive.
    #[error("Script error: {0}")]
    Script(String),

    /// Geometry has no points to derive a centroid or location from.
    #[error("Object {0} has empty geometry")]
    EmptyGeometry(u64),

    /// WKT parsing error for reference-layer geometry.
    #[error("WKT parse error: {0}")]
    WktParse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TileError {
    /// True for reference failures that abort only the current primitive.
    ///
    /// Everything else points at a broken layer configuration or script and
    /// should stop processing.
    pub fn is_missing_reference(&self) -> bool {
        matches!(
            self,
            TileError::MissingNode { .. } | TileError::MissingWay { .. }
        )
    }
}

/// Result type for feature processing.
pub type Result<T> = std::result::Result<T, TileError>;
