//! Per-feature processing context for an OSM to vector-tile converter.
//!
//! Each worker decodes OSM primitives (nodes, ways, multi-polygon relations)
//! and hands them one at a time to a user script. The script inspects tags
//! and geometry, queries reference layers, and emits output features with
//! attributes into named vector-tile layers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                           FeatureContext                             │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │ StringTable + TagSource │ GeometryCache (memo) │ outputs │ registry  │
//! └──────────────────────────────────────────────────────────────────────┘
//!        │                          │                  │          │
//!        ▼                          ▼                  │          ▼
//!  tag lookups              OsmStore (shared)          │   LayerRegistry
//!                           line / polygon /           │   attribute types
//!                           multi-polygon              │          │
//!                                                      │          ▼
//!  QuerySubject ──► SpatialIndexRegistry (shared)      │   vector_layers JSON
//!                   bbox candidates ──► exact refine   ▼
//!                                               OutputFeature queue
//! ```
//!
//! # Modules
//!
//! - [`context`]: the per-primitive context
//! - [`script`]: the scripting boundary ([`FeatureApi`], [`FeatureScript`])
//! - [`tags`]: block string table and tag encodings
//! - [`builder`]: lazily built, memoized geometry
//! - [`query`]: reference-layer intersection queries
//! - [`layer`]: output layer registry and metadata document
//! - [`config`]: layer configuration loading
//! - [`store`] / [`index`]: shared read-only data sources
//! - [`error`]: error types

pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod index;
pub mod layer;
pub mod output;
pub mod projection;
pub mod query;
pub mod script;
pub mod store;
pub mod tags;

// Re-export key types
pub use config::{ContextConfig, LayerConfig};
pub use context::{FeatureContext, Identity};
pub use error::{Result, TileError};
pub use geometry::{BBox, GeometryKind};
pub use index::{IndexCandidate, MemorySpatialIndex, SpatialIndexRegistry};
pub use layer::{
    AttributeType, LayerDef, LayerRegistry, LayerSpec, VectorLayer, VectorLayersMetadata,
};
pub use output::{AttributeValue, OutputFeature};
pub use query::{QueryStats, QuerySubject};
pub use script::{FeatureApi, FeatureScript};
pub use store::{MemoryOsmStore, NodeId, OsmStore, WayId, MAX_WAY_ID};
pub use tags::{dense_tag_ranges, StringTable, TagSource};
