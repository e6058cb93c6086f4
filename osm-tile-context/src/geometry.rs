//! Geometry primitives shared by the builder, the spatial index and the
//! query engine.
//!
//! All coordinates live in the projected `(lon, latp)` space described in
//! [`crate::projection`], never raw longitude/latitude.

use crate::error::{Result, TileError};
use geo::BoundingRect;
use geo_types::{Coord, Geometry};
use serde::{Deserialize, Serialize};

/// Geometry kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum GeometryKind {
    Point = 0,
    LineString = 1,
    Polygon = 2,
    MultiPolygon = 3,
    Other = 4,
}

impl GeometryKind {
    /// Classify a geo-types Geometry.
    pub fn from_geometry(geom: &Geometry<f64>) -> Self {
        match geom {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            _ => GeometryKind::Other,
        }
    }
}

/// Axis-aligned bounding box in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box holding two corner points, in any order.
    pub fn from_corners(a: Coord<f64>, b: Coord<f64>) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Compute from a geo-types Geometry. `None` for empty geometry.
    pub fn from_geometry(geom: &Geometry<f64>) -> Option<Self> {
        let rect = geom.bounding_rect()?;
        Some(Self::from_corners(rect.min(), rect.max()))
    }

    /// Check if this bbox intersects another. Touching edges count.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Parse WKT string to geo-types Geometry.
pub fn parse_wkt(wkt: &str) -> Result<Geometry<f64>> {
    use std::str::FromStr;
    wkt::Wkt::from_str(wkt)
        .map_err(|e| TileError::WktParse(format!("{:?}", e)))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| TileError::WktParse(format!("{:?}", e)))
        })
}
