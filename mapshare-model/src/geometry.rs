//! Place geometry.
//!
//! Geometry is opaque to the indexing and caching core. The only spatial
//! capability the record store offers is a bounding-box intersection filter,
//! so the one operation defined here is computing that box.

use serde::{Deserialize, Serialize};

/// A GeoJSON-shaped geometry: `{"type": "Point", "coordinates": [x, y]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    /// Outer ring first, then holes.
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    /// Smallest axis-aligned box containing every vertex. `None` for an
    /// empty line or polygon.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut points: Box<dyn Iterator<Item = &[f64; 2]>> = match self {
            Geometry::Point(p) => Box::new(std::iter::once(p)),
            Geometry::LineString(line) => Box::new(line.iter()),
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten()),
        };
        let first = points.next()?;
        let start = BoundingBox {
            min_x: first[0],
            min_y: first[1],
            max_x: first[0],
            max_y: first[1],
        };
        Some(points.fold(start, |b, p| BoundingBox {
            min_x: b.min_x.min(p[0]),
            min_y: b.min_y.min(p[1]),
            max_x: b.max_x.max(p[0]),
            max_y: b.max_y.max(p[1]),
        }))
    }
}

/// Axis-aligned bounding box in the geometry's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Boxes that share an edge count as intersecting.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}
