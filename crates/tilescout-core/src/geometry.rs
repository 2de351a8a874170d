//! Planar polygon helpers for tile footprints.
//!
//! Footprints are simple rings of `[lon, lat]` pairs. Chips are small
//! (hundreds of metres), so planar math on degrees is accurate enough.

use serde::{Deserialize, Serialize};

use crate::model::Coordinate;

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// A closed or open ring of `[lon, lat]` vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Footprint(pub Vec<[f64; 2]>);

impl Footprint {
    /// Check the ring has at least three distinct vertices and finite values.
    ///
    /// # Errors
    /// Returns a human-readable reason when the ring is unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.vertices().len() < 3 {
            return Err(format!("ring has {} vertices, need 3", self.0.len()));
        }
        if self.0.iter().flatten().any(|v| !v.is_finite()) {
            return Err("ring contains a non-finite coordinate".to_string());
        }
        Ok(())
    }

    /// Vertices without the closing duplicate, if present.
    fn vertices(&self) -> &[[f64; 2]] {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) if self.0.len() > 1 && first == last => {
                &self.0[..self.0.len() - 1]
            }
            _ => &self.0,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for [lon, lat] in self.vertices() {
            bbox.min_lon = bbox.min_lon.min(*lon);
            bbox.min_lat = bbox.min_lat.min(*lat);
            bbox.max_lon = bbox.max_lon.max(*lon);
            bbox.max_lat = bbox.max_lat.max(*lat);
        }
        bbox
    }

    /// Area-weighted centroid; falls back to the vertex mean for
    /// degenerate (zero-area) rings.
    ///
    /// Vertices are shifted to the first vertex before the shoelace sums
    /// to keep precision for small rings far from the origin.
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Coordinate {
        let vs = self.vertices();
        let Some(&[ox, oy]) = vs.first() else {
            return Coordinate::new(f64::NAN, f64::NAN);
        };
        let mut area2 = 0.0;
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..vs.len() {
            let [x0, y0] = [vs[i][0] - ox, vs[i][1] - oy];
            let [x1, y1] = {
                let [x, y] = vs[(i + 1) % vs.len()];
                [x - ox, y - oy]
            };
            let cross = x0 * y1 - x1 * y0;
            area2 += cross;
            cx += (x0 + x1) * cross;
            cy += (y0 + y1) * cross;
        }
        if area2.abs() < f64::EPSILON {
            let n = vs.len().max(1) as f64;
            let (sx, sy) = vs.iter().fold((0.0, 0.0), |(sx, sy), [x, y]| (sx + x, sy + y));
            return Coordinate::new(sx / n, sy / n);
        }
        Coordinate::new(ox + cx / (3.0 * area2), oy + cy / (3.0 * area2))
    }

    /// Even-odd ray casting. Points exactly on an edge may land either way.
    pub fn contains(&self, point: Coordinate) -> bool {
        let vs = self.vertices();
        let (px, py) = (point.lon, point.lat);
        let mut inside = false;
        let mut j = vs.len().wrapping_sub(1);
        for i in 0..vs.len() {
            let [xi, yi] = vs[i];
            let [xj, yj] = vs[j];
            if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}
