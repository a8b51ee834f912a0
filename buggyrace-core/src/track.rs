//! Closed track geometry.
//!
//! The engine only needs two things from a track: its length and a point for
//! any distance along it. Distances beyond one lap wrap around.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_to(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// A closed path buggies travel along.
pub trait TrackGeometry: Send + Sync + fmt::Debug {
    /// Length of one lap. Always positive.
    fn length(&self) -> f64;

    /// Point at `offset`, where `0 <= offset < length`.
    fn point_at(&self, offset: f64) -> Point;

    /// Point for an unwrapped distance, taken modulo the lap length.
    fn point_at_distance(&self, distance: f64) -> Point {
        self.point_at(distance.rem_euclid(self.length()))
    }
}

/// Polyline track. The last vertex joins back to the first.
#[derive(Debug, Clone)]
pub struct PolylineTrack {
    vertices: Vec<Point>,
    /// Distance along the path at each vertex; `cumulative[0] == 0`.
    cumulative: Vec<f64>,
}

impl PolylineTrack {
    pub fn new(points: Vec<Point>) -> Result<Self, LoadError> {
        if points.len() < 2 || points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(LoadError::DegenerateTrack);
        }

        let mut vertices = points;
        if vertices.first() != vertices.last() {
            vertices.push(vertices[0]);
        }

        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut travelled = 0.0;
        cumulative.push(travelled);
        for pair in vertices.windows(2) {
            travelled += pair[0].distance_to(&pair[1]);
            cumulative.push(travelled);
        }

        if travelled <= 0.0 {
            return Err(LoadError::DegenerateTrack);
        }
        Ok(Self {
            vertices,
            cumulative,
        })
    }

    pub fn start_point(&self) -> Point {
        self.vertices[0]
    }
}

impl TrackGeometry for PolylineTrack {
    fn length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    fn point_at(&self, offset: f64) -> Point {
        let offset = offset.clamp(0.0, self.length());
        let last_segment = self.vertices.len() - 2;
        let segment = self
            .cumulative
            .partition_point(|&c| c <= offset)
            .saturating_sub(1)
            .min(last_segment);

        let span = self.cumulative[segment + 1] - self.cumulative[segment];
        if span <= 0.0 {
            return self.vertices[segment];
        }
        let t = (offset - self.cumulative[segment]) / span;
        self.vertices[segment].lerp(&self.vertices[segment + 1], t)
    }
}

/// Track file contents: a set of path primitives, of which exactly one must exist.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackDefinition {
    #[serde(default)]
    pub paths: Vec<TrackPath>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackPath {
    pub points: Vec<[f64; 2]>,
}

impl TrackDefinition {
    pub fn single(points: Vec<[f64; 2]>) -> Self {
        Self {
            paths: vec![TrackPath { points }],
        }
    }

    pub fn into_geometry(self) -> Result<PolylineTrack, LoadError> {
        let mut paths = self.paths;
        if paths.len() != 1 {
            return Err(LoadError::PathCount(paths.len()));
        }
        let path = paths.remove(0);
        PolylineTrack::new(
            path.points
                .into_iter()
                .map(|[x, y]| Point::new(x, y))
                .collect(),
        )
    }
}
