//! Geometry primitives and the computational-geometry helpers the tools share.
//!
//! Everything here works in image space unless a parameter says otherwise.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use crate::constants::{COLLINEAR_EPSILON, COORDINATE_DECIMALS};

// ============================================================================
// Core Geometry Types
// ============================================================================

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Offset this point by a delta.
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Pixel dimensions of the image being annotated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: f32,
    pub height: f32,
}

impl ImageSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Check whether a point lies within `[0,width]×[0,height]`.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }

    /// Clamp a point into the image rectangle.
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0.0, self.width.max(0.0)),
            point.y.clamp(0.0, self.height.max(0.0)),
        )
    }
}

/// Axis-aligned rectangle in either space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a normalized rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            width: (p1.x - p2.x).abs(),
            height: (p1.y - p2.y).abs(),
        }
    }

    /// Axis-aligned range test, edges inclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

// ============================================================================
// Algorithms
// ============================================================================

/// Even-odd ray casting over every edge of a closed ring.
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = vertices[i];
        let vj = vertices[j];
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Project `point` onto segment `a..b`, clamping to the segment.
///
/// Returns the projected point and the clamped parameter `t` in `[0, 1]`.
pub fn project_onto_segment(point: Point, a: Point, b: Point) -> (Point, f32) {
    let ab = b - a;
    let ap = point - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f32::EPSILON {
        return (a, 0.0);
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    (Point::new(a.x + ab.x * t, a.y + ab.y * t), t)
}

/// Perpendicular distance from `point` to segment `a..b` (projection clamped).
pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f32 {
    let (projected, _) = project_onto_segment(point, a, b);
    point.distance_to(projected)
}

/// The edge of a vertex chain closest to a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHit {
    /// Index of the edge's first vertex; a new vertex goes in at `index + 1`.
    pub index: usize,
    /// Projection of the query point on that edge.
    pub projected: Point,
    pub distance: f32,
}

/// Find the nearest edge of an open chain, or of a closed ring when `closed`.
pub fn nearest_edge(point: Point, vertices: &[Point], closed: bool) -> Option<EdgeHit> {
    if vertices.len() < 2 {
        return None;
    }
    let edge_count = if closed {
        vertices.len()
    } else {
        vertices.len() - 1
    };

    (0..edge_count)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % vertices.len()];
            let (projected, _) = project_onto_segment(point, a, b);
            EdgeHit {
                index: i,
                projected,
                distance: point.distance_to(projected),
            }
        })
        .min_by(|l, r| l.distance.total_cmp(&r.distance))
}

/// Minimum distance from a point to any segment of an open chain.
pub fn distance_to_chain(point: Point, vertices: &[Point]) -> Option<f32> {
    nearest_edge(point, vertices, false).map(|hit| hit.distance)
}

/// Index of the vertex within `radius` of `point`, nearest first.
pub fn nearest_vertex(point: Point, vertices: &[Point], radius: f32) -> Option<usize> {
    vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (i, v.distance_to(point)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|l, r| l.1.total_cmp(&r.1))
        .map(|(i, _)| i)
}

/// A perpendicular bisector, kept separate for the vertical case.
#[derive(Debug, Clone, Copy)]
enum Bisector {
    /// `x = c`
    Vertical(f64),
    /// `y = slope * (x - mx) + my`
    Sloped { slope: f64, mx: f64, my: f64 },
}

fn perpendicular_bisector(a: Point, b: Point) -> Option<Bisector> {
    let (ax, ay, bx, by) = (a.x as f64, a.y as f64, b.x as f64, b.y as f64);
    let mx = (ax + bx) / 2.0;
    let my = (ay + by) / 2.0;
    let dx = bx - ax;
    let dy = by - ay;

    if dx == 0.0 && dy == 0.0 {
        // Coincident points define no chord
        return None;
    }
    if dy == 0.0 {
        return Some(Bisector::Vertical(mx));
    }
    Some(Bisector::Sloped {
        slope: -dx / dy,
        mx,
        my,
    })
}

/// Circumcircle through three points: the intersection of the perpendicular
/// bisectors of `(p1,p2)` and `(p2,p3)`.
///
/// Returns `None` for near-collinear or degenerate input.
pub fn circle_from_three_points(p1: Point, p2: Point, p3: Point) -> Option<(Point, f32)> {
    let b1 = perpendicular_bisector(p1, p2)?;
    let b2 = perpendicular_bisector(p2, p3)?;
    let epsilon = COLLINEAR_EPSILON as f64;

    let (cx, cy) = match (b1, b2) {
        (Bisector::Vertical(_), Bisector::Vertical(_)) => return None,
        (Bisector::Vertical(x), Bisector::Sloped { slope, mx, my })
        | (Bisector::Sloped { slope, mx, my }, Bisector::Vertical(x)) => {
            (x, slope * (x - mx) + my)
        }
        (
            Bisector::Sloped {
                slope: k1,
                mx: mx1,
                my: my1,
            },
            Bisector::Sloped {
                slope: k2,
                mx: mx2,
                my: my2,
            },
        ) => {
            if (k1 - k2).abs() < epsilon {
                return None;
            }
            let x = (k1 * mx1 - k2 * mx2 + my2 - my1) / (k1 - k2);
            (x, k1 * (x - mx1) + my1)
        }
    };

    let center = Point::new(cx as f32, cy as f32);
    let radius = center.distance_to(p1);
    if !center.is_finite() || !radius.is_finite() {
        return None;
    }
    Some((center, radius))
}

/// Round a coordinate to the persisted precision.
pub fn round_coord(value: f32) -> f32 {
    let factor = 10f32.powi(COORDINATE_DECIMALS);
    (value * factor).round() / factor
}

// ============================================================================
// Tests
// ============================================================================
