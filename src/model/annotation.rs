//! Annotation data model.
//!
//! An [`Annotation`] pairs a tagged [`Geometry`] with class, attributes and the
//! sync metadata (server id, version, timestamps, author) that the
//! persistence layer needs for optimistic concurrency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::geometry::{ImageSize, Point, Rect, round_coord};
use crate::constants::{COORDINATE_DECIMALS, MIN_CIRCLE_RADIUS};

/// Engine-local identifier for an annotation, stable across sync.
pub type AnnotationId = u64;

/// Identifier assigned by the remote store.
pub type RemoteId = String;

/// Project identifier in the remote store.
pub type ProjectId = String;

/// Image identifier in the remote store.
pub type ImageId = String;

/// Kind of geometry, used as the registry discriminant for committed shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Bbox,
    Polygon,
    Polyline,
    Circle,
    Classification,
    NoObject,
}

impl GeometryKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Bbox => "Bounding Box",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::Polyline => "Polyline",
            GeometryKind::Circle => "Circle",
            GeometryKind::Classification => "Classification",
            GeometryKind::NoObject => "No Object",
        }
    }

    /// Whole-image kinds carry no coordinates and are per-image singletons.
    pub fn is_whole_image(&self) -> bool {
        matches!(self, GeometryKind::Classification | GeometryKind::NoObject)
    }
}

/// Shape payload of an annotation, in image coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// Axis-aligned box by top-left corner and size.
    Bbox {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Closed ring of vertices.
    Polygon { points: Vec<Point> },
    /// Open chain of vertices.
    Polyline { points: Vec<Point> },
    Circle { center: Point, radius: f32 },
    /// Whole-image label.
    Classification,
    /// Explicit "nothing to annotate here" marker.
    NoObject,
}

/// Result of clipping a geometry to the image.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipped {
    pub geometry: Geometry,
    /// Whether any coordinate had to be moved to fit the image.
    pub clipped: bool,
}

impl Geometry {
    pub fn bbox(rect: Rect) -> Self {
        Geometry::Bbox {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Bbox { .. } => GeometryKind::Bbox,
            Geometry::Polygon { .. } => GeometryKind::Polygon,
            Geometry::Polyline { .. } => GeometryKind::Polyline,
            Geometry::Circle { .. } => GeometryKind::Circle,
            Geometry::Classification => GeometryKind::Classification,
            Geometry::NoObject => GeometryKind::NoObject,
        }
    }

    /// Box geometry as a [`Rect`].
    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            Geometry::Bbox {
                x,
                y,
                width,
                height,
            } => Some(Rect::new(*x, *y, *width, *height)),
            _ => None,
        }
    }

    /// Vertices of a polygon or polyline.
    pub fn vertices(&self) -> Option<&[Point]> {
        match self {
            Geometry::Polygon { points } | Geometry::Polyline { points } => Some(points),
            _ => None,
        }
    }

    pub fn vertices_mut(&mut self) -> Option<&mut Vec<Point>> {
        match self {
            Geometry::Polygon { points } | Geometry::Polyline { points } => Some(points),
            _ => None,
        }
    }

    /// Bounding rectangle; `None` for whole-image kinds.
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Geometry::Bbox { .. } => self.as_rect(),
            Geometry::Polygon { points } | Geometry::Polyline { points } => {
                let first = points.first()?;
                let (mut min, mut max) = (*first, *first);
                for p in points {
                    min = Point::new(min.x.min(p.x), min.y.min(p.y));
                    max = Point::new(max.x.max(p.x), max.y.max(p.y));
                }
                Some(Rect::from_corners(min, max))
            }
            Geometry::Circle { center, radius } => Some(Rect::new(
                center.x - radius,
                center.y - radius,
                radius * 2.0,
                radius * 2.0,
            )),
            Geometry::Classification | Geometry::NoObject => None,
        }
    }

    /// Translate every coordinate by a delta.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Geometry::Bbox { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Geometry::Polygon { points } | Geometry::Polyline { points } => {
                for p in points.iter_mut() {
                    *p = p.offset(dx, dy);
                }
            }
            Geometry::Circle { center, .. } => *center = center.offset(dx, dy),
            Geometry::Classification | Geometry::NoObject => {}
        }
    }

    /// Clip to `[0,width]×[0,height]` and round to the persisted precision.
    ///
    /// Boxes are clipped as rectangles and vertex chains per point. A circle's
    /// center is kept at least the minimum radius from every edge and its
    /// radius shrinks to fit, never below that minimum.
    pub fn clip_and_round(&self, size: ImageSize) -> Clipped {
        let mut clipped = false;
        let mut clamp = |p: Point| {
            let c = size.clamp(p);
            if c != p {
                clipped = true;
            }
            Point::new(round_coord(c.x), round_coord(c.y))
        };

        let geometry = match self {
            Geometry::Bbox {
                x,
                y,
                width,
                height,
            } => {
                let min = clamp(Point::new(*x, *y));
                let max = clamp(Point::new(x + width, y + height));
                Geometry::Bbox {
                    x: min.x,
                    y: min.y,
                    width: round_coord((max.x - min.x).max(0.0)),
                    height: round_coord((max.y - min.y).max(0.0)),
                }
            }
            Geometry::Polygon { points } => Geometry::Polygon {
                points: points.iter().map(|p| clamp(*p)).collect(),
            },
            Geometry::Polyline { points } => Geometry::Polyline {
                points: points.iter().map(|p| clamp(*p)).collect(),
            },
            Geometry::Circle { center, radius } => {
                let (circle, changed) = fit_circle(*center, *radius, size);
                clipped |= changed;
                circle
            }
            Geometry::Classification => Geometry::Classification,
            Geometry::NoObject => Geometry::NoObject,
        };

        Clipped { geometry, clipped }
    }
}

/// Clip a circle into the image. The radius is rounded down when rounding
/// to nearest would push it past an edge.
fn fit_circle(center: Point, radius: f32, size: ImageSize) -> (Geometry, bool) {
    let floor = MIN_CIRCLE_RADIUS.min(size.width / 2.0).min(size.height / 2.0);
    let c = Point::new(
        round_coord(center.x.clamp(floor, size.width - floor)),
        round_coord(center.y.clamp(floor, size.height - floor)),
    );
    let room = c.x.min(size.width - c.x).min(c.y).min(size.height - c.y);
    let fitted = radius.min(room);
    let mut r = round_coord(fitted);
    if r > room {
        let factor = 10f32.powi(COORDINATE_DECIMALS);
        r = (fitted * factor).floor() / factor;
    }
    let r = r.max(floor);
    let changed = fitted < radius || c != Point::new(round_coord(center.x), round_coord(center.y));
    (Geometry::Circle { center: c, radius: r }, changed)
}

/// A single annotation on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Engine-local identifier.
    #[serde(skip)]
    pub id: AnnotationId,
    /// Identifier in the remote store, once created there.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    pub project_id: ProjectId,
    pub image_id: ImageId,
    pub geometry: Geometry,
    #[serde(default)]
    pub class_id: Option<u32>,
    #[serde(default)]
    pub class_name: Option<String>,
    /// Free-form attributes.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Last version acknowledged by the server; 0 until created.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<String>,
}

impl Annotation {
    /// Create a new, not yet persisted annotation.
    pub fn new(
        id: AnnotationId,
        project_id: impl Into<ProjectId>,
        image_id: impl Into<ImageId>,
        geometry: Geometry,
    ) -> Self {
        Self {
            id,
            remote_id: None,
            project_id: project_id.into(),
            image_id: image_id.into(),
            geometry,
            class_id: None,
            class_name: None,
            attributes: HashMap::new(),
            confidence: None,
            version: 0,
            created_at: None,
            updated_at: None,
            author: None,
        }
    }

    /// Assign a class.
    pub fn with_class(mut self, class_id: u32, class_name: impl Into<String>) -> Self {
        self.class_id = Some(class_id);
        self.class_name = Some(class_name.into());
        self
    }

    /// Add an attribute to the annotation.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }

    /// Whether the server has acknowledged this annotation.
    pub fn is_persisted(&self) -> bool {
        self.remote_id.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_clip_on_save() {
        let bbox = Geometry::Bbox {
            x: -5.0,
            y: -5.0,
            width: 20.0,
            height: 20.0,
        };
        let result = bbox.clip_and_round(ImageSize::new(10.0, 10.0));
        assert!(result.clipped);
        let rect = result.geometry.as_rect().unwrap();
        assert!(rect.x >= 0.0 && rect.y >= 0.0);
        assert!(rect.width >= 0.0 && rect.height >= 0.0);
        assert!(rect.right() <= 10.0 && rect.bottom() <= 10.0);
        assert_eq!(rect, Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_clip_inside_is_not_flagged_but_rounds() {
        let poly = Geometry::Polygon {
            points: vec![
                Point::new(1.234, 2.0),
                Point::new(5.0, 5.0),
                Point::new(2.0, 8.999),
            ],
        };
        let result = poly.clip_and_round(ImageSize::new(10.0, 10.0));
        assert!(!result.clipped);
        let pts = result.geometry.vertices().unwrap();
        assert_eq!(pts[0], Point::new(1.23, 2.0));
        assert_eq!(pts[2], Point::new(2.0, 9.0));
    }

    #[test]
    fn test_polyline_clipped_per_point() {
        let line = Geometry::Polyline {
            points: vec![Point::new(-3.0, 4.0), Point::new(12.0, 20.0)],
        };
        let result = line.clip_and_round(ImageSize::new(10.0, 10.0));
        assert!(result.clipped);
        assert_eq!(
            result.geometry.vertices().unwrap(),
            &[Point::new(0.0, 4.0), Point::new(10.0, 10.0)]
        );
    }

    #[test]
    fn test_circle_shrinks_to_fit_image() {
        let circle = Geometry::Circle {
            center: Point::new(8.0, 5.0),
            radius: 4.0,
        };
        let result = circle.clip_and_round(ImageSize::new(10.0, 10.0));
        assert!(result.clipped);
        assert_eq!(
            result.geometry,
            Geometry::Circle {
                center: Point::new(8.0, 5.0),
                radius: 2.0,
            }
        );
    }

    #[test]
    fn test_circle_keeps_minimum_radius_at_edge() {
        let circle = Geometry::Circle {
            center: Point::new(0.0, 5.0),
            radius: 1.004,
        };
        let result = circle.clip_and_round(ImageSize::new(10.0, 10.0));
        assert!(result.clipped);
        assert_eq!(
            result.geometry,
            Geometry::Circle {
                center: Point::new(MIN_CIRCLE_RADIUS, 5.0),
                radius: MIN_CIRCLE_RADIUS,
            }
        );
    }

    #[test]
    fn test_circle_inside_is_untouched() {
        let circle = Geometry::Circle {
            center: Point::new(5.0, 5.0),
            radius: 2.5,
        };
        let result = circle.clip_and_round(ImageSize::new(10.0, 10.0));
        assert!(!result.clipped);
        assert_eq!(result.geometry, circle);
    }

    #[test]
    fn test_geometry_tagged_json() {
        let circle = Geometry::Circle {
            center: Point::new(3.0, 4.0),
            radius: 2.5,
        };
        let json = serde_json::to_string(&circle).unwrap();
        assert!(json.contains("\"type\":\"circle\""));

        let none: Geometry = serde_json::from_str(r#"{"type":"no_object"}"#).unwrap();
        assert_eq!(none, Geometry::NoObject);
    }

    #[test]
    fn test_translate_and_bounds() {
        let mut g = Geometry::Polyline {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0)],
        };
        g.translate(2.0, 3.0);
        assert_eq!(g.bounds(), Some(Rect::new(2.0, 3.0, 10.0, 5.0)));
        assert_eq!(Geometry::Classification.bounds(), None);
    }
}
