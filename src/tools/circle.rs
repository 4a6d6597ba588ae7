//! Circle tools: center-and-rim (2 clicks) or three rim points (3 clicks).

use crate::constants::MIN_CIRCLE_RADIUS;
use crate::model::{Geometry, GeometryKind, ImageSize, Point, circle_from_three_points};
use crate::render::{Frame, Style};

use super::{AnnotationTool, Cardinal, Draft, DraftStep, GeometryError, GeometryTool, Handle};

/// How the circle is placed during creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircleMode {
    /// First click is the center, second fixes the radius
    TwoPoint,
    /// Three clicks on the circumference
    ThreePoint,
}

impl CircleMode {
    fn clicks(&self) -> usize {
        match self {
            CircleMode::TwoPoint => 2,
            CircleMode::ThreePoint => 3,
        }
    }
}

/// Circles. Both modes edit the same way once committed.
#[derive(Debug, Clone, Copy)]
pub struct CircleTool {
    mode: CircleMode,
}

impl CircleTool {
    pub fn new(mode: CircleMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CircleMode {
        self.mode
    }

    fn parts(geometry: &Geometry) -> Option<(Point, f32)> {
        match geometry {
            Geometry::Circle { center, radius } => Some((*center, *radius)),
            _ => None,
        }
    }

    /// Circle defined by a full set of clicks, before the radius floor.
    fn solve(&self, points: &[Point]) -> Result<(Point, f32), GeometryError> {
        match (self.mode, points) {
            (CircleMode::TwoPoint, [center, rim, ..]) => Ok((*center, center.distance_to(*rim))),
            (CircleMode::ThreePoint, [p1, p2, p3, ..]) => {
                circle_from_three_points(*p1, *p2, *p3).ok_or(GeometryError::Collinear)
            }
            _ => Err(GeometryError::TooFewVertices {
                kind: GeometryKind::Circle.name(),
                min: self.mode.clicks(),
                actual: points.len(),
            }),
        }
    }
}

impl GeometryTool for CircleTool {
    fn tool(&self) -> AnnotationTool {
        match self.mode {
            CircleMode::TwoPoint => AnnotationTool::Circle2Pt,
            CircleMode::ThreePoint => AnnotationTool::Circle3Pt,
        }
    }

    fn kind(&self) -> GeometryKind {
        GeometryKind::Circle
    }

    fn render(&self, geometry: &Geometry, frame: &mut Frame<'_>, style: &Style) {
        if let Some((center, radius)) = Self::parts(geometry) {
            frame.circle(center, radius, style);
        }
    }

    fn render_preview(&self, draft: &Draft, cursor: Option<Point>, frame: &mut Frame<'_>, style: &Style) {
        let mut points = draft.points.clone();
        points.extend(cursor);
        if points.len() >= self.mode.clicks()
            && let Ok((center, radius)) = self.solve(&points)
        {
            frame.circle(center, radius, style);
        }
        for p in &draft.points {
            frame.dot(*p, style.stroke);
        }
    }

    fn handles(&self, geometry: &Geometry) -> Vec<(Handle, Point)> {
        let Some((center, radius)) = Self::parts(geometry) else {
            return Vec::new();
        };
        let mut handles: Vec<(Handle, Point)> = Cardinal::all()
            .iter()
            .map(|c| {
                let axis = c.axis();
                (
                    Handle::Radius(*c),
                    center.offset(axis.x * radius, axis.y * radius),
                )
            })
            .collect();
        handles.push((Handle::Center, center));
        handles
    }

    fn hit_test(&self, geometry: &Geometry, point: Point, _tolerance: f32) -> bool {
        Self::parts(geometry).is_some_and(|(center, radius)| center.distance_to(point) <= radius)
    }

    fn drag_handle(
        &self,
        original: &Geometry,
        handle: &Handle,
        delta: Point,
        bounds: ImageSize,
    ) -> Geometry {
        let Some((center, radius)) = Self::parts(original) else {
            return original.clone();
        };
        match handle {
            Handle::Radius(cardinal) => {
                let axis = cardinal.axis();
                let along = delta.x * axis.x + delta.y * axis.y;
                Geometry::Circle {
                    center,
                    radius: (radius + along).max(MIN_CIRCLE_RADIUS),
                }
            }
            Handle::Center | Handle::Body => Geometry::Circle {
                center: bounds.clamp(center + delta),
                radius,
            },
            _ => original.clone(),
        }
    }

    fn add_point(&self, draft: &mut Draft, point: Point, _close_radius: f32) -> DraftStep {
        draft.points.push(point);
        if draft.points.len() < self.mode.clicks() {
            return DraftStep::Continue;
        }
        match self.finish(draft) {
            Ok(geometry) => DraftStep::Complete(geometry),
            Err(e) => DraftStep::Rejected(e),
        }
    }

    fn finish(&self, draft: &Draft) -> Result<Geometry, GeometryError> {
        let (center, radius) = self.solve(&draft.points)?;
        if !center.is_finite() || !radius.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        if radius <= 0.0 {
            return Err(GeometryError::NonPositiveRadius(radius));
        }
        let geometry = Geometry::Circle {
            center,
            radius: radius.max(MIN_CIRCLE_RADIUS),
        };
        self.validate(&geometry)?;
        Ok(geometry)
    }

    fn validate(&self, geometry: &Geometry) -> Result<(), GeometryError> {
        let (center, radius) = Self::parts(geometry).ok_or_else(|| {
            GeometryError::wrong_kind(GeometryKind::Circle.name(), geometry.kind().name())
        })?;
        if !center.is_finite() || !radius.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        if radius <= 0.0 {
            return Err(GeometryError::NonPositiveRadius(radius));
        }
        Ok(())
    }

    fn default_geometry(&self, size: ImageSize) -> Geometry {
        Geometry::Circle {
            center: Point::new(size.width / 2.0, size.height / 2.0),
            radius: (size.width.min(size.height) / 4.0).max(MIN_CIRCLE_RADIUS),
        }
    }
}
