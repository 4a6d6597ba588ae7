//! Open polyline tool.

use crate::constants::MIN_POLYLINE_VERTICES;
use crate::model::{Geometry, GeometryKind, ImageSize, Point, distance_to_chain};
use crate::render::{Frame, Style};

use super::{AnnotationTool, Draft, DraftStep, GeometryError, GeometryTool, Handle, vertex_chain};

/// Polylines: placed click by click and finished with Enter. Never closes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolylineTool;

impl PolylineTool {
    fn points(geometry: &Geometry) -> Option<&[Point]> {
        match geometry {
            Geometry::Polyline { points } => Some(points),
            _ => None,
        }
    }
}

impl GeometryTool for PolylineTool {
    fn tool(&self) -> AnnotationTool {
        AnnotationTool::Polyline
    }

    fn kind(&self) -> GeometryKind {
        GeometryKind::Polyline
    }

    fn render(&self, geometry: &Geometry, frame: &mut Frame<'_>, style: &Style) {
        if let Some(points) = Self::points(geometry) {
            frame.path(points, false, style);
        }
    }

    fn render_preview(&self, draft: &Draft, cursor: Option<Point>, frame: &mut Frame<'_>, style: &Style) {
        vertex_chain::render_preview(&draft.points, cursor, frame, style);
    }

    fn handles(&self, geometry: &Geometry) -> Vec<(Handle, Point)> {
        Self::points(geometry)
            .map(vertex_chain::handles)
            .unwrap_or_default()
    }

    /// "Near" means within `tolerance` of any segment.
    fn hit_test(&self, geometry: &Geometry, point: Point, tolerance: f32) -> bool {
        Self::points(geometry)
            .and_then(|points| distance_to_chain(point, points))
            .is_some_and(|d| d <= tolerance)
    }

    fn handle_at(&self, geometry: &Geometry, point: Point, radius: f32) -> Option<Handle> {
        vertex_chain::handle_at(Self::points(geometry)?, point, radius, false)
    }

    fn drag_handle(
        &self,
        original: &Geometry,
        handle: &Handle,
        delta: Point,
        bounds: ImageSize,
    ) -> Geometry {
        match Self::points(original) {
            Some(points) => Geometry::Polyline {
                points: vertex_chain::drag(points, handle, delta, bounds),
            },
            None => original.clone(),
        }
    }

    fn add_point(&self, draft: &mut Draft, point: Point, _close_radius: f32) -> DraftStep {
        draft.points.push(point);
        DraftStep::Continue
    }

    fn finish(&self, draft: &Draft) -> Result<Geometry, GeometryError> {
        let geometry = Geometry::Polyline {
            points: draft.points.clone(),
        };
        self.validate(&geometry)?;
        Ok(geometry)
    }

    fn validate(&self, geometry: &Geometry) -> Result<(), GeometryError> {
        let points = Self::points(geometry).ok_or_else(|| {
            GeometryError::wrong_kind(GeometryKind::Polyline.name(), geometry.kind().name())
        })?;
        vertex_chain::validate(points, MIN_POLYLINE_VERTICES, GeometryKind::Polyline.name())
    }

    fn default_geometry(&self, size: ImageSize) -> Geometry {
        Geometry::Polyline {
            points: vec![
                Point::new(size.width * 0.25, size.height * 0.5),
                Point::new(size.width * 0.75, size.height * 0.5),
            ],
        }
    }

    fn min_vertices(&self) -> usize {
        MIN_POLYLINE_VERTICES
    }

    fn insert_vertex(&self, geometry: &mut Geometry, index: usize, at: Point) -> bool {
        match geometry {
            Geometry::Polyline { points } => vertex_chain::insert(points, index, at),
            _ => false,
        }
    }

    fn remove_vertex(&self, geometry: &Geometry, index: usize) -> Result<Geometry, GeometryError> {
        let points = Self::points(geometry).ok_or(GeometryError::NoVertices {
            kind: geometry.kind().name(),
        })?;
        let points = vertex_chain::remove(
            points,
            index,
            MIN_POLYLINE_VERTICES,
            GeometryKind::Polyline.name(),
        )?;
        Ok(Geometry::Polyline { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Geometry {
        Geometry::Polyline {
            points: vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0)],
        }
    }

    #[test]
    fn test_near_test_uses_segment_distance() {
        assert!(PolylineTool.hit_test(&line(), Point::new(10.0, 2.0), 3.0));
        // Beyond the end, the projection clamps to the endpoint
        assert!(!PolylineTool.hit_test(&line(), Point::new(25.0, 0.0), 3.0));
    }

    #[test]
    fn test_remove_vertex_floor() {
        assert!(matches!(
            PolylineTool.remove_vertex(&line(), 1),
            Err(GeometryError::TooFewVertices { min: 2, .. })
        ));
    }

    #[test]
    fn test_never_closes() {
        let mut draft = Draft::new(AnnotationTool::Polyline, Point::new(0.0, 0.0));
        PolylineTool.add_point(&mut draft, Point::new(10.0, 0.0), 15.0);
        PolylineTool.add_point(&mut draft, Point::new(10.0, 10.0), 15.0);
        assert_eq!(
            PolylineTool.add_point(&mut draft, Point::new(1.0, 1.0), 15.0),
            DraftStep::Continue
        );
        assert_eq!(PolylineTool.finish(&draft).unwrap().vertices().unwrap().len(), 4);
    }
}
