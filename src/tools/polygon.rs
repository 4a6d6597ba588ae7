//! Closed polygon tool.

use crate::constants::MIN_POLYGON_VERTICES;
use crate::model::{Geometry, GeometryKind, ImageSize, Point, point_in_polygon};
use crate::render::{Frame, Style};

use super::{AnnotationTool, Draft, DraftStep, GeometryError, GeometryTool, Handle, vertex_chain};

/// Polygons: placed click by click, closed near the first vertex or with Enter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonTool;

impl PolygonTool {
    fn points(geometry: &Geometry) -> Option<&[Point]> {
        match geometry {
            Geometry::Polygon { points } => Some(points),
            _ => None,
        }
    }
}

impl GeometryTool for PolygonTool {
    fn tool(&self) -> AnnotationTool {
        AnnotationTool::Polygon
    }

    fn kind(&self) -> GeometryKind {
        GeometryKind::Polygon
    }

    fn render(&self, geometry: &Geometry, frame: &mut Frame<'_>, style: &Style) {
        if let Some(points) = Self::points(geometry) {
            frame.path(points, true, style);
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

    fn hit_test(&self, geometry: &Geometry, point: Point, _tolerance: f32) -> bool {
        Self::points(geometry).is_some_and(|points| point_in_polygon(point, points))
    }

    fn handle_at(&self, geometry: &Geometry, point: Point, radius: f32) -> Option<Handle> {
        vertex_chain::handle_at(Self::points(geometry)?, point, radius, true)
    }

    fn drag_handle(
        &self,
        original: &Geometry,
        handle: &Handle,
        delta: Point,
        bounds: ImageSize,
    ) -> Geometry {
        match Self::points(original) {
            Some(points) => Geometry::Polygon {
                points: vertex_chain::drag(points, handle, delta, bounds),
            },
            None => original.clone(),
        }
    }

    fn add_point(&self, draft: &mut Draft, point: Point, close_radius: f32) -> DraftStep {
        let closes = draft.points.len() >= MIN_POLYGON_VERTICES
            && draft
                .points
                .first()
                .is_some_and(|first| first.distance_to(point) <= close_radius);
        if closes {
            return match self.finish(draft) {
                Ok(geometry) => DraftStep::Complete(geometry),
                Err(e) => DraftStep::Rejected(e),
            };
        }
        draft.points.push(point);
        DraftStep::Continue
    }

    fn finish(&self, draft: &Draft) -> Result<Geometry, GeometryError> {
        let geometry = Geometry::Polygon {
            points: draft.points.clone(),
        };
        self.validate(&geometry)?;
        Ok(geometry)
    }

    fn validate(&self, geometry: &Geometry) -> Result<(), GeometryError> {
        let points = Self::points(geometry).ok_or_else(|| {
            GeometryError::wrong_kind(GeometryKind::Polygon.name(), geometry.kind().name())
        })?;
        vertex_chain::validate(points, MIN_POLYGON_VERTICES, GeometryKind::Polygon.name())
    }

    fn default_geometry(&self, size: ImageSize) -> Geometry {
        let (w, h) = (size.width, size.height);
        Geometry::Polygon {
            points: vec![
                Point::new(w * 0.5, h * 0.25),
                Point::new(w * 0.75, h * 0.75),
                Point::new(w * 0.25, h * 0.75),
            ],
        }
    }

    fn min_vertices(&self) -> usize {
        MIN_POLYGON_VERTICES
    }

    fn insert_vertex(&self, geometry: &mut Geometry, index: usize, at: Point) -> bool {
        match geometry {
            Geometry::Polygon { points } => vertex_chain::insert(points, index, at),
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
            MIN_POLYGON_VERTICES,
            GeometryKind::Polygon.name(),
        )?;
        Ok(Geometry::Polygon { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Geometry {
        Geometry::Polygon {
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(30.0, 0.0),
                Point::new(15.0, 30.0),
            ],
        }
    }

    #[test]
    fn test_close_near_first_vertex() {
        let mut draft = Draft::new(AnnotationTool::Polygon, Point::new(10.0, 10.0));
        assert_eq!(PolygonTool.add_point(&mut draft, Point::new(50.0, 10.0), 5.0), DraftStep::Continue);
        // Only two vertices: a click on the first vertex is just another vertex
        assert_eq!(PolygonTool.add_point(&mut draft, Point::new(11.0, 11.0), 5.0), DraftStep::Continue);
        assert_eq!(draft.points.len(), 3);

        let mut draft = Draft::new(AnnotationTool::Polygon, Point::new(10.0, 10.0));
        PolygonTool.add_point(&mut draft, Point::new(50.0, 10.0), 5.0);
        PolygonTool.add_point(&mut draft, Point::new(30.0, 40.0), 5.0);
        match PolygonTool.add_point(&mut draft, Point::new(12.0, 9.0), 5.0) {
            DraftStep::Complete(Geometry::Polygon { points }) => assert_eq!(points.len(), 3),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_vertex_floor() {
        let err = PolygonTool.remove_vertex(&triangle(), 0).unwrap_err();
        assert_eq!(
            err,
            GeometryError::TooFewVertices {
                kind: "Polygon",
                min: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_interior_hit() {
        assert!(PolygonTool.hit_test(&triangle(), Point::new(15.0, 10.0), 0.0));
        assert!(!PolygonTool.hit_test(&triangle(), Point::new(100.0, 100.0), 0.0));
    }

    #[test]
    fn test_insert_on_edge() {
        let mut g = triangle();
        let Some(Handle::Edge { index, at }) = PolygonTool.handle_at(&g, Point::new(15.0, 1.0), 3.0)
        else {
            panic!("expected edge hit");
        };
        assert!(PolygonTool.insert_vertex(&mut g, index, at));
        assert_eq!(g.vertices().unwrap()[1], Point::new(15.0, 0.0));
    }

    #[test]
    fn test_finish_requires_three() {
        let mut draft = Draft::new(AnnotationTool::Polygon, Point::new(0.0, 0.0));
        PolygonTool.add_point(&mut draft, Point::new(10.0, 0.0), 1.0);
        assert!(matches!(
            PolygonTool.finish(&draft),
            Err(GeometryError::TooFewVertices { actual: 2, .. })
        ));
    }
}
