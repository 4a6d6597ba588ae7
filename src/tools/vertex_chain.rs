//! Vertex-list mechanics shared by the polygon and polyline tools.

use crate::model::{ImageSize, Point, nearest_edge, nearest_vertex};
use crate::render::{Frame, Style};

use super::{GeometryError, Handle};

pub(super) fn handles(points: &[Point]) -> Vec<(Handle, Point)> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (Handle::Vertex(i), *p))
        .collect()
}

/// Vertex within `radius` wins; otherwise the nearest edge within `radius`
/// yields an insertion point.
pub(super) fn handle_at(points: &[Point], point: Point, radius: f32, closed: bool) -> Option<Handle> {
    if let Some(index) = nearest_vertex(point, points, radius) {
        return Some(Handle::Vertex(index));
    }
    nearest_edge(point, points, closed)
        .filter(|hit| hit.distance <= radius)
        .map(|hit| Handle::Edge {
            index: hit.index,
            at: hit.projected,
        })
}

/// Vertex drag moves one point; body drag moves all. Each point is clipped on its own.
pub(super) fn drag(original: &[Point], handle: &Handle, delta: Point, bounds: ImageSize) -> Vec<Point> {
    let mut points = original.to_vec();
    match handle {
        Handle::Vertex(i) => {
            if let Some(p) = points.get_mut(*i) {
                *p = bounds.clamp(*p + delta);
            }
        }
        Handle::Body => {
            for p in points.iter_mut() {
                *p = bounds.clamp(*p + delta);
            }
        }
        _ => {}
    }
    points
}

pub(super) fn insert(points: &mut Vec<Point>, index: usize, at: Point) -> bool {
    if index >= points.len() {
        return false;
    }
    points.insert(index + 1, at);
    true
}

pub(super) fn remove(
    points: &[Point],
    index: usize,
    min: usize,
    kind: &'static str,
) -> Result<Vec<Point>, GeometryError> {
    if points.len() <= min {
        return Err(GeometryError::TooFewVertices {
            kind,
            min,
            actual: points.len().saturating_sub(1),
        });
    }
    let mut points = points.to_vec();
    if index < points.len() {
        points.remove(index);
    }
    Ok(points)
}

pub(super) fn validate(points: &[Point], min: usize, kind: &'static str) -> Result<(), GeometryError> {
    if points.len() < min {
        return Err(GeometryError::TooFewVertices {
            kind,
            min,
            actual: points.len(),
        });
    }
    if !points.iter().all(Point::is_finite) {
        return Err(GeometryError::NonFinite);
    }
    Ok(())
}

/// Placed vertices plus a rubber band to the cursor.
pub(super) fn render_preview(points: &[Point], cursor: Option<Point>, frame: &mut Frame<'_>, style: &Style) {
    let mut chain = points.to_vec();
    chain.extend(cursor);
    frame.path(&chain, false, style);
    for p in points {
        frame.dot(*p, style.stroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_vertex_beats_edge() {
        assert_eq!(
            handle_at(&square(), Point::new(9.0, 1.0), 2.0, true),
            Some(Handle::Vertex(1))
        );
    }

    #[test]
    fn test_edge_insertion_point_is_projection() {
        let hit = handle_at(&square(), Point::new(5.0, 1.0), 2.0, true);
        assert_eq!(
            hit,
            Some(Handle::Edge {
                index: 0,
                at: Point::new(5.0, 0.0)
            })
        );
        // Closing edge only exists for rings
        assert_eq!(
            handle_at(&square(), Point::new(1.0, 5.0), 2.0, true),
            Some(Handle::Edge {
                index: 3,
                at: Point::new(0.0, 5.0)
            })
        );
        assert_eq!(handle_at(&square(), Point::new(1.0, 5.0), 2.0, false), None);
    }

    #[test]
    fn test_drag_clips_per_point() {
        let moved = drag(&square(), &Handle::Body, Point::new(-5.0, 0.0), ImageSize::new(20.0, 20.0));
        assert_eq!(moved[0], Point::new(0.0, 0.0));
        assert_eq!(moved[1], Point::new(5.0, 0.0));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut pts = square();
        assert!(insert(&mut pts, 0, Point::new(5.0, 0.0)));
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[1], Point::new(5.0, 0.0));

        let removed = remove(&pts, 1, 3, "Polygon").unwrap();
        assert_eq!(removed, square());
        assert!(remove(&removed[..3], 0, 3, "Polygon").is_err());
    }
}
