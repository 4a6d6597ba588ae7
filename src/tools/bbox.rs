//! Axis-aligned bounding box tool.

use crate::constants::{MIN_BBOX_DRAW_SIZE, MIN_BBOX_SIDE};
use crate::model::{Geometry, GeometryKind, ImageSize, Point, Rect};
use crate::render::{Frame, Style};

use super::{AnnotationTool, BoxHandle, Draft, DraftStep, GeometryError, GeometryTool, Handle};

/// Bounding boxes: drawn with a single drag, resized by 8 handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct BboxTool;

impl BboxTool {
    fn handle_position(rect: &Rect, handle: BoxHandle) -> Point {
        let c = rect.center();
        match handle {
            BoxHandle::TopLeft => Point::new(rect.x, rect.y),
            BoxHandle::Top => Point::new(c.x, rect.y),
            BoxHandle::TopRight => Point::new(rect.right(), rect.y),
            BoxHandle::Right => Point::new(rect.right(), c.y),
            BoxHandle::BottomRight => Point::new(rect.right(), rect.bottom()),
            BoxHandle::Bottom => Point::new(c.x, rect.bottom()),
            BoxHandle::BottomLeft => Point::new(rect.x, rect.bottom()),
            BoxHandle::Left => Point::new(rect.x, c.y),
        }
    }

    /// Move the edges a handle controls, keeping the minimum side and the image bounds.
    fn resize(rect: &Rect, handle: BoxHandle, delta: Point, bounds: ImageSize) -> Rect {
        let (mut left, mut top) = (rect.x, rect.y);
        let (mut right, mut bottom) = (rect.right(), rect.bottom());

        if handle.moves_left() {
            left = (left + delta.x).min(right - MIN_BBOX_SIDE).max(0.0);
        }
        if handle.moves_right() {
            right = (right + delta.x).max(left + MIN_BBOX_SIDE).min(bounds.width);
        }
        if handle.moves_top() {
            top = (top + delta.y).min(bottom - MIN_BBOX_SIDE).max(0.0);
        }
        if handle.moves_bottom() {
            bottom = (bottom + delta.y).max(top + MIN_BBOX_SIDE).min(bounds.height);
        }

        Rect::new(left, top, right - left, bottom - top)
    }

    /// Translate without leaving the image.
    fn translate(rect: &Rect, delta: Point, bounds: ImageSize) -> Rect {
        let dx = delta.x.max(-rect.x).min(bounds.width - rect.right());
        let dy = delta.y.max(-rect.y).min(bounds.height - rect.bottom());
        Rect::new(rect.x + dx, rect.y + dy, rect.width, rect.height)
    }

    fn draft_rect(draft: &Draft, cursor: Option<Point>) -> Option<Rect> {
        let start = *draft.points.first()?;
        let end = draft.points.get(1).copied().or(cursor)?;
        Some(Rect::from_corners(start, end))
    }
}

impl GeometryTool for BboxTool {
    fn tool(&self) -> AnnotationTool {
        AnnotationTool::Bbox
    }

    fn kind(&self) -> GeometryKind {
        GeometryKind::Bbox
    }

    fn render(&self, geometry: &Geometry, frame: &mut Frame<'_>, style: &Style) {
        if let Some(rect) = geometry.as_rect() {
            frame.rect(rect, style);
        }
    }

    fn render_preview(&self, draft: &Draft, cursor: Option<Point>, frame: &mut Frame<'_>, style: &Style) {
        if let Some(rect) = Self::draft_rect(draft, cursor) {
            frame.rect(rect, style);
        }
    }

    fn handles(&self, geometry: &Geometry) -> Vec<(Handle, Point)> {
        let Some(rect) = geometry.as_rect() else {
            return Vec::new();
        };
        BoxHandle::all()
            .iter()
            .map(|h| (Handle::Box(*h), Self::handle_position(&rect, *h)))
            .collect()
    }

    fn hit_test(&self, geometry: &Geometry, point: Point, _tolerance: f32) -> bool {
        geometry.as_rect().is_some_and(|r| r.contains(point))
    }

    fn drag_handle(
        &self,
        original: &Geometry,
        handle: &Handle,
        delta: Point,
        bounds: ImageSize,
    ) -> Geometry {
        let Some(rect) = original.as_rect() else {
            return original.clone();
        };
        match handle {
            Handle::Box(h) => Geometry::bbox(Self::resize(&rect, *h, delta, bounds)),
            Handle::Body => Geometry::bbox(Self::translate(&rect, delta, bounds)),
            _ => original.clone(),
        }
    }

    fn add_point(&self, draft: &mut Draft, point: Point, _close_radius: f32) -> DraftStep {
        // The live corner follows the pointer; completion happens on release
        match draft.points.get_mut(1) {
            Some(corner) => *corner = point,
            None => draft.points.push(point),
        }
        DraftStep::Continue
    }

    fn finish(&self, draft: &Draft) -> Result<Geometry, GeometryError> {
        let rect = Self::draft_rect(draft, None).unwrap_or_default();
        if rect.width < MIN_BBOX_DRAW_SIZE || rect.height < MIN_BBOX_DRAW_SIZE {
            return Err(GeometryError::TooSmall {
                width: rect.width,
                height: rect.height,
                min: MIN_BBOX_DRAW_SIZE,
            });
        }
        let geometry = Geometry::bbox(rect);
        self.validate(&geometry)?;
        Ok(geometry)
    }

    fn validate(&self, geometry: &Geometry) -> Result<(), GeometryError> {
        let Geometry::Bbox {
            x,
            y,
            width,
            height,
        } = geometry
        else {
            return Err(GeometryError::wrong_kind(
                GeometryKind::Bbox.name(),
                geometry.kind().name(),
            ));
        };
        if ![*x, *y, *width, *height].iter().all(|v| v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if *width < 0.0 || *height < 0.0 {
            return Err(GeometryError::NegativeSize {
                width: *width,
                height: *height,
            });
        }
        Ok(())
    }

    fn default_geometry(&self, size: ImageSize) -> Geometry {
        Geometry::bbox(Rect::new(
            size.width / 4.0,
            size.height / 4.0,
            size.width / 2.0,
            size.height / 2.0,
        ))
    }
}
