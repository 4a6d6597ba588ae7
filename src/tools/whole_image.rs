//! Whole-image labels: classification and no-object.
//!
//! These carry no coordinates. A single click anywhere on the image creates
//! one, they never win a point hit-test, and they have no handles.

use crate::model::{Geometry, GeometryKind, ImageSize, Point, Rect};
use crate::render::{Frame, Style};

use super::{AnnotationTool, Draft, DraftStep, GeometryError, GeometryTool, Handle};

/// Tool for one of the two whole-image kinds.
#[derive(Debug, Clone, Copy)]
pub struct WholeImageTool {
    kind: GeometryKind,
}

impl WholeImageTool {
    /// `kind` must be a whole-image kind; anything else falls back to classification.
    pub fn new(kind: GeometryKind) -> Self {
        let kind = if kind.is_whole_image() {
            kind
        } else {
            GeometryKind::Classification
        };
        Self { kind }
    }

    fn geometry(&self) -> Geometry {
        match self.kind {
            GeometryKind::NoObject => Geometry::NoObject,
            _ => Geometry::Classification,
        }
    }

    /// Thin frame around the whole image plus a corner label.
    fn outline(&self, frame: &mut Frame<'_>, style: &Style) {
        let image = frame.transform().image;
        let rect = Rect::new(0.0, 0.0, image.width, image.height);
        let outline = Style {
            fill: None,
            ..*style
        };
        frame.rect(rect, &outline);
        frame.label(self.kind.name(), Point::new(4.0, 4.0), style.stroke);
    }
}

impl GeometryTool for WholeImageTool {
    fn tool(&self) -> AnnotationTool {
        match self.kind {
            GeometryKind::NoObject => AnnotationTool::NoObject,
            _ => AnnotationTool::Classification,
        }
    }

    fn kind(&self) -> GeometryKind {
        self.kind
    }

    fn render(&self, geometry: &Geometry, frame: &mut Frame<'_>, style: &Style) {
        if geometry.kind() == self.kind {
            self.outline(frame, style);
        }
    }

    fn render_preview(&self, _draft: &Draft, _cursor: Option<Point>, frame: &mut Frame<'_>, style: &Style) {
        self.outline(frame, style);
    }

    fn handles(&self, _geometry: &Geometry) -> Vec<(Handle, Point)> {
        Vec::new()
    }

    fn hit_test(&self, _geometry: &Geometry, _point: Point, _tolerance: f32) -> bool {
        false
    }

    fn drag_handle(
        &self,
        original: &Geometry,
        _handle: &Handle,
        _delta: Point,
        _bounds: ImageSize,
    ) -> Geometry {
        original.clone()
    }

    fn add_point(&self, draft: &mut Draft, _point: Point, _close_radius: f32) -> DraftStep {
        match self.finish(draft) {
            Ok(geometry) => DraftStep::Complete(geometry),
            Err(e) => DraftStep::Rejected(e),
        }
    }

    fn finish(&self, _draft: &Draft) -> Result<Geometry, GeometryError> {
        Ok(self.geometry())
    }

    fn validate(&self, geometry: &Geometry) -> Result<(), GeometryError> {
        if geometry.kind() == self.kind {
            Ok(())
        } else {
            Err(GeometryError::wrong_kind(self.kind.name(), geometry.kind().name()))
        }
    }

    fn default_geometry(&self, _size: ImageSize) -> Geometry {
        self.geometry()
    }
}
