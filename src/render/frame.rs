//! Image-space drawing helpers over a [`DrawSurface`].
//!
//! Tools describe shapes in image coordinates; a [`Frame`] maps them through
//! the current [`ViewTransform`] so line widths and handle sizes stay
//! constant in view pixels regardless of zoom.

use std::f32::consts::TAU;

use crate::constants::HANDLE_DRAW_SIZE;
use crate::model::{Point, Rect};
use crate::zoom_math::ViewTransform;

use super::{Color, DrawSurface};

/// Dash pattern for previews and pending shapes, in view pixels.
const DASH: [f32; 2] = [6.0, 4.0];

/// Stroke/fill styling for one shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub stroke: Color,
    pub fill: Option<Color>,
    /// Line width in view pixels.
    pub line_width: f32,
    pub dashed: bool,
}

impl Style {
    /// Normal style for a committed annotation of a class color.
    pub fn annotation(color: Color, selected: bool) -> Self {
        Self {
            stroke: color,
            fill: Some(color.with_alpha(if selected { 0.3 } else { 0.15 })),
            line_width: if selected { 3.0 } else { 2.0 },
            dashed: false,
        }
    }

    /// Dashed style for in-progress and pending shapes.
    pub fn preview(color: Color) -> Self {
        Self {
            stroke: color,
            fill: Some(color.with_alpha(0.1)),
            line_width: 2.0,
            dashed: true,
        }
    }

    /// Style for edit handles.
    pub fn handle() -> Self {
        Self {
            stroke: Color::BLACK,
            fill: Some(Color::HANDLE),
            line_width: 1.0,
            dashed: false,
        }
    }
}

/// One frame's drawing context: a surface plus the transform to draw through.
pub struct Frame<'a> {
    surface: &'a mut dyn DrawSurface,
    transform: &'a ViewTransform,
}

impl<'a> Frame<'a> {
    pub fn new(surface: &'a mut dyn DrawSurface, transform: &'a ViewTransform) -> Self {
        Self { surface, transform }
    }

    pub fn transform(&self) -> &ViewTransform {
        self.transform
    }

    /// Direct access for view-space drawing (banners, backgrounds).
    pub fn surface(&mut self) -> &mut dyn DrawSurface {
        &mut *self.surface
    }

    fn set_dash(&mut self, style: &Style) {
        if style.dashed {
            self.surface.set_line_dash(&DASH);
        } else {
            self.surface.set_line_dash(&[]);
        }
    }

    fn paint(&mut self, style: &Style, fill: bool) {
        if fill && let Some(color) = style.fill {
            self.surface.fill(color);
        }
        self.surface.stroke(style.stroke, style.line_width);
    }

    /// Stroke a vertex chain; fill it too when `closed`.
    pub fn path(&mut self, points: &[Point], closed: bool, style: &Style) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.set_dash(style);
        self.surface.begin_path();
        self.surface.move_to(self.transform.image_to_view(*first));
        for p in rest {
            self.surface.line_to(self.transform.image_to_view(*p));
        }
        if closed {
            self.surface.close_path();
        }
        self.paint(style, closed);
    }

    /// Stroke and fill an image-space rectangle.
    pub fn rect(&mut self, rect: Rect, style: &Style) {
        let corners = [
            Point::new(rect.x, rect.y),
            Point::new(rect.right(), rect.y),
            Point::new(rect.right(), rect.bottom()),
            Point::new(rect.x, rect.bottom()),
        ];
        self.path(&corners, true, style);
    }

    /// Stroke and fill an image-space circle.
    pub fn circle(&mut self, center: Point, radius: f32, style: &Style) {
        self.set_dash(style);
        self.surface.begin_path();
        self.surface.arc(
            self.transform.image_to_view(center),
            self.transform.image_len_to_view(radius),
            0.0,
            TAU,
        );
        self.surface.close_path();
        self.paint(style, true);
    }

    /// Fixed-size square handle centered on an image-space point.
    pub fn handle(&mut self, at: Point, style: &Style) {
        let v = self.transform.image_to_view(at);
        let half = HANDLE_DRAW_SIZE / 2.0;
        let rect = Rect::new(v.x - half, v.y - half, HANDLE_DRAW_SIZE, HANDLE_DRAW_SIZE);
        if let Some(fill) = style.fill {
            self.surface.fill_rect(rect, fill);
        }
        self.surface.stroke_rect(rect, style.stroke, style.line_width);
    }

    /// Small filled dot at an image-space point.
    pub fn dot(&mut self, at: Point, color: Color) {
        self.surface.begin_path();
        self.surface
            .arc(self.transform.image_to_view(at), HANDLE_DRAW_SIZE / 2.0, 0.0, TAU);
        self.surface.fill(color);
    }

    /// Text anchored at an image-space point.
    pub fn label(&mut self, text: &str, at: Point, color: Color) {
        let v = self.transform.image_to_view(at);
        self.surface.fill_text(text, v, color, 12.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageSize;
    use crate::render::{DrawCommand, RecordingSurface};

    fn transform() -> ViewTransform {
        // Scaled image fills the viewport, so only the pan offsets
        ViewTransform::new(2.0, 100.0, 50.0, ImageSize::new(200.0, 100.0), ImageSize::new(100.0, 50.0))
    }

    #[test]
    fn test_path_maps_through_transform() {
        let mut surface = RecordingSurface::new();
        let t = transform();
        let mut frame = Frame::new(&mut surface, &t);
        frame.path(
            &[Point::new(0.0, 0.0), Point::new(10.0, 5.0)],
            false,
            &Style::annotation(Color::WHITE, false),
        );
        assert!(surface.commands.contains(&DrawCommand::MoveTo(Point::new(100.0, 50.0))));
        assert!(surface.commands.contains(&DrawCommand::LineTo(Point::new(120.0, 60.0))));
        // Open paths are stroked only
        assert_eq!(surface.paint_count(), 1);
    }

    #[test]
    fn test_handle_size_is_zoom_independent() {
        let mut surface = RecordingSurface::new();
        let t = transform();
        let mut frame = Frame::new(&mut surface, &t);
        frame.handle(Point::new(0.0, 0.0), &Style::handle());
        let stroked = surface.commands.iter().find_map(|c| match c {
            DrawCommand::StrokeRect { rect, .. } => Some(*rect),
            _ => None,
        });
        assert_eq!(stroked.map(|r| r.width), Some(HANDLE_DRAW_SIZE));
    }

    #[test]
    fn test_dashed_preview_sets_dash() {
        let mut surface = RecordingSurface::new();
        let t = transform();
        let mut frame = Frame::new(&mut surface, &t);
        frame.circle(Point::new(5.0, 5.0), 2.0, &Style::preview(Color::WHITE));
        assert_eq!(surface.commands[0], DrawCommand::LineDash(DASH.to_vec()));
    }
}
