//! The 2D drawing surface abstraction and a recording implementation.
//!
//! All coordinates handed to a [`DrawSurface`] are in view space. The host
//! implements the trait over its canvas; tests and the replay binary use
//! [`RecordingSurface`].

use crate::model::{Point, Rect};

use super::Color;

/// Immediate-mode 2D drawing context.
pub trait DrawSurface {
    /// Clear the whole viewport.
    fn clear(&mut self, color: Color);

    /// Blit the current image into `rect`.
    fn draw_image(&mut self, rect: Rect);

    fn begin_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);

    /// Append an arc around `center`; angles in radians.
    fn arc(&mut self, center: Point, radius: f32, start_angle: f32, end_angle: f32);

    fn close_path(&mut self);
    fn stroke(&mut self, color: Color, width: f32);
    fn fill(&mut self, color: Color);

    /// Dash pattern for subsequent strokes; empty for solid lines.
    fn set_line_dash(&mut self, segments: &[f32]);

    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32);
    fn fill_text(&mut self, text: &str, position: Point, color: Color, size: f32);
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Image(Rect),
    BeginPath,
    MoveTo(Point),
    LineTo(Point),
    Arc {
        center: Point,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
    },
    ClosePath,
    Stroke { color: Color, width: f32 },
    Fill(Color),
    LineDash(Vec<f32>),
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color, width: f32 },
    Text {
        text: String,
        position: Point,
        color: Color,
        size: f32,
    },
}

/// Surface that records every call, for tests and headless replay.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything recorded so far.
    pub fn reset(&mut self) {
        self.commands.clear();
    }

    /// Number of completed strokes and fills.
    pub fn paint_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Stroke { .. } | DrawCommand::Fill(_)))
            .count()
    }

    /// All text drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn draw_image(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::Image(rect));
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, p: Point) {
        self.commands.push(DrawCommand::MoveTo(p));
    }

    fn line_to(&mut self, p: Point) {
        self.commands.push(DrawCommand::LineTo(p));
    }

    fn arc(&mut self, center: Point, radius: f32, start_angle: f32, end_angle: f32) {
        self.commands.push(DrawCommand::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        });
    }

    fn close_path(&mut self) {
        self.commands.push(DrawCommand::ClosePath);
    }

    fn stroke(&mut self, color: Color, width: f32) {
        self.commands.push(DrawCommand::Stroke { color, width });
    }

    fn fill(&mut self, color: Color) {
        self.commands.push(DrawCommand::Fill(color));
    }

    fn set_line_dash(&mut self, segments: &[f32]) {
        self.commands.push(DrawCommand::LineDash(segments.to_vec()));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.commands
            .push(DrawCommand::StrokeRect { rect, color, width });
    }

    fn fill_text(&mut self, text: &str, position: Point, color: Color, size: f32) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position,
            color,
            size,
        });
    }
}
