//! Transient gesture state. Exactly one gesture is active at a time.

use crate::model::{AnnotationId, Geometry, Point};
use crate::tools::{AnnotationTool, Draft, Handle};

/// The active gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// A creation gesture accumulating points.
    Drawing(Draft),
    /// Pointer pressed on a handle or shape but not yet moved far enough to
    /// count as a drag.
    PotentialDrag(DragState),
    /// A handle, vertex, center or whole shape is being dragged.
    Dragging(DragState),
    /// Viewport pan; `last` is the previous pointer position in view space.
    Panning { last: Point },
}

/// Snapshot shared by the potential and active drag states.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub id: AnnotationId,
    pub handle: Handle,
    /// Press position in image space
    pub start: Point,
    /// Press position in view space, for the drag threshold
    pub start_view: Point,
    /// Geometry the drag delta is applied to
    pub original: Geometry,
    /// Geometry before the gesture, recorded in history
    pub before: Geometry,
    /// The press itself changed the shape (edge insertion), so releasing
    /// without moving still commits
    pub changed_on_press: bool,
}

impl Gesture {
    /// Name of the conceptual state, for logs and the host's cursor choice.
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "Idle",
            Gesture::Drawing(_) => "Drawing",
            Gesture::PotentialDrag(_) => "PotentialDrag",
            Gesture::Dragging(drag) => match drag.handle {
                Handle::Box(_) => "Resizing",
                Handle::Vertex(_) | Handle::Edge { .. } => "DraggingVertex",
                Handle::Body => "DraggingShape",
                Handle::Center => "DraggingCircleCenter",
                Handle::Radius(_) => "ResizingCircleRadius",
            },
            Gesture::Panning { .. } => "Panning",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    /// The draft being drawn, if any.
    pub fn draft(&self) -> Option<&Draft> {
        match self {
            Gesture::Drawing(draft) => Some(draft),
            _ => None,
        }
    }
}

/// A finished creation gesture waiting for the user to pick a class.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingShape {
    pub tool: AnnotationTool,
    pub geometry: Geometry,
}
