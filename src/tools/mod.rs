//! Per-kind geometry tools and the registry that dispatches to them.
//!
//! Every annotation kind has one [`GeometryTool`] implementation. The
//! [`ToolRegistry`] maps the active [`AnnotationTool`] (for creation) and the
//! committed [`GeometryKind`] (for rendering and editing) to that
//! implementation, so the interaction machine and the render pipeline never
//! match on geometry themselves.

mod bbox;
mod circle;
mod error;
mod polygon;
mod polyline;
mod vertex_chain;
mod whole_image;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Geometry, GeometryKind, ImageSize, Point};
use crate::render::{Frame, Style};

pub use bbox::BboxTool;
pub use circle::{CircleMode, CircleTool};
pub use error::GeometryError;
pub use polygon::PolygonTool;
pub use polyline::PolylineTool;
pub use whole_image::WholeImageTool;

// ============================================================================
// Tool Modes
// ============================================================================

/// The tool the user currently has active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationTool {
    /// Selection and editing of existing annotations
    #[default]
    Select,
    Bbox,
    Polygon,
    Polyline,
    /// Circle from center then a point on the rim
    Circle2Pt,
    /// Circle through three rim points
    Circle3Pt,
    Classification,
    NoObject,
}

impl AnnotationTool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationTool::Select => "Select",
            AnnotationTool::Bbox => "Bounding Box",
            AnnotationTool::Polygon => "Polygon",
            AnnotationTool::Polyline => "Polyline",
            AnnotationTool::Circle2Pt => "Circle (2 points)",
            AnnotationTool::Circle3Pt => "Circle (3 points)",
            AnnotationTool::Classification => "Classification",
            AnnotationTool::NoObject => "No Object",
        }
    }

    /// Get all available tools.
    pub fn all() -> &'static [AnnotationTool] {
        &[
            AnnotationTool::Select,
            AnnotationTool::Bbox,
            AnnotationTool::Polygon,
            AnnotationTool::Polyline,
            AnnotationTool::Circle2Pt,
            AnnotationTool::Circle3Pt,
            AnnotationTool::Classification,
            AnnotationTool::NoObject,
        ]
    }

    /// Check if this tool creates annotations (not Select).
    pub fn is_drawing_tool(&self) -> bool {
        !matches!(self, AnnotationTool::Select)
    }

    /// Geometry kind this tool produces.
    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        match self {
            AnnotationTool::Select => None,
            AnnotationTool::Bbox => Some(GeometryKind::Bbox),
            AnnotationTool::Polygon => Some(GeometryKind::Polygon),
            AnnotationTool::Polyline => Some(GeometryKind::Polyline),
            AnnotationTool::Circle2Pt | AnnotationTool::Circle3Pt => Some(GeometryKind::Circle),
            AnnotationTool::Classification => Some(GeometryKind::Classification),
            AnnotationTool::NoObject => Some(GeometryKind::NoObject),
        }
    }

    /// Tools whose creation gesture is a sequence of clicks.
    pub fn is_multi_click(&self) -> bool {
        matches!(
            self,
            AnnotationTool::Polygon
                | AnnotationTool::Polyline
                | AnnotationTool::Circle2Pt
                | AnnotationTool::Circle3Pt
        )
    }
}

// ============================================================================
// Handles
// ============================================================================

/// One of the eight resize handles of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl BoxHandle {
    pub fn all() -> &'static [BoxHandle] {
        &[
            BoxHandle::TopLeft,
            BoxHandle::Top,
            BoxHandle::TopRight,
            BoxHandle::Right,
            BoxHandle::BottomRight,
            BoxHandle::Bottom,
            BoxHandle::BottomLeft,
            BoxHandle::Left,
        ]
    }

    pub fn moves_left(&self) -> bool {
        matches!(self, BoxHandle::TopLeft | BoxHandle::Left | BoxHandle::BottomLeft)
    }

    pub fn moves_right(&self) -> bool {
        matches!(self, BoxHandle::TopRight | BoxHandle::Right | BoxHandle::BottomRight)
    }

    pub fn moves_top(&self) -> bool {
        matches!(self, BoxHandle::TopLeft | BoxHandle::Top | BoxHandle::TopRight)
    }

    pub fn moves_bottom(&self) -> bool {
        matches!(
            self,
            BoxHandle::BottomLeft | BoxHandle::Bottom | BoxHandle::BottomRight
        )
    }
}

/// Compass position of a circle radius handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinal {
    North,
    South,
    East,
    West,
}

impl Cardinal {
    pub fn all() -> &'static [Cardinal] {
        &[Cardinal::North, Cardinal::South, Cardinal::East, Cardinal::West]
    }

    /// Unit direction from the center (image space, y down).
    pub fn axis(&self) -> Point {
        match self {
            Cardinal::North => Point::new(0.0, -1.0),
            Cardinal::South => Point::new(0.0, 1.0),
            Cardinal::East => Point::new(1.0, 0.0),
            Cardinal::West => Point::new(-1.0, 0.0),
        }
    }
}

/// A drag target on a selected annotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Handle {
    Box(BoxHandle),
    Vertex(usize),
    /// A point on an edge where a new vertex would be inserted after `index`.
    Edge { index: usize, at: Point },
    Radius(Cardinal),
    Center,
    /// The shape interior; dragging translates the whole shape.
    Body,
}

// ============================================================================
// Creation Drafts
// ============================================================================

/// Geometry accumulated by an in-progress creation gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub tool: AnnotationTool,
    /// Fixed points so far; for a box, the start corner and the live corner.
    pub points: Vec<Point>,
}

impl Draft {
    pub fn new(tool: AnnotationTool, first: Point) -> Self {
        Self {
            tool,
            points: vec![first],
        }
    }

    /// A draft with no points yet; the first click goes through `add_point`.
    pub fn empty(tool: AnnotationTool) -> Self {
        Self {
            tool,
            points: Vec::new(),
        }
    }
}

/// What a creation click did to a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftStep {
    /// More input is needed.
    Continue,
    /// The gesture produced a shape.
    Complete(Geometry),
    /// The input cannot form a valid shape; the draft should be discarded.
    Rejected(GeometryError),
}

// ============================================================================
// Tool Trait
// ============================================================================

/// Behaviour of one geometry kind: drawing, hit-testing, editing, validation.
pub trait GeometryTool: fmt::Debug {
    /// Tool that creates this kind.
    fn tool(&self) -> AnnotationTool;

    fn kind(&self) -> GeometryKind;

    /// Draw a committed annotation.
    fn render(&self, geometry: &Geometry, frame: &mut Frame<'_>, style: &Style);

    /// Draw an in-progress draft, with a rubber band to the cursor when known.
    fn render_preview(&self, draft: &Draft, cursor: Option<Point>, frame: &mut Frame<'_>, style: &Style);

    /// Draw edit handles for a selected annotation.
    fn render_handles(&self, geometry: &Geometry, frame: &mut Frame<'_>, style: &Style) {
        for (_, at) in self.handles(geometry) {
            frame.handle(at, style);
        }
    }

    /// Handle positions in image space.
    fn handles(&self, geometry: &Geometry) -> Vec<(Handle, Point)>;

    /// Whether `point` hits the shape. `tolerance` is in image pixels.
    fn hit_test(&self, geometry: &Geometry, point: Point, tolerance: f32) -> bool;

    /// Locate a handle or vertex within `radius` (image pixels) of `point`.
    fn handle_at(&self, geometry: &Geometry, point: Point, radius: f32) -> Option<Handle> {
        self.handles(geometry)
            .into_iter()
            .map(|(handle, at)| (handle, at.distance_to(point)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|l, r| l.1.total_cmp(&r.1))
            .map(|(handle, _)| handle)
    }

    /// Apply a drag of `delta` on `handle` to the geometry as it was when the
    /// drag started. The result is clipped to `bounds`.
    fn drag_handle(
        &self,
        original: &Geometry,
        handle: &Handle,
        delta: Point,
        bounds: ImageSize,
    ) -> Geometry;

    /// Feed one creation click into a draft.
    fn add_point(&self, draft: &mut Draft, point: Point, close_radius: f32) -> DraftStep;

    /// Finish a draft explicitly (drag release or Enter).
    fn finish(&self, draft: &Draft) -> Result<Geometry, GeometryError>;

    fn validate(&self, geometry: &Geometry) -> Result<(), GeometryError>;

    /// A reasonable shape of this kind for an image of `size`.
    fn default_geometry(&self, size: ImageSize) -> Geometry;

    fn clone_geometry(&self, geometry: &Geometry) -> Geometry {
        geometry.clone()
    }

    /// Smallest vertex count this kind allows; 0 when it has no vertices.
    fn min_vertices(&self) -> usize {
        0
    }

    /// Insert a vertex after `index`. Returns false when the kind has no vertices.
    fn insert_vertex(&self, _geometry: &mut Geometry, _index: usize, _at: Point) -> bool {
        false
    }

    /// Remove vertex `index`, refusing to go below [`Self::min_vertices`].
    fn remove_vertex(&self, geometry: &Geometry, _index: usize) -> Result<Geometry, GeometryError> {
        Err(GeometryError::NoVertices {
            kind: geometry.kind().name(),
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry of tools keyed by [`AnnotationTool`].
#[derive(Debug)]
pub struct ToolRegistry {
    tools: HashMap<AnnotationTool, Box<dyn GeometryTool>>,
}

impl ToolRegistry {
    /// Create a registry holding every built-in tool.
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };
        registry.register(Box::new(BboxTool));
        registry.register(Box::new(PolygonTool));
        registry.register(Box::new(PolylineTool));
        registry.register(Box::new(CircleTool::new(CircleMode::TwoPoint)));
        registry.register(Box::new(CircleTool::new(CircleMode::ThreePoint)));
        registry.register(Box::new(WholeImageTool::new(GeometryKind::Classification)));
        registry.register(Box::new(WholeImageTool::new(GeometryKind::NoObject)));
        registry
    }

    /// Register (or replace) the tool for its [`AnnotationTool`].
    pub fn register(&mut self, tool: Box<dyn GeometryTool>) {
        self.tools.insert(tool.tool(), tool);
    }

    /// Tool used to create shapes with `tool`. `None` for Select.
    pub fn get(&self, tool: AnnotationTool) -> Option<&dyn GeometryTool> {
        self.tools.get(&tool).map(|t| t.as_ref())
    }

    /// Tool that renders and edits committed geometry of `kind`.
    pub fn for_kind(&self, kind: GeometryKind) -> Option<&dyn GeometryTool> {
        let tool = match kind {
            GeometryKind::Bbox => AnnotationTool::Bbox,
            GeometryKind::Polygon => AnnotationTool::Polygon,
            GeometryKind::Polyline => AnnotationTool::Polyline,
            // Committed circles edit the same way regardless of how they were drawn
            GeometryKind::Circle => AnnotationTool::Circle2Pt,
            GeometryKind::Classification => AnnotationTool::Classification,
            GeometryKind::NoObject => AnnotationTool::NoObject,
        };
        self.get(tool)
    }

    pub fn for_geometry(&self, geometry: &Geometry) -> Option<&dyn GeometryTool> {
        self.for_kind(geometry.kind())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_drawing_tool() {
        let registry = ToolRegistry::new();
        for tool in AnnotationTool::all() {
            if tool.is_drawing_tool() {
                let t = registry.get(*tool).expect("tool registered");
                assert_eq!(t.tool(), *tool);
                assert_eq!(Some(t.kind()), tool.geometry_kind());
            } else {
                assert!(registry.get(*tool).is_none());
            }
        }
    }

    #[test]
    fn test_registry_dispatches_by_geometry() {
        let registry = ToolRegistry::new();
        let circle = Geometry::Circle {
            center: Point::new(5.0, 5.0),
            radius: 2.0,
        };
        assert_eq!(
            registry.for_geometry(&circle).map(|t| t.kind()),
            Some(GeometryKind::Circle)
        );
        assert_eq!(
            registry.for_kind(GeometryKind::NoObject).map(|t| t.tool()),
            Some(AnnotationTool::NoObject)
        );
    }

    #[test]
    fn test_default_geometries_validate() {
        let registry = ToolRegistry::new();
        let size = ImageSize::new(640.0, 480.0);
        for tool in AnnotationTool::all().iter().filter(|t| t.is_drawing_tool()) {
            let t = registry.get(*tool).unwrap();
            let g = t.default_geometry(size);
            assert!(t.validate(&g).is_ok(), "{:?}", tool);
            assert_eq!(t.clone_geometry(&g), g);
        }
    }
}
