//! Pointer and keyboard driven interaction state machine.
//!
//! [`InteractionMachine`] owns the active tool, the single active
//! [`Gesture`] and any [`PendingShape`] awaiting a class. Every input handler
//! receives an [`EditContext`] holding the shared state it may touch, mutates
//! that state directly so each frame shows the live edit, and returns the
//! [`Effect`]s the caller must persist or report.

mod gesture;
mod input;

pub use gesture::{DragState, Gesture, PendingShape};
pub use input::{Key, Modifiers, MouseButton};

use crate::config::Preferences;
use crate::constants::MIN_DRAG_DISTANCE;
use crate::model::{Annotation, AnnotationId, Geometry, GeometryKind, ImageInfo, Point};
use crate::state::{AnnotationStore, ImageStatus, Selection};
use crate::tools::{
    AnnotationTool, Draft, DraftStep, GeometryError, GeometryTool, Handle, ToolRegistry,
};
use crate::zoom_math::ViewTransform;

/// Shared state an input handler works on.
pub struct EditContext<'a> {
    pub store: &'a mut AnnotationStore,
    pub registry: &'a ToolRegistry,
    pub transform: &'a mut ViewTransform,
    pub image: &'a ImageInfo,
    /// Number of classes defined by the active task
    pub class_count: usize,
    /// Whether this session holds the image lock
    pub can_edit: bool,
    pub prefs: &'a Preferences,
}

impl EditContext<'_> {
    /// Handle and hit radius in image pixels at the current zoom.
    fn hit_radius(&self) -> f32 {
        self.transform.view_len_to_image(self.prefs.handle_radius_px)
    }

    fn close_radius(&self) -> f32 {
        self.transform.view_len_to_image(self.prefs.close_threshold_px)
    }

    /// The selected annotation, if it belongs to the current image.
    fn selected_on_image(&self) -> Option<&Annotation> {
        self.store
            .selected()
            .filter(|a| a.image_id == self.image.image_id)
    }
}

/// Something the caller must act on after an input was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// An edit of `id` was committed locally; `before` is the geometry it replaced.
    Modified { id: AnnotationId, before: Geometry },
    /// A creation gesture finished and waits for a class choice.
    Staged(GeometryKind),
    /// An annotation was removed from draw position `index`.
    Deleted { index: usize, annotation: Annotation },
    /// Degenerate input; nothing was created or changed.
    Rejected(GeometryError),
    /// The gesture needs the image lock, which this session does not hold.
    LockBlocked,
    /// Creation needs at least one class.
    NoClasses,
}

/// Interaction state: active tool, gesture, pending shape and cursor.
#[derive(Debug, Default)]
pub struct InteractionMachine {
    tool: AnnotationTool,
    gesture: Gesture,
    pending: Option<PendingShape>,
    /// Last pointer position in image space
    cursor: Option<Point>,
}

/// Drag target for the interior of a shape.
fn body_handle(geometry: &Geometry) -> Handle {
    match geometry {
        Geometry::Circle { .. } => Handle::Center,
        _ => Handle::Body,
    }
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> AnnotationTool {
        self.tool
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn pending(&self) -> Option<&PendingShape> {
        self.pending.as_ref()
    }

    /// Pointer position in image space, for the magnifier.
    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// Switch tools, discarding any in-progress gesture.
    pub fn set_tool(&mut self, tool: AnnotationTool) {
        if self.tool == tool {
            return;
        }
        self.cancel();
        self.tool = tool;
        log::debug!("🖌️ Annotation tool: {}", tool.name());
    }

    /// Drop the active gesture. Edits made by an unfinished drag stay as they are.
    pub fn cancel(&mut self) {
        if let Gesture::Drawing(draft) = &self.gesture {
            log::debug!("❌ Drawing cancelled ({} points)", draft.points.len());
        }
        self.gesture = Gesture::Idle;
    }

    /// Forget all transient state, for example when the image changes.
    pub fn reset(&mut self) {
        self.cancel();
        self.pending = None;
        self.cursor = None;
    }

    /// Take the pending shape for creation.
    pub fn take_pending(&mut self) -> Option<PendingShape> {
        self.pending.take()
    }

    /// Discard the pending shape. Returns whether there was one.
    pub fn abandon_pending(&mut self) -> bool {
        let had = self.pending.take().is_some();
        if had {
            log::debug!("Pending shape abandoned");
        }
        had
    }

    // ========================================================================
    // Pointer
    // ========================================================================

    /// Pointer pressed at a view-space position.
    pub fn pointer_down(
        &mut self,
        ctx: &mut EditContext<'_>,
        view: Point,
        button: MouseButton,
    ) -> Vec<Effect> {
        let point = ctx.transform.view_to_image(view);
        self.cursor = Some(point);

        match button {
            MouseButton::Middle => {
                self.gesture = Gesture::Panning { last: view };
                Vec::new()
            }
            MouseButton::Left => match self.tool {
                AnnotationTool::Select => self.select_down(ctx, view, point),
                tool => self.draw_down(ctx, tool, point),
            },
            _ => Vec::new(),
        }
    }

    /// Pointer moved to a view-space position.
    pub fn pointer_move(&mut self, ctx: &mut EditContext<'_>, view: Point) -> Vec<Effect> {
        let point = ctx.transform.view_to_image(view);
        self.cursor = Some(point);

        let mut effects = Vec::new();
        self.gesture = match std::mem::take(&mut self.gesture) {
            Gesture::Idle => Gesture::Idle,
            Gesture::Panning { last } => {
                *ctx.transform = ctx.transform.pan_by(view.x - last.x, view.y - last.y);
                ctx.store.mark_dirty();
                Gesture::Panning { last: view }
            }
            Gesture::Drawing(mut draft) => {
                if draft.tool == AnnotationTool::Bbox
                    && let Some(tool) = ctx.registry.get(AnnotationTool::Bbox)
                {
                    tool.add_point(&mut draft, ctx.image.size.clamp(point), 0.0);
                }
                // Rubber band follows the cursor
                ctx.store.mark_dirty();
                Gesture::Drawing(draft)
            }
            Gesture::PotentialDrag(drag) => {
                if view.distance_to(drag.start_view) < MIN_DRAG_DISTANCE {
                    Gesture::PotentialDrag(drag)
                } else if !ctx.can_edit {
                    effects.push(Effect::LockBlocked);
                    Gesture::Idle
                } else {
                    log::debug!("Starting {:?} drag on annotation {}", drag.handle, drag.id);
                    Self::apply_drag(ctx, &drag, point);
                    Gesture::Dragging(drag)
                }
            }
            Gesture::Dragging(drag) => {
                Self::apply_drag(ctx, &drag, point);
                Gesture::Dragging(drag)
            }
        };
        effects
    }

    /// Pointer released at a view-space position.
    pub fn pointer_up(&mut self, ctx: &mut EditContext<'_>, view: Point) -> Vec<Effect> {
        self.cursor = Some(ctx.transform.view_to_image(view));

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Panning { .. } => Vec::new(),
            Gesture::PotentialDrag(drag) => {
                // A click without movement only selects
                if drag.changed_on_press {
                    Self::commit_edit(ctx, drag.id, drag.before)
                } else {
                    Vec::new()
                }
            }
            Gesture::Dragging(drag) => {
                log::debug!("Finished {:?} drag on annotation {}", drag.handle, drag.id);
                Self::commit_edit(ctx, drag.id, drag.before)
            }
            Gesture::Drawing(draft) if draft.tool == AnnotationTool::Bbox => {
                let registry = ctx.registry;
                let Some(tool) = registry.get(AnnotationTool::Bbox) else {
                    return Vec::new();
                };
                match tool.finish(&draft) {
                    Ok(geometry) => self.stage(ctx, tool, geometry),
                    Err(GeometryError::TooSmall { .. }) => {
                        log::debug!("Bounding box too small, discarded");
                        ctx.store.mark_dirty();
                        Vec::new()
                    }
                    Err(e) => {
                        log::warn!("Bounding box rejected: {}", e);
                        ctx.store.mark_dirty();
                        vec![Effect::Rejected(e)]
                    }
                }
            }
            other => {
                // Multi-click shapes keep drawing across releases
                self.gesture = other;
                Vec::new()
            }
        }
    }

    fn select_down(&mut self, ctx: &mut EditContext<'_>, view: Point, point: Point) -> Vec<Effect> {
        let registry = ctx.registry;
        let radius = ctx.hit_radius();

        // Handles and interior of the current selection win over everything else
        if let Some(selected) = ctx.selected_on_image() {
            let id = selected.id;
            let geometry = selected.geometry.clone();
            if let Some(tool) = registry.for_geometry(&geometry) {
                if let Some(handle) = tool.handle_at(&geometry, point, radius) {
                    self.press_handle(ctx, id, geometry, handle, view, point);
                    return Vec::new();
                }
                if tool.hit_test(&geometry, point, radius) {
                    let handle = body_handle(&geometry);
                    ctx.store.select(Some(Selection::annotation(id)));
                    self.begin_drag(id, handle, geometry, view, point);
                    return Vec::new();
                }
            }
        }

        if let Some(id) = ctx
            .store
            .hit_test(&ctx.image.image_id, point, radius, registry)
        {
            log::debug!("🔍 Selected annotation {}", id);
            ctx.store.select(Some(Selection::annotation(id)));
            if let Some(geometry) = ctx.store.get(id).map(|a| a.geometry.clone()) {
                let handle = body_handle(&geometry);
                self.begin_drag(id, handle, geometry, view, point);
            }
            return Vec::new();
        }

        ctx.store.select(None);
        self.gesture = Gesture::Panning { last: view };
        Vec::new()
    }

    fn press_handle(
        &mut self,
        ctx: &mut EditContext<'_>,
        id: AnnotationId,
        geometry: Geometry,
        handle: Handle,
        view: Point,
        point: Point,
    ) {
        if let Handle::Edge { index, at } = handle {
            let registry = ctx.registry;
            let mut inserted = geometry.clone();
            if ctx.can_edit
                && registry
                    .for_geometry(&geometry)
                    .is_some_and(|tool| tool.insert_vertex(&mut inserted, index, at))
            {
                let vertex = Handle::Vertex(index + 1);
                log::debug!("Inserted vertex {} into annotation {}", index + 1, id);
                ctx.store.set_geometry(id, inserted.clone());
                ctx.store.select(Some(Selection {
                    id,
                    handle: Some(vertex),
                }));
                self.gesture = Gesture::PotentialDrag(DragState {
                    id,
                    handle: vertex,
                    start: point,
                    start_view: view,
                    original: inserted,
                    before: geometry,
                    changed_on_press: true,
                });
                return;
            }
            // Without the lock an edge press only grabs the shape
            ctx.store.select(Some(Selection::annotation(id)));
            self.begin_drag(id, body_handle(&geometry), geometry, view, point);
            return;
        }

        log::debug!("Pressed {:?} of annotation {}", handle, id);
        ctx.store.select(Some(Selection {
            id,
            handle: Some(handle),
        }));
        self.begin_drag(id, handle, geometry, view, point);
    }

    fn begin_drag(
        &mut self,
        id: AnnotationId,
        handle: Handle,
        geometry: Geometry,
        view: Point,
        point: Point,
    ) {
        self.gesture = Gesture::PotentialDrag(DragState {
            id,
            handle,
            start: point,
            start_view: view,
            original: geometry.clone(),
            before: geometry,
            changed_on_press: false,
        });
    }

    fn apply_drag(ctx: &mut EditContext<'_>, drag: &DragState, point: Point) {
        let Some(tool) = ctx.registry.for_geometry(&drag.original) else {
            return;
        };
        let updated = tool.drag_handle(&drag.original, &drag.handle, point - drag.start, ctx.image.size);
        log::trace!("Drag {:?} of annotation {} to ({:.1}, {:.1})", drag.handle, drag.id, point.x, point.y);
        ctx.store.set_geometry(drag.id, updated);
    }

    fn draw_down(&mut self, ctx: &mut EditContext<'_>, tool: AnnotationTool, point: Point) -> Vec<Effect> {
        if !ctx.image.size.contains(point) {
            log::debug!("Press at ({:.1}, {:.1}) is outside the image", point.x, point.y);
            return Vec::new();
        }
        if !ctx.can_edit {
            return vec![Effect::LockBlocked];
        }
        if tool != AnnotationTool::NoObject && ctx.class_count == 0 {
            log::warn!("Cannot create annotations: the task defines no classes");
            return vec![Effect::NoClasses];
        }
        let registry = ctx.registry;
        let Some(geometry_tool) = registry.get(tool) else {
            return Vec::new();
        };
        // Starting a new shape abandons one still waiting for a class
        self.abandon_pending();

        let mut draft = match std::mem::take(&mut self.gesture) {
            Gesture::Drawing(draft) if draft.tool == tool => draft,
            _ => Draft::empty(tool),
        };
        match geometry_tool.add_point(&mut draft, point, ctx.close_radius()) {
            DraftStep::Continue => {
                log::debug!(
                    "✏️ {} point {} at ({:.1}, {:.1})",
                    tool.name(),
                    draft.points.len(),
                    point.x,
                    point.y
                );
                self.gesture = Gesture::Drawing(draft);
                ctx.store.mark_dirty();
                Vec::new()
            }
            DraftStep::Complete(geometry) => self.stage(ctx, geometry_tool, geometry),
            DraftStep::Rejected(e) => {
                log::warn!("{} rejected: {}", tool.name(), e);
                ctx.store.mark_dirty();
                vec![Effect::Rejected(e)]
            }
        }
    }

    /// Clip a finished shape and hold it until a class is chosen.
    fn stage(
        &mut self,
        ctx: &mut EditContext<'_>,
        tool: &dyn GeometryTool,
        geometry: Geometry,
    ) -> Vec<Effect> {
        self.gesture = Gesture::Idle;
        ctx.store.mark_dirty();

        let clipped = geometry.clip_and_round(ctx.image.size);
        if clipped.clipped {
            log::debug!("{} clipped to image bounds", tool.kind().name());
        }
        if let Err(e) = tool.validate(&clipped.geometry) {
            log::warn!("{} rejected after clipping: {}", tool.kind().name(), e);
            return vec![Effect::Rejected(e)];
        }

        let kind = clipped.geometry.kind();
        log::debug!("{} staged, waiting for a class", kind.name());
        self.pending = Some(PendingShape {
            tool: tool.tool(),
            geometry: clipped.geometry,
        });
        vec![Effect::Staged(kind)]
    }

    /// Clip and round the current geometry of `id` and report the edit.
    fn commit_edit(ctx: &mut EditContext<'_>, id: AnnotationId, before: Geometry) -> Vec<Effect> {
        let Some(current) = ctx.store.get(id).map(|a| a.geometry.clone()) else {
            return Vec::new();
        };
        let clipped = current.clip_and_round(ctx.image.size);
        if clipped.geometry == before {
            log::debug!("Annotation {} unchanged", id);
            ctx.store.set_geometry(id, clipped.geometry);
            return Vec::new();
        }
        ctx.store.set_geometry(id, clipped.geometry);
        ctx.store
            .set_status(&ctx.image.image_id, ImageStatus::InProgress);
        vec![Effect::Modified { id, before }]
    }

    // ========================================================================
    // Keyboard
    // ========================================================================

    /// Editing keys: Enter, Escape, arrows, Delete and Backspace.
    pub fn key(&mut self, ctx: &mut EditContext<'_>, key: Key, modifiers: Modifiers) -> Vec<Effect> {
        match key.normalized() {
            Key::Enter => self.finish_drawing(ctx),
            Key::Escape => {
                if matches!(self.gesture, Gesture::Drawing(_)) {
                    self.cancel();
                    ctx.store.mark_dirty();
                } else if !self.abandon_pending() {
                    ctx.store.select(None);
                }
                ctx.store.mark_dirty();
                Vec::new()
            }
            Key::Delete | Key::Backspace => self.delete_selected(ctx),
            other => match other.arrow_delta() {
                Some((dx, dy)) => self.nudge(ctx, dx, dy, modifiers.shift),
                None => Vec::new(),
            },
        }
    }

    /// Enter: close a polygon or polyline being drawn.
    fn finish_drawing(&mut self, ctx: &mut EditContext<'_>) -> Vec<Effect> {
        let Gesture::Drawing(draft) = &self.gesture else {
            return Vec::new();
        };
        let kind = draft.tool;
        if !matches!(kind, AnnotationTool::Polygon | AnnotationTool::Polyline) {
            return Vec::new();
        }
        let registry = ctx.registry;
        let Some(tool) = registry.get(kind) else {
            return Vec::new();
        };
        match tool.finish(draft) {
            Ok(geometry) => self.stage(ctx, tool, geometry),
            Err(e) => {
                // Keep drawing; the user can add more points
                log::warn!("📝 {} not finished: {}", kind.name(), e);
                vec![Effect::Rejected(e)]
            }
        }
    }

    /// Move the selected shape, or its selected handle, by one step.
    fn nudge(&mut self, ctx: &mut EditContext<'_>, dx: f32, dy: f32, large: bool) -> Vec<Effect> {
        if !self.gesture.is_idle() {
            return Vec::new();
        }
        let Some(selection) = ctx.store.selection() else {
            return Vec::new();
        };
        let Some(before) = ctx
            .selected_on_image()
            .filter(|a| !a.kind().is_whole_image())
            .map(|a| a.geometry.clone())
        else {
            return Vec::new();
        };
        if !ctx.can_edit {
            return vec![Effect::LockBlocked];
        }
        let registry = ctx.registry;
        let Some(tool) = registry.for_geometry(&before) else {
            return Vec::new();
        };

        let step = if large {
            ctx.prefs.nudge_step_large
        } else {
            ctx.prefs.nudge_step
        };
        let handle = match selection.handle {
            Some(Handle::Edge { .. }) | None => body_handle(&before),
            Some(handle) => handle,
        };
        let moved = tool.drag_handle(&before, &handle, Point::new(dx * step, dy * step), ctx.image.size);
        ctx.store.set_geometry(selection.id, moved);
        Self::commit_edit(ctx, selection.id, before)
    }

    /// Delete the selected vertex, or the selected annotation when no vertex is selected.
    fn delete_selected(&mut self, ctx: &mut EditContext<'_>) -> Vec<Effect> {
        if !self.gesture.is_idle() {
            return Vec::new();
        }
        let Some(selection) = ctx.store.selection() else {
            return Vec::new();
        };
        let Some(geometry) = ctx.selected_on_image().map(|a| a.geometry.clone()) else {
            return Vec::new();
        };
        if !ctx.can_edit {
            return vec![Effect::LockBlocked];
        }

        let id = selection.id;
        if let Some(index) = selection.vertex() {
            let registry = ctx.registry;
            let Some(tool) = registry.for_geometry(&geometry) else {
                return Vec::new();
            };
            return match tool.remove_vertex(&geometry, index) {
                Ok(updated) => {
                    log::debug!("Removed vertex {} of annotation {}", index, id);
                    ctx.store.set_geometry(id, updated);
                    ctx.store.select(Some(Selection::annotation(id)));
                    Self::commit_edit(ctx, id, geometry)
                }
                Err(e) => {
                    log::warn!("Vertex {} of annotation {} kept: {}", index, id, e);
                    vec![Effect::Rejected(e)]
                }
            };
        }

        let Some((index, annotation)) = ctx.store.remove(id) else {
            return Vec::new();
        };
        log::info!("🗑️ Deleted annotation {}", id);
        ctx.store
            .set_status(&ctx.image.image_id, ImageStatus::InProgress);
        vec![Effect::Deleted { index, annotation }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageSize, Rect};
    use crate::tools::BoxHandle;

    /// Owns everything an [`EditContext`] borrows. View and image space
    /// coincide: zoom 1 and the viewport matches the image.
    struct Harness {
        store: AnnotationStore,
        registry: ToolRegistry,
        transform: ViewTransform,
        image: ImageInfo,
        prefs: Preferences,
        classes: usize,
        can_edit: bool,
        machine: InteractionMachine,
    }

    impl Harness {
        fn new() -> Self {
            let size = ImageSize::new(100.0, 100.0);
            Self {
                store: AnnotationStore::new(),
                registry: ToolRegistry::new(),
                transform: ViewTransform::centered(size, size),
                image: ImageInfo::new("p", "img", 100.0, 100.0),
                prefs: Preferences::default(),
                classes: 2,
                can_edit: true,
                machine: InteractionMachine::new(),
            }
        }

        fn with_annotation(mut self, geometry: Geometry) -> (Self, AnnotationId) {
            let id = self.store.insert(Annotation::new(0, "p", "img", geometry));
            (self, id)
        }

        fn run<R>(&mut self, f: impl FnOnce(&mut InteractionMachine, &mut EditContext<'_>) -> R) -> R {
            let mut ctx = EditContext {
                store: &mut self.store,
                registry: &self.registry,
                transform: &mut self.transform,
                image: &self.image,
                class_count: self.classes,
                can_edit: self.can_edit,
                prefs: &self.prefs,
            };
            f(&mut self.machine, &mut ctx)
        }

        fn down(&mut self, x: f32, y: f32) -> Vec<Effect> {
            self.run(|m, ctx| m.pointer_down(ctx, Point::new(x, y), MouseButton::Left))
        }

        fn drag_to(&mut self, x: f32, y: f32) -> Vec<Effect> {
            self.run(|m, ctx| m.pointer_move(ctx, Point::new(x, y)))
        }

        fn up(&mut self, x: f32, y: f32) -> Vec<Effect> {
            self.run(|m, ctx| m.pointer_up(ctx, Point::new(x, y)))
        }

        fn click(&mut self, x: f32, y: f32) -> Vec<Effect> {
            let mut effects = self.down(x, y);
            effects.extend(self.up(x, y));
            effects
        }

        fn press(&mut self, key: Key, modifiers: Modifiers) -> Vec<Effect> {
            self.run(|m, ctx| m.key(ctx, key, modifiers))
        }

        fn geometry(&self, id: AnnotationId) -> Geometry {
            self.store.get(id).unwrap().geometry.clone()
        }
    }

    fn triangle() -> Geometry {
        Geometry::Polygon {
            points: vec![
                Point::new(10.0, 10.0),
                Point::new(60.0, 10.0),
                Point::new(10.0, 60.0),
            ],
        }
    }

    #[test]
    fn test_bbox_drag_stages_pending_shape() {
        let mut h = Harness::new();
        h.machine.set_tool(AnnotationTool::Bbox);

        assert!(h.down(10.0, 10.0).is_empty());
        h.drag_to(40.0, 30.0);
        assert_eq!(h.up(40.0, 30.0), vec![Effect::Staged(GeometryKind::Bbox)]);

        let pending = h.machine.pending().unwrap();
        assert_eq!(pending.geometry, Geometry::bbox(Rect::new(10.0, 10.0, 30.0, 20.0)));
        assert!(h.machine.gesture().is_idle());
        // Nothing is created before a class is chosen
        assert!(h.store.is_empty());
    }

    #[test]
    fn test_bbox_click_without_drag_is_discarded() {
        let mut h = Harness::new();
        h.machine.set_tool(AnnotationTool::Bbox);
        assert!(h.click(10.0, 10.0).is_empty());
        assert!(h.machine.pending().is_none());
    }

    #[test]
    fn test_creation_requires_classes_and_lock() {
        let mut h = Harness::new();
        h.machine.set_tool(AnnotationTool::Polygon);
        h.classes = 0;
        assert_eq!(h.down(10.0, 10.0), vec![Effect::NoClasses]);

        h.classes = 1;
        h.can_edit = false;
        assert_eq!(h.down(10.0, 10.0), vec![Effect::LockBlocked]);
        assert!(h.machine.gesture().is_idle());
    }

    #[test]
    fn test_no_object_needs_no_class() {
        let mut h = Harness::new();
        h.classes = 0;
        h.machine.set_tool(AnnotationTool::NoObject);
        assert_eq!(h.click(50.0, 50.0), vec![Effect::Staged(GeometryKind::NoObject)]);
    }

    #[test]
    fn test_press_outside_image_is_ignored() {
        let mut h = Harness::new();
        h.machine.set_tool(AnnotationTool::Polygon);
        assert!(h.down(150.0, 10.0).is_empty());
        assert!(h.machine.gesture().is_idle());
    }

    #[test]
    fn test_polygon_closes_near_first_vertex() {
        let mut h = Harness::new();
        h.machine.set_tool(AnnotationTool::Polygon);
        h.click(10.0, 10.0);
        h.click(50.0, 10.0);
        h.click(50.0, 50.0);
        assert_eq!(h.machine.gesture().name(), "Drawing");

        assert_eq!(h.click(12.0, 11.0), vec![Effect::Staged(GeometryKind::Polygon)]);
        let Some(PendingShape {
            geometry: Geometry::Polygon { points },
            ..
        }) = h.machine.pending()
        else {
            panic!("expected pending polygon");
        };
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_enter_finishes_polyline_and_escape_cancels() {
        let mut h = Harness::new();
        h.machine.set_tool(AnnotationTool::Polyline);
        h.click(10.0, 10.0);
        assert!(matches!(
            h.press(Key::Enter, Modifiers::NONE).as_slice(),
            [Effect::Rejected(GeometryError::TooFewVertices { .. })]
        ));
        // Still drawing after a refused Enter
        h.click(30.0, 40.0);
        assert_eq!(
            h.press(Key::Enter, Modifiers::NONE),
            vec![Effect::Staged(GeometryKind::Polyline)]
        );

        h.click(5.0, 5.0);
        h.press(Key::Escape, Modifiers::NONE);
        assert!(h.machine.gesture().is_idle());
    }

    #[test]
    fn test_collinear_three_point_circle_is_rejected() {
        let mut h = Harness::new();
        h.machine.set_tool(AnnotationTool::Circle3Pt);
        h.click(0.0, 0.0);
        h.click(10.0, 0.0);
        assert_eq!(h.click(20.0, 0.0), vec![Effect::Rejected(GeometryError::Collinear)]);
        assert!(h.machine.pending().is_none());
        assert!(h.machine.gesture().is_idle());
    }

    #[test]
    fn test_tool_switch_cancels_drawing() {
        let mut h = Harness::new();
        h.machine.set_tool(AnnotationTool::Polygon);
        h.click(10.0, 10.0);
        h.machine.set_tool(AnnotationTool::Circle2Pt);
        assert!(h.machine.gesture().is_idle());
    }

    #[test]
    fn test_resize_selected_bbox_by_corner() {
        let (mut h, id) = Harness::new().with_annotation(Geometry::bbox(Rect::new(20.0, 20.0, 40.0, 40.0)));
        h.store.select(Some(Selection::annotation(id)));

        assert!(h.down(60.0, 60.0).is_empty());
        assert_eq!(
            h.store.selection().and_then(|s| s.handle),
            Some(Handle::Box(BoxHandle::BottomRight))
        );
        h.drag_to(70.0, 65.0);
        assert_eq!(h.machine.gesture().name(), "Resizing");

        let effects = h.up(70.0, 65.0);
        assert_eq!(
            effects,
            vec![Effect::Modified {
                id,
                before: Geometry::bbox(Rect::new(20.0, 20.0, 40.0, 40.0)),
            }]
        );
        assert_eq!(h.geometry(id), Geometry::bbox(Rect::new(20.0, 20.0, 50.0, 45.0)));
        assert_eq!(h.store.status("img"), ImageStatus::InProgress);
    }

    #[test]
    fn test_click_without_drag_selects_only() {
        let (mut h, id) = Harness::new().with_annotation(Geometry::bbox(Rect::new(20.0, 20.0, 40.0, 40.0)));
        h.down(40.0, 40.0);
        h.drag_to(41.0, 41.0);
        assert!(h.up(41.0, 41.0).is_empty());
        assert_eq!(h.store.selected_id(), Some(id));
        assert_eq!(h.geometry(id), Geometry::bbox(Rect::new(20.0, 20.0, 40.0, 40.0)));
    }

    #[test]
    fn test_drag_unselected_shape_translates_it() {
        let (mut h, id) = Harness::new().with_annotation(triangle());
        h.down(20.0, 20.0);
        h.drag_to(30.0, 25.0);
        assert_eq!(h.machine.gesture().name(), "DraggingShape");
        assert_eq!(h.up(30.0, 25.0).len(), 1);
        assert_eq!(h.geometry(id).vertices().unwrap()[0], Point::new(20.0, 15.0));
    }

    #[test]
    fn test_circle_interior_drag_moves_center() {
        let (mut h, id) = Harness::new().with_annotation(Geometry::Circle {
            center: Point::new(50.0, 50.0),
            radius: 20.0,
        });
        h.store.select(Some(Selection::annotation(id)));
        h.down(45.0, 45.0);
        h.drag_to(55.0, 45.0);
        assert_eq!(h.machine.gesture().name(), "DraggingCircleCenter");
        h.up(55.0, 45.0);
        assert_eq!(
            h.geometry(id),
            Geometry::Circle {
                center: Point::new(60.0, 50.0),
                radius: 20.0,
            }
        );
    }

    #[test]
    fn test_edge_click_inserts_vertex() {
        let (mut h, id) = Harness::new().with_annotation(triangle());
        h.store.select(Some(Selection::annotation(id)));

        let effects = h.click(35.0, 10.0);
        assert_eq!(
            effects,
            vec![Effect::Modified {
                id,
                before: triangle(),
            }]
        );
        let points = h.geometry(id).vertices().unwrap().to_vec();
        assert_eq!(points.len(), 4);
        assert_eq!(points[1], Point::new(35.0, 10.0));
        assert_eq!(h.store.selection().and_then(|s| s.vertex()), Some(1));
    }

    #[test]
    fn test_vertex_floor_rejects_delete() {
        let (mut h, id) = Harness::new().with_annotation(triangle());
        h.store.select(Some(Selection {
            id,
            handle: Some(Handle::Vertex(0)),
        }));
        assert_eq!(
            h.press(Key::Delete, Modifiers::NONE),
            vec![Effect::Rejected(GeometryError::TooFewVertices {
                kind: "Polygon",
                min: 3,
                actual: 2,
            })]
        );
        assert_eq!(h.geometry(id), triangle());
    }

    #[test]
    fn test_delete_without_vertex_removes_annotation() {
        let (mut h, id) = Harness::new().with_annotation(triangle());
        h.store.select(Some(Selection::annotation(id)));
        let effects = h.press(Key::Backspace, Modifiers::NONE);
        assert!(matches!(effects.as_slice(), [Effect::Deleted { index: 0, .. }]));
        assert!(h.store.is_empty());
    }

    #[test]
    fn test_arrow_nudge_with_shift() {
        let (mut h, id) = Harness::new().with_annotation(Geometry::bbox(Rect::new(20.0, 20.0, 10.0, 10.0)));
        h.store.select(Some(Selection::annotation(id)));

        assert_eq!(h.press(Key::Right, Modifiers::shift()).len(), 1);
        assert_eq!(h.geometry(id), Geometry::bbox(Rect::new(30.0, 20.0, 10.0, 10.0)));
        h.press(Key::Up, Modifiers::NONE);
        assert_eq!(h.geometry(id), Geometry::bbox(Rect::new(30.0, 19.0, 10.0, 10.0)));

        h.can_edit = false;
        assert_eq!(h.press(Key::Up, Modifiers::NONE), vec![Effect::LockBlocked]);
    }

    #[test]
    fn test_empty_press_clears_selection_and_pans() {
        let (mut h, id) = Harness::new().with_annotation(triangle());
        h.store.select(Some(Selection::annotation(id)));

        h.down(90.0, 90.0);
        assert!(h.store.selection().is_none());
        h.drag_to(95.0, 80.0);
        assert_eq!((h.transform.pan_x, h.transform.pan_y), (5.0, -10.0));
        h.up(95.0, 80.0);
        assert!(h.machine.gesture().is_idle());
    }

    #[test]
    fn test_drag_without_lock_is_blocked() {
        let (mut h, id) = Harness::new().with_annotation(triangle());
        h.can_edit = false;
        h.down(20.0, 20.0);
        assert_eq!(h.store.selected_id(), Some(id));
        assert_eq!(h.drag_to(40.0, 40.0), vec![Effect::LockBlocked]);
        assert_eq!(h.geometry(id), triangle());
    }

    #[test]
    fn test_cursor_tracks_image_position() {
        let mut h = Harness::new();
        h.transform = h.transform.zoom_to_cursor(2.0, Point::new(0.0, 0.0));
        h.drag_to(20.0, 10.0);
        let cursor = h.machine.cursor().unwrap();
        assert!((cursor.x - 10.0).abs() < 1e-4 && (cursor.y - 5.0).abs() < 1e-4);
    }
}
