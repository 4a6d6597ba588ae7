//! Annotation collection, selection and per-image review status.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Annotation, AnnotationId, Geometry, ImageId, Point};
use crate::tools::{Handle, ToolRegistry};

/// Review status of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    #[default]
    Unlabeled,
    /// Edited since the last confirmation.
    InProgress,
    Confirmed,
}

/// The selected annotation and, optionally, one of its handles or vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub id: AnnotationId,
    pub handle: Option<Handle>,
}

impl Selection {
    pub fn annotation(id: AnnotationId) -> Self {
        Self { id, handle: None }
    }

    /// Index of the selected vertex, if a vertex is selected.
    pub fn vertex(&self) -> Option<usize> {
        match self.handle {
            Some(Handle::Vertex(i)) => Some(i),
            _ => None,
        }
    }
}

/// Storage for annotations of every loaded image, in draw order.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    /// Draw order: later entries paint over earlier ones.
    annotations: Vec<Annotation>,
    /// Counter for generating unique local IDs.
    next_id: AnnotationId,
    selection: Option<Selection>,
    status: HashMap<ImageId, ImageStatus>,
    /// Set when annotations or selection change; cleared after a redraw.
    dirty: bool,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            annotations: Vec::new(),
            next_id: 1,
            selection: None,
            status: HashMap::new(),
            dirty: true, // Start dirty so the first frame is drawn
        }
    }

    /// Check if the store has been modified since last clear_dirty().
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Reserve a fresh local ID.
    pub fn allocate_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append an annotation on top of the draw order. An ID of 0 is replaced
    /// with a fresh one. Returns the ID.
    pub fn insert(&mut self, mut annotation: Annotation) -> AnnotationId {
        if annotation.id == 0 {
            annotation.id = self.allocate_id();
        } else {
            self.next_id = self.next_id.max(annotation.id + 1);
        }
        let id = annotation.id;
        self.annotations.push(annotation);
        self.mark_dirty();
        id
    }

    /// Put an annotation back at a draw-order position (used by undo).
    pub fn restore(&mut self, index: usize, annotation: Annotation) {
        self.next_id = self.next_id.max(annotation.id + 1);
        let index = index.min(self.annotations.len());
        self.annotations.insert(index, annotation);
        self.mark_dirty();
    }

    /// Remove an annotation, returning its draw-order position and value.
    pub fn remove(&mut self, id: AnnotationId) -> Option<(usize, Annotation)> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        let removed = self.annotations.remove(index);
        if self.selected_id() == Some(id) {
            self.selection = None;
        }
        self.mark_dirty();
        Some((index, removed))
    }

    /// Remove every annotation on `image` matching `predicate`.
    pub fn remove_where(
        &mut self,
        image: &str,
        mut predicate: impl FnMut(&Annotation) -> bool,
    ) -> Vec<(usize, Annotation)> {
        let ids: Vec<AnnotationId> = self
            .for_image(image)
            .filter(|a| predicate(a))
            .map(|a| a.id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Replace all annotations of `image` with an authoritative set.
    pub fn replace_image(&mut self, image: &str, annotations: Vec<Annotation>) -> Vec<AnnotationId> {
        self.annotations.retain(|a| a.image_id != image);
        if self
            .selected_id()
            .is_some_and(|id| !self.annotations.iter().any(|a| a.id == id))
        {
            self.selection = None;
        }
        let ids = annotations
            .into_iter()
            .map(|mut a| {
                // Server copies get fresh local ids
                a.id = 0;
                self.insert(a)
            })
            .collect();
        self.mark_dirty();
        ids
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    pub fn find_by_remote(&self, remote_id: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.remote_id.as_deref() == Some(remote_id))
    }

    /// Swap in a new geometry, returning the old one.
    pub fn set_geometry(&mut self, id: AnnotationId, geometry: Geometry) -> Option<Geometry> {
        let annotation = self.get_mut(id)?;
        let old = std::mem::replace(&mut annotation.geometry, geometry);
        self.mark_dirty();
        Some(old)
    }

    /// Annotations of one image in draw order.
    pub fn for_image<'a>(&'a self, image: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations.iter().filter(move |a| a.image_id == image)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select(&mut self, selection: Option<Selection>) {
        if self.selection != selection {
            self.selection = selection;
            self.mark_dirty();
        }
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn selected_id(&self) -> Option<AnnotationId> {
        self.selection.map(|s| s.id)
    }

    pub fn selected(&self) -> Option<&Annotation> {
        self.selected_id().and_then(|id| self.get(id))
    }

    /// First annotation on `image` hit by `point`, in draw order.
    ///
    /// Whole-image kinds never match.
    pub fn hit_test(
        &self,
        image: &str,
        point: Point,
        tolerance: f32,
        registry: &ToolRegistry,
    ) -> Option<AnnotationId> {
        self.for_image(image)
            .filter(|a| !a.kind().is_whole_image())
            .find(|a| {
                registry
                    .for_geometry(&a.geometry)
                    .is_some_and(|tool| tool.hit_test(&a.geometry, point, tolerance))
            })
            .map(|a| a.id)
    }

    // ========================================================================
    // Review Status
    // ========================================================================

    pub fn status(&self, image: &str) -> ImageStatus {
        self.status.get(image).copied().unwrap_or_default()
    }

    pub fn set_status(&mut self, image: &str, status: ImageStatus) {
        self.status.insert(image.to_string(), status);
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn boxed(image: &str, x: f32) -> Annotation {
        Annotation::new(0, "p", image, Geometry::bbox(Rect::new(x, 0.0, 20.0, 20.0)))
    }

    #[test]
    fn test_insert_assigns_ids_in_draw_order() {
        let mut store = AnnotationStore::new();
        let a = store.insert(boxed("img", 0.0));
        let b = store.insert(boxed("img", 10.0));
        assert_ne!(a, b);
        let order: Vec<_> = store.for_image("img").map(|a| a.id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn test_hit_test_first_in_draw_order() {
        let registry = ToolRegistry::new();
        let mut store = AnnotationStore::new();
        store.insert(Annotation::new(0, "p", "img", Geometry::Classification));
        let first = store.insert(boxed("img", 0.0));
        store.insert(boxed("img", 10.0));
        store.insert(boxed("other", 0.0));

        // Overlap region of both boxes on "img"
        assert_eq!(store.hit_test("img", Point::new(15.0, 5.0), 2.0, &registry), Some(first));
        assert_eq!(store.hit_test("img", Point::new(100.0, 5.0), 2.0, &registry), None);
    }

    #[test]
    fn test_remove_clears_selection_and_restore_keeps_position() {
        let mut store = AnnotationStore::new();
        let a = store.insert(boxed("img", 0.0));
        let b = store.insert(boxed("img", 10.0));
        store.select(Some(Selection::annotation(a)));
        store.clear_dirty();

        let (index, removed) = store.remove(a).unwrap();
        assert_eq!(index, 0);
        assert!(store.selection().is_none());
        assert!(store.is_dirty());

        store.restore(index, removed);
        let order: Vec<_> = store.iter().map(|a| a.id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn test_replace_image_keeps_other_images() {
        let mut store = AnnotationStore::new();
        store.insert(boxed("img", 0.0));
        store.insert(boxed("other", 0.0));
        let ids = store.replace_image("img", vec![boxed("img", 5.0), boxed("img", 6.0)]);
        assert_eq!(ids.len(), 2);
        assert_eq!(store.for_image("img").count(), 2);
        assert_eq!(store.for_image("other").count(), 1);
    }

    #[test]
    fn test_status_defaults_to_unlabeled() {
        let mut store = AnnotationStore::new();
        assert_eq!(store.status("img"), ImageStatus::Unlabeled);
        store.set_status("img", ImageStatus::InProgress);
        assert_eq!(store.status("img"), ImageStatus::InProgress);
    }
}
