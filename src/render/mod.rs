//! Immediate-mode redraw of the annotation view.
//!
//! Every relevant state change redraws the whole frame from the current
//! in-memory state: background, image, committed annotations in draw order,
//! handles of the selection, the in-progress draft, a pending shape and the
//! lock banner. Nothing is retained between frames.

mod color;
mod frame;
mod surface;

pub use color::{Color, hsv_to_rgb};
pub use frame::{Frame, Style};
pub use surface::{DrawCommand, DrawSurface, RecordingSurface};

use crate::model::{Annotation, ClassDef, Geometry, ImageInfo, Point, Rect};
use crate::state::AnnotationStore;
use crate::tools::{Draft, ToolRegistry};
use crate::zoom_math::ViewTransform;

/// Height of the lock banner, view pixels.
const BANNER_HEIGHT: f32 = 28.0;

/// Everything one frame is drawn from.
pub struct Scene<'a> {
    pub store: &'a AnnotationStore,
    pub registry: &'a ToolRegistry,
    pub image: Option<&'a ImageInfo>,
    pub classes: &'a [ClassDef],
    pub draft: Option<&'a Draft>,
    /// Pointer in image space, for rubber bands
    pub cursor: Option<Point>,
    pub pending: Option<&'a Geometry>,
    /// Set when another session holds the image lock
    pub lock_holder: Option<&'a str>,
}

impl Scene<'_> {
    fn class_color(&self, annotation: &Annotation) -> Color {
        annotation
            .class_id
            .and_then(|id| self.classes.iter().find(|c| c.id == id))
            .map(|c| Color::from_rgb8(c.color))
            .unwrap_or(Color::UNCLASSIFIED)
    }
}

/// Draws scenes onto a [`DrawSurface`].
#[derive(Debug, Default)]
pub struct RenderPipeline {
    frames: u64,
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames drawn so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Redraw the full frame.
    pub fn render(&mut self, surface: &mut dyn DrawSurface, transform: &ViewTransform, scene: &Scene<'_>) {
        self.frames += 1;
        surface.clear(Color::BACKGROUND);

        let Some(image) = scene.image else {
            log::trace!("Frame {}: no image", self.frames);
            return;
        };
        surface.draw_image(transform.image_rect_in_view());

        let mut frame = Frame::new(surface, transform);
        let selected = scene.store.selected_id();
        let mut drawn = 0usize;

        for annotation in scene.store.for_image(&image.image_id) {
            let Some(tool) = scene.registry.for_geometry(&annotation.geometry) else {
                continue;
            };
            let is_selected = selected == Some(annotation.id);
            let style = Style::annotation(scene.class_color(annotation), is_selected);
            tool.render(&annotation.geometry, &mut frame, &style);
            drawn += 1;
        }

        // Handles go on top of every shape
        if let Some(annotation) = scene
            .store
            .selected()
            .filter(|a| a.image_id == image.image_id)
            && let Some(tool) = scene.registry.for_geometry(&annotation.geometry)
        {
            tool.render_handles(&annotation.geometry, &mut frame, &Style::handle());
        }

        if let Some(draft) = scene.draft
            && let Some(tool) = scene.registry.get(draft.tool)
        {
            tool.render_preview(draft, scene.cursor, &mut frame, &Style::preview(Color::WHITE));
        }

        if let Some(pending) = scene.pending
            && let Some(tool) = scene.registry.for_geometry(pending)
        {
            tool.render(pending, &mut frame, &Style::preview(Color::WHITE));
        }

        if let Some(holder) = scene.lock_holder {
            Self::lock_banner(frame.surface(), transform, holder);
        }

        log::trace!("Frame {}: {} annotations", self.frames, drawn);
    }

    fn lock_banner(surface: &mut dyn DrawSurface, transform: &ViewTransform, holder: &str) {
        let banner = Rect::new(0.0, 0.0, transform.viewport.width, BANNER_HEIGHT);
        surface.fill_rect(banner, Color::BANNER);
        surface.fill_text(
            &format!("Locked by {} (view only)", holder),
            Point::new(10.0, BANNER_HEIGHT * 0.7),
            Color::WHITE,
            14.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageSize;
    use crate::state::Selection;
    use crate::tools::AnnotationTool;

    struct Fixture {
        store: AnnotationStore,
        registry: ToolRegistry,
        image: ImageInfo,
        classes: Vec<ClassDef>,
        transform: ViewTransform,
    }

    impl Fixture {
        fn new() -> Self {
            let size = ImageSize::new(100.0, 100.0);
            let mut store = AnnotationStore::new();
            store.insert(
                Annotation::new(0, "p", "img", Geometry::bbox(Rect::new(10.0, 10.0, 20.0, 20.0)))
                    .with_class(1, "car"),
            );
            store.insert(Annotation::new(0, "p", "other", Geometry::NoObject));
            Self {
                store,
                registry: ToolRegistry::new(),
                image: ImageInfo::new("p", "img", 100.0, 100.0),
                classes: vec![ClassDef::new(1, "car", [255, 0, 0])],
                transform: ViewTransform::centered(size, size),
            }
        }

        fn scene(&self) -> Scene<'_> {
            Scene {
                store: &self.store,
                registry: &self.registry,
                image: Some(&self.image),
                classes: &self.classes,
                draft: None,
                cursor: None,
                pending: None,
                lock_holder: None,
            }
        }
    }

    fn strokes(surface: &RecordingSurface) -> Vec<Color> {
        surface
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Stroke { color, .. } => Some(*color),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_frame_starts_with_clear_and_image() {
        let fixture = Fixture::new();
        let mut surface = RecordingSurface::new();
        let mut pipeline = RenderPipeline::new();
        pipeline.render(&mut surface, &fixture.transform, &fixture.scene());

        assert_eq!(surface.commands[0], DrawCommand::Clear(Color::BACKGROUND));
        assert_eq!(
            surface.commands[1],
            DrawCommand::Image(Rect::new(0.0, 0.0, 100.0, 100.0))
        );
        // Only the current image's box, in its class color
        assert_eq!(strokes(&surface), vec![Color::rgb(1.0, 0.0, 0.0)]);
        assert_eq!(pipeline.frame_count(), 1);
    }

    #[test]
    fn test_selected_annotation_gets_handles() {
        let mut fixture = Fixture::new();
        let id = fixture.store.for_image("img").map(|a| a.id).next().unwrap();
        fixture.store.select(Some(Selection::annotation(id)));

        let mut surface = RecordingSurface::new();
        RenderPipeline::new().render(&mut surface, &fixture.transform, &fixture.scene());
        let handles = surface
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokeRect { .. }))
            .count();
        assert_eq!(handles, 8);
    }

    #[test]
    fn test_draft_and_pending_are_dashed() {
        let fixture = Fixture::new();
        let draft = Draft::new(AnnotationTool::Polygon, Point::new(50.0, 50.0));
        let pending = Geometry::Circle {
            center: Point::new(70.0, 70.0),
            radius: 5.0,
        };
        let scene = Scene {
            draft: Some(&draft),
            cursor: Some(Point::new(60.0, 60.0)),
            pending: Some(&pending),
            ..fixture.scene()
        };

        let mut surface = RecordingSurface::new();
        RenderPipeline::new().render(&mut surface, &fixture.transform, &scene);
        let dashed = surface
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::LineDash(d) if !d.is_empty()))
            .count();
        assert_eq!(dashed, 2);
    }

    #[test]
    fn test_lock_banner_names_holder() {
        let fixture = Fixture::new();
        let scene = Scene {
            lock_holder: Some("bob"),
            ..fixture.scene()
        };
        let mut surface = RecordingSurface::new();
        RenderPipeline::new().render(&mut surface, &fixture.transform, &scene);
        assert_eq!(surface.texts(), vec!["Locked by bob (view only)"]);
    }

    #[test]
    fn test_no_image_only_clears() {
        let fixture = Fixture::new();
        let scene = Scene {
            image: None,
            ..fixture.scene()
        };
        let mut surface = RecordingSurface::new();
        RenderPipeline::new().render(&mut surface, &fixture.transform, &scene);
        assert_eq!(surface.commands, vec![DrawCommand::Clear(Color::BACKGROUND)]);
    }
}
