//! Session-level tests: input through the engine, flushed to an in-memory
//! backend shared with a second user.

mod lock_tests;

use web_time::Instant;

use super::{AnnotationEngine, Notice};
use crate::config::EngineConfig;
use crate::interaction::MouseButton;
use crate::model::{AnnotationId, ClassDef, ImageInfo, ImageSize, Point};
use crate::persistence::InMemoryBackend;
use crate::tools::AnnotationTool;

type TestEngine = AnnotationEngine<Vec<Notice>>;

/// Engine with a 100x100 image open, view space equal to image space, and
/// the lock held by "alice".
fn session() -> (TestEngine, InMemoryBackend) {
    let backend = InMemoryBackend::new("alice");
    let engine = open_as(&backend);
    (engine, backend)
}

fn open_as(backend: &InMemoryBackend) -> TestEngine {
    let mut engine = AnnotationEngine::new(
        Vec::new(),
        EngineConfig::default(),
        ImageSize::new(100.0, 100.0),
    );
    engine.set_classes(vec![
        ClassDef::new(1, "car", [255, 0, 0]),
        ClassDef::new(2, "person", [0, 0, 255]),
    ]);
    pollster::block_on(engine.switch_image(backend, backend, image("img"), Instant::now()))
        .unwrap();
    engine
}

fn image(id: &str) -> ImageInfo {
    ImageInfo::new("p", id, 100.0, 100.0)
}

fn draw_box(engine: &mut TestEngine, from: (f32, f32), to: (f32, f32)) {
    engine.set_tool(AnnotationTool::Bbox);
    engine.pointer_down(Point::new(from.0, from.1), MouseButton::Left);
    engine.pointer_move(Point::new(to.0, to.1));
    engine.pointer_up(Point::new(to.0, to.1));
}

/// Draw a car box and save it. Returns its local id.
fn saved_box(engine: &mut TestEngine, backend: &InMemoryBackend) -> AnnotationId {
    draw_box(engine, (10.0, 10.0), (30.0, 30.0));
    let id = engine.choose_class(1).unwrap();
    pollster::block_on(engine.flush(backend));
    id
}

fn drag(engine: &mut TestEngine, from: (f32, f32), to: (f32, f32)) {
    engine.set_tool(AnnotationTool::Select);
    engine.pointer_down(Point::new(from.0, from.1), MouseButton::Left);
    engine.pointer_move(Point::new(to.0, to.1));
    engine.pointer_up(Point::new(to.0, to.1));
}

fn remote_id(engine: &TestEngine, id: AnnotationId) -> String {
    engine.store().get(id).unwrap().remote_id.clone().unwrap()
}
