//! Headless replay of a short annotation session.
//!
//! Two users share an in-memory backend. Alice draws and edits while Bob
//! edits the same box behind her back, so the run walks through creation,
//! a version conflict, an overwrite, undo and a final render.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    let config = annoscope::EngineConfig::load_from_default_path().unwrap_or_default();
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .init();

    if let Err(e) = pollster::block_on(replay(config)) {
        log::error!("Replay failed: {}", e);
        std::process::exit(1);
    }
}

// The replay needs a blocking executor and a terminal logger
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
async fn replay(config: annoscope::EngineConfig) -> Result<(), annoscope::EngineError> {
    use annoscope::{
        AnnotationEngine, AnnotationTool, ClassDef, ConflictResolution, EngineError, Geometry,
        ImageInfo, ImageSize, InMemoryBackend, Key, LogHost, Modifiers, MouseButton, Point,
        RecordingSurface,
    };
    use web_time::Instant;

    let alice = InMemoryBackend::new("alice");
    let bob = alice.as_user("bob");

    let mut engine = AnnotationEngine::new(LogHost, config, ImageSize::new(800.0, 600.0));
    engine.set_classes(vec![
        ClassDef::new(1, "car", [230, 60, 60]),
        ClassDef::new(2, "person", [60, 120, 230]),
    ]);
    let image = ImageInfo::new("demo", "img-001", 640.0, 480.0);
    engine
        .switch_image(&alice, &alice, image, Instant::now())
        .await?;

    let view = |engine: &AnnotationEngine<LogHost>, x: f32, y: f32| {
        engine.transform().image_to_view(Point::new(x, y))
    };

    // Box around a car
    engine.set_tool(AnnotationTool::Bbox);
    engine.pointer_down(view(&engine, 100.0, 100.0), MouseButton::Left);
    engine.pointer_move(view(&engine, 220.0, 180.0));
    engine.pointer_up(view(&engine, 220.0, 180.0));
    let car = engine.choose_class(1)?;
    let report = engine.flush(&alice).await;
    log::info!("First flush: {:?}", report);

    // Bob nudges the same box on the server
    let remote = engine
        .store()
        .get(car)
        .and_then(|a| a.remote_id.clone())
        .ok_or(EngineError::UnknownAnnotation(car))?;
    if let Some(mut geometry) = alice.annotation(&remote).map(|a| a.geometry) {
        geometry.translate(4.0, 0.0);
        bob.edit_as_other(&remote, geometry)?;
    }

    // Alice drags it at the stale version
    engine.set_tool(AnnotationTool::Select);
    engine.pointer_down(view(&engine, 160.0, 140.0), MouseButton::Left);
    engine.pointer_move(view(&engine, 180.0, 150.0));
    engine.pointer_up(view(&engine, 180.0, 150.0));
    let report = engine.flush(&alice).await;
    log::info!("Second flush: {:?}", report);
    if engine.conflict(car).is_some() {
        engine
            .resolve_conflict(&alice, car, ConflictResolution::Overwrite)
            .await?;
    }

    // Triangle for a person, closed by clicking its first vertex
    engine.set_tool(AnnotationTool::Polygon);
    for (x, y) in [(300.0, 300.0), (360.0, 300.0), (330.0, 360.0), (300.0, 300.0)] {
        engine.pointer_down(view(&engine, x, y), MouseButton::Left);
        engine.pointer_up(view(&engine, x, y));
    }
    engine.choose_class(2)?;
    engine.flush(&alice).await;

    // Take the triangle back
    engine.key(Key::Char('z'), Modifiers::ctrl());
    engine.flush(&alice).await;

    let mut surface = RecordingSurface::new();
    engine.render(&mut surface);

    let final_geometry = alice.annotation(&remote).map(|a| a.geometry);
    log::info!(
        "Done: {} local annotations, {} on server, {} draw calls, car at {:?}",
        engine.store().len(),
        alice.annotation_count(),
        surface.paint_count(),
        final_geometry.as_ref().and_then(Geometry::as_rect)
    );

    engine.close(&alice, &alice).await;
    Ok(())
}
