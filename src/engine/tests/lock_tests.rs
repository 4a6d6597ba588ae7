//! Per-image locking: read-only sessions, heartbeat loss and image switches.

use std::time::Duration;

use super::*;
use crate::engine::FlushReport;
use crate::interaction::{Gesture, Key, Modifiers};
use crate::model::{Geometry, Rect};
use crate::persistence::{LockApi, LockState};

fn later(secs: u64) -> Instant {
    Instant::now() + Duration::from_secs(secs)
}

#[test]
fn test_locked_by_other_is_view_only() {
    let backend = InMemoryBackend::new("alice");
    pollster::block_on(backend.as_user("bob").acquire("p", "img")).unwrap();

    let mut engine = open_as(&backend);
    assert_eq!(
        engine.host().last(),
        Some(&Notice::LockBlocked {
            holder: Some("bob".to_string())
        })
    );

    engine.set_tool(AnnotationTool::Polygon);
    engine.host_mut().clear();
    engine.pointer_down(Point::new(10.0, 10.0), MouseButton::Left);
    assert!(matches!(
        engine.host().as_slice(),
        [Notice::LockBlocked { .. }]
    ));
    assert!(engine.gesture().is_idle());

    // Viewing still works
    engine.zoom_at(Point::new(50.0, 50.0), true);
    assert!(engine.transform().zoom > 1.0);

    let mut surface = crate::render::RecordingSurface::new();
    engine.render(&mut surface);
    assert_eq!(surface.texts(), vec!["Locked by bob (view only)"]);
}

#[test]
fn test_heartbeat_keeps_lock() {
    let (mut engine, backend) = session();
    assert!(!pollster::block_on(engine.tick(&backend, Instant::now())));
    assert_eq!(backend.call_count("heartbeat"), 0);

    assert!(!pollster::block_on(engine.tick(&backend, later(121))));
    assert_eq!(backend.call_count("heartbeat"), 1);
    assert!(matches!(engine.lock_state(), LockState::Held { .. }));
}

#[test]
fn test_heartbeat_failure_disables_editing() {
    let (mut engine, backend) = session();
    let id = saved_box(&mut engine, &backend);

    backend.set_offline(true);
    assert!(pollster::block_on(engine.tick(&backend, later(121))));
    assert!(engine.host().contains(&Notice::LockLost));
    assert_eq!(engine.lock_state(), &LockState::NotHeld);

    engine.host_mut().clear();
    engine.key(Key::Right, Modifiers::NONE);
    assert!(matches!(
        engine.host().as_slice(),
        [Notice::LockBlocked { holder: None }]
    ));
    assert!(!engine.undo());
    assert_eq!(
        engine.store().get(id).unwrap().geometry,
        Geometry::bbox(Rect::new(10.0, 10.0, 20.0, 20.0))
    );
}

#[test]
fn test_lock_loss_mid_drag_restores_shape() {
    let (mut engine, backend) = session();
    let id = saved_box(&mut engine, &backend);

    engine.set_tool(AnnotationTool::Select);
    engine.pointer_down(Point::new(20.0, 20.0), MouseButton::Left);
    engine.pointer_move(Point::new(40.0, 40.0));
    assert!(matches!(engine.gesture(), Gesture::Dragging(_)));

    backend.set_offline(true);
    pollster::block_on(engine.tick(&backend, later(121)));
    assert!(engine.gesture().is_idle());
    assert_eq!(
        engine.store().get(id).unwrap().geometry,
        Geometry::bbox(Rect::new(10.0, 10.0, 20.0, 20.0))
    );

    engine.pointer_up(Point::new(40.0, 40.0));
    assert_eq!(engine.queued_mutations(), 0);
}

#[test]
fn test_switch_image_moves_lock() {
    let (mut engine, backend) = session();
    draw_box(&mut engine, (10.0, 10.0), (30.0, 30.0));
    assert!(engine.pending_geometry().is_some());

    pollster::block_on(engine.switch_image(&backend, &backend, image("next"), Instant::now()))
        .unwrap();
    assert_eq!(backend.lock_holder("p", "img"), None);
    assert_eq!(backend.lock_holder("p", "next").as_deref(), Some("alice"));
    assert!(engine.pending_geometry().is_none());
    assert_eq!(engine.image().map(|i| i.image_id.as_str()), Some("next"));
}

#[test]
fn test_close_releases_lock() {
    let (mut engine, backend) = session();
    pollster::block_on(engine.close(&backend, &backend));
    assert_eq!(backend.lock_holder("p", "img"), None);
    assert!(engine.image().is_none());
}

#[test]
fn test_close_sends_queued_edits_first() {
    let (mut engine, backend) = session();
    draw_box(&mut engine, (10.0, 10.0), (30.0, 30.0));
    engine.choose_class(1).unwrap();
    assert_eq!(engine.queued_mutations(), 1);

    pollster::block_on(engine.close(&backend, &backend));
    assert_eq!(backend.annotation_count(), 1);
    assert_eq!(engine.queued_mutations(), 0);
}

#[test]
fn test_switch_image_saves_edits_under_old_lock() {
    let (mut engine, backend) = session();
    let id = saved_box(&mut engine, &backend);
    let remote = remote_id(&engine, id);
    drag(&mut engine, (20.0, 20.0), (25.0, 25.0));
    assert_eq!(engine.queued_mutations(), 1);

    pollster::block_on(engine.switch_image(&backend, &backend, image("next"), Instant::now()))
        .unwrap();
    assert_eq!(backend.call_count("update"), 1);
    assert_eq!(engine.queued_mutations(), 0);
    assert!(!engine.history().can_undo());

    // Bob takes the old image; nothing of alice's follows
    let bob = backend.as_user("bob");
    pollster::block_on(bob.acquire("p", "img")).unwrap();
    let report = pollster::block_on(engine.flush(&backend));
    assert_eq!(report, FlushReport::default());
    assert_eq!(backend.call_count("update"), 1);
    assert_eq!(
        backend.annotation(&remote).map(|a| a.geometry),
        Some(Geometry::bbox(Rect::new(15.0, 15.0, 20.0, 20.0)))
    );
}

#[test]
fn test_edits_queued_before_lock_loss_are_never_sent() {
    let (mut engine, backend) = session();
    saved_box(&mut engine, &backend);
    drag(&mut engine, (20.0, 20.0), (25.0, 25.0));

    backend.set_offline(true);
    assert!(pollster::block_on(engine.tick(&backend, later(121))));
    backend.set_offline(false);

    let report = pollster::block_on(engine.flush(&backend));
    assert_eq!(report, FlushReport::default());
    assert_eq!(engine.queued_mutations(), 1);

    engine.host_mut().clear();
    pollster::block_on(engine.switch_image(&backend, &backend, image("next"), Instant::now()))
        .unwrap();
    assert_eq!(engine.queued_mutations(), 0);
    assert_eq!(backend.call_count("update"), 0);
    assert!(
        engine
            .host()
            .iter()
            .any(|n| matches!(n, Notice::Warning(m) if m.contains("discarded")))
    );
}
