//! Annoscope - interactive vector annotation engine
//!
//! Draws and edits bounding boxes, polygons, polylines, circles and
//! whole-image labels over a zoomable image, keeps an undo history of
//! saved changes, and syncs with a remote backend using optimistic
//! versioning and per-image edit locks.
//!
//! The host owns the window and event loop. It feeds pointer and key input
//! into an [`AnnotationEngine`], implements [`HostUi`] for notifications,
//! provides a [`DrawSurface`] for rendering, and drives the async
//! [`AnnotationEngine::flush`] and [`AnnotationEngine::tick`] calls.

pub mod config;
pub mod constants;
pub mod engine;
pub mod interaction;
pub mod keybindings;
pub mod model;
pub mod persistence;
pub mod render;
pub mod state;
pub mod tools;
pub mod undo;
pub mod zoom_math;

pub use config::{EngineConfig, Preferences};
pub use engine::{AnnotationEngine, EngineError, FlushReport, HostUi, LogHost, Notice};
pub use interaction::{Key, Modifiers, MouseButton};
pub use model::{Annotation, ClassDef, Geometry, GeometryKind, ImageInfo, ImageSize, Point, Rect};
pub use persistence::{AnnotationApi, ConflictResolution, InMemoryBackend, LockApi};
pub use render::{DrawSurface, RecordingSurface};
pub use tools::AnnotationTool;
