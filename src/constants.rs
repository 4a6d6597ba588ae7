//! Global constants for the annotation engine

use std::time::Duration;

/// Hit radius for handles and vertices, in view pixels
pub const HANDLE_HIT_RADIUS: f32 = 8.0;

/// Drawn size of a handle square, in view pixels
pub const HANDLE_DRAW_SIZE: f32 = 8.0;

/// Distance (view pixels) from the first vertex that closes a polygon
pub const POLYGON_CLOSE_THRESHOLD: f32 = 15.0;

/// Minimum side length of a bounding box while resizing (image pixels)
pub const MIN_BBOX_SIDE: f32 = 10.0;

/// Minimum width/height for a freshly drawn bounding box (image pixels)
pub const MIN_BBOX_DRAW_SIZE: f32 = 1.0;

/// Minimum vertex count of a polygon
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Minimum vertex count of a polyline
pub const MIN_POLYLINE_VERTICES: usize = 2;

/// Smallest radius a circle may have (image pixels)
pub const MIN_CIRCLE_RADIUS: f32 = 1.0;

/// Bisector slopes closer than this are treated as parallel (collinear input)
pub const COLLINEAR_EPSILON: f32 = 1e-6;

/// Pointer travel (view pixels) before a press becomes a drag
pub const MIN_DRAG_DISTANCE: f32 = 3.0;

/// Arrow-key nudge step (image pixels)
pub const NUDGE_STEP: f32 = 1.0;

/// Arrow-key nudge step with the modifier held (image pixels)
pub const NUDGE_STEP_LARGE: f32 = 10.0;

/// Default bounded undo depth
pub const UNDO_HISTORY_SIZE: usize = 100;

/// Lock heartbeat period
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(120);

/// Server-side lock expiry the heartbeat must beat
pub const LOCK_EXPIRY: Duration = Duration::from_secs(300);

/// Zoom limits and step factor
pub mod zoom {
    /// Minimum zoom level
    pub const MIN: f32 = 0.05;
    /// Maximum zoom level
    pub const MAX: f32 = 40.0;
    /// Multiplicative zoom step
    pub const FACTOR: f32 = 1.2;
}

/// Decimal places kept for persisted coordinates
pub const COORDINATE_DECIMALS: i32 = 2;
