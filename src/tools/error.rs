//! Validation errors for annotation geometry.

use thiserror::Error;

/// Reasons a geometry cannot be created or committed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{kind} needs at least {min} vertices, got {actual}")]
    TooFewVertices {
        kind: &'static str,
        min: usize,
        actual: usize,
    },

    #[error("points are collinear; no circle passes through them")]
    Collinear,

    #[error("circle radius must be positive, got {0}")]
    NonPositiveRadius(f32),

    #[error("box size must not be negative ({width} x {height})")]
    NegativeSize { width: f32, height: f32 },

    #[error("box is too small ({width} x {height}, minimum {min})")]
    TooSmall { width: f32, height: f32, min: f32 },

    #[error("geometry contains non-finite coordinates")]
    NonFinite,

    #[error("{expected} tool cannot handle {found} geometry")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{kind} has no vertices")]
    NoVertices { kind: &'static str },
}

impl GeometryError {
    /// Create a wrong-kind error from two kind names.
    pub fn wrong_kind(expected: &'static str, found: &'static str) -> Self {
        Self::WrongKind { expected, found }
    }
}
