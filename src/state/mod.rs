//! In-memory editing state shared by the interaction machine and renderer.

mod store;

pub use store::{AnnotationStore, ImageStatus, Selection};
