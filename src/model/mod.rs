//! Data models for the annotation engine.

mod annotation;
mod category;
mod geometry;
mod image;

pub use annotation::{
    Annotation, AnnotationId, Clipped, Geometry, GeometryKind, ImageId, ProjectId, RemoteId,
};
pub use category::ClassDef;
pub use geometry::{
    EdgeHit, ImageSize, Point, Rect, circle_from_three_points, distance_to_chain,
    distance_to_segment, nearest_edge, nearest_vertex, point_in_polygon, project_onto_segment,
    round_coord,
};
pub use image::ImageInfo;
