//! The image currently open for annotation.

use serde::{Deserialize, Serialize};

use super::annotation::{ImageId, ProjectId};
use super::geometry::ImageSize;

/// Identity and pixel size of an image, supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub project_id: ProjectId,
    pub image_id: ImageId,
    pub size: ImageSize,
}

impl ImageInfo {
    pub fn new(
        project_id: impl Into<ProjectId>,
        image_id: impl Into<ImageId>,
        width: f32,
        height: f32,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            image_id: image_id.into(),
            size: ImageSize::new(width, height),
        }
    }
}
