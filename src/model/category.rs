//! Annotation class definitions supplied by the active task.

use serde::{Deserialize, Serialize};

use crate::render::hsv_to_rgb;

/// A class the user can assign to a new annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Unique identifier for the class
    pub id: u32,
    /// Display name of the class
    pub name: String,
    /// RGB color for the class
    pub color: [u8; 3],
}

impl ClassDef {
    /// Create a new class with the given ID, name, and color.
    pub fn new(id: u32, name: &str, color: [u8; 3]) -> Self {
        Self {
            id,
            name: name.to_string(),
            color,
        }
    }

    /// Create a class with a color spread around the hue wheel by ID.
    pub fn with_generated_color(id: u32, name: &str) -> Self {
        // Golden angle gives a good distribution for consecutive IDs
        let hue = (id as f32 * 137.5) % 360.0;
        let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.9);
        Self::new(
            id,
            name,
            [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_colors_differ() {
        let c1 = ClassDef::with_generated_color(1, "car");
        let c2 = ClassDef::with_generated_color(2, "person");
        assert_ne!(c1.color, c2.color);
    }
}
