//! Image ↔ view coordinate mapping.
//!
//! `view = image * zoom + offset`, where the offset centers the zoom-scaled
//! image in the viewport and then adds the pan vector. Zoom must be positive;
//! callers guard against anything else.

use crate::model::{ImageSize, Point, Rect};

/// Pan/zoom transform state for one viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    /// Viewport size in view pixels.
    pub viewport: ImageSize,
    /// Image size in image pixels.
    pub image: ImageSize,
}

impl ViewTransform {
    /// Create a transform with the given zoom and pan.
    pub fn new(zoom: f32, pan_x: f32, pan_y: f32, viewport: ImageSize, image: ImageSize) -> Self {
        Self {
            zoom,
            pan_x,
            pan_y,
            viewport,
            image,
        }
    }

    /// Zoom 1, no pan: image centered in the viewport.
    pub fn centered(viewport: ImageSize, image: ImageSize) -> Self {
        Self::new(1.0, 0.0, 0.0, viewport, image)
    }

    /// Offset applied after scaling: centering term plus pan.
    pub fn offset(&self) -> (f32, f32) {
        (
            (self.viewport.width - self.image.width * self.zoom) / 2.0 + self.pan_x,
            (self.viewport.height - self.image.height * self.zoom) / 2.0 + self.pan_y,
        )
    }

    /// Map an image-space point to view space.
    pub fn image_to_view(&self, p: Point) -> Point {
        let (ox, oy) = self.offset();
        Point::new(p.x * self.zoom + ox, p.y * self.zoom + oy)
    }

    /// Map a view-space point back to image space.
    pub fn view_to_image(&self, p: Point) -> Point {
        let (ox, oy) = self.offset();
        Point::new((p.x - ox) / self.zoom, (p.y - oy) / self.zoom)
    }

    /// Convert a view-space distance into image pixels.
    pub fn view_len_to_image(&self, len: f32) -> f32 {
        len / self.zoom
    }

    /// Convert an image-space distance into view pixels.
    pub fn image_len_to_view(&self, len: f32) -> f32 {
        len * self.zoom
    }

    /// The image rectangle as it appears in the viewport.
    pub fn image_rect_in_view(&self) -> Rect {
        let (ox, oy) = self.offset();
        Rect::new(
            ox,
            oy,
            self.image.width * self.zoom,
            self.image.height * self.zoom,
        )
    }

    /// Calculate zoom-to-cursor transformation.
    ///
    /// Keeps the image point under `cursor` (view space) fixed while zooming.
    pub fn zoom_to_cursor(&self, new_zoom: f32, cursor: Point) -> ViewTransform {
        // Image-space point under cursor (before zoom)
        let img = self.view_to_image(cursor);

        // Centering term at the new zoom
        let cx = (self.viewport.width - self.image.width * new_zoom) / 2.0;
        let cy = (self.viewport.height - self.image.height * new_zoom) / 2.0;

        ViewTransform {
            zoom: new_zoom,
            pan_x: cursor.x - img.x * new_zoom - cx,
            pan_y: cursor.y - img.y * new_zoom - cy,
            ..*self
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f32, dy: f32) -> ViewTransform {
        ViewTransform {
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
            ..*self
        }
    }

    /// Zoom in by a factor (e.g., 1.2 for 20% zoom in).
    pub fn zoom_in(&self, factor: f32, max_zoom: f32) -> ViewTransform {
        ViewTransform {
            zoom: (self.zoom * factor).min(max_zoom),
            ..*self
        }
    }

    /// Zoom out by a factor (e.g., 1.2 for 20% zoom out).
    pub fn zoom_out(&self, factor: f32, min_zoom: f32) -> ViewTransform {
        ViewTransform {
            zoom: (self.zoom / factor).max(min_zoom),
            ..*self
        }
    }

    /// Zoom 1 and no pan, keeping viewport and image sizes.
    pub fn reset(&self) -> ViewTransform {
        Self::centered(self.viewport, self.image)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::centered(ImageSize::new(0.0, 0.0), ImageSize::new(0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn sized(zoom: f32, pan_x: f32, pan_y: f32) -> ViewTransform {
        ViewTransform::new(
            zoom,
            pan_x,
            pan_y,
            ImageSize::new(800.0, 600.0),
            ImageSize::new(400.0, 300.0),
        )
    }

    #[test]
    fn test_centered_image_corner() {
        let t = sized(1.0, 0.0, 0.0);
        let corner = t.image_to_view(Point::new(0.0, 0.0));
        assert!(approx_eq(corner.x, 200.0));
        assert!(approx_eq(corner.y, 150.0));
    }

    #[test]
    fn test_round_trip_forward_inverse() {
        let zooms = [0.1, 0.5, 1.0, 2.75, 13.0];
        let pans = [(0.0, 0.0), (-120.5, 33.0), (400.0, -250.25)];
        let points = [(0.0, 0.0), (17.3, 299.9), (400.0, 300.0), (-10.0, 1234.5)];
        for &zoom in &zooms {
            for &(px, py) in &pans {
                let t = sized(zoom, px, py);
                for &(x, y) in &points {
                    let back = t.view_to_image(t.image_to_view(Point::new(x, y)));
                    // Relative tolerance: f32 error grows with magnitude / zoom
                    assert!((back.x - x).abs() <= 1e-4 * (1.0 + x.abs()) / zoom, "x {x} zoom {zoom}");
                    assert!((back.y - y).abs() <= 1e-4 * (1.0 + y.abs()) / zoom, "y {y} zoom {zoom}");
                }
            }
        }
    }

    #[test]
    fn test_zoom_to_cursor_preserves_cursor_point() {
        let t = sized(1.0, 50.0, 30.0);
        let cursor = Point::new(420.0, 310.0);
        let before = t.view_to_image(cursor);

        let zoomed = t.zoom_to_cursor(2.5, cursor);
        let after = zoomed.view_to_image(cursor);

        assert_eq!(zoomed.zoom, 2.5);
        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_pan_by() {
        let t = sized(1.0, 10.0, 20.0).pan_by(5.0, -10.0);
        assert_eq!(t.zoom, 1.0);
        assert_eq!(t.pan_x, 15.0);
        assert_eq!(t.pan_y, 10.0);
    }

    #[test]
    fn test_zoom_limits() {
        assert_eq!(sized(4.0, 0.0, 0.0).zoom_in(1.5, 5.0).zoom, 5.0);
        assert!(approx_eq(sized(0.3, 0.0, 0.0).zoom_out(1.5, 0.2).zoom, 0.2));
    }

    #[test]
    fn test_view_length_conversion() {
        let t = sized(4.0, 0.0, 0.0);
        assert!(approx_eq(t.view_len_to_image(15.0), 3.75));
        assert!(approx_eq(t.image_len_to_view(3.75), 15.0));
    }
}
