use freeswim_core::GrayImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Geometry of the projected calibration pattern: three filled dots forming
/// a right triangle with arms of length `arm_len_px` and `2 * arm_len_px`.
///
/// The unequal arms make the dot correspondence unambiguous: after any
/// rotation, translation, or moderate skew of the projection, the corner
/// dot is still the vertex of the two shortest edges and the long-arm dot
/// is still its farther neighbour (see [`crate::order_triangle`]).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CirclePattern {
    /// Short-arm length in projector pixels; the long arm is twice this.
    pub arm_len_px: f32,
    /// Dot radius in projector pixels.
    pub dot_radius_px: f32,
}

impl Default for CirclePattern {
    fn default() -> Self {
        Self {
            arm_len_px: 80.0,
            dot_radius_px: 5.0,
        }
    }
}

impl CirclePattern {
    /// Dot centres in projector coordinates (y down), order
    /// `[corner, long-arm end, short-arm end]`.
    ///
    /// The triangle's bounding box is centred on the display so all three
    /// dots stay visible once the operator has positioned the window.
    pub fn points(&self, display_w: u32, display_h: u32) -> [Point2<f32>; 3] {
        let a = self.arm_len_px;
        let cx = display_w as f32 / 2.0;
        let cy = display_h as f32 / 2.0;

        // Corner at local (0, 0), long arm up to (0, -2a), short arm to (a, 0);
        // shift so the bounding box centre lands on the display centre.
        let corner = Point2::new(cx - a / 2.0, cy + a);
        [
            corner,
            Point2::new(corner.x, corner.y - 2.0 * a),
            Point2::new(corner.x + a, corner.y),
        ]
    }

    /// Rasterize the pattern: white dots on black, for the
    /// "display calibration pattern" action and for synthetic tests.
    pub fn render(&self, display_w: u32, display_h: u32) -> GrayImage {
        let mut img = GrayImage::new(display_w as usize, display_h as usize);
        for p in self.points(display_w, display_h) {
            fill_circle(&mut img, p, self.dot_radius_px);
        }
        img
    }
}

fn fill_circle(img: &mut GrayImage, center: Point2<f32>, radius: f32) {
    let r2 = radius * radius;
    let x0 = (center.x - radius).floor().max(0.0) as usize;
    let x1 = ((center.x + radius).ceil() as usize).min(img.width.saturating_sub(1));
    let y0 = (center.y - radius).floor().max(0.0) as usize;
    let y1 = ((center.y + radius).ceil() as usize).min(img.height.saturating_sub(1));

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= r2 {
                img.put(x, y, 255);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_form_the_expected_triangle() {
        let pattern = CirclePattern::default();
        let [corner, long, short] = pattern.points(800, 600);

        let a = pattern.arm_len_px;
        assert!((nalgebra::distance(&corner, &long) - 2.0 * a).abs() < 1e-3);
        assert!((nalgebra::distance(&corner, &short) - a).abs() < 1e-3);

        // Right angle at the corner.
        let u = long - corner;
        let v = short - corner;
        assert!(u.dot(&v).abs() < 1e-3);
    }

    #[test]
    fn points_are_centred_and_inside_the_display() {
        let pattern = CirclePattern::default();
        let pts = pattern.points(800, 600);

        let min_x = pts.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = pts.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = pts.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = pts.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

        assert!(((min_x + max_x) / 2.0 - 400.0).abs() < 1e-3);
        assert!(((min_y + max_y) / 2.0 - 300.0).abs() < 1e-3);
        assert!(min_x > 0.0 && max_x < 800.0 && min_y > 0.0 && max_y < 600.0);
    }

    #[test]
    fn render_paints_three_dots() {
        let pattern = CirclePattern {
            arm_len_px: 40.0,
            dot_radius_px: 4.0,
        };
        let img = pattern.render(320, 240);

        for p in pattern.points(320, 240) {
            assert_eq!(img.as_view().get(p.x as i32, p.y as i32), 255);
        }
        // Background stays black.
        assert_eq!(img.as_view().get(2, 2), 0);
    }
}
