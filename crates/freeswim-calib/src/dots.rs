use freeswim_core::GrayImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Dot detection settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DotDetectParams {
    /// Binarization threshold; `None` picks one automatically (Otsu).
    pub threshold: Option<u8>,
    /// Reject components smaller than this many pixels (sensor speckle).
    pub min_area: usize,
    /// Reject components larger than this many pixels (glare, reflections).
    pub max_area: usize,
    /// Keep at most this many components (largest first).
    pub max_dots: usize,
}

impl Default for DotDetectParams {
    fn default() -> Self {
        Self {
            threshold: None,
            min_area: 4,
            max_area: 10_000,
            max_dots: 8,
        }
    }
}

/// One bright connected component.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DotBlob {
    /// Intensity-weighted centroid in camera pixels.
    pub center: Point2<f32>,
    /// Component size in pixels.
    pub area: usize,
    /// Brightest pixel in the component.
    pub peak: u8,
}

/// Global threshold by Otsu's method (maximal between-class variance).
pub fn otsu_threshold(img: &GrayImageView<'_>) -> u8 {
    let mut hist = [0u64; 256];
    for &p in img.data {
        hist[p as usize] += 1;
    }

    let total = img.data.len() as f64;
    if total == 0.0 {
        return 0;
    }

    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &n)| v as f64 * n as f64)
        .sum();

    let mut w0 = 0.0;
    let mut sum0 = 0.0;
    let mut best_t = 0u8;
    let mut best_var = -1.0;

    for t in 0..256 {
        w0 += hist[t] as f64;
        if w0 == 0.0 {
            continue;
        }
        let w1 = total - w0;
        if w1 == 0.0 {
            break;
        }
        sum0 += t as f64 * hist[t] as f64;

        let m0 = sum0 / w0;
        let m1 = (sum_all - sum0) / w1;
        let var = w0 * w1 * (m0 - m1) * (m0 - m1);
        if var > best_var {
            best_var = var;
            best_t = t as u8;
        }
    }

    best_t
}

/// Find bright dots: threshold, 4-connected component labeling,
/// intensity-weighted centroids, area filtering.
///
/// Components are returned largest-first, truncated to `max_dots`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width, height = img.height))
)]
pub fn detect_dots(img: &GrayImageView<'_>, params: &DotDetectParams) -> Vec<DotBlob> {
    if img.width == 0 || img.height == 0 {
        return Vec::new();
    }

    let thr = params.threshold.unwrap_or_else(|| {
        let t = otsu_threshold(img);
        // A fully dark frame makes Otsu return 0; everything would become
        // foreground. Pin the floor to 1 so black stays background.
        t.max(1)
    });

    let w = img.width;
    let h = img.height;
    let mut visited = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::new();
    let mut blobs: Vec<DotBlob> = Vec::new();

    for start in 0..w * h {
        if visited[start] || img.data[start] < thr {
            continue;
        }

        // Flood one component.
        let mut area = 0usize;
        let mut peak = 0u8;
        let mut weight = 0.0f64;
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;

        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            let v = img.data[idx];
            let x = idx % w;
            let y = idx / w;

            area += 1;
            peak = peak.max(v);
            let wgt = v as f64;
            weight += wgt;
            sum_x += wgt * (x as f64 + 0.5);
            sum_y += wgt * (y as f64 + 0.5);

            let mut push = |nx: usize, ny: usize| {
                let nidx = ny * w + nx;
                if !visited[nidx] && img.data[nidx] >= thr {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            };
            if x > 0 {
                push(x - 1, y);
            }
            if x + 1 < w {
                push(x + 1, y);
            }
            if y > 0 {
                push(x, y - 1);
            }
            if y + 1 < h {
                push(x, y + 1);
            }
        }

        if area < params.min_area || area > params.max_area || weight <= 0.0 {
            continue;
        }

        blobs.push(DotBlob {
            center: Point2::new((sum_x / weight) as f32, (sum_y / weight) as f32),
            area,
            peak,
        });
    }

    blobs.sort_by(|a, b| b.area.cmp(&a.area));
    blobs.truncate(params.max_dots);

    log::debug!(
        "detect_dots: threshold {} -> {} component(s)",
        thr,
        blobs.len()
    );
    blobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use freeswim_core::GrayImage;

    fn frame_with_squares(squares: &[(usize, usize, usize, u8)]) -> GrayImage {
        let mut img = GrayImage::new(64, 64);
        for &(x0, y0, side, v) in squares {
            for y in y0..y0 + side {
                for x in x0..x0 + side {
                    img.put(x, y, v);
                }
            }
        }
        img
    }

    #[test]
    fn finds_separated_squares_at_their_centres() {
        let img = frame_with_squares(&[(4, 4, 5, 200), (40, 20, 5, 220)]);
        let blobs = detect_dots(&img.as_view(), &DotDetectParams::default());

        assert_eq!(blobs.len(), 2);
        for b in &blobs {
            assert_eq!(b.area, 25);
        }
        let mut xs: Vec<f32> = blobs.iter().map(|b| b.center.x).collect();
        xs.sort_by(f32::total_cmp);
        assert!((xs[0] - 6.5).abs() < 1e-3);
        assert!((xs[1] - 42.5).abs() < 1e-3);
    }

    #[test]
    fn area_filters_reject_speckle_and_glare() {
        let img = frame_with_squares(&[(2, 2, 1, 255), (10, 10, 6, 180), (30, 30, 20, 160)]);
        let params = DotDetectParams {
            min_area: 4,
            max_area: 100,
            ..DotDetectParams::default()
        };
        let blobs = detect_dots(&img.as_view(), &params);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 36);
    }

    #[test]
    fn blank_frame_yields_nothing() {
        let img = GrayImage::new(32, 32);
        assert!(detect_dots(&img.as_view(), &DotDetectParams::default()).is_empty());
    }

    #[test]
    fn fixed_threshold_splits_touching_intensities() {
        // Two plateaus joined at 100 vs 200: a threshold above 100 separates them.
        let mut img = GrayImage::new(16, 8);
        for y in 2..6 {
            for x in 2..6 {
                img.put(x, y, 100);
            }
            for x in 6..10 {
                img.put(x, y, 200);
            }
        }
        let params = DotDetectParams {
            threshold: Some(150),
            min_area: 4,
            ..DotDetectParams::default()
        };
        let blobs = detect_dots(&img.as_view(), &params);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 16);
        assert!((blobs[0].center.x - 8.0).abs() < 1e-3);
    }

    #[test]
    fn otsu_separates_bimodal_frame() {
        let img = frame_with_squares(&[(8, 8, 10, 230)]);
        let t = otsu_threshold(&img.as_view());
        assert!(t > 0 && t <= 230);

        let blobs = detect_dots(&img.as_view(), &DotDetectParams::default());
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 100);
        assert_eq!(blobs[0].peak, 230);
    }
}
