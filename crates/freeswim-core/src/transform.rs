use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Affine map between camera pixel space and projector pixel space.
///
/// Stored as a 3x3 matrix whose last row is fixed to `[0, 0, 1]`; on disk
/// and on the wire only the top two rows are kept, matching the 2x3 shape
/// a renderer consumes directly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 3]; 2]", into = "[[f64; 3]; 2]")]
pub struct CamProjTransform {
    pub m: Matrix3<f64>,
}

impl CamProjTransform {
    pub fn new(m: Matrix3<f64>) -> Self {
        Self { m }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_rows(rows: [[f64; 3]; 2]) -> Self {
        Self::new(Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2], //
            rows[1][0], rows[1][1], rows[1][2], //
            0.0, 0.0, 1.0,
        ))
    }

    pub fn to_rows(&self) -> [[f64; 3]; 2] {
        [
            [self.m[(0, 0)], self.m[(0, 1)], self.m[(0, 2)]],
            [self.m[(1, 0)], self.m[(1, 1)], self.m[(1, 2)]],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.m * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new(v[0] as f32, v[1] as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        // The inverse of an invertible affine map is affine; re-pin the last
        // row so rounding noise cannot leak into the projective part.
        let inv = self.m.try_inverse()?;
        Some(Self::from_rows([
            [inv[(0, 0)], inv[(0, 1)], inv[(0, 2)]],
            [inv[(1, 0)], inv[(1, 1)], inv[(1, 2)]],
        ]))
    }

    /// Map a heading angle (radians, camera space) through the linear part.
    ///
    /// Translation does not act on directions, so only the 2x2 block is
    /// applied and the result re-expressed with `atan2`.
    pub fn rotate_direction(&self, theta: f64) -> f64 {
        let (sin_t, cos_t) = theta.sin_cos();
        let vx = self.m[(0, 0)] * cos_t + self.m[(0, 1)] * sin_t;
        let vy = self.m[(1, 0)] * cos_t + self.m[(1, 1)] * sin_t;
        vy.atan2(vx)
    }
}

impl From<[[f64; 3]; 2]> for CamProjTransform {
    fn from(rows: [[f64; 3]; 2]) -> Self {
        Self::from_rows(rows)
    }
}

impl From<CamProjTransform> for [[f64; 3]; 2] {
    fn from(t: CamProjTransform) -> Self {
        t.to_rows()
    }
}

fn normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    // Translate to centroid, scale so the mean distance becomes sqrt(2).
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };
    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points(pts: &[Point2<f32>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let t = normalization(cx, cy, mean_dist);

    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn denormalize(an: Matrix3<f64>, t_src: Matrix3<f64>, t_dst: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * an * t_src)
}

/// Estimate the affine map A such that `dst ≈ A * src`.
///
/// - exactly 3 correspondences: exact solve (the calibration-pattern case);
/// - more than 3: least squares;
/// - fewer than 3, mismatched lengths, or (near-)collinear sources: `None`.
pub fn estimate_affine(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<CamProjTransform> {
    if src.len() != dst.len() || src.len() < 3 {
        return None;
    }

    let (s, t_src) = normalize_points(src);
    let (d, t_dst) = normalize_points(dst);

    let an = if src.len() == 3 {
        affine_from_3pt(&s, &d)?
    } else {
        affine_least_squares(&s, &d)?
    };

    let a = denormalize(an, t_src, t_dst)?;
    Some(CamProjTransform::from_rows([
        [a[(0, 0)], a[(0, 1)], a[(0, 2)]],
        [a[(1, 0)], a[(1, 1)], a[(1, 2)]],
    ]))
}

/// Exact affine fit from 3 correspondences in normalized coordinates.
///
/// Unknowns: `[a b tx c d ty]`; per correspondence (x,y)->(u,v):
///   a x + b y + tx = u
///   c x + d y + ty = v
fn affine_from_3pt(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Matrix3<f64>> {
    let mut m = SMatrix::<f64, 6, 6>::zeros();
    let mut b = SVector::<f64, 6>::zeros();

    for k in 0..3 {
        let x = src[k].x;
        let y = src[k].y;

        let r0 = 2 * k;
        m[(r0, 0)] = x;
        m[(r0, 1)] = y;
        m[(r0, 2)] = 1.0;
        b[r0] = dst[k].x;

        let r1 = 2 * k + 1;
        m[(r1, 3)] = x;
        m[(r1, 4)] = y;
        m[(r1, 5)] = 1.0;
        b[r1] = dst[k].y;
    }

    // Collinear sources make the system singular; LU reports that as None.
    let x = m.lu().solve(&b)?;

    Some(Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        0.0, 0.0, 1.0,
    ))
}

/// Least-squares affine fit for N > 3 correspondences in normalized
/// coordinates. Both output rows share the design matrix `[x y 1]`.
fn affine_least_squares(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Matrix3<f64>> {
    let n = src.len();
    let mut design = DMatrix::<f64>::zeros(n, 3);
    let mut rhs = DMatrix::<f64>::zeros(n, 2);

    for k in 0..n {
        design[(k, 0)] = src[k].x;
        design[(k, 1)] = src[k].y;
        design[(k, 2)] = 1.0;
        rhs[(k, 0)] = dst[k].x;
        rhs[(k, 1)] = dst[k].y;
    }

    let svd = design.svd(true, true);

    // Rank check: a collinear point cloud has a vanishing singular value and
    // the minimum-norm solution would silently fit garbage.
    let sv = &svd.singular_values;
    let s_max = sv.iter().cloned().fold(0.0_f64, f64::max);
    let s_min = sv.iter().cloned().fold(f64::INFINITY, f64::min);
    if !(s_min > 1e-9 * s_max.max(1.0)) {
        return None;
    }

    let x = svd.solve(&rhs, 1e-12).ok()?;

    Some(Matrix3::<f64>::new(
        x[(0, 0)],
        x[(1, 0)],
        x[(2, 0)],
        x[(0, 1)],
        x[(1, 1)],
        x[(2, 1)],
        0.0,
        0.0,
        1.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn ground_truth() -> CamProjTransform {
        CamProjTransform::from_rows([[1.3, -0.2, 140.0], [0.15, 0.9, -35.0]])
    }

    #[test]
    fn three_point_exact_recovery() {
        let gt = ground_truth();
        let src = [
            Point2::new(100.0_f32, 80.0),
            Point2::new(100.0_f32, 240.0),
            Point2::new(180.0_f32, 80.0),
        ];
        let dst = src.map(|p| gt.apply(p));

        let est = estimate_affine(&src, &dst).expect("estimate");
        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(320.0_f32, 240.0),
            Point2::new(-40.0_f32, 500.0),
        ] {
            assert_close(est.apply(p), gt.apply(p), 1e-2);
        }
    }

    #[test]
    fn overdetermined_fit_matches_ground_truth() {
        let gt = ground_truth();
        let src: Vec<Point2<f32>> = (0..4)
            .flat_map(|y| (0..4).map(move |x| Point2::new(x as f32 * 50.0, y as f32 * 37.0)))
            .collect();
        let dst: Vec<Point2<f32>> = src.iter().map(|&p| gt.apply(p)).collect();

        let est = estimate_affine(&src, &dst).expect("estimate");
        for p in [Point2::new(10.0_f32, 20.0), Point2::new(130.0, 90.0)] {
            assert_close(est.apply(p), gt.apply(p), 1e-2);
        }
    }

    #[test]
    fn collinear_sources_are_rejected() {
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(10.0_f32, 10.0),
            Point2::new(20.0_f32, 20.0),
        ];
        let dst = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(5.0_f32, 0.0),
            Point2::new(10.0_f32, 0.0),
        ];
        assert!(estimate_affine(&src, &dst).is_none());

        let src_many: Vec<Point2<f32>> =
            (0..6).map(|k| Point2::new(k as f32, 2.0 * k as f32)).collect();
        let dst_many: Vec<Point2<f32>> = (0..6).map(|k| Point2::new(k as f32, 0.0)).collect();
        assert!(estimate_affine(&src_many, &dst_many).is_none());
    }

    #[test]
    fn too_few_or_mismatched_points_fail() {
        let two = [Point2::new(0.0_f32, 0.0), Point2::new(1.0_f32, 0.0)];
        assert!(estimate_affine(&two, &two).is_none());

        let three = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(1.0_f32, 0.0),
            Point2::new(0.0_f32, 1.0),
        ];
        assert!(estimate_affine(&three, &two).is_none());
    }

    #[test]
    fn inverse_round_trips_points() {
        let t = ground_truth();
        let inv = t.inverse().expect("invertible");
        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(50.0_f32, -20.0),
            Point2::new(320.0_f32, 200.0),
        ] {
            assert_close(inv.apply(t.apply(p)), p, 1e-3);
        }
    }

    #[test]
    fn rotate_direction_tracks_pure_rotation() {
        let ang = 0.7_f64;
        let (s, c) = ang.sin_cos();
        let t = CamProjTransform::from_rows([[c, -s, 10.0], [s, c, -4.0]]);

        for theta in [0.0_f64, 0.5, -1.2, 2.8] {
            let mapped = t.rotate_direction(theta);
            let expected = (theta + ang + std::f64::consts::PI).rem_euclid(std::f64::consts::TAU)
                - std::f64::consts::PI;
            assert_abs_diff_eq!(mapped, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn serializes_as_two_rows() {
        let t = ground_truth();
        let json = serde_json::to_string(&t).expect("serialize");
        assert_eq!(json, "[[1.3,-0.2,140.0],[0.15,0.9,-35.0]]");

        let back: CamProjTransform = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, t);
    }
}
