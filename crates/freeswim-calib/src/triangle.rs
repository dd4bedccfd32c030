use nalgebra::Point2;

/// Minimum long/short arm ratio still considered unambiguous.
const MIN_ARM_RATIO: f32 = 1.2;

/// Recover the canonical dot order `[corner, long-arm end, short-arm end]`
/// from an unordered triple of detected centres.
///
/// The pattern triangle has arms of length `a` and `2a`, so the hypotenuse
/// is always the longest edge and the corner is the vertex not on it. The
/// remaining two dots are told apart by their distance to the corner.
///
/// Returns `None` when the triple is degenerate (collinear or coincident
/// points) or too distorted for the arm ordering to be trusted.
pub fn order_triangle(pts: [Point2<f32>; 3]) -> Option<[Point2<f32>; 3]> {
    let d = [
        nalgebra::distance(&pts[1], &pts[2]), // edge opposite vertex 0
        nalgebra::distance(&pts[0], &pts[2]), // opposite vertex 1
        nalgebra::distance(&pts[0], &pts[1]), // opposite vertex 2
    ];

    let longest = (0..3usize).max_by(|&a, &b| d[a].total_cmp(&d[b]))?;
    if d[longest] <= 0.0 {
        return None;
    }

    // Collinear triples have (near-)zero area relative to their extent.
    let u = pts[1] - pts[0];
    let v = pts[2] - pts[0];
    let doubled_area = (u.x * v.y - u.y * v.x).abs();
    if doubled_area < 1e-3 * d[longest] * d[longest] {
        return None;
    }

    // The corner sits opposite the hypotenuse.
    let corner = pts[longest];
    let (p, q) = match longest {
        0 => (pts[1], pts[2]),
        1 => (pts[0], pts[2]),
        _ => (pts[0], pts[1]),
    };

    let dp = nalgebra::distance(&corner, &p);
    let dq = nalgebra::distance(&corner, &q);
    let (long, short, ratio) = if dp >= dq {
        (p, q, dp / dq)
    } else {
        (q, p, dq / dp)
    };

    // Arms of comparable length mean the projection is distorted far beyond
    // anything the affine model can represent; refuse to guess.
    if !(ratio >= MIN_ARM_RATIO) {
        return None;
    }

    Some([corner, long, short])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(a: f32) -> [Point2<f32>; 3] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(0.0, -2.0 * a),
            Point2::new(a, 0.0),
        ]
    }

    fn transformed(pts: [Point2<f32>; 3], angle: f32, scale: f32, t: (f32, f32)) -> [Point2<f32>; 3] {
        let (s, c) = angle.sin_cos();
        pts.map(|p| {
            Point2::new(
                scale * (c * p.x - s * p.y) + t.0,
                scale * (s * p.x + c * p.y) + t.1,
            )
        })
    }

    fn assert_same(got: [Point2<f32>; 3], want: [Point2<f32>; 3]) {
        for (g, w) in got.iter().zip(want.iter()) {
            assert!(
                nalgebra::distance(g, w) < 1e-3,
                "expected {w:?}, got {g:?}"
            );
        }
    }

    #[test]
    fn identifies_vertices_in_any_input_order() {
        let want = canonical(50.0);
        let permutations = [
            [want[0], want[1], want[2]],
            [want[1], want[0], want[2]],
            [want[2], want[1], want[0]],
            [want[1], want[2], want[0]],
            [want[2], want[0], want[1]],
            [want[0], want[2], want[1]],
        ];
        for perm in permutations {
            assert_same(order_triangle(perm).expect("ordered"), want);
        }
    }

    #[test]
    fn survives_rotation_scale_and_translation() {
        let base = canonical(64.0);
        let moved = transformed(base, 1.1, 0.7, (312.0, -40.0));
        let want = moved;

        let shuffled = [moved[2], moved[0], moved[1]];
        assert_same(order_triangle(shuffled).expect("ordered"), want);
    }

    #[test]
    fn rejects_collinear_points() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(25.0, 0.0),
        ];
        assert!(order_triangle(pts).is_none());
    }

    #[test]
    fn rejects_coincident_points() {
        let p = Point2::new(5.0, 5.0);
        assert!(order_triangle([p, p, p]).is_none());
    }

    #[test]
    fn rejects_near_equilateral_triples() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(50.0, 86.6),
        ];
        assert!(order_triangle(pts).is_none());
    }
}
