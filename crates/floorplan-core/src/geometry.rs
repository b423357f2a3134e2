//! Planar geometry primitives shared by the resolver, queries and detector.
//!
//! Everything works on straight segments in `f64` with explicit tolerances;
//! there is no exact arithmetic.

use kurbo::{Point, Rect, Vec2};

/// Relative cross-product magnitude below which two directions are parallel.
const PARALLEL_EPSILON: f64 = 1e-10;

/// Where two segments cross.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Crossing point.
    pub point: Point,
    /// Parameter along the first segment, clamped to `[0, 1]`.
    pub t: f64,
    /// Parameter along the second segment, clamped to `[0, 1]`.
    pub u: f64,
}

/// Closest point to `p` on the segment `a`-`b` (clamped projection).
pub fn closest_point_on_segment(p: Point, a: Point, b: Point) -> Point {
    let seg = b - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return a;
    }
    let t = ((p - a).dot(seg) / len_sq).clamp(0.0, 1.0);
    a + seg * t
}

/// Distance from `p` to the segment `a`-`b` (not to the infinite line).
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    p.distance(closest_point_on_segment(p, a, b))
}

/// Intersect segments `a1`-`a2` and `b1`-`b2`.
///
/// Parallel and collinear pairs never cross. `tolerance` widens both
/// parameter ranges by that distance so touches within it are reported;
/// the returned parameters are clamped back to `[0, 1]`.
pub fn segment_intersection(
    a1: Point,
    a2: Point,
    b1: Point,
    b2: Point,
    tolerance: f64,
) -> Option<Crossing> {
    let r = a2 - a1;
    let s = b2 - b1;
    let len_r = r.hypot();
    let len_s = s.hypot();
    if len_r < f64::EPSILON || len_s < f64::EPSILON {
        return None;
    }

    let denom = r.cross(s);
    if denom.abs() <= PARALLEL_EPSILON * len_r * len_s {
        return None;
    }

    let qp = b1 - a1;
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    let tol_t = tolerance / len_r;
    let tol_u = tolerance / len_s;
    if t < -tol_t || t > 1.0 + tol_t || u < -tol_u || u > 1.0 + tol_u {
        return None;
    }

    let t = t.clamp(0.0, 1.0);
    Some(Crossing {
        point: a1 + r * t,
        t,
        u: u.clamp(0.0, 1.0),
    })
}

/// Minimum distance between two segments.
pub fn segment_distance(a1: Point, a2: Point, b1: Point, b2: Point) -> f64 {
    if segment_intersection(a1, a2, b1, b2, 0.0).is_some() {
        return 0.0;
    }
    point_segment_distance(a1, b1, b2)
        .min(point_segment_distance(a2, b1, b2))
        .min(point_segment_distance(b1, a1, a2))
        .min(point_segment_distance(b2, a1, a2))
}

/// Inclusive point-in-rectangle test (kurbo's `contains` is half-open).
pub fn rect_contains(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

/// Whether the segment `a`-`b` touches the closed rectangle: either an
/// endpoint lies inside or the segment crosses one of its edges.
pub fn segment_intersects_rect(a: Point, b: Point, rect: Rect) -> bool {
    if rect_contains(rect, a) || rect_contains(rect, b) {
        return true;
    }

    // Cheap reject before testing the four edges.
    let seg_bounds = Rect::from_points(a, b);
    if seg_bounds.x1 < rect.x0
        || seg_bounds.x0 > rect.x1
        || seg_bounds.y1 < rect.y0
        || seg_bounds.y0 > rect.y1
    {
        return false;
    }

    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    (0..4).any(|i| segment_intersection(a, b, corners[i], corners[(i + 1) % 4], 0.0).is_some())
}

/// Unsigned angle between two directions, folded into `[0, π/2]`.
pub fn acute_angle_between(d1: Vec2, d2: Vec2) -> f64 {
    let len = d1.hypot() * d2.hypot();
    if len < f64::EPSILON {
        return 0.0;
    }
    let cos = (d1.dot(d2) / len).abs().clamp(0.0, 1.0);
    cos.acos()
}

/// Length of the overlap of `b1`-`b2` projected onto the line through
/// `a1`-`a2`, measured along that line. Zero when the projections are
/// disjoint or only touch.
pub fn projected_overlap(a1: Point, a2: Point, b1: Point, b2: Point) -> f64 {
    let dir = a2 - a1;
    let len = dir.hypot();
    if len < f64::EPSILON {
        return 0.0;
    }
    let unit = dir / len;
    let pb1 = (b1 - a1).dot(unit);
    let pb2 = (b2 - a1).dot(unit);
    let lo = pb1.min(pb2).max(0.0);
    let hi = pb1.max(pb2).min(len);
    (hi - lo).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_point_segment_distance_clamps_to_endpoints() {
        let a = pt(0.0, 0.0);
        let b = pt(10.0, 0.0);
        assert!((point_segment_distance(pt(5.0, 3.0), a, b) - 3.0).abs() < 1e-12);
        // Beyond the end: distance to the endpoint, not to the infinite line.
        assert!((point_segment_distance(pt(13.0, 4.0), a, b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_crossing_at_midpoints() {
        let c = segment_intersection(pt(0.0, 5.0), pt(10.0, 5.0), pt(5.0, 0.0), pt(5.0, 10.0), 0.0)
            .unwrap();
        assert!((c.point.x - 5.0).abs() < 1e-12);
        assert!((c.point.y - 5.0).abs() < 1e-12);
        assert!((c.t - 0.5).abs() < 1e-12);
        assert!((c.u - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_segments_do_not_cross() {
        assert!(
            segment_intersection(pt(0.0, 0.0), pt(10.0, 0.0), pt(0.0, 1.0), pt(10.0, 1.0), 0.0)
                .is_none()
        );
        // Collinear overlap is not a crossing either.
        assert!(
            segment_intersection(pt(0.0, 0.0), pt(10.0, 0.0), pt(5.0, 0.0), pt(15.0, 0.0), 0.0)
                .is_none()
        );
    }

    #[test]
    fn test_disjoint_segments_do_not_cross() {
        assert!(
            segment_intersection(pt(0.0, 0.0), pt(1.0, 1.0), pt(3.0, 0.0), pt(2.0, 1.0), 0.0)
                .is_none()
        );
    }

    #[test]
    fn test_tolerance_catches_near_touch() {
        let a1 = pt(0.0, 0.0);
        let a2 = pt(10.0, 0.0);
        let b1 = pt(5.0, 1e-9);
        let b2 = pt(5.0, 10.0);
        assert!(segment_intersection(a1, a2, b1, b2, 0.0).is_none());
        let c = segment_intersection(a1, a2, b1, b2, 1e-6).unwrap();
        assert!(c.u.abs() < 1e-12);
    }

    #[test]
    fn test_segment_distance() {
        let d = segment_distance(pt(0.0, 0.0), pt(10.0, 0.0), pt(0.0, 4.0), pt(10.0, 4.0));
        assert!((d - 4.0).abs() < 1e-12);
        let crossing = segment_distance(pt(0.0, 0.0), pt(10.0, 10.0), pt(0.0, 10.0), pt(10.0, 0.0));
        assert!(crossing.abs() < 1e-12);
    }

    #[test]
    fn test_segment_through_rect() {
        let rect = Rect::new(0.0, 0.0, 40.0, 20.0);
        // Both endpoints outside, crosses the rectangle.
        assert!(segment_intersects_rect(pt(-10.0, 10.0), pt(100.0, 10.0), rect));
        // One endpoint inside.
        assert!(segment_intersects_rect(pt(10.0, 10.0), pt(100.0, 100.0), rect));
        // Entirely outside.
        assert!(!segment_intersects_rect(pt(50.0, 0.0), pt(60.0, 20.0), rect));
        // Passes the corner without touching.
        assert!(!segment_intersects_rect(pt(35.0, -10.0), pt(50.0, 5.0), rect));
    }

    #[test]
    fn test_acute_angle() {
        let right = acute_angle_between(Vec2::new(1.0, 0.0), Vec2::new(0.0, 3.0));
        assert!((right - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        let anti = acute_angle_between(Vec2::new(1.0, 0.0), Vec2::new(-2.0, 0.0));
        assert!(anti.abs() < 1e-12);
    }

    #[test]
    fn test_projected_overlap() {
        let overlap = projected_overlap(pt(0.0, 0.0), pt(10.0, 0.0), pt(4.0, 3.0), pt(20.0, 3.0));
        assert!((overlap - 6.0).abs() < 1e-12);
        let none = projected_overlap(pt(0.0, 0.0), pt(10.0, 0.0), pt(12.0, 3.0), pt(20.0, 3.0));
        assert!(none.abs() < 1e-12);
    }
}
