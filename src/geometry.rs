//! Planar predicates with a fixed decimal tolerance.
//!
//! Every equality-like comparison rounds to [`TOLERANCE_DIGITS`] decimal
//! places before deciding.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Coord, LineString, Polygon};

pub const TOLERANCE_DIGITS: i32 = 10;

const SCALE: f64 = 1e10;

/// Round to [`TOLERANCE_DIGITS`] decimal places.
pub fn round(v: f64) -> f64 { (v * SCALE).round() / SCALE }

pub fn approx_eq(a: f64, b: f64) -> bool { round(a - b) == 0.0 }

pub fn coords_eq(a: Coord<f64>, b: Coord<f64>) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

pub fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 { a.x * b.x + a.y * b.y }

pub fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 { a.x * b.y - a.y * b.x }

pub fn norm(a: Coord<f64>) -> f64 { a.x.hypot(a.y) }

pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 { norm(b - a) }

/// Unit vector pointing along `angle`.  Components that vanish for
/// multiples of π/2 are snapped to exactly zero.
pub fn unit(angle: f64) -> Coord<f64> {
    let snap = |v: f64| if v.abs() < 1e-15 { 0.0 } else { v };
    Coord { x: snap(angle.cos()), y: snap(angle.sin()) }
}

/// The point `distance` away from `from` along `angle`.
pub fn offset(from: Coord<f64>, distance: f64, angle: f64) -> Coord<f64> {
    from + unit(angle) * distance
}

/// The point at `fraction` of the way from `a` to `b`.
pub fn lerp(a: Coord<f64>, b: Coord<f64>, fraction: f64) -> Coord<f64> {
    a + (b - a) * fraction
}

/// Unit normal to the left of `v`.
pub fn left_normal(v: Coord<f64>) -> Coord<f64> {
    let n = norm(v);
    Coord { x: -v.y / n, y: v.x / n }
}

/// `p` lies on the closed segment `a`–`b`.
pub fn is_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
    approx_eq(distance(p, a) + distance(p, b), distance(a, b))
}

/// `p` lies inside or on the boundary of the convex polygon `polygon`
/// (either winding, not closed).
pub fn is_in_convex_polygon(p: Coord<f64>, polygon: &[Coord<f64>]) -> bool {
    let (mut pos, mut neg) = (false, false);
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        if coords_eq(a, b) { continue; }
        let side = round(cross(b - a, p - a));
        pos |= side > 0.0;
        neg |= side < 0.0;
        if pos && neg { return false; }
    }
    true
}

/// Distance from `p` to the closed segment `a`–`b`.
pub fn point_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let ab = b - a;
    let len2 = dot(ab, ab);
    if len2 == 0.0 { return distance(p, a); }
    let t = (dot(p - a, ab) / len2).clamp(0.0, 1.0);
    distance(p, a + ab * t)
}

/// Minimum distance between two closed segments.
pub fn segment_distance(a: (Coord<f64>, Coord<f64>), b: (Coord<f64>, Coord<f64>)) -> f64 {
    if segment_intersection(a, b).is_some() { return 0.0; }
    point_segment_distance(a.0, b.0, b.1)
        .min(point_segment_distance(a.1, b.0, b.1))
        .min(point_segment_distance(b.0, a.0, a.1))
        .min(point_segment_distance(b.1, a.0, a.1))
}

/// Intersection of two closed segments.  Collinear overlaps yield the
/// overlapping sub-segment's endpoints.
pub fn segment_intersection(
    a: (Coord<f64>, Coord<f64>),
    b: (Coord<f64>, Coord<f64>),
) -> Option<SegmentIntersection> {
    match line_intersection(geo::Line::new(a.0, a.1), geo::Line::new(b.0, b.1))? {
        LineIntersection::SinglePoint { intersection, .. } => Some(SegmentIntersection::Point(intersection)),
        LineIntersection::Collinear { intersection } => {
            Some(SegmentIntersection::Overlap(intersection.start, intersection.end))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentIntersection {
    Point(Coord<f64>),
    Overlap(Coord<f64>, Coord<f64>),
}

/// Unsigned area of a simple polygon given by its (unclosed) ring.
pub fn polygon_area(ring: &[Coord<f64>]) -> f64 {
    if ring.len() < 3 { return 0.0; }
    to_polygon(ring).unsigned_area()
}

pub fn to_polygon(ring: &[Coord<f64>]) -> Polygon<f64> {
    Polygon::new(LineString::from(ring.to_vec()), vec![])
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// An infinite line through `point` with direction `angle`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub point: Coord<f64>,
    pub angle: f64,
}

impl Line {
    pub fn new(point: Coord<f64>, angle: f64) -> Self { Self { point, angle } }

    /// Intersection point, or `None` for (near-)parallel lines.
    pub fn intersect(&self, other: &Line) -> Option<Coord<f64>> {
        let (d1, d2) = (unit(self.angle), unit(other.angle));
        let denom = cross(d1, d2);
        if round(denom) == 0.0 { return None; }
        let t = cross(other.point - self.point, d2) / denom;
        Some(self.point + d1 * t)
    }

    pub fn contains(&self, p: Coord<f64>) -> bool {
        round(cross(unit(self.angle), p - self.point)) == 0.0
    }
}
