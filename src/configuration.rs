//! Configurations: three-edge windows `A → B → C → D` around an inner edge
//! `B → C`, and the contractions that slide the inner edge along the tracks
//! of its two outer edges.
//!
//! A contraction is positive or negative depending on the side of the inner
//! edge it sweeps.  It is feasible when it has a contraction point and no
//! other boundary edge of the two incident faces reaches into its area.

use geo::Coord;
use geograph::{FaceId, HalfEdgeId, VertexId, OUTER_FACE};
use tracing::debug;

use crate::boundary::{FaceFaceBoundaryList, FacePair};
use crate::error::Result;
use crate::geometry::{
    coords_eq, cross, dot, is_in_convex_polygon, is_on_segment, left_normal, polygon_area, round,
    segment_intersection, Line, SegmentIntersection,
};
use crate::subdivision::SchematicDcel;

/// Bisection steps used to hit a target area with a partial move.
const BISECTION_STEPS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractionType {
    Negative,
    Positive,
}

impl ContractionType {
    pub const ALL: [ContractionType; 2] = [ContractionType::Negative, ContractionType::Positive];

    fn idx(self) -> usize {
        match self {
            ContractionType::Negative => 0,
            ContractionType::Positive => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OuterEdge {
    Prev,
    Next,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Contraction {
    pub kind:     ContractionType,
    pub point:    Coord<f64>,
    /// Swept area (not closed).
    pub polygon:  Vec<Coord<f64>>,
    pub area:     f64,
    /// Boundary edges reaching into `polygon`.
    pub blocking: Vec<HalfEdgeId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    pub inner: HalfEdgeId,
    pub prev:  HalfEdgeId,
    pub next:  HalfEdgeId,
    contractions: [Option<Contraction>; 2],
}

impl Configuration {
    /// The configuration of `inner`, if both its endpoints have degree ≤ 3
    /// and it has two distinct outer edges.
    pub fn new(dcel: &SchematicDcel, boundaries: &FaceFaceBoundaryList, inner: HalfEdgeId) -> Option<Self> {
        let (b, c) = (dcel.tail(inner), dcel.head(inner));
        if dcel.degree(b) > 3 || dcel.degree(c) > 3 { return None; }
        let (prev, next) = (dcel.prev(inner), dcel.next(inner));
        if prev == dcel.twin(inner) || next == dcel.twin(inner) || prev == next { return None; }
        if dcel.length(inner) == 0.0 { return None; }

        let mut configuration = Self { inner, prev, next, contractions: [None, None] };
        let points = configuration.contraction_points(dcel);
        for kind in ContractionType::ALL {
            let contraction = points[kind.idx()].map(|point| {
                let polygon = configuration.contraction_area(dcel, point);
                let blocking = configuration.blocking_edges(dcel, boundaries, &polygon);
                Contraction { kind, point, area: polygon_area(&polygon), polygon, blocking }
            });
            configuration.contractions[kind.idx()] = contraction;
        }
        Some(configuration)
    }

    /// `[prev, inner, next]`.
    pub fn x(&self) -> [HalfEdgeId; 3] { [self.prev, self.inner, self.next] }

    /// The window vertices `A, B, C, D`.
    pub fn window(&self, dcel: &SchematicDcel) -> [VertexId; 4] {
        [dcel.tail(self.prev), dcel.tail(self.inner), dcel.head(self.inner), dcel.head(self.next)]
    }

    fn window_coords(&self, dcel: &SchematicDcel) -> [Coord<f64>; 4] {
        self.window(dcel).map(|v| dcel.coords(v))
    }

    /// The line carrying an outer edge.
    pub fn track(&self, dcel: &SchematicDcel, side: OuterEdge) -> Line {
        let he = match side {
            OuterEdge::Prev => self.prev,
            OuterEdge::Next => self.next,
        };
        Line::new(dcel.tail_coords(he), dcel.angle(he))
    }

    /// One endpoint turns left and the other right.
    pub fn is_bend(&self, dcel: &SchematicDcel) -> bool {
        let [a, b, c, d] = self.window_coords(dcel);
        let convex = |p: Coord<f64>, q: Coord<f64>, r: Coord<f64>| round(cross(q - p, r - q)) > 0.0;
        convex(a, b, c) != convex(b, c, d)
    }

    /// Negative and positive contraction points, indexed like
    /// [`ContractionType::ALL`].
    pub fn contraction_points(&self, dcel: &SchematicDcel) -> [Option<Coord<f64>>; 2] {
        let [a, b, c, d] = self.window_coords(dcel);
        let normal = left_normal(c - b);

        let mut candidates = vec![(a, dot(b - a, normal)), (d, dot(c - d, normal))];
        if self.is_bend(dcel) {
            let prev = self.track(dcel, OuterEdge::Prev);
            let next = self.track(dcel, OuterEdge::Next);
            if let Some(t) = prev.intersect(&next) {
                candidates.push((t, dot(b - t, normal)));
            }
        }
        candidates.sort_by(|x, y| round(x.1).total_cmp(&round(y.1)));

        let positive = candidates.iter().find(|(_, dist)| round(*dist) >= 0.0).map(|&(p, _)| p);
        let negative = candidates.iter().rev().find(|(_, dist)| round(*dist) <= 0.0).map(|&(p, _)| p);
        [negative, positive]
    }

    /// The area swept when the inner edge is contracted onto `point`.
    pub fn contraction_area(&self, dcel: &SchematicDcel, point: Coord<f64>) -> Vec<Coord<f64>> {
        let [a, b, c, d] = self.window_coords(dcel);
        let parallel = Line::new(point, dcel.angle(self.inner));

        if is_on_segment(point, a, b) {
            let mut area = vec![point, b, c];
            if coords_eq(point, a) {
                area.extend(self.track(dcel, OuterEdge::Next).intersect(&parallel));
            }
            area
        } else {
            let mut area = vec![point, c, b];
            if coords_eq(point, d) {
                area.extend(self.track(dcel, OuterEdge::Prev).intersect(&parallel));
            }
            area
        }
    }

    /// Every boundary edge of the two faces incident to the inner edge,
    /// except the configuration's own, one half-edge per edge.
    pub fn x_complement(&self, dcel: &SchematicDcel, boundaries: &FaceFaceBoundaryList) -> Vec<HalfEdgeId> {
        let key = |he: HalfEdgeId| he.min(dcel.twin(he));
        let own: Vec<_> = self.x().map(key).to_vec();
        let faces = [dcel.face_of(self.inner), dcel.face_of(dcel.twin(self.inner))];

        let mut seen = ahash::AHashSet::new();
        faces.iter()
            .flat_map(|&f| boundaries.face_boundary(dcel, f))
            .filter(|&he| !own.contains(&key(he)) && seen.insert(key(he)))
            .collect()
    }

    /// Edges of [`Self::x_complement`] reaching into `polygon`: an endpoint
    /// other than a window vertex lies in it (boundary included), or the edge
    /// meets one of its sides anywhere except at such a window endpoint.
    /// Edges through a corner of `polygon` block, since a moved vertex lands
    /// on a corner.
    pub fn blocking_edges(
        &self,
        dcel: &SchematicDcel,
        boundaries: &FaceFaceBoundaryList,
        polygon: &[Coord<f64>],
    ) -> Vec<HalfEdgeId> {
        if polygon.len() < 3 || round(polygon_area(polygon)) == 0.0 { return Vec::new(); }
        let window = self.window(dcel);

        self.x_complement(dcel, boundaries).into_iter()
            .filter(|&he| {
                let ends = [dcel.tail(he), dcel.head(he)];
                let (p, q) = (dcel.coords(ends[0]), dcel.coords(ends[1]));
                if is_in_convex_polygon(p, polygon) && is_in_convex_polygon(q, polygon) { return true; }
                let loose_end = ends.iter()
                    .any(|&v| !window.contains(&v) && is_in_convex_polygon(dcel.coords(v), polygon));
                if loose_end { return true; }

                let at_window_end = |x: Coord<f64>| {
                    ends.iter().any(|&v| window.contains(&v) && coords_eq(dcel.coords(v), x))
                };
                (0..polygon.len()).any(|i| {
                    let side = (polygon[i], polygon[(i + 1) % polygon.len()]);
                    matches!(segment_intersection((p, q), side), Some(SegmentIntersection::Point(x)) if !at_window_end(x))
                })
            })
            .collect()
    }

    pub fn contraction(&self, kind: ContractionType) -> Option<&Contraction> {
        self.contractions[kind.idx()].as_ref()
    }

    pub fn blocking_number(&self, kind: ContractionType) -> Option<usize> {
        self.contraction(kind).map(|c| c.blocking.len())
    }

    pub fn is_feasible(&self, kind: ContractionType) -> bool {
        self.blocking_number(kind) == Some(0)
    }

    /// Some window vertex joins three or more edges.
    pub fn has_junction(&self, dcel: &SchematicDcel) -> bool {
        self.window(dcel).iter().any(|&v| dcel.degree(v) >= 3)
    }
}

/// Attach a configuration to every eligible half-edge, replacing old ones.
pub fn add_configurations(dcel: &mut SchematicDcel, boundaries: &FaceFaceBoundaryList) -> usize {
    let ids: Vec<_> = dcel.half_edge_ids().collect();
    let built: Vec<_> = ids.iter().map(|&he| Configuration::new(dcel, boundaries, he)).collect();
    let mut count = 0;
    for (he, configuration) in ids.into_iter().zip(built) {
        count += configuration.is_some() as usize;
        dcel.half_edge_mut(he).data.configuration = configuration;
    }
    count
}

/// Commit the contraction of kind `kind` on the configuration of `inner`.
/// With `target_area`, the inner edge is only slid far enough to sweep that
/// area.  Returns the swept area, or `None` when the move was refused.
pub fn do_edge_move(
    dcel: &mut SchematicDcel,
    boundaries: &FaceFaceBoundaryList,
    inner: HalfEdgeId,
    kind: ContractionType,
    target_area: Option<f64>,
) -> Result<Option<f64>> {
    let Some(configuration) = dcel.half_edge(inner).data.configuration.clone() else { return Ok(None) };
    let refuse = |reason: &str| {
        debug!(edge = %inner, ?kind, reason, "edge move refused");
        Ok(None)
    };

    if configuration.has_junction(dcel) { return refuse("junction"); }
    if !boundaries.same_chain(configuration.prev, inner) || !boundaries.same_chain(inner, configuration.next) {
        return refuse("outer edges leave the shared boundary");
    }
    let Some(contraction) = configuration.contraction(kind).filter(|c| c.blocking.is_empty()) else {
        return refuse("infeasible");
    };
    let [a, b, c, d] = configuration.window(dcel);
    if a == d { return refuse("triangle"); }

    match target_area {
        Some(target) if round(contraction.area - target) > 0.0 => {
            partial_move(dcel, &configuration, contraction, target)
        }
        _ => {
            let point = contraction.point;
            let (keep, remove, to) = if coords_eq(point, dcel.coords(a)) {
                let Some(&x) = contraction.polygon.get(3) else { return refuse("parallel track") };
                (c, b, x)
            } else if coords_eq(point, dcel.coords(d)) {
                let Some(&x) = contraction.polygon.get(3) else { return refuse("parallel track") };
                (b, c, x)
            } else {
                (b, c, point)
            };
            if dcel.find_vertex(to).is_some_and(|v| v != keep && v != remove) {
                return refuse("target occupied");
            }
            if let Err(err) = dcel.remove_vertex(remove) {
                debug!(edge = %inner, %err, "edge move refused");
                return Ok(None);
            }
            dcel.move_vertex(keep, to)?;
            debug!(edge = %inner, ?kind, area = contraction.area, "edge moved");
            Ok(Some(contraction.area))
        }
    }
}

/// Slide the inner edge parallel to itself along both tracks until it has
/// swept `target` area.
fn partial_move(
    dcel: &mut SchematicDcel,
    configuration: &Configuration,
    contraction: &Contraction,
    target: f64,
) -> Result<Option<f64>> {
    let [_, b, c, _] = configuration.window(dcel);
    let (pb, pc) = (dcel.coords(b), dcel.coords(c));
    let angle = dcel.angle(configuration.inner);
    let normal = left_normal(pc - pb);
    let reach = dot(contraction.point - pb, normal);
    let prev = configuration.track(dcel, OuterEdge::Prev);
    let next = configuration.track(dcel, OuterEdge::Next);

    let shifted = |s: f64| {
        let line = Line::new(pb + normal * s, angle);
        Some((prev.intersect(&line)?, next.intersect(&line)?))
    };
    let swept = |s: f64| shifted(s).map_or(0.0, |(nb, nc)| polygon_area(&[pb, pc, nc, nb]));

    let (mut lo, mut hi) = (0.0, reach);
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) / 2.0;
        if swept(mid) < target { lo = mid; } else { hi = mid; }
    }
    let Some((nb, nc)) = shifted(hi) else { return Ok(None) };
    for (v, to) in [(b, nb), (c, nc)] {
        if dcel.find_vertex(to).is_some_and(|w| w != v) { return Ok(None); }
    }
    dcel.move_vertex(b, nb)?;
    dcel.move_vertex(c, nc)?;
    let area = polygon_area(&[pb, pc, nc, nb]);
    debug!(edge = %configuration.inner, kind = ?contraction.kind, area, "partial edge move");
    Ok(Some(area))
}

/// Pairs tried per call before giving up.
const MAX_PAIR_ATTEMPTS: usize = 64;

/// A feasible contraction candidate, on the half-edge of its edge that faces
/// the lower face of its pair.  Positive candidates grow that face and
/// negative ones shrink it.
#[derive(Clone, Debug)]
struct Candidate {
    inner:  HalfEdgeId,
    kind:   ContractionType,
    area:   f64,
    pair:   FacePair,
    window: [VertexId; 4],
}

/// Perform one area-balancing pair of edge moves: a positive and a negative
/// contraction of disjoint configurations on the same face pair.  The smaller
/// contraction is committed fully and the other one partially, by the same
/// area.  A pair is only kept when both moves succeed, the areas of both
/// faces are unchanged and no moved edge crosses another edge; otherwise the
/// subdivision is restored and the next pair is tried.
///
/// Returns the area moved by each, or `None` when no pair qualifies.
pub fn paired_edge_move(dcel: &mut SchematicDcel, boundaries: &FaceFaceBoundaryList) -> Result<Option<f64>> {
    let mut candidates: Vec<Candidate> = dcel.half_edge_ids()
        .filter_map(|he| dcel.half_edge(he).data.configuration.as_ref())
        .filter(|cfg| !cfg.has_junction(dcel))
        .filter(|cfg| boundaries.same_chain(cfg.prev, cfg.inner) && boundaries.same_chain(cfg.inner, cfg.next))
        .filter_map(|cfg| {
            let pair = boundaries.pair_of(cfg.inner)?;
            (dcel.face_of(cfg.inner) == pair.0).then_some((cfg, pair))
        })
        .flat_map(|(cfg, pair)| ContractionType::ALL.into_iter()
            .filter(|&kind| cfg.is_feasible(kind))
            .filter_map(|kind| {
                let area = cfg.contraction(kind)?.area;
                (round(area) > 0.0).then(|| Candidate { inner: cfg.inner, kind, area, pair, window: cfg.window(dcel) })
            })
            .collect::<Vec<_>>())
        .collect();
    candidates.sort_by(|x, y| x.area.total_cmp(&y.area));

    let (positive, negative): (Vec<_>, Vec<_>) = candidates.into_iter()
        .partition(|c| c.kind == ContractionType::Positive);
    let pairs = positive.iter()
        .flat_map(|p| negative.iter().map(move |n| (p, n)))
        .filter(|(p, n)| p.pair == n.pair && p.window.iter().all(|v| !n.window.contains(v)))
        .take(MAX_PAIR_ATTEMPTS);

    for (p, n) in pairs {
        let snapshot = dcel.clone();
        match try_pair(dcel, p, n) {
            Ok(Some(area)) => return Ok(Some(area)),
            Ok(None) => *dcel = snapshot,
            Err(err) => {
                *dcel = snapshot;
                return Err(err);
            }
        }
    }
    Ok(None)
}

/// Commit the pair `(p, n)`, or return `None` when it does not balance.
/// The caller restores the subdivision on `None`.
fn try_pair(dcel: &mut SchematicDcel, p: &Candidate, n: &Candidate) -> Result<Option<f64>> {
    let faces: Vec<FaceId> = [p.pair.0, p.pair.1].into_iter().filter(|&f| f != OUTER_FACE).collect();
    let areas_before: Vec<f64> = faces.iter().map(|&f| face_area(dcel, f)).collect();
    let window: Vec<VertexId> = p.window.iter().chain(&n.window).copied().collect();
    let coords_before: Vec<Coord<f64>> = window.iter().map(|&v| dcel.coords(v)).collect();

    let (small, large) = if p.area <= n.area { (p, n) } else { (n, p) };
    let boundaries = FaceFaceBoundaryList::new(dcel);
    let Some(area) = do_edge_move(dcel, &boundaries, small.inner, small.kind, None)? else { return Ok(None) };

    // The first move changed the topology; size the second against it.
    let boundaries = FaceFaceBoundaryList::new(dcel);
    let Some(configuration) = Configuration::new(dcel, &boundaries, large.inner) else { return Ok(None) };
    dcel.half_edge_mut(large.inner).data.configuration = Some(configuration);
    let Some(second) = do_edge_move(dcel, &boundaries, large.inner, large.kind, Some(area))? else {
        return Ok(None);
    };
    if !same_area(second, area) {
        debug!(first = area, second, "paired moves swept different areas");
        return Ok(None);
    }

    let changed = faces.iter().zip(&areas_before).any(|(&f, &before)| !same_area(face_area(dcel, f), before));
    if changed {
        debug!(?faces, "paired moves changed face areas");
        return Ok(None);
    }
    let moved: Vec<VertexId> = window.iter().zip(&coords_before)
        .filter(|&(&v, &before)| !dcel.vertex(v).removed && !coords_eq(dcel.coords(v), before))
        .map(|(&v, _)| v)
        .collect();
    if moved.iter().any(|&v| crosses_other_edges(dcel, v)) {
        debug!(?moved, "paired moves crossed an edge");
        return Ok(None);
    }
    Ok(Some(area))
}

fn same_area(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-10 * a.abs().max(b.abs()).max(1.0)
}

/// Area of a bounded face: its outer ring minus its holes.
fn face_area(dcel: &SchematicDcel, face: FaceId) -> f64 {
    let holes: f64 = dcel.face(face).inner_edges.iter()
        .map(|&inner| polygon_area(&dcel.cycle(inner).map(|he| dcel.tail_coords(he)).collect::<Vec<_>>()))
        .sum();
    polygon_area(&dcel.face_ring(face)) - holes
}

/// Some edge at `v` meets another edge away from a shared endpoint.
fn crosses_other_edges(dcel: &SchematicDcel, v: VertexId) -> bool {
    dcel.outgoing(v).iter().any(|&he| {
        let (tail, head) = (dcel.tail(he), dcel.head(he));
        let segment = (dcel.tail_coords(he), dcel.head_coords(he));
        dcel.edge_pairs()
            .filter(|&other| other != he && other != dcel.twin(he))
            .any(|other| {
                let ends = [dcel.tail(other), dcel.head(other)];
                let adjacent = ends.contains(&tail) || ends.contains(&head);
                match segment_intersection(segment, (dcel.tail_coords(other), dcel.head_coords(other))) {
                    None => false,
                    Some(SegmentIntersection::Overlap(a, b)) => !coords_eq(a, b),
                    Some(SegmentIntersection::Point(_)) => !adjacent,
                }
            })
    })
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use geo::{LineString, MultiPolygon, Polygon};
    use geograph::Dcel;

    use super::*;
    use crate::geometry::approx_eq;

    fn c(x: f64, y: f64) -> Coord<f64> { Coord { x, y } }

    /// A ring `A, B, C, D, others...` with the configuration of `B → C`.
    struct Setup {
        dcel:       SchematicDcel,
        boundaries: FaceFaceBoundaryList,
        inner:      HalfEdgeId,
    }

    impl Setup {
        fn new(points: &[(f64, f64)]) -> Self {
            let mut ring: Vec<(f64, f64)> = points.to_vec();
            ring.push(points[0]);
            let polygon = Polygon::new(LineString::from(ring), vec![]);
            let dcel: SchematicDcel = Dcel::from_multipolygons(&[MultiPolygon(vec![polygon])]).unwrap();
            let boundaries = FaceFaceBoundaryList::new(&dcel);
            let (b, c_) = (points[1], points[2]);
            let inner = dcel.find_edge(c(b.0, b.1), c(c_.0, c_.1)).unwrap();
            Self { dcel, boundaries, inner }
        }

        fn configuration(&self) -> Configuration {
            Configuration::new(&self.dcel, &self.boundaries, self.inner).unwrap()
        }

        fn segments(&self, edges: &[HalfEdgeId]) -> Vec<(Coord<f64>, Coord<f64>)> {
            edges.iter().map(|&he| (self.dcel.tail_coords(he), self.dcel.head_coords(he))).collect()
        }
    }

    fn assert_point(got: Option<Coord<f64>>, want: Option<(f64, f64)>) {
        match (got, want) {
            (Some(got), Some(want)) => assert!(coords_eq(got, c(want.0, want.1)), "{got:?} != {want:?}"),
            (None, None) => {}
            _ => panic!("{got:?} != {want:?}"),
        }
    }

    fn assert_ring(got: &[Coord<f64>], want: &[(f64, f64)]) {
        assert_eq!(got.len(), want.len(), "{got:?}");
        for (g, w) in got.iter().zip(want) {
            assert!(coords_eq(*g, c(w.0, w.1)), "{got:?} != {want:?}");
        }
    }

    /// Whether `segments` contains the undirected edge `p`–`q`.
    fn has_segment(segments: &[(Coord<f64>, Coord<f64>)], p: (f64, f64), q: (f64, f64)) -> bool {
        let (p, q) = (c(p.0, p.1), c(q.0, q.1));
        segments.iter().any(|&(a, b)| (coords_eq(a, p) && coords_eq(b, q)) || (coords_eq(a, q) && coords_eq(b, p)))
    }

    const BASIC: [(f64, f64); 5] = [(-4.0, 4.0), (-2.0, 0.0), (2.0, 0.0), (1.0, -2.0), (6.0, 2.0)];

    #[test]
    fn tracks_of_square_edges() {
        let s = Setup::new(&[(0.0, 200.0), (0.0, 0.0), (200.0, 0.0), (200.0, 200.0)]);
        let first = s.configuration();
        assert!(approx_eq(first.track(&s.dcel, OuterEdge::Prev).angle, 1.5 * PI));
        assert!(approx_eq(first.track(&s.dcel, OuterEdge::Next).angle, 0.5 * PI));

        let second = Configuration::new(&s.dcel, &s.boundaries, s.dcel.next(s.inner)).unwrap();
        assert!(approx_eq(second.track(&s.dcel, OuterEdge::Prev).angle, 0.0));
        assert!(approx_eq(second.track(&s.dcel, OuterEdge::Next).angle, PI));
    }

    #[test]
    fn x_is_the_three_edge_window() {
        let s = Setup::new(&[(-4.0, 4.0), (-2.0, 0.0), (2.0, 0.0), (1.0, -2.0), (8.0, 6.0)]);
        let configuration = s.configuration();
        let x = s.segments(&configuration.x());
        assert!(coords_eq(x[0].0, c(-4.0, 4.0)));
        assert!(coords_eq(x[1].0, c(-2.0, 0.0)));
        assert!(coords_eq(x[2].0, c(2.0, 0.0)));
        assert!(coords_eq(x[2].1, c(1.0, -2.0)));
        assert_eq!(configuration.x_complement(&s.dcel, &s.boundaries).len(), 2);
    }

    #[test]
    fn contraction_points() {
        use ContractionType::{Negative, Positive};
        let cases: [(&[(f64, f64)], Option<(f64, f64)>, Option<(f64, f64)>); 8] = [
            (&[(-4.0, 4.0), (-2.0, 0.0), (2.0, 0.0), (1.0, -2.0), (8.0, 6.0)], Some((-4.0, 4.0)), Some((1.0, -2.0))),
            (&[(-4.0, 2.0), (-2.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 6.0)], Some((2.0, 2.0)), None),
            (&[(-4.0, 0.0), (-2.0, 2.0), (2.0, 2.0), (6.0, 0.0), (0.0, 6.0)], None, Some((-4.0, 0.0))),
            (&BASIC, Some((-4.0, 4.0)), Some((1.0, -2.0))),
            (&[(-4.0, 4.0), (0.0, 0.0), (2.0, 0.0), (0.0, -2.0), (8.0, 4.0)], Some((-4.0, 4.0)), Some((1.0, -1.0))),
            (&[(-2.0, 2.0), (-2.0, 0.0), (2.0, 0.0), (8.0, -2.0), (4.0, 4.0)], Some((-2.0, 4.0 / 3.0)), Some((8.0, -2.0))),
            (&[(-8.0, -2.0), (-2.0, 0.0), (2.0, 0.0), (2.0, 2.0), (-4.0, 4.0)], Some((2.0, 4.0 / 3.0)), Some((-8.0, -2.0))),
            (&[(-2.0, 2.0), (-2.0, 0.0), (2.0, 0.0), (2.0, -2.0), (6.0, 4.0)], Some((-2.0, 2.0)), Some((2.0, -2.0))),
        ];
        for (ring, negative, positive) in cases {
            let s = Setup::new(ring);
            let points = s.configuration().contraction_points(&s.dcel);
            assert_point(points[0], negative);
            assert_point(points[1], positive);
            let configuration = s.configuration();
            assert_eq!(configuration.contraction(Negative).is_some(), negative.is_some());
            assert_eq!(configuration.contraction(Positive).is_some(), positive.is_some());
        }

        let s = Setup::new(&[(-2.0, 2.0), (-2.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 4.0)]);
        assert_point(s.configuration().contraction_points(&s.dcel)[0], Some((2.0, 2.0)));
    }

    #[test]
    fn contraction_areas() {
        let s = Setup::new(&BASIC);
        let configuration = s.configuration();
        let [negative, positive] = configuration.contraction_points(&s.dcel);
        assert_ring(
            &configuration.contraction_area(&s.dcel, negative.unwrap()),
            &[(-4.0, 4.0), (-2.0, 0.0), (2.0, 0.0), (4.0, 4.0)],
        );
        assert_ring(
            &configuration.contraction_area(&s.dcel, positive.unwrap()),
            &[(1.0, -2.0), (2.0, 0.0), (-2.0, 0.0), (-1.0, -2.0)],
        );
        let positive = configuration.contraction(ContractionType::Positive).unwrap();
        assert!(approx_eq(positive.area, 6.0));
    }

    #[test]
    fn blocking_edge_partially_inside() {
        let s = Setup::new(&BASIC);
        let configuration = s.configuration();
        assert_eq!(configuration.blocking_number(ContractionType::Negative), Some(1));
        let blocking = s.segments(&configuration.contraction(ContractionType::Negative).unwrap().blocking);
        assert!(has_segment(&blocking, (6.0, 2.0), (-4.0, 4.0)));
        assert_eq!(configuration.blocking_number(ContractionType::Positive), Some(0));
    }

    #[test]
    fn blocking_edges_partially_and_entirely_inside() {
        let s = Setup::new(&[(-4.0, 4.0), (-2.0, 0.0), (2.0, 0.0), (1.0, -2.0), (6.0, 2.0), (1.0, 1.0), (-1.0, 1.0)]);
        let configuration = s.configuration();
        let blocking = s.segments(&configuration.contraction(ContractionType::Negative).unwrap().blocking);
        assert_eq!(blocking.len(), 3);
        assert!(has_segment(&blocking, (6.0, 2.0), (1.0, 1.0)));
        assert!(has_segment(&blocking, (1.0, 1.0), (-1.0, 1.0)));
        assert!(has_segment(&blocking, (-1.0, 1.0), (-4.0, 4.0)));
        assert_eq!(configuration.blocking_number(ContractionType::Positive), Some(0));
    }

    #[test]
    fn blocking_edges_on_both_sides() {
        let s = Setup::new(&[
            (-4.0, 4.0), (-2.0, 0.0), (2.0, 0.0), (1.0, -2.0), (2.0, -2.0), (0.0, -3.0), (0.0, -1.0),
            (-2.0, -4.0), (6.0, -4.0), (6.0, 2.0), (1.0, 1.0), (-1.0, 1.0),
        ]);
        let configuration = s.configuration();
        assert_eq!(configuration.blocking_number(ContractionType::Negative), Some(3));
        let blocking = s.segments(&configuration.contraction(ContractionType::Positive).unwrap().blocking);
        assert_eq!(blocking.len(), 2);
        assert!(has_segment(&blocking, (0.0, -3.0), (0.0, -1.0)));
        assert!(has_segment(&blocking, (0.0, -1.0), (-2.0, -4.0)));
    }

    #[test]
    fn feasibility() {
        let s = Setup::new(&BASIC);
        let configuration = s.configuration();
        assert!(configuration.is_feasible(ContractionType::Positive));
        assert!(!configuration.is_feasible(ContractionType::Negative));

        let s = Setup::new(&[(-4.0, 2.0), (-2.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 6.0)]);
        assert!(!s.configuration().is_feasible(ContractionType::Positive));
    }

    #[test]
    fn junction_vertices_have_no_configuration() {
        let square = |x0: f64, y0: f64| {
            let ring: LineString<f64> = vec![(x0, y0), (x0 + 2.0, y0), (x0 + 2.0, y0 + 2.0), (x0, y0 + 2.0), (x0, y0)].into();
            MultiPolygon(vec![Polygon::new(ring, vec![])])
        };
        let mut dcel: SchematicDcel = Dcel::from_multipolygons(&[
            square(0.0, 0.0), square(2.0, 0.0), square(0.0, 2.0), square(2.0, 2.0),
        ]).unwrap();
        let boundaries = FaceFaceBoundaryList::new(&dcel);
        // (2, 2) joins four edges.
        let he = dcel.find_edge(c(2.0, 0.0), c(2.0, 2.0)).unwrap();
        assert!(Configuration::new(&dcel, &boundaries, he).is_none());

        let he = dcel.find_edge(c(0.0, 0.0), c(2.0, 0.0)).unwrap();
        let configuration = Configuration::new(&dcel, &boundaries, he).unwrap();
        assert!(configuration.has_junction(&dcel));

        add_configurations(&mut dcel, &boundaries);
        assert!(dcel.half_edge(he).data.configuration.is_some());
        for kind in ContractionType::ALL {
            assert_eq!(do_edge_move(&mut dcel, &boundaries, he, kind, None).unwrap(), None);
        }
    }

    #[test]
    fn full_move_to_outer_endpoint() {
        // The step (2,0)→(2,1) slides right until it meets (4,1).
        let mut s = Setup::new(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (4.0, 1.0), (4.0, 4.0), (0.0, 4.0)]);
        add_configurations(&mut s.dcel, &s.boundaries);
        let configuration = s.dcel.half_edge(s.inner).data.configuration.clone().unwrap();
        assert!(configuration.is_feasible(ContractionType::Positive));
        // Sliding left would land (2,1) on (0,1), inside the left wall.
        assert!(!configuration.is_feasible(ContractionType::Negative));

        let area = do_edge_move(&mut s.dcel, &s.boundaries, s.inner, ContractionType::Positive, None).unwrap().unwrap();
        assert!(approx_eq(area, 2.0));
        s.dcel.validate().unwrap();
        assert_eq!(s.dcel.num_vertices(), 5);
        assert!(s.dcel.find_vertex(c(4.0, 0.0)).is_some());
        assert!(s.dcel.find_vertex(c(2.0, 1.0)).is_none());
    }

    #[test]
    fn paired_moves_keep_face_area() {
        // A notch along the bottom and a bump on the right; filling the notch
        // is balanced by shaving the bump.
        let mut s = Setup::new(&[
            (0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (6.0, 1.0), (6.0, 2.0),
            (8.0, 2.0), (8.0, 5.0), (6.0, 5.0), (6.0, 6.0), (0.0, 6.0),
        ]);
        add_configurations(&mut s.dcel, &s.boundaries);
        let face = s.dcel.face_of(s.inner);
        assert!(approx_eq(face_area(&s.dcel, face), 38.0));

        let area = paired_edge_move(&mut s.dcel, &s.boundaries).unwrap().unwrap();
        assert!(area > 0.0);
        s.dcel.validate().unwrap();
        assert!((face_area(&s.dcel, face) - 38.0).abs() < 1e-9);
        assert!(s.dcel.vertex_ids().all(|v| !crosses_other_edges(&s.dcel, v)));
    }

    #[test]
    fn edge_through_a_landing_corner_blocks() {
        // Sliding (2,0)→(2,1) left would put (2,1) on (0,1), inside (0,4)→(0,0).
        let s = Setup::new(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (4.0, 1.0), (4.0, 4.0), (0.0, 4.0)]);
        let configuration = s.configuration();
        let blocking = s.segments(&configuration.contraction(ContractionType::Negative).unwrap().blocking);
        assert_eq!(blocking.len(), 1);
        assert!(has_segment(&blocking, (0.0, 4.0), (0.0, 0.0)));
    }

    #[test]
    fn partial_move_sweeps_target_area() {
        let mut s = Setup::new(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (4.0, 1.0), (4.0, 4.0), (0.0, 4.0)]);
        add_configurations(&mut s.dcel, &s.boundaries);
        let kind = ContractionType::Positive;
        let area = do_edge_move(&mut s.dcel, &s.boundaries, s.inner, kind, Some(1.0)).unwrap().unwrap();
        assert!((area - 1.0).abs() < 1e-9);
        s.dcel.validate().unwrap();
        assert_eq!(s.dcel.num_vertices(), 6);
        assert!(s.dcel.find_vertex(c(3.0, 0.0)).is_some());
        assert!(s.dcel.find_vertex(c(3.0, 1.0)).is_some());
    }
}
