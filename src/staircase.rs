//! Staircases: conforming zig-zag replacements for non-conforming edges.
//!
//! Each non-AB edge gets one staircase, stored on the half-edge leaving its
//! significant endpoint.  A staircase owns a convex-ish *region* in which its
//! steps stay; overlapping regions determine the clearance `de` that bounds
//! the step size, after which the staircase points are spliced into the
//! subdivision.

use std::f64::consts::PI;

use geo::{ConvexHull, Coord, Intersects, MultiPoint, Point};
use geograph::{DcelError, HalfEdgeId, VertexId};
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, info, warn};

use crate::classify::{reclassify_aligned, EdgeClass, OrientationClass};
use crate::error::{Result, SchematizeError};
use crate::geometry::{
    cross, distance, is_in_convex_polygon, lerp, offset, point_segment_distance, segment_distance,
    to_polygon, unit, Line,
};
use crate::orientation::DirectionSet;
use crate::subdivision::SchematicDcel;

/// Upper bound on the step count of a single staircase.
const MAX_STEPS: usize = 1025;

/// Default extra clearance of an AD staircase, as a fraction of its length.
const DELTA_E_FRACTION: f64 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct Staircase {
    pub edge:     HalfEdgeId,
    pub tail:     VertexId,
    pub head:     VertexId,
    pub from:     Coord<f64>,
    pub to:       Coord<f64>,
    pub class:    EdgeClass,
    /// Lower and upper direction of the edge's sector.
    pub sector:   (usize, usize),
    /// Substitute path, from `from` to `to`.
    pub points:   Vec<Coord<f64>>,
    /// Area the path stays in (not closed).
    pub region:   Vec<Coord<f64>>,
    /// Step count.
    pub se:       usize,
    /// Minimum clearance to interfering edges.
    pub de:       Option<f64>,
    /// Extra clearance of AD staircases.
    pub delta_e:  Option<f64>,
    pub interferes_with: Vec<HalfEdgeId>,
}

impl Staircase {
    /// Build the staircase of `he` with its class-default step count.
    pub fn new(dcel: &SchematicDcel, dirs: &DirectionSet, epsilon: f64, he: HalfEdgeId) -> Result<Self> {
        let class = dcel.half_edge(he).data.class.ok_or(SchematizeError::Unclassified(he))?;
        let sector = dirs.sector_of(dcel.angle(he));
        let length = dcel.length(he);
        let mut staircase = Staircase {
            edge: he,
            tail: dcel.tail(he),
            head: dcel.head(he),
            from: dcel.tail_coords(he),
            to: dcel.head_coords(he),
            class,
            sector: (sector.idx, dirs.ccw(sector.idx)),
            points: Vec::new(),
            region: Vec::new(),
            se: default_steps(class.class),
            de: None,
            delta_e: (class.class == OrientationClass::AD).then_some(DELTA_E_FRACTION * length),
            interferes_with: Vec::new(),
        };
        staircase.rebuild(dirs, epsilon);
        Ok(staircase)
    }

    pub fn length(&self) -> f64 { distance(self.from, self.to) }

    pub fn angle(&self) -> f64 { geograph::angle_between(self.from, self.to) }

    /// Recompute points and region from the current parameters.
    pub fn rebuild(&mut self, dirs: &DirectionSet, epsilon: f64) {
        self.points = self.compute_points(dirs, epsilon);
        self.region = self.compute_region(dirs);
    }

    fn compute_points(&self, dirs: &DirectionSet, epsilon: f64) -> Vec<Coord<f64>> {
        let (v, w) = (self.from, self.to);
        let assigned = dirs.angle(self.class.assigned);
        match self.class.class {
            OrientationClass::AB => vec![v, w],
            OrientationClass::UB | OrientationClass::E => {
                let other = dirs.angle(self.other_associated());
                let (l1, l2) = decompose(w - v, assigned, other);
                let (s1, s2) = (unit(assigned) * (l1 / self.se as f64), unit(other) * (l2 / self.se as f64));
                let mut points = vec![v];
                let mut p = v;
                for i in 0..self.se {
                    let first_assigned = match self.class.class {
                        OrientationClass::UB => i % 2 == 0,
                        _ => i < self.se / 2,
                    };
                    let steps = if first_assigned { [s1, s2] } else { [s2, s1] };
                    for step in steps {
                        p = p + step;
                        points.push(p);
                    }
                }
                finish(points, w)
            }
            OrientationClass::AD => {
                let delta = self.delta_e.unwrap_or(DELTA_E_FRACTION * self.length());
                let along = self.angle();
                let half = self.length() * (1.0 - epsilon) / 2.0;
                let p1 = offset(v, delta, assigned);
                let p2 = offset(p1, half, along);
                let p3 = offset(p2, 2.0 * delta, assigned + PI);
                let p4 = offset(p3, half, along);
                let p5 = offset(p4, delta, assigned);
                vec![v, p1, p2, p3, p4, p5, w]
            }
            OrientationClass::UD => {
                let (near, far) = self.ud_directions(dirs);
                let (near_a, far_a) = (dirs.angle(near), dirs.angle(far));
                let steps = self.se.saturating_sub(1).max(1);
                let (a_near, a_far) = decompose(w - v, near_a, far_a);
                let (s_near, s_far) = (unit(near_a) * (a_near / steps as f64), unit(far_a) * (a_far / steps as f64));

                // The gable adds back the area of the dropped step triangle.
                let gable = a_far / steps as f64 / 2.0;
                let p1 = offset(v, gable, assigned);
                let p2 = p1 + s_near;
                let mut points = vec![v, p1, p2];
                let mut p = v;
                for i in 0..steps {
                    let near_first = (i as f64) < self.se as f64 / 2.0 - 1.0;
                    let pair = if near_first { [s_near, s_far] } else { [s_far, s_near] };
                    for step in pair {
                        p = p + step;
                        points.push(p);
                    }
                }
                finish(points, w)
            }
        }
    }

    fn compute_region(&self, dirs: &DirectionSet) -> Vec<Coord<f64>> {
        let (v, w) = (self.from, self.to);
        let segment = vec![v, w, w, v];
        match self.class.class {
            OrientationClass::AB => segment,
            OrientationClass::UB | OrientationClass::E => {
                let (lower, upper) = (dirs.angle(self.sector.0), dirs.angle(self.sector.1));
                let b = Line::new(v, lower).intersect(&Line::new(w, upper));
                let d = Line::new(v, upper).intersect(&Line::new(w, lower));
                match (b, d) {
                    (Some(b), Some(d)) => vec![v, b, w, d],
                    _ => segment,
                }
            }
            OrientationClass::AD => {
                let hull = MultiPoint::from(self.points.iter().map(|&c| Point::from(c)).collect::<Vec<_>>()).convex_hull();
                let mut ring: Vec<Coord<f64>> = hull.exterior().0.clone();
                if ring.len() > 1 && ring.first() == ring.last() { ring.pop(); }
                ring
            }
            OrientationClass::UD => {
                let (near, far) = self.ud_directions(dirs);
                let (near_a, far_a) = (dirs.angle(near), dirs.angle(far));
                let assigned = dirs.angle(self.class.assigned);
                let Some(&apex) = self.points.get(2) else { return segment };

                let a = Line::new(v, assigned);
                let b = Line::new(apex, near_a);
                let c = Line::new(w, far_a);
                let d = Line::new(w, near_a);
                let e = Line::new(v, far_a);
                let (Some(pb), Some(pc), Some(pd)) = (a.intersect(&b), b.intersect(&c), e.intersect(&d)) else {
                    return segment;
                };
                let mut region = vec![v, pb, pc, w, pd];
                if !is_in_convex_polygon(apex, &region) {
                    region.insert(2, apex);
                }
                region
            }
        }
    }

    /// The associated direction the staircase does not start with.
    fn other_associated(&self) -> usize {
        if self.class.assigned == self.sector.0 { self.sector.1 } else { self.sector.0 }
    }

    /// For UD staircases: the associated direction next to the assigned one,
    /// and the other associated direction.
    fn ud_directions(&self, dirs: &DirectionSet) -> (usize, usize) {
        let (lower, upper) = self.sector;
        let assigned = dirs.angle(self.class.assigned);
        let to_lower = crate::orientation::angular_distance(assigned, dirs.angle(lower));
        let to_upper = crate::orientation::angular_distance(assigned, dirs.angle(upper));
        if to_lower <= to_upper { (lower, upper) } else { (upper, lower) }
    }

    /// Record an interfering edge and tighten the clearance.
    fn set_edge_distance(&mut self, other: HalfEdgeId, de: f64) {
        if !self.interferes_with.contains(&other) { self.interferes_with.push(other); }
        self.de = Some(self.de.map_or(de, |current| current.min(de)));
    }

    /// Derive step count (or extra clearance for AD) from `de`.
    fn update_steps(&mut self, dirs: &DirectionSet) {
        let Some(de) = self.de.filter(|&de| de > 0.0) else { return };
        let length = self.length();
        match self.class.class {
            OrientationClass::AB => {}
            OrientationClass::AD => {
                self.delta_e = Some((de / 2.0).min(DELTA_E_FRACTION * length));
            }
            OrientationClass::UD => {
                let d1 = self.points.get(1)
                    .map_or(0.0, |&p| point_segment_distance(p, self.from, self.to));
                let se = (2.0 * d1 * length / de + 1.0).ceil();
                self.se = force_odd(se).max(5);
            }
            OrientationClass::UB | OrientationClass::E => {
                let sector = dirs.sector(self.sector.0);
                let alpha1 = sector.offset(self.angle());
                let alpha2 = sector.upper - sector.lower - alpha1;
                let lmax = de * (1.0 / alpha1.tan() + 1.0 / alpha2.tan()) / 2.0;
                self.se = force_odd((length / lmax).ceil()).max(3);
            }
        }
    }
}

/// Step count used until clearance says otherwise.
pub fn default_steps(class: OrientationClass) -> usize {
    match class {
        OrientationClass::UB => 2,
        OrientationClass::E | OrientationClass::UD => 4,
        OrientationClass::AB | OrientationClass::AD => 1,
    }
}

fn force_odd(steps: f64) -> usize {
    let steps = if steps.is_finite() && steps >= 1.0 { steps as usize } else { 1 };
    (steps | 1).min(MAX_STEPS)
}

/// Components of `v` along the directions `a` and `b`.
fn decompose(v: Coord<f64>, a: f64, b: f64) -> (f64, f64) {
    let (ua, ub) = (unit(a), unit(b));
    let det = cross(ua, ub);
    (cross(v, ub) / det, cross(ua, v) / det)
}

/// Snap the accumulated endpoint onto the exact head.
fn finish(mut points: Vec<Coord<f64>>, head: Coord<f64>) -> Vec<Coord<f64>> {
    if let Some(last) = points.last_mut() { *last = head; }
    points
}

// ---------------------------------------------------------------------------
// Attaching, clearance, splicing
// ---------------------------------------------------------------------------

/// Attach one staircase to every non-AB edge, on the half-edge leaving its
/// significant endpoint.
pub fn add_staircases(dcel: &mut SchematicDcel, dirs: &DirectionSet, epsilon: f64) -> Result<usize> {
    let ids: Vec<_> = dcel.half_edge_ids().collect();
    for he in ids {
        dcel.half_edge_mut(he).data.staircase = None;
    }

    let pairs: Vec<_> = dcel.edge_pairs().collect();
    let mut count = 0;
    for he in pairs {
        let class = dcel.half_edge(he).data.class.ok_or(SchematizeError::Unclassified(he))?;
        if class.class == OrientationClass::AB { continue; }
        let he = if dcel.vertex(dcel.head(he)).data.significant { dcel.twin(he) } else { he };
        let staircase = Staircase::new(dcel, dirs, epsilon, he)?;
        dcel.half_edge_mut(he).data.staircase = Some(staircase);
        count += 1;
    }
    Ok(count)
}

#[derive(Debug, Clone)]
struct RegionBox {
    idx: usize,
    bbox: AABB<[f64; 2]>,
}

impl RTreeObject for RegionBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { self.bbox }
}

fn region_box(idx: usize, region: &[Coord<f64>]) -> RegionBox {
    let (mut min, mut max) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
    for c in region {
        min = [min[0].min(c.x), min[1].min(c.y)];
        max = [max[0].max(c.x), max[1].max(c.y)];
    }
    RegionBox { idx, bbox: AABB::from_corners(min, max) }
}

/// Clearance `de` of staircase `s` against `t`, if they interfere.
fn edge_distance(dirs: &DirectionSet, epsilon: f64, s: &Staircase, t: &Staircase) -> Option<f64> {
    if !to_polygon(&s.region).intersects(&to_polygon(&t.region)) { return None; }

    let shared = [s.tail, s.head].into_iter().find(|v| *v == t.tail || *v == t.head);
    let Some(v) = shared else {
        return Some(segment_distance((s.from, s.to), (t.from, t.to)));
    };

    // Both edges oriented away from the shared vertex.
    let far = |st: &Staircase| if st.tail == v { (st.from, st.to) } else { (st.to, st.from) };
    let (origin, s_far) = far(s);
    let (_, t_far) = far(t);
    let (s_angle, t_angle) = (geograph::angle_between(origin, s_far), geograph::angle_between(origin, t_far));
    if !dirs.sectors_enclosing(s_angle).iter().any(|sector| sector.encloses(t_angle)) {
        return None;
    }

    let along_t = |fraction: f64| point_segment_distance(lerp(origin, t_far, fraction), origin, s_far);
    let along_s = |fraction: f64| point_segment_distance(lerp(origin, s_far, fraction), origin, t_far);
    let first_step = |t: &Staircase| 1.0 / (t.se.max(2) - 1) as f64;
    let de = match (s.class.class, t.class.class) {
        (OrientationClass::AB, _) => return None,
        (OrientationClass::UB, OrientationClass::AD) => along_t((1.0 - epsilon) / 2.0),
        (OrientationClass::E, OrientationClass::E) => along_s(0.5),
        (OrientationClass::UB | OrientationClass::E, _) => along_t(first_step(t)),
        (OrientationClass::AD, _) => along_s((1.0 - epsilon) / 2.0),
        (OrientationClass::UD, _) => along_s(1.0 / 3.0),
    };
    Some(de)
}

/// Compute clearances and step counts, then rebuild every staircase.
///
/// Deviating staircases are sized first, among themselves; the others are
/// then sized against all staircases.
pub fn calculate_staircases(dcel: &mut SchematicDcel, dirs: &DirectionSet, epsilon: f64) -> Result<()> {
    let ids: Vec<_> = dcel.half_edge_ids()
        .filter(|&he| dcel.half_edge(he).data.staircase.is_some())
        .collect();
    let mut stairs: Vec<Staircase> = ids.iter()
        .filter_map(|&he| dcel.half_edge_mut(he).data.staircase.take())
        .collect();

    let boxes: Vec<RegionBox> = stairs.iter().enumerate().map(|(i, s)| region_box(i, &s.region)).collect();
    let tree = RTree::bulk_load(boxes.clone());
    let (deviating, others): (Vec<usize>, Vec<usize>) = (0..stairs.len())
        .partition(|&i| stairs[i].class.class.is_deviating());

    for (pass, subjects, deviating_only) in [(1, &deviating, true), (2, &others, false)] {
        // Clearances of a pass are measured against the staircases as they
        // stood before it.
        let mut clearances = Vec::new();
        for &i in subjects {
            let candidates = tree.locate_in_envelope_intersecting(&boxes[i].bbox)
                .map(|b| b.idx)
                .filter(|&j| j != i && (!deviating_only || stairs[j].class.class.is_deviating()));
            for j in candidates {
                if let Some(de) = edge_distance(dirs, epsilon, &stairs[i], &stairs[j]) {
                    clearances.push((i, stairs[j].edge, de));
                }
            }
        }
        for (i, other, de) in clearances {
            stairs[i].set_edge_distance(other, de);
        }

        for &i in subjects {
            if stairs[i].de.is_some_and(|de| de <= 0.0) {
                warn!(edge = %stairs[i].edge, "staircase touches an interfering edge; keeping default steps");
            }
            stairs[i].update_steps(dirs);
            stairs[i].rebuild(dirs, epsilon);
            debug!(pass, edge = %stairs[i].edge, class = %stairs[i].class.class, se = stairs[i].se, de = ?stairs[i].de, "sized staircase");
        }
    }

    for (he, staircase) in ids.into_iter().zip(stairs) {
        dcel.half_edge_mut(he).data.staircase = Some(staircase);
    }
    Ok(())
}

/// Splice every staircase into the subdivision.  A staircase with an
/// occupied point is skipped whole.  Every resulting half-edge
/// is reclassified as aligned basic.
pub fn replace_edges_with_staircases(dcel: &mut SchematicDcel, dirs: &DirectionSet) -> Result<usize> {
    let ids: Vec<_> = dcel.half_edge_ids()
        .filter(|&he| dcel.half_edge(he).data.staircase.is_some())
        .collect();

    let mut inserted = 0;
    for he in ids {
        let Some(staircase) = dcel.half_edge_mut(he).data.staircase.take() else { continue };
        let interior = staircase.points.get(1..staircase.points.len().saturating_sub(1)).unwrap_or(&[]);
        match dcel.subdivide_along(he, interior) {
            Ok(_) => inserted += interior.len(),
            Err(err @ (DcelError::OccupiedPoint { .. } | DcelError::RepeatedPoint { .. })) => {
                warn!(edge = %he, %err, "staircase point is taken; keeping the edge");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let nonconforming = reclassify_aligned(dcel, dirs);
    if nonconforming > 0 {
        warn!(nonconforming, "edges remain off the direction set after splicing");
    }
    info!(inserted, "spliced staircases");
    Ok(inserted)
}
