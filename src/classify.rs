//! Vertex significance and per-edge orientation classes.
//!
//! At a significant vertex the outgoing edges compete for directions: each
//! edge starts on its closest associated direction and conflicts between
//! angularly adjacent edges are resolved first by moving an edge to its other
//! associated direction, then by letting one edge deviate outward.  Edges
//! without a significant endpoint simply take their closest direction.

use std::f64::consts::PI;
use std::fmt;

use geograph::{HalfEdgeId, VertexId};
use tracing::{debug, warn};

use crate::error::Result;
use crate::geometry::round;
use crate::orientation::{angular_distance, DirectionSet};
use crate::subdivision::SchematicDcel;

/// Relation of an edge to the direction set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrientationClass {
    /// Aligned basic: lies on a direction and keeps it.
    AB,
    /// Unaligned basic: assigned one of its two associated directions.
    UB,
    /// Aligned deviating: lies on a direction but must leave it.
    AD,
    /// Unaligned deviating: assigned a direction outside its sector.
    UD,
    /// Evading: unaligned basic edge sharing its sector with another one at
    /// the same significant vertex.
    E,
}

impl OrientationClass {
    pub fn is_deviating(self) -> bool { matches!(self, Self::AD | Self::UD) }
}

impl fmt::Display for OrientationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Orientation class of a half-edge together with its assigned direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeClass {
    pub class:    OrientationClass,
    /// Index into the direction set.
    pub assigned: usize,
}

// ---------------------------------------------------------------------------
// Significance
// ---------------------------------------------------------------------------

/// A vertex is significant when its edges constrain each other: degree ≥ 3,
/// or degree 2 where the edges are not both aligned and some sector encloses
/// both of them.
pub fn is_significant(dcel: &SchematicDcel, dirs: &DirectionSet, v: VertexId) -> bool {
    let edges = dcel.outgoing(v);
    if edges.len() != 2 { return edges.len() >= 3; }

    let (a, b) = (dcel.angle(edges[0]), dcel.angle(edges[1]));
    if dirs.aligned(a).is_some() && dirs.aligned(b).is_some() { return false; }
    dirs.sectors_enclosing(a).iter().any(|s| s.encloses(b))
}

/// Recompute the significance flag of every vertex; returns how many are set.
pub fn mark_significant(dcel: &mut SchematicDcel, dirs: &DirectionSet) -> usize {
    let flags: Vec<_> = dcel.vertex_ids().map(|v| (v, is_significant(dcel, dirs, v))).collect();
    for &(v, significant) in &flags {
        dcel.vertex_mut(v).data.significant = significant;
    }
    flags.iter().filter(|(_, s)| *s).count()
}

/// Insert a midpoint on every edge whose endpoints are both significant, so
/// that each edge has at most one significant endpoint.
pub fn split_significant_edges(dcel: &mut SchematicDcel) -> Result<usize> {
    let targets: Vec<_> = dcel.edge_pairs()
        .filter(|&he| {
            dcel.vertex(dcel.tail(he)).data.significant && dcel.vertex(dcel.head(he)).data.significant
        })
        .collect();

    let mut count = 0;
    for he in targets {
        match dcel.subdivide(he, None) {
            Ok(_) => count += 1,
            Err(err) => warn!(edge = %he, %err, "could not split edge between significant vertices"),
        }
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Slot {
    edge:       HalfEdgeId,
    angle:      f64,
    aligned:    Option<usize>,
    /// Directions bounding the edge's sector (equal for aligned edges).
    associated: (usize, usize),
    assigned:   usize,
}

impl Slot {
    fn new(dcel: &SchematicDcel, dirs: &DirectionSet, edge: HalfEdgeId) -> Self {
        let angle = dcel.angle(edge);
        match dirs.aligned(angle) {
            Some(d) => Slot { edge, angle, aligned: Some(d), associated: (d, d), assigned: d },
            None => {
                let (lower, upper) = dirs.associated(angle);
                let to_lower = angular_distance(angle, dirs.angle(lower));
                let to_upper = angular_distance(angle, dirs.angle(upper));
                let assigned = if round(to_upper - to_lower) < 0.0 { upper } else { lower };
                Slot { edge, angle, aligned: None, associated: (lower, upper), assigned }
            }
        }
    }

    fn other_associated(&self) -> Option<usize> {
        if self.aligned.is_some() { return None; }
        Some(if self.assigned == self.associated.0 { self.associated.1 } else { self.associated.0 })
    }

    fn is_basic(&self) -> bool {
        match self.aligned {
            Some(d) => self.assigned == d,
            None => self.assigned == self.associated.0 || self.assigned == self.associated.1,
        }
    }

    fn class(&self, slots: &[Slot]) -> OrientationClass {
        match (self.aligned, self.is_basic()) {
            (Some(_), true) => OrientationClass::AB,
            (Some(_), false) => OrientationClass::AD,
            (None, false) => OrientationClass::UD,
            (None, true) => {
                let evading = slots.iter().any(|s| {
                    s.edge != self.edge && s.aligned.is_none() && s.is_basic() && s.associated == self.associated
                });
                if evading { OrientationClass::E } else { OrientationClass::UB }
            }
        }
    }
}

/// Classify the outgoing edges of a significant vertex.
pub fn classify_vertex(dcel: &SchematicDcel, dirs: &DirectionSet, v: VertexId) -> Vec<(HalfEdgeId, EdgeClass)> {
    // Counter-clockwise order.
    let mut slots: Vec<Slot> = dcel.outgoing(v).iter().rev()
        .filter(|&&he| dcel.length(he) > 0.0)
        .map(|&he| Slot::new(dcel, dirs, he))
        .collect();

    let n = slots.len();
    for _ in 0..n * dirs.len() {
        let mut progress = false;
        for i in 0..n {
            let j = (i + 1) % n;
            if i == j || slots[i].assigned != slots[j].assigned { continue; }
            // `a` is the clockwise member of the pair.
            let (a, b) = if (slots[j].angle - slots[i].angle).rem_euclid(2.0 * PI) < PI { (i, j) } else { (j, i) };
            if let Some((mover, target)) = resolve_conflict(dirs, &slots, a, b) {
                debug!(vertex = %v, edge = %slots[mover].edge, from = slots[mover].assigned, to = target, "resolved direction conflict");
                slots[mover].assigned = target;
                progress = true;
            }
        }
        if !progress { break; }
    }

    slots.iter()
        .map(|s| (s.edge, EdgeClass { class: s.class(&slots), assigned: s.assigned }))
        .collect()
}

/// Pick the edge of the conflicting pair `(a, b)` to move and its new
/// direction.  `a` may only move clockwise and `b` counter-clockwise.
fn resolve_conflict(dirs: &DirectionSet, slots: &[Slot], a: usize, b: usize) -> Option<(usize, usize)> {
    let d = slots[a].assigned;
    let (down, up) = (dirs.cw(d), dirs.ccw(d));
    let free = |k: usize| slots.iter().all(|s| s.assigned != k);
    let farther = || {
        let da = angular_distance(slots[a].angle, dirs.angle(d));
        let db = angular_distance(slots[b].angle, dirs.angle(d));
        if round(db - da) > 0.0 { (b, up) } else { (a, down) }
    };

    let a_basic = slots[a].other_associated() == Some(down) && free(down);
    let b_basic = slots[b].other_associated() == Some(up) && free(up);
    match (a_basic, b_basic) {
        (true, true) => return Some(farther()),
        (true, false) => return Some((a, down)),
        (false, true) => return Some((b, up)),
        (false, false) => {}
    }

    match (free(down), free(up)) {
        (true, true) => Some(farther()),
        (true, false) => Some((a, down)),
        (false, true) => Some((b, up)),
        (false, false) => None,
    }
}

/// Classification of an edge with no significant endpoint.
pub fn classify_free_edge(dcel: &SchematicDcel, dirs: &DirectionSet, he: HalfEdgeId) -> EdgeClass {
    let slot = Slot::new(dcel, dirs, he);
    let class = if slot.aligned.is_some() { OrientationClass::AB } else { OrientationClass::UB };
    EdgeClass { class, assigned: slot.assigned }
}

/// Set the class of `he` and the mirrored class of its twin.
pub fn assign(dcel: &mut SchematicDcel, dirs: &DirectionSet, he: HalfEdgeId, class: EdgeClass) {
    let twin = dcel.twin(he);
    dcel.half_edge_mut(he).data.class = Some(class);
    dcel.half_edge_mut(twin).data.class = Some(EdgeClass { class: class.class, assigned: dirs.opposite(class.assigned) });
}

/// Classify every edge.  Edges at significant vertices are classified from
/// that vertex; zero-length edges stay unclassified.
pub fn classify_edges(dcel: &mut SchematicDcel, dirs: &DirectionSet) -> Result<()> {
    let ids: Vec<_> = dcel.half_edge_ids().collect();
    for he in ids {
        dcel.half_edge_mut(he).data.class = None;
    }

    let significant: Vec<_> = dcel.vertex_ids().filter(|&v| dcel.vertex(v).data.significant).collect();
    for v in significant {
        for (he, class) in classify_vertex(dcel, dirs, v) {
            if dcel.half_edge(he).data.class.is_none() {
                assign(dcel, dirs, he, class);
            }
        }
    }

    let remaining: Vec<_> = dcel.edge_pairs()
        .filter(|&he| dcel.half_edge(he).data.class.is_none() && dcel.length(he) > 0.0)
        .collect();
    for he in remaining {
        let class = classify_free_edge(dcel, dirs, he);
        assign(dcel, dirs, he, class);
    }
    Ok(())
}

/// Mark every aligned edge AB on its own direction.  Returns how many edges
/// are left off the direction set.
pub fn reclassify_aligned(dcel: &mut SchematicDcel, dirs: &DirectionSet) -> usize {
    let pairs: Vec<_> = dcel.edge_pairs().collect();
    let mut nonconforming = 0;
    for he in pairs {
        match dirs.aligned(dcel.angle(he)) {
            Some(d) => assign(dcel, dirs, he, EdgeClass { class: OrientationClass::AB, assigned: d }),
            None => nonconforming += 1,
        }
    }
    nonconforming
}

#[cfg(test)]
mod tests {
    use geo::Coord;
    use geograph::Dcel;

    use super::*;
    use super::OrientationClass::*;

    /// Destinations around the origin, named by their approximate angle.
    fn destination(degrees: u32) -> Coord<f64> {
        let (x, y) = match degrees {
            0 => (4.0, 0.0),
            14 => (4.0, 1.0),
            37 => (4.0, 3.0),
            53 => (3.0, 4.0),
            76 => (1.0, 4.0),
            90 => (0.0, 4.0),
            104 => (-1.0, 4.0),
            143 => (-4.0, 3.0),
            180 => (-4.0, 0.0),
            217 => (-4.0, -3.0),
            270 => (0.0, -4.0),
            284 => (1.0, -4.0),
            315 => (4.0, -4.0),
            333 => (4.0, -2.0),
            _ => unreachable!("no fixture for {degrees}"),
        };
        Coord { x, y }
    }

    /// Classify a star of edges around a significant origin and return the
    /// classes of the outgoing edges in the order given.
    fn classify_star(orientations: usize, degrees: &[u32]) -> Vec<OrientationClass> {
        let dirs = DirectionSet::regular(orientations).unwrap();
        let mut dcel: SchematicDcel = Dcel::new();
        let o = dcel.make_vertex(Coord { x: 0.0, y: 0.0 });
        let edges: Vec<_> = degrees.iter()
            .map(|&d| {
                let v = dcel.make_vertex(destination(d));
                dcel.make_edge(o, v).unwrap().0
            })
            .collect();
        dcel.link();
        dcel.vertex_mut(o).data.significant = true;
        classify_edges(&mut dcel, &dirs).unwrap();

        edges.iter()
            .map(|&he| {
                let class = dcel.half_edge(he).data.class.unwrap();
                let twin = dcel.half_edge(dcel.twin(he)).data.class.unwrap();
                assert_eq!(class.class, twin.class);
                assert_eq!(twin.assigned, dirs.opposite(class.assigned));
                class.class
            })
            .collect()
    }

    #[test]
    fn two_orientations() {
        assert_eq!(classify_star(2, &[53, 217]), vec![UB, UB]);
        assert_eq!(classify_star(2, &[53, 180, 270]), vec![UB, AB, AB]);
        assert_eq!(classify_star(2, &[37, 90, 104]), vec![UB, AB, UB]);
        assert_eq!(classify_star(2, &[37, 53]), vec![E, E]);
        assert_eq!(classify_star(2, &[37, 53, 76]), vec![E, E, UD]);
        assert_eq!(classify_star(2, &[0, 37, 53, 76]), vec![AD, E, E, UD]);
        assert_eq!(classify_star(2, &[315, 333, 53, 76]), vec![E, E, UB, UD]);
    }

    #[test]
    fn four_orientations() {
        assert_eq!(classify_star(4, &[53, 217]), vec![UB, UB]);
        assert_eq!(classify_star(4, &[53, 180, 270]), vec![UB, AB, AB]);
        assert_eq!(classify_star(4, &[53, 90, 104]), vec![UB, AB, UB]);
        assert_eq!(classify_star(4, &[37, 53]), vec![UB, UB]);
        assert_eq!(classify_star(4, &[37, 53, 76]), vec![UB, E, E]);
        assert_eq!(classify_star(4, &[0, 14, 53, 76]), vec![AD, UB, E, E]);
        assert_eq!(classify_star(4, &[315, 333, 53, 76]), vec![AB, UB, E, E]);
    }

    #[test]
    fn deviating_edges_take_free_neighbor_direction() {
        let dirs = DirectionSet::regular(2).unwrap();
        let mut dcel: SchematicDcel = Dcel::new();
        let o = dcel.make_vertex(Coord { x: 0.0, y: 0.0 });
        let mut edges = Vec::new();
        for d in [0, 37, 53, 76] {
            let v = dcel.make_vertex(destination(d));
            edges.push(dcel.make_edge(o, v).unwrap().0);
        }
        let classes = classify_vertex(&dcel, &dirs, o);
        let assigned = |he| classes.iter().find(|(e, _)| *e == he).unwrap().1.assigned;
        assert_eq!(assigned(edges[0]), 3);
        assert_eq!(assigned(edges[1]), 0);
        assert_eq!(assigned(edges[2]), 1);
        assert_eq!(assigned(edges[3]), 2);
    }

    #[test]
    fn significance() {
        let dirs = DirectionSet::regular(2).unwrap();
        let mut dcel: SchematicDcel = Dcel::new();
        let o = dcel.make_vertex(Coord { x: 0.0, y: 0.0 });
        let corner = dcel.make_vertex(Coord { x: 10.0, y: 0.0 });
        let ends: Vec<_> = [(4.0, 0.0), (0.0, 4.0), (4.0, 3.0), (3.0, 4.0), (-4.0, 3.0)].iter()
            .map(|&(x, y)| dcel.make_vertex(Coord { x, y }))
            .collect();

        // Two aligned edges: not significant.
        dcel.make_edge(o, ends[0]).unwrap();
        dcel.make_edge(o, ends[1]).unwrap();
        assert!(!is_significant(&dcel, &dirs, o));

        // A third edge makes it a junction.
        dcel.make_edge(o, ends[2]).unwrap();
        assert!(is_significant(&dcel, &dirs, o));

        // Degree 2: significant only when the edges share a sector.
        dcel.make_edge(corner, ends[2]).unwrap();
        dcel.make_edge(corner, ends[0]).unwrap();
        assert!(is_significant(&dcel, &dirs, corner));

        let apex = ends[3];
        dcel.make_edge(apex, ends[4]).unwrap();
        dcel.make_edge(apex, ends[0]).unwrap();
        assert!(!is_significant(&dcel, &dirs, apex));
    }
}
