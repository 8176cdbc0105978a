use geo::{Coord, LineString, MultiPolygon};

use super::{CoordKey, Dcel, DcelError, FaceId, HalfEdgeId, OUTER_FACE};

/// Ring coordinates without the closing point or repeated points, wound
/// counter-clockwise.  Rings with fewer than three distinct points yield
/// `None`.
pub(crate) fn ccw_ring(ring: &LineString<f64>) -> Option<Vec<Coord<f64>>> {
    let mut points: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for &c in &ring.0 {
        if points.last().is_none_or(|&p| CoordKey::from(p) != CoordKey::from(c)) {
            points.push(c);
        }
    }
    while points.len() > 1 && CoordKey::from(points[0]) == CoordKey::from(points[points.len() - 1]) {
        points.pop();
    }
    if points.len() < 3 { return None; }

    let doubled_area: f64 = points.iter().zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    if doubled_area < 0.0 { points.reverse(); }
    Some(points)
}

impl<V: Default, E: Default> Dcel<V, E> {
    /// Build a subdivision from one multipolygon per input feature.  The
    /// position of a feature in `features` is its FID.
    ///
    /// Every ring is normalized to counter-clockwise winding, so the cycle of
    /// a ring's own half-edges always bounds the ring's interior.  Outer rings
    /// open a new face; holes open a new face whose reverse cycle is painted
    /// with the enclosing face.  A ring whose cycle is already painted by a
    /// bounded face (stacked features, enclaves filling a hole) only adds its
    /// FID to that face.
    pub fn from_multipolygons(features: &[MultiPolygon<f64>]) -> Result<Self, DcelError> {
        let mut dcel = Self::new();

        let rings: Vec<Vec<Vec<Vec<Coord<f64>>>>> = features.iter()
            .map(|mp| mp.0.iter()
                .map(|polygon| std::iter::once(polygon.exterior())
                    .chain(polygon.interiors())
                    .filter_map(ccw_ring)
                    .collect())
                .collect())
            .collect();

        // Half-edges for every ring segment.
        for ring in rings.iter().flatten().flatten() {
            let ids: Vec<_> = ring.iter().map(|&c| dcel.make_vertex(c)).collect();
            for (i, &tail) in ids.iter().enumerate() {
                dcel.make_edge(tail, ids[(i + 1) % ids.len()])?;
            }
        }
        dcel.link();

        // Faces.
        for (fid, polygons) in rings.iter().enumerate() {
            for polygon in polygons {
                let mut outer: Option<FaceId> = None;
                for (ring_idx, ring) in polygon.iter().enumerate() {
                    let Some(edge) = dcel.find_edge(ring[0], ring[1]) else { continue };
                    if ring_idx == 0 {
                        outer = Some(dcel.add_outer_ring(edge, fid));
                    } else if let Some(outer) = outer {
                        dcel.add_inner_ring(edge, outer, fid);
                    }
                }
            }
        }

        // Whatever is left over borders the unbounded face.
        for he in &mut dcel.half_edges {
            if he.face.is_none() { he.face = Some(OUTER_FACE); }
        }

        Ok(dcel)
    }

    fn painted_face(&self, edge: HalfEdgeId) -> Option<FaceId> {
        self.half_edges[edge.0].face.filter(|&f| f != OUTER_FACE)
    }

    fn add_outer_ring(&mut self, edge: HalfEdgeId, fid: usize) -> FaceId {
        if let Some(face) = self.painted_face(edge) {
            self.add_fid(face, fid);
            return face;
        }
        let face = self.make_face();
        self.faces[face.0].edge = Some(edge);
        self.faces[face.0].fids.push(fid);
        self.paint_cycle(edge, face);
        face
    }

    fn add_inner_ring(&mut self, edge: HalfEdgeId, outer: FaceId, fid: usize) {
        let hole = match self.painted_face(edge) {
            Some(face) => face,
            None => {
                let face = self.make_face();
                self.faces[face.0].edge = Some(edge);
                self.paint_cycle(edge, face);
                face
            }
        };
        self.add_fid(hole, fid);
        self.faces[hole.0].outer_ring = Some(outer);
        if !self.faces[outer.0].inner_edges.contains(&edge) {
            self.faces[outer.0].inner_edges.push(edge);
        }
        let twin = self.twin(edge);
        self.paint_cycle(twin, outer);
    }

    fn add_fid(&mut self, face: FaceId, fid: usize) {
        let fids = &mut self.faces[face.0].fids;
        if !fids.contains(&fid) { fids.push(fid); }
    }
}
