use ahash::AHashSet;
use geo::Coord;
use smallvec::smallvec;

use super::{CoordKey, Dcel, DcelError, FaceId, HalfEdge, HalfEdgeId, OUTER_FACE, VertexId};

impl<V: Default, E: Default> Dcel<V, E> {
    /// Split the edge of `he` at `point` (its midpoint if `None`).  An
    /// off-segment point bends the edge; the caller keeps the cyclic order
    /// around both endpoints intact.
    ///
    /// Returns the half-edge from the old tail to the new vertex; its `next`
    /// is the half-edge from the new vertex to the old head.  `he` keeps its
    /// id and becomes the first piece.
    pub fn subdivide(&mut self, he: HalfEdgeId, point: Option<Coord<f64>>) -> Result<HalfEdgeId, DcelError> {
        self.check_live(he)?;
        let twin = self.twin(he);
        let (a, b) = (self.tail(he), self.tail(twin));
        let point = point.unwrap_or_else(|| (self.coords(a) + self.coords(b)) / 2.0);
        if let Some(vertex) = self.find_vertex(point) {
            return Err(DcelError::OccupiedPoint { x: point.x, y: point.y, vertex });
        }

        let m = self.push_vertex(point);
        let (he_next, twin_next) = (self.next(he), self.next(twin));
        let (he_face, twin_face) = (self.half_edges[he.0].face, self.half_edges[twin.0].face);

        // he: a→m, e2: m→b, twin: b→m, t2: m→a
        let e2 = HalfEdgeId(self.half_edges.len());
        let t2 = HalfEdgeId(self.half_edges.len() + 1);
        self.half_edges.push(HalfEdge { tail: m, twin, next: he_next, prev: he, face: he_face, removed: false, data: E::default() });
        self.half_edges.push(HalfEdge { tail: m, twin: he, next: twin_next, prev: twin, face: twin_face, removed: false, data: E::default() });
        self.half_edges[he_next.0].prev = e2;
        self.half_edges[twin_next.0].prev = t2;
        self.half_edges[he.0].next = e2;
        self.half_edges[he.0].twin = t2;
        self.half_edges[twin.0].next = t2;
        self.half_edges[twin.0].twin = e2;

        self.vertices[m.0].edges = smallvec![e2, t2];
        self.sort_outgoing(m);
        // `point` need not lie on the old segment, so both ends may turn.
        self.sort_outgoing(a);
        self.sort_outgoing(b);

        self.edge_index.remove(&(a, b));
        self.edge_index.remove(&(b, a));
        self.edge_index.insert((a, m), he);
        self.edge_index.insert((m, a), t2);
        self.edge_index.insert((m, b), e2);
        self.edge_index.insert((b, m), twin);

        Ok(he)
    }

    /// Split the edge of `he` into equal pieces no longer than `threshold`.
    /// Returns the pieces in order from the old tail.
    pub fn subdivide_to_threshold(&mut self, he: HalfEdgeId, threshold: f64) -> Result<Vec<HalfEdgeId>, DcelError> {
        let pieces = (self.length(he) / threshold).ceil();
        if !pieces.is_finite() || pieces <= 1.0 { return Ok(vec![he]); }
        let pieces = pieces as usize;

        let (from, to) = (self.tail_coords(he), self.head_coords(he));
        let mut result = Vec::with_capacity(pieces);
        let mut current = he;
        for i in 1..pieces {
            let t = i as f64 / pieces as f64;
            current = self.subdivide(current, Some(from + (to - from) * t))?;
            result.push(current);
            current = self.next(current);
        }
        result.push(current);
        Ok(result)
    }

    /// Replace the edge of `he` by a path through `points`, in order from its
    /// tail.  Nothing is changed unless every point is free and distinct.
    /// Returns the pieces in order from the old tail.
    pub fn subdivide_along(&mut self, he: HalfEdgeId, points: &[Coord<f64>]) -> Result<Vec<HalfEdgeId>, DcelError> {
        self.check_live(he)?;
        let mut seen = AHashSet::with_capacity(points.len());
        for &p in points {
            if let Some(vertex) = self.find_vertex(p) {
                return Err(DcelError::OccupiedPoint { x: p.x, y: p.y, vertex });
            }
            if !seen.insert(CoordKey::from(p)) {
                return Err(DcelError::RepeatedPoint { x: p.x, y: p.y });
            }
        }

        let mut result = Vec::with_capacity(points.len() + 1);
        let mut current = he;
        for &p in points {
            current = self.subdivide(current, Some(p))?;
            result.push(current);
            current = self.next(current);
        }
        result.push(current);
        Ok(result)
    }

    /// Remove a degree-2 vertex, splicing its two edges into one.
    pub fn remove_vertex(&mut self, v: VertexId) -> Result<(), DcelError> {
        if self.vertices[v.0].removed { return Err(DcelError::Removed(v.to_string())); }
        let degree = self.degree(v);
        if degree != 2 { return Err(DcelError::UnsupportedDegree { vertex: v, degree }); }

        // a: v→x, b: v→y
        let (a, b) = (self.vertices[v.0].edges[0], self.vertices[v.0].edges[1]);
        let (x, y) = (self.head(a), self.head(b));
        if x == y || self.edge_between(y, x).is_some() {
            return Err(DcelError::DuplicateEdge(y, x));
        }

        // Keep the incoming half-edges: in1 becomes y→x, in2 becomes x→y.
        let (in1, in2) = (self.twin(b), self.twin(a));
        let (a_next, b_next) = (self.next(a), self.next(b));
        self.half_edges[in1.0].twin = in2;
        self.half_edges[in2.0].twin = in1;
        self.set_next(in1, a_next);
        self.set_next(in2, b_next);

        for dead in [a, b] {
            self.half_edges[dead.0].removed = true;
        }
        self.vertices[v.0].removed = true;
        self.vertices[v.0].edges.clear();
        let key = CoordKey::from(self.coords(v));
        self.vertex_index.remove(&key);
        for key in [(v, x), (x, v), (v, y), (y, v)] {
            self.edge_index.remove(&key);
        }
        self.edge_index.insert((y, x), in1);
        self.edge_index.insert((x, y), in2);
        self.sort_outgoing(x);
        self.sort_outgoing(y);

        self.replace_references(a, in1);
        self.replace_references(b, in2);
        Ok(())
    }

    /// Remove the undirected edge of `he`, merging the faces on its two
    /// sides.  The unbounded face absorbs any face it is merged with.
    pub fn remove_edge(&mut self, he: HalfEdgeId) -> Result<(), DcelError> {
        self.check_live(he)?;
        let twin = self.twin(he);
        let (left, right) = (self.face_of(he), self.face_of(twin));
        if left == right { return Err(DcelError::Bridge(he)); }

        let (he_prev, he_next) = (self.prev(he), self.next(he));
        let (twin_prev, twin_next) = (self.prev(twin), self.next(twin));
        self.set_next(he_prev, twin_next);
        self.set_next(twin_prev, he_next);

        let (keep, absorbed) = if right == OUTER_FACE { (right, left) } else { (left, right) };
        self.paint_cycle(he_next, keep);

        let absorbed_face = std::mem::take(&mut self.faces[absorbed.0]);
        for &inner in &absorbed_face.inner_edges {
            let reverse = self.twin(inner);
            self.paint_cycle(reverse, keep);
        }
        for face in &mut self.faces {
            if face.outer_ring == Some(absorbed) { face.outer_ring = Some(keep); }
        }
        {
            let kept = &mut self.faces[keep.0];
            for fid in absorbed_face.fids {
                if !kept.fids.contains(&fid) { kept.fids.push(fid); }
            }
            kept.inner_edges.extend(absorbed_face.inner_edges);
            if keep != OUTER_FACE && matches!(kept.edge, Some(e) if e == he || e == twin) {
                kept.edge = Some(he_next);
            }
            if kept.outer_ring == Some(keep) { kept.outer_ring = None; }
        }
        self.faces[absorbed.0].removed = true;

        self.replace_references(he, he_next);
        self.replace_references(twin, he_next);
        for (i, face) in self.faces.iter_mut().enumerate() {
            let owner = FaceId(i);
            face.inner_edges.retain(|&e| self.half_edges[e.0].face != Some(owner));
        }

        // Detach the pair from its endpoints.
        let (u, w) = (self.tail(he), self.tail(twin));
        self.vertices[u.0].edges.retain(|e| *e != he);
        self.vertices[w.0].edges.retain(|e| *e != twin);
        self.half_edges[he.0].removed = true;
        self.half_edges[twin.0].removed = true;
        self.edge_index.remove(&(u, w));
        self.edge_index.remove(&(w, u));
        for v in [u, w] {
            if self.vertices[v.0].edges.is_empty() {
                self.vertices[v.0].removed = true;
                let key = CoordKey::from(self.coords(v));
                self.vertex_index.remove(&key);
            }
        }
        Ok(())
    }

    /// Move `v` to `coords`.  The caller guarantees that the move does not
    /// change the cyclic order of edges around any vertex.
    pub fn move_vertex(&mut self, v: VertexId, coords: Coord<f64>) -> Result<(), DcelError> {
        if self.vertices[v.0].removed { return Err(DcelError::Removed(v.to_string())); }
        match self.find_vertex(coords) {
            Some(other) if other != v => {
                return Err(DcelError::OccupiedPoint { x: coords.x, y: coords.y, vertex: other });
            }
            _ => {}
        }
        let old = CoordKey::from(self.coords(v));
        self.vertex_index.remove(&old);
        self.vertex_index.insert(CoordKey::from(coords), v);
        self.vertices[v.0].coords = coords;

        self.sort_outgoing(v);
        let neighbors: Vec<_> = self.outgoing(v).iter().map(|&he| self.head(he)).collect();
        for w in neighbors {
            self.sort_outgoing(w);
        }
        Ok(())
    }

    fn check_live(&self, he: HalfEdgeId) -> Result<(), DcelError> {
        if self.half_edges[he.0].removed { Err(DcelError::Removed(he.to_string())) } else { Ok(()) }
    }

    /// Point face representatives and hole lists at `new` instead of `old`.
    fn replace_references(&mut self, old: HalfEdgeId, new: HalfEdgeId) {
        for face in &mut self.faces {
            if face.edge == Some(old) { face.edge = Some(new); }
            for inner in &mut face.inner_edges {
                if *inner == old { *inner = new; }
            }
        }
    }
}
