//! Doubly Connected Edge List (DCEL): a mutable half-edge structure for
//! planar subdivisions built from polygon rings.
//!
//! # Structure
//!
//! Every undirected edge is represented as a pair of directed **half-edges**
//! (twins).  Each half-edge carries:
//!
//! * `tail`: the vertex it leaves from
//! * `twin`: the opposite half-edge (same edge, opposite direction)
//! * `next`: the next half-edge around the same face (CCW)
//! * `prev`: the previous half-edge around the same face (CCW)
//! * `face`: the face to the left of this half-edge
//!
//! Every vertex keeps its outgoing half-edges sorted clockwise, i.e. by
//! decreasing angle in `[0, 2π)`.
//!
//! # Indexing
//!
//! All elements live in flat arenas addressed by strongly-typed indices
//! (`VertexId`, `HalfEdgeId`, `FaceId`).  Removal only marks a slot dead, so
//! ids stay stable for the lifetime of the structure.  Index `0` is reserved
//! for the unbounded (outer) face.
//!
//! # Payloads
//!
//! Vertices and half-edges carry a caller-defined payload (`V`, `E`) so that
//! algorithms layered on top can attach per-element state without side tables.

mod build;
mod edit;

use std::f64::consts::TAU;
use std::fmt;

use ahash::AHashMap;
use geo::{Coord, Line, Rect};
use smallvec::SmallVec;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Index types
// ---------------------------------------------------------------------------

macro_rules! idx {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

idx!(VertexId);
idx!(HalfEdgeId);
idx!(FaceId);

/// The unbounded (outer) face, always `FaceId(0)`.
pub const OUTER_FACE: FaceId = FaceId(0);

/// Coordinates are identified by their value rounded to this many decimals.
const KEY_SCALE: f64 = 1e10;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DcelError {
    #[error("degenerate edge: both endpoints are {0}")]
    DegenerateEdge(VertexId),

    #[error("an edge between {0} and {1} already exists")]
    DuplicateEdge(VertexId, VertexId),

    #[error("point ({x}, {y}) is already occupied by {vertex}")]
    OccupiedPoint { x: f64, y: f64, vertex: VertexId },

    #[error("point ({x}, {y}) appears twice in one path")]
    RepeatedPoint { x: f64, y: f64 },

    #[error("cannot splice {vertex}: it has degree {degree}, expected 2")]
    UnsupportedDegree { vertex: VertexId, degree: usize },

    #[error("{0} has the same face on both sides")]
    Bridge(HalfEdgeId),

    #[error("{0} was removed")]
    Removed(String),

    #[error("invalid topology: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A vertex with its outgoing half-edges in clockwise order.
#[derive(Clone, Debug)]
pub struct Vertex<V> {
    pub coords:  Coord<f64>,
    pub edges:   SmallVec<[HalfEdgeId; 4]>,
    pub removed: bool,
    pub data:    V,
}

/// A directed half-edge.
#[derive(Clone, Debug)]
pub struct HalfEdge<E> {
    /// Vertex this half-edge leaves from.
    pub tail:    VertexId,
    /// The other half-edge of the same undirected edge.
    pub twin:    HalfEdgeId,
    /// Next half-edge around `face` in CCW order.
    pub next:    HalfEdgeId,
    /// Previous half-edge around `face` in CCW order.
    pub prev:    HalfEdgeId,
    /// Face to the left.  `None` only while a subdivision is being built.
    pub face:    Option<FaceId>,
    pub removed: bool,
    pub data:    E,
}

/// A face of the subdivision.
#[derive(Clone, Debug, Default)]
pub struct Face {
    /// A half-edge of the outer boundary.  `None` for the unbounded face.
    pub edge:        Option<HalfEdgeId>,
    /// Indices of the input features covering this face.
    pub fids:        Vec<usize>,
    /// One half-edge per hole; each belongs to the hole's face, not this one.
    pub inner_edges: Vec<HalfEdgeId>,
    /// For a hole face, the face it was cut out of.
    pub outer_ring:  Option<FaceId>,
    pub removed:     bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CoordKey(i64, i64);

impl From<Coord<f64>> for CoordKey {
    fn from(c: Coord<f64>) -> Self {
        CoordKey((c.x * KEY_SCALE).round() as i64, (c.y * KEY_SCALE).round() as i64)
    }
}

/// Angle of the vector `from → to`, normalized to `[0, 2π)`.
pub fn angle_between(from: Coord<f64>, to: Coord<f64>) -> f64 {
    let angle = (to.y - from.y).atan2(to.x - from.x);
    if angle < 0.0 { angle + TAU } else { angle }
}

// ---------------------------------------------------------------------------
// DCEL
// ---------------------------------------------------------------------------

/// A Doubly Connected Edge List with vertex payload `V` and half-edge
/// payload `E`.  The outer face is pre-inserted at index 0.
#[derive(Clone, Debug)]
pub struct Dcel<V = (), E = ()> {
    pub(crate) vertices:   Vec<Vertex<V>>,
    pub(crate) half_edges: Vec<HalfEdge<E>>,
    pub(crate) faces:      Vec<Face>,
    vertex_index: AHashMap<CoordKey, VertexId>,
    edge_index:   AHashMap<(VertexId, VertexId), HalfEdgeId>,
}

impl<V, E> Default for Dcel<V, E> {
    fn default() -> Self { Self::new() }
}

impl<V, E> Dcel<V, E> {
    /// Create an empty DCEL.  The outer face (`OUTER_FACE`) is pre-inserted.
    pub fn new() -> Self {
        Self {
            vertices:     Vec::new(),
            half_edges:   Vec::new(),
            faces:        vec![Face::default()],
            vertex_index: AHashMap::new(),
            edge_index:   AHashMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Counts (live elements only)
    // -----------------------------------------------------------------------

    pub fn num_vertices(&self)   -> usize { self.vertices.iter().filter(|v| !v.removed).count() }
    pub fn num_half_edges(&self) -> usize { self.half_edges.iter().filter(|e| !e.removed).count() }
    /// Number of faces including the outer face.
    pub fn num_faces(&self)      -> usize { self.faces.iter().filter(|f| !f.removed).count() }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn vertex(&self, id: VertexId)           -> &Vertex<V>     { &self.vertices[id.0] }
    pub fn vertex_mut(&mut self, id: VertexId)   -> &mut Vertex<V> { &mut self.vertices[id.0] }

    pub fn half_edge(&self, id: HalfEdgeId)         -> &HalfEdge<E>     { &self.half_edges[id.0] }
    pub fn half_edge_mut(&mut self, id: HalfEdgeId) -> &mut HalfEdge<E> { &mut self.half_edges[id.0] }

    pub fn face(&self, id: FaceId)         -> &Face     { &self.faces[id.0] }
    pub fn face_mut(&mut self, id: FaceId) -> &mut Face { &mut self.faces[id.0] }

    /// Live vertex ids in creation order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().enumerate().filter(|(_, v)| !v.removed).map(|(i, _)| VertexId(i))
    }

    /// Live half-edge ids in creation order.
    pub fn half_edge_ids(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.half_edges.iter().enumerate().filter(|(_, e)| !e.removed).map(|(i, _)| HalfEdgeId(i))
    }

    /// Live face ids, outer face first.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.iter().enumerate().filter(|(_, f)| !f.removed).map(|(i, _)| FaceId(i))
    }

    /// Live bounded faces in creation order.
    pub fn bounded_faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.face_ids().filter(|&f| f != OUTER_FACE)
    }

    pub fn unbounded_face(&self) -> FaceId { OUTER_FACE }

    /// One half-edge per live undirected edge (the one with the lower id).
    pub fn edge_pairs(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.half_edge_ids().filter(|&he| he < self.twin(he))
    }

    // -----------------------------------------------------------------------
    // Half-edge navigation
    // -----------------------------------------------------------------------

    pub fn tail(&self, he: HalfEdgeId) -> VertexId   { self.half_edges[he.0].tail }
    pub fn twin(&self, he: HalfEdgeId) -> HalfEdgeId { self.half_edges[he.0].twin }
    pub fn next(&self, he: HalfEdgeId) -> HalfEdgeId { self.half_edges[he.0].next }
    pub fn prev(&self, he: HalfEdgeId) -> HalfEdgeId { self.half_edges[he.0].prev }

    /// The vertex at the head (destination) of a half-edge.
    pub fn head(&self, he: HalfEdgeId) -> VertexId { self.tail(self.twin(he)) }

    /// The face to the left of `he`; unpainted half-edges count as outer.
    pub fn face_of(&self, he: HalfEdgeId) -> FaceId {
        self.half_edges[he.0].face.unwrap_or(OUTER_FACE)
    }

    pub fn coords(&self, v: VertexId) -> Coord<f64> { self.vertices[v.0].coords }

    pub fn tail_coords(&self, he: HalfEdgeId) -> Coord<f64> { self.coords(self.tail(he)) }
    pub fn head_coords(&self, he: HalfEdgeId) -> Coord<f64> { self.coords(self.head(he)) }

    pub fn segment(&self, he: HalfEdgeId) -> Line<f64> {
        Line::new(self.tail_coords(he), self.head_coords(he))
    }

    /// Direction of `he` in `[0, 2π)`.
    pub fn angle(&self, he: HalfEdgeId) -> f64 {
        angle_between(self.tail_coords(he), self.head_coords(he))
    }

    pub fn length(&self, he: HalfEdgeId) -> f64 {
        let d = self.head_coords(he) - self.tail_coords(he);
        d.x.hypot(d.y)
    }

    /// Outgoing half-edges of `v`, clockwise.
    pub fn outgoing(&self, v: VertexId) -> &[HalfEdgeId] { &self.vertices[v.0].edges }

    pub fn degree(&self, v: VertexId) -> usize { self.vertices[v.0].edges.len() }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn find_vertex(&self, coords: Coord<f64>) -> Option<VertexId> {
        self.vertex_index.get(&CoordKey::from(coords)).copied()
    }

    pub fn edge_between(&self, tail: VertexId, head: VertexId) -> Option<HalfEdgeId> {
        self.edge_index.get(&(tail, head)).copied()
    }

    /// The half-edge running from `tail` to `head`, looked up by coordinates.
    pub fn find_edge(&self, tail: Coord<f64>, head: Coord<f64>) -> Option<HalfEdgeId> {
        self.edge_between(self.find_vertex(tail)?, self.find_vertex(head)?)
    }

    // -----------------------------------------------------------------------
    // Cycles
    // -----------------------------------------------------------------------

    /// Iterate over the half-edges of the cycle containing `start`, following
    /// `next` links.
    pub fn cycle(&self, start: HalfEdgeId) -> Cycle<'_, V, E> {
        Cycle { dcel: self, start, current: start, done: false, forward: true }
    }

    /// Same cycle as [`Dcel::cycle`], walked backwards along `prev` links.
    pub fn cycle_rev(&self, start: HalfEdgeId) -> Cycle<'_, V, E> {
        Cycle { dcel: self, start, current: start, done: false, forward: false }
    }

    /// Outer boundary of a face.  The unbounded face has no representative
    /// edge, so every half-edge painted with it is returned instead.
    pub fn face_edges(&self, face: FaceId) -> Vec<HalfEdgeId> {
        match self.faces[face.0].edge {
            Some(start) => self.cycle(start).collect(),
            None => self.half_edge_ids().filter(|&he| self.face_of(he) == face).collect(),
        }
    }

    /// Outer ring coordinates of a face (not closed).
    pub fn face_ring(&self, face: FaceId) -> Vec<Coord<f64>> {
        self.face_edges(face).into_iter().map(|he| self.tail_coords(he)).collect()
    }

    // -----------------------------------------------------------------------
    // Extent
    // -----------------------------------------------------------------------

    /// Bounding box of all live vertices.
    pub fn bbox(&self) -> Option<Rect<f64>> {
        let mut coords = self.vertex_ids().map(|v| self.coords(v));
        let first = coords.next()?;
        let (min, max) = coords.fold((first, first), |(min, max), c| (
            Coord { x: min.x.min(c.x), y: min.y.min(c.y) },
            Coord { x: max.x.max(c.x), y: max.y.max(c.y) },
        ));
        Some(Rect::new(min, max))
    }

    /// Length of the bounding box diagonal (0 for an empty subdivision).
    pub fn diameter(&self) -> f64 {
        self.bbox().map_or(0.0, |r| r.width().hypot(r.height()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check the structural invariants of every live half-edge and face.
    pub fn validate(&self) -> Result<(), DcelError> {
        for he in self.half_edge_ids() {
            let rec = &self.half_edges[he.0];
            for (name, other) in [("twin", rec.twin), ("next", rec.next), ("prev", rec.prev)] {
                if self.half_edges[other.0].removed {
                    return Err(DcelError::Invalid(format!("{he}: {name} {other} is removed")));
                }
            }
            if self.twin(rec.twin) != he {
                return Err(DcelError::Invalid(format!("{he}: twin of twin differs")));
            }
            if self.prev(rec.next) != he {
                return Err(DcelError::Invalid(format!("{he}: prev of next differs")));
            }
            if self.tail(rec.next) != self.head(he) {
                return Err(DcelError::Invalid(format!("{he}: next does not start at head")));
            }
            if self.face_of(rec.next) != self.face_of(he) {
                return Err(DcelError::Invalid(format!("{he}: next lies on another face")));
            }
            if self.vertices[rec.tail.0].removed {
                return Err(DcelError::Invalid(format!("{he}: tail {} is removed", rec.tail)));
            }
        }
        for face in self.bounded_faces() {
            if let Some(edge) = self.faces[face.0].edge {
                if self.half_edges[edge.0].removed || self.face_of(edge) != face {
                    return Err(DcelError::Invalid(format!("{face}: stale representative {edge}")));
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal helpers shared by `build` and `edit`
    // -----------------------------------------------------------------------

    /// Set `he.next = next` and `next.prev = he`.
    pub(crate) fn set_next(&mut self, he: HalfEdgeId, next: HalfEdgeId) {
        self.half_edges[he.0].next   = next;
        self.half_edges[next.0].prev = he;
    }

    /// Restore clockwise order of the outgoing list of `v`.
    pub(crate) fn sort_outgoing(&mut self, v: VertexId) {
        let mut edges = std::mem::take(&mut self.vertices[v.0].edges);
        edges.sort_by(|&a, &b| self.angle(b).total_cmp(&self.angle(a)));
        self.vertices[v.0].edges = edges;
    }

    /// Link the face cycles passing through `v` from its clockwise order.
    pub(crate) fn link_vertex(&mut self, v: VertexId) {
        let edges = self.vertices[v.0].edges.clone();
        for (i, &e1) in edges.iter().enumerate() {
            let e2 = edges[(i + 1) % edges.len()];
            self.set_next(self.twin(e1), e2);
        }
    }

    /// Assign `face` to every half-edge of the cycle through `start`.
    pub(crate) fn paint_cycle(&mut self, start: HalfEdgeId, face: FaceId) {
        let cycle: Vec<_> = self.cycle(start).take(self.half_edges.len()).collect();
        for he in cycle {
            self.half_edges[he.0].face = Some(face);
        }
    }
}

impl<V: Default, E: Default> Dcel<V, E> {
    // -----------------------------------------------------------------------
    // Factories
    // -----------------------------------------------------------------------

    /// Return the vertex at `coords`, creating it if necessary.
    pub fn make_vertex(&mut self, coords: Coord<f64>) -> VertexId {
        if let Some(v) = self.find_vertex(coords) { return v; }
        self.push_vertex(coords)
    }

    /// Return the twin pair `(tail → head, head → tail)`, creating it if
    /// necessary.  Both half-edges are inserted into their tails' clockwise
    /// lists; `next`/`prev` links are placeholders until [`Dcel::link`].
    pub fn make_edge(&mut self, tail: VertexId, head: VertexId) -> Result<(HalfEdgeId, HalfEdgeId), DcelError> {
        if tail == head { return Err(DcelError::DegenerateEdge(tail)); }
        if let Some(he) = self.edge_between(tail, head) {
            return Ok((he, self.twin(he)));
        }

        let uv = HalfEdgeId(self.half_edges.len());
        let vu = HalfEdgeId(self.half_edges.len() + 1);
        self.half_edges.push(HalfEdge { tail,       twin: vu, next: vu, prev: vu, face: None, removed: false, data: E::default() });
        self.half_edges.push(HalfEdge { tail: head, twin: uv, next: uv, prev: uv, face: None, removed: false, data: E::default() });

        self.edge_index.insert((tail, head), uv);
        self.edge_index.insert((head, tail), vu);
        self.vertices[tail.0].edges.push(uv);
        self.vertices[head.0].edges.push(vu);
        self.sort_outgoing(tail);
        self.sort_outgoing(head);

        Ok((uv, vu))
    }

    /// Add a new face (returns its id).
    pub fn make_face(&mut self) -> FaceId {
        let id = FaceId(self.faces.len());
        self.faces.push(Face::default());
        id
    }

    /// Link every vertex's face cycles from its clockwise edge order.
    pub fn link(&mut self) {
        for v in 0..self.vertices.len() {
            if !self.vertices[v].removed { self.link_vertex(VertexId(v)); }
        }
    }

    pub(crate) fn push_vertex(&mut self, coords: Coord<f64>) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex { coords, edges: SmallVec::new(), removed: false, data: V::default() });
        self.vertex_index.insert(CoordKey::from(coords), id);
        id
    }
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

/// Iterator over the half-edges of one boundary cycle.
pub struct Cycle<'a, V, E> {
    dcel:    &'a Dcel<V, E>,
    start:   HalfEdgeId,
    current: HalfEdgeId,
    done:    bool,
    forward: bool,
}

impl<'a, V, E> Iterator for Cycle<'a, V, E> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<HalfEdgeId> {
        if self.done { return None; }
        let he = self.current;
        self.current = if self.forward { self.dcel.next(he) } else { self.dcel.prev(he) };
        if self.current == self.start { self.done = true; }
        Some(he)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
