pub mod dcel;

pub use dcel::{angle_between, Cycle, Dcel, DcelError, Face, FaceId, HalfEdge, HalfEdgeId, Vertex, VertexId, OUTER_FACE};
