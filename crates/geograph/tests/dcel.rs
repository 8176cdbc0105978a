use geo::{Coord, LineString, MultiPolygon, Polygon};
use geograph::{Dcel, DcelError, OUTER_FACE};

fn c(x: f64, y: f64) -> Coord<f64> { Coord { x, y } }

fn ring(points: &[(f64, f64)]) -> LineString<f64> {
    points.iter().map(|&(x, y)| c(x, y)).collect()
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
    ring(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)])
}

fn feature(exterior: LineString<f64>, holes: Vec<LineString<f64>>) -> MultiPolygon<f64> {
    MultiPolygon(vec![Polygon::new(exterior, holes)])
}

/// Two unit squares sharing the edge x = 2.
fn two_squares() -> Dcel {
    Dcel::from_multipolygons(&[
        feature(rect(0.0, 0.0, 2.0, 2.0), vec![]),
        feature(rect(2.0, 0.0, 4.0, 2.0), vec![]),
    ]).unwrap()
}

/// A 2×2 square with a small square hole.
fn square_with_hole() -> Dcel {
    let hole = ring(&[(1.25, 1.25), (1.25, 1.5), (1.5, 1.5), (1.5, 1.25), (1.25, 1.25)]);
    Dcel::from_multipolygons(&[feature(rect(0.0, 0.0, 2.0, 2.0), vec![hole])]).unwrap()
}

#[test]
fn two_adjacent_squares() {
    let dcel = two_squares();
    assert_eq!(dcel.num_faces(), 3);
    assert_eq!(dcel.num_vertices(), 6);
    assert_eq!(dcel.num_half_edges(), 14);
    dcel.validate().unwrap();

    let shared = dcel.find_edge(c(2.0, 0.0), c(2.0, 2.0)).unwrap();
    let faces = [dcel.face_of(shared), dcel.face_of(dcel.twin(shared))];
    assert_ne!(faces[0], OUTER_FACE);
    assert_ne!(faces[1], OUTER_FACE);
    assert_ne!(faces[0], faces[1]);
}

#[test]
fn three_adjacent_polygons() {
    let top = ring(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (0.0, 2.0), (0.0, 1.0)]);
    let dcel: Dcel = Dcel::from_multipolygons(&[
        feature(rect(0.0, 0.0, 1.0, 1.0), vec![]),
        feature(rect(1.0, 0.0, 2.0, 1.0), vec![]),
        feature(top, vec![]),
    ]).unwrap();
    assert_eq!(dcel.num_faces(), 4);
    assert_eq!(dcel.num_vertices(), 8);
    assert_eq!(dcel.num_half_edges(), 20);

    let bbox = dcel.bbox().unwrap();
    assert_eq!((bbox.min(), bbox.max()), (c(0.0, 0.0), c(2.0, 2.0)));
    dcel.validate().unwrap();
}

#[test]
fn hole_is_recorded_on_outer_face() {
    let dcel = square_with_hole();
    assert_eq!(dcel.num_faces(), 3);
    assert_eq!(dcel.num_vertices(), 8);
    assert_eq!(dcel.num_half_edges(), 16);

    let faces: Vec<_> = dcel.bounded_faces().collect();
    let (outer, hole) = (faces[0], faces[1]);
    assert_eq!(dcel.face(outer).inner_edges.len(), 1);
    assert_eq!(dcel.face(hole).outer_ring, Some(outer));

    let inner = dcel.face(outer).inner_edges[0];
    assert_eq!(dcel.face_of(inner), hole);
    assert!(dcel.cycle(dcel.twin(inner)).all(|he| dcel.face_of(he) == outer));
    dcel.validate().unwrap();
}

#[test]
fn enclave_fills_hole_in_either_order() {
    let hole = ring(&[(1.0, 1.0), (1.0, 3.0), (3.0, 3.0), (3.0, 1.0), (1.0, 1.0)]);
    let host = feature(rect(0.0, 0.0, 4.0, 4.0), vec![hole]);
    let enclave = feature(rect(1.0, 1.0, 3.0, 3.0), vec![]);

    for (features, host_fid, enclave_fid) in [
        (vec![host.clone(), enclave.clone()], 0, 1),
        (vec![enclave, host], 1, 0),
    ] {
        let dcel: Dcel = Dcel::from_multipolygons(&features).unwrap();
        assert_eq!(dcel.num_faces(), 3);

        let inner = dcel.bounded_faces().find(|&f| dcel.face(f).outer_ring.is_some()).unwrap();
        let outer = dcel.face(inner).outer_ring.unwrap();
        assert!(dcel.face(inner).fids.contains(&host_fid));
        assert!(dcel.face(inner).fids.contains(&enclave_fid));
        assert_eq!(dcel.face(outer).fids, vec![host_fid]);
        dcel.validate().unwrap();
    }
}

#[test]
fn diameter_of_large_square() {
    let dcel: Dcel = Dcel::from_multipolygons(&[feature(rect(0.0, 0.0, 200.0, 200.0), vec![])]).unwrap();
    assert!((dcel.diameter() - (2.0 * 200.0_f64.powi(2)).sqrt()).abs() < 1e-9);
}

#[test]
fn removing_square_corner_leaves_triangle() {
    for corner in [c(0.0, 0.0), c(2.0, 0.0), c(2.0, 2.0), c(0.0, 2.0)] {
        let mut dcel: Dcel = Dcel::from_multipolygons(&[feature(rect(0.0, 0.0, 2.0, 2.0), vec![])]).unwrap();
        let v = dcel.find_vertex(corner).unwrap();
        dcel.remove_vertex(v).unwrap();

        let face = dcel.bounded_faces().next().unwrap();
        assert_eq!(dcel.face_edges(face).len(), 3);
        assert_eq!(dcel.num_vertices(), 3);
        assert_eq!(dcel.find_vertex(corner), None);
        dcel.validate().unwrap();
    }
}

#[test]
fn removing_vertices_around_a_hole() {
    let corners = [c(0.0, 0.0), c(2.0, 0.0), c(2.0, 2.0), c(0.0, 2.0)];
    let hole_corners = [c(1.25, 1.25), c(1.5, 1.25), c(1.5, 1.5), c(1.25, 1.5)];

    for corner in corners {
        let mut dcel = square_with_hole();
        dcel.remove_vertex(dcel.find_vertex(corner).unwrap()).unwrap();
        let outer = dcel.bounded_faces().next().unwrap();
        assert_eq!(dcel.face_edges(outer).len(), 3);
        dcel.validate().unwrap();
    }
    for corner in hole_corners {
        let mut dcel = square_with_hole();
        dcel.remove_vertex(dcel.find_vertex(corner).unwrap()).unwrap();
        let faces: Vec<_> = dcel.bounded_faces().collect();
        assert_eq!(dcel.face_edges(faces[1]).len(), 3);
        let inner = dcel.face(faces[0]).inner_edges[0];
        assert_eq!(dcel.face_of(inner), faces[1]);
        dcel.validate().unwrap();
    }
}

#[test]
fn removing_junction_vertex_is_rejected() {
    let mut dcel = two_squares();
    let junction = dcel.find_vertex(c(2.0, 0.0)).unwrap();
    assert!(matches!(
        dcel.remove_vertex(junction),
        Err(DcelError::UnsupportedDegree { degree: 3, .. })
    ));
}

#[test]
fn removing_shared_edge_merges_faces() {
    let mut dcel = two_squares();
    let shared = dcel.find_edge(c(2.0, 0.0), c(2.0, 2.0)).unwrap();
    dcel.remove_edge(shared).unwrap();

    assert_eq!(dcel.num_faces(), 2);
    assert_eq!(dcel.num_half_edges(), 12);
    let merged = dcel.bounded_faces().next().unwrap();
    assert_eq!(dcel.face_edges(merged).len(), 6);
    assert_eq!(dcel.face(merged).fids, vec![0, 1]);
    dcel.validate().unwrap();
}

#[test]
fn removing_boundary_edge_opens_face() {
    let mut dcel: Dcel = Dcel::from_multipolygons(&[feature(rect(0.0, 0.0, 2.0, 2.0), vec![])]).unwrap();
    let bottom = dcel.find_edge(c(0.0, 0.0), c(2.0, 0.0)).unwrap();
    dcel.remove_edge(bottom).unwrap();

    assert_eq!(dcel.num_faces(), 1);
    assert!(dcel.half_edge_ids().all(|he| dcel.face_of(he) == OUTER_FACE));
    dcel.validate().unwrap();

    let side = dcel.find_edge(c(2.0, 0.0), c(2.0, 2.0)).unwrap();
    assert!(matches!(dcel.remove_edge(side), Err(DcelError::Bridge(_))));
}

#[test]
fn path_with_an_occupied_point_leaves_edge_alone() {
    let mut dcel: Dcel = Dcel::from_multipolygons(&[feature(rect(0.0, 0.0, 2.0, 2.0), vec![])]).unwrap();
    let bottom = dcel.find_edge(c(0.0, 0.0), c(2.0, 0.0)).unwrap();

    let blocked = [c(0.5, -0.5), c(2.0, 2.0)];
    assert!(matches!(dcel.subdivide_along(bottom, &blocked), Err(DcelError::OccupiedPoint { .. })));
    let repeated = [c(0.5, -0.5), c(0.5, -0.5)];
    assert!(matches!(dcel.subdivide_along(bottom, &repeated), Err(DcelError::RepeatedPoint { .. })));
    assert_eq!(dcel.num_vertices(), 4);
    assert_eq!(dcel.find_edge(c(0.0, 0.0), c(2.0, 0.0)), Some(bottom));

    let pieces = dcel.subdivide_along(bottom, &[c(1.0, 0.0), c(1.5, 0.0)]).unwrap();
    assert_eq!(pieces.len(), 3);
    assert_eq!(dcel.num_vertices(), 6);
    assert_eq!(dcel.head_coords(pieces[2]), c(2.0, 0.0));
    dcel.validate().unwrap();
}
