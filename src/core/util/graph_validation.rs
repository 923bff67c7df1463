//! Structural and geometric checks for tile graphs.
//!
//! These walk the whole graph and are meant for tests, debugging and diagnostics
//! rather than hot paths.

use thiserror::Error;

use crate::core::delaunay_graph::{DelaunayGraph, FaceKey, VertexKey};
use crate::geometry::point::Point2;
use crate::geometry::predicates::{FLOAT_ERROR, InCircle, in_circumcircle, orientation};

/// Inconsistencies found by the validation helpers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphValidationError {
    /// A face references a vertex that is not stored in the graph.
    #[error("Face {face_id} references a missing vertex")]
    MissingVertex {
        /// Id of the face.
        face_id: u64,
    },
    /// A triangle is not stored in clockwise order.
    #[error("Face {face_id} is not wound clockwise")]
    NotClockwise {
        /// Id of the face.
        face_id: u64,
    },
    /// The CCW link of a face around a vertex points at a face without that vertex,
    /// or rotating CW from the linked face does not lead back.
    #[error("Face {face_id} has an inconsistent ring link around vertex {vertex_id}")]
    InconsistentLink {
        /// Id of the face.
        face_id: u64,
        /// Id of the vertex.
        vertex_id: u64,
    },
    /// The face ring of an owned vertex does not close after `face_count` steps.
    #[error("Vertex {vertex_id} is not surrounded by its face ring")]
    NotSurrounded {
        /// Id of the vertex.
        vertex_id: u64,
    },
    /// The stored convex hull turns the wrong way or misses a vertex.
    #[error("Convex hull is invalid: {message}")]
    InvalidHull {
        /// Description of the problem.
        message: String,
    },
}

/// Checks that every face ring is closed and every ring link is mutual.
///
/// # Errors
///
/// Returns the first [`GraphValidationError`] found.
pub fn validate_adjacency(graph: &DelaunayGraph) -> Result<(), GraphValidationError> {
    for (key, face) in graph.faces() {
        for &vertex in face.vertices() {
            let vertex_id = graph
                .vertex(vertex)
                .map(|v| v.id())
                .ok_or(GraphValidationError::MissingVertex { face_id: face.id() })?;
            let link_ok = face
                .ccw_face_around(vertex)
                .and_then(|next| graph.face(next).map(|f| (next, f)))
                .is_some_and(|(next, f)| {
                    f.contains_vertex(vertex) && graph.adjacent_face_cw(next, vertex) == Some(key)
                });
            if !link_ok {
                return Err(GraphValidationError::InconsistentLink {
                    face_id: face.id(),
                    vertex_id,
                });
            }
        }
    }

    for (key, vertex) in graph.vertices() {
        if !vertex.is_foreign() && !graph.is_surrounded(key) {
            return Err(GraphValidationError::NotSurrounded {
                vertex_id: vertex.id(),
            });
        }
    }
    Ok(())
}

/// Checks that every triangle is stored clockwise.
///
/// # Errors
///
/// Returns [`GraphValidationError::NotClockwise`] or
/// [`GraphValidationError::MissingVertex`] for the first bad face.
pub fn validate_face_winding(graph: &DelaunayGraph) -> Result<(), GraphValidationError> {
    for (_, face) in graph.faces().filter(|(_, face)| !face.is_degenerate()) {
        let points = face_points(graph, face.vertices())
            .ok_or(GraphValidationError::MissingVertex { face_id: face.id() })?;
        if orientation(points[0], points[1], points[2]) >= -FLOAT_ERROR {
            return Err(GraphValidationError::NotClockwise { face_id: face.id() });
        }
    }
    Ok(())
}

/// Checks that the stored hull is a clockwise polygon (or a line) enclosing every
/// owned vertex.
///
/// # Errors
///
/// Returns [`GraphValidationError::InvalidHull`] describing the first problem.
pub fn validate_convex_hull(graph: &DelaunayGraph) -> Result<(), GraphValidationError> {
    let hull = graph.convex_hull();
    let points = hull.points();
    if !hull.is_collinear() {
        let n = points.len();
        for i in 0..n {
            let turn = orientation(points[i], points[(i + 1) % n], points[(i + 2) % n]);
            if turn > FLOAT_ERROR {
                return Err(GraphValidationError::InvalidHull {
                    message: format!("left turn at hull position {}", (i + 1) % n),
                });
            }
        }
    }
    for (_, vertex) in graph.vertices().filter(|(_, v)| !v.is_foreign()) {
        if !hull.contains_point(vertex.point()) {
            return Err(GraphValidationError::InvalidHull {
                message: format!("vertex {} at {} lies outside", vertex.id(), vertex.point()),
            });
        }
    }
    Ok(())
}

/// Runs every structural check.
///
/// # Errors
///
/// Returns the first [`GraphValidationError`] found.
pub fn validate_graph(graph: &DelaunayGraph) -> Result<(), GraphValidationError> {
    validate_adjacency(graph)?;
    validate_face_winding(graph)?;
    validate_convex_hull(graph)
}

/// Triangles whose circumcircle strictly contains another vertex of the graph.
///
/// The four points must disagree from every side: a vertex that lies on the
/// circumcircle of some other triangle of the four points (within [`FLOAT_ERROR`])
/// makes them cocircular, and either diagonal is accepted.
#[must_use]
pub fn find_delaunay_violations(graph: &DelaunayGraph) -> Vec<FaceKey> {
    let mut violations = Vec::new();
    for (key, face) in graph.faces().filter(|(_, face)| !face.is_degenerate()) {
        let Some([a, b, c]) = face_points(graph, face.vertices()) else {
            continue;
        };
        let violated = graph.vertices().any(|(vertex_key, vertex)| {
            let point = vertex.point();
            !face.contains_vertex(vertex_key)
                && in_circumcircle(a, b, c, point) == InCircle::INSIDE
                && !nearly_cocircular(a, b, c, point)
        });
        if violated {
            violations.push(key);
        }
    }
    violations
}

/// Returns `true` if segments `a–b` and `c–d` cross at a point interior to both.
///
/// Touching at an end point or overlapping collinearly does not count.
#[must_use]
pub fn edges_cross(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let straddles = |p: Point2, q: Point2, r: Point2, s: Point2| {
        let o1 = orientation(p, q, r);
        let o2 = orientation(p, q, s);
        (o1 > FLOAT_ERROR && o2 < -FLOAT_ERROR) || (o1 < -FLOAT_ERROR && o2 > FLOAT_ERROR)
    };
    straddles(a, b, c, d) && straddles(c, d, a, b)
}

fn nearly_cocircular(a: Point2, b: Point2, c: Point2, point: Point2) -> bool {
    [(a, b, c), (b, c, a), (c, a, b)]
        .into_iter()
        .any(|(x, y, rest)| in_circumcircle(x, y, point, rest) == InCircle::BOUNDARY)
}

fn face_points(graph: &DelaunayGraph, vertices: &[VertexKey]) -> Option<[Point2; 3]> {
    match vertices {
        &[a, b, c] => Some([graph.point(a)?, graph.point(b)?, graph.point(c)?]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::tile::TileOffset;

    #[test]
    fn test_edges_cross() {
        let p = Point2::new;
        assert!(edges_cross(p(0.0, 0.0), p(1.0, 1.0), p(0.0, 1.0), p(1.0, 0.0)));
        assert!(!edges_cross(p(0.0, 0.0), p(1.0, 1.0), p(1.0, 1.0), p(2.0, 0.0)));
        assert!(!edges_cross(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), p(1.0, 1.0)));
        assert!(!edges_cross(p(0.0, 0.0), p(2.0, 0.0), p(1.0, 0.0), p(3.0, 0.0)));
    }

    #[test]
    fn test_valid_quad() {
        let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
        let a = graph.add_vertex(Point2::new(0.1, 0.1), 0).unwrap();
        let b = graph.add_vertex(Point2::new(0.9, 0.1), 1).unwrap();
        let c = graph.add_vertex(Point2::new(0.9, 0.8), 2).unwrap();
        let d = graph.add_vertex(Point2::new(0.1, 0.9), 3).unwrap();
        graph.add_face(a, b, c).unwrap();
        graph.add_face(a, c, d).unwrap();
        assert!(validate_adjacency(&graph).is_ok());
        assert!(validate_face_winding(&graph).is_ok());
    }

    #[test]
    fn test_detects_non_delaunay_diagonal() {
        // A thin quad split along its long diagonal.
        let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
        let a = graph.add_vertex(Point2::new(0.0, 0.5), 0).unwrap();
        let b = graph.add_vertex(Point2::new(0.5, 0.45), 1).unwrap();
        let c = graph.add_vertex(Point2::new(1.0, 0.5), 2).unwrap();
        let d = graph.add_vertex(Point2::new(0.5, 0.55), 3).unwrap();
        graph.add_face(a, b, c).unwrap();
        graph.add_face(a, c, d).unwrap();
        assert_eq!(find_delaunay_violations(&graph).len(), 2);

        let mut flipped = DelaunayGraph::new(TileOffset::ORIGIN);
        let a = flipped.add_vertex(Point2::new(0.0, 0.5), 0).unwrap();
        let b = flipped.add_vertex(Point2::new(0.5, 0.45), 1).unwrap();
        let c = flipped.add_vertex(Point2::new(1.0, 0.5), 2).unwrap();
        let d = flipped.add_vertex(Point2::new(0.5, 0.55), 3).unwrap();
        flipped.add_face(a, b, d).unwrap();
        flipped.add_face(b, c, d).unwrap();
        assert!(find_delaunay_violations(&flipped).is_empty());
    }

    #[test]
    fn test_cocircular_within_tolerance_is_not_a_violation() {
        // `d` sits just inside the circle through `a`, `b` and `c`. Seen from the
        // sliver `a, c, d` the fourth point is clearly inside; seen from `a, b, c`
        // it is on the boundary.
        let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
        let a = graph.add_vertex(Point2::new(0.1, 0.5), 0).unwrap();
        let b = graph.add_vertex(Point2::new(0.5, 0.1), 1).unwrap();
        let c = graph.add_vertex(Point2::new(0.9, 0.5), 2).unwrap();
        let d = graph.add_vertex(Point2::new(0.101_526, 0.534_862), 3).unwrap();
        let sliver = graph.add_face(a, c, d).unwrap();
        graph.add_face(a, b, c).unwrap();

        let [pa, pb, pc, pd] = [a, b, c, d].map(|v| graph.point(v).unwrap());
        assert_eq!(in_circumcircle(pa, pc, pd, pb), InCircle::INSIDE);
        assert_eq!(in_circumcircle(pa, pb, pc, pd), InCircle::BOUNDARY);
        assert!(find_delaunay_violations(&graph).is_empty());

        // Pulled further in, the point is inside from every side and both
        // triangles are flagged.
        let mut deeper = graph.clone();
        deeper.remove_face(sliver);
        let e = deeper.add_vertex(Point2::new(0.15, 0.52), 4).unwrap();
        let wide = deeper.add_face(a, c, e).unwrap();
        let violations = find_delaunay_violations(&deeper);
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&wide));
    }
}
