//! Merge sweep: the zipper that stitches two triangulations together.
//!
//! The sweep keeps one *base* vertex per side and repeatedly picks the next cross
//! triangle above the base edge, in the manner of Guibas and Stolfi:
//!
//! 1. The left candidate is the left base's neighbour with the smallest
//!    counter-clockwise angle from the base edge; the right candidate is the right
//!    base's neighbour with the smallest clockwise angle.
//! 2. A candidate is valid only if it lies strictly left of the directed base edge
//!    `left → right`, i.e. `winding(candidate, right, left)` is acute.
//! 3. While the fan vertex following a valid candidate is valid too and lies strictly
//!    inside the circumcircle of the two bases and the candidate, the edge to the
//!    candidate is not Delaunay: it is marked deleted and the fan advances.
//! 4. With both candidates valid, the right one wins only if it lies strictly inside
//!    the circumcircle of the left candidate and both bases.
//!
//! Points on a circumcircle never cause deletions. The graphs are only read during
//! the sweep; the deleted edges and new triangles are collected in a
//! [`SweepOutcome`] and applied by the caller once the sweep has finished. A sweep
//! that takes more steps than there are vertices fails with [`SweepError`] and
//! nothing is applied.
//!
//! Both sides may be the same graph (the builder) or two tile graphs in different
//! frames (tile merges); [`SweepSide::shift`] maps each side into the common frame.

use std::f64::consts::TAU;

use thiserror::Error;

use crate::core::collections::SmallBuffer;
use crate::core::delaunay_graph::{DelaunayGraph, VertexKey};
use crate::geometry::point::{Point2, Vector2};
use crate::geometry::predicates::{
    DOUBLE_EPSILON, FLOAT_ERROR, InCircle, Winding, angle_between, in_circumcircle, orientation,
    winding,
};

/// One side of a sweep: a graph and the translation into the sweep frame.
#[derive(Clone, Copy, Debug)]
pub struct SweepSide<'a> {
    graph: &'a DelaunayGraph,
    shift: Vector2,
}

impl<'a> SweepSide<'a> {
    /// A side whose graph already lives in the sweep frame.
    #[must_use]
    pub const fn new(graph: &'a DelaunayGraph) -> Self {
        Self {
            graph,
            shift: Vector2::ORIGIN,
        }
    }

    /// A side whose points are translated by `shift` into the sweep frame.
    #[must_use]
    pub const fn shifted(graph: &'a DelaunayGraph, shift: Vector2) -> Self {
        Self { graph, shift }
    }

    /// The underlying graph.
    #[must_use]
    pub const fn graph(&self) -> &'a DelaunayGraph {
        self.graph
    }

    /// Translation applied to this side's points.
    #[must_use]
    pub const fn shift(&self) -> Vector2 {
        self.shift
    }

    fn point(&self, vertex: VertexKey) -> Option<Point2> {
        self.graph.point(vertex).map(|p| p + self.shift)
    }

    /// Own (non-ghost) neighbours of `vertex` that are still connected to it.
    fn live_neighbors(
        &self,
        vertex: VertexKey,
        deleted: &[(VertexKey, VertexKey)],
    ) -> SmallBuffer<(VertexKey, Point2), 8> {
        self.graph
            .neighbors(vertex)
            .into_iter()
            .filter(|&n| self.graph.vertex(n).is_some_and(|v| !v.is_foreign()))
            .filter(|&n| !is_deleted(deleted, vertex, n))
            .filter_map(|n| self.point(n).map(|p| (n, p)))
            .collect()
    }
}

/// A vertex of a new cross triangle, tagged with the side whose graph stores it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SideVertex {
    /// Vertex of the left graph.
    Left(VertexKey),
    /// Vertex of the right graph.
    Right(VertexKey),
}

/// Edges to delete and triangles to add, produced by [`sweep`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Left-side edges found to violate the Delaunay condition.
    pub deleted_left: Vec<(VertexKey, VertexKey)>,
    /// Right-side edges found to violate the Delaunay condition.
    pub deleted_right: Vec<(VertexKey, VertexKey)>,
    /// New cross triangles, bottom to top.
    pub triangles: Vec<[SideVertex; 3]>,
}

impl SweepOutcome {
    /// Returns `true` if the sweep changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deleted_left.is_empty() && self.deleted_right.is_empty() && self.triangles.is_empty()
    }
}

/// Errors raised by [`sweep`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SweepError {
    /// The base edge never reached the rail or ran out of candidates.
    #[error("Merge sweep did not converge after {steps} steps ({triangles} triangles found)")]
    DidNotConverge {
        /// Steps taken before giving up.
        steps: usize,
        /// Cross triangles found until then.
        triangles: usize,
    },
}

/// Optional upper rail: the base edge at which the sweep stops.
///
/// The sweep ends once the base edge equals the rail, and candidates strictly
/// beyond the line through the two rail vertices are ignored. A base that already
/// touches one rail vertex keeps proposing candidates on that side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rail {
    /// Left rail vertex.
    pub left: VertexKey,
    /// Right rail vertex.
    pub right: VertexKey,
}

fn is_deleted(deleted: &[(VertexKey, VertexKey)], a: VertexKey, b: VertexKey) -> bool {
    deleted
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

/// Angles of (numerically) zero mean "along the base edge" and sort last.
fn fan_angle(angle: f64) -> f64 {
    if angle <= DOUBLE_EPSILON { TAU } else { angle }
}

/// Runs the sweep from `base` (the lower tangent) upwards.
///
/// `base.0` belongs to `left`, `base.1` to `right`. Without a rail the sweep ends
/// when neither side offers a valid candidate.
///
/// # Errors
///
/// Returns [`SweepError::DidNotConverge`] if the sweep takes more steps than both
/// graphs have vertices.
pub fn sweep(
    left: &SweepSide<'_>,
    right: &SweepSide<'_>,
    base: (VertexKey, VertexKey),
    rail: Option<Rail>,
) -> Result<SweepOutcome, SweepError> {
    let mut outcome = SweepOutcome::default();
    let (mut l, mut r) = base;

    let rail_line = rail.and_then(|rail| Some((left.point(rail.left)?, right.point(rail.right)?)));
    let beyond_rail = |p: Point2| {
        rail_line.is_some_and(|(from, to)| orientation(from, to, p) > FLOAT_ERROR)
    };

    let max_steps = left.graph.number_of_vertices() + right.graph.number_of_vertices() + 1;
    let mut steps = 0;

    loop {
        if rail.is_some_and(|rail| rail.left == l && rail.right == r) {
            break;
        }
        steps += 1;
        if steps > max_steps {
            tracing::warn!(
                steps,
                triangles = outcome.triangles.len(),
                "merge sweep did not converge"
            );
            return Err(SweepError::DidNotConverge {
                steps,
                triangles: outcome.triangles.len(),
            });
        }
        let (Some(pl), Some(pr)) = (left.point(l), right.point(r)) else {
            break;
        };
        let valid = |c: Point2| winding(c, pr, pl) == Winding::ACUTE;

        let left_candidate = {
            let mut fan: SmallBuffer<(f64, VertexKey, Point2), 8> = left
                .live_neighbors(l, &outcome.deleted_left)
                .into_iter()
                .filter(|&(_, p)| !beyond_rail(p))
                .map(|(n, p)| (fan_angle(angle_between(pr - pl, p - pl)), n, p))
                .collect();
            fan.sort_by(|a, b| a.0.total_cmp(&b.0));
            walk_fan(&fan, l, pl, pr, valid, &mut outcome.deleted_left)
        };

        let right_candidate = {
            let mut fan: SmallBuffer<(f64, VertexKey, Point2), 8> = right
                .live_neighbors(r, &outcome.deleted_right)
                .into_iter()
                .filter(|&(_, p)| !beyond_rail(p))
                .map(|(n, p)| (fan_angle(angle_between(p - pr, pl - pr)), n, p))
                .collect();
            fan.sort_by(|a, b| a.0.total_cmp(&b.0));
            walk_fan(&fan, r, pl, pr, valid, &mut outcome.deleted_right)
        };

        let take_right = match (left_candidate, right_candidate) {
            (None, None) => break,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (Some((_, lp)), Some((_, rp))) => in_circumcircle(pl, pr, lp, rp) == InCircle::INSIDE,
        };

        if take_right {
            if let Some((rc, _)) = right_candidate {
                tracing::trace!(?l, ?r, ?rc, "sweep takes right candidate");
                outcome
                    .triangles
                    .push([SideVertex::Left(l), SideVertex::Right(r), SideVertex::Right(rc)]);
                r = rc;
            }
        } else if let Some((lc, _)) = left_candidate {
            tracing::trace!(?l, ?r, ?lc, "sweep takes left candidate");
            outcome
                .triangles
                .push([SideVertex::Left(l), SideVertex::Right(r), SideVertex::Left(lc)]);
            l = lc;
        }
    }

    Ok(outcome)
}

/// Picks the candidate from a sorted fan around `pivot`, deleting non-Delaunay edges.
fn walk_fan<F>(
    fan: &[(f64, VertexKey, Point2)],
    pivot: VertexKey,
    pl: Point2,
    pr: Point2,
    valid: F,
    deleted: &mut Vec<(VertexKey, VertexKey)>,
) -> Option<(VertexKey, Point2)>
where
    F: Fn(Point2) -> bool,
{
    let &(_, first, first_point) = fan.first()?;
    if !valid(first_point) {
        return None;
    }
    let mut candidate = (first, first_point);
    for &(_, next, next_point) in &fan[1..] {
        if valid(next_point)
            && in_circumcircle(pl, pr, candidate.1, next_point) == InCircle::INSIDE
        {
            deleted.push((pivot, candidate.0));
            candidate = (next, next_point);
        } else {
            break;
        }
    }
    Some(candidate)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::tile::TileOffset;

    /// Two separate triangles facing each other across x = 0.5.
    fn facing_triangles() -> (DelaunayGraph, [VertexKey; 6]) {
        let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
        let a0 = graph.add_vertex(Point2::new(0.1, 0.2), 0).unwrap();
        let a1 = graph.add_vertex(Point2::new(0.4, 0.1), 1).unwrap();
        let a2 = graph.add_vertex(Point2::new(0.3, 0.8), 2).unwrap();
        let b0 = graph.add_vertex(Point2::new(0.6, 0.15), 3).unwrap();
        let b1 = graph.add_vertex(Point2::new(0.9, 0.3), 4).unwrap();
        let b2 = graph.add_vertex(Point2::new(0.7, 0.85), 5).unwrap();
        graph.add_face(a0, a1, a2).unwrap();
        graph.add_face(b0, b1, b2).unwrap();
        (graph, [a0, a1, a2, b0, b1, b2])
    }

    #[test]
    fn test_sweep_zips_two_triangles() {
        let (graph, [_, a1, a2, b0, _, b2]) = facing_triangles();
        let side = SweepSide::new(&graph);
        let outcome = sweep(
            &side,
            &side,
            (a1, b0),
            Some(Rail {
                left: a2,
                right: b2,
            }),
        )
        .unwrap();
        assert!(outcome.deleted_left.is_empty());
        assert!(outcome.deleted_right.is_empty());
        // Quad a1-b0-b2-a2 is split into two cross triangles.
        assert_eq!(outcome.triangles.len(), 2);
        assert_eq!(
            outcome.triangles[0][..2],
            [SideVertex::Left(a1), SideVertex::Right(b0)]
        );
    }

    #[test]
    fn test_sweep_without_rail_stops_when_candidates_run_out() {
        let (graph, [_, a1, a2, b0, _, b2]) = facing_triangles();
        let side = SweepSide::new(&graph);
        let with_rail = sweep(
            &side,
            &side,
            (a1, b0),
            Some(Rail {
                left: a2,
                right: b2,
            }),
        )
        .unwrap();
        let without_rail = sweep(&side, &side, (a1, b0), None).unwrap();
        assert_eq!(with_rail, without_rail);
    }

    #[test]
    fn test_invalid_base_produces_nothing() {
        let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
        let a = graph.add_vertex(Point2::new(0.1, 0.5), 0).unwrap();
        let b = graph.add_vertex(Point2::new(0.2, 0.5), 1).unwrap();
        let c = graph.add_vertex(Point2::new(0.8, 0.5), 2).unwrap();
        let d = graph.add_vertex(Point2::new(0.9, 0.5), 3).unwrap();
        graph.add_edge_face(a, b).unwrap();
        graph.add_edge_face(c, d).unwrap();
        let side = SweepSide::new(&graph);
        let outcome = sweep(&side, &side, (b, c), None).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_rail_sharing_the_base_vertex_keeps_that_side_open() {
        // Both tangents leave from `a`; `d` lies inside the merged hull.
        let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
        let a = graph.add_vertex(Point2::new(0.1, 0.1), 0).unwrap();
        let b = graph.add_vertex(Point2::new(0.9, 0.2), 1).unwrap();
        let c = graph.add_vertex(Point2::new(0.5, 0.9), 2).unwrap();
        let d = graph.add_vertex(Point2::new(0.4, 0.4), 3).unwrap();
        graph.add_edge_face(a, d).unwrap();
        graph.add_edge_face(c, b).unwrap();
        let side = SweepSide::new(&graph);

        let outcome = sweep(&side, &side, (a, b), Some(Rail { left: a, right: c })).unwrap();
        assert_eq!(
            outcome.triangles,
            vec![
                [SideVertex::Left(a), SideVertex::Right(b), SideVertex::Left(d)],
                [SideVertex::Left(d), SideVertex::Right(b), SideVertex::Right(c)],
                [SideVertex::Left(d), SideVertex::Right(c), SideVertex::Left(a)],
            ]
        );
    }

    #[test]
    fn test_sweep_that_never_ends_is_an_error() {
        // A lone right vertex inside a left triangle always has a valid left
        // candidate, so the base circles the triangle forever.
        let mut left = DelaunayGraph::new(TileOffset::ORIGIN);
        let a = left.add_vertex(Point2::new(0.1, 0.1), 0).unwrap();
        let b = left.add_vertex(Point2::new(0.9, 0.2), 1).unwrap();
        let c = left.add_vertex(Point2::new(0.5, 0.9), 2).unwrap();
        left.add_face(a, b, c).unwrap();
        let mut right = DelaunayGraph::new(TileOffset::ORIGIN);
        let r = right.add_vertex(Point2::new(0.5, 0.4), 0).unwrap();

        let result = sweep(&SweepSide::new(&left), &SweepSide::new(&right), (a, r), None);
        assert!(matches!(
            result,
            Err(SweepError::DidNotConverge { steps: 6, triangles: 5 })
        ));
    }

    #[test]
    fn test_shifted_side_reads_points_in_sweep_frame() {
        let mut graph = DelaunayGraph::new(TileOffset::new(1, 0));
        let v = graph.add_vertex(Point2::new(0.25, 0.5), 0).unwrap();
        let side = SweepSide::shifted(&graph, Vector2::new(1.0, 0.0));
        assert_eq!(side.point(v), Some(Point2::new(1.25, 0.5)));
        assert_eq!(side.shift(), Vector2::new(1.0, 0.0));
    }
}
