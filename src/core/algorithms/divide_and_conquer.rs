//! Divide-and-conquer Delaunay triangulation of one tile.
//!
//! The sites are sorted along alternating axes (X at even recursion depth, Y at odd
//! depth, ties by id), split in half and triangulated recursively. Two neighbouring
//! triangulations are joined by finding their lower and upper common tangents with a
//! walk along both convex hulls and running the [merge sweep](super::merge_sweep)
//! from the lower tangent to the upper one.
//!
//! Small inputs are handled directly:
//!
//! | sites | result |
//! |-------|--------|
//! | 0, 1  | no faces |
//! | 2     | one degenerate edge face |
//! | 3     | one triangle, or two edge faces when collinear |
//!
//! A zero-area triangle is never created. Output is deterministic for a given input.

use std::cmp::Ordering;

use crate::core::algorithms::merge_sweep::{Rail, SideVertex, SweepSide, sweep};
use crate::core::collections::{FastHashSet, fast_hash_set_with_capacity};
use crate::core::delaunay_graph::{DelaunayGraph, GraphError, VertexKey};
use crate::core::traits::triangulation_builder::{BuildError, BuildInfo, TriangulationBuilder};
use crate::geometry::algorithms::convex_hull::ConvexHull;
use crate::geometry::point::Point2;
use crate::geometry::predicates::{DOUBLE_EPSILON, FLOAT_ERROR, Winding, orientation, winding};
use crate::region::tile::TileOffset;

/// A site that has already been inserted into the graph.
#[derive(Clone, Copy, Debug)]
struct Site {
    key: VertexKey,
    point: Point2,
    id: u64,
}

/// Order used to split the sites at `depth`.
fn compare_at_depth(depth: usize, a: &Point2, b: &Point2) -> Ordering {
    if depth % 2 == 0 {
        a.cmp_xy(b)
    } else {
        a.cmp_yx(b)
    }
}

/// Guibas–Stolfi style divide-and-conquer builder.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::prelude::*;
///
/// let sites = [
///     (Point2::new(0.1, 0.1), 0),
///     (Point2::new(0.9, 0.2), 1),
///     (Point2::new(0.5, 0.9), 2),
///     (Point2::new(0.4, 0.4), 3),
/// ];
/// let mut builder = DivideAndConquerBuilder::new();
/// let graph = builder.build_tile(TileOffset::ORIGIN, &sites).unwrap();
/// assert_eq!(graph.number_of_vertices(), 4);
/// assert_eq!(graph.number_of_faces(), 3);
/// assert_eq!(graph.convex_hull().len(), 3);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DivideAndConquerBuilder {
    info: BuildInfo,
}

impl DivideAndConquerBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of the most recent successful build.
    #[must_use]
    pub const fn last_build(&self) -> BuildInfo {
        self.info
    }

    /// Checks the input before anything is inserted.
    fn validate(graph: &DelaunayGraph, sites: &[(Point2, u64)]) -> Result<(), BuildError> {
        if graph.number_of_vertices() > 0 {
            return Err(BuildError::GraphNotEmpty {
                offset: graph.offset(),
                vertices: graph.number_of_vertices(),
            });
        }

        let mut ids: FastHashSet<u64> = fast_hash_set_with_capacity(sites.len());
        for &(point, id) in sites {
            if !point.is_finite() {
                return Err(GraphError::NonFinitePoint { id, point }.into());
            }
            if !ids.insert(id) {
                return Err(GraphError::DuplicateVertexId {
                    id,
                    offset: graph.offset(),
                }
                .into());
            }
        }

        // Coincident sites are adjacent within a narrow X window once sorted.
        let mut order: Vec<(Point2, u64)> = sites.to_vec();
        order.sort_by(|a, b| a.0.cmp_xy(&b.0).then(a.1.cmp(&b.1)));
        for (i, &(point, id)) in order.iter().enumerate() {
            for &(other, other_id) in &order[i + 1..] {
                if other.x - point.x > DOUBLE_EPSILON {
                    break;
                }
                if point.distance(other) <= DOUBLE_EPSILON {
                    return Err(BuildError::DuplicatePoint {
                        first: id,
                        second: other_id,
                        point,
                    });
                }
            }
        }
        Ok(())
    }

    /// Triangulates `sites` (already in `graph`) and returns their hull.
    fn triangulate(
        &mut self,
        graph: &mut DelaunayGraph,
        sites: &mut [Site],
        depth: usize,
    ) -> Result<ConvexHull, BuildError> {
        sites.sort_by(|a, b| compare_at_depth(depth, &a.point, &b.point).then(a.id.cmp(&b.id)));

        let hull = match sites {
            [] => ConvexHull::new(),
            [a] => hull_from(&[*a]),
            [a, b] => {
                graph.add_edge_face(a.key, b.key);
                hull_from(&[*a, *b])
            }
            [a, b, c] => Self::triangulate_three(graph, *a, *b, *c),
            _ => {
                let mid = sites.len() / 2;
                let (lower, upper) = sites.split_at_mut(mid);
                let left = self.triangulate(graph, lower, depth + 1)?;
                let right = self.triangulate(graph, upper, depth + 1)?;
                self.merge(graph, &left, &right, depth)?
            }
        };
        Ok(hull)
    }

    fn triangulate_three(graph: &mut DelaunayGraph, a: Site, b: Site, c: Site) -> ConvexHull {
        if let Some(face) = graph.add_face(a.key, b.key, c.key) {
            let mut hull = ConvexHull::with_capacity(3);
            if let Some(face) = graph.face(face) {
                for &vertex in face.vertices() {
                    if let Some(point) = graph.point(vertex) {
                        hull.add_vertex(vertex, point);
                    }
                }
            }
            return hull;
        }

        // Collinear: chain the two sites nearest each other through the middle one.
        let mut line = [a, b, c];
        let spans = [
            a.point.distance_squared(b.point),
            b.point.distance_squared(c.point),
            a.point.distance_squared(c.point),
        ];
        if spans[0] > spans[2] && spans[0] >= spans[1] {
            line = [a, c, b];
        } else if spans[1] > spans[2] && spans[1] > spans[0] {
            line = [b, a, c];
        }
        graph.add_edge_face(line[0].key, line[1].key);
        graph.add_edge_face(line[1].key, line[2].key);
        hull_from(&line)
    }

    /// Joins two neighbouring triangulations and returns the combined hull.
    fn merge(
        &mut self,
        graph: &mut DelaunayGraph,
        left: &ConvexHull,
        right: &ConvexHull,
        depth: usize,
    ) -> Result<ConvexHull, BuildError> {
        self.info.merges += 1;

        if let Some(hull) = Self::merge_collinear(graph, left, right) {
            return Ok(hull);
        }

        let compare = |a: &Point2, b: &Point2| compare_at_depth(depth, a, b);
        let (Some(left_seed), Some(right_seed)) = (
            left.min_index(|a, b| compare(b, a)),
            right.min_index(compare),
        ) else {
            return Ok(ConvexHull::new());
        };

        let (al, bl) = lower_tangent(left, right, left_seed, right_seed);
        let (au, bu) = upper_tangent(left, right, left_seed, right_seed);
        let base = (left.vertex_at(al), right.vertex_at(bl));
        let rail = Rail {
            left: left.vertex_at(au),
            right: right.vertex_at(bu),
        };

        let outcome = {
            let side = SweepSide::new(graph);
            sweep(&side, &side, base, Some(rail))?
        };

        let mut deleted = outcome.deleted_left.clone();
        deleted.extend_from_slice(&outcome.deleted_right);
        graph.remove_faces_with_edges(&deleted);

        for triangle in &outcome.triangles {
            let [v1, v2, v3] = triangle.map(|v| match v {
                SideVertex::Left(key) | SideVertex::Right(key) => key,
            });
            if graph.add_face(v1, v2, v3).is_none() {
                tracing::warn!(?v1, ?v2, ?v3, "merge produced a collinear triangle; skipped");
            }
        }
        if outcome.triangles.is_empty() {
            graph.add_edge_face(base.0, base.1);
        }

        self.info.triangles_created += outcome.triangles.len();
        self.info.edges_deleted += deleted.len();
        tracing::trace!(
            depth,
            left = left.len(),
            right = right.len(),
            triangles = outcome.triangles.len(),
            deleted = deleted.len(),
            "merged sub-triangulations"
        );

        let mut hull = ConvexHull::with_capacity(left.len() + right.len());
        push_arc(&mut hull, right, bu, bl);
        push_arc(&mut hull, left, al, au);
        Ok(hull)
    }

    /// Joins two collinear chains lying on the same line.
    fn merge_collinear(
        graph: &mut DelaunayGraph,
        left: &ConvexHull,
        right: &ConvexHull,
    ) -> Option<ConvexHull> {
        if !left.is_collinear() || !right.is_collinear() {
            return None;
        }
        let (&first, &last) = (left.points().first()?, left.points().last()?);
        let on_line = |p: Point2| winding(first, p, last) == Winding::COLLINEAR;
        if !on_line(*right.points().first()?) || !on_line(*right.points().last()?) {
            return None;
        }

        let origin = first;
        let direction = *right.points().last()? - origin;
        let along = |p: Point2| (p - origin).dot(direction);

        let outermost = |hull: &ConvexHull, nearest_end: bool| {
            hull.min_index(|a, b| {
                let ordering = along(*a).total_cmp(&along(*b));
                if nearest_end { ordering.reverse() } else { ordering }
            })
        };
        let a = left.vertices()[outermost(left, true)?];
        let b = right.vertices()[outermost(right, false)?];
        graph.add_edge_face(a, b);

        let mut line: Vec<(VertexKey, Point2)> = left
            .vertices()
            .iter()
            .chain(right.vertices())
            .copied()
            .zip(left.points().iter().chain(right.points()).copied())
            .collect();
        line.sort_by(|x, y| along(x.1).total_cmp(&along(y.1)));

        let mut hull = ConvexHull::with_capacity(line.len());
        for (vertex, point) in line {
            hull.add_vertex(vertex, point);
        }
        Some(hull)
    }
}

impl TriangulationBuilder for DivideAndConquerBuilder {
    fn build_into(
        &mut self,
        graph: &mut DelaunayGraph,
        sites: &[(Point2, u64)],
    ) -> Result<BuildInfo, BuildError> {
        Self::validate(graph, sites)?;
        self.info = BuildInfo {
            sites: sites.len(),
            ..BuildInfo::default()
        };

        let mut inserted = Vec::with_capacity(sites.len());
        for &(point, id) in sites {
            let key = graph.add_vertex(point, id)?;
            inserted.push(Site { key, point, id });
        }

        let hull = match self.triangulate(graph, &mut inserted, 0) {
            Ok(hull) => hull,
            Err(error) => {
                // Leave the graph as empty as it was handed in.
                *graph = DelaunayGraph::new(graph.offset());
                return Err(error);
            }
        };
        graph.set_convex_hull(hull);

        tracing::debug!(
            offset = %graph.offset(),
            sites = sites.len(),
            faces = graph.number_of_faces(),
            merges = self.info.merges,
            "triangulated tile"
        );
        Ok(self.info)
    }
}

/// Triangulates `sites` into a new graph for the tile at `offset`.
///
/// # Errors
///
/// Returns a [`BuildError`] for duplicate ids, non-finite positions or coincident sites.
pub fn build_tile(offset: TileOffset, sites: &[(Point2, u64)]) -> Result<DelaunayGraph, BuildError> {
    DivideAndConquerBuilder::new().build_tile(offset, sites)
}

// =============================================================================
// HULL HELPERS
// =============================================================================

fn hull_from(sites: &[Site]) -> ConvexHull {
    let mut hull = ConvexHull::with_capacity(sites.len());
    for site in sites {
        hull.add_vertex(site.key, site.point);
    }
    hull
}

/// Appends the clockwise run `start..=end` of `source`, skipping vertices already present.
fn push_arc(target: &mut ConvexHull, source: &ConvexHull, start: usize, end: usize) {
    let mut position = start;
    for _ in 0..source.range(start, end, true) {
        let vertex = source.vertex_at(position);
        if target.find_vertex(vertex).is_none() {
            target.add_vertex(vertex, source.point_at(position));
        }
        position = source.step_cw(position);
    }
}

/// Whether moving one end of the tangent from `from` to `to` is an improvement.
///
/// `sign` is `-1.0` for the lower tangent and `1.0` for the upper one. Collinear
/// moves are taken only when they shorten the edge.
fn improves(sign: f64, fixed: Point2, from: Point2, to: Point2, turn: f64) -> bool {
    sign * turn > FLOAT_ERROR
        || (turn.abs() <= FLOAT_ERROR
            && to.distance_squared(fixed) < from.distance_squared(fixed) - DOUBLE_EPSILON)
}

/// Walks both hulls until `a → b` has every site on its left.
fn lower_tangent(
    left: &ConvexHull,
    right: &ConvexHull,
    mut a: usize,
    mut b: usize,
) -> (usize, usize) {
    let limit = 2 * (left.cycle_len() + right.cycle_len()) + 4;
    for _ in 0..limit {
        let mut moved = false;
        for _ in 0..left.cycle_len() {
            let (pa, pb) = (left.point_at(a), right.point_at(b));
            let next = left.step_cw(a);
            let pn = left.point_at(next);
            if improves(-1.0, pb, pa, pn, orientation(pa, pb, pn)) {
                a = next;
                moved = true;
            } else {
                break;
            }
        }
        for _ in 0..right.cycle_len() {
            let (pa, pb) = (left.point_at(a), right.point_at(b));
            let next = right.step_ccw(b);
            let pn = right.point_at(next);
            if improves(-1.0, pa, pb, pn, orientation(pa, pb, pn)) {
                b = next;
                moved = true;
            } else {
                break;
            }
        }
        if !moved {
            return (a, b);
        }
    }
    tracing::warn!(a, b, "lower tangent walk did not converge");
    (a, b)
}

/// Walks both hulls until `a → b` has every site on its right.
fn upper_tangent(
    left: &ConvexHull,
    right: &ConvexHull,
    mut a: usize,
    mut b: usize,
) -> (usize, usize) {
    let limit = 2 * (left.cycle_len() + right.cycle_len()) + 4;
    for _ in 0..limit {
        let mut moved = false;
        for _ in 0..left.cycle_len() {
            let (pa, pb) = (left.point_at(a), right.point_at(b));
            let next = left.step_ccw(a);
            let pn = left.point_at(next);
            if improves(1.0, pb, pa, pn, orientation(pa, pb, pn)) {
                a = next;
                moved = true;
            } else {
                break;
            }
        }
        for _ in 0..right.cycle_len() {
            let (pa, pb) = (left.point_at(a), right.point_at(b));
            let next = right.step_cw(b);
            let pn = right.point_at(next);
            if improves(1.0, pa, pb, pn, orientation(pa, pb, pn)) {
                b = next;
                moved = true;
            } else {
                break;
            }
        }
        if !moved {
            return (a, b);
        }
    }
    tracing::warn!(a, b, "upper tangent walk did not converge");
    (a, b)
}

// =============================================================================
// TESTS
// =============================================================================
