//! Convex hull tracking for the divide-and-conquer builder.
//!
//! A [`ConvexHull`] is an ordered list of graph vertices in clockwise winding. It is
//! rebuilt at every merge level of the builder and kept on the finished tile graph,
//! where the tile merge protocol uses it to find corner vertices.
//!
//! # Collinear hulls
//!
//! When every point seen so far lies on one line the hull is *collinear*. Such a
//! hull has no "other side" to wrap around to, so traversal ping-pongs between the
//! two end points instead. Traversal is therefore expressed in *positions* over the
//! hull's cycle:
//!
//! - a proper 2D hull of `n` vertices has `n` positions, position `i` is vertex `i`;
//! - a collinear hull of `n >= 3` vertices `v0 .. vk` has `2n - 2` positions visiting
//!   `v0, v1, .., vk, vk-1, .., v1` so each end point occurs exactly once.
//!
//! Positions `0..n` always map to the vertex with the same index.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::core::delaunay_graph::VertexKey;
use crate::geometry::point::Point2;
use crate::geometry::predicates::{FLOAT_ERROR, Winding, orientation, winding};

/// Clockwise hull of a set of graph vertices.
///
/// # Examples
///
/// ```rust
/// use slotmap::KeyData;
/// use tiled_delaunay::core::delaunay_graph::VertexKey;
/// use tiled_delaunay::geometry::algorithms::convex_hull::ConvexHull;
/// use tiled_delaunay::geometry::point::Point2;
///
/// let key = |n| VertexKey::from(KeyData::from_ffi(n));
/// let mut hull = ConvexHull::new();
/// assert!(hull.add_vertex(key(1), Point2::new(0.0, 0.0)));
/// assert!(hull.add_vertex(key(2), Point2::new(0.0, 1.0)));
/// // The third vertex leaves the line through the first two.
/// assert!(!hull.add_vertex(key(3), Point2::new(1.0, 0.0)));
/// assert_eq!(hull.len(), 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ConvexHull {
    vertices: Vec<VertexKey>,
    points: Vec<Point2>,
    collinear: bool,
}

impl Default for ConvexHull {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvexHull {
    /// An empty hull.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            points: Vec::new(),
            collinear: true,
        }
    }

    /// An empty hull with room for `capacity` vertices.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            points: Vec::with_capacity(capacity),
            collinear: true,
        }
    }

    /// Appends a vertex to the clockwise sequence and returns [`Self::is_collinear`].
    ///
    /// Collinearity is undetermined for the first two vertices. From the third on,
    /// while the hull is still collinear each new vertex is tested against the line
    /// through the first two.
    pub fn add_vertex(&mut self, vertex: VertexKey, point: Point2) -> bool {
        self.vertices.push(vertex);
        self.points.push(point);
        if self.points.len() <= 2 {
            self.collinear = true;
        } else if self.collinear {
            self.collinear = winding(self.points[0], point, self.points[1]) == Winding::COLLINEAR;
        }
        self.is_collinear()
    }

    /// Whether every vertex lies on a single line (always `true` below three vertices).
    #[inline]
    #[must_use]
    pub fn is_collinear(&self) -> bool {
        self.vertices.len() <= 2 || self.collinear
    }

    /// Number of hull vertices.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if the hull has no vertices.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Hull vertices in clockwise order (line order for collinear hulls).
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[VertexKey] {
        &self.vertices
    }

    /// Hull positions, parallel to [`Self::vertices`].
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Index of `vertex` in the hull.
    #[must_use]
    pub fn find_vertex(&self, vertex: VertexKey) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    // =========================================================================
    // CYCLIC TRAVERSAL
    // =========================================================================

    /// Number of positions in one full traversal cycle.
    #[must_use]
    pub fn cycle_len(&self) -> usize {
        let n = self.vertices.len();
        if self.is_collinear() && n >= 3 {
            2 * n - 2
        } else {
            n
        }
    }

    /// Vertex index visited at `position`.
    #[must_use]
    pub fn index_at(&self, position: usize) -> usize {
        let m = self.cycle_len();
        if m == 0 {
            return 0;
        }
        let p = position % m;
        let n = self.vertices.len();
        if p < n { p } else { m - p }
    }

    /// Vertex visited at `position`.
    #[must_use]
    pub fn vertex_at(&self, position: usize) -> VertexKey {
        self.vertices[self.index_at(position)]
    }

    /// Point visited at `position`.
    #[must_use]
    pub fn point_at(&self, position: usize) -> Point2 {
        self.points[self.index_at(position)]
    }

    /// Next position in clockwise direction.
    #[must_use]
    pub fn step_cw(&self, position: usize) -> usize {
        let m = self.cycle_len().max(1);
        (position + 1) % m
    }

    /// Next position in counter-clockwise direction.
    #[must_use]
    pub fn step_ccw(&self, position: usize) -> usize {
        let m = self.cycle_len().max(1);
        (position % m + m - 1) % m
    }

    /// Number of positions in the inclusive run from `start` to `end`.
    #[must_use]
    pub fn range(&self, start: usize, end: usize, clockwise: bool) -> usize {
        let m = self.cycle_len();
        if m == 0 {
            return 0;
        }
        let (start, end) = (start % m, end % m);
        if clockwise {
            (end + m - start) % m + 1
        } else {
            (start + m - end) % m + 1
        }
    }

    /// Vertices from `start` to `end` inclusive, walking clockwise.
    #[must_use]
    pub fn sequence_cw(&self, start: usize, end: usize) -> VecDeque<VertexKey> {
        self.sequence(start, end, true)
    }

    /// Vertices from `start` to `end` inclusive, walking counter-clockwise.
    #[must_use]
    pub fn sequence_ccw(&self, start: usize, end: usize) -> VecDeque<VertexKey> {
        self.sequence(start, end, false)
    }

    fn sequence(&self, start: usize, end: usize, clockwise: bool) -> VecDeque<VertexKey> {
        let count = self.range(start, end, clockwise);
        let mut run = VecDeque::with_capacity(count);
        let mut position = start;
        for _ in 0..count {
            run.push_back(self.vertex_at(position));
            position = if clockwise {
                self.step_cw(position)
            } else {
                self.step_ccw(position)
            };
        }
        run
    }

    // =========================================================================
    // EXTREMES AND QUERIES
    // =========================================================================

    /// Index of the smallest point under `compare`; the first one wins on ties.
    pub fn min_index<F>(&self, mut compare: F) -> Option<usize>
    where
        F: FnMut(&Point2, &Point2) -> Ordering,
    {
        let mut best: Option<usize> = None;
        for (index, point) in self.points.iter().enumerate() {
            match best {
                Some(current) if compare(point, &self.points[current]) != Ordering::Less => {}
                _ => best = Some(index),
            }
        }
        best
    }

    /// Index of the leftmost vertex (lowest on ties).
    #[must_use]
    pub fn left_vertex_index(&self) -> Option<usize> {
        self.min_index(Point2::cmp_xy)
    }

    /// Index of the rightmost vertex (highest on ties).
    #[must_use]
    pub fn right_vertex_index(&self) -> Option<usize> {
        self.min_index(|a, b| b.cmp_xy(a))
    }

    /// Index of the lowest vertex (leftmost on ties).
    #[must_use]
    pub fn bottom_vertex_index(&self) -> Option<usize> {
        self.min_index(Point2::cmp_yx)
    }

    /// Index of the highest vertex (rightmost on ties).
    #[must_use]
    pub fn top_vertex_index(&self) -> Option<usize> {
        self.min_index(|a, b| b.cmp_yx(a))
    }

    /// Index of the vertex closest to `point`.
    #[must_use]
    pub fn closest_vertex_index(&self, point: Point2) -> Option<usize> {
        self.min_index(|a, b| {
            a.distance_squared(point)
                .total_cmp(&b.distance_squared(point))
        })
    }

    /// Mean of the hull vertices.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn centroid(&self) -> Option<Point2> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Point2::ORIGIN, |acc, &point| acc + point);
        Some(sum * (1.0 / self.points.len() as f64))
    }

    /// Returns `true` if `point` lies inside or on the hull (within [`FLOAT_ERROR`]).
    #[must_use]
    pub fn contains_point(&self, point: Point2) -> bool {
        match self.points.len() {
            0 => false,
            1 => self.points[0].distance(point) <= FLOAT_ERROR,
            _ if self.is_collinear() => {
                let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
                    return false;
                };
                let along = point - *first;
                let span = *last - *first;
                winding(*first, point, *last) == Winding::COLLINEAR
                    && along.dot(span) >= -FLOAT_ERROR
                    && along.dot(span) <= span.length_squared() + FLOAT_ERROR
            }
            n => (0..n).all(|i| {
                orientation(self.points[i], self.points[(i + 1) % n], point) <= FLOAT_ERROR
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use slotmap::KeyData;

    fn key(n: u64) -> VertexKey {
        VertexKey::from(KeyData::from_ffi(n))
    }

    fn hull_of(points: &[(f64, f64)]) -> ConvexHull {
        let mut hull = ConvexHull::new();
        for (i, &(x, y)) in points.iter().enumerate() {
            hull.add_vertex(key(i as u64 + 1), Point2::new(x, y));
        }
        hull
    }

    #[test]
    fn test_collinearity_tracking() {
        let mut hull = ConvexHull::new();
        assert!(hull.is_collinear());
        assert!(hull.add_vertex(key(1), Point2::new(0.0, 0.0)));
        assert!(hull.add_vertex(key(2), Point2::new(0.5, 0.5)));
        assert!(hull.add_vertex(key(3), Point2::new(1.0, 1.0)));
        assert!(!hull.add_vertex(key(4), Point2::new(1.0, 0.0)));
        // Once two-dimensional, further points do not flip it back.
        assert!(!hull.add_vertex(key(5), Point2::new(0.25, 0.25)));
    }

    #[test]
    fn test_sequence_wraps_for_proper_hull() {
        // Clockwise square starting at the top-left corner.
        let hull = hull_of(&[(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]);
        assert!(!hull.is_collinear());
        assert_eq!(hull.cycle_len(), 4);
        assert_eq!(
            hull.sequence_cw(2, 0),
            VecDeque::from(vec![key(3), key(4), key(1)])
        );
        assert_eq!(
            hull.sequence_ccw(0, 2),
            VecDeque::from(vec![key(1), key(4), key(3)])
        );
        assert_eq!(hull.range(3, 1, true), 3);
        assert_eq!(hull.range(1, 1, false), 1);
    }

    #[test]
    fn test_sequence_ping_pongs_for_collinear_hull() {
        let hull = hull_of(&[(0.0, 0.0), (0.25, 0.0), (0.5, 0.0), (0.75, 0.0)]);
        assert!(hull.is_collinear());
        assert_eq!(hull.cycle_len(), 6);
        let positions: Vec<usize> = (0..6).map(|p| hull.index_at(p)).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 2, 1]);
        assert_eq!(
            hull.sequence_cw(2, 5),
            VecDeque::from(vec![key(3), key(4), key(3), key(2)])
        );
        assert_eq!(hull.step_ccw(0), 5);
        assert_eq!(hull.vertex_at(hull.step_ccw(0)), key(2));
    }

    #[test]
    fn test_extreme_indices() {
        let hull = hull_of(&[(0.2, 0.9), (0.8, 0.6), (0.6, 0.1), (0.1, 0.3)]);
        assert_eq!(hull.left_vertex_index(), Some(3));
        assert_eq!(hull.right_vertex_index(), Some(1));
        assert_eq!(hull.bottom_vertex_index(), Some(2));
        assert_eq!(hull.top_vertex_index(), Some(0));
        assert_eq!(hull.closest_vertex_index(Point2::new(1.0, 1.0)), Some(1));
        assert_eq!(hull.find_vertex(key(3)), Some(2));
        assert_eq!(ConvexHull::new().left_vertex_index(), None);
    }

    #[test]
    fn test_centroid_and_containment() {
        let hull = hull_of(&[(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]);
        let centroid = hull.centroid().unwrap();
        assert_relative_eq!(centroid.x, 0.5);
        assert_relative_eq!(centroid.y, 0.5);
        assert!(hull.contains_point(Point2::new(0.5, 0.5)));
        assert!(hull.contains_point(Point2::new(1.0, 0.5)));
        assert!(!hull.contains_point(Point2::new(1.5, 0.5)));

        let line = hull_of(&[(0.0, 0.0), (1.0, 1.0)]);
        assert!(line.contains_point(Point2::new(0.5, 0.5)));
        assert!(!line.contains_point(Point2::new(1.5, 1.5)));
        assert!(!line.contains_point(Point2::new(0.5, 0.4)));
    }
}
