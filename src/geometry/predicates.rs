//! Geometric predicates for 2D tile triangulations.
//!
//! This module contains the circumcircle, winding and angle primitives used by the
//! graph store, the divide-and-conquer builder and the tile merge protocol.
//!
//! All comparisons use the absolute tolerance [`FLOAT_ERROR`]. Coordinates are
//! expected to stay within the unit range of a tile so the tolerance keeps its
//! meaning; no relative scaling is applied.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

use crate::geometry::point::{Point2, Vector2};

/// Absolute tolerance for winding and circumcircle comparisons.
pub const FLOAT_ERROR: f64 = 1e-5;

/// Tolerance below which two points are considered coincident.
pub const DOUBLE_EPSILON: f64 = 1e-9;

/// A circle given by its center and radius.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Center of the circle.
    pub center: Point2,
    /// Radius of the circle.
    pub radius: f64,
}

impl Circle {
    /// Returns `true` if the center and radius are finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite()
    }
}

/// Represents the position of a point relative to a circumcircle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InCircle {
    /// The point is outside the circumcircle
    OUTSIDE,
    /// The point is on the circle (within [`FLOAT_ERROR`])
    BOUNDARY,
    /// The point is strictly inside the circumcircle
    INSIDE,
}

impl InCircle {
    /// Three-way sign: `1` inside, `0` on the boundary, `-1` outside.
    #[must_use]
    pub const fn sign(self) -> i8 {
        match self {
            Self::OUTSIDE => -1,
            Self::BOUNDARY => 0,
            Self::INSIDE => 1,
        }
    }
}

impl fmt::Display for InCircle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

/// Turn direction of `(p1, pivot, p3)` as returned by [`winding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    /// Rotating `p1` onto `p3` about the pivot is a clockwise turn
    OBTUSE,
    /// The three points are collinear (within [`FLOAT_ERROR`])
    COLLINEAR,
    /// Rotating `p1` onto `p3` about the pivot is a counter-clockwise turn
    ACUTE,
}

impl Winding {
    /// Three-way sign: `1` acute (CCW), `0` collinear, `-1` obtuse (CW).
    #[must_use]
    pub const fn sign(self) -> i8 {
        match self {
            Self::OBTUSE => -1,
            Self::COLLINEAR => 0,
            Self::ACUTE => 1,
        }
    }
}

impl fmt::Display for Winding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OBTUSE => write!(f, "OBTUSE"),
            Self::COLLINEAR => write!(f, "COLLINEAR"),
            Self::ACUTE => write!(f, "ACUTE"),
        }
    }
}

// =============================================================================
// CIRCUMCIRCLES
// =============================================================================

/// Computes the circumcircle of `a`, `b` and `c`.
///
/// Callers must guard against collinear input: for a collinear triple the returned
/// circle has non-finite center and radius. Use [`try_circumcircle`] when the input
/// is not known to be a proper triangle.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::geometry::point::Point2;
/// use tiled_delaunay::geometry::predicates::circumcircle;
///
/// let circle = circumcircle(
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(0.0, 1.0),
/// );
/// assert!((circle.center.x - 0.5).abs() < 1e-12);
/// assert!((circle.center.y - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn circumcircle(a: Point2, b: Point2, c: Point2) -> Circle {
    // Translate to `a` to keep the determinant well conditioned.
    let ab = b - a;
    let ac = c - a;
    let det = 2.0 * ab.cross(ac);
    let ab_sq = ab.length_squared();
    let ac_sq = ac.length_squared();

    let offset = Vector2::new(
        ac.y.mul_add(ab_sq, -(ab.y * ac_sq)) / det,
        ab.x.mul_add(ac_sq, -(ac.x * ab_sq)) / det,
    );

    Circle {
        center: a + offset,
        radius: offset.length(),
    }
}

/// Computes the circumcircle, returning `None` for (numerically) collinear input.
#[must_use]
pub fn try_circumcircle(a: Point2, b: Point2, c: Point2) -> Option<Circle> {
    let det = (b - a).cross(c - a);
    if det.abs() <= f64::EPSILON {
        return None;
    }
    Some(circumcircle(a, b, c)).filter(Circle::is_finite)
}

/// Classifies `point` against `circle` with the absolute [`FLOAT_ERROR`] tolerance.
///
/// The comparison is made on `|point - center|² - radius²`.
#[must_use]
pub fn is_within_circumcircle(point: Point2, circle: &Circle) -> InCircle {
    let delta = point.distance_squared(circle.center) - circle.radius * circle.radius;
    if delta < -FLOAT_ERROR {
        InCircle::INSIDE
    } else if delta > FLOAT_ERROR {
        InCircle::OUTSIDE
    } else {
        InCircle::BOUNDARY
    }
}

/// Classifies `point` against the circumcircle of `(a, b, c)`.
///
/// Collinear triangles have no finite circumcircle; every point is reported as
/// [`InCircle::OUTSIDE`] so callers never delete edges on account of them.
#[must_use]
pub fn in_circumcircle(a: Point2, b: Point2, c: Point2, point: Point2) -> InCircle {
    try_circumcircle(a, b, c).map_or(InCircle::OUTSIDE, |circle| {
        is_within_circumcircle(point, &circle)
    })
}

// =============================================================================
// ORIENTATION
// =============================================================================

/// Sign of `(p1 - pivot) × (p3 - pivot)`, thresholded by [`FLOAT_ERROR`].
///
/// [`Winding::ACUTE`] means `p3` lies counter-clockwise of `p1` as seen from the
/// pivot; equivalently the triangle `(p1, pivot, p3)` is wound clockwise.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::geometry::point::Point2;
/// use tiled_delaunay::geometry::predicates::{winding, Winding};
///
/// let pivot = Point2::new(0.0, 0.0);
/// let east = Point2::new(1.0, 0.0);
/// let north = Point2::new(0.0, 1.0);
/// assert_eq!(winding(east, pivot, north), Winding::ACUTE);
/// assert_eq!(winding(north, pivot, east), Winding::OBTUSE);
/// ```
#[must_use]
pub fn winding(p1: Point2, pivot: Point2, p3: Point2) -> Winding {
    let det = (p1 - pivot).cross(p3 - pivot);
    if det > FLOAT_ERROR {
        Winding::ACUTE
    } else if det < -FLOAT_ERROR {
        Winding::OBTUSE
    } else {
        Winding::COLLINEAR
    }
}

/// Returns `true` if the triangle `(a, b, c)` is wound clockwise.
#[inline]
#[must_use]
pub fn is_clockwise(a: Point2, b: Point2, c: Point2) -> bool {
    winding(a, b, c) == Winding::ACUTE
}

/// Signed orientation of `c` relative to the directed line `a → b`.
///
/// Positive when `c` lies to the left of the line (counter-clockwise turn).
#[inline]
#[must_use]
pub fn orientation(a: Point2, b: Point2, c: Point2) -> f64 {
    (b - a).cross(c - a)
}

/// Counter-clockwise angle from `v1` to `v2`, normalized into `[0, 2π)`.
///
/// # Examples
///
/// ```rust
/// use std::f64::consts::FRAC_PI_2;
/// use tiled_delaunay::geometry::point::Vector2;
/// use tiled_delaunay::geometry::predicates::angle_between;
///
/// let angle = angle_between(Vector2::new(1.0, 0.0), Vector2::new(0.0, -1.0));
/// assert!((angle - 3.0 * FRAC_PI_2).abs() < 1e-12);
/// ```
#[must_use]
pub fn angle_between(v1: Vector2, v2: Vector2) -> f64 {
    let angle = v1.cross(v2).atan2(v1.dot(v2));
    if angle < 0.0 {
        let wrapped = angle + TAU;
        // -0.0 and tiny negatives would otherwise round up to exactly 2π.
        if wrapped >= TAU { 0.0 } else { wrapped }
    } else {
        angle
    }
}

/// Barycentric weights `[u, v, w]` of `point` with respect to the triangle `(a, b, c)`.
///
/// Returns `None` for a degenerate triangle.
#[must_use]
pub fn barycentric(point: Point2, a: Point2, b: Point2, c: Point2) -> Option<[f64; 3]> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = point - a;
    let denom = v0.cross(v1);
    if denom.abs() <= f64::EPSILON {
        return None;
    }
    let v = v2.cross(v1) / denom;
    let w = v0.cross(v2) / denom;
    Some([1.0 - v - w, v, w])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_circumcircle_right_triangle() {
        let circle = circumcircle(
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        );
        assert_relative_eq!(circle.center.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(circle.center.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(circle.radius, 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_circumcircle_is_order_independent() {
        let a = Point2::new(0.13, 0.27);
        let b = Point2::new(0.71, 0.19);
        let c = Point2::new(0.42, 0.88);
        let first = circumcircle(a, b, c);
        let second = circumcircle(c, a, b);
        assert_relative_eq!(first.center.x, second.center.x, epsilon = 1e-12);
        assert_relative_eq!(first.center.y, second.center.y, epsilon = 1e-12);
        assert_relative_eq!(first.radius, second.radius, epsilon = 1e-12);
    }

    #[test]
    fn test_collinear_circumcircle_is_rejected() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(0.5, 0.5);
        let c = Point2::new(1.0, 1.0);
        assert!(try_circumcircle(a, b, c).is_none());
        assert!(!circumcircle(a, b, c).is_finite());
        assert_eq!(
            in_circumcircle(a, b, c, Point2::new(0.5, 0.4)),
            InCircle::OUTSIDE
        );
    }

    #[test]
    fn test_is_within_circumcircle_three_way() {
        let circle = Circle {
            center: Point2::new(0.5, 0.5),
            radius: 0.25,
        };
        assert_eq!(
            is_within_circumcircle(Point2::new(0.5, 0.5), &circle),
            InCircle::INSIDE
        );
        assert_eq!(
            is_within_circumcircle(Point2::new(0.75, 0.5), &circle),
            InCircle::BOUNDARY
        );
        assert_eq!(
            is_within_circumcircle(Point2::new(0.9, 0.5), &circle),
            InCircle::OUTSIDE
        );
        assert_eq!(InCircle::INSIDE.sign(), 1);
        assert_eq!(InCircle::BOUNDARY.sign(), 0);
        assert_eq!(InCircle::OUTSIDE.sign(), -1);
    }

    #[test]
    fn test_winding_signs_and_tolerance() {
        let pivot = Point2::new(0.5, 0.5);
        let east = Point2::new(1.0, 0.5);
        let north = Point2::new(0.5, 1.0);
        assert_eq!(winding(east, pivot, north), Winding::ACUTE);
        assert_eq!(winding(north, pivot, east), Winding::OBTUSE);
        assert_eq!(
            winding(east, pivot, Point2::new(0.0, 0.5 + 1e-7)),
            Winding::COLLINEAR
        );
        assert_eq!(Winding::ACUTE.sign(), 1);
        assert_eq!(Winding::OBTUSE.sign(), -1);
    }

    #[test]
    fn test_is_clockwise_matches_orientation() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(0.0, 1.0);
        let c = Point2::new(1.0, 0.0);
        assert!(is_clockwise(a, b, c));
        assert!(!is_clockwise(a, c, b));
        assert!(orientation(a, b, c) < 0.0);
        assert!(orientation(a, c, b) > 0.0);
    }

    #[test]
    fn test_angle_between_quadrants() {
        let east = Vector2::new(1.0, 0.0);
        assert_relative_eq!(angle_between(east, east), 0.0);
        assert_relative_eq!(angle_between(east, Vector2::new(0.0, 1.0)), FRAC_PI_2);
        assert_relative_eq!(angle_between(east, Vector2::new(-1.0, 0.0)), PI);
        assert_relative_eq!(
            angle_between(east, Vector2::new(0.0, -1.0)),
            3.0 * FRAC_PI_2
        );
        let nearly_full = angle_between(east, Vector2::new(1.0, -1e-300));
        assert!((0.0..TAU).contains(&nearly_full));
    }

    #[test]
    fn test_barycentric_weights() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(0.0, 1.0);
        let [u, v, w] = barycentric(Point2::new(0.25, 0.25), a, b, c).unwrap();
        assert_relative_eq!(u, 0.5, epsilon = 1e-12);
        assert_relative_eq!(v, 0.25, epsilon = 1e-12);
        assert_relative_eq!(w, 0.25, epsilon = 1e-12);
        assert!(barycentric(Point2::new(0.5, 0.5), a, a, c).is_none());
    }
}
