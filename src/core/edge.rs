//! Canonical edge identifiers.
//!
//! Edges are not stored explicitly; they are derived from faces. An [`Edge`] names an
//! undirected edge by the tile-local ids of its endpoints, ordered ascending so that
//! `(a, b)` and `(b, a)` collapse to the same value. Unlike slot map keys, ids are
//! stable across rebuilds, which makes edge sets directly comparable between runs.

use serde::{Deserialize, Serialize};

/// Undirected edge between two vertex ids, canonicalized so `start <= end`.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::core::edge::Edge;
///
/// let edge = Edge::new(9, 4);
/// assert_eq!(edge, Edge::new(4, 9));
/// assert_eq!(edge.endpoints(), (4, 9));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    start: u64,
    end: u64,
}

impl Edge {
    /// Creates a canonical edge from two vertex ids.
    #[inline]
    #[must_use]
    pub const fn new(a: u64, b: u64) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Smaller endpoint id.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Larger endpoint id.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Both endpoint ids, smaller first.
    #[inline]
    #[must_use]
    pub const fn endpoints(&self) -> (u64, u64) {
        (self.start, self.end)
    }

    /// Returns `true` if `id` is one of the endpoints.
    #[inline]
    #[must_use]
    pub const fn contains(&self, id: u64) -> bool {
        self.start == id || self.end == id
    }
}
