//! Tile addressing.
//!
//! The biome plane is cut into unit tiles. Tile `(x, y)` covers the global square
//! `[x, x + 1) × [y, y + 1)` and stores its geometry in local coordinates `[0, 1)²`.
//! `+x` points east and `+y` points north.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::geometry::point::{Point2, Vector2};

/// Integer offset of one tile on the infinite biome plane.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileOffset {
    /// Column (east is positive).
    pub x: i64,
    /// Row (north is positive).
    pub y: i64,
}

/// The four edge-sharing neighbour directions `(dx, dy)`.
pub const CARDINAL_DIRECTIONS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// The four corner-sharing neighbour directions `(dx, dy)`.
pub const DIAGONAL_DIRECTIONS: [(i64, i64); 4] = [(1, 1), (-1, 1), (-1, -1), (1, -1)];

impl TileOffset {
    /// The tile at the origin.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Creates a tile offset.
    #[inline]
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The tile displaced by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn neighbour(self, dx: i64, dy: i64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Translation that maps a point local to `self` into the local frame of `frame`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn delta_to(self, frame: Self) -> Vector2 {
        Vector2::new((self.x - frame.x) as f64, (self.y - frame.y) as f64)
    }

    /// Global position of a point given in this tile's local frame.
    #[must_use]
    pub fn to_global(self, local: Point2) -> Point2 {
        local + self.delta_to(Self::ORIGIN)
    }

    /// Tile containing the global point `global` and the point's local position in it.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn containing(global: Point2) -> (Self, Point2) {
        let offset = Self::new(global.x.floor() as i64, global.y.floor() as i64);
        let local = global - offset.delta_to(Self::ORIGIN);
        (offset, local)
    }

    /// Chebyshev (king-move) distance between two tiles.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u64 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// `(dx, dy)` from `self` to `other` when the tiles touch (including diagonally).
    #[must_use]
    pub const fn direction_to(self, other: Self) -> Option<(i64, i64)> {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if (dx != 0 || dy != 0) && dx.abs() <= 1 && dy.abs() <= 1 {
            Some((dx, dy))
        } else {
            None
        }
    }
}

impl fmt::Display for TileOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

impl Add for TileOffset {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for TileOffset {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

// =============================================================================
// CORNERS
// =============================================================================

/// One of the four physical corners of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileCorner {
    /// Local `(0, 0)`.
    BottomLeft,
    /// Local `(1, 0)`.
    BottomRight,
    /// Local `(1, 1)`.
    TopRight,
    /// Local `(0, 1)`.
    TopLeft,
}

impl TileCorner {
    /// Corner selected by the east (`x_high`) and north (`y_high`) flags.
    #[must_use]
    pub const fn from_flags(x_high: bool, y_high: bool) -> Self {
        match (x_high, y_high) {
            (false, false) => Self::BottomLeft,
            (true, false) => Self::BottomRight,
            (true, true) => Self::TopRight,
            (false, true) => Self::TopLeft,
        }
    }

    /// `(x_high, y_high)` flags of this corner.
    #[must_use]
    pub const fn flags(self) -> (bool, bool) {
        match self {
            Self::BottomLeft => (false, false),
            Self::BottomRight => (true, false),
            Self::TopRight => (true, true),
            Self::TopLeft => (false, true),
        }
    }

    /// Corner position in local tile coordinates.
    #[must_use]
    pub const fn local_point(self) -> Point2 {
        let (x_high, y_high) = self.flags();
        Point2::new(
            if x_high { 1.0 } else { 0.0 },
            if y_high { 1.0 } else { 0.0 },
        )
    }
}

impl fmt::Display for TileCorner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        };
        f.write_str(name)
    }
}

// =============================================================================
// MERGE FLAGS
// =============================================================================

/// 3×3 record of which neighbour boundaries of a tile have been stitched in.
///
/// Indexed by direction `(dx, dy)` with `dx, dy ∈ {-1, 0, 1}`. The centre entry
/// stands for the tile itself and is always `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeighboursMerged {
    flags: [[bool; 3]; 3],
}

impl Default for NeighboursMerged {
    fn default() -> Self {
        Self::new()
    }
}

impl NeighboursMerged {
    /// No neighbour merged yet.
    #[must_use]
    pub const fn new() -> Self {
        let mut flags = [[false; 3]; 3];
        flags[1][1] = true;
        Self { flags }
    }

    #[allow(clippy::cast_sign_loss)]
    const fn slot(dx: i64, dy: i64) -> Option<(usize, usize)> {
        if dx < -1 || dx > 1 || dy < -1 || dy > 1 {
            return None;
        }
        Some(((dy + 1) as usize, (dx + 1) as usize))
    }

    /// Whether the boundary towards `(dx, dy)` has been merged. Out-of-range
    /// directions are never merged.
    #[must_use]
    pub const fn is_merged(&self, dx: i64, dy: i64) -> bool {
        match Self::slot(dx, dy) {
            Some((row, col)) => self.flags[row][col],
            None => false,
        }
    }

    /// Marks the boundary towards `(dx, dy)` as merged. Out-of-range directions are ignored.
    pub fn set_merged(&mut self, dx: i64, dy: i64) {
        if let Some((row, col)) = Self::slot(dx, dy) {
            self.flags[row][col] = true;
        }
    }

    /// Returns `true` once all eight neighbour boundaries are merged.
    #[must_use]
    pub fn is_merged_with_all(&self) -> bool {
        self.flags.iter().flatten().all(|&merged| merged)
    }

    /// Directions still waiting for a merge.
    pub fn pending(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        CARDINAL_DIRECTIONS
            .into_iter()
            .chain(DIAGONAL_DIRECTIONS)
            .filter(|&(dx, dy)| !self.is_merged(dx, dy))
    }
}
