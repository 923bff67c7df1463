//! Stitching neighbouring tile triangulations together.
//!
//! Tiles are triangulated independently. Their boundaries are joined afterwards,
//! without ever building one global graph:
//!
//! - an **edge merge** zips two 4-adjacent tiles along their shared side with the
//!   [merge sweep](crate::core::algorithms::merge_sweep);
//! - a **corner merge** closes the quadrilateral hole left between four tiles that
//!   meet at one corner.
//!
//! Every triangle that crosses a boundary is stored in each tile it touches, using
//! ghost vertices for the corners owned by other tiles. The merge rails of all four
//! boundaries around a tile corner meet at the same corner vertices, so after the
//! edge merges the remaining hole at a tile corner is exactly the quad closed by the
//! corner merge.
//!
//! [`merge_region`] runs all pending merges of one tile against a cache of tiles.

use thiserror::Error;

use crate::core::algorithms::merge_sweep::{Rail, SideVertex, SweepError, SweepSide, sweep};
use crate::core::collections::{FastHashMap, FastHashSet};
use crate::core::delaunay_graph::{DelaunayGraph, VertexKey};
use crate::core::vertex::Vertex;
use crate::geometry::point::Point2;
use crate::geometry::predicates::{FLOAT_ERROR, InCircle, in_circumcircle, orientation};
use crate::region::config::BiomeGeneratorParameters;
use crate::region::region_data::BiomeRegionData;
use crate::region::tile::{CARDINAL_DIRECTIONS, DIAGONAL_DIRECTIONS, TileCorner, TileOffset};

// =============================================================================
// ERRORS AND RESULTS
// =============================================================================

/// Reasons a merge could not run. The orchestrator skips such merges and leaves
/// the corresponding flags unset.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MergeError {
    /// The tiles do not share the required edge or corner.
    #[error("Tiles {first} and {second} are not arranged for this merge")]
    NotAdjacent {
        /// First tile.
        first: TileOffset,
        /// Second tile.
        second: TileOffset,
    },
    /// A participating tile has not been triangulated.
    #[error("Tile {offset} has no triangulation yet")]
    NotGenerated {
        /// The untriangulated tile.
        offset: TileOffset,
    },
    /// A participating tile is not loaded.
    #[error("Tile {offset} is not loaded")]
    MissingRegion {
        /// The missing tile.
        offset: TileOffset,
    },
    /// The sweep along the shared side did not terminate.
    #[error(transparent)]
    Sweep(#[from] SweepError),
    /// No hull vertex lies within the buffer rings of a tile corner.
    #[error("No hull vertex near the {corner} corner of tile {offset}")]
    CornerNotFound {
        /// Tile searched.
        offset: TileOffset,
        /// Corner searched.
        corner: TileCorner,
    },
}

/// What a single merge changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeInfo {
    /// Cross triangles added (counted once, not per tile).
    pub triangles_added: usize,
    /// Own edges removed from the participating tiles.
    pub edges_deleted: usize,
}

// =============================================================================
// CORNER SEARCH
// =============================================================================

/// Hull vertex of `data` serving as the merge anchor at `corner`.
///
/// Cells are searched in square rings around the grid cell at the corner, out to
/// `buffer_size` rings. In the first ring containing any hull vertex, the one closest
/// to the physical corner wins.
///
/// # Errors
///
/// Returns [`MergeError::CornerNotFound`] if the rings hold no hull vertex.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn find_corner_vertex(
    data: &BiomeRegionData,
    corner: TileCorner,
    params: &BiomeGeneratorParameters,
) -> Result<VertexKey, MergeError> {
    let graph = data.graph();
    let hull = graph.convex_hull();
    let count = i64::from(data.grid_cell_count());
    let (x_high, y_high) = corner.flags();
    let cx = if x_high { count - 1 } else { 0 };
    let cy = if y_high { count - 1 } else { 0 };
    let target = corner.local_point();

    for ring in 0..=i64::from(params.buffer_size) {
        let mut best: Option<(VertexKey, f64)> = None;
        for y in (cy - ring).max(0)..=(cy + ring).min(count - 1) {
            for x in (cx - ring).max(0)..=(cx + ring).min(count - 1) {
                if (x - cx).abs().max((y - cy).abs()) != ring {
                    continue;
                }
                let Some(cell) = data.cell(x as u32, y as u32) else {
                    continue;
                };
                for &id in cell.point_ids() {
                    let Some(key) = graph.vertex_key_by_id(id) else {
                        continue;
                    };
                    if hull.find_vertex(key).is_none() {
                        continue;
                    }
                    let Some(point) = graph.point(key) else {
                        continue;
                    };
                    let distance = point.distance_squared(target);
                    if best.is_none_or(|(_, d)| distance < d) {
                        best = Some((key, distance));
                    }
                }
            }
        }
        if let Some((key, _)) = best {
            return Ok(key);
        }
    }
    Err(MergeError::CornerNotFound {
        offset: data.offset(),
        corner,
    })
}

fn ensure_generated(data: &BiomeRegionData) -> Result<(), MergeError> {
    if data.is_graph_generated() {
        Ok(())
    } else {
        Err(MergeError::NotGenerated {
            offset: data.offset(),
        })
    }
}

fn vertex_of(graph: &DelaunayGraph, key: VertexKey) -> Option<Vertex> {
    graph.vertex(key).cloned()
}

// =============================================================================
// EDGE MERGE
// =============================================================================

/// Zips two 4-adjacent tiles along their shared side.
///
/// The tiles may be given in either order. The sweep runs in the frame of the west
/// (or south) tile between rails anchored at the corner vertices of the shared side,
/// and every new triangle is stored in both tiles. Already merged pairs are left
/// alone.
///
/// # Errors
///
/// Returns a [`MergeError`] if the tiles are not 4-adjacent, either is not
/// triangulated, a corner vertex cannot be found, or the sweep does not terminate.
/// Neither tile is modified then.
pub fn merge_region_edge(
    first: &mut BiomeRegionData,
    second: &mut BiomeRegionData,
    params: &BiomeGeneratorParameters,
) -> Result<MergeInfo, MergeError> {
    let not_adjacent = MergeError::NotAdjacent {
        first: first.offset(),
        second: second.offset(),
    };
    let Some((dx, dy)) = first.offset().direction_to(second.offset()) else {
        return Err(not_adjacent);
    };
    if dx != 0 && dy != 0 {
        return Err(not_adjacent);
    }
    ensure_generated(first)?;
    ensure_generated(second)?;
    if first.graph().neighbours_merged().is_merged(dx, dy) {
        return Ok(MergeInfo::default());
    }

    // The left tile is the west or south one.
    let (left, right) = if dx < 0 || dy < 0 {
        (second, first)
    } else {
        (first, second)
    };
    let horizontal = dx != 0;
    let (lower, upper) = if horizontal {
        (
            (TileCorner::BottomRight, TileCorner::BottomLeft),
            (TileCorner::TopRight, TileCorner::TopLeft),
        )
    } else {
        (
            (TileCorner::TopRight, TileCorner::BottomRight),
            (TileCorner::TopLeft, TileCorner::BottomLeft),
        )
    };

    let base = (
        find_corner_vertex(left, lower.0, params)?,
        find_corner_vertex(right, lower.1, params)?,
    );
    let rail = Rail {
        left: find_corner_vertex(left, upper.0, params)?,
        right: find_corner_vertex(right, upper.1, params)?,
    };

    let outcome = {
        let shift = right.offset().delta_to(left.offset());
        let left_side = SweepSide::new(left.graph());
        let right_side = SweepSide::shifted(right.graph(), shift);
        sweep(&left_side, &right_side, base, Some(rail))?
    };

    left.graph_mut().remove_faces_with_edges(&outcome.deleted_left);
    right.graph_mut().remove_faces_with_edges(&outcome.deleted_right);

    for triangle in &outcome.triangles {
        // Resolve every corner in both tiles before mutating either.
        let sources: Option<Vec<Vertex>> = triangle
            .iter()
            .map(|&v| match v {
                SideVertex::Left(key) => vertex_of(left.graph(), key),
                SideVertex::Right(key) => vertex_of(right.graph(), key),
            })
            .collect();
        let Some(sources) = sources else {
            tracing::warn!(?triangle, "merge triangle references a missing vertex");
            continue;
        };
        add_shared_triangle(left.graph_mut(), &sources);
        add_shared_triangle(right.graph_mut(), &sources);
    }

    let (ldx, ldy) = (dx.abs(), dy.abs());
    left.graph_mut().neighbours_merged_mut().set_merged(ldx, ldy);
    right.graph_mut().neighbours_merged_mut().set_merged(-ldx, -ldy);

    let info = MergeInfo {
        triangles_added: outcome.triangles.len(),
        edges_deleted: outcome.deleted_left.len() + outcome.deleted_right.len(),
    };
    tracing::debug!(
        left = %left.offset(),
        right = %right.offset(),
        triangles = info.triangles_added,
        deleted = info.edges_deleted,
        "merged tile edge"
    );
    Ok(info)
}

/// Adds the triangle over `sources` to `graph`, creating ghosts where needed.
fn add_shared_triangle(graph: &mut DelaunayGraph, sources: &[Vertex]) {
    let keys: Vec<VertexKey> = sources
        .iter()
        .map(|source| graph.add_ghost_vertex(source))
        .collect();
    if let &[a, b, c] = keys.as_slice() {
        if graph.add_face(a, b, c).is_none() {
            tracing::warn!(
                tile = %graph.offset(),
                "shared triangle is collinear in this tile's frame; skipped"
            );
        }
    }
}

// =============================================================================
// CORNER MERGE
// =============================================================================

/// Diagonal used to split the quadrilateral at a tile corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CornerDiagonal {
    /// Split along bottom-left to top-right.
    BottomLeftTopRight,
    /// Split along bottom-right to top-left.
    BottomRightTopLeft,
}

impl CornerDiagonal {
    /// The two triangles, as quad positions, produced by this diagonal.
    #[must_use]
    pub const fn triangles(self) -> [[TileCorner; 3]; 2] {
        use TileCorner::{BottomLeft, BottomRight, TopLeft, TopRight};
        match self {
            Self::BottomLeftTopRight => [
                [BottomLeft, BottomRight, TopRight],
                [BottomLeft, TopRight, TopLeft],
            ],
            Self::BottomRightTopLeft => [
                [BottomLeft, BottomRight, TopLeft],
                [BottomRight, TopRight, TopLeft],
            ],
        }
    }
}

/// Picks the diagonal for the corner quad `bottom_left, bottom_right, top_right, top_left`.
///
/// `BL–TR` is used unless `TL` lies strictly inside the circumcircle of
/// `(BL, BR, TR)`. A diagonal that does not separate the other two corners (a
/// reflex quad) is never chosen while the other one does.
#[must_use]
pub fn choose_corner_diagonal(
    bottom_left: Point2,
    bottom_right: Point2,
    top_right: Point2,
    top_left: Point2,
) -> CornerDiagonal {
    let separates = |from: Point2, to: Point2, p: Point2, q: Point2| {
        let op = orientation(from, to, p);
        let oq = orientation(from, to, q);
        (op > FLOAT_ERROR && oq < -FLOAT_ERROR) || (op < -FLOAT_ERROR && oq > FLOAT_ERROR)
    };
    let main = separates(bottom_left, top_right, bottom_right, top_left);
    let anti = separates(bottom_right, top_left, bottom_left, top_right);
    match (main, anti) {
        (true, false) => CornerDiagonal::BottomLeftTopRight,
        (false, true) => CornerDiagonal::BottomRightTopLeft,
        _ => {
            if in_circumcircle(bottom_left, bottom_right, top_right, top_left) == InCircle::INSIDE {
                CornerDiagonal::BottomRightTopLeft
            } else {
                CornerDiagonal::BottomLeftTopRight
            }
        }
    }
}

/// Closes the hole between four tiles meeting at one corner.
///
/// `bottom_left` must be at `(x, y)`, `bottom_right` at `(x + 1, y)`, `top_left` at
/// `(x, y + 1)` and `top_right` at `(x + 1, y + 1)`. Each tile contributes the hull
/// vertex closest to the shared corner; the two triangles of the chosen diagonal are
/// added to all four tiles. Edges outside the quad are not flipped.
///
/// # Errors
///
/// Returns a [`MergeError`] if the tiles are arranged differently, a tile is not
/// triangulated, or a corner vertex cannot be found. No tile is modified then.
pub fn merge_region_corner(
    top_left: &mut BiomeRegionData,
    top_right: &mut BiomeRegionData,
    bottom_left: &mut BiomeRegionData,
    bottom_right: &mut BiomeRegionData,
    params: &BiomeGeneratorParameters,
) -> Result<MergeInfo, MergeError> {
    let origin = bottom_left.offset();
    for (data, expected) in [
        (&*bottom_right, origin.neighbour(1, 0)),
        (&*top_left, origin.neighbour(0, 1)),
        (&*top_right, origin.neighbour(1, 1)),
    ] {
        if data.offset() != expected {
            return Err(MergeError::NotAdjacent {
                first: origin,
                second: data.offset(),
            });
        }
    }
    for data in [&*bottom_left, &*bottom_right, &*top_left, &*top_right] {
        ensure_generated(data)?;
    }
    if bottom_left.graph().neighbours_merged().is_merged(1, 1) {
        return Ok(MergeInfo::default());
    }

    // Quad order: bottom-left, bottom-right, top-right, top-left.
    let anchors = [
        (&*bottom_left, TileCorner::TopRight),
        (&*bottom_right, TileCorner::TopLeft),
        (&*top_right, TileCorner::BottomLeft),
        (&*top_left, TileCorner::BottomRight),
    ];
    let mut sources: Vec<Vertex> = Vec::with_capacity(4);
    for (data, corner) in anchors {
        let key = find_corner_vertex(data, corner, params)?;
        let vertex = vertex_of(data.graph(), key).ok_or(MergeError::CornerNotFound {
            offset: data.offset(),
            corner,
        })?;
        sources.push(vertex);
    }
    let points: Vec<Point2> = sources.iter().map(|v| v.point_in_frame(origin)).collect();
    let diagonal = choose_corner_diagonal(points[0], points[1], points[2], points[3]);

    let quad_index = |corner: TileCorner| match corner {
        TileCorner::BottomLeft => 0,
        TileCorner::BottomRight => 1,
        TileCorner::TopRight => 2,
        TileCorner::TopLeft => 3,
    };
    let triangles: Vec<Vec<Vertex>> = diagonal
        .triangles()
        .iter()
        .map(|triangle| triangle.iter().map(|&c| sources[quad_index(c)].clone()).collect())
        .collect();

    for data in [
        &mut *bottom_left,
        &mut *bottom_right,
        &mut *top_left,
        &mut *top_right,
    ] {
        for triangle in &triangles {
            add_shared_triangle(data.graph_mut(), triangle);
        }
    }

    for (data, (dx, dy)) in [
        (&mut *bottom_left, (1, 1)),
        (&mut *bottom_right, (-1, 1)),
        (&mut *top_left, (1, -1)),
        (&mut *top_right, (-1, -1)),
    ] {
        data.graph_mut().neighbours_merged_mut().set_merged(dx, dy);
    }

    tracing::debug!(corner = %origin.neighbour(1, 1), ?diagonal, "merged tile corner");
    Ok(MergeInfo {
        triangles_added: triangles.len(),
        edges_deleted: 0,
    })
}

// =============================================================================
// ORCHESTRATION
// =============================================================================

/// Removes the tiles at `offsets` from the cache if all of them are loaded and
/// triangulated. Otherwise nothing is removed.
fn take_regions(
    regions: &mut FastHashMap<TileOffset, BiomeRegionData>,
    offsets: &[TileOffset],
) -> Result<Vec<BiomeRegionData>, MergeError> {
    for &offset in offsets {
        let data = regions
            .get(&offset)
            .ok_or(MergeError::MissingRegion { offset })?;
        ensure_generated(data)?;
    }
    Ok(offsets
        .iter()
        .filter_map(|offset| regions.remove(offset))
        .collect())
}

fn restore_regions(
    regions: &mut FastHashMap<TileOffset, BiomeRegionData>,
    taken: Vec<BiomeRegionData>,
) {
    for data in taken {
        regions.insert(data.offset(), data);
    }
}

/// Runs every pending edge and corner merge of the tile at `target`.
///
/// Edges go first (east, north, west, south), then the four corner quads. Merges
/// whose tiles are missing or untriangulated are skipped and stay pending. Returns
/// the offsets of all tiles that were modified; calling it again without new tiles
/// returns an empty set.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::core::collections::FastHashMap;
/// use tiled_delaunay::prelude::*;
///
/// let params = BiomeGeneratorParametersBuilder::default()
///     .grid_cell_count(4)
///     .buffer_size(1)
///     .build()
///     .unwrap();
/// let mut regions = FastHashMap::default();
/// for offset in [TileOffset::new(0, 0), TileOffset::new(1, 0)] {
///     let mut data = BiomeRegionData::generate(&params, offset);
///     data.generate_graph(&mut DivideAndConquerBuilder::new()).unwrap();
///     regions.insert(offset, data);
/// }
///
/// let updated = merge_region(TileOffset::ORIGIN, &mut regions, &params);
/// assert_eq!(updated.len(), 2);
/// assert!(merge_region(TileOffset::ORIGIN, &mut regions, &params).is_empty());
/// ```
pub fn merge_region(
    target: TileOffset,
    regions: &mut FastHashMap<TileOffset, BiomeRegionData>,
    params: &BiomeGeneratorParameters,
) -> FastHashSet<TileOffset> {
    let mut updated = FastHashSet::default();
    let Some(data) = regions.get(&target) else {
        tracing::debug!(%target, "merge skipped: tile not loaded");
        return updated;
    };
    if !data.is_graph_generated() || data.is_merged_with_all() {
        return updated;
    }

    for (dx, dy) in CARDINAL_DIRECTIONS {
        if is_merged(regions, target, dx, dy) {
            continue;
        }
        let neighbour = target.neighbour(dx, dy);
        let mut taken = match take_regions(regions, &[target, neighbour]) {
            Ok(taken) => taken,
            Err(error) => {
                tracing::debug!(%target, %neighbour, %error, "edge merge skipped");
                continue;
            }
        };
        let result = match taken.as_mut_slice() {
            [a, b] => merge_region_edge(a, b, params),
            _ => Err(MergeError::MissingRegion { offset: neighbour }),
        };
        restore_regions(regions, taken);
        match result {
            Ok(_) => {
                updated.insert(target);
                updated.insert(neighbour);
            }
            Err(error) => tracing::debug!(%target, %neighbour, %error, "edge merge skipped"),
        }
    }

    for (dx, dy) in DIAGONAL_DIRECTIONS {
        if is_merged(regions, target, dx, dy) {
            continue;
        }
        let origin = target.neighbour(dx.min(0), dy.min(0));
        let quad = [
            origin,
            origin.neighbour(1, 0),
            origin.neighbour(0, 1),
            origin.neighbour(1, 1),
        ];
        let mut taken = match take_regions(regions, &quad) {
            Ok(taken) => taken,
            Err(error) => {
                tracing::debug!(%target, corner = %quad[3], %error, "corner merge skipped");
                continue;
            }
        };
        let result = match taken.as_mut_slice() {
            [bl, br, tl, tr] => merge_region_corner(tl, tr, bl, br, params),
            _ => Err(MergeError::MissingRegion { offset: origin }),
        };
        restore_regions(regions, taken);
        match result {
            Ok(_) => updated.extend(quad),
            Err(error) => {
                tracing::debug!(%target, corner = %quad[3], %error, "corner merge skipped");
            }
        }
    }

    updated
}

fn is_merged(
    regions: &FastHashMap<TileOffset, BiomeRegionData>,
    target: TileOffset,
    dx: i64,
    dy: i64,
) -> bool {
    regions
        .get(&target)
        .is_some_and(|data| data.graph().neighbours_merged().is_merged(dx, dy))
}

// =============================================================================
// TESTS
// =============================================================================
