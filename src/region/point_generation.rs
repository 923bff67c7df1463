//! Deterministic site placement.
//!
//! Every tile derives its own random stream from the plane seed and its offset, so a
//! tile always receives the same sites no matter when or in which order it is
//! generated.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::point::Point2;
use crate::region::config::BiomeGeneratorParameters;
use crate::region::tile::TileOffset;

/// Sites are kept away from cell borders by this fraction of the cell size.
pub const CELL_MARGIN: f64 = 0.1;

const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

/// FNV-1a hash of a tile offset mixed with the plane seed.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::region::point_generation::hash_from_offset;
/// use tiled_delaunay::region::tile::TileOffset;
///
/// let a = hash_from_offset(7, TileOffset::new(1, 2));
/// assert_eq!(a, hash_from_offset(7, TileOffset::new(1, 2)));
/// assert_ne!(a, hash_from_offset(7, TileOffset::new(2, 1)));
/// ```
#[allow(clippy::cast_sign_loss)]
#[must_use]
pub const fn hash_from_offset(seed: i64, offset: TileOffset) -> u64 {
    let mut collapsed = (offset
        .x
        .wrapping_mul(6151)
        .wrapping_add(offset.y.wrapping_mul(3079))
        .wrapping_add(1543))
        ^ seed.wrapping_add(123_456_789_012_345).wrapping_mul(769);

    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < 8 {
        hash = hash.wrapping_mul(FNV_PRIME);
        hash ^= (collapsed & 0xff) as u64;
        collapsed >>= 8;
        i += 1;
    }
    hash
}

/// One generated site and the biome cell it was placed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellPoint {
    /// Cell column.
    pub cell_x: u32,
    /// Cell row.
    pub cell_y: u32,
    /// Tile-local position.
    pub point: Point2,
}

/// Scatters `min..=max` sites into every biome cell of the tile at `offset`.
///
/// Cells are visited row by row from the bottom-left. Each site lies in the inner
/// `[0.1, 0.9]` band of its cell, so sites of different cells never coincide.
#[must_use]
pub fn scatter_points(params: &BiomeGeneratorParameters, offset: TileOffset) -> Vec<CellPoint> {
    let mut rng = StdRng::seed_from_u64(hash_from_offset(params.seed, offset));
    let cell_size = params.cell_size();
    let low = params.min_points_per_cell.min(params.max_points_per_cell);
    let high = params.max_points_per_cell.max(low);

    let mut points = Vec::with_capacity(
        (params.grid_cell_count as usize).pow(2) * usize::from(high),
    );
    for cell_y in 0..params.grid_cell_count {
        for cell_x in 0..params.grid_cell_count {
            let count = rng.random_range(low..=high);
            let origin = Point2::new(f64::from(cell_x), f64::from(cell_y)) * cell_size;
            for _ in 0..count {
                let jitter = Point2::new(
                    rng.random_range(CELL_MARGIN..=1.0 - CELL_MARGIN),
                    rng.random_range(CELL_MARGIN..=1.0 - CELL_MARGIN),
                );
                points.push(CellPoint {
                    cell_x,
                    cell_y,
                    point: origin + jitter * cell_size,
                });
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::config::BiomeGeneratorParametersBuilder;

    #[test]
    fn test_hash_depends_on_seed_and_offset() {
        let origin = hash_from_offset(0, TileOffset::ORIGIN);
        assert_ne!(origin, hash_from_offset(1, TileOffset::ORIGIN));
        assert_ne!(origin, hash_from_offset(0, TileOffset::new(0, 1)));
        assert_ne!(
            hash_from_offset(0, TileOffset::new(-1, 0)),
            hash_from_offset(0, TileOffset::new(1, 0))
        );
    }

    #[test]
    fn test_scatter_is_deterministic_and_in_cells() {
        let params = BiomeGeneratorParametersBuilder::default()
            .grid_cell_count(4)
            .buffer_size(1)
            .min_points_per_cell(1)
            .max_points_per_cell(3)
            .seed(11)
            .build()
            .unwrap();
        let offset = TileOffset::new(-3, 5);
        let first = scatter_points(&params, offset);
        assert_eq!(first, scatter_points(&params, offset));
        assert!(first.len() >= 16 && first.len() <= 48);

        let size = params.cell_size();
        for p in &first {
            let min_x = f64::from(p.cell_x) * size;
            let min_y = f64::from(p.cell_y) * size;
            assert!(p.point.x >= min_x + 0.1 * size - 1e-12);
            assert!(p.point.x <= min_x + 0.9 * size + 1e-12);
            assert!(p.point.y >= min_y + 0.1 * size - 1e-12);
            assert!(p.point.y <= min_y + 0.9 * size + 1e-12);
            assert_eq!(params.cell_of(p.point), (p.cell_x, p.cell_y));
        }
    }
}
