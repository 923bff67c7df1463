//! Biome generator configuration.
//!
//! [`BiomeGeneratorParameters`] controls how many sites each tile receives, how far
//! the corner search may reach into a tile during merges, and how tile coordinates
//! map onto world coordinates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::point::Point2;
use crate::region::tile::TileOffset;

/// Largest octave count accepted for the elevation field.
pub const MAX_ELEVATION_OCTAVES: usize = 32;

/// Errors raised while building or validating [`BiomeGeneratorParameters`].
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ParametersError {
    /// A builder field had no value and no default.
    #[error("Parameter `{field}` was not set")]
    UninitializedField {
        /// Name of the field.
        field: &'static str,
    },
    /// The biome grid has no cells.
    #[error("Grid cell count must be at least 1")]
    EmptyGrid,
    /// The merge buffer is wider than half the grid.
    #[error("Buffer size {buffer_size} exceeds half the grid cell count {grid_cell_count}")]
    BufferTooLarge {
        /// Requested buffer size.
        buffer_size: u32,
        /// Grid cell count along one tile edge.
        grid_cell_count: u32,
    },
    /// The per-cell point range is empty or allows empty cells.
    #[error("Points per cell must satisfy 1 <= min ({min}) <= max ({max})")]
    InvalidPointRange {
        /// Minimum points per cell.
        min: u16,
        /// Maximum points per cell.
        max: u16,
    },
    /// A scale factor is zero, negative or not finite.
    #[error("Scale `{name}` must be positive and finite, got {value}")]
    InvalidScale {
        /// Name of the scale parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The elevation field octave count is out of range.
    #[error("Elevation octaves must be in 1..={MAX_ELEVATION_OCTAVES}, got {octaves}")]
    InvalidOctaves {
        /// The rejected octave count.
        octaves: usize,
    },
}

impl From<derive_builder::UninitializedFieldError> for ParametersError {
    fn from(error: derive_builder::UninitializedFieldError) -> Self {
        Self::UninitializedField {
            field: error.field_name(),
        }
    }
}

/// Parameters shared by every tile of one biome plane.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::region::config::BiomeGeneratorParametersBuilder;
///
/// let params = BiomeGeneratorParametersBuilder::default()
///     .grid_cell_count(8)
///     .seed(42)
///     .build()
///     .unwrap();
/// assert_eq!(params.grid_cell_count, 8);
/// assert_eq!(params.cell_size(), 0.125);
///
/// let invalid = BiomeGeneratorParametersBuilder::default()
///     .min_points_per_cell(4)
///     .max_points_per_cell(2)
///     .build();
/// assert!(invalid.is_err());
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(private, name = "build_unvalidated", error = "ParametersError"))]
pub struct BiomeGeneratorParameters {
    /// Number of biome cells along one tile edge.
    #[builder(default = "16")]
    pub grid_cell_count: u32,
    /// Seed of the point generator.
    #[builder(default = "0")]
    pub seed: i64,
    /// Number of cell rings the corner search may walk inwards during merges.
    #[builder(default = "2")]
    pub buffer_size: u32,
    /// Fewest sites placed in one biome cell.
    #[builder(default = "1")]
    pub min_points_per_cell: u16,
    /// Most sites placed in one biome cell.
    #[builder(default = "1")]
    pub max_points_per_cell: u16,
    /// World units covered by one tile edge.
    #[builder(default = "4000.0")]
    pub biome_scale: f64,
    /// Frequency of the elevation field, in cycles per tile.
    #[builder(default = "0.5")]
    pub elevation_scale: f64,
    /// Octaves of the elevation field.
    #[builder(default = "4")]
    pub elevation_octaves: usize,
}

impl BiomeGeneratorParametersBuilder {
    /// Builds and validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ParametersError`] if any value is out of range.
    pub fn build(&self) -> Result<BiomeGeneratorParameters, ParametersError> {
        let params = self.build_unvalidated()?;
        params.validate()?;
        Ok(params)
    }
}

impl Default for BiomeGeneratorParameters {
    fn default() -> Self {
        Self {
            grid_cell_count: 16,
            seed: 0,
            buffer_size: 2,
            min_points_per_cell: 1,
            max_points_per_cell: 1,
            biome_scale: 4000.0,
            elevation_scale: 0.5,
            elevation_octaves: 4,
        }
    }
}

impl BiomeGeneratorParameters {
    /// Checks that every value is in range.
    ///
    /// Parameters built through the builder are already validated; this is for
    /// values that arrive some other way, e.g. deserialized from a file.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParametersError`] found.
    pub fn validate(&self) -> Result<(), ParametersError> {
        if self.grid_cell_count == 0 {
            return Err(ParametersError::EmptyGrid);
        }
        if self.buffer_size > self.grid_cell_count / 2 {
            return Err(ParametersError::BufferTooLarge {
                buffer_size: self.buffer_size,
                grid_cell_count: self.grid_cell_count,
            });
        }
        if self.min_points_per_cell == 0 || self.min_points_per_cell > self.max_points_per_cell {
            return Err(ParametersError::InvalidPointRange {
                min: self.min_points_per_cell,
                max: self.max_points_per_cell,
            });
        }
        for (name, value) in [
            ("biome_scale", self.biome_scale),
            ("elevation_scale", self.elevation_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParametersError::InvalidScale { name, value });
            }
        }
        if self.elevation_octaves == 0 || self.elevation_octaves > MAX_ELEVATION_OCTAVES {
            return Err(ParametersError::InvalidOctaves {
                octaves: self.elevation_octaves,
            });
        }
        Ok(())
    }

    /// Edge length of one biome cell in tile-local units.
    #[must_use]
    pub fn cell_size(&self) -> f64 {
        1.0 / f64::from(self.grid_cell_count.max(1))
    }

    /// Biome cell containing the tile-local point, clamped to the grid.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn cell_of(&self, local: Point2) -> (u32, u32) {
        let last = f64::from(self.grid_cell_count.saturating_sub(1));
        let count = f64::from(self.grid_cell_count);
        let clamp = |v: f64| (v * count).floor().clamp(0.0, last) as u32;
        (clamp(local.x), clamp(local.y))
    }

    /// World position of the bottom-left corner of a tile.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn to_real_coordinates(&self, offset: TileOffset) -> Point2 {
        Point2::new(
            offset.x as f64 * self.biome_scale,
            offset.y as f64 * self.biome_scale,
        )
    }

    /// Tile containing a world position.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn to_region_coordinates(&self, position: Point2) -> TileOffset {
        TileOffset::new(
            (position.x / self.biome_scale).floor() as i64,
            (position.y / self.biome_scale).floor() as i64,
        )
    }

    /// Tile-local position of a world position relative to `offset`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn inner_region_position(&self, position: Point2, offset: TileOffset) -> Point2 {
        Point2::new(
            position.x / self.biome_scale - offset.x as f64,
            position.y / self.biome_scale - offset.y as f64,
        )
    }
}
