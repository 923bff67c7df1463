//! Elevation sampling for triangulated tiles.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::geometry::point::Point2;
use crate::region::config::BiomeGeneratorParameters;

/// A scalar field over global tile coordinates.
pub trait ElevationField {
    /// Elevation at a global position (tile units, tile `(x, y)` spans `[x, x + 1)`).
    fn elevation_at(&self, global: Point2) -> f64;
}

impl<F> ElevationField for F
where
    F: Fn(Point2) -> f64,
{
    fn elevation_at(&self, global: Point2) -> f64 {
        self(global)
    }
}

/// Fractal Brownian motion over Perlin noise.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::geometry::point::Point2;
/// use tiled_delaunay::region::config::BiomeGeneratorParameters;
/// use tiled_delaunay::region::elevation::{ElevationField, FractalElevation};
///
/// let field = FractalElevation::from_parameters(&BiomeGeneratorParameters::default());
/// let here = field.elevation_at(Point2::new(0.25, 0.75));
/// assert_eq!(here, field.elevation_at(Point2::new(0.25, 0.75)));
/// assert!(here.is_finite());
/// ```
#[derive(Clone, Debug)]
pub struct FractalElevation {
    noise: Fbm<Perlin>,
}

impl FractalElevation {
    /// Field seeded and shaped by the generator parameters.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn from_parameters(params: &BiomeGeneratorParameters) -> Self {
        // Fold the 64-bit seed into the 32 bits the noise crate takes.
        let seed = (params.seed ^ (params.seed >> 32)) as u32;
        let noise = Fbm::<Perlin>::new(seed)
            .set_octaves(params.elevation_octaves.clamp(1, Fbm::<Perlin>::MAX_OCTAVES))
            .set_frequency(params.elevation_scale);
        Self { noise }
    }
}

impl Default for FractalElevation {
    fn default() -> Self {
        Self::from_parameters(&BiomeGeneratorParameters::default())
    }
}

impl ElevationField for FractalElevation {
    fn elevation_at(&self, global: Point2) -> f64 {
        self.noise.get([global.x, global.y])
    }
}
