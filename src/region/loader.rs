//! Region cache and on-demand generation.
//!
//! [`BiomeRegionLoader`] owns every tile generated so far. Asking for a tile
//! generates it and its neighbourhood, merges the tile with its neighbours and samples
//! its elevations. The loader is the only place where several tiles are mutated at
//! once.
//!
//! Queries take world positions; [`BiomeGeneratorParameters::biome_scale`] maps them
//! to tiles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::algorithms::divide_and_conquer::DivideAndConquerBuilder;
use crate::core::collections::{FastHashMap, FastHashSet};
use crate::core::traits::triangulation_builder::{BuildError, TriangulationBuilder};
use crate::geometry::point::Point2;
use crate::geometry::predicates::barycentric;
use crate::region::config::{BiomeGeneratorParameters, ParametersError};
use crate::region::elevation::{ElevationField, FractalElevation};
use crate::region::merge::merge_region;
use crate::region::region_data::BiomeRegionData;
use crate::region::tile::TileOffset;

// =============================================================================
// EVENTS
// =============================================================================

/// Notifications published by the loader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RegionEvent {
    /// These tiles were created or changed, sorted by offset.
    RegionsUpdated {
        /// Offsets of the changed tiles.
        offsets: Vec<TileOffset>,
    },
}

/// Receiver of [`RegionEvent`]s.
pub trait RegionEventSink {
    /// Handles one event.
    fn publish(&mut self, event: RegionEvent);
}

impl<F> RegionEventSink for F
where
    F: FnMut(RegionEvent),
{
    fn publish(&mut self, event: RegionEvent) {
        self(event);
    }
}

/// A sink that keeps every event, mostly useful in tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionEventLog {
    events: Vec<RegionEvent>,
}

impl RegionEventLog {
    /// Events received so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[RegionEvent] {
        &self.events
    }
}

impl RegionEventSink for RegionEventLog {
    fn publish(&mut self, event: RegionEvent) {
        self.events.push(event);
    }
}

// =============================================================================
// ERRORS AND QUERY RESULTS
// =============================================================================

/// Errors raised by the loader.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum RegionError {
    /// The generator parameters are invalid.
    #[error(transparent)]
    Parameters(#[from] ParametersError),
    /// Triangulating a tile failed.
    #[error("Failed to triangulate tile {offset}: {source}")]
    Build {
        /// The tile being triangulated.
        offset: TileOffset,
        /// The builder error.
        #[source]
        source: BuildError,
    },
    /// A world position has NaN or infinite coordinates.
    #[error("Position {position} is not finite")]
    NonFinitePosition {
        /// The rejected position.
        position: Point2,
    },
}

/// Global identity of a site: owning tile and id within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId {
    /// Tile owning the site.
    pub offset: TileOffset,
    /// Id of the site in that tile.
    pub id: u64,
}

/// Triangle of sites enclosing a query position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiomeTriangle {
    /// The three sites, in the triangle's clockwise order.
    pub sites: [SiteId; 3],
    /// Site positions in the frame of the queried tile.
    pub points: [Point2; 3],
    /// Barycentric weights of the query position; they sum to one.
    pub weights: [f64; 3],
}

impl BiomeTriangle {
    /// Blends per-site values with the barycentric weights.
    #[must_use]
    pub fn interpolate(&self, values: [f64; 3]) -> f64 {
        self.weights
            .iter()
            .zip(values)
            .map(|(w, v)| w * v)
            .sum()
    }
}

// =============================================================================
// LOADER
// =============================================================================

/// Generates, merges and caches tiles.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::prelude::*;
///
/// let params = BiomeGeneratorParametersBuilder::default()
///     .grid_cell_count(4)
///     .buffer_size(1)
///     .biome_scale(100.0)
///     .build()
///     .unwrap();
/// let mut loader = BiomeRegionLoader::new(params).unwrap();
///
/// let region = loader.region_at(TileOffset::ORIGIN).unwrap();
/// assert!(region.is_merged_with_all());
/// assert!(region.is_biome_data_generated());
/// // The fetch radius of one generates the full 3×3 neighbourhood.
/// assert_eq!(loader.number_of_regions(), 9);
///
/// let triangle = loader
///     .find_containing_triangle(Point2::new(50.0, 50.0))
///     .unwrap()
///     .unwrap();
/// assert!((triangle.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
/// ```
pub struct BiomeRegionLoader {
    params: BiomeGeneratorParameters,
    regions: FastHashMap<TileOffset, BiomeRegionData>,
    builder: Box<dyn TriangulationBuilder + Send>,
    elevation: Box<dyn ElevationField + Send + Sync>,
    events: Option<Box<dyn RegionEventSink + Send>>,
    fetch_radius: u32,
}

impl std::fmt::Debug for BiomeRegionLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiomeRegionLoader")
            .field("params", &self.params)
            .field("regions", &self.regions.len())
            .field("fetch_radius", &self.fetch_radius)
            .field("has_event_sink", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

impl BiomeRegionLoader {
    /// Default neighbourhood radius generated around a requested tile.
    pub const DEFAULT_FETCH_RADIUS: u32 = 1;

    /// A loader with the divide-and-conquer builder and fractal elevation.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::Parameters`] if `params` fails validation.
    pub fn new(params: BiomeGeneratorParameters) -> Result<Self, RegionError> {
        params.validate()?;
        Ok(Self {
            params,
            regions: FastHashMap::default(),
            builder: Box::new(DivideAndConquerBuilder::new()),
            elevation: Box::new(FractalElevation::from_parameters(&params)),
            events: None,
            fetch_radius: Self::DEFAULT_FETCH_RADIUS,
        })
    }

    /// Replaces the elevation field.
    #[must_use]
    pub fn with_elevation<E>(mut self, field: E) -> Self
    where
        E: ElevationField + Send + Sync + 'static,
    {
        self.elevation = Box::new(field);
        self
    }

    /// Publishes region events to `sink`.
    #[must_use]
    pub fn with_event_sink<S>(mut self, sink: S) -> Self
    where
        S: RegionEventSink + Send + 'static,
    {
        self.events = Some(Box::new(sink));
        self
    }

    /// Replaces the triangulation builder.
    #[must_use]
    pub fn with_builder<B>(mut self, builder: B) -> Self
    where
        B: TriangulationBuilder + Send + 'static,
    {
        self.builder = Box::new(builder);
        self
    }

    /// Sets the neighbourhood radius used by [`Self::region_at`].
    #[must_use]
    pub const fn with_fetch_radius(mut self, radius: u32) -> Self {
        self.fetch_radius = radius;
        self
    }

    /// Generator parameters.
    #[must_use]
    pub const fn params(&self) -> &BiomeGeneratorParameters {
        &self.params
    }

    /// Neighbourhood radius used by [`Self::region_at`].
    #[must_use]
    pub const fn fetch_radius(&self) -> u32 {
        self.fetch_radius
    }

    /// Number of cached tiles.
    #[must_use]
    pub fn number_of_regions(&self) -> usize {
        self.regions.len()
    }

    /// Cached tile at `offset`, without generating anything.
    #[must_use]
    pub fn region(&self, offset: TileOffset) -> Option<&BiomeRegionData> {
        self.regions.get(&offset)
    }

    /// All cached tiles.
    pub fn regions(&self) -> impl Iterator<Item = (&TileOffset, &BiomeRegionData)> {
        self.regions.iter()
    }

    /// Publishes an event to the sink, if any.
    fn publish(&mut self, event: RegionEvent) {
        if let Some(sink) = self.events.as_mut() {
            sink.publish(event);
        }
    }

    /// Makes sure the tile at `offset` exists and is triangulated. The flag reports
    /// whether anything was done.
    fn ensure_triangulated(
        &mut self,
        offset: TileOffset,
    ) -> Result<(&mut BiomeRegionData, bool), RegionError> {
        let params = self.params;
        let data = self
            .regions
            .entry(offset)
            .or_insert_with(|| BiomeRegionData::generate(&params, offset));
        if data.is_graph_generated() {
            return Ok((data, false));
        }
        data.generate_graph(self.builder.as_mut())
            .map_err(|source| RegionError::Build { offset, source })?;
        Ok((data, true))
    }

    /// Cached tile at `offset`, generating and triangulating it if needed. No merges
    /// are run.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::Build`] if triangulation fails.
    pub fn get_or_generate(&mut self, offset: TileOffset) -> Result<&BiomeRegionData, RegionError> {
        let (data, _) = self.ensure_triangulated(offset)?;
        Ok(&*data)
    }

    /// Generates the `(2 * radius + 1)²` block of tiles around `offset`, merges the
    /// centre tile with its neighbours and samples its elevations.
    ///
    /// Returns the offsets of every tile created or changed. A
    /// [`RegionEvent::RegionsUpdated`] is published when the set is not empty.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::Build`] if a tile cannot be triangulated.
    pub fn generate_region_area(
        &mut self,
        offset: TileOffset,
        radius: u32,
    ) -> Result<FastHashSet<TileOffset>, RegionError> {
        let mut updated = FastHashSet::default();
        let reach = i64::from(radius);
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let tile = offset.neighbour(dx, dy);
                if self.ensure_triangulated(tile)?.1 {
                    updated.insert(tile);
                }
            }
        }

        updated.extend(merge_region(offset, &mut self.regions, &self.params));

        if let Some(data) = self.regions.get_mut(&offset) {
            if !data.is_biome_data_generated() {
                data.generate_biome_data(self.elevation.as_ref());
                updated.insert(offset);
            }
        }

        if !updated.is_empty() {
            let mut offsets: Vec<TileOffset> = updated.iter().copied().collect();
            offsets.sort_unstable();
            tracing::debug!(%offset, radius, updated = offsets.len(), "region area generated");
            self.publish(RegionEvent::RegionsUpdated { offsets });
        }
        Ok(updated)
    }

    /// Fully prepared tile at `offset`: neighbourhood generated within the fetch
    /// radius, merged and with elevations.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::Build`] if a tile cannot be triangulated.
    pub fn region_at(&mut self, offset: TileOffset) -> Result<&BiomeRegionData, RegionError> {
        self.generate_region_area(offset, self.fetch_radius)?;
        self.get_or_generate(offset)
    }

    fn locate(&self, position: Point2) -> Result<(TileOffset, Point2), RegionError> {
        if !position.is_finite() {
            return Err(RegionError::NonFinitePosition { position });
        }
        let offset = self.params.to_region_coordinates(position);
        Ok((offset, self.params.inner_region_position(position, offset)))
    }

    /// Site nearest to a world position, searched within the containing tile.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] for non-finite positions or failed generation.
    pub fn find_nearest_biome_id(&mut self, position: Point2) -> Result<Option<SiteId>, RegionError> {
        let (offset, local) = self.locate(position)?;
        let data = self.get_or_generate(offset)?;
        Ok(data
            .find_nearest_point(local)
            .map(|nearest| SiteId { offset, id: nearest.id }))
    }

    /// Site nearest to a world position and its world position.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] for non-finite positions or failed generation.
    pub fn find_nearest_vertex(
        &mut self,
        position: Point2,
    ) -> Result<Option<(SiteId, Point2)>, RegionError> {
        let Some(site) = self.find_nearest_biome_id(position)? else {
            return Ok(None);
        };
        let params = self.params;
        Ok(self
            .region(site.offset)
            .and_then(|data| data.point(site.id))
            .map(|local| {
                let world = params.to_real_coordinates(site.offset) + local * params.biome_scale;
                (site, world)
            }))
    }

    /// Triangle of the merged triangulation enclosing a world position.
    ///
    /// The containing tile is prepared with [`Self::region_at`] first, so triangles
    /// crossing its boundary are available.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] for non-finite positions or failed generation.
    pub fn find_containing_triangle(
        &mut self,
        position: Point2,
    ) -> Result<Option<BiomeTriangle>, RegionError> {
        let (offset, local) = self.locate(position)?;
        let graph = self.region_at(offset)?.graph();
        let Some(face) = graph.containing_face(local).and_then(|key| graph.face(key)) else {
            return Ok(None);
        };
        let mut sites = [SiteId { offset, id: 0 }; 3];
        let mut points = [Point2::ORIGIN; 3];
        for (slot, &key) in face.vertices().iter().enumerate().take(3) {
            let Some(vertex) = graph.vertex(key) else {
                return Ok(None);
            };
            let owner = vertex.owner();
            sites[slot] = SiteId {
                offset: owner.offset,
                id: owner.id,
            };
            points[slot] = vertex.point();
        }
        Ok(barycentric(local, points[0], points[1], points[2]).map(|weights| BiomeTriangle {
            sites,
            points,
            weights,
        }))
    }

    /// Elevation at a world position, interpolated over the enclosing triangle.
    ///
    /// Sites of tiles whose elevations have not been sampled yet are read from the
    /// elevation field directly.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] for non-finite positions or failed generation.
    pub fn interpolate_elevation(&mut self, position: Point2) -> Result<Option<f64>, RegionError> {
        let Some(triangle) = self.find_containing_triangle(position)? else {
            return Ok(None);
        };
        let (frame, _) = self.locate(position)?;
        let mut values = [0.0; 3];
        for (slot, site) in triangle.sites.iter().enumerate() {
            values[slot] = self
                .region(site.offset)
                .and_then(|data| data.elevation(site.id))
                .unwrap_or_else(|| {
                    self.elevation
                        .elevation_at(frame.to_global(triangle.points[slot]))
                });
        }
        Ok(Some(triangle.interpolate(values)))
    }
}
