//! Generation state of one tile.

use crate::core::collections::{FastHashMap, SmallBuffer};
use crate::core::delaunay_graph::DelaunayGraph;
use crate::core::traits::triangulation_builder::{BuildError, BuildInfo, TriangulationBuilder};
use crate::geometry::point::Point2;
use crate::region::config::BiomeGeneratorParameters;
use crate::region::elevation::ElevationField;
use crate::region::point_generation::scatter_points;
use crate::region::tile::TileOffset;

/// Cells searched around the query cell by [`BiomeRegionData::find_nearest_point`].
const NEAREST_SEARCH_RADIUS: i64 = 2;

/// One square of the biome grid and the sites that fell into it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BiomeCell {
    point_ids: SmallBuffer<u64, 4>,
}

impl BiomeCell {
    /// Ids of the sites in this cell.
    #[must_use]
    pub fn point_ids(&self) -> &[u64] {
        &self.point_ids
    }
}

/// Nearest site found by [`BiomeRegionData::find_nearest_point`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestPoint {
    /// Site id.
    pub id: u64,
    /// Biome cell holding the site.
    pub cell: (u32, u32),
    /// Squared distance from the query.
    pub distance_squared: f64,
}

/// Sites, triangulation and elevations of one tile.
#[derive(Clone, Debug)]
pub struct BiomeRegionData {
    offset: TileOffset,
    grid_cell_count: u32,
    cells: Vec<BiomeCell>,
    points: Vec<Point2>,
    graph: DelaunayGraph,
    elevations: FastHashMap<u64, f64>,
    is_graph_generated: bool,
    is_biome_data_generated: bool,
}

impl BiomeRegionData {
    /// An empty tile with a `grid_cell_count × grid_cell_count` biome grid.
    #[must_use]
    pub fn new(offset: TileOffset, grid_cell_count: u32) -> Self {
        let cells = (grid_cell_count as usize).pow(2);
        Self {
            offset,
            grid_cell_count,
            cells: vec![BiomeCell::default(); cells],
            points: Vec::new(),
            graph: DelaunayGraph::new(offset),
            elevations: FastHashMap::default(),
            is_graph_generated: false,
            is_biome_data_generated: false,
        }
    }

    /// A tile filled with the deterministic sites for `offset`.
    #[must_use]
    pub fn generate(params: &BiomeGeneratorParameters, offset: TileOffset) -> Self {
        let mut data = Self::new(offset, params.grid_cell_count);
        for site in scatter_points(params, offset) {
            data.add_point(site.cell_x, site.cell_y, site.point);
        }
        data
    }

    /// Offset of the tile.
    #[must_use]
    pub const fn offset(&self) -> TileOffset {
        self.offset
    }

    /// Number of biome cells along one edge.
    #[must_use]
    pub const fn grid_cell_count(&self) -> u32 {
        self.grid_cell_count
    }

    fn cell_index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.grid_cell_count && y < self.grid_cell_count)
            .then(|| y as usize * self.grid_cell_count as usize + x as usize)
    }

    /// Stores a site in cell `(x, y)` and returns its id, or `None` if the cell
    /// lies outside the grid.
    pub fn add_point(&mut self, x: u32, y: u32, point: Point2) -> Option<u64> {
        let index = self.cell_index(x, y)?;
        let id = self.points.len() as u64;
        self.points.push(point);
        self.cells[index].point_ids.push(id);
        Some(id)
    }

    /// Biome cell `(x, y)`.
    #[must_use]
    pub fn cell(&self, x: u32, y: u32) -> Option<&BiomeCell> {
        self.cells.get(self.cell_index(x, y)?)
    }

    /// Number of sites.
    #[must_use]
    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    /// Tile-local position of a site.
    #[must_use]
    pub fn point(&self, id: u64) -> Option<Point2> {
        usize::try_from(id).ok().and_then(|i| self.points.get(i).copied())
    }

    /// All sites as `(position, id)` pairs, in id order.
    #[must_use]
    pub fn sites(&self) -> Vec<(Point2, u64)> {
        self.points
            .iter()
            .enumerate()
            .map(|(id, &point)| (point, id as u64))
            .collect()
    }

    /// The tile's triangulation.
    #[must_use]
    pub const fn graph(&self) -> &DelaunayGraph {
        &self.graph
    }

    pub(crate) const fn graph_mut(&mut self) -> &mut DelaunayGraph {
        &mut self.graph
    }

    /// Whether the sites have been triangulated.
    #[must_use]
    pub const fn is_graph_generated(&self) -> bool {
        self.is_graph_generated
    }

    /// Whether elevations have been sampled.
    #[must_use]
    pub const fn is_biome_data_generated(&self) -> bool {
        self.is_biome_data_generated
    }

    /// Whether all eight neighbour boundaries have been merged.
    #[must_use]
    pub fn is_merged_with_all(&self) -> bool {
        self.graph.neighbours_merged().is_merged_with_all()
    }

    /// Triangulates the sites. Does nothing once the graph exists.
    ///
    /// # Errors
    ///
    /// Propagates the builder's [`BuildError`].
    pub fn generate_graph<B>(&mut self, builder: &mut B) -> Result<BuildInfo, BuildError>
    where
        B: TriangulationBuilder + ?Sized,
    {
        if self.is_graph_generated {
            return Ok(BuildInfo::default());
        }
        let sites = self.sites();
        let info = builder.build_into(&mut self.graph, &sites)?;
        self.is_graph_generated = true;
        Ok(info)
    }

    /// Samples the elevation of every owned site. Does nothing once sampled.
    pub fn generate_biome_data<E>(&mut self, field: &E)
    where
        E: ElevationField + ?Sized,
    {
        if self.is_biome_data_generated {
            return;
        }
        for (id, &point) in self.points.iter().enumerate() {
            let global = self.offset.to_global(point);
            self.elevations.insert(id as u64, field.elevation_at(global));
        }
        self.is_biome_data_generated = true;
    }

    /// Elevation of a site, once sampled.
    #[must_use]
    pub fn elevation(&self, id: u64) -> Option<f64> {
        self.elevations.get(&id).copied()
    }

    /// Site closest to a tile-local point, searching the cells within two rings of
    /// the point's cell.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn find_nearest_point(&self, local: Point2) -> Option<NearestPoint> {
        if self.grid_cell_count == 0 || !local.is_finite() {
            return None;
        }
        let count = f64::from(self.grid_cell_count);
        let last = i64::from(self.grid_cell_count) - 1;
        let cx = (local.x * count).floor().clamp(0.0, count - 1.0) as i64;
        let cy = (local.y * count).floor().clamp(0.0, count - 1.0) as i64;

        let mut best: Option<NearestPoint> = None;
        for y in (cy - NEAREST_SEARCH_RADIUS).max(0)..=(cy + NEAREST_SEARCH_RADIUS).min(last) {
            for x in (cx - NEAREST_SEARCH_RADIUS).max(0)..=(cx + NEAREST_SEARCH_RADIUS).min(last) {
                let Some(cell) = self.cell(x as u32, y as u32) else {
                    continue;
                };
                for &id in cell.point_ids() {
                    let Some(point) = self.point(id) else {
                        continue;
                    };
                    let distance_squared = point.distance_squared(local);
                    if best.is_none_or(|b| distance_squared < b.distance_squared) {
                        best = Some(NearestPoint {
                            id,
                            cell: (x as u32, y as u32),
                            distance_squared,
                        });
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algorithms::divide_and_conquer::DivideAndConquerBuilder;
    use crate::region::config::BiomeGeneratorParametersBuilder;

    fn params() -> BiomeGeneratorParameters {
        BiomeGeneratorParametersBuilder::default()
            .grid_cell_count(4)
            .buffer_size(1)
            .seed(3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_generate_fills_every_cell() {
        let data = BiomeRegionData::generate(&params(), TileOffset::new(1, 1));
        assert_eq!(data.number_of_points(), 16);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(data.cell(x, y).unwrap().point_ids().len(), 1);
            }
        }
        assert!(data.cell(4, 0).is_none());
        assert!(!data.is_graph_generated());
    }

    #[test]
    fn test_graph_and_elevation_generated_once() {
        let mut data = BiomeRegionData::generate(&params(), TileOffset::ORIGIN);
        let mut builder = DivideAndConquerBuilder::new();
        let info = data.generate_graph(&mut builder).unwrap();
        assert_eq!(info.sites, 16);
        assert!(data.is_graph_generated());
        assert_eq!(data.graph().number_of_vertices(), 16);
        assert_eq!(data.generate_graph(&mut builder).unwrap(), BuildInfo::default());

        data.generate_biome_data(&|p: Point2| p.x);
        assert!(data.is_biome_data_generated());
        let point = data.point(5).unwrap();
        assert_eq!(data.elevation(5), Some(point.x));
        data.generate_biome_data(&|_: Point2| -1.0);
        assert_eq!(data.elevation(5), Some(point.x));
    }

    #[test]
    fn test_find_nearest_point() {
        let mut data = BiomeRegionData::new(TileOffset::ORIGIN, 4);
        let a = data.add_point(0, 0, Point2::new(0.1, 0.1)).unwrap();
        let b = data.add_point(3, 3, Point2::new(0.9, 0.9)).unwrap();
        assert_eq!(data.add_point(9, 0, Point2::new(0.1, 0.1)), None);

        let near_a = data.find_nearest_point(Point2::new(0.2, 0.15)).unwrap();
        assert_eq!(near_a.id, a);
        assert_eq!(near_a.cell, (0, 0));
        let near_b = data.find_nearest_point(Point2::new(0.8, 0.95)).unwrap();
        assert_eq!(near_b.id, b);
        assert!(BiomeRegionData::new(TileOffset::ORIGIN, 4)
            .find_nearest_point(Point2::new(0.5, 0.5))
            .is_none());
    }
}
