//! Common trait for tile triangulation builders.
//!
//! A builder turns an unordered set of `(point, id)` sites into the faces and hull
//! of a [`DelaunayGraph`]. The region loader only talks to this trait, so other
//! construction strategies can be swapped in without touching the merge protocol.

use thiserror::Error;

use crate::core::algorithms::merge_sweep::SweepError;
use crate::core::delaunay_graph::{DelaunayGraph, GraphError};
use crate::geometry::point::Point2;
use crate::region::tile::TileOffset;

/// Errors that can occur while triangulating a tile.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum BuildError {
    /// A site could not be inserted as a vertex.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A merge sweep between two sub-triangulations did not terminate.
    #[error(transparent)]
    Sweep(#[from] SweepError),
    /// Two sites share (numerically) the same position.
    #[error("Sites {first} and {second} coincide at {point}")]
    DuplicatePoint {
        /// Id of the first site.
        first: u64,
        /// Id of the second site.
        second: u64,
        /// The shared position.
        point: Point2,
    },
    /// The target graph already holds vertices.
    #[error("Cannot triangulate into tile {offset}: graph already has {vertices} vertices")]
    GraphNotEmpty {
        /// Offset of the target graph.
        offset: TileOffset,
        /// Number of vertices already stored.
        vertices: usize,
    },
}

/// Statistics about one triangulation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildInfo {
    /// Number of sites triangulated.
    pub sites: usize,
    /// Number of recursive merge steps.
    pub merges: usize,
    /// Number of cross triangles created by merge sweeps.
    pub triangles_created: usize,
    /// Number of edges deleted by merge sweeps.
    pub edges_deleted: usize,
}

/// Trait for algorithms that triangulate one tile.
pub trait TriangulationBuilder {
    /// Triangulates `sites` into the empty `graph` and records its convex hull.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the graph is not empty, a site has a non-finite
    /// position or duplicate id, two sites coincide, or a merge sweep does not
    /// terminate. The graph is left as it was handed in.
    fn build_into(
        &mut self,
        graph: &mut DelaunayGraph,
        sites: &[(Point2, u64)],
    ) -> Result<BuildInfo, BuildError>;

    /// Triangulates `sites` into a fresh graph for the tile at `offset`.
    ///
    /// # Errors
    ///
    /// See [`Self::build_into`].
    fn build_tile(
        &mut self,
        offset: TileOffset,
        sites: &[(Point2, u64)],
    ) -> Result<DelaunayGraph, BuildError> {
        let mut graph = DelaunayGraph::with_capacity(offset, sites.len());
        self.build_into(&mut graph, sites)?;
        Ok(graph)
    }
}
