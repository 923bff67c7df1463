//! # tiled-delaunay
//!
//! Delaunay triangulation of an unbounded plane, built one square tile at a time.
//!
//! Every tile of the plane owns a deterministic scatter of sites (a few per biome
//! cell) and triangulates them on its own with a divide-and-conquer builder. Tiles
//! are then stitched to their eight neighbours: edge merges run the same sweep used
//! inside the builder across the shared boundary, and corner merges fill the
//! quadrilateral left where four tiles meet. Triangles that cross a boundary are
//! stored in every tile involved, with *ghost* vertices pointing back at the owning
//! tile.
//!
//! # Features
//!
//! - Divide-and-conquer Delaunay construction with tolerance-based predicates
//! - Face/vertex graph with clockwise face rings and ghost vertices
//! - Deterministic per-tile site generation from a plane seed
//! - Edge and corner merges between neighbouring tiles, idempotent per direction
//! - Region cache with neighbourhood generation, elevation sampling and barycentric
//!   queries
//! - Serialization of parameters, offsets and events with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! Triangulating a single tile:
//!
//! ```rust
//! use tiled_delaunay::prelude::*;
//!
//! let sites = vec![
//!     (Point2::new(0.1, 0.1), 0),
//!     (Point2::new(0.9, 0.2), 1),
//!     (Point2::new(0.5, 0.9), 2),
//!     (Point2::new(0.5, 0.4), 3),
//! ];
//!
//! let mut builder = DivideAndConquerBuilder::new();
//! let graph = builder.build_tile(TileOffset::ORIGIN, &sites).unwrap();
//!
//! assert_eq!(graph.number_of_vertices(), 4);
//! assert_eq!(graph.number_of_faces(), 3);
//! assert_eq!(graph.convex_hull().len(), 3);
//! assert!(validate_graph(&graph).is_ok());
//! ```
//!
//! Generating a merged neighbourhood through the loader:
//!
//! ```rust
//! use tiled_delaunay::prelude::*;
//!
//! let params = BiomeGeneratorParametersBuilder::default()
//!     .grid_cell_count(4)
//!     .buffer_size(1)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! let mut loader = BiomeRegionLoader::new(params).unwrap();
//!
//! let updated = loader.generate_region_area(TileOffset::new(3, -2), 1).unwrap();
//! assert_eq!(updated.len(), 9);
//! assert!(loader.region(TileOffset::new(3, -2)).unwrap().is_merged_with_all());
//! ```
//!
//! # Graph Invariants
//!
//! Every [`DelaunayGraph`](core::delaunay_graph::DelaunayGraph) keeps these
//! properties, checked by [`validate_graph`](core::util::graph_validation::validate_graph):
//!
//! - **Winding** – faces store their corners clockwise.
//! - **Adjacency** – `adjacent_faces[i]` is the next face counter-clockwise around
//!   corner `i`, and following those links closes the ring around each vertex.
//! - **Hull** – the convex hull is a closed clockwise polygon over graph vertices.
//! - **Delaunay** – no site lies strictly inside the circumcircle of a face built
//!   by the divide-and-conquer builder
//!   ([`find_delaunay_violations`](core::util::graph_validation::find_delaunay_violations)).
//!
//! Merges add faces across tile boundaries without repairing the Delaunay property
//! of the faces they overlap; interior faces of a tile are never modified by a merge.

#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// Tile graph storage and the algorithms that build it.
pub mod core {
    /// Triangulation algorithms.
    pub mod algorithms {
        /// Recursive divide-and-conquer construction
        pub mod divide_and_conquer;
        /// Bottom-up sweep joining two triangulated point sets
        pub mod merge_sweep;
    }
    /// Hash maps, inline buffers and slot map storage
    pub mod collections;
    pub mod delaunay_graph;
    pub mod edge;
    pub mod face;
    pub mod util;
    pub mod vertex;
    /// Traits for tile triangulation.
    pub mod traits {
        pub mod triangulation_builder;
        pub use triangulation_builder::*;
    }
    // Re-export the `core` modules.
    pub use delaunay_graph::*;
    pub use edge::*;
    pub use face::*;
    pub use traits::*;
    pub use util::*;
    pub use vertex::*;
    // Note: collections module not re-exported here to avoid namespace pollution
    // Import specific types via prelude or use crate::core::collections::
}

/// Planar points, tolerance-based predicates and convex hulls.
pub mod geometry {
    /// Geometric algorithms on point sets
    pub mod algorithms {
        /// Clockwise convex hull polygons
        pub mod convex_hull;
        pub use convex_hull::*;
    }
    pub mod point;
    pub mod predicates;
    pub use point::*;
    pub use predicates::*;
}

/// Tiles of the biome plane: parameters, site generation, merging and caching.
pub mod region {
    /// Generator parameters and world/tile coordinate mapping
    pub mod config;
    pub mod elevation;
    pub mod loader;
    /// Cross-tile edge and corner merges
    pub mod merge;
    pub mod point_generation;
    pub mod region_data;
    pub mod tile;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        algorithms::{divide_and_conquer::DivideAndConquerBuilder, merge_sweep::SweepError},
        delaunay_graph::{DelaunayGraph, FaceKey, GraphError, VertexKey},
        edge::Edge,
        face::Face,
        traits::triangulation_builder::{BuildError, BuildInfo, TriangulationBuilder},
        util::graph_validation::*,
        vertex::{ForeignVertexRef, Vertex},
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    // Re-export from geometry
    pub use crate::geometry::{algorithms::ConvexHull, point::*, predicates::*};

    // Re-export from region
    pub use crate::region::{
        config::{BiomeGeneratorParameters, BiomeGeneratorParametersBuilder, ParametersError},
        elevation::{ElevationField, FractalElevation},
        loader::{
            BiomeRegionLoader, BiomeTriangle, RegionError, RegionEvent, RegionEventLog,
            RegionEventSink, SiteId,
        },
        merge::{
            CornerDiagonal, MergeError, MergeInfo, choose_corner_diagonal, merge_region,
            merge_region_corner, merge_region_edge,
        },
        region_data::{BiomeCell, BiomeRegionData, NearestPoint},
        tile::{CARDINAL_DIRECTIONS, DIAGONAL_DIRECTIONS, NeighboursMerged, TileCorner, TileOffset},
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{
        core::{delaunay_graph::DelaunayGraph, face::Face, vertex::Vertex},
        geometry::{algorithms::ConvexHull, point::Point2},
        is_normal,
        region::{
            config::BiomeGeneratorParameters, loader::RegionEvent, region_data::BiomeRegionData,
            tile::TileOffset,
        },
    };

    // =============================================================================
    // TYPE SAFETY TESTS
    // =============================================================================

    #[test]
    fn normal_types() {
        assert!(is_normal::<Point2>());
        assert!(is_normal::<TileOffset>());
        assert!(is_normal::<Vertex>());
        assert!(is_normal::<Face>());
        assert!(is_normal::<ConvexHull>());
        assert!(is_normal::<DelaunayGraph>());
        assert!(is_normal::<BiomeRegionData>());
        assert!(is_normal::<BiomeGeneratorParameters>());
        assert!(is_normal::<RegionEvent>());
    }
}
