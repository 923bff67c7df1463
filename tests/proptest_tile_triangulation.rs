//! Property-based tests for single-tile triangulation.
//!
//! - Empty circumcircle condition for every face
//! - Structural validity (ring adjacency, clockwise winding, closed hull)
//! - Input-order independence of the edge set
//! - Interior vertices are fully surrounded

use proptest::prelude::*;
use tiled_delaunay::prelude::*;

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

/// Sites jittered inside the cells of an `n × n` grid, like generated tiles.
fn jittered_grid() -> impl Strategy<Value = Vec<(Point2, u64)>> {
    (2_usize..=6).prop_flat_map(|n| {
        prop::collection::vec((0.1_f64..0.9, 0.1_f64..0.9), n * n).prop_map(move |jitter| {
            #[allow(clippy::cast_precision_loss)]
            let size = 1.0 / n as f64;
            jitter
                .into_iter()
                .enumerate()
                .map(|(i, (jx, jy))| {
                    #[allow(clippy::cast_precision_loss)]
                    let (cx, cy) = ((i % n) as f64, (i / n) as f64);
                    (
                        Point2::new((cx + jx) * size, (cy + jy) * size),
                        i as u64,
                    )
                })
                .collect()
        })
    })
}

fn build(sites: &[(Point2, u64)]) -> DelaunayGraph {
    DivideAndConquerBuilder::new()
        .build_tile(TileOffset::ORIGIN, sites)
        .unwrap()
}

fn id_edges(graph: &DelaunayGraph) -> Vec<Edge> {
    let mut edges: Vec<Edge> = graph.unique_edges().into_iter().collect();
    edges.sort_unstable();
    edges
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    /// Property: no site lies strictly inside the circumcircle of any face.
    #[test]
    fn prop_empty_circumcircle(sites in jittered_grid()) {
        let graph = build(&sites);
        prop_assert_eq!(graph.number_of_vertices(), sites.len());
        prop_assert!(find_delaunay_violations(&graph).is_empty());
    }

    /// Property: face rings, winding and hull are consistent after construction.
    #[test]
    fn prop_structurally_valid(sites in jittered_grid()) {
        let graph = build(&sites);
        prop_assert!(validate_graph(&graph).is_ok());
        prop_assert!(graph.number_of_faces() > 0);
        prop_assert!(graph.convex_hull().len() >= 3);
    }

    /// Property: shuffling the input does not change the triangulation.
    #[test]
    fn prop_input_order_independent(
        sites in jittered_grid(),
        rotation in 0_usize..64,
    ) {
        let mut shuffled = sites.clone();
        shuffled.reverse();
        let len = shuffled.len();
        shuffled.rotate_left(rotation % len);
        prop_assert_eq!(id_edges(&build(&sites)), id_edges(&build(&shuffled)));
    }

    /// Property: every vertex well inside the hull closes its face ring.
    #[test]
    fn prop_interior_vertices_surrounded(sites in jittered_grid()) {
        let graph = build(&sites);
        let hull = graph.convex_hull().points();
        for (key, vertex) in graph.vertices() {
            // Clockwise hull: the interior is right of every edge.
            let inside = (0..hull.len()).all(|i| {
                orientation(hull[i], hull[(i + 1) % hull.len()], vertex.point()) < -1e-2
            });
            if inside {
                prop_assert!(graph.is_surrounded(key), "vertex {key:?} is not surrounded");
            }
        }
    }
}

// =============================================================================
// FIXED CASES
// =============================================================================

#[test]
fn rejects_coincident_sites() {
    let sites = [
        (Point2::new(0.2, 0.2), 0),
        (Point2::new(0.7, 0.3), 1),
        (Point2::new(0.2, 0.2), 2),
    ];
    let result = DivideAndConquerBuilder::new().build_tile(TileOffset::ORIGIN, &sites);
    assert!(matches!(result, Err(BuildError::DuplicatePoint { .. })));
}

#[test]
fn build_statistics_are_recorded() {
    let sites: Vec<(Point2, u64)> = (0..16)
        .map(|i| {
            let (x, y) = (f64::from(i % 4), f64::from(i / 4));
            (
                Point2::new(0.1 + 0.2 * x + 0.01 * y, 0.1 + 0.2 * y + 0.013 * x),
                u64::try_from(i).unwrap(),
            )
        })
        .collect();
    let mut builder = DivideAndConquerBuilder::new();
    let graph = builder.build_tile(TileOffset::new(-2, 7), &sites).unwrap();
    let info = builder.last_build();
    assert_eq!(info.sites, 16);
    assert!(info.merges > 0);
    assert!(info.triangles_created > 0);
    assert_eq!(graph.offset(), TileOffset::new(-2, 7));
    assert!(find_delaunay_violations(&graph).is_empty());
}
