//! Planar graph store for one tile.
//!
//! [`DelaunayGraph`] owns the vertices and faces of exactly one tile. Vertices and
//! faces live in slot map arenas and refer to each other through [`VertexKey`] and
//! [`FaceKey`] handles; tile-local ids (`u64`, monotonically increasing, never
//! reused) provide the stable identity used across rebuilds and in edge sets.
//!
//! # Face rings
//!
//! The faces around a vertex form a cyclic, singly linked ring ordered
//! counter-clockwise: starting from the vertex's incident face and following the
//! CCW adjacency slot of each face (see [`Face`]) returns to the start after exactly
//! `face_count` steps. Every mutation keeps this *surrounded* property intact:
//!
//! - [`DelaunayGraph::add_face`] links the new face into each vertex's ring at the
//!   position found by angular comparison;
//! - [`DelaunayGraph::remove_face`] relinks the ring predecessor to the successor.
//!
//! Malformed rings are programming errors and trip `debug_assert!`s.
//!
//! # Ghost vertices
//!
//! Faces that cross a tile boundary reference *ghost* vertices: local copies of
//! vertices owned by a neighbouring tile, positioned in this tile's frame and
//! carrying a [`ForeignVertexRef`] to the owner. See
//! [`DelaunayGraph::add_ghost_vertex`].

use slotmap::{Key, new_key_type};
use std::f64::consts::TAU;
use thiserror::Error;

use crate::core::collections::{
    FaceIdMap, FaceRing, FaceVertexBuffer, FastHashSet, GhostVertexMap, SmallBuffer, StorageMap,
    VertexIdMap, fast_hash_set_with_capacity,
};
use crate::core::edge::Edge;
use crate::core::face::Face;
use crate::core::vertex::{ForeignVertexRef, Vertex};
use crate::geometry::algorithms::convex_hull::ConvexHull;
use crate::geometry::point::Point2;
use crate::geometry::predicates::{FLOAT_ERROR, Winding, angle_between, orientation, winding};
use crate::region::tile::{NeighboursMerged, TileOffset};

// =============================================================================
// KEYS
// =============================================================================

new_key_type! {
    /// Key type for accessing vertices in a tile graph.
    ///
    /// Keys are only meaningful for the graph that issued them.
    pub struct VertexKey;
}

new_key_type! {
    /// Key type for accessing faces in a tile graph.
    ///
    /// Keys are only meaningful for the graph that issued them.
    pub struct FaceKey;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by [`DelaunayGraph::add_vertex`].
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum GraphError {
    /// A vertex with this id is already stored in the tile.
    #[error("Vertex id {id} already exists in tile {offset}")]
    DuplicateVertexId {
        /// The rejected id.
        id: u64,
        /// Offset of the tile graph.
        offset: TileOffset,
    },
    /// The vertex position has a NaN or infinite coordinate.
    #[error("Vertex {id} has non-finite coordinates {point}")]
    NonFinitePoint {
        /// Id of the rejected vertex.
        id: u64,
        /// The offending position.
        point: Point2,
    },
}

// =============================================================================
// GRAPH
// =============================================================================

/// Vertices and faces of one tile, plus its hull and merge bookkeeping.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::prelude::*;
///
/// let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
/// let a = graph.add_vertex(Point2::new(0.1, 0.1), 0).unwrap();
/// let b = graph.add_vertex(Point2::new(0.9, 0.1), 1).unwrap();
/// let c = graph.add_vertex(Point2::new(0.5, 0.8), 2).unwrap();
///
/// // Counter-clockwise input is flipped into clockwise storage.
/// let face = graph.add_face(a, b, c).unwrap();
/// assert_eq!(graph.face(face).unwrap().vertices(), &[a, c, b]);
/// assert_eq!(graph.unique_edges().len(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct DelaunayGraph {
    offset: TileOffset,
    vertices: StorageMap<VertexKey, Vertex>,
    faces: StorageMap<FaceKey, Face>,
    vertex_ids: VertexIdMap,
    face_ids: FaceIdMap,
    ghosts: GhostVertexMap,
    next_vertex_id: u64,
    next_face_id: u64,
    hull: ConvexHull,
    neighbours_merged: NeighboursMerged,
}

impl DelaunayGraph {
    /// Creates an empty graph for the tile at `offset`.
    #[must_use]
    pub fn new(offset: TileOffset) -> Self {
        Self {
            offset,
            vertices: StorageMap::with_key(),
            faces: StorageMap::with_key(),
            vertex_ids: VertexIdMap::default(),
            face_ids: FaceIdMap::default(),
            ghosts: GhostVertexMap::default(),
            next_vertex_id: 0,
            next_face_id: 0,
            hull: ConvexHull::new(),
            neighbours_merged: NeighboursMerged::new(),
        }
    }

    /// Creates an empty graph with room for `vertices` vertices.
    #[must_use]
    pub fn with_capacity(offset: TileOffset, vertices: usize) -> Self {
        let mut graph = Self::new(offset);
        graph.vertices = StorageMap::with_capacity_and_key(vertices);
        // A planar triangulation has fewer than 2n faces.
        graph.faces = StorageMap::with_capacity_and_key(2 * vertices);
        graph
    }

    // =========================================================================
    // READ SURFACE
    // =========================================================================

    /// Offset of the tile this graph belongs to.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> TileOffset {
        self.offset
    }

    /// Number of stored vertices, ghosts included.
    #[inline]
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of stored faces, degenerate faces included.
    #[inline]
    #[must_use]
    pub fn number_of_faces(&self) -> usize {
        self.faces.len()
    }

    /// Id the next ghost vertex will receive.
    #[inline]
    #[must_use]
    pub const fn next_vertex_id(&self) -> u64 {
        self.next_vertex_id
    }

    /// Id the next face will receive.
    #[inline]
    #[must_use]
    pub const fn next_face_id(&self) -> u64 {
        self.next_face_id
    }

    /// All vertices with their keys.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex)> {
        self.vertices.iter()
    }

    /// All faces with their keys.
    pub fn faces(&self) -> impl Iterator<Item = (FaceKey, &Face)> {
        self.faces.iter()
    }

    /// Vertex stored under `key`.
    #[inline]
    #[must_use]
    pub fn vertex(&self, key: VertexKey) -> Option<&Vertex> {
        self.vertices.get(key)
    }

    /// Face stored under `key`.
    #[inline]
    #[must_use]
    pub fn face(&self, key: FaceKey) -> Option<&Face> {
        self.faces.get(key)
    }

    /// Key of the vertex with tile-local `id`.
    #[inline]
    #[must_use]
    pub fn vertex_key_by_id(&self, id: u64) -> Option<VertexKey> {
        self.vertex_ids.get(&id).copied()
    }

    /// Vertex with tile-local `id`.
    #[must_use]
    pub fn vertex_by_id(&self, id: u64) -> Option<&Vertex> {
        self.vertex_key_by_id(id).and_then(|key| self.vertices.get(key))
    }

    /// Key of the face with graph-local `id`.
    #[inline]
    #[must_use]
    pub fn face_key_by_id(&self, id: u64) -> Option<FaceKey> {
        self.face_ids.get(&id).copied()
    }

    /// Face with graph-local `id`.
    #[must_use]
    pub fn face_by_id(&self, id: u64) -> Option<&Face> {
        self.face_key_by_id(id).and_then(|key| self.faces.get(key))
    }

    /// Local ghost standing in for the vertex `(owner, id)` of another tile.
    #[must_use]
    pub fn ghost_of(&self, owner: TileOffset, id: u64) -> Option<VertexKey> {
        self.ghosts.get(&(owner, id)).copied()
    }

    /// Position of the vertex under `key`.
    #[inline]
    #[must_use]
    pub fn point(&self, key: VertexKey) -> Option<Point2> {
        self.vertices.get(key).map(Vertex::point)
    }

    /// Hull recorded by the builder for this tile.
    #[inline]
    #[must_use]
    pub const fn convex_hull(&self) -> &ConvexHull {
        &self.hull
    }

    pub(crate) fn set_convex_hull(&mut self, hull: ConvexHull) {
        self.hull = hull;
    }

    /// Which neighbour boundaries have been stitched into this graph.
    #[inline]
    #[must_use]
    pub const fn neighbours_merged(&self) -> &NeighboursMerged {
        &self.neighbours_merged
    }

    pub(crate) const fn neighbours_merged_mut(&mut self) -> &mut NeighboursMerged {
        &mut self.neighbours_merged
    }

    /// Faces around `vertex` in counter-clockwise order, starting at its incident face.
    #[must_use]
    pub fn faces_around(&self, vertex: VertexKey) -> FacesAround<'_> {
        let (next, remaining) = self
            .vertices
            .get(vertex)
            .map_or((None, 0), |v| (v.incident_face(), v.face_count()));
        FacesAround {
            graph: self,
            vertex,
            next,
            remaining,
        }
    }

    /// Next face counter-clockwise of `face` around `vertex`.
    #[must_use]
    pub fn adjacent_face_ccw(&self, face: FaceKey, vertex: VertexKey) -> Option<FaceKey> {
        self.faces.get(face)?.ccw_face_around(vertex)
    }

    /// Next face clockwise of `face` around `vertex`, i.e. its ring predecessor.
    #[must_use]
    pub fn adjacent_face_cw(&self, face: FaceKey, vertex: VertexKey) -> Option<FaceKey> {
        self.faces_around(vertex)
            .find(|&candidate| self.adjacent_face_ccw(candidate, vertex) == Some(face))
    }

    /// Distinct vertices sharing a face with `vertex`.
    #[must_use]
    pub fn neighbors(&self, vertex: VertexKey) -> SmallBuffer<VertexKey, 8> {
        let mut neighbors: SmallBuffer<VertexKey, 8> = SmallBuffer::new();
        for face_key in self.faces_around(vertex) {
            let Some(face) = self.faces.get(face_key) else {
                continue;
            };
            for &other in face.vertices() {
                if other != vertex && !neighbors.contains(&other) {
                    neighbors.push(other);
                }
            }
        }
        neighbors
    }

    /// Faces around `a` that also contain `b`.
    #[must_use]
    pub fn faces_with_edge(&self, a: VertexKey, b: VertexKey) -> FaceRing {
        self.faces_around(a)
            .filter(|&key| self.faces.get(key).is_some_and(|f| f.contains_vertex(b)))
            .collect()
    }

    /// Face containing both `v1` and `v2`.
    ///
    /// Walks the ring around `v1`. When several faces qualify (the two triangles of an
    /// interior edge), the one with the highest id, i.e. the most recently created,
    /// is returned.
    #[must_use]
    pub fn find_face(&self, v1: VertexKey, v2: VertexKey) -> Option<FaceKey> {
        self.faces_with_edge(v1, v2)
            .into_iter()
            .max_by_key(|&key| self.faces.get(key).map_or(0, Face::id))
    }

    /// Face built from exactly the given vertex set.
    #[must_use]
    pub fn find_face_with_vertices(&self, vertices: &[VertexKey]) -> Option<FaceKey> {
        let first = *vertices.first()?;
        self.faces_around(first)
            .find(|&key| self.faces.get(key).is_some_and(|f| f.has_vertex_set(vertices)))
    }

    /// Set of undirected edges derived from all faces.
    ///
    /// Degenerate faces contribute one edge, triangles three; shared edges collapse.
    #[must_use]
    pub fn unique_edges(&self) -> FastHashSet<Edge> {
        let mut edges = fast_hash_set_with_capacity(self.faces.len() * 2);
        for face in self.faces.values() {
            for (a, b) in face.edges() {
                if let (Some(va), Some(vb)) = (self.vertices.get(a), self.vertices.get(b)) {
                    edges.insert(Edge::new(va.id(), vb.id()));
                }
            }
        }
        edges
    }

    /// Triangle containing `point` (boundary inclusive), searched linearly.
    #[must_use]
    pub fn containing_face(&self, point: Point2) -> Option<FaceKey> {
        self.faces.iter().find_map(|(key, face)| {
            if face.is_degenerate() {
                return None;
            }
            let corners: SmallBuffer<Point2, 3> = face
                .vertices()
                .iter()
                .filter_map(|&v| self.point(v))
                .collect();
            if corners.len() != 3 {
                return None;
            }
            // Clockwise storage: the interior is right of every directed edge.
            let inside = (0..3).all(|i| {
                orientation(corners[i], corners[(i + 1) % 3], point) <= FLOAT_ERROR
            });
            inside.then_some(key)
        })
    }

    /// Returns `true` if the ring around `vertex` closes after exactly `face_count`
    /// distinct faces, each of which contains the vertex.
    #[must_use]
    pub fn is_surrounded(&self, vertex: VertexKey) -> bool {
        let Some(v) = self.vertices.get(vertex) else {
            return false;
        };
        let Some(start) = v.incident_face() else {
            return v.face_count() == 0;
        };
        let mut seen = fast_hash_set_with_capacity(v.face_count());
        let mut current = start;
        for _ in 0..v.face_count() {
            let Some(face) = self.faces.get(current) else {
                return false;
            };
            if !face.contains_vertex(vertex) || !seen.insert(current) {
                return false;
            }
            let Some(next) = face.ccw_face_around(vertex) else {
                return false;
            };
            current = next;
        }
        current == start
    }

    // =========================================================================
    // VERTICES
    // =========================================================================

    /// Inserts a vertex owned by this tile.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateVertexId`] if `id` is already in use and
    /// [`GraphError::NonFinitePoint`] for NaN or infinite coordinates. The graph is
    /// left unchanged in both cases.
    pub fn add_vertex(&mut self, point: Point2, id: u64) -> Result<VertexKey, GraphError> {
        if !point.is_finite() {
            return Err(GraphError::NonFinitePoint { id, point });
        }
        if self.vertex_ids.contains_key(&id) {
            return Err(GraphError::DuplicateVertexId {
                id,
                offset: self.offset,
            });
        }
        let key = self.vertices.insert(Vertex::new(point, id, self.offset));
        self.vertex_ids.insert(id, key);
        self.next_vertex_id = self.next_vertex_id.max(id.saturating_add(1));
        Ok(key)
    }

    /// Returns the local stand-in for `source`, a vertex of any tile graph.
    ///
    /// - If `source` is owned by this tile, the owned vertex is returned.
    /// - If a ghost of the same owner already exists, it is reused.
    /// - Otherwise a ghost is created with a fresh local id, the position shifted into
    ///   this tile's frame, and a back-reference to the owner.
    ///
    /// Ghosts of ghosts resolve to the original owner.
    pub fn add_ghost_vertex(&mut self, source: &Vertex) -> VertexKey {
        let owner = source.owner();
        if owner.offset == self.offset {
            let owned = self.vertex_ids.get(&owner.id).copied();
            debug_assert!(
                owned.is_some(),
                "vertex {} claims to be owned by tile {} but is not stored there",
                owner.id,
                self.offset
            );
            if let Some(key) = owned {
                return key;
            }
        }
        if let Some(&key) = self.ghosts.get(&(owner.offset, owner.id)) {
            return key;
        }

        let id = self.next_vertex_id;
        self.next_vertex_id += 1;
        let point = source.point_in_frame(self.offset);
        let key = self.vertices.insert(Vertex::new_ghost(
            point,
            id,
            self.offset,
            ForeignVertexRef {
                offset: owner.offset,
                id: owner.id,
            },
        ));
        self.vertex_ids.insert(id, key);
        self.ghosts.insert((owner.offset, owner.id), key);
        tracing::trace!(
            tile = %self.offset,
            owner = %owner.offset,
            owner_id = owner.id,
            local_id = id,
            "created ghost vertex"
        );
        key
    }

    // =========================================================================
    // FACES
    // =========================================================================

    /// Adds a degenerate two-vertex face for the boundary edge `v1 – v2`.
    ///
    /// Returns the existing degenerate face if there already is one, and `None` if the
    /// vertices are equal, unknown, or the edge already borders a triangle.
    pub fn add_edge_face(&mut self, v1: VertexKey, v2: VertexKey) -> Option<FaceKey> {
        if v1 == v2 || !self.vertices.contains_key(v1) || !self.vertices.contains_key(v2) {
            return None;
        }
        let existing = self.faces_with_edge(v1, v2);
        if let Some(&key) = existing.first() {
            return self
                .faces
                .get(key)
                .is_some_and(Face::is_degenerate)
                .then_some(key);
        }
        let vertices: FaceVertexBuffer = [v1, v2].into_iter().collect();
        Some(self.insert_face(vertices))
    }

    /// Adds the triangle `(v1, v2, v3)`.
    ///
    /// Counter-clockwise input is reordered into clockwise storage. Collinear input
    /// (within [`FLOAT_ERROR`]) creates nothing and returns `None`, which is a normal
    /// outcome rather than an error. Any degenerate face on one of the three vertex
    /// pairs is removed first, upgrading that boundary edge to an interior one. If
    /// the triangle already exists it is returned unchanged.
    pub fn add_face(&mut self, v1: VertexKey, v2: VertexKey, v3: VertexKey) -> Option<FaceKey> {
        if v1 == v2 || v2 == v3 || v1 == v3 {
            return None;
        }
        let (p1, p2, p3) = (self.point(v1)?, self.point(v2)?, self.point(v3)?);
        let (v2, v3) = match winding(p1, p2, p3) {
            Winding::ACUTE => (v2, v3),
            Winding::OBTUSE => (v3, v2),
            Winding::COLLINEAR => return None,
        };

        if let Some(existing) = self.find_face_with_vertices(&[v1, v2, v3]) {
            return Some(existing);
        }

        for (a, b) in [(v1, v2), (v2, v3), (v3, v1)] {
            let degenerate: FaceRing = self
                .faces_with_edge(a, b)
                .into_iter()
                .filter(|&key| self.faces.get(key).is_some_and(Face::is_degenerate))
                .collect();
            for key in degenerate {
                self.remove_face(key);
            }
        }

        let vertices: FaceVertexBuffer = [v1, v2, v3].into_iter().collect();
        Some(self.insert_face(vertices))
    }

    /// Detaches `face` from every vertex ring and deletes it.
    ///
    /// Returns `false` if the face is not stored in this graph.
    pub fn remove_face(&mut self, face_key: FaceKey) -> bool {
        let Some(face) = self.faces.get(face_key) else {
            return false;
        };
        let id = face.id();
        let links: SmallBuffer<(usize, VertexKey, FaceKey), 3> = face
            .vertices()
            .iter()
            .enumerate()
            .map(|(index, &vertex)| (index, vertex, face.ccw_face(index)))
            .collect();

        let ring_vertices: SmallBuffer<VertexKey, 3> =
            links.iter().map(|&(_, vertex, _)| vertex).collect();

        for (_, vertex, successor) in links {
            if successor == face_key {
                if let Some(v) = self.vertices.get_mut(vertex) {
                    v.detach_face(face_key, None);
                }
                continue;
            }
            let predecessor = self.adjacent_face_cw(face_key, vertex);
            debug_assert!(
                predecessor.is_some(),
                "face ring around vertex {vertex:?} does not lead back to face {id}"
            );
            if let Some(pred_key) = predecessor {
                self.relink(pred_key, vertex, successor);
            }
            if let Some(v) = self.vertices.get_mut(vertex) {
                v.detach_face(face_key, Some(successor));
            }
        }

        self.faces.remove(face_key);
        self.face_ids.remove(&id);
        debug_assert!(
            ring_vertices.iter().all(|&v| self.is_surrounded(v)),
            "face ring left open after removing face {id}"
        );
        true
    }

    /// Removes every face holding one of `edges`; returns the number of faces removed.
    pub fn remove_faces_with_edges(&mut self, edges: &[(VertexKey, VertexKey)]) -> usize {
        let mut doomed: Vec<FaceKey> = Vec::new();
        for &(a, b) in edges {
            for key in self.faces_with_edge(a, b) {
                if !doomed.contains(&key) {
                    doomed.push(key);
                }
            }
        }
        doomed
            .into_iter()
            .filter(|&key| self.remove_face(key))
            .count()
    }

    fn insert_face(&mut self, vertices: FaceVertexBuffer) -> FaceKey {
        let id = self.next_face_id;
        self.next_face_id += 1;
        let count = vertices.len();
        let key = self.faces.insert(Face::new(id, vertices, FaceKey::null()));
        self.face_ids.insert(id, key);
        for index in 0..count {
            self.link_into_ring(key, index);
        }
        debug_assert!(
            self.faces.get(key).is_some_and(|face| face
                .vertices()
                .iter()
                .all(|&v| self.is_surrounded(v))),
            "face ring left open after inserting face {id}"
        );
        key
    }

    /// Links `face` into the ring of its vertex at `index`.
    ///
    /// The successor is the ringed face whose wedge starts closest (rotating CCW) to
    /// where the new face's wedge ends; a face sharing that exact edge wins outright.
    /// The predecessor is the successor's current ring predecessor.
    fn link_into_ring(&mut self, face_key: FaceKey, index: usize) {
        let Some(face) = self.faces.get(face_key) else {
            return;
        };
        let vertex = face.vertices()[index];
        let end_vertex = face.cw_vertex(index);
        let (Some(origin), Some(end_point)) = (self.point(vertex), self.point(end_vertex)) else {
            return;
        };
        let end_direction = end_point - origin;

        let mut successor: Option<(FaceKey, f64)> = None;
        for candidate in self.faces_around(vertex) {
            let Some(other) = self.faces.get(candidate) else {
                continue;
            };
            let Some(other_index) = other.index_of(vertex) else {
                continue;
            };
            let start_vertex = other.ccw_vertex(other_index);
            if start_vertex == end_vertex {
                successor = Some((candidate, 0.0));
                break;
            }
            let Some(start_point) = self.point(start_vertex) else {
                continue;
            };
            let mut angle = angle_between(end_direction, start_point - origin);
            if angle >= TAU - f64::EPSILON {
                angle = 0.0;
            }
            if successor.is_none_or(|(_, best)| angle < best) {
                successor = Some((candidate, angle));
            }
        }

        match successor {
            None => {
                if let Some(face) = self.faces.get_mut(face_key) {
                    face.set_ccw_face(index, face_key);
                }
            }
            Some((succ_key, _)) => {
                let predecessor = self.adjacent_face_cw(succ_key, vertex);
                debug_assert!(
                    predecessor.is_some(),
                    "face ring around vertex {vertex:?} is open"
                );
                if let Some(face) = self.faces.get_mut(face_key) {
                    face.set_ccw_face(index, succ_key);
                }
                if let Some(pred_key) = predecessor {
                    self.relink(pred_key, vertex, face_key);
                }
            }
        }

        if let Some(v) = self.vertices.get_mut(vertex) {
            v.attach_face(face_key);
        }
    }

    /// Points the CCW slot of `face` around `vertex` at `next`.
    fn relink(&mut self, face: FaceKey, vertex: VertexKey, next: FaceKey) {
        if let Some(face) = self.faces.get_mut(face) {
            if let Some(index) = face.index_of(vertex) {
                face.set_ccw_face(index, next);
            }
        }
    }
}

// =============================================================================
// RING ITERATOR
// =============================================================================

/// Iterator over the faces around one vertex, counter-clockwise.
///
/// Created by [`DelaunayGraph::faces_around`]. Yields at most `face_count` faces.
#[derive(Clone, Debug)]
pub struct FacesAround<'a> {
    graph: &'a DelaunayGraph,
    vertex: VertexKey,
    next: Option<FaceKey>,
    remaining: usize,
}

impl Iterator for FacesAround<'_> {
    type Item = FaceKey;

    fn next(&mut self) -> Option<FaceKey> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self
            .graph
            .faces
            .get(current)
            .and_then(|face| face.ccw_face_around(self.vertex));
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(points: &[(f64, f64)]) -> (DelaunayGraph, Vec<VertexKey>) {
        let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
        let keys = points
            .iter()
            .zip(0_u64..)
            .map(|(&(x, y), id)| graph.add_vertex(Point2::new(x, y), id).unwrap())
            .collect();
        (graph, keys)
    }

    /// Square corners `0..4` around a centre vertex `4`, fanned into four triangles.
    fn square_fan() -> (DelaunayGraph, Vec<VertexKey>, Vec<FaceKey>) {
        let (mut graph, v) = graph_with(&[
            (0.1, 0.1),
            (0.9, 0.1),
            (0.9, 0.9),
            (0.1, 0.9),
            (0.5, 0.5),
        ]);
        let faces = (0..4)
            .map(|i| graph.add_face(v[4], v[i], v[(i + 1) % 4]).unwrap())
            .collect();
        (graph, v, faces)
    }

    // =========================================================================
    // VERTICES
    // =========================================================================

    #[test]
    fn test_add_vertex_rejects_duplicate_ids() {
        let (mut graph, _) = graph_with(&[(0.2, 0.2)]);
        let result = graph.add_vertex(Point2::new(0.7, 0.7), 0);
        assert_eq!(
            result,
            Err(GraphError::DuplicateVertexId {
                id: 0,
                offset: TileOffset::ORIGIN
            })
        );
        assert_eq!(graph.number_of_vertices(), 1);
        let kept = graph.vertex_key_by_id(0).unwrap();
        assert_eq!(graph.point(kept), Some(Point2::new(0.2, 0.2)));
    }

    #[test]
    fn test_add_vertex_rejects_non_finite_points() {
        let mut graph = DelaunayGraph::new(TileOffset::new(4, -1));
        for point in [
            Point2::new(f64::NAN, 0.5),
            Point2::new(0.5, f64::INFINITY),
            Point2::new(f64::NEG_INFINITY, 0.5),
        ] {
            assert!(matches!(
                graph.add_vertex(point, 9),
                Err(GraphError::NonFinitePoint { id: 9, .. })
            ));
        }
        assert_eq!(graph.number_of_vertices(), 0);
        assert!(graph.vertex_key_by_id(9).is_none());
        assert_eq!(graph.next_vertex_id(), 0);
    }

    #[test]
    fn test_add_vertex_advances_next_id() {
        let mut graph = DelaunayGraph::new(TileOffset::ORIGIN);
        graph.add_vertex(Point2::new(0.5, 0.5), 41).unwrap();
        assert_eq!(graph.next_vertex_id(), 42);
        graph.add_vertex(Point2::new(0.6, 0.5), 3).unwrap();
        assert_eq!(graph.next_vertex_id(), 42);
    }

    // =========================================================================
    // GHOSTS
    // =========================================================================

    #[test]
    fn test_ghost_vertex_is_shifted_and_reused() {
        let (owner, keys) = graph_with(&[(0.2, 0.5)]);
        let source = owner.vertex(keys[0]).unwrap().clone();

        let mut east = DelaunayGraph::new(TileOffset::new(1, 0));
        east.add_vertex(Point2::new(0.3, 0.3), 0).unwrap();
        let ghost = east.add_ghost_vertex(&source);
        let again = east.add_ghost_vertex(&source);
        assert_eq!(ghost, again);
        assert_eq!(east.number_of_vertices(), 2);
        assert_eq!(east.ghost_of(TileOffset::ORIGIN, 0), Some(ghost));

        let vertex = east.vertex(ghost).unwrap();
        assert!(vertex.is_foreign());
        // Fresh local id, not the owner's.
        assert_eq!(vertex.id(), 1);
        assert_eq!(vertex.point(), Point2::new(-0.8, 0.5));
        assert_eq!(
            vertex.owner(),
            ForeignVertexRef {
                offset: TileOffset::ORIGIN,
                id: 0
            }
        );
    }

    #[test]
    fn test_ghost_of_ghost_resolves_to_owner() {
        let (mut owner, keys) = graph_with(&[(0.2, 0.5)]);
        let source = owner.vertex(keys[0]).unwrap().clone();

        let mut east = DelaunayGraph::new(TileOffset::new(1, 0));
        let ghost = east.add_ghost_vertex(&source);
        let relayed = east.vertex(ghost).unwrap().clone();

        let mut far_east = DelaunayGraph::new(TileOffset::new(2, 0));
        let second = far_east.add_ghost_vertex(&relayed);
        let vertex = far_east.vertex(second).unwrap();
        assert_eq!(vertex.owner().offset, TileOffset::ORIGIN);
        assert_eq!(vertex.owner().id, 0);
        assert_eq!(vertex.point(), Point2::new(-1.8, 0.5));
        assert_eq!(far_east.ghost_of(TileOffset::ORIGIN, 0), Some(second));
        assert!(far_east.ghost_of(TileOffset::new(1, 0), 0).is_none());

        // Handing the relayed ghost back to the owner yields the owned vertex.
        assert_eq!(owner.add_ghost_vertex(&relayed), keys[0]);
        assert_eq!(owner.number_of_vertices(), 1);
    }

    // =========================================================================
    // FACES
    // =========================================================================

    #[test]
    fn test_add_face_rejects_collinear_input() {
        let (mut graph, v) = graph_with(&[(0.1, 0.5), (0.5, 0.5), (0.9, 0.5)]);
        assert!(graph.add_face(v[0], v[1], v[2]).is_none());
        assert!(graph.add_face(v[0], v[0], v[2]).is_none());
        assert_eq!(graph.number_of_faces(), 0);
        assert_eq!(graph.next_face_id(), 0);
    }

    #[test]
    fn test_add_face_replaces_degenerate_edge_faces() {
        let (mut graph, v) = graph_with(&[(0.1, 0.1), (0.9, 0.1), (0.5, 0.8)]);
        let ab = graph.add_edge_face(v[0], v[1]).unwrap();
        graph.add_edge_face(v[1], v[2]).unwrap();
        // Adding the same boundary edge again returns the existing face.
        assert_eq!(graph.add_edge_face(v[1], v[0]), Some(ab));
        assert_eq!(graph.number_of_faces(), 2);

        let triangle = graph.add_face(v[0], v[1], v[2]).unwrap();
        assert_eq!(graph.number_of_faces(), 1);
        assert!(!graph.face(triangle).unwrap().is_degenerate());
        assert!(graph.face(ab).is_none());
        for &vertex in &v {
            assert_eq!(graph.vertex(vertex).unwrap().face_count(), 1);
            assert!(graph.is_surrounded(vertex));
        }
        // The edge now borders a triangle, so no degenerate face may be added.
        assert!(graph.add_edge_face(v[0], v[1]).is_none());
        assert_eq!(graph.add_face(v[2], v[1], v[0]), Some(triangle));
    }

    #[test]
    fn test_faces_around_centre_are_counter_clockwise() {
        let (graph, v, faces) = square_fan();
        let ring: Vec<FaceKey> = graph.faces_around(v[4]).collect();
        assert_eq!(ring.len(), 4);
        let start = ring.iter().position(|&f| f == faces[0]).unwrap();
        for (step, &expected) in faces.iter().enumerate() {
            assert_eq!(ring[(start + step) % 4], expected);
        }
        assert_eq!(graph.neighbors(v[4]).len(), 4);
    }

    #[test]
    fn test_remove_face_repairs_ring() {
        let (mut graph, v, faces) = square_fan();
        assert!(graph.remove_face(faces[1]));
        assert!(!graph.remove_face(faces[1]));
        assert_eq!(graph.number_of_faces(), 3);

        let centre = graph.vertex(v[4]).unwrap();
        assert_eq!(centre.face_count(), 3);
        assert!(graph.is_surrounded(v[4]));
        let ring: Vec<FaceKey> = graph.faces_around(v[4]).collect();
        assert_eq!(ring.len(), 3);
        assert!(!ring.contains(&faces[1]));
        // The predecessor now skips straight to the successor.
        assert_eq!(graph.adjacent_face_ccw(faces[0], v[4]), Some(faces[2]));
        assert_eq!(graph.adjacent_face_cw(faces[2], v[4]), Some(faces[0]));

        // Corner 2 lost one of its two faces; corners 1 and 2 stay closed rings.
        assert_eq!(graph.vertex(v[2]).unwrap().face_count(), 1);
        assert!(graph.is_surrounded(v[1]));
        assert!(graph.is_surrounded(v[2]));
        assert!(graph.find_face_with_vertices(&[v[4], v[1], v[2]]).is_none());
    }

    #[test]
    fn test_remove_last_face_of_a_vertex_clears_incident_face() {
        let (mut graph, v) = graph_with(&[(0.1, 0.1), (0.9, 0.1), (0.5, 0.8)]);
        let face = graph.add_face(v[0], v[1], v[2]).unwrap();
        assert!(graph.remove_face(face));
        for &vertex in &v {
            let stored = graph.vertex(vertex).unwrap();
            assert_eq!(stored.face_count(), 0);
            assert!(stored.incident_face().is_none());
            assert!(graph.is_surrounded(vertex));
        }
        assert!(graph.face_by_id(0).is_none());
    }

    #[test]
    fn test_remove_faces_with_edges_counts_each_face_once() {
        let (mut graph, v, _) = square_fan();
        // Both spokes border the face (4, 0, 1).
        let removed = graph.remove_faces_with_edges(&[(v[4], v[0]), (v[4], v[1])]);
        assert_eq!(removed, 3);
        assert_eq!(graph.number_of_faces(), 1);
        assert!(graph.is_surrounded(v[4]));
    }

    #[test]
    fn test_find_face_prefers_newest_face() {
        let (mut graph, v) = graph_with(&[(0.5, 0.1), (0.5, 0.9), (0.1, 0.5), (0.9, 0.5)]);
        let west = graph.add_face(v[0], v[1], v[2]).unwrap();
        let east = graph.add_face(v[0], v[1], v[3]).unwrap();
        assert!(graph.face(east).unwrap().id() > graph.face(west).unwrap().id());

        assert_eq!(graph.find_face(v[0], v[1]), Some(east));
        assert_eq!(graph.find_face(v[1], v[0]), Some(east));
        assert_eq!(graph.find_face(v[0], v[2]), Some(west));
        assert!(graph.find_face(v[2], v[3]).is_none());
        assert_eq!(graph.faces_with_edge(v[0], v[1]).len(), 2);
    }

    #[test]
    fn test_unique_edges_and_containing_face() {
        let (graph, v, faces) = square_fan();
        assert_eq!(graph.unique_edges().len(), 8);
        assert!(graph.unique_edges().contains(&Edge::new(4, 0)));

        let inside = graph.containing_face(Point2::new(0.5, 0.2)).unwrap();
        assert_eq!(inside, faces[0]);
        assert!(graph.face(inside).unwrap().contains_vertex(v[4]));
        assert!(graph.containing_face(Point2::new(1.5, 0.5)).is_none());
    }
}
