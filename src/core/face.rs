//! Faces of a tile graph.
//!
//! A [`Face`] is either a triangle whose vertices are stored in clockwise order, or a
//! degenerate two-vertex face standing in for a boundary edge without interior.
//!
//! # Adjacency layout
//!
//! Alongside its vertices every face stores, for each vertex `i`, the next face met
//! when rotating counter-clockwise around that vertex. The slot holding that link is
//! [`Face::ccw_index`]`(i)`, so for a triangle `adjacent[(i + 2) % 3]` is the CCW
//! neighbour around `vertices[i]`; for a degenerate face it is `adjacent[(i + 1) % 2]`.
//!
//! Around `vertices[i]` the face covers the angular wedge that starts at the
//! direction of `vertices[ccw_index(i)]` and ends (rotating CCW) at the direction of
//! `vertices[cw_index(i)]`. A degenerate face covers a zero-width wedge.

use crate::core::collections::{FaceAdjacencyBuffer, FaceVertexBuffer};
use crate::core::delaunay_graph::{FaceKey, VertexKey};

/// A triangle (3 vertices, clockwise) or degenerate edge face (2 vertices).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Face {
    id: u64,
    vertices: FaceVertexBuffer,
    adjacent: FaceAdjacencyBuffer,
}

impl Face {
    pub(crate) fn new(id: u64, vertices: FaceVertexBuffer, placeholder: FaceKey) -> Self {
        debug_assert!(
            matches!(vertices.len(), 2 | 3),
            "faces hold 2 or 3 vertices, got {}",
            vertices.len()
        );
        let adjacent = vertices.iter().map(|_| placeholder).collect();
        Self {
            id,
            vertices,
            adjacent,
        }
    }

    /// Graph-local face id. Ids increase monotonically and are never reused.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Vertices in clockwise order.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[VertexKey] {
        &self.vertices
    }

    /// Adjacent faces, parallel to [`Self::vertices`]; see the module docs for the layout.
    #[inline]
    #[must_use]
    pub fn adjacent_faces(&self) -> &[FaceKey] {
        &self.adjacent
    }

    /// Number of vertices (2 or 3).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always `false`; faces hold at least two vertices.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` for a two-vertex boundary placeholder.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() == 2
    }

    /// Index of the vertex clockwise of `index`.
    #[inline]
    #[must_use]
    pub fn cw_index(&self, index: usize) -> usize {
        (index + 1) % self.vertices.len()
    }

    /// Index of the vertex counter-clockwise of `index`.
    #[inline]
    #[must_use]
    pub fn ccw_index(&self, index: usize) -> usize {
        let n = self.vertices.len();
        (index + n - 1) % n
    }

    /// Position of `vertex` in this face.
    #[must_use]
    pub fn index_of(&self, vertex: VertexKey) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    /// Returns `true` if `vertex` belongs to this face.
    #[inline]
    #[must_use]
    pub fn contains_vertex(&self, vertex: VertexKey) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Returns `true` if both endpoints of an edge belong to this face.
    #[inline]
    #[must_use]
    pub fn contains_edge(&self, a: VertexKey, b: VertexKey) -> bool {
        self.contains_vertex(a) && self.contains_vertex(b)
    }

    /// Returns `true` if this face is built from exactly the given vertex set.
    #[must_use]
    pub fn has_vertex_set(&self, vertices: &[VertexKey]) -> bool {
        self.vertices.len() == vertices.len() && vertices.iter().all(|&v| self.contains_vertex(v))
    }

    /// Vertex whose direction ends this face's wedge around `vertices[index]`.
    #[inline]
    #[must_use]
    pub fn cw_vertex(&self, index: usize) -> VertexKey {
        self.vertices[self.cw_index(index)]
    }

    /// Vertex whose direction starts this face's wedge around `vertices[index]`.
    #[inline]
    #[must_use]
    pub fn ccw_vertex(&self, index: usize) -> VertexKey {
        self.vertices[self.ccw_index(index)]
    }

    /// Next face counter-clockwise around `vertices[index]`.
    #[inline]
    #[must_use]
    pub fn ccw_face(&self, index: usize) -> FaceKey {
        self.adjacent[self.ccw_index(index)]
    }

    /// Next face counter-clockwise around `vertex`, or `None` if the vertex is not in this face.
    #[must_use]
    pub fn ccw_face_around(&self, vertex: VertexKey) -> Option<FaceKey> {
        self.index_of(vertex).map(|index| self.ccw_face(index))
    }

    pub(crate) fn set_ccw_face(&mut self, index: usize, face: FaceKey) {
        let slot = self.ccw_index(index);
        self.adjacent[slot] = face;
    }

    /// The edges of this face as vertex pairs (1 for a degenerate face, 3 for a triangle).
    #[must_use]
    pub fn edges(&self) -> impl Iterator<Item = (VertexKey, VertexKey)> + '_ {
        let n = if self.is_degenerate() { 1 } else { 3 };
        (0..n).map(move |i| (self.vertices[i], self.vertices[self.cw_index(i)]))
    }
}
