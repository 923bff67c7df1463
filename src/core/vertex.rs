//! Vertices of a tile graph.
//!
//! A [`Vertex`] is identified by the pair `(graph_offset, id)`: the tile that stores
//! it and a tile-local id. Ghost vertices are local copies of vertices owned by a
//! neighbouring tile and carry a [`ForeignVertexRef`] back to their owner.

use serde::{Deserialize, Serialize};

use crate::core::delaunay_graph::FaceKey;
use crate::geometry::point::Point2;
use crate::region::tile::TileOffset;

/// Back-reference from a ghost vertex to the vertex that owns the position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignVertexRef {
    /// Tile that owns the original vertex.
    pub offset: TileOffset,
    /// Id of the original vertex inside its owning tile.
    pub id: u64,
}

/// A vertex stored in a [`DelaunayGraph`](crate::core::delaunay_graph::DelaunayGraph).
///
/// The position is expressed in the local frame of `graph_offset` and never changes
/// once the vertex exists. `face_count` and `incident_face` are maintained by the
/// graph as faces are linked into and out of the vertex's face ring.
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    point: Point2,
    id: u64,
    graph_offset: TileOffset,
    face_count: usize,
    incident_face: Option<FaceKey>,
    foreign: Option<ForeignVertexRef>,
}

impl Vertex {
    pub(crate) const fn new(point: Point2, id: u64, graph_offset: TileOffset) -> Self {
        Self {
            point,
            id,
            graph_offset,
            face_count: 0,
            incident_face: None,
            foreign: None,
        }
    }

    pub(crate) const fn new_ghost(
        point: Point2,
        id: u64,
        graph_offset: TileOffset,
        owner: ForeignVertexRef,
    ) -> Self {
        Self {
            point,
            id,
            graph_offset,
            face_count: 0,
            incident_face: None,
            foreign: Some(owner),
        }
    }

    /// Position in the local frame of [`Self::graph_offset`].
    #[inline]
    #[must_use]
    pub const fn point(&self) -> Point2 {
        self.point
    }

    /// Tile-local id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Offset of the tile whose graph stores this vertex.
    #[inline]
    #[must_use]
    pub const fn graph_offset(&self) -> TileOffset {
        self.graph_offset
    }

    /// Number of faces ringed around this vertex.
    #[inline]
    #[must_use]
    pub const fn face_count(&self) -> usize {
        self.face_count
    }

    /// One face of the ring, or `None` for an isolated vertex.
    #[inline]
    #[must_use]
    pub const fn incident_face(&self) -> Option<FaceKey> {
        self.incident_face
    }

    /// Owner of the position when this vertex is a ghost.
    #[inline]
    #[must_use]
    pub const fn foreign(&self) -> Option<ForeignVertexRef> {
        self.foreign
    }

    /// Returns `true` for ghost copies of vertices owned by another tile.
    #[inline]
    #[must_use]
    pub const fn is_foreign(&self) -> bool {
        self.foreign.is_some()
    }

    /// The vertex that owns this position: the foreign owner for ghosts, itself otherwise.
    #[must_use]
    pub fn owner(&self) -> ForeignVertexRef {
        self.foreign.unwrap_or(ForeignVertexRef {
            offset: self.graph_offset,
            id: self.id,
        })
    }

    /// Position translated into the frame of the tile at `frame`.
    #[must_use]
    pub fn point_in_frame(&self, frame: TileOffset) -> Point2 {
        self.point + self.graph_offset.delta_to(frame)
    }

    pub(crate) fn attach_face(&mut self, face: FaceKey) {
        if self.incident_face.is_none() {
            self.incident_face = Some(face);
        }
        self.face_count += 1;
    }

    /// Unlinks `face`; `ccw_next` is the ring successor that takes over as incident face.
    pub(crate) fn detach_face(&mut self, face: FaceKey, ccw_next: Option<FaceKey>) {
        debug_assert!(self.face_count > 0, "detaching a face from an empty ring");
        self.face_count = self.face_count.saturating_sub(1);
        if self.face_count == 0 {
            self.incident_face = None;
        } else if self.incident_face == Some(face) {
            self.incident_face = ccw_next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    #[test]
    fn test_owner_resolution() {
        let offset = TileOffset::new(2, -1);
        let vertex = Vertex::new(Point2::new(0.5, 0.5), 7, offset);
        assert!(!vertex.is_foreign());
        assert_eq!(vertex.owner(), ForeignVertexRef { offset, id: 7 });

        let owner = ForeignVertexRef {
            offset: TileOffset::new(3, -1),
            id: 11,
        };
        let ghost = Vertex::new_ghost(Point2::new(1.25, 0.5), 40, offset, owner);
        assert!(ghost.is_foreign());
        assert_eq!(ghost.owner(), owner);
    }

    #[test]
    fn test_point_in_frame_shifts_by_offset_delta() {
        let vertex = Vertex::new(Point2::new(0.25, 0.75), 0, TileOffset::new(1, 0));
        let shifted = vertex.point_in_frame(TileOffset::new(0, 0));
        assert_eq!(shifted, Point2::new(1.25, 0.75));
    }

    #[test]
    fn test_face_attachment_bookkeeping() {
        let first = FaceKey::from(KeyData::from_ffi(1));
        let second = FaceKey::from(KeyData::from_ffi(2));
        let mut vertex = Vertex::new(Point2::ORIGIN, 0, TileOffset::ORIGIN);

        vertex.attach_face(first);
        vertex.attach_face(second);
        assert_eq!(vertex.face_count(), 2);
        assert_eq!(vertex.incident_face(), Some(first));

        vertex.detach_face(first, Some(second));
        assert_eq!(vertex.incident_face(), Some(second));
        vertex.detach_face(second, None);
        assert_eq!(vertex.face_count(), 0);
        assert_eq!(vertex.incident_face(), None);
    }
}
