use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;

#[cfg(not(feature = "dense-slotmap"))]
use slotmap::SlotMap;

#[cfg(feature = "dense-slotmap")]
use slotmap::DenseSlotMap;

use crate::core::delaunay_graph::{FaceKey, VertexKey};
use crate::region::tile::TileOffset;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Internal storage backend for tile graphs.
///
/// Abstracts over the concrete slot map so that `DenseSlotMap` (**default**) and
/// `SlotMap` (when built with `--no-default-features`) can be swapped without
/// touching the graph code.
///
/// # Internal Use Only
///
/// This type should not appear in public signatures. Public methods return
/// iterators over `(key, value)` pairs instead.
#[cfg(not(feature = "dense-slotmap"))]
pub type StorageMap<K, V> = SlotMap<K, V>;

#[cfg(feature = "dense-slotmap")]
pub type StorageMap<K, V> = DenseSlotMap<K, V>;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// Optimized `HashMap` type for internal id and offset lookups.
///
/// Uses `rustc_hash::FxHasher`, a non-cryptographic hasher.
///
/// # Security Warning
///
/// ⚠️ **Not DoS-resistant**: only use with trusted, internal keys.
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// assert_eq!(map.get(&123), Some(&456));
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Optimized `HashSet` type, see [`FastHashMap`].
///
/// # Examples
///
/// ```rust
/// use tiled_delaunay::core::collections::FastHashSet;
///
/// let mut set: FastHashSet<u64> = FastHashSet::default();
/// set.insert(7);
/// assert!(set.contains(&7));
/// ```
pub type FastHashSet<T> = FxHashSet<T>;

/// Build hasher that instantiates the Fx hasher used by [`FastHashMap`] and [`FastHashSet`].
pub type FastBuildHasher = FxBuildHasher;

/// Stack-first vector used for short, bounded collections such as face vertex lists.
///
/// Keeps up to `N` elements inline and spills to the heap beyond that.
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// DOMAIN-SPECIFIC ALIASES
// =============================================================================

/// Inline capacity for per-face vertex and adjacency arrays (a triangle).
pub const MAX_FACE_VERTICES: usize = 3;

/// Vertex or adjacency list of a single face (2 entries for a degenerate face, 3 for a triangle).
pub type FaceVertexBuffer = SmallBuffer<VertexKey, MAX_FACE_VERTICES>;

/// Adjacent-face list of a single face, parallel to [`FaceVertexBuffer`].
pub type FaceAdjacencyBuffer = SmallBuffer<FaceKey, MAX_FACE_VERTICES>;

/// Faces ringed around one vertex. Interior vertices of a well-spaced tile rarely exceed 8.
pub type FaceRing = SmallBuffer<FaceKey, 8>;

/// Maps a tile-local vertex id to its storage key.
pub type VertexIdMap = FastHashMap<u64, VertexKey>;

/// Maps a tile-local face id to its storage key.
pub type FaceIdMap = FastHashMap<u64, FaceKey>;

/// Maps the owner of a ghost vertex `(owner tile, owner id)` to its local key.
pub type GhostVertexMap = FastHashMap<(TileOffset, u64), VertexKey>;
