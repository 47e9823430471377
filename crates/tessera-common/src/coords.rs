//! Coordinate types for world positions and chunk origins.
//!
//! World coordinates are pixels at 1:1 scale; there is no zoom. A chunk is
//! addressed by the world coordinate of its top-left pixel, which is always a
//! multiple of the chunk size.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Rounds `value` down to the nearest multiple of `chunk_size`.
///
/// Rounds toward negative infinity, so `-1` maps to `-chunk_size`.
#[must_use]
pub const fn nearest_chunk(value: i64, chunk_size: u32) -> i64 {
    let size = chunk_size as i64;
    value.div_euclid(size) * size
}

/// World coordinate in pixels (global position).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(C)]
pub struct WorldCoord {
    /// X coordinate in world space
    pub x: i64,
    /// Y coordinate in world space
    pub y: i64,
}

impl WorldCoord {
    /// Creates a new world coordinate.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the origin of the chunk containing this coordinate.
    #[must_use]
    pub const fn to_chunk_origin(self, chunk_size: u32) -> ChunkOrigin {
        ChunkOrigin {
            x: nearest_chunk(self.x, chunk_size),
            y: nearest_chunk(self.y, chunk_size),
        }
    }

    /// Returns this coordinate moved by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i64, dy: i64) -> Self {
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
        }
    }
}

/// World coordinate of a chunk's top-left pixel.
///
/// Used as the chunk cache key. Both components are multiples of the chunk
/// size when produced by [`WorldCoord::to_chunk_origin`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(C)]
pub struct ChunkOrigin {
    /// X coordinate of the chunk's left edge
    pub x: i64,
    /// Y coordinate of the chunk's top edge
    pub y: i64,
}

impl ChunkOrigin {
    /// Creates a chunk origin from raw world coordinates.
    ///
    /// No alignment is enforced; see [`ChunkOrigin::is_aligned`].
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Whether both components lie on the chunk grid.
    #[must_use]
    pub const fn is_aligned(self, chunk_size: u32) -> bool {
        let size = chunk_size as i64;
        self.x.rem_euclid(size) == 0 && self.y.rem_euclid(size) == 0
    }

    /// Straight-line distance from this origin to a world position.
    #[must_use]
    pub fn distance_to(self, point: WorldCoord) -> f64 {
        let dx = (self.x - point.x) as f64;
        let dy = (self.y - point.y) as f64;
        dx.hypot(dy)
    }
}

impl fmt::Display for ChunkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
