//! Cached terrain chunks.

use std::sync::Arc;

use tessera_common::{ChunkOrigin, WorldError};

use crate::pixels::ChunkImage;
use crate::protocol::GeneratorResponse;

/// Lifecycle state of a cached chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Requested, showing the neutral placeholder image
    Placeholder,
    /// Generator output installed
    Resolved,
}

/// A square tile of terrain pixels keyed by its world origin.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Top-left world coordinate
    origin: ChunkOrigin,
    /// Lifecycle state
    state: ChunkState,
    /// Pixels; placeholders share one image
    image: Arc<ChunkImage>,
}

impl Chunk {
    /// Creates a placeholder chunk showing `image`.
    #[must_use]
    pub fn placeholder(origin: ChunkOrigin, image: Arc<ChunkImage>) -> Self {
        Self {
            origin,
            state: ChunkState::Placeholder,
            image,
        }
    }

    /// Creates a resolved chunk.
    #[must_use]
    pub fn resolved(origin: ChunkOrigin, image: ChunkImage) -> Self {
        Self {
            origin,
            state: ChunkState::Resolved,
            image: Arc::new(image),
        }
    }

    /// Builds a resolved chunk from a generator response.
    ///
    /// Fails if the origin is off the chunk grid or the payload is not a
    /// `chunk_size` x `chunk_size` RGBA buffer.
    pub fn from_response(response: GeneratorResponse, chunk_size: u32) -> Result<Self, WorldError> {
        let (origin, buffer) = response.into_parts();
        if !origin.is_aligned(chunk_size) {
            return Err(WorldError::Misaligned {
                x: origin.x,
                y: origin.y,
            });
        }
        let image = ChunkImage::from_rgba(chunk_size, chunk_size, buffer)?;
        Ok(Self::resolved(origin, image))
    }

    /// Returns the chunk origin.
    #[must_use]
    pub const fn origin(&self) -> ChunkOrigin {
        self.origin
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ChunkState {
        self.state
    }

    /// Whether generator output has been installed.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state == ChunkState::Resolved
    }

    /// Returns the chunk pixels.
    #[must_use]
    pub fn image(&self) -> &ChunkImage {
        &self.image
    }
}
