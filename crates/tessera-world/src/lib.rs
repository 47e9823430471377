//! # Tessera World
//!
//! Infinite procedural terrain streamed into a scrollable viewport.
//!
//! This crate handles:
//! - Layered spring noise and the terrain color ramp
//! - Chunk generation on background workers
//! - The request/response protocol between controller and generator
//! - Viewport-driven chunk caching, placeholders and eviction

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod generation;
pub mod noise;
pub mod pixels;
pub mod protocol;
pub mod streaming;
pub mod surface;
pub mod transport;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::generation::*;
    pub use crate::noise::*;
    pub use crate::pixels::*;
    pub use crate::protocol::{GeneratorRequest, GeneratorResponse};
    pub use crate::streaming::*;
    pub use crate::surface::*;
    pub use crate::transport::*;
}

pub use prelude::*;
