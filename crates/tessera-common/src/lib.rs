//! # Tessera Common
//!
//! Common types shared by the Tessera terrain streamer.
//!
//! This crate provides:
//! - Coordinate types (world position, chunk origin)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
}

pub use prelude::*;
