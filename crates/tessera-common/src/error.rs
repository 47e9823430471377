//! Error types for Tessera.

use thiserror::Error;

/// Top-level error type for Tessera operations.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// Generator transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// World/chunk errors
    #[error("World error: {0}")]
    World(#[from] WorldError),

    /// Image encoding errors
    #[error("Image error: {0}")]
    Image(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the channel between the controller and the generator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The generator side hung up or its worker died
    #[error("generator channel disconnected")]
    Disconnected,

    /// A message could not be encoded for the wire
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// A message from the wire could not be decoded
    #[error("failed to decode message: {0}")]
    Decode(String),
}

/// World and chunk errors.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Pixel payload does not match the chunk dimensions
    #[error("Chunk buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },

    /// Chunk origin is not on the chunk grid
    #[error("Chunk origin ({x}, {y}) is not aligned to the chunk grid")]
    Misaligned {
        /// X coordinate
        x: i64,
        /// Y coordinate
        y: i64,
    },
}

/// Result type alias for Tessera operations.
pub type TesseraResult<T> = Result<T, TesseraError>;
