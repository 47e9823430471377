//! Messages exchanged between the viewport controller and the chunk generator.
//!
//! Both directions are tagged by a `cmd` field so the JSON form reads
//! `{"cmd":"getChunk","x":0,"y":256,"width":256,"height":256}` and
//! `{"cmd":"setChunk","x":0,"y":256,"buffer":[...]}`.
//!
//! The in-process transports pass messages as values. [`encode`] and
//! [`decode`] are the wire codec for a transport that crosses a process
//! boundary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tessera_common::{ChunkOrigin, TransportError};

/// Controller to generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum GeneratorRequest {
    /// Generate the rectangle whose top-left corner is `(x, y)`.
    GetChunk {
        /// World X of the top-left corner
        x: i64,
        /// World Y of the top-left corner
        y: i64,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
}

impl GeneratorRequest {
    /// Request for a square chunk at `origin`.
    #[must_use]
    pub const fn chunk(origin: ChunkOrigin, chunk_size: u32) -> Self {
        Self::GetChunk {
            x: origin.x,
            y: origin.y,
            width: chunk_size,
            height: chunk_size,
        }
    }

    /// Top-left corner of the requested rectangle.
    #[must_use]
    pub fn origin(&self) -> ChunkOrigin {
        let Self::GetChunk { x, y, .. } = self;
        ChunkOrigin::new(*x, *y)
    }
}

/// Generator to controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum GeneratorResponse {
    /// Pixels for the chunk at `(x, y)`, echoing the request.
    SetChunk {
        /// World X of the top-left corner
        x: i64,
        /// World Y of the top-left corner
        y: i64,
        /// Row-major RGBA bytes
        buffer: Vec<u8>,
    },
}

impl GeneratorResponse {
    /// Top-left corner of the generated rectangle.
    #[must_use]
    pub fn origin(&self) -> ChunkOrigin {
        let Self::SetChunk { x, y, .. } = self;
        ChunkOrigin::new(*x, *y)
    }

    /// Pixel payload.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        let Self::SetChunk { buffer, .. } = self;
        buffer
    }

    /// Splits into origin and payload.
    #[must_use]
    pub fn into_parts(self) -> (ChunkOrigin, Vec<u8>) {
        let Self::SetChunk { x, y, buffer } = self;
        (ChunkOrigin::new(x, y), buffer)
    }
}

/// Encodes a message as JSON.
pub fn encode<T: Serialize>(message: &T) -> Result<String, TransportError> {
    serde_json::to_string(message).map_err(|e| TransportError::Encode(e.to_string()))
}

/// Decodes a JSON message.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, TransportError> {
    serde_json::from_str(text).map_err(|e| TransportError::Decode(e.to_string()))
}
