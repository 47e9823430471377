//! RGBA pixel buffers.
//!
//! A [`ChunkImage`] is the unit handed to a render surface: a row-major RGBA
//! buffer, four bytes per pixel.

use bytemuck::{Pod, Zeroable};
use tessera_common::WorldError;

/// Bytes per pixel (RGBA).
pub const BYTES_PER_PIXEL: usize = 4;

/// A single RGBA pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Neutral gray shown for chunks that have not been generated yet.
    pub const PLACEHOLDER: Self = Self::new(127, 127, 127, 255);

    /// Creates a pixel from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Returns the byte length of a `width` x `height` RGBA buffer.
#[must_use]
pub const fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

/// Row-major RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ChunkImage {
    /// Creates a transparent image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; rgba_len(width, height)],
        }
    }

    /// Creates an image filled with one color.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixel_count = width as usize * height as usize;
        let data = std::iter::repeat(color)
            .take(pixel_count)
            .flat_map(|px| bytemuck::bytes_of(&px).to_vec())
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Wraps an existing RGBA buffer, checking its length.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, WorldError> {
        let expected = rgba_len(width, height);
        if data.len() != expected {
            return Err(WorldError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of one row.
    #[must_use]
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let start = y as usize * stride;
        self.data.get(start..start + stride)
    }

    /// Reads one pixel.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        self.data
            .get(index..index + BYTES_PER_PIXEL)
            .map(|bytes| *bytemuck::from_bytes::<Rgba>(bytes))
    }

    /// Writes one pixel. Returns false when out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        match self.data.get_mut(index..index + BYTES_PER_PIXEL) {
            Some(slot) => {
                slot.copy_from_slice(bytemuck::bytes_of(&color));
                true
            },
            None => false,
        }
    }
}
