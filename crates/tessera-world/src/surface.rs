//! Render surfaces the viewport controller draws into.

use std::path::Path;

use image::{ImageFormat, RgbaImage};
use tessera_common::{TesseraError, TesseraResult};
use tracing::info;

use crate::pixels::{rgba_len, ChunkImage, Rgba, BYTES_PER_PIXEL};

/// Something that can show RGBA images at screen positions.
pub trait RenderSurface {
    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Copies `image` so its top-left pixel lands at `(screen_x, screen_y)`.
    /// Parts outside the surface are clipped.
    fn blit(&mut self, image: &ChunkImage, screen_x: i64, screen_y: i64);
}

/// In-memory RGBA surface.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Creates a transparent frame buffer.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; rgba_len(width, height)],
        }
    }

    /// Resizes the buffer; contents are cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(rgba_len(width, height), 0);
    }

    /// Fills the whole buffer with one color.
    pub fn clear(&mut self, color: Rgba) {
        for px in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(bytemuck::bytes_of(&color));
        }
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

    /// Raw RGBA bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Writes the buffer as a PNG file.
    pub fn save_png(&self, path: &Path) -> TesseraResult<()> {
        let image = RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| TesseraError::Image("frame buffer size mismatch".into()))?;
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| TesseraError::Image(e.to_string()))?;
        info!("Saved snapshot to {}", path.display());
        Ok(())
    }
}

impl RenderSurface for FrameBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn blit(&mut self, image: &ChunkImage, screen_x: i64, screen_y: i64) {
        let x0 = screen_x.max(0);
        let y0 = screen_y.max(0);
        let x1 = (screen_x + i64::from(image.width())).min(i64::from(self.width));
        let y1 = (screen_y + i64::from(image.height())).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let span = (x1 - x0) as usize * BYTES_PER_PIXEL;
        let src_x = (x0 - screen_x) as usize * BYTES_PER_PIXEL;
        let stride = self.width as usize * BYTES_PER_PIXEL;

        for y in y0..y1 {
            let Some(row) = image.row((y - screen_y) as u32) else {
                continue;
            };
            let dst = y as usize * stride + x0 as usize * BYTES_PER_PIXEL;
            self.data[dst..dst + span].copy_from_slice(&row[src_x..src_x + span]);
        }
    }
}
