//! Procedural chunk generation.

use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use crate::noise::{LayeredField, NoiseParams};
use crate::pixels::{rgba_len, Rgba};
use crate::protocol::{GeneratorRequest, GeneratorResponse};

/// Default world units per pixel.
pub const DEFAULT_COORDINATE_SCALE: f64 = 0.001;

/// Chunk generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// World seed (None = random, logged at startup)
    pub seed: Option<u64>,
    /// World units per pixel
    pub coordinate_scale: f64,
    /// Noise stack parameters
    pub noise: NoiseParams,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            coordinate_scale: DEFAULT_COORDINATE_SCALE,
            noise: NoiseParams::default(),
        }
    }
}

/// Rasterizes the terrain field into RGBA chunks.
#[derive(Debug)]
pub struct ChunkGenerator {
    /// Configuration
    config: GeneratorConfig,
    /// Terrain field
    field: LayeredField,
}

impl ChunkGenerator {
    /// Creates a new generator with the given config.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let field = LayeredField::new(&config.noise, config.seed);
        info!(seed = field.seed(), "Chunk generator ready");
        Self { config, field }
    }

    /// Creates a generator with default config and a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(GeneratorConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    /// Seed the terrain tables were built from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.field.seed()
    }

    /// Returns the generator configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Terrain scalar at a pixel position.
    #[must_use]
    pub fn terrain_at(&self, x: i64, y: i64) -> f64 {
        let scale = self.config.coordinate_scale;
        self.field.sample(x as f64 * scale, y as f64 * scale)
    }

    /// Generates the `width` x `height` rectangle whose top-left pixel is
    /// `(xoff, yoff)`. Returns exactly `width * height * 4` bytes.
    #[must_use]
    pub fn generate(&self, xoff: i64, yoff: i64, width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(rgba_len(width, height));
        for y in 0..i64::from(height) {
            for x in 0..i64::from(width) {
                let color = terrain_color(self.terrain_at(xoff + x, yoff + y));
                buffer.extend_from_slice(bytemuck::bytes_of(&color));
            }
        }
        buffer
    }

    /// Answers a protocol request.
    #[must_use]
    pub fn handle(&self, request: &GeneratorRequest) -> GeneratorResponse {
        let GeneratorRequest::GetChunk {
            x,
            y,
            width,
            height,
        } = *request;
        trace!(x, y, width, height, "Generating chunk");
        GeneratorResponse::SetChunk {
            x,
            y,
            buffer: self.generate(x, y, width, height),
        }
    }
}

/// Maps a terrain scalar (0-1) to the warm desaturated palette.
#[must_use]
pub fn terrain_color(value: f64) -> Rgba {
    let col = ((value * 255.0) as u32 & 0xff) as u8;
    let c = f64::from(col);
    Rgba::new(col, (c * 0.9) as u8, (c * 0.7) as u8, 255)
}
