//! Engine configuration.
//!
//! Provides viewport, world, streaming and output settings. Configuration is
//! read from a TOML file; a missing or invalid file falls back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use tessera_world::{GeneratorConfig, NoiseParams, StreamingConfig, DEFAULT_COORDINATE_SCALE};

/// Configuration file name.
const CONFIG_FILE: &str = "tessera.toml";

/// Environment variable naming an explicit config file.
const CONFIG_ENV: &str = "TESSERA_CONFIG";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Viewport Settings ===
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,

    // === World Settings ===
    /// World seed (None = random, logged at startup)
    pub world_seed: Option<u64>,
    /// World units per pixel
    pub coordinate_scale: f64,
    /// Noise stack parameters
    pub noise: NoiseParams,

    // === Streaming Settings ===
    /// Chunk edge length in pixels
    pub chunk_size: u32,
    /// Discard distance in chunk lengths
    pub discard_radius_chunks: u32,
    /// Generator worker threads
    pub worker_threads: usize,
    /// Re-issue requests older than this (0 = never)
    pub request_timeout_ms: u64,
    /// Longest wait for outstanding chunks after each step
    pub settle_timeout_ms: u64,

    // === Session Settings ===
    /// Viewport pan steps `[dx, dy]` replayed as drag gestures
    pub pan_path: Vec<[i64; 2]>,
    /// Directory for PNG snapshots (None = no snapshots)
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Viewport
            viewport_width: 1280,
            viewport_height: 720,

            // World
            world_seed: None,
            coordinate_scale: DEFAULT_COORDINATE_SCALE,
            noise: NoiseParams::default(),

            // Streaming
            chunk_size: 256,
            discard_radius_chunks: 16,
            worker_threads: 1,
            request_timeout_ms: 0,
            settle_timeout_ms: 30_000,

            // Session
            pan_path: vec![[300, 0], [300, 0], [0, 300], [-2000, -1500]],
            snapshot_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `$TESSERA_CONFIG` or the default location.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Self {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_from(PathBuf::from(path)),
            None => Self::load_from(Self::config_path()),
        }
    }

    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Get the default configuration file path.
    fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs_config_path() {
            let candidate = config_dir.join("tessera").join(CONFIG_FILE);
            if candidate.exists() {
                return candidate;
            }
        }
        PathBuf::from(CONFIG_FILE)
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Viewport
        self.viewport_width = self.viewport_width.clamp(1, 7680);
        self.viewport_height = self.viewport_height.clamp(1, 4320);

        // World
        if !self.coordinate_scale.is_finite() || self.coordinate_scale <= 0.0 {
            self.coordinate_scale = DEFAULT_COORDINATE_SCALE;
        }
        self.noise.validate();

        // Streaming
        self.chunk_size = self.chunk_size.clamp(16, 1024);
        self.worker_threads = self.worker_threads.clamp(1, 16);
        self.settle_timeout_ms = self.settle_timeout_ms.max(1);

        // Chunks drawn in the viewport must stay inside the discard distance.
        let min_radius = self.min_discard_radius();
        if self.discard_radius_chunks < min_radius {
            warn!(
                configured = self.discard_radius_chunks,
                min_radius, "Discard radius too small for viewport, raising it"
            );
            self.discard_radius_chunks = min_radius;
        }
    }

    /// Smallest discard radius (in chunks) that keeps every drawn chunk.
    fn min_discard_radius(&self) -> u32 {
        let chunk = f64::from(self.chunk_size);
        let reach_x = f64::from(self.viewport_width) + chunk;
        let reach_y = f64::from(self.viewport_height) + chunk;
        (reach_x.hypot(reach_y) / chunk).floor() as u32 + 1
    }

    /// Generator settings derived from this config.
    #[must_use]
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            seed: self.world_seed,
            coordinate_scale: self.coordinate_scale,
            noise: self.noise.clone(),
        }
    }

    /// Streaming settings derived from this config.
    #[must_use]
    pub fn streaming_config(&self) -> StreamingConfig {
        StreamingConfig {
            chunk_size: self.chunk_size,
            discard_radius_chunks: self.discard_radius_chunks,
            request_timeout: (self.request_timeout_ms > 0)
                .then(|| Duration::from_millis(self.request_timeout_ms)),
        }
    }

    /// How long to wait for outstanding chunks after each step.
    #[must_use]
    pub const fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
