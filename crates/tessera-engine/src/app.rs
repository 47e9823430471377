//! Headless viewer session.
//!
//! Drives the viewport controller the way an interactive host would: size
//! the surface, draw, then replay the configured pan path as drag gestures.
//! After each step the session waits for outstanding chunks and optionally
//! writes a PNG snapshot of the viewport.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use tessera_world::{
    ChunkGenerator, ChunkTransport, FrameBuffer, GeneratorWorker, StreamingStats,
    ViewportController,
};

use crate::config::EngineConfig;
use crate::input::PointerDrag;

/// Runs a full session from configuration.
pub fn run(config: &EngineConfig) -> Result<()> {
    let generator = Arc::new(ChunkGenerator::new(config.generator_config()));
    info!(seed = generator.seed(), "Terrain seed (set world_seed to reproduce)");

    let worker = GeneratorWorker::spawn(generator, config.worker_threads)
        .context("failed to start generator workers")?;

    let mut session = Session::new(config, worker);
    session.start()?;
    session.replay(&config.pan_path)?;

    let controller = session.controller();
    log_stats(controller.stats(), controller.cache().len());
    Ok(())
}

fn log_stats(stats: &StreamingStats, cached: usize) {
    info!(
        requests = stats.requests_sent,
        reissued = stats.requests_reissued,
        installed = stats.chunks_installed,
        evicted = stats.chunks_evicted,
        dropped = stats.responses_dropped,
        cached,
        "Session finished"
    );
}

/// Controller, surface and pointer state for one viewer.
pub struct Session<T> {
    controller: ViewportController<T>,
    surface: FrameBuffer,
    drag: PointerDrag,
    width: u32,
    height: u32,
    settle_timeout: Duration,
    snapshot_dir: Option<PathBuf>,
    frame: usize,
}

impl<T: ChunkTransport> Session<T> {
    /// Creates a session drawing through `transport`.
    pub fn new(config: &EngineConfig, transport: T) -> Self {
        Self {
            controller: ViewportController::new(config.streaming_config(), transport),
            surface: FrameBuffer::new(config.viewport_width, config.viewport_height),
            drag: PointerDrag::new(),
            width: config.viewport_width,
            height: config.viewport_height,
            settle_timeout: config.settle_timeout(),
            snapshot_dir: config.snapshot_dir.clone(),
            frame: 0,
        }
    }

    /// Sizes the viewport, draws the first frame and waits for it.
    pub fn start(&mut self) -> Result<()> {
        self.resize(self.width, self.height);
        self.finish_step()
    }

    /// Replays pan steps as pointer drags.
    pub fn replay(&mut self, path: &[[i64; 2]]) -> Result<()> {
        for &[dx, dy] in path {
            self.drag_by(dx, dy);
            self.finish_step()?;
        }
        Ok(())
    }

    /// Resizes surface and viewport together.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.surface.resize(width, height);
        self.controller.on_resize(width, height, &mut self.surface);
    }

    /// Pans the viewport by `(dx, dy)` with a press-move-release gesture
    /// from the centre of the screen.
    pub fn drag_by(&mut self, dx: i64, dy: i64) {
        let cx = i64::from(self.width / 2);
        let cy = i64::from(self.height / 2);
        debug_assert!(!self.drag.is_dragging());
        self.drag.press(cx, cy);
        if let Some((px, py)) = self.drag.move_to(cx - dx, cy - dy) {
            self.controller.on_pan_delta(px, py, &mut self.surface);
        }
        self.drag.release();
    }

    /// Returns the controller.
    pub fn controller(&self) -> &ViewportController<T> {
        &self.controller
    }

    fn finish_step(&mut self) -> Result<()> {
        let received = self.controller.settle(&mut self.surface, self.settle_timeout);
        let viewport = self.controller.viewport();
        debug!(
            x = viewport.x,
            y = viewport.y,
            received,
            pending = self.controller.in_flight_count(),
            cached = self.controller.cache().len(),
            "Step settled"
        );

        if let Some(dir) = &self.snapshot_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let path = dir.join(format!("frame_{:03}.png", self.frame));
            self.surface.save_png(&path)?;
        }
        self.frame += 1;
        Ok(())
    }
}
