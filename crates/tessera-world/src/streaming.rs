//! Viewport-driven chunk streaming.
//!
//! The [`ViewportController`] owns the chunk cache, the viewport and a
//! transport handle. On every draw it:
//! 1. Computes the chunk-aligned bounds around the viewport (inclusive, so one
//!    extra row/column may be requested as slack).
//! 2. Inserts a placeholder and sends a request for every missing chunk.
//! 3. Blits every chunk in the bounds at its viewport-relative offset.
//!
//! Every received chunk is installed (even if the viewport has moved away),
//! the surface is redrawn, and the whole cache is scanned for chunks whose
//! origin lies at or beyond the discard distance from the viewport origin.
//!
//! A chunk slot moves `absent -> placeholder -> resolved`; eviction returns
//! either state to `absent`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use tessera_common::{nearest_chunk, ChunkOrigin, TransportError, WorldCoord};
use tracing::{debug, trace, warn};

use crate::chunk::Chunk;
use crate::pixels::{ChunkImage, Rgba};
use crate::protocol::{GeneratorRequest, GeneratorResponse};
use crate::surface::RenderSurface;
use crate::transport::ChunkTransport;

/// Default chunk edge length in pixels.
pub const DEFAULT_CHUNK_SIZE: u32 = 256;

/// Default discard distance, in chunk lengths.
pub const DEFAULT_DISCARD_RADIUS: u32 = 16;

/// Streaming configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingConfig {
    /// Chunk edge length in pixels
    pub chunk_size: u32,
    /// Chunks whose origin is this many chunk lengths from the viewport
    /// origin (or more) are evicted
    pub discard_radius_chunks: u32,
    /// In-flight requests older than this are sent again (None = never)
    pub request_timeout: Option<Duration>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            discard_radius_chunks: DEFAULT_DISCARD_RADIUS,
            request_timeout: None,
        }
    }
}

impl StreamingConfig {
    /// Eviction distance in pixels.
    #[must_use]
    pub fn discard_at(&self) -> f64 {
        f64::from(self.chunk_size) * f64::from(self.discard_radius_chunks)
    }
}

/// The visible window into the world. 1:1 world pixels, no zoom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    /// World X of the top-left corner
    pub x: i64,
    /// World Y of the top-left corner
    pub y: i64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner in world coordinates.
    #[must_use]
    pub const fn origin(&self) -> WorldCoord {
        WorldCoord::new(self.x, self.y)
    }

    /// Moves the viewport by `(dx, dy)` world pixels.
    pub fn pan(&mut self, dx: i64, dy: i64) {
        let moved = self.origin().offset(dx, dy);
        self.x = moved.x;
        self.y = moved.y;
    }

    /// Changes the viewport size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Chunk-aligned bounds enclosing the viewport, both ends inclusive.
    #[must_use]
    pub const fn chunk_bounds(&self, chunk_size: u32) -> ChunkBounds {
        ChunkBounds {
            x0: nearest_chunk(self.x, chunk_size),
            y0: nearest_chunk(self.y, chunk_size),
            x1: nearest_chunk(self.x + self.width as i64, chunk_size),
            y1: nearest_chunk(self.y + self.height as i64, chunk_size),
            step: chunk_size,
        }
    }
}

/// Inclusive grid of chunk origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    /// Leftmost chunk origin
    pub x0: i64,
    /// Topmost chunk origin
    pub y0: i64,
    /// Rightmost chunk origin
    pub x1: i64,
    /// Bottommost chunk origin
    pub y1: i64,
    /// Grid step (chunk size)
    pub step: u32,
}

impl ChunkBounds {
    /// Every origin in the grid, column by column.
    pub fn origins(self) -> impl Iterator<Item = ChunkOrigin> {
        let step = self.step as usize;
        (self.x0..=self.x1).step_by(step).flat_map(move |cx| {
            (self.y0..=self.y1)
                .step_by(step)
                .map(move |cy| ChunkOrigin::new(cx, cy))
        })
    }

    /// Number of origins in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        let step = i64::from(self.step);
        let columns = (self.x1 - self.x0) / step + 1;
        let rows = (self.y1 - self.y0) / step + 1;
        (columns * rows) as usize
    }

    /// Whether the grid is empty (never true for viewport bounds).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x1 < self.x0 || self.y1 < self.y0
    }

    /// Whether `origin` is one of the grid's origins.
    #[must_use]
    pub fn contains(&self, origin: ChunkOrigin) -> bool {
        (self.x0..=self.x1).contains(&origin.x)
            && (self.y0..=self.y1).contains(&origin.y)
            && origin.is_aligned(self.step)
    }
}

/// Map from chunk origin to chunk; at most one entry per origin.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: AHashMap<ChunkOrigin, Chunk>,
}

impl ChunkCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a chunk.
    #[must_use]
    pub fn get(&self, origin: &ChunkOrigin) -> Option<&Chunk> {
        self.chunks.get(origin)
    }

    /// Whether a chunk (placeholder or resolved) exists for `origin`.
    #[must_use]
    pub fn contains(&self, origin: &ChunkOrigin) -> bool {
        self.chunks.contains_key(origin)
    }

    /// Inserts or replaces the chunk at its origin.
    pub fn insert(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.origin(), chunk)
    }

    /// Removes a chunk.
    pub fn remove(&mut self, origin: &ChunkOrigin) -> Option<Chunk> {
        self.chunks.remove(origin)
    }

    /// Number of cached chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterates over cached chunks in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Removes every chunk whose origin is `discard_at` or further from
    /// `center`. Returns the removed origins.
    pub fn evict_beyond(&mut self, center: WorldCoord, discard_at: f64) -> Vec<ChunkOrigin> {
        let mut evicted = Vec::new();
        self.chunks.retain(|origin, _| {
            let keep = origin.distance_to(center) < discard_at;
            if !keep {
                evicted.push(*origin);
            }
            keep
        });
        evicted
    }
}

/// Counters kept by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Requests handed to the transport
    pub requests_sent: u64,
    /// Requests sent again after timing out
    pub requests_reissued: u64,
    /// Responses installed into the cache
    pub chunks_installed: u64,
    /// Chunks removed by eviction
    pub chunks_evicted: u64,
    /// Malformed responses that were ignored
    pub responses_dropped: u64,
}

/// Owns the viewport, the chunk cache and the transport to the generator.
pub struct ViewportController<T> {
    config: StreamingConfig,
    viewport: Viewport,
    cache: ChunkCache,
    /// Origins with an outstanding request, and when it was sent
    in_flight: AHashMap<ChunkOrigin, Instant>,
    /// Shared image for every placeholder chunk
    placeholder: Arc<ChunkImage>,
    transport: T,
    /// Set after the first transport fault so it is logged once
    transport_failed: bool,
    stats: StreamingStats,
}

impl<T: ChunkTransport> ViewportController<T> {
    /// Creates a controller with an empty viewport at the world origin.
    #[must_use]
    pub fn new(config: StreamingConfig, transport: T) -> Self {
        assert!(config.chunk_size > 0, "Chunk size must be positive");
        let placeholder = Arc::new(ChunkImage::filled(
            config.chunk_size,
            config.chunk_size,
            Rgba::PLACEHOLDER,
        ));
        Self {
            config,
            viewport: Viewport::default(),
            cache: ChunkCache::new(),
            in_flight: AHashMap::new(),
            placeholder,
            transport,
            transport_failed: false,
            stats: StreamingStats::default(),
        }
    }

    /// Starts from the given viewport instead of an empty one.
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Returns the current viewport.
    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Returns the chunk cache.
    #[must_use]
    pub const fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Returns the counters.
    #[must_use]
    pub const fn stats(&self) -> &StreamingStats {
        &self.stats
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether a request for `origin` is awaiting a response.
    #[must_use]
    pub fn is_in_flight(&self, origin: &ChunkOrigin) -> bool {
        self.in_flight.contains_key(origin)
    }

    /// Chunk grid the current viewport needs.
    #[must_use]
    pub fn required_chunks(&self) -> ChunkBounds {
        self.viewport.chunk_bounds(self.config.chunk_size)
    }

    /// Pans the viewport and redraws.
    pub fn on_pan_delta<S: RenderSurface>(&mut self, dx: i64, dy: i64, surface: &mut S) {
        self.viewport.pan(dx, dy);
        self.draw(surface);
    }

    /// Resizes the viewport and redraws.
    pub fn on_resize<S: RenderSurface>(&mut self, width: u32, height: u32, surface: &mut S) {
        self.viewport.resize(width, height);
        debug!(width, height, "Viewport resized");
        self.draw(surface);
    }

    /// Requests missing or unresolved chunks and blits the visible grid.
    /// Returns the number of chunks drawn.
    pub fn draw<S: RenderSurface>(&mut self, surface: &mut S) -> usize {
        let bounds = self.required_chunks();
        let now = Instant::now();
        let mut drawn = 0;

        for origin in bounds.origins() {
            let resolved = self.cache.get(&origin).map(Chunk::is_resolved);
            if resolved.is_none() {
                self.cache
                    .insert(Chunk::placeholder(origin, Arc::clone(&self.placeholder)));
            }
            // Placeholders whose request was dropped or failed are asked for again.
            if resolved != Some(true) {
                self.request(origin, now);
            }

            if let Some(chunk) = self.cache.get(&origin) {
                surface.blit(
                    chunk.image(),
                    origin.x - self.viewport.x,
                    origin.y - self.viewport.y,
                );
                drawn += 1;
            }
        }

        drawn
    }

    /// Installs a generator response, redraws, then evicts distant chunks.
    ///
    /// Responses for chunks that were evicted meanwhile are installed like any
    /// other; the eviction pass drops them again if they are still far away.
    /// Returns whether the chunk was installed.
    pub fn receive<S: RenderSurface>(&mut self, response: GeneratorResponse, surface: &mut S) -> bool {
        let origin = response.origin();
        self.in_flight.remove(&origin);

        let installed = match Chunk::from_response(response, self.config.chunk_size) {
            Ok(chunk) => {
                if !self.cache.contains(&origin) {
                    trace!(%origin, "Installing chunk into an evicted slot");
                }
                self.cache.insert(chunk);
                self.stats.chunks_installed += 1;
                debug!(%origin, "Chunk installed");
                true
            },
            Err(e) => {
                warn!(%origin, "Dropping chunk response: {e}");
                self.stats.responses_dropped += 1;
                false
            },
        };

        if installed {
            self.draw(surface);
        }
        self.evict();
        installed
    }

    /// Handles every response that is ready without blocking. Returns how
    /// many were received.
    pub fn pump<S: RenderSurface>(&mut self, surface: &mut S) -> usize {
        let mut received = 0;
        loop {
            match self.transport.try_recv() {
                Ok(Some(response)) => {
                    self.receive(response, surface);
                    received += 1;
                },
                Ok(None) => break,
                Err(e) => {
                    self.report_transport_fault(&e);
                    break;
                },
            }
        }
        received
    }

    /// Receives responses until nothing is in flight or `timeout` elapses.
    /// Returns how many were received.
    pub fn settle<S: RenderSurface>(&mut self, surface: &mut S, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut received = 0;
        while !self.in_flight.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                debug!(pending = self.in_flight.len(), "Settle timed out");
                break;
            }
            match self.transport.recv_timeout(deadline - now) {
                Ok(Some(response)) => {
                    self.receive(response, surface);
                    received += 1;
                },
                Ok(None) => break,
                Err(e) => {
                    self.report_transport_fault(&e);
                    break;
                },
            }
        }
        received
    }

    /// Removes cached chunks at or beyond the discard distance from the
    /// viewport origin. Returns how many were removed.
    pub fn evict(&mut self) -> usize {
        let evicted = self
            .cache
            .evict_beyond(self.viewport.origin(), self.config.discard_at());
        if !evicted.is_empty() {
            debug!(count = evicted.len(), cached = self.cache.len(), "Evicted distant chunks");
            self.stats.chunks_evicted += evicted.len() as u64;
        }
        evicted.len()
    }

    /// Sends a request for `origin` unless one is already in flight and has
    /// not timed out.
    fn request(&mut self, origin: ChunkOrigin, now: Instant) {
        if let Some(&sent) = self.in_flight.get(&origin) {
            let expired = self
                .config
                .request_timeout
                .is_some_and(|timeout| now.duration_since(sent) >= timeout);
            if !expired {
                return;
            }
            debug!(%origin, "Re-issuing timed out chunk request");
            self.stats.requests_reissued += 1;
        }

        match self
            .transport
            .send(GeneratorRequest::chunk(origin, self.config.chunk_size))
        {
            Ok(()) => {
                trace!(%origin, "Chunk requested");
                self.in_flight.insert(origin, now);
                self.stats.requests_sent += 1;
            },
            Err(e) => self.report_transport_fault(&e),
        }
    }

    fn report_transport_fault(&mut self, err: &TransportError) {
        if !self.transport_failed {
            warn!("Generator transport fault: {err}; missing chunks stay as placeholders");
            self.transport_failed = true;
        }
    }
}
