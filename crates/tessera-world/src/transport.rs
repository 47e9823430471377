//! Request/response channel between the controller and the chunk generator.
//!
//! The controller never blocks on generation: it sends a request and later
//! polls for responses. Two implementations are provided:
//! - [`GeneratorWorker`]: background threads fed by crossbeam channels.
//! - [`InlineTransport`]: generates on the polling thread, deterministic.
//!
//! There is no cancellation. Once sent, a request is answered even if the
//! chunk has since left the viewport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tessera_common::{TesseraResult, TransportError};
use tracing::{debug, info, warn};

use crate::generation::ChunkGenerator;
use crate::protocol::{GeneratorRequest, GeneratorResponse};

/// Asynchronous channel to a chunk generator.
pub trait ChunkTransport {
    /// Queues a request without waiting for the result.
    fn send(&self, request: GeneratorRequest) -> Result<(), TransportError>;

    /// Returns a finished response if one is ready.
    fn try_recv(&self) -> Result<Option<GeneratorResponse>, TransportError>;

    /// Waits up to `timeout` for a response.
    fn recv_timeout(&self, timeout: Duration) -> Result<Option<GeneratorResponse>, TransportError> {
        let _ = timeout;
        self.try_recv()
    }
}

/// Background generator threads.
///
/// Each thread handles one request at a time. With more than one thread,
/// responses may arrive out of request order.
pub struct GeneratorWorker {
    /// Request queue; dropped first on shutdown so threads exit
    requests: Option<Sender<GeneratorRequest>>,
    /// Finished chunks
    responses: Receiver<GeneratorResponse>,
    /// Worker thread handles
    handles: Vec<JoinHandle<()>>,
}

impl GeneratorWorker {
    /// Spawns `threads` workers sharing `generator`.
    pub fn spawn(generator: Arc<ChunkGenerator>, threads: usize) -> TesseraResult<Self> {
        let threads = threads.max(1);
        let (request_tx, request_rx) = unbounded::<GeneratorRequest>();
        let (response_tx, response_rx) = unbounded::<GeneratorResponse>();

        let mut handles = Vec::with_capacity(threads);
        for index in 0..threads {
            let generator = Arc::clone(&generator);
            let requests = request_rx.clone();
            let responses = response_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("chunk-generator-{index}"))
                .spawn(move || run_worker(index, &generator, &requests, &responses))?;
            handles.push(handle);
        }

        info!(threads, "Generator workers started");
        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            handles,
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }

    /// Requests queued but not yet picked up by a worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.requests.as_ref().map_or(0, Sender::len)
    }
}

fn run_worker(
    index: usize,
    generator: &ChunkGenerator,
    requests: &Receiver<GeneratorRequest>,
    responses: &Sender<GeneratorResponse>,
) {
    debug!(worker = index, "Generator worker running");
    while let Ok(request) = requests.recv() {
        let response = generator.handle(&request);
        if responses.send(response).is_err() {
            break;
        }
    }
    debug!(worker = index, "Generator worker stopped");
}

impl ChunkTransport for GeneratorWorker {
    fn send(&self, request: GeneratorRequest) -> Result<(), TransportError> {
        let sender = self.requests.as_ref().ok_or(TransportError::Disconnected)?;
        sender.send(request).map_err(|_| TransportError::Disconnected)
    }

    fn try_recv(&self) -> Result<Option<GeneratorResponse>, TransportError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<Option<GeneratorResponse>, TransportError> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

impl Drop for GeneratorWorker {
    fn drop(&mut self) {
        // Closing the request channel ends each worker loop.
        self.requests.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("Generator worker panicked");
            }
        }
        debug!("Generator workers joined");
    }
}

/// Generates on the caller's thread, one request per poll, in FIFO order.
pub struct InlineTransport {
    generator: Arc<ChunkGenerator>,
    pending: RefCell<VecDeque<GeneratorRequest>>,
}

impl InlineTransport {
    /// Creates an inline transport around `generator`.
    #[must_use]
    pub fn new(generator: Arc<ChunkGenerator>) -> Self {
        Self {
            generator,
            pending: RefCell::new(VecDeque::new()),
        }
    }

    /// Requests waiting to be generated.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl ChunkTransport for InlineTransport {
    fn send(&self, request: GeneratorRequest) -> Result<(), TransportError> {
        self.pending.borrow_mut().push_back(request);
        Ok(())
    }

    fn try_recv(&self) -> Result<Option<GeneratorResponse>, TransportError> {
        let next = self.pending.borrow_mut().pop_front();
        Ok(next.map(|request| self.generator.handle(&request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GeneratorConfig;
    use crate::noise::NoiseParams;
    use tessera_common::ChunkOrigin;

    fn generator() -> Arc<ChunkGenerator> {
        Arc::new(ChunkGenerator::new(GeneratorConfig {
            seed: Some(21),
            noise: NoiseParams {
                buffer_size: 4096,
                layers: 3,
                ..NoiseParams::default()
            },
            ..Default::default()
        }))
    }

    #[test]
    fn test_worker_round_trip() {
        let worker = GeneratorWorker::spawn(generator(), 1).expect("spawn failed");
        worker
            .send(GeneratorRequest::GetChunk {
                x: 512,
                y: 1024,
                width: 256,
                height: 256,
            })
            .expect("send failed");

        let response = worker
            .recv_timeout(Duration::from_secs(30))
            .expect("transport failed")
            .expect("timed out");
        assert_eq!(response.origin(), ChunkOrigin::new(512, 1024));
        assert_eq!(response.buffer().len(), 262_144);
    }

    #[test]
    fn test_worker_pool_answers_every_request() {
        let worker = GeneratorWorker::spawn(generator(), 3).expect("spawn failed");
        assert_eq!(worker.thread_count(), 3);

        for i in 0..6 {
            let origin = ChunkOrigin::new(i * 32, 0);
            worker
                .send(GeneratorRequest::chunk(origin, 32))
                .expect("send failed");
        }

        let mut origins = Vec::new();
        while origins.len() < 6 {
            let response = worker
                .recv_timeout(Duration::from_secs(30))
                .expect("transport failed")
                .expect("timed out");
            origins.push(response.origin().x);
        }
        origins.sort_unstable();
        assert_eq!(origins, vec![0, 32, 64, 96, 128, 160]);
    }

    #[test]
    fn test_worker_empty_poll() {
        let worker = GeneratorWorker::spawn(generator(), 1).expect("spawn failed");
        assert!(worker.try_recv().expect("transport failed").is_none());
        assert_eq!(worker.queued(), 0);
    }

    #[test]
    fn test_inline_fifo() {
        let transport = InlineTransport::new(generator());
        transport
            .send(GeneratorRequest::chunk(ChunkOrigin::new(0, 0), 8))
            .expect("send failed");
        transport
            .send(GeneratorRequest::chunk(ChunkOrigin::new(8, 0), 8))
            .expect("send failed");
        assert_eq!(transport.pending(), 2);

        let first = transport.try_recv().expect("poll failed").expect("empty");
        let second = transport.try_recv().expect("poll failed").expect("empty");
        assert_eq!(first.origin(), ChunkOrigin::new(0, 0));
        assert_eq!(second.origin(), ChunkOrigin::new(8, 0));
        assert!(transport.try_recv().expect("poll failed").is_none());
    }
}
