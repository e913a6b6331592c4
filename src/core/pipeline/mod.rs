//! Acquisition pipeline
//!
//! ```text
//! ConnectionManager -> Producer -> bounded queue -> Consumer -> sink
//! ```
//!
//! Two OS threads joined by one `crossbeam-channel` bounded queue. The queue
//! is the only state they share besides the statistics counters; a full
//! queue blocks the producer.

mod consumer;
mod producer;
mod stats;
mod unit;

pub use consumer::{route, Consumer, ConsumerOptions, Routed, Router};
pub use producer::{Producer, ProducerOptions, ReconnectPolicy};
pub use stats::{PipelineStats, StatsSnapshot};
pub use unit::{ChunkKind, RawUnit};

use chrono::Utc;
use std::io::BufRead;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::core::protocol::ParserRegistry;
use crate::core::sink::RecordSink;
use crate::core::transport::{ConnectionManager, StatusHandle};

/// Default bounded queue size
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Pipeline start/stop failures
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn {0} thread: {1}")]
    Spawn(&'static str, #[source] std::io::Error),

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    #[error("queue capacity must be positive")]
    ZeroCapacity,
}

/// Everything the pipeline needs besides the port, registry and sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub queue_capacity: usize,
    pub producer: ProducerOptions,
    pub consumer: ConsumerOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            producer: ProducerOptions::default(),
            consumer: ConsumerOptions::default(),
        }
    }
}

/// What a stopped pipeline hands back
pub struct Stopped<S> {
    pub manager: ConnectionManager,
    pub sink: S,
    pub stats: StatsSnapshot,
}

/// A running producer/consumer pair
pub struct Pipeline<S: RecordSink + 'static> {
    producer: Option<Producer>,
    consumer: Option<Consumer<S>>,
    stats: Arc<PipelineStats>,
    status: StatusHandle,
}

impl<S: RecordSink + 'static> Pipeline<S> {
    /// Spawn both workers. The consumer starts first so the queue is being
    /// drained before the first read.
    pub fn start(
        manager: ConnectionManager,
        registry: Arc<ParserRegistry>,
        sink: S,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        if options.queue_capacity == 0 {
            return Err(PipelineError::ZeroCapacity);
        }
        let (tx, rx) = crossbeam_channel::bounded(options.queue_capacity);
        let stats = Arc::new(PipelineStats::new());
        let status = manager.status();

        let router = Router::new(registry, sink, Arc::clone(&stats));
        let consumer =
            Consumer::start(router, rx, options.consumer).map_err(|e| PipelineError::Spawn("consumer", e))?;
        let producer = Producer::start(manager, tx, Arc::clone(&stats), options.producer)
            .map_err(|e| PipelineError::Spawn("producer", e))?;

        info!(capacity = options.queue_capacity, "Pipeline started");
        Ok(Self {
            producer: Some(producer),
            consumer: Some(consumer),
            stats,
            status,
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn connection(&self) -> &StatusHandle {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.producer.as_ref().is_some_and(Producer::is_running)
            && self.consumer.as_ref().is_some_and(Consumer::is_running)
    }

    /// Stop the producer, then let the consumer drain what is queued and
    /// stop it too.
    pub fn stop(mut self) -> Result<Stopped<S>, PipelineError> {
        let manager = self
            .producer
            .take()
            .and_then(Producer::stop)
            .ok_or(PipelineError::WorkerPanicked("producer"))?;
        let sink = self
            .consumer
            .take()
            .and_then(Consumer::stop)
            .ok_or(PipelineError::WorkerPanicked("consumer"))?;
        let stats = self.stats.snapshot();
        info!(?stats, "Pipeline stopped");
        Ok(Stopped { manager, sink, stats })
    }
}

/// Push a captured stream through the consumer routing on the calling
/// thread. Lines are split on `\n`; a final unterminated line is kept.
pub fn replay<R: BufRead, S: RecordSink>(
    mut reader: R,
    router: &mut Router<S>,
    binary_threshold: f64,
) -> std::io::Result<StatsSnapshot> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let stats = router.stats();
        stats.read(buf.len());
        let unit = RawUnit::classify(buf.clone(), binary_threshold, Utc::now());
        match &unit {
            RawUnit::Line { .. } => stats.line(),
            RawUnit::Chunk {
                kind: ChunkKind::Binary,
                ..
            } => stats.binary_chunk(),
            RawUnit::Chunk {
                kind: ChunkKind::DecodeError,
                ..
            } => stats.decode_error(),
        }
        stats.published();
        router.process(unit);
    }
    router.flush();
    Ok(router.stats().snapshot())
}
