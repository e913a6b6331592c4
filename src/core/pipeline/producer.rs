//! Producer: reads the serial link and publishes raw units
//!
//! The producer is the only owner of the [`ConnectionManager`]. It
//! reconnects when the link is down, turns every non-empty read into a
//! [`RawUnit`] and pushes it with a blocking send, so a full queue stalls
//! reading instead of dropping data.

use chrono::Utc;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, trace, warn};

use super::stats::PipelineStats;
use super::unit::{ChunkKind, RawUnit};
use crate::core::protocol::checksum::DEFAULT_BINARY_THRESHOLD;
use crate::core::transport::ConnectionManager;

/// Reconnect behaviour of the producer loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub backoff_base: f64,
    /// Pause after an exhausted cycle before starting a new one
    pub retry_pause: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: 2.0,
            retry_pause: Duration::from_secs(5),
        }
    }
}

/// Producer settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProducerOptions {
    pub reconnect: ReconnectPolicy,
    pub binary_threshold: f64,
    /// Per-read timeout override; `None` uses the port's configured timeout
    pub read_timeout: Option<Duration>,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            binary_threshold: DEFAULT_BINARY_THRESHOLD,
            read_timeout: None,
        }
    }
}

/// The producer thread
pub struct Producer {
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<ConnectionManager>>,
}

impl Producer {
    /// Spawn the producer thread
    pub fn start(
        mut manager: ConnectionManager,
        tx: Sender<RawUnit>,
        stats: Arc<PipelineStats>,
        options: ProducerOptions,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let cancel = Arc::new(AtomicBool::new(false));
        manager.set_cancel_flag(Arc::clone(&cancel));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("adcplink-producer".into())
            .spawn(move || Self::run(manager, &tx, &stats, &flag, options))?;
        Ok(Self {
            running,
            cancel,
            handle: Some(handle),
        })
    }

    fn run(
        mut manager: ConnectionManager,
        tx: &Sender<RawUnit>,
        stats: &PipelineStats,
        running: &AtomicBool,
        options: ProducerOptions,
    ) -> ConnectionManager {
        info!(port = %manager.settings().port, "Producer started");
        let policy = options.reconnect;
        let mut ever_connected = manager.is_connected();

        while running.load(Ordering::SeqCst) {
            if !manager.is_connected() {
                if manager.reconnect(policy.max_retries, policy.backoff_base) {
                    if ever_connected {
                        stats.reconnected();
                    }
                    ever_connected = true;
                    continue;
                }
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                error!(
                    port = %manager.settings().port,
                    retries = policy.max_retries,
                    pause = ?policy.retry_pause,
                    "Could not reach instrument, pausing before the next attempt"
                );
                manager.pause(policy.retry_pause);
                continue;
            }

            let Some(raw) = manager.read_line(options.read_timeout) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            stats.read(raw.len());

            let unit = RawUnit::classify(raw, options.binary_threshold, Utc::now());
            match &unit {
                RawUnit::Line { .. } => stats.line(),
                RawUnit::Chunk {
                    kind: ChunkKind::Binary,
                    bytes,
                    ..
                } => {
                    stats.binary_chunk();
                    trace!(len = bytes.len(), "Binary chunk");
                }
                RawUnit::Chunk {
                    kind: ChunkKind::DecodeError,
                    bytes,
                    ..
                } => {
                    stats.decode_error();
                    trace!(len = bytes.len(), "Undecodable line");
                }
            }

            if tx.send(unit).is_err() {
                warn!("Queue closed, producer exiting");
                break;
            }
            stats.published();
        }

        manager.disconnect();
        manager.clear_cancel_flag();
        info!("Producer stopped");
        manager
    }

    // the cancel flag also cuts short a backoff wait inside the manager
    fn signal_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Clear the run flag and join. Returns the connection manager, or
    /// `None` if the thread panicked.
    pub fn stop(mut self) -> Option<ConnectionManager> {
        self.signal_stop();
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
