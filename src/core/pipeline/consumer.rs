//! Consumer: drains the queue and routes every unit to the sink
//!
//! Per unit, in order:
//! 1. undecodable chunks become `BINARY_DATA` / `DECODE_ERROR` errors
//! 2. blank lines are dropped without a trace
//! 3. checksum trailer is verified
//! 4. prefix is resolved in the registry
//! 5. the resolved parser builds the record

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use super::stats::PipelineStats;
use super::unit::{ChunkKind, RawUnit};
use crate::core::protocol::{checksum, ParserRegistry};
use crate::core::record::{ParseError, TypedRecord};
use crate::core::sink::RecordSink;

/// What a single unit turned into
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Record(TypedRecord),
    Error(ParseError),
    /// Blank line
    Dropped,
}

/// Classify one unit. Pure: no sink, no counters.
pub fn route(unit: RawUnit, registry: &ParserRegistry) -> Routed {
    let (text, received_at) = match unit {
        RawUnit::Chunk {
            bytes,
            kind: ChunkKind::Binary,
            received_at,
        } => return Routed::Error(ParseError::binary_data(&bytes, received_at)),
        RawUnit::Chunk {
            bytes,
            kind: ChunkKind::DecodeError,
            received_at,
        } => return Routed::Error(ParseError::decode_error(&bytes, received_at)),
        RawUnit::Line { text, received_at, .. } => (text, received_at),
    };

    let sentence = text.trim();
    if sentence.is_empty() {
        return Routed::Dropped;
    }

    let prefix = checksum::extract_prefix(sentence);
    if let Err(mismatch) = checksum::validate(sentence) {
        return Routed::Error(ParseError::checksum_failed(sentence, prefix, &mismatch, received_at));
    }

    let Some(parser) = registry.resolve(prefix) else {
        return Routed::Error(ParseError::unknown_type(sentence, prefix, received_at));
    };

    match parser.parse(sentence) {
        Ok(message) => {
            let (_, trailer) = checksum::split(sentence);
            Routed::Record(TypedRecord::new(message, sentence, trailer, received_at))
        }
        Err(e) => Routed::Error(ParseError::invalid_format(sentence, prefix, &e, received_at)),
    }
}

/// Routes units into a sink and keeps the counters current
pub struct Router<S: RecordSink> {
    registry: Arc<ParserRegistry>,
    sink: S,
    stats: Arc<PipelineStats>,
}

impl<S: RecordSink> Router<S> {
    pub fn new(registry: Arc<ParserRegistry>, sink: S, stats: Arc<PipelineStats>) -> Self {
        Self { registry, sink, stats }
    }

    /// Route one unit and hand the outcome to the sink. Sink failures are
    /// logged and counted, never propagated.
    pub fn process(&mut self, unit: RawUnit) {
        self.stats.consumed();
        match route(unit, &self.registry) {
            Routed::Record(record) => {
                self.stats.record();
                trace!(family = %record.family(), "Record");
                if let Err(e) = self.sink.on_record(record) {
                    self.stats.sink_failure();
                    error!(error = %e, "Sink failed to store record");
                }
            }
            Routed::Error(err) => {
                self.stats.error();
                debug!(kind = %err.error_kind, message = %err.message, "Unparseable unit");
                if let Err(e) = self.sink.on_error(err) {
                    self.stats.sink_failure();
                    error!(error = %e, "Sink failed to store parse error");
                }
            }
            Routed::Dropped => self.stats.dropped_empty(),
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.sink.flush() {
            self.stats.sink_failure();
            warn!(error = %e, "Sink flush failed");
        }
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Consumer thread timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerOptions {
    /// How long a queue wait lasts before the stop flag is re-checked
    pub poll_interval: Duration,
    /// Budget for draining queued units after stop
    pub drain_grace: Duration,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            drain_grace: Duration::from_secs(2),
        }
    }
}

/// The consumer thread
pub struct Consumer<S: RecordSink + 'static> {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<S>>,
}

impl<S: RecordSink + 'static> Consumer<S> {
    /// Spawn the consumer thread
    pub fn start(router: Router<S>, rx: Receiver<RawUnit>, options: ConsumerOptions) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("adcplink-consumer".into())
            .spawn(move || Self::run(router, &rx, &flag, options))?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    fn run(mut router: Router<S>, rx: &Receiver<RawUnit>, running: &AtomicBool, options: ConsumerOptions) -> S {
        info!("Consumer started");
        while running.load(Ordering::SeqCst) {
            match rx.recv_timeout(options.poll_interval) {
                Ok(unit) => router.process(unit),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // best-effort drain within the grace period
        let deadline = Instant::now() + options.drain_grace;
        let mut drained = 0usize;
        while Instant::now() < deadline {
            match rx.try_recv() {
                Ok(unit) => {
                    router.process(unit);
                    drained += 1;
                }
                Err(_) => break,
            }
        }
        if !rx.is_empty() {
            warn!(left = rx.len(), "Drain grace period elapsed with units still queued");
        }
        router.flush();
        info!(drained, "Consumer stopped");
        router.into_sink()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the thread to stop, then join it. Returns the sink, or `None` if
    /// the thread panicked.
    pub fn stop(mut self) -> Option<S> {
        self.running.store(false, Ordering::SeqCst);
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl<S: RecordSink + 'static> Drop for Consumer<S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::Family;
    use crate::core::record::ErrorKind;
    use crate::core::sink::{MemorySink, SinkError};
    use chrono::Utc;
    use crossbeam_channel::bounded;

    fn line(text: &str) -> RawUnit {
        RawUnit::classify(format!("{text}\r\n").into_bytes(), 0.1, Utc::now())
    }

    fn routed(text: &str) -> Routed {
        route(line(text), &ParserRegistry::with_defaults())
    }

    fn error_of(text: &str) -> ParseError {
        match routed(text) {
            Routed::Error(e) => e,
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_sentence_with_checksum() {
        let Routed::Record(record) = routed("$PNORI,4,Signature1000900001,4,20,0.20,1.00,0*1A") else {
            panic!("expected a record");
        };
        assert_eq!(record.family(), Family::Pnori);
        assert_eq!(record.checksum.as_deref(), Some("1A"));
        assert_eq!(record.sentence, "$PNORI,4,Signature1000900001,4,20,0.20,1.00,0*1A");
    }

    #[test]
    fn test_sentence_without_checksum_is_accepted() {
        assert!(matches!(routed("$PNORC4,4.5,3.519,110.9,6,28"), Routed::Record(_)));
    }

    #[test]
    fn test_checksum_failed() {
        let err = error_of("$PNORI,4,Signature1000900001,4,20,0.20,1.00,0*2E");
        assert_eq!(err.error_kind, ErrorKind::ChecksumFailed);
        assert_eq!(err.checksum_expected.as_deref(), Some("1A"));
        assert_eq!(err.checksum_actual.as_deref(), Some("2E"));
        assert_eq!(err.attempted_prefix.as_deref(), Some("PNORI"));
    }

    #[test]
    fn test_lower_case_checksum_is_accepted() {
        let text = Family::Pnorc4.parse("$PNORC4,4.5,3.519,110.9,6,28").unwrap().to_sentence();
        assert!(matches!(routed(&text.to_lowercase().replace("$pnorc4", "$PNORC4")), Routed::Record(_)));
    }

    #[test]
    fn test_unknown_type() {
        let err = error_of("$GPGGA,123519,4807.038,N");
        assert_eq!(err.error_kind, ErrorKind::UnknownType);
        assert_eq!(err.attempted_prefix.as_deref(), Some("GPGGA"));
    }

    #[test]
    fn test_invalid_format_keeps_text_and_prefix() {
        let err = error_of("$PNORI,4,Test,3,20,0.20,1.00,0");
        assert_eq!(err.error_kind, ErrorKind::InvalidFormat);
        assert_eq!(err.attempted_prefix.as_deref(), Some("PNORI"));
        assert_eq!(err.original_sentence, "$PNORI,4,Test,3,20,0.20,1.00,0");
        assert!(err.message.contains("beam"), "{}", err.message);
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        assert_eq!(routed(""), Routed::Dropped);
        assert_eq!(routed("   \t "), Routed::Dropped);
    }

    #[test]
    fn test_chunks_become_errors() {
        let registry = ParserRegistry::with_defaults();
        let binary = RawUnit::classify(vec![0xFF, 0x00, 0xFE, 0x01], 0.1, Utc::now());
        let Routed::Error(err) = route(binary, &registry) else {
            panic!("expected an error");
        };
        assert_eq!(err.error_kind, ErrorKind::BinaryData);
        assert_eq!(err.original_sentence, "FF00FE01");

        let mut raw = b"$PNORC4,4.5,3.519,110.9,6,28".to_vec();
        raw.push(0xE9);
        let Routed::Error(err) = route(RawUnit::classify(raw, 0.1, Utc::now()), &registry) else {
            panic!("expected an error");
        };
        assert_eq!(err.error_kind, ErrorKind::DecodeError);
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn on_record(&mut self, _record: TypedRecord) -> Result<(), SinkError> {
            Err(SinkError::Rejected("database down".into()))
        }

        fn on_error(&mut self, _error: ParseError) -> Result<(), SinkError> {
            Err(SinkError::Rejected("database down".into()))
        }
    }

    #[test]
    fn test_sink_failure_does_not_stop_routing() {
        let stats = Arc::new(PipelineStats::new());
        let mut router = Router::new(Arc::new(ParserRegistry::with_defaults()), FailingSink, Arc::clone(&stats));
        router.process(line("$PNORC4,4.5,3.519,110.9,6,28"));
        router.process(line("$XXX,1"));
        router.process(line(""));
        let snap = stats.snapshot();
        assert_eq!(snap.consumed, 3);
        assert_eq!(snap.records, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.dropped_empty, 1);
        assert_eq!(snap.sink_failures, 2);
    }

    #[test]
    fn test_consumer_drains_queue_on_stop() {
        let (tx, rx) = bounded(16);
        for _ in 0..10 {
            tx.send(line("$PNORC4,4.5,3.519,110.9,6,28")).unwrap();
        }
        let sink = MemorySink::new();
        let router = Router::new(
            Arc::new(ParserRegistry::with_defaults()),
            sink.clone(),
            Arc::new(PipelineStats::new()),
        );
        let consumer = Consumer::start(router, rx, ConsumerOptions::default()).unwrap();
        assert!(consumer.stop().is_some());
        assert_eq!(sink.records().len(), 10);
        drop(tx);
    }
}
