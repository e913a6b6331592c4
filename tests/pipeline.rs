//! End-to-end pipeline tests over a scripted in-memory serial port

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use adcplink_core::core::pipeline::{ConsumerOptions, Pipeline, PipelineOptions};
use adcplink_core::core::record::{ErrorKind, ParseError, TypedRecord};
use adcplink_core::core::sink::{MemorySink, RecordSink, SinkError};
use adcplink_core::core::transport::{
    ConnectionError, ConnectionManager, PortOpener, SerialIo, SerialSettings,
};
use adcplink_core::{Family, ParserRegistry};

enum Step {
    Data(Vec<u8>),
    Fault,
}

/// Plays back a fixed script, then times out forever
struct ScriptedPort {
    steps: VecDeque<Step>,
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            Some(Step::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.steps.push_front(Step::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Fault) => Err(io::Error::new(io::ErrorKind::BrokenPipe, "cable pulled")),
            None => {
                std::thread::sleep(Duration::from_millis(5));
                Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
            }
        }
    }
}

impl SerialIo for ScriptedPort {
    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

/// Hands out one scripted port per successful open
struct ScriptedOpener {
    ports: VecDeque<ScriptedPort>,
    opens: Arc<AtomicUsize>,
}

impl PortOpener for ScriptedOpener {
    fn open(&mut self, settings: &SerialSettings) -> Result<Box<dyn SerialIo>, ConnectionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.ports.pop_front() {
            Some(port) => Ok(Box::new(port)),
            None => Err(ConnectionError::PortNotFound(settings.port.clone())),
        }
    }
}

fn manager(scripts: Vec<Vec<Step>>) -> (ConnectionManager, Arc<AtomicUsize>) {
    let opens = Arc::new(AtomicUsize::new(0));
    let opener = ScriptedOpener {
        ports: scripts
            .into_iter()
            .map(|steps| ScriptedPort { steps: steps.into() })
            .collect(),
        opens: Arc::clone(&opens),
    };
    let manager = ConnectionManager::new(SerialSettings::new("/dev/ttyTEST", 9600), Box::new(opener))
        .with_sleeper(|_| std::thread::sleep(Duration::from_millis(1)));
    (manager, opens)
}

fn line(text: &str) -> Step {
    Step::Data(format!("{text}\r\n").into_bytes())
}

fn current_sentence(i: usize) -> String {
    format!("$PNORC4,{i}.5,3.519,110.9,6,28")
}

fn wait_for(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn registry() -> Arc<ParserRegistry> {
    Arc::new(ParserRegistry::with_defaults())
}

fn options(queue_capacity: usize) -> PipelineOptions {
    PipelineOptions {
        queue_capacity,
        consumer: ConsumerOptions {
            poll_interval: Duration::from_millis(10),
            ..ConsumerOptions::default()
        },
        ..PipelineOptions::default()
    }
}

/// Blocks each record until a token arrives on the gate
struct GatedSink {
    gate: Receiver<()>,
    inner: MemorySink,
}

impl RecordSink for GatedSink {
    fn on_record(&mut self, record: TypedRecord) -> Result<(), SinkError> {
        self.gate
            .recv()
            .map_err(|_| SinkError::Rejected("gate closed".into()))?;
        self.inner.on_record(record)
    }

    fn on_error(&mut self, error: ParseError) -> Result<(), SinkError> {
        self.inner.on_error(error)
    }
}

fn gated() -> (GatedSink, Sender<()>, MemorySink) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let inner = MemorySink::new();
    (
        GatedSink {
            gate: rx,
            inner: inner.clone(),
        },
        tx,
        inner,
    )
}

#[test]
fn test_records_arrive_in_read_order() {
    let steps = (0..50).map(|i| line(&current_sentence(i))).collect();
    let (manager, _) = manager(vec![steps]);
    let sink = MemorySink::new();

    let pipeline = Pipeline::start(manager, registry(), sink.clone(), options(8)).unwrap();
    wait_for("50 records", || sink.len() == 50);
    let stopped = pipeline.stop().unwrap();

    let sentences: Vec<String> = sink.records().into_iter().map(|r| r.sentence).collect();
    let expected: Vec<String> = (0..50).map(current_sentence).collect();
    assert_eq!(sentences, expected);
    assert!(sink.records().iter().all(|r| r.family() == Family::Pnorc4));

    assert_eq!(stopped.stats.lines_read, 50);
    assert_eq!(stopped.stats.published, 50);
    assert_eq!(stopped.stats.consumed, 50);
    assert_eq!(stopped.stats.records, 50);
    assert_eq!(stopped.stats.in_flight(), 0);
}

#[test]
fn test_full_queue_blocks_the_producer() {
    let steps = (0..10).map(|i| line(&current_sentence(i))).collect();
    let (manager, _) = manager(vec![steps]);
    let (sink, gate, seen) = gated();

    let pipeline = Pipeline::start(manager, registry(), sink, options(2)).unwrap();

    // two queued plus the one the consumer is holding
    wait_for("queue to fill", || pipeline.stats().published == 3);
    std::thread::sleep(Duration::from_millis(100));
    let stats = pipeline.stats();
    assert_eq!(stats.published, 3);
    assert_eq!(stats.records, 1);
    assert!(seen.is_empty());

    for _ in 0..10 {
        gate.send(()).unwrap();
    }
    wait_for("all records", || seen.len() == 10);
    let stopped = pipeline.stop().unwrap();

    assert_eq!(stopped.stats.published, 10);
    assert_eq!(stopped.stats.sink_failures, 0);
    let sentences: Vec<String> = seen.records().into_iter().map(|r| r.sentence).collect();
    assert_eq!(sentences, (0..10).map(current_sentence).collect::<Vec<_>>());
}

#[test]
fn test_stop_drains_queued_units() {
    let steps = (0..20).map(|i| line(&current_sentence(i))).collect();
    let (manager, _) = manager(vec![steps]);
    let (sink, gate, seen) = gated();

    let pipeline = Pipeline::start(manager, registry(), sink, options(32)).unwrap();
    wait_for("all units published", || pipeline.stats().published == 20);
    assert!(seen.is_empty());

    // tokens arrive only after stop has been requested
    let release = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        for _ in 0..20 {
            if gate.send(()).is_err() {
                break;
            }
        }
    });
    let stopped = pipeline.stop().unwrap();
    release.join().unwrap();

    assert_eq!(seen.len(), 20);
    assert_eq!(stopped.stats.consumed, 20);
    assert_eq!(stopped.stats.in_flight(), 0);
}

#[test]
fn test_reconnects_after_read_fault() {
    let first = vec![
        line(&current_sentence(0)),
        line(&current_sentence(1)),
        Step::Fault,
    ];
    let second = vec![line(&current_sentence(2)), line(&current_sentence(3))];
    let (manager, opens) = manager(vec![first, second]);
    let sink = MemorySink::new();

    let pipeline = Pipeline::start(manager, registry(), sink.clone(), options(8)).unwrap();
    wait_for("records from both connections", || sink.len() == 4);
    let stopped = pipeline.stop().unwrap();

    assert_eq!(opens.load(Ordering::SeqCst), 2);
    assert_eq!(stopped.stats.reconnects, 1);
    let sentences: Vec<String> = sink.records().into_iter().map(|r| r.sentence).collect();
    assert_eq!(sentences, (0..4).map(current_sentence).collect::<Vec<_>>());
    assert!(!stopped.manager.is_connected());
}

#[test]
fn test_partial_line_survives_timeouts() {
    let steps = vec![
        Step::Data(b"$PNORC4,4.5,3.5".to_vec()),
        Step::Data(b"19,110.9,6,28*4C\r\n".to_vec()),
    ];
    let (manager, _) = manager(vec![steps]);
    let sink = MemorySink::new();

    let pipeline = Pipeline::start(manager, registry(), sink.clone(), options(8)).unwrap();
    wait_for("record", || sink.len() == 1);
    pipeline.stop().unwrap();

    let record = &sink.records()[0];
    assert_eq!(record.sentence, "$PNORC4,4.5,3.519,110.9,6,28*4C");
    assert_eq!(record.checksum.as_deref(), Some("4C"));
}

#[test]
fn test_every_failure_becomes_an_error_record() {
    let mut decode_error = b"$PNORC4,1.5,3.5".to_vec();
    decode_error.push(0xFF);
    decode_error.extend_from_slice(b",110.9,6,28\r\n");

    let steps = vec![
        line("$PNORC4,4.5,3.519,110.9,6,28*4C"),
        Step::Data(vec![0xFF, 0xFE, 0x00, 0x01, 0x02, b'\n']),
        Step::Data(decode_error),
        line(""),
        line("$PNORC4,4.5,3.519,110.9,6,28*00"),
        line("$GPGGA,123519,4807.038,N"),
        line("$PNORC4,4.5,3.519,400.0,6,28"),
    ];
    let (manager, _) = manager(vec![steps]);
    let sink = MemorySink::new();

    let pipeline = Pipeline::start(manager, registry(), sink.clone(), options(8)).unwrap();
    wait_for("all units", || sink.len() == 6);
    let stopped = pipeline.stop().unwrap();

    let kinds: Vec<ErrorKind> = sink.errors().iter().map(|e| e.error_kind).collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::BinaryData,
            ErrorKind::DecodeError,
            ErrorKind::ChecksumFailed,
            ErrorKind::UnknownType,
            ErrorKind::InvalidFormat,
        ]
    );
    assert_eq!(sink.records().len(), 1);
    assert_eq!(stopped.stats.binary_chunks, 1);
    assert_eq!(stopped.stats.decode_errors, 1);
    assert_eq!(stopped.stats.dropped_empty, 1);
    assert_eq!(stopped.stats.errors, 5);
}
