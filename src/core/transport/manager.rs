//! Connection lifecycle: connect, disconnect, reconnect with backoff and
//! line-oriented blocking reads.

use super::{ConnectionError, PortOpener, SerialIo, SerialSettings};
use parking_lot::RwLock;
use serde::Serialize;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bound on a single backoff delay
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Longest line buffered before it is handed out without a terminator
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

const READ_CHUNK: usize = 256;
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Reconnecting,
    /// Retries exhausted
    Failed,
}

/// Read-only view of the connection, published for observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub state: ConnectionState,
    /// Consecutive failed open attempts
    pub failure_count: u32,
}

/// Shared handle to the latest [`ConnectionStatus`]
#[derive(Debug, Clone)]
pub struct StatusHandle(Arc<RwLock<ConnectionStatus>>);

impl StatusHandle {
    pub fn get(&self) -> ConnectionStatus {
        self.0.read().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.0.read().state
    }
}

type Sleeper = Box<dyn FnMut(Duration) + Send>;

/// Owns the serial handle. Only the producer thread drives it.
pub struct ConnectionManager {
    settings: SerialSettings,
    opener: Box<dyn PortOpener>,
    port: Option<Box<dyn SerialIo>>,
    applied_timeout: Option<Duration>,
    pending: Vec<u8>,
    max_line_length: usize,
    max_backoff: Duration,
    sleeper: Option<Sleeper>,
    cancel: Option<Arc<AtomicBool>>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl ConnectionManager {
    pub fn new(settings: SerialSettings, opener: Box<dyn PortOpener>) -> Self {
        let status = ConnectionStatus {
            port: settings.port.clone(),
            baud_rate: settings.baud_rate,
            timeout_ms: settings.timeout_ms,
            state: ConnectionState::Disconnected,
            failure_count: 0,
        };
        Self {
            settings,
            opener,
            port: None,
            applied_timeout: None,
            pending: Vec::new(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_backoff: DEFAULT_MAX_BACKOFF,
            sleeper: None,
            cancel: None,
            status: Arc::new(RwLock::new(status)),
        }
    }

    /// Cap for a single backoff delay
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Longest unterminated line kept in the buffer
    #[must_use]
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length.max(1);
        self
    }

    /// Replace the backoff sleep, e.g. to record delays in tests
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl FnMut(Duration) + Send + 'static) -> Self {
        self.sleeper = Some(Box::new(sleeper));
        self
    }

    /// Abort backoff waits and reconnect cycles once `flag` is set
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    pub fn clear_cancel_flag(&mut self) {
        self.cancel = None;
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    pub fn status(&self) -> StatusHandle {
        StatusHandle(Arc::clone(&self.status))
    }

    pub fn state(&self) -> ConnectionState {
        self.status.read().state
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn set_state(&self, state: ConnectionState) {
        self.status.write().state = state;
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::SeqCst))
    }

    /// Open the device. Expected open failures are logged and reported as
    /// `false`.
    pub fn connect(&mut self) -> bool {
        if self.port.is_some() {
            return true;
        }
        match self.opener.open(&self.settings) {
            Ok(port) => {
                self.port = Some(port);
                self.applied_timeout = Some(self.settings.read_timeout());
                self.pending.clear();
                let mut status = self.status.write();
                status.state = ConnectionState::Connected;
                status.failure_count = 0;
                info!("Connected to {}", self.settings);
                true
            }
            Err(e) => {
                self.status.write().failure_count += 1;
                warn!(port = %self.settings.port, error = %e, "Failed to open serial port");
                false
            }
        }
    }

    /// Drop the handle. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if self.port.take().is_some() {
            info!(port = %self.settings.port, "Disconnected");
        }
        self.applied_timeout = None;
        self.pending.clear();
        let mut status = self.status.write();
        if status.state == ConnectionState::Connected {
            status.state = ConnectionState::Disconnected;
        }
    }

    /// Delay before retrying after failed attempt `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32, backoff_base: f64) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = backoff_base.powi(exp);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Disconnect and retry [`connect`](Self::connect) up to `max_retries`
    /// times, sleeping `min(backoff_base^attempt, max_backoff)` between
    /// attempts. Returns `false` once retries are exhausted.
    pub fn reconnect(&mut self, max_retries: u32, backoff_base: f64) -> bool {
        self.disconnect();
        self.set_state(ConnectionState::Reconnecting);

        for attempt in 0..max_retries {
            if self.cancelled() {
                self.set_state(ConnectionState::Disconnected);
                return false;
            }
            debug!(attempt = attempt + 1, max_retries, "Reconnect attempt");
            if self.connect() {
                info!(attempt = attempt + 1, "Reconnected");
                return true;
            }
            if attempt + 1 < max_retries {
                let delay = self.backoff_delay(attempt, backoff_base);
                debug!(?delay, "Backing off");
                self.pause(delay);
            }
        }

        warn!(port = %self.settings.port, max_retries, "Reconnect retries exhausted");
        self.set_state(ConnectionState::Failed);
        false
    }

    /// Sleep for `delay`, waking early when cancelled
    pub fn pause(&mut self, delay: Duration) {
        if let Some(sleeper) = self.sleeper.as_mut() {
            sleeper(delay);
            return;
        }
        let deadline = Instant::now() + delay;
        loop {
            if self.cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }

    /// Block until a full line (terminator included) is available or the
    /// read times out.
    ///
    /// Returns `None` on timeout, when disconnected, or after an I/O fault;
    /// a fault also drops the handle. Partial lines survive timeouts. A line
    /// that grows past the length limit without a terminator is returned
    /// as-is.
    pub fn read_line(&mut self, timeout: Option<Duration>) -> Option<Vec<u8>> {
        if let Some(line) = self.take_line() {
            return Some(line);
        }
        self.port.as_ref()?;

        let wanted = timeout.unwrap_or_else(|| self.settings.read_timeout());
        if self.applied_timeout != Some(wanted) {
            let result = self.port.as_mut().map(|p| p.set_timeout(wanted));
            match result {
                Some(Ok(())) => self.applied_timeout = Some(wanted),
                Some(Err(e)) => {
                    self.fault(&e);
                    return None;
                }
                None => return None,
            }
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let port = self.port.as_mut()?;
            match port.read(&mut chunk) {
                Ok(0) => {
                    self.fault(&std::io::Error::new(ErrorKind::UnexpectedEof, "port closed"));
                    return None;
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if let Some(line) = self.take_line() {
                        return Some(line);
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => return None,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.fault(&e);
                    return None;
                }
            }
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let rest = self.pending.split_off(pos + 1);
            return Some(std::mem::replace(&mut self.pending, rest));
        }
        if self.pending.len() >= self.max_line_length {
            let rest = self.pending.split_off(self.max_line_length);
            return Some(std::mem::replace(&mut self.pending, rest));
        }
        None
    }

    fn fault(&mut self, error: &std::io::Error) {
        warn!(port = %self.settings.port, %error, "Serial read failed, dropping connection");
        self.disconnect();
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::MockPortOpener;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::io::{self, Read};

    /// Serves scripted reads, then times out forever
    struct ScriptedPort {
        reads: VecDeque<io::Result<Vec<u8>>>,
        timeouts: Arc<Mutex<Vec<Duration>>>,
    }

    impl ScriptedPort {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                timeouts: Arc::default(),
            }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(data)) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(ErrorKind::TimedOut, "timeout")),
            }
        }
    }

    impl SerialIo for ScriptedPort {
        fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.timeouts.lock().push(timeout);
            Ok(())
        }
    }

    fn settings() -> SerialSettings {
        SerialSettings::new("/dev/ttyTEST", 9600)
    }

    fn opener_with(reads: Vec<io::Result<Vec<u8>>>) -> MockPortOpener {
        let mut opener = MockPortOpener::new();
        let mut reads = Some(reads);
        opener
            .expect_open()
            .returning(move |_| Ok(Box::new(ScriptedPort::new(reads.take().unwrap_or_default())) as Box<dyn SerialIo>));
        opener
    }

    fn failing_then_ok(failures: usize) -> MockPortOpener {
        let mut opener = MockPortOpener::new();
        let mut calls = 0;
        opener.expect_open().returning(move |s| {
            calls += 1;
            if calls <= failures {
                Err(ConnectionError::PortNotFound(s.port.clone()))
            } else {
                Ok(Box::new(ScriptedPort::new(vec![])) as Box<dyn SerialIo>)
            }
        });
        opener
    }

    fn recording(manager: ConnectionManager) -> (ConnectionManager, Arc<Mutex<Vec<Duration>>>) {
        let delays: Arc<Mutex<Vec<Duration>>> = Arc::default();
        let sink = Arc::clone(&delays);
        (manager.with_sleeper(move |d| sink.lock().push(d)), delays)
    }

    #[test]
    fn test_connect_and_idempotent_disconnect() {
        let mut manager = ConnectionManager::new(settings(), Box::new(opener_with(vec![])));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.connect());
        assert!(manager.is_connected());
        assert_eq!(manager.status().state(), ConnectionState::Connected);
        manager.disconnect();
        manager.disconnect();
        assert!(!manager.is_connected());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_failure_returns_false() {
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .times(1)
            .returning(|s| Err(ConnectionError::PermissionDenied(s.port.clone())));
        let mut manager = ConnectionManager::new(settings(), Box::new(opener));
        assert!(!manager.connect());
        assert_eq!(manager.status().get().failure_count, 1);
    }

    #[test]
    fn test_reconnect_after_k_failures() {
        let (mut manager, delays) = recording(ConnectionManager::new(settings(), Box::new(failing_then_ok(3))));
        assert!(manager.reconnect(5, 2.0));
        assert_eq!(
            *delays.lock(),
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.status().get().failure_count, 0);
    }

    #[test]
    fn test_reconnect_exhausted() {
        let (mut manager, delays) = recording(ConnectionManager::new(settings(), Box::new(failing_then_ok(3))));
        assert!(!manager.reconnect(3, 2.0));
        assert_eq!(manager.state(), ConnectionState::Failed);
        assert_eq!(delays.lock().len(), 2);
        assert_eq!(manager.status().get().failure_count, 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let manager = ConnectionManager::new(settings(), Box::new(MockPortOpener::new()));
        assert_eq!(manager.backoff_delay(0, 2.0), Duration::from_secs(1));
        assert_eq!(manager.backoff_delay(5, 2.0), Duration::from_secs(32));
        assert_eq!(manager.backoff_delay(6, 2.0), DEFAULT_MAX_BACKOFF);
        assert_eq!(manager.backoff_delay(400, 10.0), DEFAULT_MAX_BACKOFF);

        let manager = manager.with_max_backoff(Duration::from_secs(5));
        assert_eq!(manager.backoff_delay(3, 2.0), Duration::from_secs(5));
    }

    #[test]
    fn test_cancelled_reconnect_stops_early() {
        let mut opener = MockPortOpener::new();
        opener.expect_open().never();
        let mut manager = ConnectionManager::new(settings(), Box::new(opener));
        manager.set_cancel_flag(Arc::new(AtomicBool::new(true)));
        assert!(!manager.reconnect(5, 2.0));
    }

    #[test]
    fn test_read_line_joins_partial_reads() {
        let reads = vec![
            Ok(b"$PNORC4,4.5,".to_vec()),
            Ok(b"3.519,110.9,6,28\r\n$PNO".to_vec()),
            Ok(b"RH4,111412,081946,0,0\r\n".to_vec()),
        ];
        let mut manager = ConnectionManager::new(settings(), Box::new(opener_with(reads)));
        assert!(manager.connect());
        assert_eq!(manager.read_line(None).unwrap(), b"$PNORC4,4.5,3.519,110.9,6,28\r\n");
        assert_eq!(manager.read_line(None).unwrap(), b"$PNORH4,111412,081946,0,0\r\n");
        assert_eq!(manager.read_line(None), None);
        assert!(manager.is_connected());
    }

    #[test]
    fn test_partial_line_survives_timeout() {
        let reads = vec![
            Ok(b"$PNORC4,4.5,".to_vec()),
            Err(io::Error::new(ErrorKind::TimedOut, "timeout")),
            Ok(b"3.519,110.9,6,28\n".to_vec()),
        ];
        let mut manager = ConnectionManager::new(settings(), Box::new(opener_with(reads)));
        assert!(manager.connect());
        assert_eq!(manager.read_line(None), None);
        assert_eq!(manager.read_line(None).unwrap(), b"$PNORC4,4.5,3.519,110.9,6,28\n");
    }

    #[test]
    fn test_io_fault_disconnects() {
        let reads = vec![Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged"))];
        let mut manager = ConnectionManager::new(settings(), Box::new(opener_with(reads)));
        assert!(manager.connect());
        assert_eq!(manager.read_line(None), None);
        assert!(!manager.is_connected());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.read_line(None), None);
    }

    #[test]
    fn test_overlong_line_is_flushed() {
        let reads = vec![Ok(vec![b'A'; 200])];
        let mut manager =
            ConnectionManager::new(settings(), Box::new(opener_with(reads))).with_max_line_length(64);
        assert!(manager.connect());
        for _ in 0..3 {
            assert_eq!(manager.read_line(None).unwrap().len(), 64);
        }
        assert_eq!(manager.read_line(None), None);
    }

    #[test]
    fn test_timeout_override_is_applied() {
        let port = ScriptedPort::new(vec![]);
        let timeouts = Arc::clone(&port.timeouts);
        let mut port = Some(port);
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .times(1)
            .returning(move |_| Ok(Box::new(port.take().unwrap()) as Box<dyn SerialIo>));
        let mut manager = ConnectionManager::new(settings(), Box::new(opener));
        assert!(manager.connect());
        manager.read_line(Some(Duration::from_millis(50)));
        manager.read_line(Some(Duration::from_millis(50)));
        manager.read_line(None);
        assert_eq!(
            *timeouts.lock(),
            vec![Duration::from_millis(50), Duration::from_secs(1)]
        );
    }
}
