//! Serial transport
//!
//! The connection manager never talks to `serialport` directly. It goes
//! through two seams so the reconnect and framing logic can run against
//! scripted ports:
//! - [`PortOpener`] opens a device from [`SerialSettings`]
//! - [`SerialIo`] is the opened handle: blocking reads plus a timeout knob

mod manager;
mod serial;

pub use manager::{ConnectionManager, ConnectionState, ConnectionStatus, StatusHandle, DEFAULT_MAX_BACKOFF};
pub use serial::{list_ports, FlowControl, Parity, SerialSettings, SystemPortOpener};

use std::io::{self, Read};
use std::time::Duration;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Device path does not exist
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Any other open failure
    #[error("Failed to open {port}: {reason}")]
    OpenFailed {
        /// Device path
        port: String,
        /// Driver message
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An opened serial handle
pub trait SerialIo: Read + Send {
    /// Change the blocking read timeout
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl SerialIo for Box<dyn serialport::SerialPort> {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        serialport::SerialPort::set_timeout(self.as_mut(), timeout).map_err(io::Error::from)
    }
}

/// Opens serial devices
#[cfg_attr(test, mockall::automock)]
pub trait PortOpener: Send {
    /// Open the device described by `settings`
    fn open(&mut self, settings: &SerialSettings) -> Result<Box<dyn SerialIo>, ConnectionError>;
}
