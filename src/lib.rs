//! # adcplink Core Library
//!
//! Acquisition of Nortek PNOR telemetry from serial-connected ADCPs:
//! - Serial link management with reconnect-with-backoff
//! - Producer/consumer pipeline over a bounded queue
//! - Checksum validation and typed parsing of every PNOR family
//! - Pluggable record sinks
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use adcplink_core::core::pipeline::{Pipeline, PipelineOptions};
//! use adcplink_core::core::protocol::ParserRegistry;
//! use adcplink_core::core::sink::JsonLinesSink;
//! use adcplink_core::core::transport::{ConnectionManager, SerialSettings, SystemPortOpener};
//!
//! fn main() -> anyhow::Result<()> {
//!     let manager = ConnectionManager::new(SerialSettings::new("/dev/ttyUSB0", 9600), Box::new(SystemPortOpener));
//!     let registry = Arc::new(ParserRegistry::with_defaults());
//!     let pipeline = Pipeline::start(manager, registry, JsonLinesSink::stdout(), PipelineOptions::default())?;
//!
//!     std::thread::sleep(std::time::Duration::from_secs(10));
//!     let stopped = pipeline.stop()?;
//!     println!("{:?}", stopped.stats);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::config::AppConfig;
pub use crate::core::pipeline::{Pipeline, PipelineOptions, PipelineStats, StatsSnapshot};
pub use crate::core::protocol::{Family, Message, ParserRegistry, RecordKind};
pub use crate::core::record::{ErrorKind, ParseError, TypedRecord};
pub use crate::core::sink::{JsonLinesSink, MemorySink, RecordSink};
pub use crate::core::transport::{ConnectionManager, ConnectionState, SerialSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
