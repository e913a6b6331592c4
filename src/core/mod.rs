//! Core functionality
//!
//! Transport, protocol decoding, the acquisition pipeline and its outputs.

pub mod pipeline;
pub mod protocol;
pub mod record;
pub mod sink;
pub mod transport;
