//! Sentence protocol
//!
//! Provides the pieces the consumer chains together for every line:
//! - Checksum codec (XOR trailer, prefix extraction, binary noise detection)
//! - Sentence framing (positional, counted and tagged fields)
//! - PNORx family parsers and serializers
//! - Prefix to parser registry

pub mod checksum;
pub mod fields;
pub mod pnor;
pub mod registry;
pub mod sentence;

pub use checksum::ChecksumMismatch;
pub use fields::{FormatError, FormatResult};
pub use pnor::{Family, Message, RecordKind};
pub use registry::{ParserRegistry, SentenceParser};
pub use sentence::Sentence;
