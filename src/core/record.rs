//! Values handed to the sink: decoded records and classified failures

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use super::protocol::checksum::ChecksumMismatch;
use super::protocol::{Family, FormatError, Message, RecordKind};

/// A successfully decoded sentence
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    pub message: Message,
    /// Sentence text as received, line terminator removed
    pub sentence: String,
    /// Checksum trailer as received, if any
    pub checksum: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl TypedRecord {
    pub fn new(message: Message, sentence: impl Into<String>, checksum: Option<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            message,
            sentence: sentence.into(),
            checksum,
            received_at,
        }
    }

    pub fn family(&self) -> Family {
        self.message.family()
    }

    /// Routing family for family-based storage
    pub fn kind(&self) -> RecordKind {
        self.message.kind()
    }
}

/// Flat JSON shape of a record; `kind` is always taken from the message
#[derive(Serialize)]
struct RecordView<'a> {
    kind: RecordKind,
    #[serde(flatten)]
    message: &'a Message,
    sentence: &'a str,
    checksum: Option<&'a str>,
    received_at: &'a DateTime<Utc>,
}

impl Serialize for TypedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RecordView {
            kind: self.kind(),
            message: &self.message,
            sentence: &self.sentence,
            checksum: self.checksum.as_deref(),
            received_at: &self.received_at,
        }
        .serialize(serializer)
    }
}

/// Failure classes reported through [`ParseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bytes that are not text and are not mostly printable
    BinaryData,
    /// Bytes that failed to decode but look like text
    DecodeError,
    ChecksumFailed,
    UnknownType,
    InvalidFormat,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BinaryData => "BINARY_DATA",
            ErrorKind::DecodeError => "DECODE_ERROR",
            ErrorKind::ChecksumFailed => "CHECKSUM_FAILED",
            ErrorKind::UnknownType => "UNKNOWN_TYPE",
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An input unit that did not become a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{error_kind}: {message}")]
pub struct ParseError {
    /// Sentence text, or upper-case hex of the raw bytes for undecodable chunks
    pub original_sentence: String,
    pub error_kind: ErrorKind,
    pub message: String,
    pub attempted_prefix: Option<String>,
    pub checksum_expected: Option<String>,
    pub checksum_actual: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl ParseError {
    fn new(original_sentence: String, error_kind: ErrorKind, message: String, received_at: DateTime<Utc>) -> Self {
        Self {
            original_sentence,
            error_kind,
            message,
            attempted_prefix: None,
            checksum_expected: None,
            checksum_actual: None,
            received_at,
        }
    }

    pub fn binary_data(bytes: &[u8], received_at: DateTime<Utc>) -> Self {
        Self::new(
            hex::encode_upper(bytes),
            ErrorKind::BinaryData,
            format!("{} bytes of binary data", bytes.len()),
            received_at,
        )
    }

    pub fn decode_error(bytes: &[u8], received_at: DateTime<Utc>) -> Self {
        let message = match std::str::from_utf8(bytes) {
            Err(e) => format!("invalid UTF-8: {e}"),
            Ok(_) => "line could not be decoded".to_string(),
        };
        Self::new(hex::encode_upper(bytes), ErrorKind::DecodeError, message, received_at)
    }

    pub fn checksum_failed(sentence: &str, prefix: &str, mismatch: &ChecksumMismatch, received_at: DateTime<Utc>) -> Self {
        Self {
            attempted_prefix: non_empty(prefix),
            checksum_expected: Some(mismatch.expected.clone()),
            checksum_actual: Some(mismatch.actual.clone()),
            ..Self::new(sentence.to_string(), ErrorKind::ChecksumFailed, mismatch.to_string(), received_at)
        }
    }

    pub fn unknown_type(sentence: &str, prefix: &str, received_at: DateTime<Utc>) -> Self {
        let message = if prefix.is_empty() {
            "sentence has no type prefix".to_string()
        } else {
            format!("no parser registered for {prefix}")
        };
        Self {
            attempted_prefix: non_empty(prefix),
            ..Self::new(sentence.to_string(), ErrorKind::UnknownType, message, received_at)
        }
    }

    pub fn invalid_format(sentence: &str, prefix: &str, error: &FormatError, received_at: DateTime<Utc>) -> Self {
        Self {
            attempted_prefix: non_empty(prefix),
            ..Self::new(sentence.to_string(), ErrorKind::InvalidFormat, error.to_string(), received_at)
        }
    }
}

fn non_empty(prefix: &str) -> Option<String> {
    (!prefix.is_empty()).then(|| prefix.to_string())
}
