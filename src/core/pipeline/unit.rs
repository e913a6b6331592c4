//! Units passed from the producer to the consumer

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::core::protocol::checksum;

/// Why a chunk could not be turned into a text line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Mostly non-text bytes
    Binary,
    /// Text-like bytes that are not valid UTF-8
    DecodeError,
}

/// One read from the serial link. Moved through the queue, consumed once.
#[derive(Debug, Clone, PartialEq)]
pub enum RawUnit {
    Line {
        /// Decoded text with the line terminator removed
        text: String,
        /// Bytes as read, terminator included
        bytes: Bytes,
        received_at: DateTime<Utc>,
    },
    Chunk {
        bytes: Bytes,
        kind: ChunkKind,
        received_at: DateTime<Utc>,
    },
}

impl RawUnit {
    /// Decode a raw read, classifying it as a line or an undecodable chunk
    pub fn classify(raw: Vec<u8>, binary_threshold: f64, received_at: DateTime<Utc>) -> Self {
        match String::from_utf8(raw) {
            Ok(mut text) => {
                let bytes = Bytes::copy_from_slice(text.as_bytes());
                let trimmed = text.trim_end_matches(['\r', '\n']).len();
                text.truncate(trimmed);
                RawUnit::Line {
                    text,
                    bytes,
                    received_at,
                }
            }
            Err(e) => {
                let bytes = Bytes::from(e.into_bytes());
                let kind = if checksum::is_binary(&bytes, binary_threshold) {
                    ChunkKind::Binary
                } else {
                    ChunkKind::DecodeError
                };
                RawUnit::Chunk {
                    bytes,
                    kind,
                    received_at,
                }
            }
        }
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        match self {
            RawUnit::Line { received_at, .. } | RawUnit::Chunk { received_at, .. } => *received_at,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawUnit::Line { bytes, .. } | RawUnit::Chunk { bytes, .. } => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::checksum::DEFAULT_BINARY_THRESHOLD;

    #[test]
    fn test_line_terminator_is_stripped() {
        let unit = RawUnit::classify(b"$PNORC4,4.5\r\n".to_vec(), DEFAULT_BINARY_THRESHOLD, Utc::now());
        let RawUnit::Line { text, bytes, .. } = unit else {
            panic!("expected a line");
        };
        assert_eq!(text, "$PNORC4,4.5");
        assert_eq!(&bytes[..], b"$PNORC4,4.5\r\n");
    }

    #[test]
    fn test_noise_is_binary() {
        let unit = RawUnit::classify(vec![0xFF, 0xFE, 0x00, 0x81, b'\n'], DEFAULT_BINARY_THRESHOLD, Utc::now());
        assert!(matches!(unit, RawUnit::Chunk { kind: ChunkKind::Binary, .. }));
    }

    #[test]
    fn test_stray_byte_in_text_is_decode_error() {
        let mut raw = b"$PNORS4,22.9,1546.1,151.1,-12.0,-5.2,705.669,24.96".to_vec();
        raw.push(0xB0);
        raw.extend_from_slice(b"\r\n");
        let unit = RawUnit::classify(raw, DEFAULT_BINARY_THRESHOLD, Utc::now());
        assert!(matches!(unit, RawUnit::Chunk { kind: ChunkKind::DecodeError, .. }));
        assert_eq!(unit.len(), 53);
    }
}
