//! Sentence checksum handling
//!
//! NMEA-style sentences carry an optional `*HH` trailer: the XOR of every
//! byte strictly between the leading `$` and the `*`, written as two
//! upper-case hex digits.

use thiserror::Error;

/// Default share of non-text bytes above which an undecodable chunk is noise
pub const DEFAULT_BINARY_THRESHOLD: f64 = 0.10;

/// Checksum trailer did not match the payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checksum mismatch: expected {expected}, got {actual}")]
pub struct ChecksumMismatch {
    /// Checksum computed over the payload
    pub expected: String,
    /// Checksum carried in the sentence trailer
    pub actual: String,
}

/// XOR checksum - XOR of all bytes
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Split a sentence into payload and upper-cased checksum trailer.
///
/// The split happens on the last `*`. A sentence without `*` has no trailer,
/// which is valid.
pub fn split(sentence: &str) -> (&str, Option<String>) {
    let sentence = sentence.trim_end_matches(['\r', '\n']);
    match sentence.rfind('*') {
        Some(star) => (
            &sentence[..star],
            Some(sentence[star + 1..].trim().to_ascii_uppercase()),
        ),
        None => (sentence, None),
    }
}

/// Compute the two-digit checksum of a payload.
///
/// A leading `$` is not part of the checksummed region.
pub fn compute(payload: &str) -> String {
    let body = payload.strip_prefix('$').unwrap_or(payload);
    format!("{:02X}", xor_checksum(body.as_bytes()))
}

/// Validate the trailer of a sentence, if it has one
pub fn validate(sentence: &str) -> Result<(), ChecksumMismatch> {
    let (payload, trailer) = split(sentence);
    let Some(actual) = trailer else {
        return Ok(());
    };
    let expected = compute(payload);
    if expected == actual {
        Ok(())
    } else {
        Err(ChecksumMismatch { expected, actual })
    }
}

/// Append a freshly computed trailer to a payload
pub fn with_checksum(payload: &str) -> String {
    format!("{}*{}", payload, compute(payload))
}

/// Sentence type prefix: the token before the first comma, without `$`
pub fn extract_prefix(sentence: &str) -> &str {
    let (payload, _) = split(sentence.trim());
    let head = payload.split(',').next().unwrap_or_default();
    head.strip_prefix('$').unwrap_or(head).trim()
}

fn is_text_byte(b: u8) -> bool {
    matches!(b, 0x20..=0x7E | b'\r' | b'\n' | b'\t')
}

/// Classify a byte chunk as binary noise.
///
/// A chunk is noise only when it is not valid text and the share of bytes
/// outside printable ASCII (plus CR, LF, TAB) exceeds `threshold`. A text line
/// with a few stray high bytes stays below the threshold and is reported as a
/// decode error instead.
pub fn is_binary(chunk: &[u8], threshold: f64) -> bool {
    if chunk.is_empty() || std::str::from_utf8(chunk).is_ok() {
        return false;
    }
    let foreign = chunk.iter().filter(|&&b| !is_text_byte(b)).count();
    (foreign as f64 / chunk.len() as f64) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNORI: &str = "$PNORI,4,Signature1000900001,4,20,0.20,1.00,0";

    #[test]
    fn test_xor() {
        assert_eq!(xor_checksum(&[0x01, 0x02, 0x03]), 0x00);
        assert_eq!(xor_checksum(&[0xFF, 0x00]), 0xFF);
    }

    #[test]
    fn test_compute_known_sentence() {
        assert_eq!(compute(PNORI), "1A");
        // the leading '$' is excluded either way
        assert_eq!(compute(&PNORI[1..]), "1A");
    }

    #[test]
    fn test_compute_zero_padded() {
        // 'A' ^ 'A' == 0
        assert_eq!(compute("$AA"), "00");
        assert_eq!(compute("$\u{1}"), "01");
    }

    #[test]
    fn test_validate_roundtrip() {
        for payload in [PNORI, "$PNORH4,083013,132455,0,2A480000", "$X", "$"] {
            let sentence = with_checksum(payload);
            assert!(validate(&sentence).is_ok(), "{sentence}");
        }
    }

    #[test]
    fn test_validate_mismatch_reports_both_sides() {
        let err = validate(&format!("{PNORI}*1B")).unwrap_err();
        assert_eq!(err.expected, "1A");
        assert_eq!(err.actual, "1B");
    }

    #[test]
    fn test_validate_lowercase_trailer() {
        assert!(validate(&format!("{PNORI}*1a")).is_ok());
    }

    #[test]
    fn test_validate_without_trailer() {
        assert!(validate(PNORI).is_ok());
    }

    #[test]
    fn test_split_uses_last_star() {
        let (payload, cs) = split("$A*B,C*ff\r\n");
        assert_eq!(payload, "$A*B,C");
        assert_eq!(cs.as_deref(), Some("FF"));

        let (payload, cs) = split(PNORI);
        assert_eq!(payload, PNORI);
        assert!(cs.is_none());
    }

    #[test]
    fn test_extract_prefix() {
        assert_eq!(extract_prefix("$PNORI,4,x*2E"), "PNORI");
        assert_eq!(extract_prefix("PNORS4,1,2"), "PNORS4");
        assert_eq!(extract_prefix("$PNORH3*12"), "PNORH3");
        assert_eq!(extract_prefix(""), "");
    }

    #[test]
    fn test_is_binary() {
        let noise: Vec<u8> = (0x80..=0xFF).collect();
        assert!(is_binary(&noise, DEFAULT_BINARY_THRESHOLD));

        // one stray byte in a long line stays a decode error
        let mut line = b"$PNORS4,23.9,1500.0,123.4,45.6,23.4,123.456,24.56".to_vec();
        line.push(0xFF);
        assert!(!is_binary(&line, DEFAULT_BINARY_THRESHOLD));

        assert!(!is_binary(b"plain text\r\n", DEFAULT_BINARY_THRESHOLD));
        assert!(!is_binary(b"", DEFAULT_BINARY_THRESHOLD));
    }

    #[test]
    fn test_is_binary_threshold_is_configurable() {
        let mut line = b"abcdefgh".to_vec();
        line.extend_from_slice(&[0xFF, 0xFE]);
        // 2 of 10 bytes are foreign
        assert!(is_binary(&line, 0.10));
        assert!(!is_binary(&line, 0.25));
    }
}
