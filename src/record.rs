//! The fixed-width record slot stored in the ring.

use serde::{Deserialize, Serialize};

/// Size of one on-disk record in bytes
pub const RECORD_SIZE: usize = 16;

/// A single time-series sample.
///
/// `time` is seconds since the Unix epoch; zero and negative times mark
/// unwritten or corrupted slots and are skipped on read. A `value` of NaN
/// means "no value" and is carried through cooking but excluded from
/// statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Timestamp (Unix seconds)
    pub time: i64,
    /// Sample value; NaN marks a missing or tombstoned sample
    pub value: f64,
}

impl Record {
    /// Create a record from a timestamp and value.
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }

    /// Whether the stored timestamp is usable (corrupted slots carry <= 0).
    pub fn has_valid_time(&self) -> bool {
        self.time > 0
    }

    /// Encode into the 16-byte on-disk form (little-endian).
    pub(crate) fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[..8].copy_from_slice(&self.time.to_le_bytes());
        buf[8..].copy_from_slice(&self.value.to_le_bytes());
        buf
    }

    /// Decode from the 16-byte on-disk form.
    pub(crate) fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        let mut time = [0u8; 8];
        let mut value = [0u8; 8];
        time.copy_from_slice(&buf[..8]);
        value.copy_from_slice(&buf[8..]);
        Self {
            time: i64::from_le_bytes(time),
            value: f64::from_le_bytes(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_round_trip() {
        let rec = Record::new(1190860353, 42.5);
        let decoded = Record::from_bytes(&rec.to_bytes());
        assert_eq!(decoded, rec);
    }

    #[test]
    fn test_nan_survives_codec() {
        let rec = Record::new(1190860353, f64::NAN);
        let decoded = Record::from_bytes(&rec.to_bytes());
        assert_eq!(decoded.time, rec.time);
        assert!(decoded.value.is_nan());
    }

    #[test]
    fn test_valid_time() {
        assert!(Record::new(1, 0.0).has_valid_time());
        assert!(!Record::new(0, 0.0).has_valid_time());
        assert!(!Record::new(-5, 0.0).has_valid_time());
    }
}
