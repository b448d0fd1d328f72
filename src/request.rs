//! Read request model.
//!
//! A [`ReadRequest`] rolls up the positional arguments of the read path:
//! time window, record count, cooking, and step averaging. Requests are
//! plain values; the engine never mutates a caller's request.

use serde::{Deserialize, Serialize};

use crate::error::{CdbError, Result};

/// Parameters for a record read.
///
/// The default request reads everything, cooked:
///
/// ```
/// use cdblib::ReadRequest;
///
/// let request = ReadRequest::default();
/// assert_eq!(request.start, 0);
/// assert_eq!(request.end, 0);
/// assert_eq!(request.count, 0);
/// assert!(request.cooked);
/// assert_eq!(request.step, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    /// Window start (Unix seconds); 0 means "from the oldest record"
    pub start: i64,
    /// Window end (Unix seconds); 0 means "through the newest record"
    pub end: i64,
    /// Number of records wanted: positive takes the last N, negative the
    /// first N, 0 everything in the window
    pub count: i64,
    /// Apply the cooking pipeline (counter rates, unit scaling, min/max
    /// gating); defaults to true
    pub cooked: bool,
    /// Condense every `step` consecutive records into their mean; 0 or 1
    /// disables averaging
    pub step: u32,
}

impl Default for ReadRequest {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            count: 0,
            cooked: true,
            step: 0,
        }
    }
}

impl ReadRequest {
    /// A request for every record, cooked.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cooked request for the time window `[start, end]`.
    pub fn between(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    /// A cooked request for the last `count` records.
    pub fn last(count: i64) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Check the window for inversion: both endpoints set and end < start.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.start != 0 && self.end != 0 && self.end < self.start {
            return Err(CdbError::TimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_cooked_full_read() {
        let request = ReadRequest::new();
        assert!(request.cooked);
        assert_eq!((request.start, request.end, request.count), (0, 0, 0));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        assert!(ReadRequest::between(100, 50).validate().is_err());
        assert!(ReadRequest::between(50, 100).validate().is_ok());
        // A zero endpoint means "open", never inverted.
        assert!(ReadRequest::between(100, 0).validate().is_ok());
        assert!(ReadRequest::between(0, 50).validate().is_ok());
    }
}
