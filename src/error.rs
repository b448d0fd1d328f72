//! Error types for CircularDB

use std::io;
use thiserror::Error;

/// Result type alias for CircularDB operations
pub type Result<T> = std::result::Result<T, CdbError>;

/// Error type for all CircularDB operations
#[derive(Error, Debug)]
pub enum CdbError {
    /// The file is not a CircularDB database
    #[error("not a CircularDB file (bad header token)")]
    BadToken,

    /// The database was written by an incompatible library version
    #[error("incompatible CircularDB version [{found}], library is [{}]", crate::VERSION)]
    BadVersion {
        /// Version string found in the file header
        found: String,
    },

    /// A write was attempted through a read-only handle
    #[error("database was opened read-only")]
    ReadOnly,

    /// The header's `max_records` is zero, so the ring has no capacity
    #[error("max_records must be greater than zero to write records")]
    InvalidMax,

    /// The requested time window is inverted
    #[error("end time [{end}] must be >= start time [{start}]")]
    TimeRange {
        /// Requested window start
        start: i64,
        /// Requested window end
        end: i64,
    },

    /// Internal invariant violation: the header image is not synced
    #[error("sanity check failed: header is not synced with the backing file")]
    Sanity,

    /// A read was issued against an empty database
    #[error("no records in the database")]
    NoRecords,

    /// A record buffer could not be allocated
    #[error("could not allocate a buffer for {0} records")]
    NoMem(u64),

    /// The aggregation driver produced too few records to interpolate
    #[error("aggregate driver returned too few records to interpolate")]
    InterpDriver,

    /// An aggregation follower could not back an interpolant
    #[error("aggregate follower could not be interpolated")]
    InterpFollower,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Stable integer codes for the error taxonomy.
///
/// These values are the wire representation used by language bindings and
/// must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    /// Operation completed
    Success = 0,
    /// Generic failure
    Failure = -1,
    /// Invalid time range
    TimeRange = 1,
    /// Invalid pointer
    Fault = 2,
    /// Invalid argument supplied by the caller
    Invalid = 3,
    /// Generic operation failure
    Failed = 4,
    /// Sanity check failed
    Sanity = 5,
    /// Allocation failed
    NoMem = 6,
    /// `max_records` is invalid
    InvalidMax = 7,
    /// Write attempted on a read-only database
    ReadOnly = 8,
    /// No records were returned when some were expected
    NoRecords = 9,
    /// Aggregate driver failure
    InterpDriver = 10,
    /// Aggregate follower failure
    InterpFollower = 11,
    /// Invalid header token
    BadToken = 12,
    /// Incompatible version string
    BadVersion = 13,
}

impl CdbError {
    /// Map this error onto its stable wire code.
    ///
    /// `Io` maps to [`ErrorCode::Failed`]; raw OS errno values are available
    /// through the wrapped [`std::io::Error`] instead of being folded into
    /// the code space.
    pub fn code(&self) -> ErrorCode {
        match self {
            CdbError::BadToken => ErrorCode::BadToken,
            CdbError::BadVersion { .. } => ErrorCode::BadVersion,
            CdbError::ReadOnly => ErrorCode::ReadOnly,
            CdbError::InvalidMax => ErrorCode::InvalidMax,
            CdbError::TimeRange { .. } => ErrorCode::TimeRange,
            CdbError::Sanity => ErrorCode::Sanity,
            CdbError::NoRecords => ErrorCode::NoRecords,
            CdbError::NoMem(_) => ErrorCode::NoMem,
            CdbError::InterpDriver => ErrorCode::InterpDriver,
            CdbError::InterpFollower => ErrorCode::InterpFollower,
            CdbError::Io(_) => ErrorCode::Failed,
        }
    }
}
