//! Database header: identity token, dimensions, and the byte-exact codec.
//!
//! The header is a fixed 768-byte block at offset 0 of every database file.
//! Field offsets follow the layout a C compiler assigns the equivalent
//! struct on a 64-bit platform; integers and doubles are little-endian, so
//! the encoding is identical across runs and across platforms.

use serde::{Deserialize, Serialize};

use crate::error::{CdbError, Result};

/// Magic token at offset 0 of every database file
pub const TOKEN: [u8; 4] = *b"CDB\0";

/// Library version, stamped into every generated header.
///
/// Opening a file whose header carries a different version fails with
/// [`CdbError::BadVersion`]. Must fit, NUL-terminated, in 6 bytes.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the on-disk header in bytes
pub const HEADER_SIZE: usize = 768;

/// Default ring capacity: one year of 5-minute samples
pub const DEFAULT_MAX_RECORDS: u64 = 105_120;

/// Default expected sampling interval in seconds
pub const DEFAULT_INTERVAL: i32 = 300;

/// Default unit string for databases created without one
pub const DEFAULT_UNITS: &str = "absolute";

// Field offsets within the header block. The two gaps are the alignment
// padding the C layout requires before `type` (4-byte) and `start_record`
// (8-byte).
const OFF_TOKEN: usize = 0;
const OFF_VERSION: usize = 4;
const OFF_NAME: usize = 10;
const OFF_DESC: usize = 138;
const OFF_UNITS: usize = 650;
const OFF_TYPE: usize = 716;
const OFF_MIN_VALUE: usize = 720;
const OFF_MAX_VALUE: usize = 728;
const OFF_MAX_RECORDS: usize = 736;
const OFF_INTERVAL: usize = 744;
const OFF_START_RECORD: usize = 752;
const OFF_NUM_RECORDS: usize = 760;

const LEN_VERSION: usize = 6;
const LEN_NAME: usize = 128;
const LEN_DESC: usize = 512;
const LEN_UNITS: usize = 64;

/// Value semantics of a database: sampled level or monotonic count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum DataType {
    /// Values are absolute levels; cooking leaves them alone
    #[default]
    Gauge = 2,
    /// Values are monotonically increasing counts; cooking converts
    /// consecutive samples to deltas (and rates, when the units ask for it)
    Counter = 4,
}

impl DataType {
    /// Decode the on-disk discriminant. Unknown values fall back to gauge,
    /// which cooks as identity.
    fn from_raw(raw: i32) -> Self {
        match raw {
            4 => DataType::Counter,
            2 => DataType::Gauge,
            other => {
                log::warn!("unknown data type {other} in header, treating as gauge");
                DataType::Gauge
            }
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Gauge => write!(f, "gauge"),
            DataType::Counter => write!(f, "counter"),
        }
    }
}

/// In-memory image of the on-disk header.
///
/// One lives inside every [`Database`](crate::Database) handle; a synced
/// flag on the handle guards redundant header I/O.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Short identifier, at most 127 bytes on disk
    pub name: String,
    /// Longer description, at most 511 bytes on disk
    pub desc: String,
    /// Unit string; rate-style units ("per sec", "requests per min")
    /// trigger rate scaling in the cooker
    pub units: String,
    /// Gauge or counter semantics
    pub kind: DataType,
    /// Lower gate for cooked values; with `max_value` both zero, gating is
    /// disabled
    pub min_value: f64,
    /// Upper gate for cooked values
    pub max_value: f64,
    /// Ring capacity; writes require it to be nonzero
    pub max_records: u64,
    /// Expected inter-sample period in seconds (informational)
    pub interval: i32,
    /// Physical slot holding logical index 0
    pub start_record: u64,
    /// Current logical length of the ring
    pub num_records: u64,
}

impl Header {
    /// Build a header from caller arguments, applying the documented
    /// defaults: empty units become "absolute", a zero interval becomes
    /// 300 seconds, and a zero capacity becomes [`DEFAULT_MAX_RECORDS`].
    pub fn generate(
        name: &str,
        desc: &str,
        max_records: u64,
        kind: DataType,
        units: &str,
        min_value: f64,
        max_value: f64,
        interval: i32,
    ) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
            units: if units.is_empty() {
                DEFAULT_UNITS.to_string()
            } else {
                units.to_string()
            },
            kind,
            min_value,
            max_value,
            max_records: if max_records == 0 {
                DEFAULT_MAX_RECORDS
            } else {
                max_records
            },
            interval: if interval == 0 {
                DEFAULT_INTERVAL
            } else {
                interval
            },
            start_record: 0,
            num_records: 0,
        }
    }

    /// Encode into the fixed 768-byte on-disk form. The token and library
    /// version are stamped on every encode.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[OFF_TOKEN..OFF_TOKEN + 4].copy_from_slice(&TOKEN);
        put_str(&mut buf, OFF_VERSION, LEN_VERSION, VERSION);
        put_str(&mut buf, OFF_NAME, LEN_NAME, &self.name);
        put_str(&mut buf, OFF_DESC, LEN_DESC, &self.desc);
        put_str(&mut buf, OFF_UNITS, LEN_UNITS, &self.units);

        buf[OFF_TYPE..OFF_TYPE + 4].copy_from_slice(&(self.kind as i32).to_le_bytes());
        buf[OFF_MIN_VALUE..OFF_MIN_VALUE + 8].copy_from_slice(&self.min_value.to_le_bytes());
        buf[OFF_MAX_VALUE..OFF_MAX_VALUE + 8].copy_from_slice(&self.max_value.to_le_bytes());
        buf[OFF_MAX_RECORDS..OFF_MAX_RECORDS + 8]
            .copy_from_slice(&self.max_records.to_le_bytes());
        buf[OFF_INTERVAL..OFF_INTERVAL + 4].copy_from_slice(&self.interval.to_le_bytes());
        buf[OFF_START_RECORD..OFF_START_RECORD + 8]
            .copy_from_slice(&self.start_record.to_le_bytes());
        buf[OFF_NUM_RECORDS..OFF_NUM_RECORDS + 8]
            .copy_from_slice(&self.num_records.to_le_bytes());

        buf
    }

    /// Decode and validate a raw header block.
    ///
    /// Fails with [`CdbError::BadToken`] when the magic does not match and
    /// with [`CdbError::BadVersion`] when the file was written by a
    /// different library version.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        if buf[OFF_TOKEN..OFF_TOKEN + 4] != TOKEN {
            return Err(CdbError::BadToken);
        }

        let version = get_str(buf, OFF_VERSION, LEN_VERSION);
        if version != VERSION {
            return Err(CdbError::BadVersion { found: version });
        }

        Ok(Self {
            name: get_str(buf, OFF_NAME, LEN_NAME),
            desc: get_str(buf, OFF_DESC, LEN_DESC),
            units: get_str(buf, OFF_UNITS, LEN_UNITS),
            kind: DataType::from_raw(i32::from_le_bytes(
                buf[OFF_TYPE..OFF_TYPE + 4].try_into().unwrap_or_default(),
            )),
            min_value: read_f64(buf, OFF_MIN_VALUE),
            max_value: read_f64(buf, OFF_MAX_VALUE),
            max_records: read_u64(buf, OFF_MAX_RECORDS),
            interval: i32::from_le_bytes(
                buf[OFF_INTERVAL..OFF_INTERVAL + 4]
                    .try_into()
                    .unwrap_or_default(),
            ),
            start_record: read_u64(buf, OFF_START_RECORD),
            num_records: read_u64(buf, OFF_NUM_RECORDS),
        })
    }

    /// Whether min/max gating is active for this database.
    pub fn gating_enabled(&self) -> bool {
        self.min_value != 0.0 || self.max_value != 0.0
    }
}

/// Copy a string into a NUL-padded fixed field, truncating to leave at
/// least one terminating NUL.
fn put_str(buf: &mut [u8], offset: usize, len: usize, value: &str) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(len - 1);
    buf[offset..offset + n].copy_from_slice(&bytes[..n]);
}

/// Read a NUL-terminated string out of a fixed field.
fn get_str(buf: &[u8], offset: usize, len: usize) -> String {
    let field = &buf[offset..offset + len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(len);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap_or_default())
}

fn read_f64(buf: &[u8], offset: usize) -> f64 {
    f64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap_or_default())
}
