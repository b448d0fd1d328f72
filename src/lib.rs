//! CircularDB: fixed-capacity, file-backed circular time-series storage.
//!
//! Each database is a single file: a fixed 768-byte header followed by a
//! ring of equally sized `(time, value)` records. Once the ring is full
//! the oldest record is overwritten by the newest, so a database never
//! grows past its declared capacity. Reads can return the stored samples
//! as-is or "cooked": counter values become rates, rate-style units scale
//! by their frequency, out-of-band values are gated to NaN, and runs of
//! records can be condensed by step averaging. Every read also yields
//! descriptive statistics over its window, and multiple databases can be
//! summed onto a common timeline by linear interpolation.
//!
//! # Examples
//!
//! ```no_run
//! use cdblib::{Database, DataType, ReadRequest, Statistic};
//!
//! # fn main() -> cdblib::Result<()> {
//! let mut db = Database::create(
//!     "/tmp/requests.cdb",
//!     "requests",
//!     "front door requests",
//!     105_120,
//!     DataType::Counter,
//!     "requests per sec",
//!     0.0,
//!     0.0,
//!     300,
//! )?;
//!
//! db.write_record(1190860353, 1024.0)?;
//! db.write_record(1190860653, 2048.0)?;
//!
//! let (records, range) = db.read_records(&ReadRequest::default())?;
//! for record in &records {
//!     println!("{} {}", record.time, record.value);
//! }
//! println!("mean rate: {}", cdblib::get_statistic(&range, Statistic::Mean));
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A handle owns its file descriptor and header image outright; there is
//! no shared process-wide state. One writer per database, any number of
//! read-only handles. Two writers on the same file are not coordinated.

pub mod aggregate;
mod cook;
pub mod db;
pub mod error;
pub mod header;
pub mod record;
pub mod request;
pub mod stats;

pub use aggregate::Aggregate;
pub use db::{Database, OpenMode};
pub use error::{CdbError, ErrorCode, Result};
pub use header::{
    DataType, Header, DEFAULT_INTERVAL, DEFAULT_MAX_RECORDS, DEFAULT_UNITS, HEADER_SIZE, TOKEN,
    VERSION,
};
pub use record::{Record, RECORD_SIZE};
pub use request::ReadRequest;
pub use stats::{get_statistic, Range, Statistic};
