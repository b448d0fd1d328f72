//! Summation of multiple databases over a common time base.
//!
//! The first database in an [`Aggregate`] is the *driver*: its cooked
//! timestamps define the x-axis of the result. Every other database (a
//! *follower*) is cooked, linearly interpolated at the driver's
//! timestamps, and summed in. Followers that cannot contribute are
//! skipped rather than failing the whole read.
//!
//! # Examples
//!
//! ```no_run
//! use cdblib::{Aggregate, Database, OpenMode, ReadRequest};
//!
//! # fn main() -> cdblib::Result<()> {
//! let mut agg = Aggregate::new("cluster-requests");
//! agg.push(Database::new("/data/web1.cdb", OpenMode::Read));
//! agg.push(Database::new("/data/web2.cdb", OpenMode::Read));
//!
//! let (records, range) = agg.read_records(&ReadRequest::default())?;
//! println!("{} summed records, mean {}", records.len(), range.mean);
//! # Ok(())
//! # }
//! ```

use crate::db::Database;
use crate::error::{CdbError, Result};
use crate::record::Record;
use crate::request::ReadRequest;
use crate::stats::{self, Range};

/// An ordered collection of databases summed on the first one's timeline.
pub struct Aggregate {
    name: String,
    databases: Vec<Database>,
}

impl Aggregate {
    /// Create an empty aggregate.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            databases: Vec::new(),
        }
    }

    /// Name of this aggregate.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a database. The first one pushed becomes the driver.
    pub fn push(&mut self, database: Database) {
        self.databases.push(database);
    }

    /// The collected databases, driver first.
    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    /// Number of collected databases.
    pub fn len(&self) -> usize {
        self.databases.len()
    }

    /// Whether no databases have been collected yet.
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Read and sum all collected databases.
    ///
    /// The driver is read per the request; each follower is then read the
    /// same way and its interpolant evaluated at every driver timestamp.
    /// Only finite, normal interpolation results contribute to the sum —
    /// out-of-domain and subnormal evaluations are ignored. Statistics are
    /// computed over the summed, driver-sized slab.
    pub fn read_records(&mut self, request: &ReadRequest) -> Result<(Vec<Record>, Range)> {
        let (driver, followers) = self
            .databases
            .split_first_mut()
            .ok_or(CdbError::InterpDriver)?;

        let (mut result, _) = match driver.read_records(request) {
            Ok(read) => read,
            Err(CdbError::NoRecords) => return Err(CdbError::InterpDriver),
            Err(err) => return Err(err),
        };
        if result.len() <= 1 {
            return Err(CdbError::InterpDriver);
        }

        for follower in followers {
            let slab = match follower.read_records(request) {
                Ok((slab, _)) => slab,
                Err(CdbError::NoRecords) => continue,
                Err(err) => {
                    log::warn!(
                        "aggregate {}: skipping follower {}: {err}",
                        self.name,
                        follower.path().display()
                    );
                    continue;
                }
            };
            if slab.is_empty() {
                continue;
            }

            let interpolator =
                Interpolator::new(&slab).ok_or(CdbError::InterpFollower)?;

            for record in result.iter_mut() {
                let value = interpolator.eval(record.time);
                if value.is_normal() {
                    record.value += value;
                }
            }
        }

        let range = stats::compute(&result, request);
        Ok((result, range))
    }

    /// Read and sum per the request, keeping only the range statistics.
    pub fn statistics(&mut self, request: &ReadRequest) -> Result<Range> {
        let (_, range) = self.read_records(request)?;
        Ok(range)
    }
}

impl std::fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregate")
            .field("name", &self.name)
            .field("databases", &self.databases.len())
            .finish()
    }
}

/// Piecewise-linear interpolant over a slab's (time, value) pairs.
///
/// Evaluation outside the slab's time domain returns NaN instead of
/// failing; NaN sample values poison only the segments they touch.
struct Interpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Interpolator {
    /// Needs at least two points to describe a segment.
    fn new(records: &[Record]) -> Option<Self> {
        if records.len() < 2 {
            return None;
        }
        Some(Self {
            xs: records.iter().map(|r| r.time as f64).collect(),
            ys: records.iter().map(|r| r.value).collect(),
        })
    }

    fn eval(&self, time: i64) -> f64 {
        let x = time as f64;
        let first = self.xs[0];
        let last = self.xs[self.xs.len() - 1];
        if x < first || x > last {
            return f64::NAN;
        }

        // First segment whose right endpoint reaches x.
        let i = self.xs.partition_point(|&v| v < x);
        if i == 0 {
            return self.ys[0];
        }

        let (x0, x1) = (self.xs[i - 1], self.xs[i]);
        let (y0, y1) = (self.ys[i - 1], self.ys[i]);
        let dx = x1 - x0;
        if dx <= 0.0 {
            return f64::NAN;
        }
        y0 + (y1 - y0) * (x - x0) / dx
    }
}
