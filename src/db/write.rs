//! Record writes: append with wrap, in-place update, and discard.

use std::io::{Seek, SeekFrom, Write};

use super::Database;
use crate::error::{CdbError, Result};
use crate::record::{Record, RECORD_SIZE};
use crate::request::ReadRequest;

impl Database {
    /// Append records to the ring.
    ///
    /// The unwrapped tail of the ring is filled first, in one contiguous
    /// write; anything beyond capacity then overwrites the oldest slots
    /// starting at `start_record`, which advances with them. The header is
    /// rewritten once at the end, so `num_records`/`start_record` on disk
    /// only ever describe fully written slots.
    ///
    /// Records whose time is 0 are skipped. Returns the number of records
    /// written.
    pub fn write_records(&mut self, records: &[Record]) -> Result<u64> {
        self.load_header_for_write()?;
        self.require_writable()?;
        if self.header.max_records == 0 {
            return Err(CdbError::InvalidMax);
        }

        let records: Vec<Record> = records
            .iter()
            .filter(|r| r.time != 0)
            .copied()
            .collect();
        if records.is_empty() {
            self.write_header()?;
            return Ok(0);
        }

        let max = self.header.max_records;
        let len = records.len() as u64;

        // Contiguous fill up to capacity.
        let fill = len.min(max - self.header.num_records.min(max));
        if fill > 0 {
            let offset = Self::record_offset(self.header.num_records);
            let mut buf = Vec::new();
            buf.try_reserve_exact(fill as usize * RECORD_SIZE)
                .map_err(|_| CdbError::NoMem(fill))?;
            for record in &records[..fill as usize] {
                buf.extend_from_slice(&record.to_bytes());
            }

            self.open()?;
            let file = self.file.as_mut().ok_or(CdbError::Sanity)?;
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&buf)?;

            self.header.num_records += fill;
            self.synced = false;
        }

        // Wrap portion: overwrite the oldest slots, advancing the ring
        // start with each one.
        let wrap = len - fill;
        if wrap > 0 {
            log::debug!(
                "{}: wrapping {} record(s) at slot {}",
                self.path.display(),
                wrap,
                self.header.start_record
            );

            self.open()?;
            for record in &records[fill as usize..] {
                let slot = self.header.start_record;
                let file = self.file.as_mut().ok_or(CdbError::Sanity)?;
                file.seek(SeekFrom::Start(Self::record_offset(slot)))?;
                file.write_all(&record.to_bytes())?;
                self.header.start_record = (slot + 1) % max;
            }
            self.synced = false;
        }

        self.write_header()?;
        Ok(len)
    }

    /// Append a single record. Returns true when it was written (a zero
    /// time is skipped).
    pub fn write_record(&mut self, time: i64, value: f64) -> Result<bool> {
        Ok(self.write_records(&[Record::new(time, value)])? > 0)
    }

    /// Overwrite already-written records in place.
    ///
    /// For each input, the record identity is "all contiguous records
    /// sharing timestamp `time`"; each matching slot is rewritten with the
    /// input value. Neither `num_records` nor `start_record` changes.
    /// Returns the number of slots overwritten.
    pub fn update_records(&mut self, records: &[Record]) -> Result<u64> {
        self.read_header()?;
        self.require_writable()?;

        let num = self.header.num_records as i64;
        if num == 0 {
            return Ok(0);
        }

        let mut updated = 0u64;

        for record in records {
            let mut logical = self.logical_for_time(record.time)?;
            // The search may land just past the target; step back so the
            // forward walk below cannot miss it.
            if logical >= 1 {
                logical -= 1;
            }

            let mut rtime = self.time_for_logical(logical)?;
            while rtime < record.time && logical < num - 1 {
                logical += 1;
                rtime = self.time_for_logical(logical)?;
            }

            while record.time == rtime && logical < num {
                if self.write_record_at(logical, record)? {
                    updated += 1;
                }
                logical += 1;
                if logical >= num {
                    break;
                }
                rtime = self.time_for_logical(logical)?;
            }
        }

        self.synced = false;
        self.write_header()?;
        Ok(updated)
    }

    /// Overwrite the records sharing `time` with a single value.
    pub fn update_record(&mut self, time: i64, value: f64) -> Result<bool> {
        Ok(self.update_records(&[Record::new(time, value)])? > 0)
    }

    /// Tombstone every record whose time falls in the request's
    /// `[start, end]` window by rewriting its value as NaN. Timestamps are
    /// preserved. Returns the number of records tombstoned.
    pub fn discard_records_in_time_range(&mut self, request: &ReadRequest) -> Result<u64> {
        self.read_header()?;
        self.require_writable()?;

        let num = self.header.num_records as i64;
        if num == 0 {
            return Ok(0);
        }

        let mut logical = self.logical_for_time(request.start)?;
        if logical >= 1 {
            logical -= 1;
        }

        let mut discarded = 0u64;
        for index in logical..num {
            let rtime = self.time_for_logical(index)?;
            if rtime >= request.start && rtime <= request.end {
                let tombstone = Record::new(rtime, f64::NAN);
                if self.write_record_at(index, &tombstone)? {
                    discarded += 1;
                }
            }
        }

        Ok(discarded)
    }

    /// Rewrite the record at a logical index. Returns false when the index
    /// has no slot.
    fn write_record_at(&mut self, logical: i64, record: &Record) -> Result<bool> {
        if self.seek_logical(logical)?.is_none() {
            return Ok(false);
        }
        let file = self.file.as_mut().ok_or(CdbError::Sanity)?;
        file.write_all(&record.to_bytes())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::header::{DataType, HEADER_SIZE};
    use crate::record::{Record, RECORD_SIZE};
    use crate::{Database, OpenMode, ReadRequest};

    const T0: i64 = 1190860353;

    fn gauge(dir: &std::path::Path, capacity: u64) -> Database {
        Database::create(
            dir.join("w.cdb"),
            "w",
            "",
            capacity,
            DataType::Gauge,
            "absolute",
            0.0,
            0.0,
            1,
        )
        .unwrap()
    }

    fn series(count: i64) -> Vec<Record> {
        (0..count).map(|i| Record::new(T0 + i, i as f64)).collect()
    }

    #[test]
    fn test_append_grows_file() {
        let dir = tempdir().unwrap();
        let mut db = gauge(dir.path(), 500);
        assert_eq!(db.write_records(&series(10)).unwrap(), 10);

        let header = db.header();
        assert_eq!(header.num_records, 10);
        assert_eq!(header.start_record, 0);

        let size = std::fs::metadata(db.path()).unwrap().len();
        assert_eq!(size, (HEADER_SIZE + 10 * RECORD_SIZE) as u64);
    }

    #[test]
    fn test_wrap_advances_start_record() {
        let dir = tempdir().unwrap();
        let mut db = gauge(dir.path(), 5);
        db.write_records(&series(6)).unwrap();

        let header = db.header();
        assert_eq!(header.num_records, 5);
        assert_eq!(header.start_record, 1);

        // File is capped at capacity.
        let size = std::fs::metadata(db.path()).unwrap().len();
        assert_eq!(size, (HEADER_SIZE + 5 * RECORD_SIZE) as u64);
    }

    #[test]
    fn test_repeated_single_writes_match_invariant() {
        let dir = tempdir().unwrap();
        let mut db = gauge(dir.path(), 5);
        for i in 0..12i64 {
            db.write_record(T0 + i, i as f64).unwrap();
        }
        let header = db.header();
        assert_eq!(header.num_records, 5);
        // start_record = (N - C) mod C
        assert_eq!(header.start_record, (12 - 5) % 5);
    }

    #[test]
    fn test_zero_time_records_skipped() {
        let dir = tempdir().unwrap();
        let mut db = gauge(dir.path(), 500);
        let records = vec![
            Record::new(0, 1.0),
            Record::new(T0, 2.0),
            Record::new(0, 3.0),
        ];
        assert_eq!(db.write_records(&records).unwrap(), 1);
        assert_eq!(db.header().num_records, 1);
    }

    #[test]
    fn test_write_read_only_fails() {
        let dir = tempdir().unwrap();
        gauge(dir.path(), 500);
        let mut db = Database::new(dir.path().join("w.cdb"), OpenMode::Read);
        assert!(db.write_records(&series(1)).is_err());
    }

    #[test]
    fn test_update_rewrites_in_place() {
        let dir = tempdir().unwrap();
        let mut db = gauge(dir.path(), 500);
        db.write_records(&series(10)).unwrap();

        let updated = db.update_record(T0 + 5, 999.0005).unwrap();
        assert!(updated);

        let header = db.header();
        assert_eq!(header.num_records, 10);
        assert_eq!(header.start_record, 0);
    }

    #[test]
    fn test_update_duplicate_timestamps_hits_all() {
        let dir = tempdir().unwrap();
        let mut db = gauge(dir.path(), 500);
        let records = vec![
            Record::new(T0, 1.0),
            Record::new(T0 + 1, 2.0),
            Record::new(T0 + 1, 3.0),
            Record::new(T0 + 2, 4.0),
        ];
        db.write_records(&records).unwrap();

        assert_eq!(db.update_records(&[Record::new(T0 + 1, 9.0)]).unwrap(), 2);
    }

    #[test]
    fn test_update_last_record() {
        let dir = tempdir().unwrap();
        let mut db = gauge(dir.path(), 500);
        db.write_records(&series(10)).unwrap();
        assert!(db.update_record(T0 + 9, -1.5).unwrap());
    }

    #[test]
    fn test_discard_tombstones_window() {
        let dir = tempdir().unwrap();
        let mut db = gauge(dir.path(), 500);
        db.write_records(&series(10)).unwrap();

        let request = ReadRequest::between(T0 + 2, T0 + 4);
        assert_eq!(db.discard_records_in_time_range(&request).unwrap(), 3);

        // Times survive; values are NaN.
        let raw = ReadRequest {
            cooked: false,
            ..ReadRequest::default()
        };
        let (records, range) = db.read_records(&raw).unwrap();
        assert_eq!(records.len(), 10);
        assert!(records[2].value.is_nan());
        assert!(records[3].value.is_nan());
        assert!(records[4].value.is_nan());
        assert_eq!(records[5].value, 5.0);
        assert_eq!(range.num_recs, 7);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("z.cdb");
        let mut db = Database::new(&path, OpenMode::Write);
        db.open().unwrap();
        db.generate_header("z", "", 1, DataType::Gauge, "", 0.0, 0.0, 0);
        db.write_header().unwrap();
        // Force capacity to zero behind the generation defaults.
        db.header.max_records = 0;
        db.synced = false;
        db.write_header().unwrap();

        let mut reopened = Database::new(&path, OpenMode::Write);
        assert!(matches!(
            reopened.write_records(&[Record::new(T0, 1.0)]),
            Err(crate::CdbError::InvalidMax)
        ));
    }
}
