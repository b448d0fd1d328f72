//! The read path: bound resolution, wrap-aware slab assembly, cooking,
//! and range statistics.

use std::io::{Read, Seek, SeekFrom};

use super::Database;
use crate::cook;
use crate::error::{CdbError, Result};
use crate::header::DataType;
use crate::record::{Record, RECORD_SIZE};
use crate::request::ReadRequest;
use crate::stats::{self, Range};

impl Database {
    /// Read records per the request and compute range statistics over the
    /// final slab.
    ///
    /// The raw slab covers the requested window (or count); when
    /// `request.cooked` is set it is then rewritten by the cooking
    /// pipeline: counter differencing, unit rate scaling, min/max gating,
    /// and step averaging. A nonzero `count` finally trims the slab —
    /// positive from the end, negative from the beginning.
    pub fn read_records(&mut self, request: &ReadRequest) -> Result<(Vec<Record>, Range)> {
        request.validate()?;

        self.read_header()?;
        if !self.synced {
            return Err(CdbError::Sanity);
        }
        if self.header.num_records == 0 {
            return Err(CdbError::NoRecords);
        }

        let num = self.header.num_records as i64;

        // Flip once so that positive caller counts ("last N") become
        // negative end-relative offsets, matching array indexing.
        let mut count = -request.count;

        // Rate cooking consumes the first raw record; fetch one extra so
        // the caller still receives |count| cooked records.
        if count != 0 && request.cooked && self.header.kind == DataType::Counter {
            count += if count > 0 { 1 } else { -1 };
        }

        let first_logical = if count < 0 && request.start == 0 {
            count
        } else {
            self.logical_for_time(request.start)?
        };

        let last_logical = if request.end == 0 {
            num - 1
        } else {
            let mut last = self.logical_for_time(request.end)?;
            // The search rounds up past the window; back off when it did.
            if self.time_for_logical(last)? > request.end {
                last -= 1;
            }
            last
        };

        let first_normalized = if first_logical < 0 {
            (num + first_logical).max(0)
        } else {
            first_logical
        };
        if last_logical < first_normalized {
            return Err(CdbError::NoRecords);
        }

        let first_physical = self
            .physical_record(first_normalized)
            .ok_or(CdbError::Sanity)?;
        let last_physical = ((last_logical + self.header.start_record as i64) % num) as u64;

        let raw = self.read_slab(first_physical, last_physical)?;

        let records = if request.cooked {
            cook::cook(&self.header, raw, request)
        } else {
            raw
        };
        let records = cook::trim_count(records, request.count);

        let range = stats::compute(&records, request);
        Ok((records, range))
    }

    /// Read per the request and keep only the range statistics.
    pub fn statistics(&mut self, request: &ReadRequest) -> Result<Range> {
        let (_, range) = self.read_records(request)?;
        Ok(range)
    }

    /// Copy the physical slot range `[first, last]` out of the ring. A
    /// wrapped range takes two reads: from `first` to the end of the ring,
    /// then from the first slot up through `last`.
    fn read_slab(&mut self, first: u64, last: u64) -> Result<Vec<Record>> {
        if last >= first {
            self.read_run(first, last - first + 1)
        } else {
            let num = self.header.num_records;
            let mut slab = self.read_run(first, num - first)?;
            slab.extend(self.read_run(0, last + 1)?);
            Ok(slab)
        }
    }

    /// One contiguous read of `count` records starting at a physical slot.
    fn read_run(&mut self, slot: u64, count: u64) -> Result<Vec<Record>> {
        let byte_len = count as usize * RECORD_SIZE;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(byte_len)
            .map_err(|_| CdbError::NoMem(count))?;
        bytes.resize(byte_len, 0);

        self.open()?;
        let file = self.file.as_mut().ok_or(CdbError::Sanity)?;
        file.seek(SeekFrom::Start(Self::record_offset(slot)))?;
        file.read_exact(&mut bytes)?;

        let mut records = Vec::new();
        records
            .try_reserve_exact(count as usize)
            .map_err(|_| CdbError::NoMem(count))?;
        for chunk in bytes.chunks_exact(RECORD_SIZE) {
            let mut buf = [0u8; RECORD_SIZE];
            buf.copy_from_slice(chunk);
            records.push(Record::from_bytes(&buf));
        }
        Ok(records)
    }
}
