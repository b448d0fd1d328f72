//! Ring index math and the time-based binary search.
//!
//! Logical indices count insertion order: 0 is the oldest live record.
//! Physical slots are positions in the on-disk ring. The mapping is the
//! identity until the ring wraps, after which logical 0 sits at
//! `start_record` and the rest follow modulo the ring length.

use std::io::{Read, Seek, SeekFrom};

use super::Database;
use crate::error::{CdbError, Result};
use crate::record::{Record, RECORD_SIZE};

impl Database {
    /// Map a logical index to its physical slot.
    ///
    /// Negative indices address from the end (-1 is the newest record) and
    /// clamp to the oldest when they reach past it. Indices at or past
    /// `num_records` have no slot.
    pub(crate) fn physical_record(&self, logical: i64) -> Option<u64> {
        let num = self.header.num_records;

        let logical = if logical < 0 {
            (num as i64 + logical).max(0)
        } else {
            logical
        } as u64;

        if logical >= num {
            return None;
        }

        let mut physical = logical + self.header.start_record;
        if num > 0 {
            physical %= num;
        }
        Some(physical)
    }

    /// Seek the file to a logical record. Returns the physical slot, or
    /// `None` when the index is out of range.
    pub(crate) fn seek_logical(&mut self, logical: i64) -> Result<Option<u64>> {
        let Some(physical) = self.physical_record(logical) else {
            return Ok(None);
        };
        self.open()?;
        let file = self.file.as_mut().ok_or(CdbError::Sanity)?;
        file.seek(SeekFrom::Start(Self::record_offset(physical)))?;
        Ok(Some(physical))
    }

    /// Stored time at a logical index, skipping slots whose time is <= 0
    /// (corruption markers). Returns the first valid time at or after
    /// `logical`, or 0 after walking off the end.
    pub(crate) fn time_for_logical(&mut self, logical: i64) -> Result<i64> {
        let mut logical = logical;
        loop {
            if self.seek_logical(logical)?.is_none() {
                return Ok(0);
            }
            logical += 1;

            let file = self.file.as_mut().ok_or(CdbError::Sanity)?;
            let mut buf = [0u8; RECORD_SIZE];
            if file.read_exact(&mut buf).is_err() {
                return Ok(0);
            }

            let record = Record::from_bytes(&buf);
            if record.time > 0 {
                return Ok(record.time);
            }
        }
    }

    /// Find the logical index whose stored time is the smallest >= the
    /// requested time. With no exact match the result's time exceeds the
    /// request; callers that care compare times afterwards.
    pub(crate) fn logical_for_time(&mut self, req_time: i64) -> Result<i64> {
        let hi = self.header.num_records as i64 - 1;
        self.search_time(req_time, 0, hi, true)
    }

    fn search_time(&mut self, req_time: i64, lo: i64, hi: i64, first: bool) -> Result<i64> {
        let num = self.header.num_records as i64;

        // No particular time requested: the range start is the answer.
        if req_time == 0 {
            return Ok(lo);
        }

        // One or two candidates left: take the later one.
        if hi - lo <= 1 {
            return Ok(hi);
        }

        let start_time = self.time_for_logical(lo)?;
        if req_time <= start_time {
            return Ok(lo);
        }
        if lo + 1 >= num {
            return Ok(lo);
        }

        // Duplicate times at the range start would stall the pivot math;
        // walk to the first index whose time actually differs.
        let mut next = lo;
        let mut next_time = start_time;
        while next_time - start_time == 0 {
            next += 1;
            next_time = self.time_for_logical(next)?;
            if next >= num {
                break;
            }
        }

        let delta = next_time - start_time;
        if delta <= 0 {
            // Walked off the end, or the sequence is not monotone here.
            return Ok(lo);
        }
        if req_time <= next_time {
            return Ok(next);
        }

        // The first pivot extrapolates from the local sample spacing to
        // converge faster on evenly spaced data; later pivots bisect.
        let mut pivot = if first {
            (req_time - start_time) / delta - 1
        } else {
            lo + (hi - lo) / 2
        };
        if num > 0 {
            pivot = pivot.rem_euclid(num);
        }

        let pivot_time = self.time_for_logical(pivot)?;

        if req_time >= pivot_time {
            self.search_time(req_time, pivot, hi, false)
        } else {
            self.search_time(req_time, lo, pivot, false)
        }
    }
}
