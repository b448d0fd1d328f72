//! Database handle: file lifecycle and the cached header image.
//!
//! A [`Database`] owns one file descriptor and one in-memory [`Header`].
//! The header is read and written lazily, guarded by a synced flag so
//! repeated operations do not re-hit the disk. Records are appended,
//! updated in place, or tombstoned; the file never grows past
//! `HEADER_SIZE + max_records * RECORD_SIZE`.
//!
//! # Examples
//!
//! ```no_run
//! use cdblib::{Database, DataType, ReadRequest};
//!
//! # fn main() -> cdblib::Result<()> {
//! let mut db = Database::create(
//!     "/tmp/load.cdb",
//!     "load",
//!     "1 minute load average",
//!     500,
//!     DataType::Gauge,
//!     "absolute",
//!     0.0,
//!     0.0,
//!     60,
//! )?;
//!
//! db.write_record(1190860353, 0.42)?;
//!
//! let (records, range) = db.read_records(&ReadRequest::default())?;
//! println!("{} records, mean {}", records.len(), range.mean);
//! # Ok(())
//! # }
//! ```

mod read;
mod ring;
mod write;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{CdbError, Result};
use crate::header::{DataType, Header, HEADER_SIZE};
use crate::record::RECORD_SIZE;

/// Access mode for a database file.
///
/// `Write` always opens read/write: the write path has to read the header
/// back, so a write-only request is promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read records and header only
    Read,
    /// Read and write; creates the file if missing (mode 0644 on Unix)
    Write,
}

/// Handle to a single CircularDB file.
pub struct Database {
    path: PathBuf,
    mode: OpenMode,
    file: Option<File>,
    header: Header,
    synced: bool,
}

impl Database {
    /// Create a handle without touching the filesystem. Call [`open`] (or
    /// any operation, which opens on demand) to acquire the file.
    ///
    /// [`open`]: Database::open
    pub fn new<P: AsRef<Path>>(path: P, mode: OpenMode) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mode,
            file: None,
            header: Header::default(),
            synced: false,
        }
    }

    /// Create a new database file: open for write, generate a header from
    /// the arguments (see [`Header::generate`] for the defaults), and
    /// persist it.
    #[allow(clippy::too_many_arguments)]
    pub fn create<P: AsRef<Path>>(
        path: P,
        name: &str,
        desc: &str,
        max_records: u64,
        kind: DataType,
        units: &str,
        min_value: f64,
        max_value: f64,
        interval: i32,
    ) -> Result<Self> {
        let mut db = Self::new(path, OpenMode::Write);
        db.open()?;
        db.generate_header(
            name,
            desc,
            max_records,
            kind,
            units,
            min_value,
            max_value,
            interval,
        );
        db.write_header()?;
        Ok(db)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory header image. Accurate after any successful
    /// operation; call [`read_header`](Database::read_header) to refresh
    /// explicitly.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Whether the file descriptor is currently held.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Open the backing file. A no-op when already open; reopening a
    /// closed handle is permitted.
    pub fn open(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }

        let mut options = OpenOptions::new();
        options.read(true);
        if self.mode == OpenMode::Write {
            options.write(true).create(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o644);
            }
        }

        let file = options.open(&self.path)?;
        log::debug!("opened {} ({:?})", self.path.display(), self.mode);
        self.file = Some(file);
        Ok(())
    }

    /// Release the file descriptor. Idempotent. A writable file that never
    /// received a header is removed, so aborted creations leave nothing
    /// behind.
    pub fn close(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        if self.mode == OpenMode::Write && file.metadata()?.len() == 0 {
            drop(file);
            std::fs::remove_file(&self.path)?;
            log::debug!("removed empty {}", self.path.display());
        }

        self.synced = false;
        Ok(())
    }

    /// Read and validate the header, unless the in-memory image is already
    /// synced. `num_records` is recomputed from the file size, so a reader
    /// always sees a bound that matches the records actually on disk.
    pub fn read_header(&mut self) -> Result<()> {
        if self.synced {
            return Ok(());
        }
        self.open()?;

        let file = self.file.as_mut().ok_or(CdbError::Sanity)?;
        let mut buf = [0u8; HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut buf)?;

        let mut header = Header::decode(&buf)?;

        let file_size = file.metadata()?.len();
        header.num_records =
            file_size.saturating_sub(HEADER_SIZE as u64) / RECORD_SIZE as u64;

        self.header = header;
        self.synced = true;
        Ok(())
    }

    /// Persist the in-memory header, unless it is already synced. Fails
    /// with [`CdbError::ReadOnly`] on a read-only handle.
    pub fn write_header(&mut self) -> Result<()> {
        if self.synced {
            return Ok(());
        }
        if self.mode != OpenMode::Write {
            return Err(CdbError::ReadOnly);
        }
        self.open()?;

        let buf = self.header.encode();
        let file = self.file.as_mut().ok_or(CdbError::Sanity)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&buf)?;

        self.synced = true;
        Ok(())
    }

    /// Replace the header with one generated from the arguments. Nothing
    /// is written until [`write_header`](Database::write_header).
    #[allow(clippy::too_many_arguments)]
    pub fn generate_header(
        &mut self,
        name: &str,
        desc: &str,
        max_records: u64,
        kind: DataType,
        units: &str,
        min_value: f64,
        max_value: f64,
        interval: i32,
    ) {
        self.header = Header::generate(
            name,
            desc,
            max_records,
            kind,
            units,
            min_value,
            max_value,
            interval,
        );
        self.synced = false;
    }

    /// Rename the database. Takes effect on the next header write.
    pub fn set_name(&mut self, name: &str) {
        self.header.name = name.to_string();
        self.synced = false;
    }

    /// Update the description. Takes effect on the next header write.
    pub fn set_desc(&mut self, desc: &str) {
        self.header.desc = desc.to_string();
        self.synced = false;
    }

    /// Update the unit string. Takes effect on the next header write.
    pub fn set_units(&mut self, units: &str) {
        self.header.units = units.to_string();
        self.synced = false;
    }

    /// Byte offset of a physical record slot.
    pub(crate) fn record_offset(slot: u64) -> u64 {
        HEADER_SIZE as u64 + slot * RECORD_SIZE as u64
    }

    /// Writable-handle guard for the record write paths.
    pub(crate) fn require_writable(&self) -> Result<()> {
        if self.mode != OpenMode::Write {
            return Err(CdbError::ReadOnly);
        }
        Ok(())
    }

    /// Header load for the write paths: a file that exists but holds no
    /// header yet (just created) keeps the in-memory image; real damage
    /// still surfaces.
    pub(crate) fn load_header_for_write(&mut self) -> Result<()> {
        match self.read_header() {
            Ok(()) => Ok(()),
            Err(CdbError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("open", &self.file.is_some())
            .field("synced", &self.synced)
            .field("num_records", &self.header.num_records)
            .field("max_records", &self.header.max_records)
            .finish()
    }
}
