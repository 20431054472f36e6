//! # rotsink
//!
//! rotsink is a size-based rotating file sink. It behaves like an ordinary
//! append-only file until the active file reaches its capacity, then closes
//! it, shifts the numbered backups up by one slot (`app.log.1` becomes
//! `app.log.2` and so on), renames the full file to `app.log.1` and carries
//! on in a fresh `app.log`. The oldest backup falls off the end of the chain,
//! so the on-disk footprint stays bounded at roughly
//! `capacity * (backup_count + 1)` bytes.
//!
//! A single write that straddles the capacity boundary is split: the head
//! fills the active file exactly, the tail lands in the fresh one. Payloads
//! larger than a whole file rotate as many times as needed.
//!
//! The sink implements [`std::io::Write`], so it drops straight into any
//! writer-based logger.
//!
//! ## Example
//!
//! ```rust
//! use {
//!     rotsink::{Capacity, RotatingSinkBuilder},
//!     std::io::Write,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = tempfile::tempdir()?;
//!     let mut sink = RotatingSinkBuilder::new(dir.path().join("app.log"))
//!         .capacity(Capacity::Bytes(10))
//!         .backup_count(2)
//!         .build()?;
//!
//!     sink.write_all(b"12345")?;
//!     sink.write_all(b"67890AB")?;
//!
//!     assert_eq!(std::fs::read(dir.path().join("app.log"))?, b"AB");
//!     assert_eq!(std::fs::read(dir.path().join("app.log.1"))?, b"1234567890");
//!     sink.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Threading
//!
//! The sink is not internally synchronized; every mutating operation takes
//! `&mut self`. Share it between producers behind a mutex, or hand it to
//! `tracing_appender::non_blocking` which funnels everything through a single
//! worker thread.
//!
//! Nothing on the write path emits `tracing` events: a subscriber writing
//! through this sink would otherwise re-enter its own writer lock.
use {
    chrono::{DateTime, Utc},
    regex::bytes::Regex,
    std::{
        ffi::{OsStr, OsString},
        fs::{self, File, OpenOptions},
        io::{self, Write as _},
        path::{Path, PathBuf},
    },
    tracing::debug,
};

#[cfg(unix)]
use std::{fs::Permissions, os::unix::fs::PermissionsExt};

/// Defines how large the active file may grow before it is rotated.
///
/// * `Unbounded` - Never rotate; the file grows indefinitely
/// * `Bytes` - Direct byte count (e.g., 1048576 bytes)
/// * `KB` - Kilobytes (1 KB = 1024 bytes)
/// * `MB` - Megabytes (1 MB = 1024 KB)
/// * `GB` - Gigabytes (1 GB = 1024 MB)
///
/// A zero-sized limit in any unit is treated exactly like `Unbounded`.
///
/// # Examples
/// ```
/// use rotsink::Capacity;
///
/// assert_eq!(Capacity::KB(4).bytes(), 4096);
/// assert_eq!(Capacity::from(0), Capacity::Unbounded);
/// assert!(Capacity::Bytes(0).is_unbounded());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    /// No limit, rotation never happens.
    #[default]
    Unbounded,
    /// Raw byte count
    Bytes(u64),
    /// Kilobytes (1 KB = 1024 bytes)
    KB(u64),
    /// Megabytes (1 MB = 1024 KB = 1,048,576 bytes)
    MB(u64),
    /// Gigabytes (1 GB = 1024 MB = 1,073,741,824 bytes)
    GB(u64),
}

impl Capacity {
    /// The limit in bytes. `0` means unbounded.
    pub fn bytes(&self) -> u64 {
        match self {
            Capacity::Unbounded => 0,
            Capacity::Bytes(b) => *b,
            Capacity::KB(kb) => kb.saturating_mul(1024),
            Capacity::MB(mb) => mb.saturating_mul(1024 * 1024),
            Capacity::GB(gb) => gb.saturating_mul(1024 * 1024 * 1024),
        }
    }

    /// Whether this limit disables rotation.
    pub fn is_unbounded(&self) -> bool {
        self.bytes() == 0
    }
}

impl From<u64> for Capacity {
    fn from(bytes: u64) -> Self {
        match bytes {
            0 => Capacity::Unbounded,
            n => Capacity::Bytes(n),
        }
    }
}

/// How the active file is opened when the sink is constructed.
///
/// Rotation always reopens the fresh active file in `Append` mode; this
/// setting only affects the very first open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Create the file if missing and append to whatever it already holds.
    /// Existing content counts toward the capacity.
    #[default]
    Append,
    /// Create the file if missing and discard any existing content.
    Truncate,
}

/// Static configuration of a sink.
#[derive(Debug, Clone)]
struct SinkMeta {
    /// The active file. Backups live next to it as `<path>.<n>`.
    path: PathBuf,
    /// Number of numbered backups kept. `0` disables rotation.
    backup_count: usize,
    /// Capacity of the active file in bytes. `0` disables rotation.
    capacity_limit: u64,
    open_mode: OpenMode,
    /// Create missing parent directories when opening the active file.
    create_dirs: bool,
    /// Unix permissions applied to the active file every time it is opened.
    file_mode: Option<u32>,
}

/// Mutable accounting for the active file.
#[derive(Debug)]
struct SinkState {
    /// Bytes in the active file, including content present before the sink
    /// opened it.
    bytes_used: u64,
    last_write_time: DateTime<Utc>,
}

impl SinkMeta {
    fn new(path: PathBuf) -> Self {
        SinkMeta {
            path,
            backup_count: 0,
            capacity_limit: 0,
            open_mode: OpenMode::Append,
            create_dirs: false,
            file_mode: None,
        }
    }

    fn rotation_enabled(&self) -> bool {
        self.capacity_limit > 0 && self.backup_count > 0
    }

    /// `<path>.<index>`, built on the raw OS string so non-UTF-8 names survive.
    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    /// Open the active file.
    /// If opening fails and directory creation is enabled, the parent
    /// directory is created and the open is retried once.
    fn open_active(&self, mode: OpenMode) -> Result<File, RotatingSinkError> {
        let mut open_options = OpenOptions::new();
        match mode {
            OpenMode::Append => open_options.append(true).create(true),
            OpenMode::Truncate => open_options.write(true).truncate(true).create(true),
        };

        let mut open_res = open_options.open(&self.path);
        if open_res.is_err() && self.create_dirs {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| RotatingSinkError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
                open_res = open_options.open(&self.path);
            }
        }

        let file = open_res.map_err(|source| RotatingSinkError::Open {
            path: self.path.clone(),
            source,
        })?;

        self.set_permissions()?;

        Ok(file)
    }

    /// Apply the configured file mode to the active file.
    ///
    /// Only has an effect when a mode was configured and the target is a
    /// Unix-like system; elsewhere a warning is logged and nothing changes.
    fn set_permissions(&self) -> Result<(), RotatingSinkError> {
        if let Some(mode) = self.file_mode {
            #[cfg(unix)]
            {
                fs::set_permissions(&self.path, Permissions::from_mode(mode)).map_err(|source| {
                    RotatingSinkError::SetPermissions {
                        path: self.path.clone(),
                        source,
                    }
                })?;
            }
            #[cfg(not(unix))]
            {
                eprintln!("Warning: Setting file permissions ({mode:o}) is not supported on non-Unix platforms");
            }
        }
        Ok(())
    }

    /// Shift every backup up one slot and move the active file into slot 1.
    ///
    /// Only the run of slots occupied from `.1` upward moves, so the cost is
    /// bounded by the backups that exist rather than by `backup_count`.
    /// Walks from the highest occupied slot down so nothing is overwritten
    /// before it has moved; whatever sat in the last slot is evicted. The
    /// active file must already be closed.
    fn shift_backups(&self) -> Result<(), RotatingSinkError> {
        let occupied = (1..self.backup_count)
            .take_while(|idx| self.backup_path(*idx).exists())
            .last()
            .unwrap_or(0);

        for idx in (1..=occupied).rev() {
            let source_file = self.backup_path(idx);
            let target_file = self.backup_path(idx + 1);
            remove_if_exists(&target_file)?;
            rename(&source_file, &target_file)?;
        }

        let newest = self.backup_path(1);
        remove_if_exists(&newest)?;
        rename(&self.path, &newest)
    }
}

/// Byte-level pattern for `<filename>.<index>`, so non-UTF-8 names match too.
fn backup_name_pattern(filename: &OsStr) -> Result<Regex, RotatingSinkError> {
    let escaped: String = filename
        .as_encoded_bytes()
        .iter()
        .map(|byte| format!(r"\x{byte:02x}"))
        .collect();
    Regex::new(&format!(r"(?-u)^{escaped}\.([0-9]+)$")).map_err(|err| RotatingSinkError::Internal(err.to_string()))
}

fn remove_if_exists(path: &Path) -> Result<(), RotatingSinkError> {
    if path.exists() {
        fs::remove_file(path).map_err(|source| RotatingSinkError::Remove {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn rename(from: &Path, to: &Path) -> Result<(), RotatingSinkError> {
    fs::rename(from, to).map_err(|source| RotatingSinkError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Flush the handle to disk and release it, surfacing any deferred error.
fn close_file(path: &Path, file: File) -> Result<(), RotatingSinkError> {
    file.sync_all().map_err(|source| RotatingSinkError::Sync {
        path: path.to_path_buf(),
        source,
    })
}

/// A file sink that rotates to a fresh file once the active one is full.
///
/// Created through [`RotatingSink::open`] or [`RotatingSinkBuilder`]. The
/// active file is always named exactly as configured; history lives in
/// `<path>.1` (newest) through `<path>.<backup_count>` (oldest).
///
/// Errors are never retried. A failure halfway through a rotation leaves the
/// files as they were at the failing step and, if the active handle had
/// already been closed, the sink without a handle: every later call then
/// fails with [`RotatingSinkError::Closed`]. Reconstruct the sink with
/// [`RotatingSink::open`] to recover, which re-reads the accounting from the
/// file on disk.
#[derive(Debug)]
pub struct RotatingSink {
    meta: SinkMeta,
    state: SinkState,
    handle: Option<File>,
}

impl RotatingSink {
    /// Open `path` for appending, creating it if needed, keeping
    /// `backup_count` numbered backups and rotating once the file holds
    /// `capacity_limit` bytes.
    ///
    /// A `capacity_limit` or `backup_count` of zero disables rotation. When
    /// the file already exists its size and modification time seed the
    /// accounting, so capacity carries over across restarts.
    pub fn open<P: AsRef<Path>>(path: P, backup_count: usize, capacity_limit: u64) -> Result<Self, RotatingSinkError> {
        RotatingSinkBuilder::new(path)
            .backup_count(backup_count)
            .capacity(Capacity::from(capacity_limit))
            .build()
    }

    /// Start configuring a sink for `path`.
    pub fn builder<P: AsRef<Path>>(path: P) -> RotatingSinkBuilder {
        RotatingSinkBuilder::new(path)
    }

    /// Append `buf`, rotating as many times as it takes to fit.
    ///
    /// Returns `buf.len()` on success. On failure the bytes that did land
    /// stay counted in [`bytes_used`](Self::bytes_used); the call must not be
    /// blindly retried, since part of `buf` may already be on disk.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, RotatingSinkError> {
        if !self.meta.rotation_enabled() {
            self.write_chunk(buf)?;
            return Ok(buf.len());
        }

        let mut rest = buf;
        loop {
            let remaining = self.meta.capacity_limit.saturating_sub(self.state.bytes_used);
            if remaining >= rest.len() as u64 {
                self.write_chunk(rest)?;
                return Ok(buf.len());
            }

            // remaining < rest.len(), so it fits in usize
            let (head, tail) = rest.split_at(remaining as usize);
            if !head.is_empty() {
                self.write_chunk(head)?;
            }
            self.roll_over()?;
            rest = tail;
        }
    }

    /// Rotate now, regardless of how full the active file is.
    ///
    /// Does nothing when no backups are kept.
    pub fn rotate(&mut self) -> Result<(), RotatingSinkError> {
        if self.meta.backup_count == 0 {
            return Ok(());
        }
        self.roll_over()
    }

    /// Flush the active handle.
    pub fn flush(&mut self) -> Result<(), RotatingSinkError> {
        let path = &self.meta.path;
        let file = self
            .handle
            .as_mut()
            .ok_or_else(|| RotatingSinkError::Closed(path.clone()))?;
        file.flush().map_err(|source| RotatingSinkError::Write {
            path: path.clone(),
            source,
        })
    }

    /// Sync and release the active file. No rotation happens on close.
    pub fn close(mut self) -> Result<(), RotatingSinkError> {
        match self.handle.take() {
            Some(file) => {
                close_file(&self.meta.path, file)?;
                debug!(path = %self.meta.path.display(), bytes_used = self.state.bytes_used, "closed rotating sink");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// The active file.
    pub fn path(&self) -> &Path {
        &self.meta.path
    }

    pub fn backup_count(&self) -> usize {
        self.meta.backup_count
    }

    /// Capacity in bytes, `0` when unbounded.
    pub fn capacity_limit(&self) -> u64 {
        self.meta.capacity_limit
    }

    /// Bytes in the active file since it was opened or last rotated,
    /// including content recovered from disk at open.
    pub fn bytes_used(&self) -> u64 {
        self.state.bytes_used
    }

    /// Time of the most recent write, or the file's modification time if
    /// nothing has been written since open.
    pub fn last_write_time(&self) -> DateTime<Utc> {
        self.state.last_write_time
    }

    /// The path backup `index` is stored under (`<path>.<index>`), whether
    /// or not it exists.
    pub fn backup_path(&self, index: usize) -> PathBuf {
        self.meta.backup_path(index)
    }

    /// Existing backup files within the retained range, newest first.
    ///
    /// Files with an index above `backup_count`, left behind by an earlier
    /// configuration, are ignored.
    pub fn backups(&self) -> Result<Vec<PathBuf>, RotatingSinkError> {
        let directory = match self.meta.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let Some(filename) = self.meta.path.file_name() else {
            return Ok(Vec::new());
        };
        let pattern = backup_name_pattern(filename)?;

        let entries = fs::read_dir(&directory).map_err(|source| RotatingSinkError::ListDirectory {
            path: directory.clone(),
            source,
        })?;

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RotatingSinkError::ListDirectory {
                path: directory.clone(),
                source,
            })?;
            let name = entry.file_name();
            let Some(index) = pattern
                .captures(name.as_encoded_bytes())
                .and_then(|caps| std::str::from_utf8(&caps[1]).ok()?.parse::<usize>().ok())
            else {
                continue;
            };
            if (1..=self.meta.backup_count).contains(&index) && entry.path().is_file() {
                backups.push((index, self.meta.backup_path(index)));
            }
        }
        backups.sort_by_key(|(index, _)| *index);

        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Write all of `buf` to the active file.
    ///
    /// Accounting advances by whatever reached the file, even when a later
    /// part of the write fails.
    fn write_chunk(&mut self, buf: &[u8]) -> Result<(), RotatingSinkError> {
        let Some(file) = self.handle.as_mut() else {
            return Err(RotatingSinkError::Closed(self.meta.path.clone()));
        };

        let mut written = 0;
        let result = loop {
            if written == buf.len() {
                break Ok(());
            }
            match file.write(&buf[written..]) {
                Ok(0) => break Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => break Err(err),
            }
        };

        if written > 0 || result.is_ok() {
            self.state.bytes_used += written as u64;
            self.state.last_write_time = Utc::now();
        }

        result.map_err(|source| RotatingSinkError::Write {
            path: self.meta.path.clone(),
            source,
        })
    }

    /// Close the active file, shift the backup chain and reopen a fresh one.
    fn roll_over(&mut self) -> Result<(), RotatingSinkError> {
        let file = self
            .handle
            .take()
            .ok_or_else(|| RotatingSinkError::Closed(self.meta.path.clone()))?;

        let rotated = close_file(&self.meta.path, file)
            .and_then(|_| self.meta.shift_backups())
            .and_then(|_| self.meta.open_active(OpenMode::Append));

        self.handle = Some(rotated?);
        self.state.bytes_used = 0;
        Ok(())
    }
}

impl io::Write for RotatingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingSink::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingSink::flush(self).map_err(io::Error::from)
    }
}

/// Errors that can occur when using a rotating sink.
///
/// Every variant except `Closed` and `Internal` wraps the error the
/// filesystem reported together with the path(s) involved.
#[derive(Debug, thiserror::Error)]
pub enum RotatingSinkError {
    #[error("Failed to open log file '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("Failed to stat log file '{path}': {source}")]
    Stat { path: PathBuf, source: io::Error },
    #[error("Failed to write to log file '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to sync log file '{path}': {source}")]
    Sync { path: PathBuf, source: io::Error },
    #[error("Failed to remove file '{path}': {source}")]
    Remove { path: PathBuf, source: io::Error },
    #[error("Failed to rename file from '{from}' to '{to}': {source}")]
    Rename { from: PathBuf, to: PathBuf, source: io::Error },
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },
    #[error("Failed to list directory '{path}': {source}")]
    ListDirectory { path: PathBuf, source: io::Error },
    #[error("Failed to set file permissions for '{path}': {source}")]
    SetPermissions { path: PathBuf, source: io::Error },
    #[error("Log file '{0}' has no active handle after a failed rotation")]
    Closed(PathBuf),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RotatingSinkError {
    /// The [`io::ErrorKind`] of the underlying failure.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            RotatingSinkError::Open { source, .. }
            | RotatingSinkError::Stat { source, .. }
            | RotatingSinkError::Write { source, .. }
            | RotatingSinkError::Sync { source, .. }
            | RotatingSinkError::Remove { source, .. }
            | RotatingSinkError::Rename { source, .. }
            | RotatingSinkError::CreateDirectory { source, .. }
            | RotatingSinkError::ListDirectory { source, .. }
            | RotatingSinkError::SetPermissions { source, .. } => source.kind(),
            RotatingSinkError::Closed(_) | RotatingSinkError::Internal(_) => io::ErrorKind::Other,
        }
    }
}

impl From<RotatingSinkError> for io::Error {
    fn from(err: RotatingSinkError) -> Self {
        io::Error::new(err.kind(), err)
    }
}

/// Provides a fluent interface for configuring [`RotatingSink`] instances.
///
/// # Default Configuration
///
/// * Unbounded capacity (no rotation)
/// * No backups
/// * Append to an existing file
/// * Parent directory must already exist
/// * Standard file permissions
///
/// # Examples
///
/// ```rust
/// use rotsink::{Capacity, OpenMode, RotatingSinkBuilder};
///
/// let dir = tempfile::tempdir().unwrap();
/// let sink = RotatingSinkBuilder::new(dir.path().join("logs/app.log"))
///     .capacity(Capacity::MB(100)) // Rotate at 100MB
///     .backup_count(5)             // Keep app.log.1 .. app.log.5
///     .open_mode(OpenMode::Truncate)
///     .create_dirs(true)
///     .build()
///     .unwrap();
/// assert_eq!(sink.bytes_used(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct RotatingSinkBuilder {
    meta: SinkMeta,
}

impl RotatingSinkBuilder {
    /// Create a new builder for the active file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        RotatingSinkBuilder {
            meta: SinkMeta::new(path.as_ref().to_path_buf()),
        }
    }

    /// Set the number of numbered backups to keep.
    pub fn backup_count(self, backup_count: usize) -> Self {
        Self {
            meta: SinkMeta {
                backup_count,
                ..self.meta
            },
        }
    }

    /// Set the capacity of the active file.
    pub fn capacity(self, capacity: Capacity) -> Self {
        Self {
            meta: SinkMeta {
                capacity_limit: capacity.bytes(),
                ..self.meta
            },
        }
    }

    /// Choose whether the first open appends or truncates.
    pub fn open_mode(self, open_mode: OpenMode) -> Self {
        Self {
            meta: SinkMeta { open_mode, ..self.meta },
        }
    }

    /// Create missing parent directories of the active file.
    pub fn create_dirs(self, create_dirs: bool) -> Self {
        Self {
            meta: SinkMeta {
                create_dirs,
                ..self.meta
            },
        }
    }

    /// Set the file permissions for the active file (Unix-like systems only).
    /// This sets the file mode bits in octal notation like when using chmod.
    /// For example, 0o644 for rw-r--r-- permissions.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            meta: SinkMeta {
                file_mode: Some(mode),
                ..self.meta
            },
        }
    }

    /// Open the active file and recover its accounting from disk.
    pub fn build(self) -> Result<RotatingSink, RotatingSinkError> {
        let file = self.meta.open_active(self.meta.open_mode)?;
        let stat_err = |source| RotatingSinkError::Stat {
            path: self.meta.path.clone(),
            source,
        };
        let metadata = file.metadata().map_err(stat_err)?;
        let modified = metadata.modified().map_err(stat_err)?;

        debug!(
            path = %self.meta.path.display(),
            existing_bytes = metadata.len(),
            capacity_limit = self.meta.capacity_limit,
            backup_count = self.meta.backup_count,
            "opened rotating sink"
        );

        Ok(RotatingSink {
            state: SinkState {
                bytes_used: metadata.len(),
                last_write_time: DateTime::<Utc>::from(modified),
            },
            meta: self.meta,
            handle: Some(file),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read(path: &Path) -> Vec<u8> {
        fs::read(path).unwrap()
    }

    #[test]
    fn test_capacity_bytes() {
        assert_eq!(Capacity::Unbounded.bytes(), 0);
        assert_eq!(Capacity::Bytes(7).bytes(), 7);
        assert_eq!(Capacity::KB(2).bytes(), 2048);
        assert_eq!(Capacity::MB(1).bytes(), 1_048_576);
        assert_eq!(Capacity::GB(1).bytes(), 1_073_741_824);
        assert_eq!(Capacity::GB(u64::MAX).bytes(), u64::MAX);
        assert!(Capacity::MB(0).is_unbounded());
        assert_eq!(Capacity::from(12), Capacity::Bytes(12));
    }

    #[test]
    fn test_backup_path() {
        let meta = SinkMeta::new(PathBuf::from("/var/log/app.log"));
        assert_eq!(meta.backup_path(1), PathBuf::from("/var/log/app.log.1"));
        assert_eq!(meta.backup_path(12), PathBuf::from("/var/log/app.log.12"));
    }

    #[test]
    fn test_rotation_enabled() {
        let mut meta = SinkMeta::new(PathBuf::from("app.log"));
        assert!(!meta.rotation_enabled());
        meta.capacity_limit = 10;
        assert!(!meta.rotation_enabled());
        meta.backup_count = 1;
        assert!(meta.rotation_enabled());
        meta.capacity_limit = 0;
        assert!(!meta.rotation_enabled());
    }

    #[test]
    fn test_split_write_scenario() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSink::open(&path, 2, 10).unwrap();

        assert_eq!(sink.write(b"12345").unwrap(), 5);
        assert_eq!(read(&path), b"12345");
        assert!(!sink.backup_path(1).exists());

        assert_eq!(sink.write(b"67890AB").unwrap(), 7);
        assert_eq!(read(&path), b"AB");
        assert_eq!(read(&sink.backup_path(1)), b"1234567890");
        assert!(!sink.backup_path(2).exists());
        assert_eq!(sink.bytes_used(), 2);
    }

    #[test]
    fn test_zero_length_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSink::open(&path, 1, 4).unwrap();
        sink.write(b"abcd").unwrap();

        assert_eq!(sink.write(b"").unwrap(), 0);
        assert_eq!(sink.bytes_used(), 4);
        assert!(!sink.backup_path(1).exists());
    }

    #[test]
    fn test_large_write_rotates_per_capacity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSink::open(&path, 3, 4).unwrap();

        assert_eq!(sink.write(b"aaaabbbbccccdd").unwrap(), 14);
        assert_eq!(read(&path), b"dd");
        assert_eq!(read(&sink.backup_path(1)), b"cccc");
        assert_eq!(read(&sink.backup_path(2)), b"bbbb");
        assert_eq!(read(&sink.backup_path(3)), b"aaaa");
    }

    #[test]
    fn test_forced_rotate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSink::open(&path, 2, 100).unwrap();
        sink.write(b"first").unwrap();

        sink.rotate().unwrap();
        assert_eq!(sink.bytes_used(), 0);
        assert_eq!(read(&path), b"");
        assert_eq!(read(&sink.backup_path(1)), b"first");

        sink.write(b"second").unwrap();
        assert_eq!(read(&path), b"second");
    }

    #[test]
    fn test_rotate_without_backups_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSink::open(&path, 0, 4).unwrap();
        sink.write(b"abc").unwrap();

        sink.rotate().unwrap();
        assert_eq!(sink.bytes_used(), 3);
        assert!(!sink.backup_path(1).exists());
    }

    #[test]
    fn test_failed_rotation_leaves_sink_closed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSink::open(&path, 1, 4).unwrap();
        sink.write(b"abc").unwrap();

        // A directory squatting on the backup slot makes the remove step fail.
        fs::create_dir(sink.backup_path(1)).unwrap();
        let err = sink.write(b"defg").unwrap_err();
        assert!(matches!(err, RotatingSinkError::Remove { .. }), "{err}");
        // the head that fit before the rotation still counts
        assert_eq!(sink.bytes_used(), 4);
        assert_eq!(read(&path), b"abcd");

        let err = sink.write(b"x").unwrap_err();
        assert!(matches!(err, RotatingSinkError::Closed(_)));
        assert!(matches!(sink.flush(), Err(RotatingSinkError::Closed(_))));
        sink.close().unwrap();
    }

    #[test]
    fn test_error_converts_to_io_error() {
        let err = RotatingSinkError::Open {
            path: PathBuf::from("missing/app.log"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let io_err = io::Error::from(err);
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
        assert!(io_err.to_string().contains("missing/app.log"));
        assert_eq!(
            io::Error::from(RotatingSinkError::Closed(PathBuf::from("app.log"))).kind(),
            io::ErrorKind::Other
        );
    }

    #[test]
    fn test_backups_listing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSink::open(&path, 2, 2).unwrap();
        assert!(sink.backups().unwrap().is_empty());

        // stale files outside the retained range or with other names
        fs::write(dir.path().join("app.log.9"), b"old").unwrap();
        fs::write(dir.path().join("app.log.x"), b"junk").unwrap();
        fs::write(dir.path().join("appxlog.1"), b"junk").unwrap();

        sink.write(b"aabbcc").unwrap();
        assert_eq!(sink.backups().unwrap(), vec![sink.backup_path(1), sink.backup_path(2)]);
    }

    #[test]
    fn test_huge_backup_count_rotates_promptly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSink::open(&path, usize::MAX, 2).unwrap();

        sink.write(b"aabbcc").unwrap();
        assert_eq!(read(&path), b"cc");
        assert_eq!(read(&sink.backup_path(1)), b"bb");
        assert_eq!(read(&sink.backup_path(2)), b"aa");
        assert_eq!(sink.backups().unwrap().len(), 2);
    }

    #[test]
    fn test_backup_name_pattern_is_literal() {
        let pattern = backup_name_pattern(OsStr::new("a+b.log")).unwrap();
        assert!(pattern.is_match(b"a+b.log.3"));
        assert!(!pattern.is_match(b"aab.log.3"));
        assert!(!pattern.is_match(b"a+b.log.3.gz"));
        assert!(!pattern.is_match(b"a+b.log."));
    }

    #[cfg(unix)]
    #[test]
    fn test_backups_with_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"app\xff.log"));
        let mut sink = RotatingSink::open(&path, 2, 2).unwrap();

        sink.write(b"aabbcc").unwrap();
        assert_eq!(sink.backups().unwrap(), vec![sink.backup_path(1), sink.backup_path(2)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode_applied_on_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingSinkBuilder::new(&path)
            .capacity(Capacity::Bytes(2))
            .backup_count(1)
            .file_mode(0o600)
            .build()
            .unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);

        sink.write(b"abc").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
    }
}
