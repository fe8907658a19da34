//! Size-based log file rotation
//!
//! The active file lives at `directory/filename`. When a write would push it
//! past the size limit it is renamed to `<stem>-<timestamp><ext>` and a fresh
//! file takes its place. After every rotation the backups are pruned by count
//! and age, and optionally gzipped.

use crate::{sink::Sink, Error, Result};
use chrono::{Local, NaiveDateTime, SubsecRound, TimeDelta, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const MEGABYTE: u64 = 1024 * 1024;

/// Size used when the configured limit is zero
pub const DEFAULT_MAX_SIZE_MB: u64 = 100;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESS_SUFFIX: &str = ".gz";

/// Thresholds controlling rotation and retention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before the active file would grow past this many bytes
    pub max_size_bytes: u64,
    /// Backups to keep, newest first; 0 keeps all
    pub max_backups: usize,
    /// Delete backups older than this many days; 0 disables
    pub max_age_days: u64,
    /// Gzip backups after rotation
    pub compress: bool,
    /// Name backups with local time instead of UTC
    pub local_time: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_MB * MEGABYTE,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
            local_time: false,
        }
    }
}

impl RotationPolicy {
    pub fn new(max_size_mb: u64, max_age_days: u64, max_backups: usize) -> Self {
        let max_size_mb = if max_size_mb == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            max_size_mb
        };

        Self {
            max_size_bytes: max_size_mb.saturating_mul(MEGABYTE),
            max_backups,
            max_age_days,
            ..Self::default()
        }
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_local_time(mut self, local_time: bool) -> Self {
        self.local_time = local_time;
        self
    }

    fn now(&self) -> NaiveDateTime {
        if self.local_time {
            Local::now().naive_local()
        } else {
            Utc::now().naive_utc()
        }
    }
}

/// A rotated file sitting next to the active one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    pub rotated_at: NaiveDateTime,
    pub compressed: bool,
}

struct ActiveFile {
    file: Option<File>,
    size: u64,
}

/// A log file that rotates itself once it grows past a size limit
pub struct RotatingFile {
    directory: PathBuf,
    filename: String,
    policy: RotationPolicy,
    active: Mutex<ActiveFile>,
}

impl RotatingFile {
    /// Create the file's directory if needed and open it for appending
    ///
    /// `filename` may contain directories of its own; they are created below
    /// `directory` and rotated backups sit next to the active file.
    pub fn open(directory: impl AsRef<Path>, filename: &str, policy: RotationPolicy) -> Result<Self> {
        let filename = if filename.is_empty() {
            default_filename()
        } else {
            filename.to_string()
        };

        let path = directory.as_ref().join(&filename);
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("log file path {} has no file name", path.display()),
                )
            })?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&directory)?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();

        tracing::debug!(
            event = "log_file_opened",
            file_path = %path.display(),
            current_size = size,
            "Log file opened"
        );

        Ok(Self {
            directory,
            filename,
            policy,
            active: Mutex::new(ActiveFile {
                file: Some(file),
                size,
            }),
        })
    }

    /// Path of the active file
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Rotate now, regardless of size
    pub fn rotate(&self) -> Result<()> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        self.rotate_locked(&mut active)
    }

    /// Backups of this file, newest first
    pub fn backups(&self) -> Result<Vec<BackupFile>> {
        let (stem, ext) = split_filename(&self.filename);
        let prefix = format!("{}-", stem);
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            let (name_without_gz, compressed) = match name.strip_suffix(COMPRESS_SUFFIX) {
                Some(rest) => (rest, true),
                None => (name, false),
            };

            let timestamp = name_without_gz
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(ext));
            let Some(timestamp) = timestamp else {
                continue;
            };

            if let Ok(rotated_at) = NaiveDateTime::parse_from_str(timestamp, BACKUP_TIME_FORMAT) {
                backups.push(BackupFile {
                    path: entry.path(),
                    rotated_at,
                    compressed,
                });
            }
        }

        backups.sort_by(|a, b| {
            b.rotated_at
                .cmp(&a.rotated_at)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(backups)
    }

    fn rotate_locked(&self, active: &mut ActiveFile) -> Result<()> {
        if let Some(mut file) = active.file.take() {
            file.flush()?;
        }

        let current = self.path();
        if current.exists() {
            let backup = self.backup_path()?;
            fs::rename(&current, &backup)?;

            tracing::info!(
                event = "log_rotated",
                old_file = %current.display(),
                new_file = %backup.display(),
                "Log file rotated"
            );
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&current)?;
        active.file = Some(file);
        active.size = 0;

        if let Err(e) = self.prune() {
            tracing::warn!(
                event = "log_prune_failed",
                error = %e,
                "Failed to prune rotated log files"
            );
        }

        Ok(())
    }

    /// Timestamped backup name, always later than every existing backup
    fn backup_path(&self) -> Result<PathBuf> {
        let (stem, ext) = split_filename(&self.filename);
        let mut rotated_at = self.policy.now().trunc_subsecs(3);

        if let Some(newest) = self.backups()?.first() {
            if newest.rotated_at >= rotated_at {
                rotated_at = newest.rotated_at + TimeDelta::milliseconds(1);
            }
        }

        let name = format!("{}-{}{}", stem, rotated_at.format(BACKUP_TIME_FORMAT), ext);
        Ok(self.directory.join(name))
    }

    /// Apply the count and age limits, then compress what is left
    fn prune(&self) -> Result<()> {
        let backups = self.backups()?;
        let cutoff = if self.policy.max_age_days > 0 {
            i64::try_from(self.policy.max_age_days)
                .ok()
                .and_then(TimeDelta::try_days)
                .and_then(|max_age| self.policy.now().checked_sub_signed(max_age))
        } else {
            None
        };

        let mut kept = Vec::new();
        for (index, backup) in backups.into_iter().enumerate() {
            let over_count = self.policy.max_backups > 0 && index >= self.policy.max_backups;
            let too_old = cutoff.is_some_and(|cutoff| backup.rotated_at < cutoff);

            if over_count || too_old {
                fs::remove_file(&backup.path)?;
                tracing::debug!(
                    event = "log_backup_removed",
                    file_path = %backup.path.display(),
                    over_count,
                    too_old,
                    "Removed rotated log file"
                );
            } else {
                kept.push(backup);
            }
        }

        if self.policy.compress {
            for backup in kept.iter().filter(|b| !b.compressed) {
                compress_file(&backup.path)?;
            }
        }

        Ok(())
    }
}

impl Sink for RotatingFile {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        let len = record.len() as u64;
        if len > self.policy.max_size_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {} exceeds maximum file size {}",
                    len, self.policy.max_size_bytes
                ),
            ));
        }

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        if active.file.is_none() || active.size + len > self.policy.max_size_bytes {
            self.rotate_locked(&mut active).map_err(into_io)?;
        }

        let file = active
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No file open"))?;
        file.write_all(record)?;
        active.size += len;
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = active.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Gzip `path` into `path.gz` and remove the original
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut compressed_name = path.as_os_str().to_owned();
    compressed_name.push(COMPRESS_SUFFIX);
    let compressed_path = PathBuf::from(compressed_name);

    let mut input = io::BufReader::new(File::open(path)?);
    let output = File::create(&compressed_path)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)?;

    tracing::debug!(
        event = "log_compressed",
        original_file = %path.display(),
        compressed_file = %compressed_path.display(),
        "Log file compressed"
    );

    Ok(compressed_path)
}

/// `core.log` → (`core`, `.log`); names without an extension keep an empty one
fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], &filename[idx..]),
        _ => (filename, ""),
    }
}

fn default_filename() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .map(|stem| format!("{}.log", stem))
        .unwrap_or_else(|| "rotalog.log".to_string())
}

fn into_io(err: Error) -> io::Error {
    match err {
        Error::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}
