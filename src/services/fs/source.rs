use crate::core::errors::{Error, Result, SkippedEntry};
use crate::models::FileSystemItem;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Metadata of one entry, read without following symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStat {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Zero for directories.
    pub size: u64,
    /// Epoch milliseconds, 0 when unknown.
    pub modified: i64,
}

impl EntryStat {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Builds the wire item. Anything that is not a directory is a leaf.
    pub fn to_item(&self, is_leaf: bool) -> FileSystemItem {
        let path = self.path.to_string_lossy().into_owned();
        FileSystemItem {
            key: path.clone(),
            label: self.name.clone(),
            path,
            name: self.name.clone(),
            is_directory: self.is_dir(),
            size: if self.is_dir() { 0 } else { self.size },
            modified: self.modified,
            is_leaf: is_leaf || !self.is_dir(),
        }
    }
}

/// Result of listing one directory. Entries that could not be statted are
/// reported in `skipped` instead of failing the listing.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub entries: Vec<EntryStat>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeStats {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// Read-only access to entry metadata and volume capacity.
pub trait PathStatSource: Send + Sync {
    /// Normalizes a caller-supplied path into the absolute form used as item keys.
    fn resolve(&self, path: &Path) -> Result<PathBuf>;

    fn stat(&self, path: &Path) -> Result<EntryStat>;

    /// Fails with `NotFound`, `PermissionDenied` or `NotADirectory` for `path` itself.
    fn list_entries(&self, path: &Path) -> Result<Listing>;

    /// Whether `path` has at least one entry, without listing all of them.
    fn has_children(&self, path: &Path) -> Result<bool>;

    fn volume_stats(&self, path: &Path) -> Result<VolumeStats>;

    /// Top-level locations a user can browse from.
    fn roots(&self) -> Vec<PathBuf>;
}

/// [`PathStatSource`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStatSource;

impl LocalStatSource {
    pub fn new() -> Self {
        Self
    }
}

impl PathStatSource for LocalStatSource {
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).map_err(|e| Error::from_io(path, e))
    }

    fn stat(&self, path: &Path) -> Result<EntryStat> {
        let md = fs::symlink_metadata(path).map_err(|e| Error::from_io(path, e))?;
        Ok(stat_from_metadata(display_name(path), path.to_path_buf(), &md))
    }

    fn list_entries(&self, path: &Path) -> Result<Listing> {
        ensure_dir(path)?;
        let reader = fs::read_dir(path).map_err(|e| Error::from_io(path, e))?;

        let mut listing = Listing::default();
        for entry in reader {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("skipping unreadable entry in {:?}: {}", path, err);
                    listing.skipped.push(SkippedEntry::new(path, err));
                    continue;
                }
            };
            let entry_path = entry.path();
            match fs::symlink_metadata(&entry_path) {
                Ok(md) => listing.entries.push(stat_from_metadata(
                    os_str_to_string(entry.file_name()),
                    entry_path,
                    &md,
                )),
                // Removed between read_dir and stat.
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("entry vanished during listing: {:?}", entry_path);
                }
                Err(err) => {
                    tracing::debug!("failed to stat {:?}: {}", entry_path, err);
                    listing.skipped.push(SkippedEntry::new(&entry_path, err));
                }
            }
        }
        Ok(listing)
    }

    fn has_children(&self, path: &Path) -> Result<bool> {
        ensure_dir(path)?;
        let mut reader = fs::read_dir(path).map_err(|e| Error::from_io(path, e))?;
        Ok(reader.next().is_some())
    }

    fn volume_stats(&self, path: &Path) -> Result<VolumeStats> {
        let stats = fs2::statvfs(path).map_err(|source| Error::VolumeUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(VolumeStats {
            total_bytes: stats.total_space(),
            free_bytes: stats.available_space(),
        })
    }

    #[cfg(windows)]
    fn roots(&self) -> Vec<PathBuf> {
        (b'A'..=b'Z')
            .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
            .filter(|drive| drive.exists())
            .collect()
    }

    #[cfg(not(windows))]
    fn roots(&self) -> Vec<PathBuf> {
        vec![PathBuf::from("/")]
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    let md = fs::metadata(path).map_err(|e| Error::from_io(path, e))?;
    if md.is_dir() {
        Ok(())
    } else {
        Err(Error::NotADirectory(path.to_path_buf()))
    }
}

fn stat_from_metadata(name: String, path: PathBuf, md: &fs::Metadata) -> EntryStat {
    let file_type = md.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };
    EntryStat {
        name,
        path,
        kind,
        size: if kind == EntryKind::Directory { 0 } else { md.len() },
        modified: md.modified().map(epoch_millis).unwrap_or(0),
    }
}

pub(crate) fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

/// Base name of `path`, or the whole path for roots such as `/` or `C:\`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(os_str_to_string)
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn os_str_to_string(s: impl AsRef<OsStr>) -> String {
    s.as_ref().to_string_lossy().into_owned()
}
