use super::source::{display_name, EntryKind, EntryStat, Listing, PathStatSource, VolumeStats};
use crate::core::errors::{Error, Result};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Modification time given to every in-memory entry.
pub const MEMORY_MTIME_MS: i64 = 1_700_000_000_000;

#[derive(Debug, Clone)]
enum MemoryEntry {
    File { size: u64 },
    Dir { denied: bool },
    Symlink,
    /// Listed by its parent, gone by the time anything opens it.
    Vanishing,
}

#[derive(Debug, Clone)]
struct MemoryVolume {
    mount: PathBuf,
    stats: Option<VolumeStats>,
}

/// In-memory [`PathStatSource`]. Parent directories are created implicitly.
///
/// ```
/// use diskscope::services::fs::MemoryStatSource;
///
/// let source = MemoryStatSource::new()
///     .file("/data/a.txt", 100)
///     .file("/data/b/c.txt", 50)
///     .denied_dir("/data/private");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStatSource {
    entries: BTreeMap<PathBuf, MemoryEntry>,
    volumes: Vec<MemoryVolume>,
    latency: Option<Duration>,
}

impl MemoryStatSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemoryEntry::Dir { denied: false });
        self
    }

    /// A directory that exists but cannot be listed.
    pub fn denied_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemoryEntry::Dir { denied: true });
        self
    }

    pub fn file(mut self, path: impl AsRef<Path>, size: u64) -> Self {
        self.insert(path.as_ref(), MemoryEntry::File { size });
        self
    }

    pub fn symlink(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemoryEntry::Symlink);
        self
    }

    /// A directory that shows up in its parent's listing but is deleted
    /// before it can be opened or statted.
    pub fn vanishing(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), MemoryEntry::Vanishing);
        self
    }

    pub fn volume(mut self, mount: impl Into<PathBuf>, total_bytes: u64, free_bytes: u64) -> Self {
        self.volumes.push(MemoryVolume {
            mount: mount.into(),
            stats: Some(VolumeStats {
                total_bytes,
                free_bytes,
            }),
        });
        self
    }

    /// A mount whose capacity query always fails, like a dropped network share.
    pub fn offline_volume(mut self, mount: impl Into<PathBuf>) -> Self {
        self.volumes.push(MemoryVolume {
            mount: mount.into(),
            stats: None,
        });
        self
    }

    /// Delay applied to every listing, to emulate slow storage.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn insert(&mut self, path: &Path, entry: MemoryEntry) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.entries
                .entry(ancestor.to_path_buf())
                .or_insert(MemoryEntry::Dir { denied: false });
        }
        self.entries.insert(path.to_path_buf(), entry);
    }

    fn lookup(&self, path: &Path) -> Result<&MemoryEntry> {
        match self.entries.get(path) {
            Some(MemoryEntry::Vanishing) | None => Err(Error::NotFound(path.to_path_buf())),
            Some(entry) => Ok(entry),
        }
    }

    fn open_dir(&self, path: &Path) -> Result<()> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
        match self.lookup(path)? {
            MemoryEntry::Dir { denied: false } => Ok(()),
            MemoryEntry::Dir { denied: true } => Err(Error::PermissionDenied(path.to_path_buf())),
            MemoryEntry::File { .. } | MemoryEntry::Symlink => {
                Err(Error::NotADirectory(path.to_path_buf()))
            }
            MemoryEntry::Vanishing => Err(Error::NotFound(path.to_path_buf())),
        }
    }

    fn children<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a PathBuf> + 'a {
        self.entries
            .keys()
            .filter(move |candidate| candidate.parent() == Some(path))
    }

    fn entry_stat(path: &Path, entry: &MemoryEntry) -> EntryStat {
        let (kind, size) = match entry {
            MemoryEntry::File { size } => (EntryKind::File, *size),
            MemoryEntry::Dir { .. } | MemoryEntry::Vanishing => (EntryKind::Directory, 0),
            MemoryEntry::Symlink => (EntryKind::Symlink, 0),
        };
        EntryStat {
            name: display_name(path),
            path: path.to_path_buf(),
            kind,
            size,
            modified: MEMORY_MTIME_MS,
        }
    }
}

impl PathStatSource for MemoryStatSource {
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        self.lookup(path)?;
        Ok(path.to_path_buf())
    }

    fn stat(&self, path: &Path) -> Result<EntryStat> {
        let entry = self.lookup(path)?;
        Ok(Self::entry_stat(path, entry))
    }

    fn list_entries(&self, path: &Path) -> Result<Listing> {
        self.open_dir(path)?;
        let entries = self
            .children(path)
            .map(|child| Self::entry_stat(child, &self.entries[child]))
            .collect();
        Ok(Listing {
            entries,
            skipped: Vec::new(),
        })
    }

    fn has_children(&self, path: &Path) -> Result<bool> {
        self.open_dir(path)?;
        Ok(self.children(path).next().is_some())
    }

    fn volume_stats(&self, path: &Path) -> Result<VolumeStats> {
        let volume = self
            .volumes
            .iter()
            .filter(|volume| path.starts_with(&volume.mount))
            .max_by_key(|volume| volume.mount.components().count());
        match volume.and_then(|volume| volume.stats) {
            Some(stats) => Ok(stats),
            None => Err(Error::VolumeUnavailable {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "volume is not mounted"),
            }),
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|(path, entry)| {
                matches!(entry, MemoryEntry::Dir { .. })
                    && path.parent().map_or(true, |parent| !self.entries.contains_key(parent))
            })
            .map(|(path, _)| path.clone())
            .collect()
    }
}
