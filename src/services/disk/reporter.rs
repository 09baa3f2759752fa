use crate::core::errors::{Error, Result};
use crate::models::DiskSpaceInfo;
use crate::services::fs::PathStatSource;
use std::path::{Path, PathBuf};

/// Capacity figures for the volume holding a path.
pub struct DiskUsageReporter<'a, S: ?Sized> {
    source: &'a S,
}

impl<'a, S: PathStatSource + ?Sized> DiskUsageReporter<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Not retried on failure; `VolumeUnavailable` is transient and the caller decides.
    pub fn report(&self, path: &Path) -> Result<DiskSpaceInfo> {
        let volume_path = self.containing_volume(path);
        let stats = self.source.volume_stats(&volume_path)?;
        let info = DiskSpaceInfo::from_bytes(stats.total_bytes, stats.free_bytes);
        tracing::debug!(
            path = %volume_path.display(),
            total = info.total_bytes,
            free = info.free_bytes,
            "volume statted"
        );
        Ok(info)
    }

    /// Sums several volumes. Volumes that cannot be statted are left out; the
    /// call only fails when none of them could be.
    pub fn report_all(&self, paths: &[PathBuf]) -> Result<DiskSpaceInfo> {
        let mut total_bytes = 0u64;
        let mut free_bytes = 0u64;
        let mut reported = 0usize;
        let mut last_error: Option<Error> = None;

        for path in paths {
            match self.report(path) {
                Ok(info) => {
                    total_bytes = total_bytes.saturating_add(info.total_bytes);
                    free_bytes = free_bytes.saturating_add(info.free_bytes);
                    reported += 1;
                }
                Err(err) => {
                    tracing::warn!("skipping volume {:?}: {}", path, err);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if reported == 0 => Err(err),
            _ => Ok(DiskSpaceInfo::from_bytes(total_bytes, free_bytes)),
        }
    }

    /// Nearest existing ancestor of `path`, so a path that is about to be
    /// created still reports the volume it would land on.
    fn containing_volume(&self, path: &Path) -> PathBuf {
        path.ancestors()
            .filter(|ancestor| !ancestor.as_os_str().is_empty())
            .find_map(|ancestor| self.source.resolve(ancestor).ok())
            .unwrap_or_else(|| path.to_path_buf())
    }
}
