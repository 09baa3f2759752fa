use crate::core::cancel::CancelFlag;
use crate::core::config::EngineConfig;
use crate::core::errors::{Error, ErrorKind, PartialResultWarning, Result};
use crate::models::{DiskSpaceInfo, FileSystemItem, FileSystemNode};
use crate::services::disk::DiskUsageReporter;
use crate::services::fs::{
    LocalStatSource, PathStatSource, SizeAggregator, TreeScanner, WorkerPool,
};
use crate::services::preview;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task;

/// Response to a tree request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub root: FileSystemNode,
    pub incomplete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<PartialResultWarning>,
}

/// Failure as sent to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub retryable: bool,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            path: err.path().map(|p| p.to_string_lossy().into_owned()),
            retryable: err.is_retryable(),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Request boundary used by the UI. Every call is a self-contained snapshot;
/// filesystem work runs on the blocking pool so async callers never stall.
pub struct SnapshotApi<S = LocalStatSource> {
    source: Arc<S>,
    config: EngineConfig,
}

impl SnapshotApi<LocalStatSource> {
    pub fn local(config: EngineConfig) -> Self {
        Self::new(LocalStatSource::new(), config)
    }
}

impl<S: PathStatSource + 'static> SnapshotApi<S> {
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self {
            source: Arc::new(source),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lists `path` to `depth` levels and sizes every directory in the result.
    pub async fn get_tree(
        &self,
        path: impl Into<PathBuf>,
        depth: usize,
        cancel: CancelFlag,
    ) -> ApiResult<TreeSnapshot> {
        let path = path.into();
        let workers = self.config.workers;
        self.blocking(move |source| {
            let pool = WorkerPool::new(workers)?;
            let mut tree = TreeScanner::new(source, &pool).scan(&path, depth, &cancel)?;
            SizeAggregator::new(source, &pool).aggregate(&mut tree, &cancel);
            let warning = tree.warning();
            Ok(TreeSnapshot {
                root: tree.to_node(),
                incomplete: tree.is_incomplete(),
                warning: (!warning.is_empty()).then_some(warning),
            })
        })
        .await
    }

    pub async fn get_disk_space(&self, path: impl Into<PathBuf>) -> ApiResult<DiskSpaceInfo> {
        let path = path.into();
        self.blocking(move |source| DiskUsageReporter::new(source).report(&path))
            .await
    }

    /// Capacity of every browsable root, summed.
    pub async fn get_system_disk_space(&self) -> ApiResult<DiskSpaceInfo> {
        self.blocking(|source| DiskUsageReporter::new(source).report_all(&source.roots()))
            .await
    }

    /// A single entry, without sizing directories.
    pub async fn get_item(&self, path: impl Into<PathBuf>) -> ApiResult<FileSystemItem> {
        let path = path.into();
        self.blocking(move |source| {
            let resolved = source.resolve(&path)?;
            let stat = source.stat(&resolved)?;
            let is_leaf = if stat.is_dir() {
                !source.has_children(&resolved).unwrap_or(true)
            } else {
                true
            };
            Ok(stat.to_item(is_leaf))
        })
        .await
    }

    /// Drive roots on Windows, `/` elsewhere.
    ///
    /// On Unix this is the single item for `/` itself rather than the entries
    /// inside it; the caller expands it with `get_tree` like any other
    /// directory.
    pub async fn get_roots(&self) -> ApiResult<Vec<FileSystemItem>> {
        self.blocking(|source| {
            let items = source
                .roots()
                .into_iter()
                .filter_map(|root| match source.stat(&root) {
                    Ok(stat) => Some(stat.to_item(false)),
                    Err(err) => {
                        tracing::debug!("skipping root {:?}: {}", root, err);
                        None
                    }
                })
                .collect();
            Ok(items)
        })
        .await
    }

    pub async fn get_image_data(&self, path: impl Into<PathBuf>) -> ApiResult<String> {
        let path = path.into();
        let limit = self.config.max_preview_bytes;
        task::spawn_blocking(move || preview::image_data_url(&path, limit))
            .await
            .map_err(|e| Error::Other(format!("preview task failed: {e}")))?
            .map_err(ApiError::from)
    }

    async fn blocking<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let outcome = task::spawn_blocking(move || f(source.as_ref()))
            .await
            .map_err(|e| Error::Other(format!("blocking task failed: {e}")))?;
        outcome.map_err(|err| {
            tracing::debug!("request failed: {}", err);
            ApiError::from(err)
        })
    }
}
