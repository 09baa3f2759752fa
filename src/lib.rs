//! Filesystem tree scanning and disk-usage aggregation for a file-browser UI.
//!
//! [`SnapshotApi`] is the entry point: it lists a directory to a requested
//! depth, sizes every directory in the result (descending on disk below that
//! depth), and reports volume capacity. Each call is an independent snapshot.

pub mod core;
pub mod models;
pub mod services;

pub use crate::core::cancel::CancelFlag;
pub use crate::core::config::EngineConfig;
pub use crate::core::errors::{Error, ErrorKind, PartialResultWarning, Result, SkippedEntry};
pub use crate::models::{DiskSpaceInfo, FileSystemItem, FileSystemNode};
pub use crate::services::{ApiError, ApiResult, SnapshotApi, TreeSnapshot};
