pub mod disk;
pub mod fs;
pub mod preview;
pub mod snapshot;

pub use snapshot::{ApiError, ApiResult, SnapshotApi, TreeSnapshot};
