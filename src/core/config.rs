use std::env;
use std::str::FromStr;
use std::thread;

const WORKERS_ENV: &str = "DISKSCOPE_WORKERS";
const MAX_PREVIEW_BYTES_ENV: &str = "DISKSCOPE_MAX_PREVIEW_BYTES";

const MIN_WORKERS: usize = 2;
const MAX_WORKERS: usize = 8;

/// Tunables shared by every request an engine serves.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on directories listed concurrently, and therefore on open handles.
    pub workers: usize,
    /// Images above this size are refused by the preview endpoint.
    pub max_preview_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(MIN_WORKERS)
            .clamp(MIN_WORKERS, MAX_WORKERS);
        Self {
            workers,
            max_preview_bytes: 32 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_preview_bytes(mut self, limit: u64) -> Self {
        self.max_preview_bytes = limit;
        self
    }

    /// Defaults overridden by `DISKSCOPE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(workers) = read_env::<usize>(WORKERS_ENV) {
            config = config.with_workers(workers);
        }
        if let Some(limit) = read_env::<u64>(MAX_PREVIEW_BYTES_ENV) {
            config = config.with_max_preview_bytes(limit);
        }
        config
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}
