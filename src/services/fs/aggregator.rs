use super::pool::WorkerPool;
use super::scanner::{NodeState, ScanTree};
use super::source::PathStatSource;
use crate::core::cancel::CancelFlag;
use crate::core::errors::{Error, SkippedEntry};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    pub total_bytes: u64,
    /// Directories visited on disk below the materialized tree.
    pub directories_measured: u64,
    pub incomplete: bool,
}

struct MeasureJob {
    /// Index into the frontier list the bytes are credited to.
    slot: usize,
    path: PathBuf,
    /// The frontier directory itself rather than something below it.
    seed: bool,
}

/// Fills in directory sizes bottom-up.
///
/// Hard links are counted once per directory entry that names them.
pub struct SizeAggregator<'a, S: ?Sized> {
    source: &'a S,
    pool: &'a WorkerPool,
}

impl<'a, S: PathStatSource + ?Sized> SizeAggregator<'a, S> {
    pub fn new(source: &'a S, pool: &'a WorkerPool) -> Self {
        Self { source, pool }
    }

    /// Sizes every directory in `tree`, descending on disk below frontier
    /// directories. Unreadable subtrees contribute what could be read and
    /// are recorded as skipped. A frontier directory deleted since the scan
    /// is detached from the tree; deleted directories below it add nothing.
    pub fn aggregate(&self, tree: &mut ScanTree, cancel: &CancelFlag) -> AggregateReport {
        let started = Instant::now();
        let frontier: Vec<usize> = tree
            .nodes()
            .filter(|(_, node)| node.state == NodeState::Frontier)
            .map(|(id, _)| id)
            .collect();

        let totals: Vec<AtomicU64> = frontier.iter().map(|_| AtomicU64::new(0)).collect();
        let broken: Vec<AtomicBool> = frontier.iter().map(|_| AtomicBool::new(false)).collect();
        let vanished: Vec<AtomicBool> = frontier.iter().map(|_| AtomicBool::new(false)).collect();
        let skipped: Mutex<Vec<SkippedEntry>> = Mutex::new(Vec::new());
        let visited = AtomicU64::new(0);

        let seeds: Vec<MeasureJob> = frontier
            .iter()
            .enumerate()
            .map(|(slot, id)| MeasureJob {
                slot,
                path: tree.nodes[*id].path.clone(),
                seed: true,
            })
            .collect();

        let finished = self.pool.run(seeds, cancel, |job| {
            visited.fetch_add(1, Ordering::Relaxed);
            match self.source.list_entries(&job.path) {
                Ok(listing) => {
                    if !listing.skipped.is_empty() {
                        broken[job.slot].store(true, Ordering::Relaxed);
                        skipped
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend(listing.skipped);
                    }
                    let mut bytes = 0u64;
                    let mut next = Vec::new();
                    for entry in listing.entries {
                        if entry.is_dir() {
                            next.push(MeasureJob {
                                slot: job.slot,
                                path: entry.path,
                                seed: false,
                            });
                        } else {
                            bytes = bytes.saturating_add(entry.size);
                        }
                    }
                    totals[job.slot].fetch_add(bytes, Ordering::Relaxed);
                    next
                }
                Err(Error::NotFound(_)) => {
                    tracing::debug!("{:?} vanished before it was measured", job.path);
                    if job.seed {
                        vanished[job.slot].store(true, Ordering::Relaxed);
                    }
                    Vec::new()
                }
                Err(err) => {
                    tracing::warn!("cannot measure {:?}: {}", job.path, err);
                    broken[job.slot].store(true, Ordering::Relaxed);
                    skipped
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(SkippedEntry::new(&job.path, err));
                    Vec::new()
                }
            }
        });

        for node in tree.nodes.iter_mut() {
            if node.state != NodeState::File {
                node.item.size = 0;
            }
        }
        for (slot, id) in frontier.iter().enumerate() {
            if vanished[slot].load(Ordering::Relaxed) {
                tree.detach(*id);
                continue;
            }
            let node = &mut tree.nodes[*id];
            node.item.size = totals[slot].load(Ordering::Relaxed);
            // A cancelled run may have dropped queued jobs of any frontier node.
            if broken[slot].load(Ordering::Relaxed) || !finished {
                node.incomplete = true;
            }
        }
        tree.skipped
            .extend(skipped.into_inner().unwrap_or_else(PoisonError::into_inner));
        if !finished {
            tree.cancelled = true;
        }

        // Children sit at higher ids than their parents, so each node is final
        // before it is added upward.
        for id in (1..tree.nodes.len()).rev() {
            let (size, incomplete, parent) = {
                let node = &tree.nodes[id];
                (node.item.size, node.incomplete, node.parent)
            };
            if let Some(parent) = parent {
                let parent = &mut tree.nodes[parent];
                parent.item.size = parent.item.size.saturating_add(size);
                parent.incomplete |= incomplete;
            }
        }
        tree.propagate_incomplete();

        let report = AggregateReport {
            total_bytes: tree.root().item.size,
            directories_measured: visited.load(Ordering::Relaxed),
            incomplete: tree.is_incomplete(),
        };
        tracing::info!(
            root = %tree.root().path.display(),
            total_bytes = report.total_bytes,
            directories_measured = report.directories_measured,
            incomplete = report.incomplete,
            "aggregation finished in {:?}",
            started.elapsed()
        );
        report
    }
}
