use super::pool::WorkerPool;
use super::source::{EntryStat, Listing, PathStatSource};
use crate::core::cancel::CancelFlag;
use crate::core::errors::{Error, PartialResultWarning, Result, SkippedEntry};
use crate::models::{FileSystemItem, FileSystemNode};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Index of a node inside its [`ScanTree`].
pub type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Not a directory (regular file, symlink or special file).
    File,
    /// Children were listed into the tree.
    Expanded,
    /// Directory beyond the requested depth; children exist only on disk.
    Frontier,
    /// Directory queued for a listing or an emptiness check.
    Pending,
    /// Directory whose listing failed.
    Unreadable,
    /// Listed by its parent but deleted before it could be opened. Detached
    /// from the tree and left out of the wire form.
    Vanished,
}

#[derive(Debug, Clone)]
pub struct ScanNode {
    pub item: FileSystemItem,
    pub path: PathBuf,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub state: NodeState,
    pub incomplete: bool,
}

impl ScanNode {
    fn new(stat: EntryStat, parent: Option<NodeId>, state: NodeState) -> Self {
        Self {
            item: stat.to_item(false),
            path: stat.path,
            parent,
            children: Vec::new(),
            state,
            incomplete: false,
        }
    }
}

/// Arena holding one request's tree. Every node is allocated after its
/// parent, so a reverse sweep over ids always visits children first.
#[derive(Debug, Clone)]
pub struct ScanTree {
    pub(crate) nodes: Vec<ScanNode>,
    pub(crate) skipped: Vec<SkippedEntry>,
    pub(crate) cancelled: bool,
}

impl ScanTree {
    fn new(root: ScanNode) -> Self {
        Self {
            nodes: vec![root],
            skipped: Vec::new(),
            cancelled: false,
        }
    }

    pub fn root(&self) -> &ScanNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&ScanNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ScanNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn is_incomplete(&self) -> bool {
        self.cancelled || !self.skipped.is_empty() || self.root().incomplete
    }

    pub fn warning(&self) -> PartialResultWarning {
        PartialResultWarning {
            skipped: self.skipped.clone(),
            cancelled: self.cancelled,
        }
    }

    fn push(&mut self, node: ScanNode) -> NodeId {
        let id = self.nodes.len();
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    /// Unlinks `id` from its parent after the entry disappeared from disk.
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id].parent.take() else {
            return;
        };
        self.nodes[id].state = NodeState::Vanished;
        let parent = &mut self.nodes[parent];
        parent.children.retain(|child| *child != id);
        if parent.state == NodeState::Expanded && parent.children.is_empty() && !parent.incomplete {
            parent.item.is_leaf = true;
        }
    }

    /// Marks every ancestor of an incomplete node as incomplete.
    pub(crate) fn propagate_incomplete(&mut self) {
        if self.cancelled {
            self.nodes[ROOT].incomplete = true;
        }
        for id in (1..self.nodes.len()).rev() {
            if self.nodes[id].incomplete {
                if let Some(parent) = self.nodes[id].parent {
                    self.nodes[parent].incomplete = true;
                }
            }
        }
    }

    /// Nested wire form. Siblings are ordered by name, ignoring case.
    pub fn to_node(&self) -> FileSystemNode {
        let mut built: Vec<Option<FileSystemNode>> = (0..self.nodes.len()).map(|_| None).collect();
        for id in (1..self.nodes.len()).rev() {
            let node = self.build_node(id, &mut built);
            built[id] = Some(node);
        }
        self.build_node(ROOT, &mut built)
    }

    fn build_node(&self, id: NodeId, built: &mut [Option<FileSystemNode>]) -> FileSystemNode {
        let node = &self.nodes[id];
        let mut children: Vec<FileSystemNode> = node
            .children
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        children.sort_by_cached_key(|child| child.item.name.to_lowercase());
        FileSystemNode {
            item: node.item.clone(),
            children,
            expanded: node.state == NodeState::Expanded,
            incomplete: node.incomplete,
        }
    }
}

enum ScanJob {
    /// List a directory and attach its entries.
    Expand {
        node: NodeId,
        path: PathBuf,
        remaining: usize,
    },
    /// Decide whether a frontier directory has any entry at all.
    Peek { node: NodeId, path: PathBuf },
}

/// Materializes a directory tree down to a requested depth.
pub struct TreeScanner<'a, S: ?Sized> {
    source: &'a S,
    pool: &'a WorkerPool,
}

impl<'a, S: PathStatSource + ?Sized> TreeScanner<'a, S> {
    pub fn new(source: &'a S, pool: &'a WorkerPool) -> Self {
        Self { source, pool }
    }

    /// Lists `root` and `depth - 1` further levels below it.
    ///
    /// With `depth == 0` only the root is returned, its `isLeaf` decided by
    /// reading a single entry. Failures on the root are returned as errors;
    /// every failure below it is recorded in the tree instead. Entries that
    /// are deleted while the scan runs are dropped without a warning.
    pub fn scan(&self, root: &Path, depth: usize, cancel: &CancelFlag) -> Result<ScanTree> {
        let started = Instant::now();
        let root_path = self.source.resolve(root)?;
        let stat = self.source.stat(&root_path)?;
        if !stat.is_dir() {
            return Err(Error::NotADirectory(root_path));
        }

        let mut tree = ScanTree::new(ScanNode::new(stat, None, NodeState::Frontier));
        if depth == 0 {
            let has_children = self.source.has_children(&root_path)?;
            tree.nodes[ROOT].item.is_leaf = !has_children;
            return Ok(tree);
        }

        let listing = self.source.list_entries(&root_path)?;
        let tree = Mutex::new(tree);
        let seeds = attach(&tree, ROOT, listing, depth - 1);
        let finished = self.pool.run(seeds, cancel, |job| match job {
            ScanJob::Expand {
                node,
                path,
                remaining,
            } => self.expand(&tree, node, &path, remaining),
            ScanJob::Peek { node, path } => {
                self.peek(&tree, node, &path);
                Vec::new()
            }
        });

        let mut tree = tree.into_inner().unwrap_or_else(PoisonError::into_inner);
        if !finished {
            tree.cancelled = true;
            for node in tree.nodes.iter_mut() {
                if node.state == NodeState::Pending {
                    node.state = NodeState::Frontier;
                    node.incomplete = true;
                }
            }
        }
        tree.propagate_incomplete();

        tracing::info!(
            root = %root_path.display(),
            depth,
            nodes = tree.len(),
            skipped = tree.skipped.len(),
            cancelled = tree.cancelled,
            "scan finished in {:?}",
            started.elapsed()
        );
        Ok(tree)
    }

    fn expand(
        &self,
        tree: &Mutex<ScanTree>,
        node: NodeId,
        path: &Path,
        remaining: usize,
    ) -> Vec<ScanJob> {
        match self.source.list_entries(path) {
            Ok(listing) => attach(tree, node, listing, remaining),
            Err(Error::NotFound(_)) => {
                tracing::debug!("{:?} vanished before it was listed", path);
                lock(tree).detach(node);
                Vec::new()
            }
            Err(err) => {
                tracing::warn!("cannot list {:?}: {}", path, err);
                let mut tree = lock(tree);
                mark_unreadable(&mut tree.nodes[node]);
                tree.skipped.push(SkippedEntry::new(path, err));
                Vec::new()
            }
        }
    }

    fn peek(&self, tree: &Mutex<ScanTree>, node: NodeId, path: &Path) {
        let result = self.source.has_children(path);
        let mut tree = lock(tree);
        match result {
            Ok(has_children) => {
                let node = &mut tree.nodes[node];
                node.state = NodeState::Frontier;
                node.item.is_leaf = !has_children;
            }
            Err(Error::NotFound(_)) => {
                tracing::debug!("{:?} vanished before it was opened", path);
                tree.detach(node);
            }
            Err(err) => {
                tracing::debug!("cannot open {:?}: {}", path, err);
                mark_unreadable(&mut tree.nodes[node]);
                tree.skipped.push(SkippedEntry::new(path, err));
            }
        }
    }
}

fn lock(tree: &Mutex<ScanTree>) -> MutexGuard<'_, ScanTree> {
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

fn mark_unreadable(node: &mut ScanNode) {
    node.state = NodeState::Unreadable;
    node.item.is_leaf = true;
    node.incomplete = true;
}

/// Inserts the entries of `parent`'s listing and returns a job for every
/// directory among them: a listing while `remaining > 0`, otherwise a check
/// for emptiness.
fn attach(
    tree: &Mutex<ScanTree>,
    parent: NodeId,
    listing: Listing,
    remaining: usize,
) -> Vec<ScanJob> {
    let mut tree = lock(tree);
    {
        let parent_node = &mut tree.nodes[parent];
        parent_node.state = NodeState::Expanded;
        parent_node.item.is_leaf = listing.entries.is_empty() && listing.skipped.is_empty();
        parent_node.incomplete |= !listing.skipped.is_empty();
    }
    tree.skipped.extend(listing.skipped);

    let mut jobs = Vec::new();
    for entry in listing.entries {
        if !entry.is_dir() {
            tree.push(ScanNode::new(entry, Some(parent), NodeState::File));
            continue;
        }
        let path = entry.path.clone();
        let node = tree.push(ScanNode::new(entry, Some(parent), NodeState::Pending));
        jobs.push(match remaining {
            0 => ScanJob::Peek { node, path },
            _ => ScanJob::Expand {
                node,
                path,
                remaining: remaining - 1,
            },
        });
    }
    jobs
}
