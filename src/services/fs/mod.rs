pub mod aggregator;
pub mod memory;
pub mod pool;
pub mod scanner;
pub mod source;

pub use aggregator::{AggregateReport, SizeAggregator};
pub use memory::MemoryStatSource;
pub use pool::WorkerPool;
pub use scanner::{NodeId, NodeState, ScanNode, ScanTree, TreeScanner};
pub use source::{EntryKind, EntryStat, Listing, LocalStatSource, PathStatSource, VolumeStats};
