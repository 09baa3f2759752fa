pub mod disk_space;
pub mod file_item;

pub use disk_space::{DiskSpaceInfo, GB_DIVISOR};
pub use file_item::{FileSystemItem, FileSystemNode};
