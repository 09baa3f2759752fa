pub mod reporter;

pub use reporter::DiskUsageReporter;
