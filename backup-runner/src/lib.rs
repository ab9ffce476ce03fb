//! Backup Runner Library
//!
//! Runs named backup jobs: tar a local tree (or rsync a remote one first),
//! place the archive atomically into its destination, prune old archives.

pub mod artifact;
pub mod catalog;
pub mod command;
pub mod config;
pub mod executor;
pub mod job;
pub mod pipeline;
pub mod placement;
pub mod retention;
pub mod utils;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::Config;
pub use job::{Compression, JobDescriptor, JobKind};
pub use pipeline::{Pipeline, RunSummary};
pub use utils::errors::JobError;
pub type Result<T> = std::result::Result<T, JobError>;
