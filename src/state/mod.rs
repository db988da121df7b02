//! State module for resumable progress
//!
//! This module holds the checkpoint snapshots the crawl and import stages
//! persist between runs, and the stores they are persisted through.
//!
//! # Components
//!
//! - `CrawlProgress`: completed editions and the chapters finished for the edition in progress
//! - `ImportProgress`: document paths already processed or failed
//! - `ProgressStore`: load/save/clear interface, file-backed or in-memory
//! - `ShardStore`: verses of completed chapters for the edition in progress

mod progress;
mod shards;
mod store;

// Re-export main types
pub use progress::{CrawlProgress, ImportProgress};
pub use shards::{FileShardStore, MemoryShardStore, ShardStore, VerseMap};
pub use store::{JsonFileStore, MemoryStore, ProgressError, ProgressStore};

pub(crate) use store::write_atomically;
