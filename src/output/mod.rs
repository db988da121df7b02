//! Output module for run summaries and store statistics
//!
//! This module handles:
//! - Querying statistics from the store
//! - Printing crawl reports and import summaries

pub mod stats;

pub use stats::{
    load_statistics, print_crawl_report, print_import_summary, print_statistics,
    DatabaseStatistics,
};
