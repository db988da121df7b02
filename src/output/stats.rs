//! Statistics generation from the tafsir database
//!
//! This module provides functionality for extracting and displaying
//! store statistics and end-of-run summaries.

use crate::crawler::CrawlReport;
use crate::importer::ImportSummary;
use crate::storage::Storage;
use crate::verse::TOTAL_VERSES;
use crate::HarvestError;

/// Store statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseStatistics {
    /// Total number of stored verse rows, across editions
    pub total_verses: u64,

    /// Number of editions with a metadata row
    pub editions: u64,

    /// Verse rows per language, largest first
    pub languages: Vec<(String, u64)>,

    /// Documents recorded in the import log
    pub import_log_entries: usize,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(DatabaseStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<DatabaseStatistics, HarvestError> {
    Ok(DatabaseStatistics {
        total_verses: storage.count_verses()?,
        editions: storage.count_editions()?,
        languages: storage.language_breakdown()?,
        import_log_entries: storage.import_log()?.len(),
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &DatabaseStatistics) {
    println!("=== Database Statistics ===\n");

    println!("Overview:");
    println!("  Total verse rows: {}", stats.total_verses);
    println!("  Editions: {}", stats.editions);
    if stats.editions > 0 {
        let coverage = stats.total_verses as f64 / (stats.editions as f64 * TOTAL_VERSES as f64) * 100.0;
        println!("  Average coverage: {:.1}% of {} verses", coverage, TOTAL_VERSES);
    }
    println!("  Import log entries: {}", stats.import_log_entries);
    println!();

    if !stats.languages.is_empty() {
        println!("Verses by Language:");
        for (language, count) in &stats.languages {
            let percentage = if stats.total_verses > 0 {
                (*count as f64 / stats.total_verses as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", language, count, percentage);
        }
    }
}

/// Prints the totals of an import run
pub fn print_import_summary(summary: &ImportSummary) {
    println!("=== Import Summary ===\n");
    println!(
        "  Files: {} total, {} processed, {} already done",
        summary.files_total, summary.files_processed, summary.files_skipped
    );
    println!("  Verses: {} total", summary.verses_total);
    println!("  Imported: {}", summary.verses_imported);
    println!("  Skipped: {}", summary.verses_skipped);
    println!("  Errors: {}", summary.errors);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Rate: {:.1} verses/sec", summary.rate());
    if summary.interrupted {
        println!("  Run was interrupted; re-run to resume");
    }
}

/// Prints the totals of a crawl run
pub fn print_crawl_report(report: &CrawlReport) {
    println!("=== Crawl Summary ===\n");
    println!("  Editions found: {}", report.editions_found);
    println!("  Completed: {}", report.editions_completed);
    if report.editions_partial > 0 {
        println!("  Partial (chapter range): {}", report.editions_partial);
    }
    println!("  Skipped (already done): {}", report.editions_skipped);
    println!("  Verses collected: {}", report.verses_collected);
    println!(
        "  Requests: {} ({} retries, {} not found, {} unavailable)",
        report.fetch.requests, report.fetch.retries, report.fetch.not_found, report.fetch.unavailable
    );
    println!("  Duration: {:.2}s", report.elapsed.as_secs_f64());

    for path in &report.documents {
        println!("  Wrote {}", path.display());
    }
    if report.interrupted {
        println!("  Crawl was interrupted; re-run to resume from the last chapter");
    }
}
