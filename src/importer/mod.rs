//! Import stage: validated, deduplicated, batched loading of edition documents
//!
//! - `Loader` writes one document into a `Storage`
//! - `ImportRun` drives a list of documents against the progress ledger

mod loader;
mod runner;

pub use loader::{content_hash, DocumentSource, ImportOutcome, Loader};
pub use runner::{find_documents, ImportRun, ImportSummary};
