use serde::{Deserialize, Serialize};

/// Crawl checkpoint, persisted after every completed chapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    #[serde(default)]
    pub completed_edition_ids: Vec<i64>,
    #[serde(default)]
    pub current_edition_id: Option<i64>,
    #[serde(default)]
    pub completed_chapters_for_current: Vec<u16>,
}

impl CrawlProgress {
    pub fn is_edition_completed(&self, edition_id: i64) -> bool {
        self.completed_edition_ids.contains(&edition_id)
    }

    /// Chapters already checkpointed for `edition_id`
    ///
    /// Empty unless `edition_id` is the edition in progress.
    pub fn completed_chapters_for(&self, edition_id: i64) -> &[u16] {
        if self.current_edition_id == Some(edition_id) {
            &self.completed_chapters_for_current
        } else {
            &[]
        }
    }

    /// Makes `edition_id` the current edition
    ///
    /// Resuming the same edition keeps its chapter list; switching to a
    /// different edition resets it.
    pub fn begin_edition(&mut self, edition_id: i64) {
        if self.current_edition_id != Some(edition_id) {
            self.current_edition_id = Some(edition_id);
            self.completed_chapters_for_current.clear();
        }
    }

    pub fn complete_chapter(&mut self, chapter: u16) {
        if !self.completed_chapters_for_current.contains(&chapter) {
            self.completed_chapters_for_current.push(chapter);
        }
    }

    pub fn complete_edition(&mut self, edition_id: i64) {
        if !self.completed_edition_ids.contains(&edition_id) {
            self.completed_edition_ids.push(edition_id);
        }
        if self.current_edition_id == Some(edition_id) {
            self.current_edition_id = None;
        }
        self.completed_chapters_for_current.clear();
    }
}

/// Import ledger, persisted after every document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    #[serde(default)]
    pub processed_document_paths: Vec<String>,
    #[serde(default)]
    pub failed_document_paths: Vec<String>,
}

impl ImportProgress {
    pub fn is_processed(&self, path: &str) -> bool {
        self.processed_document_paths.iter().any(|p| p == path)
    }

    pub fn mark_processed(&mut self, path: &str) {
        if !self.is_processed(path) {
            self.processed_document_paths.push(path.to_string());
        }
    }

    pub fn mark_failed(&mut self, path: &str) {
        if !self.failed_document_paths.iter().any(|p| p == path) {
            self.failed_document_paths.push(path.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_same_edition_keeps_chapters() {
        let mut progress = CrawlProgress::default();
        progress.begin_edition(7);
        progress.complete_chapter(1);
        progress.complete_chapter(2);

        progress.begin_edition(7);
        assert_eq!(progress.completed_chapters_for(7), &[1, 2]);
        assert!(progress.completed_chapters_for(8).is_empty());
    }

    #[test]
    fn test_begin_other_edition_resets_chapters() {
        let mut progress = CrawlProgress::default();
        progress.begin_edition(7);
        progress.complete_chapter(1);

        progress.begin_edition(8);
        assert_eq!(progress.current_edition_id, Some(8));
        assert!(progress.completed_chapters_for_current.is_empty());
    }

    #[test]
    fn test_complete_edition() {
        let mut progress = CrawlProgress::default();
        progress.begin_edition(7);
        progress.complete_chapter(114);
        progress.complete_edition(7);
        progress.complete_edition(7);

        assert_eq!(progress.completed_edition_ids, vec![7]);
        assert_eq!(progress.current_edition_id, None);
        assert!(progress.completed_chapters_for_current.is_empty());
        assert!(progress.is_edition_completed(7));
    }

    #[test]
    fn test_crawl_progress_wire_format() {
        let mut progress = CrawlProgress::default();
        progress.begin_edition(5001);
        progress.complete_chapter(1);

        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "completedEditionIds": [],
                "currentEditionId": 5001,
                "completedChaptersForCurrent": [1]
            })
        );

        let parsed: CrawlProgress =
            serde_json::from_str(r#"{"completedEditionIds":[3],"currentEditionId":null}"#).unwrap();
        assert_eq!(parsed.completed_edition_ids, vec![3]);
        assert!(parsed.completed_chapters_for_current.is_empty());
    }

    #[test]
    fn test_import_progress() {
        let mut progress = ImportProgress::default();
        progress.mark_processed("a.json");
        progress.mark_processed("a.json");
        progress.mark_failed("b.json");

        assert!(progress.is_processed("a.json"));
        assert!(!progress.is_processed("b.json"));
        assert_eq!(progress.processed_document_paths.len(), 1);

        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["processedDocumentPaths"][0], "a.json");
        assert_eq!(json["failedDocumentPaths"][0], "b.json");
    }
}
