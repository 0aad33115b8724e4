//! Per-row outcomes and the run summary

use crate::rows::Row;
use serde::{Deserialize, Serialize};
use taxo_common::db::{TermId, VocabularyId};
use taxo_common::events::{ImportWarning, RowError};
use uuid::Uuid;

/// What happened to one input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// A new term was persisted
    Created(TermId),
    /// An existing term was changed and saved
    Updated(TermId),
    /// An existing term already matched the row; nothing was written
    Unchanged(TermId),
    /// The row's parent does not exist; nothing was written
    SkippedMissingParent { parent: String },
    /// The row could not be persisted
    Failed(String),
}

/// Summary of one import run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub run_id: Uuid,
    pub vocabulary_id: VocabularyId,
    pub force_new: bool,
    /// Rows handled, whatever their outcome
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Root-level terms the parent pass had to create
    pub parents_created: usize,
    /// Run stopped early on cancellation
    pub cancelled: bool,
    pub warnings: Vec<ImportWarning>,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn new(run_id: Uuid, vocabulary_id: VocabularyId, force_new: bool) -> Self {
        Self {
            run_id,
            vocabulary_id,
            force_new,
            ..Default::default()
        }
    }

    /// Count one processed row
    pub fn record(&mut self, row: &Row, outcome: &RowOutcome) {
        self.processed += 1;
        match outcome {
            RowOutcome::Created(_) => self.created += 1,
            RowOutcome::Updated(_) => self.updated += 1,
            RowOutcome::Unchanged(_) => self.unchanged += 1,
            RowOutcome::SkippedMissingParent { .. } => self.skipped += 1,
            RowOutcome::Failed(reason) => {
                self.failed += 1;
                self.errors.push(RowError {
                    line: row.line,
                    name: row.name(),
                    parent: row.parent(),
                    reason: reason.clone(),
                });
            }
        }
    }

    /// True when every processed row ended without failure
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_every_outcome() {
        let mut report = ImportReport::new(Uuid::new_v4(), 1, false);
        let row = Row::new(4).with("name", "X").with("parent", "Nowhere");

        report.record(&row, &RowOutcome::Created(1));
        report.record(&row, &RowOutcome::Updated(2));
        report.record(&row, &RowOutcome::Unchanged(3));
        report.record(
            &row,
            &RowOutcome::SkippedMissingParent {
                parent: "Nowhere".into(),
            },
        );
        report.record(&row, &RowOutcome::Failed("disk full".into()));

        assert_eq!(report.processed, 5);
        assert_eq!(
            (report.created, report.updated, report.unchanged, report.skipped, report.failed),
            (1, 1, 1, 1, 1)
        );
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 4);
        assert_eq!(report.errors[0].parent.as_deref(), Some("Nowhere"));
        assert!(!report.is_clean());
    }
}
