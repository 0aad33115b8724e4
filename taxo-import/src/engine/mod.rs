//! Term reconciliation engine
//!
//! An import run has two phases separated by a barrier:
//!
//! 1. **Parent resolution** ([`parents`]): every distinct parent name in the
//!    batch is ensured to exist as a root-level term.
//! 2. **Reconciliation** ([`reconcile`]): rows are processed in input order;
//!    each is matched against an existing term by `(name, parent)` and either
//!    updated in place or created.
//!
//! Rows are isolated from each other: a row that fails is recorded in the
//! [`ImportReport`] and the run moves on. Only setup failures (empty input,
//! unreadable schema) abort a run.

mod parents;
mod reconcile;
mod report;

pub use report::{ImportReport, RowOutcome};

use crate::cache::LookupCache;
use crate::error::{ImportError, ImportResult};
use crate::repository::TermRepository;
use crate::rows::Row;
use crate::throttle::{NoPause, Throttle, ThrottlePoint};
use chrono::Utc;
use std::time::Duration;
use taxo_common::config::ImportConfig;
use taxo_common::db::{FieldSchema, VocabularyId};
use taxo_common::events::{EventBus, ImportEvent, ImportWarning};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Engine tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Rows between progress reports and throttle checkpoints
    pub progress_interval: usize,
    /// Delay before the single persistence retry
    pub retry_delay: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_config(&ImportConfig::default())
    }
}

impl ImportOptions {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            progress_interval: config.progress_interval.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// State owned by one run
pub(crate) struct RunContext<'a> {
    pub repo: &'a dyn TermRepository,
    pub throttle: &'a dyn Throttle,
    pub events: &'a EventBus,
    pub run_id: Uuid,
    pub vocabulary_id: VocabularyId,
    pub schema: FieldSchema,
    pub cache: LookupCache,
    pub retry_delay: Duration,
    pub warnings: Vec<ImportWarning>,
}

impl RunContext<'_> {
    /// Log, keep and publish a non-fatal condition
    pub fn warn(&mut self, warning: ImportWarning) {
        warn!(run_id = %self.run_id, "{}", warning);
        self.events.emit_lossy(ImportEvent::Warning {
            run_id: self.run_id,
            warning: warning.clone(),
        });
        self.warnings.push(warning);
    }
}

/// Runs imports against a term repository
pub struct Importer<'a> {
    repo: &'a dyn TermRepository,
    throttle: Box<dyn Throttle>,
    events: EventBus,
    cancel: CancellationToken,
    options: ImportOptions,
}

impl<'a> Importer<'a> {
    /// Importer with no throttling, a private event bus and no cancellation
    pub fn new(repo: &'a dyn TermRepository, mut options: ImportOptions) -> Self {
        options.progress_interval = options.progress_interval.max(1);
        Self {
            repo,
            throttle: Box::new(NoPause),
            events: EventBus::new(100),
            cancel: CancellationToken::new(),
            options,
        }
    }

    pub fn with_throttle(mut self, throttle: Box<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Import `rows` into a vocabulary
    ///
    /// With `force_new_terms` every row creates a new term, even when a term
    /// with the same name and parent exists.
    pub async fn import_rows(
        &self,
        vocabulary_id: VocabularyId,
        rows: &[Row],
        force_new_terms: bool,
    ) -> ImportResult<ImportReport> {
        if rows.is_empty() {
            return Err(ImportError::EmptyInput);
        }

        let run_id = Uuid::new_v4();
        let mut report = ImportReport::new(run_id, vocabulary_id, force_new_terms);

        info!(
            %run_id,
            vocabulary_id,
            rows = rows.len(),
            force_new_terms,
            "Starting import run"
        );
        self.events.emit_lossy(ImportEvent::RunStarted {
            run_id,
            vocabulary_id,
            total_rows: rows.len(),
            force_new: force_new_terms,
            timestamp: Utc::now(),
        });

        let schema = self.repo.declared_fields(vocabulary_id).await?;

        let mut ctx = RunContext {
            repo: self.repo,
            throttle: self.throttle.as_ref(),
            events: &self.events,
            run_id,
            vocabulary_id,
            schema,
            cache: LookupCache::new(),
            retry_delay: self.options.retry_delay,
            warnings: Vec::new(),
        };

        // Phase 1: parents, then the barrier
        ctx.cache.clear();
        let parents = parents::resolve_parents(&mut ctx, rows).await;
        ctx.cache.clear();
        report.parents_created = parents.created;

        info!(
            %run_id,
            distinct = parents.distinct,
            created = parents.created,
            failed = parents.failed,
            "Parent terms resolved"
        );
        self.events.emit_lossy(ImportEvent::ParentsResolved {
            run_id,
            distinct: parents.distinct,
            created: parents.created,
            failed: parents.failed,
        });
        ctx.throttle.pause(ThrottlePoint::AfterParents).await;

        // Phase 2: rows in input order
        for row in rows {
            if self.cancel.is_cancelled() {
                warn!(%run_id, processed = report.processed, "Import cancelled");
                report.cancelled = true;
                break;
            }

            let outcome = match reconcile::reconcile_row(&mut ctx, row, force_new_terms).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        %run_id,
                        line = row.line,
                        term = %row.name(),
                        parent = ?row.parent(),
                        error = %e,
                        "Row failed"
                    );
                    RowOutcome::Failed(e.to_string())
                }
            };

            report.record(row, &outcome);
            if let RowOutcome::Failed(_) = outcome {
                if let Some(row_error) = report.errors.last() {
                    self.events.emit_lossy(ImportEvent::RowFailed {
                        run_id,
                        error: row_error.clone(),
                    });
                }
            }

            if report.processed % self.options.progress_interval == 0 {
                info!(
                    %run_id,
                    processed = report.processed,
                    total = rows.len(),
                    created = report.created,
                    updated = report.updated,
                    "Import progress"
                );
                self.events.emit_lossy(ImportEvent::Progress {
                    run_id,
                    processed: report.processed,
                    total: rows.len(),
                    created: report.created,
                    updated: report.updated,
                });
                ctx.throttle
                    .pause(ThrottlePoint::Batch {
                        processed: report.processed,
                    })
                    .await;
            }
        }

        report.warnings = std::mem::take(&mut ctx.warnings);

        let stats = ctx.cache.stats();
        info!(
            %run_id,
            processed = report.processed,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            failed = report.failed,
            warnings = report.warnings.len(),
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Import run finished"
        );
        self.events.emit_lossy(ImportEvent::RunCompleted {
            run_id,
            processed: report.processed,
            created: report.created,
            updated: report.updated,
            cancelled: report.cancelled,
            timestamp: Utc::now(),
        });

        Ok(report)
    }
}
