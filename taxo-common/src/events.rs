//! Import event types and broadcast bus
//!
//! The importer publishes an [`ImportEvent`] for every phase change,
//! progress tick, warning and row failure. Consumers (CLI progress output,
//! tests, an eventual UI) subscribe to the [`EventBus`]. Publishing never
//! blocks and never fails the import: with no subscribers the event is
//! simply dropped.

use crate::db::FieldKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Non-fatal condition observed during an import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    /// Row carried a field the vocabulary does not declare; field dropped
    UndeclaredField {
        line: usize,
        name: String,
        field: String,
    },
    /// Declared field whose value could not be converted; field dropped
    InvalidFieldValue {
        line: usize,
        name: String,
        field: String,
        value: String,
        expected: FieldKind,
    },
    /// Row references a parent that does not exist; row skipped
    MissingParent {
        line: usize,
        name: String,
        parent: String,
    },
    /// Parent term could not be created during the parent pass
    ParentCreateFailed { parent: String, reason: String },
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportWarning::UndeclaredField { line, name, field } => write!(
                f,
                "line {}: '{}' has field '{}' which the vocabulary does not declare",
                line, name, field
            ),
            ImportWarning::InvalidFieldValue {
                line,
                name,
                field,
                value,
                expected,
            } => write!(
                f,
                "line {}: '{}' field '{}' value '{}' is not a valid {}",
                line, name, field, value, expected
            ),
            ImportWarning::MissingParent { line, name, parent } => write!(
                f,
                "line {}: '{}' skipped, parent '{}' does not exist",
                line, name, parent
            ),
            ImportWarning::ParentCreateFailed { parent, reason } => {
                write!(f, "parent '{}' could not be created: {}", parent, reason)
            }
        }
    }
}

/// A row that failed to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line: usize,
    pub name: String,
    pub parent: Option<String>,
    pub reason: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.parent {
            Some(parent) => write!(
                f,
                "line {}: '{}' (parent '{}') failed: {}",
                self.line, self.name, parent, self.reason
            ),
            None => write!(f, "line {}: '{}' failed: {}", self.line, self.name, self.reason),
        }
    }
}

/// Events published while an import runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImportEvent {
    RunStarted {
        run_id: Uuid,
        vocabulary_id: i64,
        total_rows: usize,
        force_new: bool,
        timestamp: DateTime<Utc>,
    },
    ParentsResolved {
        run_id: Uuid,
        distinct: usize,
        created: usize,
        failed: usize,
    },
    Progress {
        run_id: Uuid,
        processed: usize,
        total: usize,
        created: usize,
        updated: usize,
    },
    Warning {
        run_id: Uuid,
        warning: ImportWarning,
    },
    RowFailed {
        run_id: Uuid,
        error: RowError,
    },
    RunCompleted {
        run_id: Uuid,
        processed: usize,
        created: usize,
        updated: usize,
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`ImportEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; returns the number of subscribers reached
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ImportEvent,
    ) -> Result<usize, broadcast::error::SendError<ImportEvent>> {
        self.tx.send(event)
    }

    /// Emit, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
