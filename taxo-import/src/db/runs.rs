//! Import run audit records
//!
//! Every CLI import stores its [`ImportReport`] in `import_runs` so past runs
//! can be listed and their warnings inspected.

use crate::engine::ImportReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use taxo_common::events::{ImportWarning, RowError};
use taxo_common::{Error, Result};
use uuid::Uuid;

/// A persisted import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: Uuid,
    pub vocabulary_id: i64,
    pub source: String,
    pub report: ImportReport,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Save (insert or replace) an import run
pub async fn save_run(
    pool: &SqlitePool,
    source: &str,
    report: &ImportReport,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
) -> Result<()> {
    // Prepare all data before touching the database
    let warnings = serde_json::to_string(&report.warnings)
        .map_err(|e| Error::Internal(format!("Failed to serialize warnings: {}", e)))?;
    let errors = serde_json::to_string(&report.errors)
        .map_err(|e| Error::Internal(format!("Failed to serialize errors: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO import_runs (
            run_id, vocabulary_id, source, force_new,
            processed, created, updated, unchanged, skipped, failed, cancelled,
            warnings, errors, started_at, ended_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            processed = excluded.processed,
            created = excluded.created,
            updated = excluded.updated,
            unchanged = excluded.unchanged,
            skipped = excluded.skipped,
            failed = excluded.failed,
            cancelled = excluded.cancelled,
            warnings = excluded.warnings,
            errors = excluded.errors,
            ended_at = excluded.ended_at
        "#,
    )
    .bind(report.run_id.to_string())
    .bind(report.vocabulary_id)
    .bind(source)
    .bind(report.force_new)
    .bind(report.processed as i64)
    .bind(report.created as i64)
    .bind(report.updated as i64)
    .bind(report.unchanged as i64)
    .bind(report.skipped as i64)
    .bind(report.failed as i64)
    .bind(report.cancelled)
    .bind(&warnings)
    .bind(&errors)
    .bind(started_at.to_rfc3339())
    .bind(ended_at.map(|dt| dt.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent runs first
pub async fn list_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<ImportRun>> {
    let rows = sqlx::query(
        r#"
        SELECT run_id, vocabulary_id, source, force_new,
               processed, created, updated, unchanged, skipped, failed, cancelled,
               warnings, errors, started_at, ended_at
        FROM import_runs
        ORDER BY started_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(run_from_row).collect()
}

/// Load one run by id
pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<ImportRun>> {
    let row = sqlx::query(
        r#"
        SELECT run_id, vocabulary_id, source, force_new,
               processed, created, updated, unchanged, skipped, failed, cancelled,
               warnings, errors, started_at, ended_at
        FROM import_runs
        WHERE run_id = ?
        "#,
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(run_from_row).transpose()
}

fn run_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ImportRun> {
    let run_id: String = row.get("run_id");
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|e| Error::Internal(format!("Invalid run id '{}': {}", run_id, e)))?;

    let warnings: String = row.get("warnings");
    let warnings: Vec<ImportWarning> = serde_json::from_str(&warnings)
        .map_err(|e| Error::Internal(format!("Failed to deserialize warnings: {}", e)))?;

    let errors: String = row.get("errors");
    let errors: Vec<RowError> = serde_json::from_str(&errors)
        .map_err(|e| Error::Internal(format!("Failed to deserialize errors: {}", e)))?;

    let started_at: String = row.get("started_at");
    let started_at = parse_timestamp(&started_at)?;
    let ended_at: Option<String> = row.get("ended_at");
    let ended_at = ended_at.as_deref().map(parse_timestamp).transpose()?;

    let vocabulary_id: i64 = row.get("vocabulary_id");
    let count = |column: &str| -> usize { row.get::<i64, _>(column).max(0) as usize };

    let report = ImportReport {
        run_id,
        vocabulary_id,
        force_new: row.get("force_new"),
        processed: count("processed"),
        created: count("created"),
        updated: count("updated"),
        unchanged: count("unchanged"),
        skipped: count("skipped"),
        failed: count("failed"),
        parents_created: 0,
        cancelled: row.get("cancelled"),
        warnings,
        errors,
    };

    Ok(ImportRun {
        run_id,
        vocabulary_id,
        source: row.get("source"),
        report,
        started_at,
        ended_at,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}
