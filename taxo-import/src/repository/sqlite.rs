//! SQLite-backed term repository

use super::TermRepository;
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::BTreeMap;
use taxo_common::db::{
    machine_name, FieldKind, FieldSchema, FieldValue, NewTerm, Term, TermId, Vocabulary,
    VocabularyId, ROOT_PARENT,
};
use taxo_common::{Error, Result};
use tracing::{debug, info};

/// Term repository over the shared SQLite database
#[derive(Clone)]
pub struct SqliteTermRepository {
    pool: SqlitePool,
}

impl SqliteTermRepository {
    /// Create new repository with database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of terms stored in a vocabulary
    pub async fn count_terms(&self, vocabulary_id: VocabularyId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM terms WHERE vocabulary_id = ?")
            .bind(vocabulary_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Load one term by id
    pub async fn load_term(&self, term_id: TermId) -> Result<Option<Term>> {
        let row = sqlx::query_as::<_, (i64, i64, String, String)>(
            "SELECT id, vocabulary_id, name, description FROM terms WHERE id = ?",
        )
        .bind(term_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Attach parents and custom fields to a bare term row
    async fn hydrate(&self, row: (i64, i64, String, String)) -> Result<Term> {
        let (id, vocabulary_id, name, description) = row;
        let parents = self.parent_ids(id).await?;

        let field_rows = sqlx::query_as::<_, (String, String)>(
            "SELECT field_name, value FROM term_fields WHERE term_id = ? ORDER BY field_name",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut fields = BTreeMap::new();
        for (field_name, raw) in field_rows {
            let value: FieldValue = serde_json::from_str(&raw).map_err(|e| {
                Error::Internal(format!(
                    "Failed to deserialize field '{}' of term {}: {}",
                    field_name, id, e
                ))
            })?;
            fields.insert(field_name, value);
        }

        Ok(Term {
            id,
            vocabulary_id,
            name,
            description,
            parents,
            fields,
        })
    }

    async fn parent_ids(&self, term_id: TermId) -> Result<Vec<TermId>> {
        let parents: Vec<i64> = sqlx::query_scalar(
            "SELECT parent_id FROM term_parents WHERE term_id = ? ORDER BY position, parent_id",
        )
        .bind(term_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parents)
    }
}

/// Replace parent links of a term inside a transaction
async fn write_parents(
    tx: &mut Transaction<'_, Sqlite>,
    term_id: TermId,
    parents: &[TermId],
) -> Result<()> {
    sqlx::query("DELETE FROM term_parents WHERE term_id = ?")
        .bind(term_id)
        .execute(&mut **tx)
        .await?;

    for (position, parent_id) in parents.iter().filter(|p| **p != ROOT_PARENT).enumerate() {
        sqlx::query("INSERT INTO term_parents (term_id, parent_id, position) VALUES (?, ?, ?)")
            .bind(term_id)
            .bind(parent_id)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Replace custom field values of a term inside a transaction
async fn write_fields(
    tx: &mut Transaction<'_, Sqlite>,
    term_id: TermId,
    fields: &BTreeMap<String, FieldValue>,
) -> Result<()> {
    sqlx::query("DELETE FROM term_fields WHERE term_id = ?")
        .bind(term_id)
        .execute(&mut **tx)
        .await?;

    for (field_name, value) in fields {
        let json = serde_json::to_string(value).map_err(|e| {
            Error::Internal(format!("Failed to serialize field '{}': {}", field_name, e))
        })?;
        sqlx::query("INSERT INTO term_fields (term_id, field_name, value) VALUES (?, ?, ?)")
            .bind(term_id)
            .bind(field_name)
            .bind(json)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[async_trait]
impl TermRepository for SqliteTermRepository {
    async fn find_terms(&self, vocabulary_id: VocabularyId, name: &str) -> Result<Vec<Term>> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String)>(
            "SELECT id, vocabulary_id, name, description FROM terms
             WHERE vocabulary_id = ? AND name = ?
             ORDER BY id",
        )
        .bind(vocabulary_id)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let mut terms = Vec::with_capacity(rows.len());
        for row in rows {
            terms.push(self.hydrate(row).await?);
        }
        Ok(terms)
    }

    async fn create_term(&self, term: &NewTerm) -> Result<Term> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO terms (vocabulary_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
        )
        .bind(term.vocabulary_id)
        .bind(&term.name)
        .bind(&term.description)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let parents = if term.parent_id == ROOT_PARENT {
            Vec::new()
        } else {
            vec![term.parent_id]
        };
        write_parents(&mut tx, id, &parents).await?;
        write_fields(&mut tx, id, &term.fields).await?;

        tx.commit().await?;

        debug!(term_id = id, name = %term.name, parent_id = term.parent_id, "Created term");

        Ok(Term {
            id,
            vocabulary_id: term.vocabulary_id,
            name: term.name.clone(),
            description: term.description.clone(),
            parents,
            fields: term.fields.clone(),
        })
    }

    async fn update_term(&self, term: &Term) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let affected = sqlx::query(
            "UPDATE terms SET name = ?, description = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(&term.name)
        .bind(&term.description)
        .bind(term.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(Error::NotFound(format!("term {}", term.id)));
        }

        write_parents(&mut tx, term.id, &term.parents).await?;
        write_fields(&mut tx, term.id, &term.fields).await?;

        tx.commit().await?;

        debug!(term_id = term.id, name = %term.name, "Updated term");
        Ok(())
    }

    async fn declared_fields(&self, vocabulary_id: VocabularyId) -> Result<FieldSchema> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT field_name, field_kind FROM vocabulary_fields WHERE vocabulary_id = ?",
        )
        .bind(vocabulary_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(name, kind)| kind.parse::<FieldKind>().map(|kind| (name, kind)))
            .collect()
    }

    async fn resolve_parent_ids(&self, term: &Term) -> Result<Vec<TermId>> {
        self.parent_ids(term.id).await
    }

    async fn get_or_create_vocabulary(&self, display_name: &str) -> Result<Vocabulary> {
        let key = machine_name(display_name.trim());
        if key.trim_matches('_').is_empty() {
            return Err(Error::InvalidInput(format!(
                "Vocabulary name '{}' has no usable characters",
                display_name
            )));
        }

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO vocabularies (machine_name, name) VALUES (?, ?)",
        )
        .bind(&key)
        .bind(display_name.trim())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            info!(machine_name = %key, "Created vocabulary '{}'", display_name.trim());
        }

        let (id, machine_name, name, description) = sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT id, machine_name, name, description FROM vocabularies WHERE machine_name = ?",
        )
        .bind(&key)
        .fetch_one(&self.pool)
        .await?;

        Ok(Vocabulary {
            id,
            machine_name,
            name,
            description,
        })
    }

    async fn declare_field(
        &self,
        vocabulary_id: VocabularyId,
        field_name: &str,
        kind: FieldKind,
    ) -> Result<()> {
        let field_name = field_name.trim().to_lowercase();
        if field_name.is_empty() || crate::rows::RESERVED_KEYS.contains(&field_name.as_str()) {
            return Err(Error::InvalidInput(format!(
                "'{}' cannot be declared as a custom field",
                field_name
            )));
        }

        sqlx::query(
            "INSERT INTO vocabulary_fields (vocabulary_id, field_name, field_kind)
             VALUES (?, ?, ?)
             ON CONFLICT(vocabulary_id, field_name) DO UPDATE SET field_kind = excluded.field_kind",
        )
        .bind(vocabulary_id)
        .bind(&field_name)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        info!(vocabulary_id, field = %field_name, kind = %kind, "Declared custom field");
        Ok(())
    }
}
