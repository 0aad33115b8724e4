//! Term reconciliation pass: one row at a time

use super::{RowOutcome, RunContext};
use crate::rows::Row;
use crate::utils::retry_once;
use std::collections::BTreeMap;
use taxo_common::db::{FieldValue, NewTerm, Term, TermId, ROOT_PARENT};
use taxo_common::events::ImportWarning;
use taxo_common::Result;
use tracing::debug;

/// Match `row` against the store and create or update its term
///
/// `Err` means the row failed; the caller turns it into
/// [`RowOutcome::Failed`] and continues with the next row.
pub(crate) async fn reconcile_row(
    ctx: &mut RunContext<'_>,
    row: &Row,
    force_new_terms: bool,
) -> Result<RowOutcome> {
    let name = row.name();
    if name.is_empty() {
        return Ok(RowOutcome::Failed("row has no name".to_string()));
    }

    let parent_id = match row.parent() {
        None => ROOT_PARENT,
        Some(parent) => {
            match ctx
                .cache
                .find_term(ctx.repo, ctx.vocabulary_id, &parent, ROOT_PARENT)
                .await?
            {
                Some(parent_term) => parent_term.id,
                None => {
                    ctx.warn(ImportWarning::MissingParent {
                        line: row.line,
                        name,
                        parent: parent.clone(),
                    });
                    return Ok(RowOutcome::SkippedMissingParent { parent });
                }
            }
        }
    };

    let fields = declared_fields_of(ctx, row, &name);

    let existing = if force_new_terms {
        None
    } else {
        ctx.cache
            .find_term(ctx.repo, ctx.vocabulary_id, &name, parent_id)
            .await?
    };

    match existing {
        Some(term) => update_term(ctx, term, row, parent_id, fields).await,
        None => create_term(ctx, row, name, parent_id, fields).await,
    }
}

/// Row fields the vocabulary declares, converted to their declared kind
fn declared_fields_of(
    ctx: &mut RunContext<'_>,
    row: &Row,
    name: &str,
) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();

    for (field, value) in row.custom_fields() {
        let Some(kind) = ctx.schema.get(field).copied() else {
            ctx.warn(ImportWarning::UndeclaredField {
                line: row.line,
                name: name.to_string(),
                field: field.clone(),
            });
            continue;
        };

        match value.clone().coerce(kind) {
            Some(coerced) => {
                fields.insert(field.clone(), coerced);
            }
            None => ctx.warn(ImportWarning::InvalidFieldValue {
                line: row.line,
                name: name.to_string(),
                field: field.clone(),
                value: value.to_string(),
                expected: kind,
            }),
        }
    }

    fields
}

/// Whether stored parents already express `parent_id`
fn parents_match(current: &[TermId], parent_id: TermId) -> bool {
    if parent_id == ROOT_PARENT {
        current.iter().all(|p| *p == ROOT_PARENT)
    } else {
        !current.is_empty() && current.iter().all(|p| *p == parent_id)
    }
}

async fn update_term(
    ctx: &mut RunContext<'_>,
    mut term: Term,
    row: &Row,
    parent_id: TermId,
    fields: BTreeMap<String, FieldValue>,
) -> Result<RowOutcome> {
    let mut changed = Vec::new();

    let current_parents = ctx.repo.resolve_parent_ids(&term).await?;
    if !parents_match(&current_parents, parent_id) {
        // Replace, never append
        term.parents = if parent_id == ROOT_PARENT {
            Vec::new()
        } else {
            vec![parent_id]
        };
        changed.push("parent".to_string());
    } else {
        term.parents = current_parents;
    }

    if let Some(description) = row.description() {
        if description != term.description {
            term.description = description;
            changed.push("description".to_string());
        }
    }

    for (field, value) in fields {
        let differs = match term.fields.get(&field) {
            Some(stored) => !stored.same_as(&value),
            None => true,
        };
        if differs {
            changed.push(field.clone());
            term.fields.insert(field, value);
        }
    }

    if changed.is_empty() {
        debug!(line = row.line, term_id = term.id, "Term already up to date");
        return Ok(RowOutcome::Unchanged(term.id));
    }

    ctx.throttle.before_write().await;
    let repo = ctx.repo;
    let term_ref = &term;
    retry_once("update term", ctx.retry_delay, || repo.update_term(term_ref)).await?;

    debug!(
        line = row.line,
        term_id = term.id,
        changed = ?changed,
        "Updated term"
    );
    ctx.cache.remember(&term, parent_id);

    Ok(RowOutcome::Updated(term.id))
}

async fn create_term(
    ctx: &mut RunContext<'_>,
    row: &Row,
    name: String,
    parent_id: TermId,
    fields: BTreeMap<String, FieldValue>,
) -> Result<RowOutcome> {
    let new_term = NewTerm {
        vocabulary_id: ctx.vocabulary_id,
        name,
        description: row.description().unwrap_or_default(),
        parent_id,
        fields,
    };

    ctx.throttle.before_write().await;
    let repo = ctx.repo;
    let new_term_ref = &new_term;
    let term = retry_once("create term", ctx.retry_delay, || repo.create_term(new_term_ref)).await?;

    debug!(line = row.line, term_id = term.id, parent_id, "Created term");
    ctx.cache.remember(&term, parent_id);

    Ok(RowOutcome::Created(term.id))
}
