//! Parent resolution pass

use super::RunContext;
use crate::rows::Row;
use crate::utils::retry_once;
use std::collections::{BTreeMap, BTreeSet};
use taxo_common::db::{NewTerm, ROOT_PARENT};
use taxo_common::events::ImportWarning;
use tracing::{debug, info};

/// Counters from the parent pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ParentSummary {
    pub distinct: usize,
    pub created: usize,
    pub failed: usize,
}

/// Ensure every parent named in `rows` exists as a root-level term
///
/// Failures are recorded as warnings; rows under a missing parent are skipped
/// later by the reconciliation pass.
pub(crate) async fn resolve_parents(ctx: &mut RunContext<'_>, rows: &[Row]) -> ParentSummary {
    let names: BTreeSet<String> = rows.iter().filter_map(Row::parent).collect();
    let mut summary = ParentSummary {
        distinct: names.len(),
        ..Default::default()
    };

    for name in names {
        let existing = match ctx
            .cache
            .find_term(ctx.repo, ctx.vocabulary_id, &name, ROOT_PARENT)
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                summary.failed += 1;
                ctx.warn(ImportWarning::ParentCreateFailed {
                    parent: name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if let Some(term) = existing {
            debug!(parent = %name, term_id = term.id, "Parent term exists");
            continue;
        }

        let new_term = NewTerm {
            vocabulary_id: ctx.vocabulary_id,
            name: name.clone(),
            description: String::new(),
            parent_id: ROOT_PARENT,
            fields: BTreeMap::new(),
        };

        ctx.throttle.before_write().await;
        let repo = ctx.repo;
        let new_term_ref = &new_term;
        match retry_once("create parent term", ctx.retry_delay, || repo.create_term(new_term_ref)).await {
            Ok(term) => {
                info!(parent = %name, term_id = term.id, "Created parent term");
                ctx.cache.remember(&term, ROOT_PARENT);
                summary.created += 1;
            }
            Err(e) => {
                summary.failed += 1;
                ctx.warn(ImportWarning::ParentCreateFailed {
                    parent: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    summary
}
