//! Run-scoped term lookup cache
//!
//! Memoizes `(vocabulary, name, parent)` lookups for one import run. A miss
//! is cached too, as [`CacheEntry::Absent`], so a name that does not exist is
//! queried once per run. The engine clears the cache at run start and again
//! after the parent pass, and records every term it creates or updates so a
//! key repeated later in the same file resolves to the stored term.

use crate::repository::TermRepository;
use std::collections::HashMap;
use taxo_common::db::{Term, TermId, VocabularyId, ROOT_PARENT};
use taxo_common::Result;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    vocabulary_id: VocabularyId,
    name: String,
    parent_id: TermId,
}

/// Cached lookup result
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Found(Term),
    Absent,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Default)]
pub struct LookupCache {
    entries: HashMap<CacheKey, CacheEntry>,
    stats: CacheStats,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached entry (counters are kept)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Find the term named `name` whose parent is `parent_id`
    ///
    /// Terms sharing a name are disambiguated by parent: the first candidate
    /// whose stored parents match wins. [`ROOT_PARENT`] matches only terms
    /// without a parent. No match is `Ok(None)`, never an error.
    pub async fn find_term<R>(
        &mut self,
        repo: &R,
        vocabulary_id: VocabularyId,
        name: &str,
        parent_id: TermId,
    ) -> Result<Option<Term>>
    where
        R: TermRepository + ?Sized,
    {
        let key = CacheKey {
            vocabulary_id,
            name: name.to_string(),
            parent_id,
        };

        if let Some(entry) = self.entries.get(&key) {
            self.stats.hits += 1;
            return Ok(match entry {
                CacheEntry::Found(term) => Some(term.clone()),
                CacheEntry::Absent => None,
            });
        }
        self.stats.misses += 1;

        // An exact parent list wins over a multi-parent term that merely
        // includes the requested parent
        let mut found = None;
        let mut partial = None;
        for candidate in repo.find_terms(vocabulary_id, name).await? {
            let parents = repo.resolve_parent_ids(&candidate).await?;
            if parent_is_exact(&parents, parent_id) {
                found = Some(Term {
                    parents,
                    ..candidate
                });
                break;
            }
            if partial.is_none() && parent_matches(&parents, parent_id) {
                partial = Some(Term {
                    parents,
                    ..candidate
                });
            }
        }
        let found = found.or(partial);

        trace!(term = name, parent_id, found = found.is_some(), "Term lookup");

        let entry = match &found {
            Some(term) => CacheEntry::Found(term.clone()),
            None => CacheEntry::Absent,
        };
        self.entries.insert(key, entry);

        Ok(found)
    }

    /// Record a term just created or updated under `parent_id`
    pub fn remember(&mut self, term: &Term, parent_id: TermId) {
        let key = CacheKey {
            vocabulary_id: term.vocabulary_id,
            name: term.name.clone(),
            parent_id,
        };
        self.entries.insert(key, CacheEntry::Found(term.clone()));
    }
}

/// Whether a stored parent list is exactly the requested parent
pub fn parent_is_exact(parents: &[TermId], parent_id: TermId) -> bool {
    if parent_id == ROOT_PARENT {
        parents.iter().all(|p| *p == ROOT_PARENT)
    } else {
        matches!(parents, [only] if *only == parent_id)
    }
}

/// Whether a stored parent list satisfies a requested parent id
pub fn parent_matches(parents: &[TermId], parent_id: TermId) -> bool {
    if parent_id == ROOT_PARENT {
        parents.iter().all(|p| *p == ROOT_PARENT)
    } else {
        parents.contains(&parent_id)
    }
}
