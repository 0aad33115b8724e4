//! Shared fixtures for taxo-import integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use taxo_common::db::{
    init_memory_database, FieldKind, FieldSchema, NewTerm, Term, TermId, Vocabulary, VocabularyId,
};
use taxo_common::{Error, Result};
use taxo_import::throttle::{Throttle, ThrottlePoint};
use taxo_import::{ImportOptions, Row, SqliteTermRepository, TermRepository};

/// Fresh in-memory store with one vocabulary
pub async fn setup(vocabulary: &str) -> (SqliteTermRepository, Vocabulary) {
    let pool = init_memory_database().await.expect("memory database");
    let repo = SqliteTermRepository::new(pool);
    let vocab = repo
        .get_or_create_vocabulary(vocabulary)
        .await
        .expect("vocabulary");
    (repo, vocab)
}

/// Engine options with a short retry delay
pub fn fast_options(progress_interval: usize) -> ImportOptions {
    ImportOptions {
        progress_interval,
        retry_delay: Duration::from_millis(1),
    }
}

pub fn row(line: usize, name: &str, parent: Option<&str>) -> Row {
    let row = Row::new(line).with("name", name);
    match parent {
        Some(parent) => row.with("parent", parent),
        None => row,
    }
}

/// Find the single term `name` whose parents include `parent_id`
pub async fn term_under(
    repo: &SqliteTermRepository,
    vocab: VocabularyId,
    name: &str,
    parent_id: TermId,
) -> Term {
    let matches: Vec<Term> = repo
        .find_terms(vocab, name)
        .await
        .expect("find_terms")
        .into_iter()
        .filter(|t| {
            if parent_id == 0 {
                t.parents.is_empty()
            } else {
                t.parents.contains(&parent_id)
            }
        })
        .collect();
    assert_eq!(matches.len(), 1, "expected one '{}' under {}", name, parent_id);
    matches.into_iter().next().expect("one match")
}

/// Wraps the SQLite repository and fails writes for chosen term names
pub struct FaultyRepository {
    inner: SqliteTermRepository,
    /// Remaining create failures per name (`usize::MAX` = always)
    create_failures: Mutex<HashMap<String, usize>>,
    update_failures: Mutex<HashMap<String, usize>>,
    create_attempts: Mutex<HashMap<String, usize>>,
    fail_schema: AtomicBool,
    writes: AtomicUsize,
}

impl FaultyRepository {
    pub fn new(inner: SqliteTermRepository) -> Self {
        Self {
            inner,
            create_failures: Mutex::new(HashMap::new()),
            update_failures: Mutex::new(HashMap::new()),
            create_attempts: Mutex::new(HashMap::new()),
            fail_schema: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn fail_create(self, name: &str, times: usize) -> Self {
        self.create_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), times);
        self
    }

    pub fn fail_update(self, name: &str, times: usize) -> Self {
        self.update_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), times);
        self
    }

    pub fn fail_schema(self) -> Self {
        self.fail_schema.store(true, Ordering::SeqCst);
        self
    }

    pub fn create_attempts(&self, name: &str) -> usize {
        self.create_attempts
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &SqliteTermRepository {
        &self.inner
    }

    fn should_fail(failures: &Mutex<HashMap<String, usize>>, name: &str) -> bool {
        let mut failures = failures.lock().unwrap();
        match failures.get_mut(name) {
            Some(0) | None => false,
            Some(remaining) => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                true
            }
        }
    }
}

#[async_trait]
impl TermRepository for FaultyRepository {
    async fn find_terms(&self, vocabulary_id: VocabularyId, name: &str) -> Result<Vec<Term>> {
        self.inner.find_terms(vocabulary_id, name).await
    }

    async fn create_term(&self, term: &NewTerm) -> Result<Term> {
        *self
            .create_attempts
            .lock()
            .unwrap()
            .entry(term.name.clone())
            .or_insert(0) += 1;
        if Self::should_fail(&self.create_failures, &term.name) {
            return Err(Error::Internal(format!("injected create failure for {}", term.name)));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create_term(term).await
    }

    async fn update_term(&self, term: &Term) -> Result<()> {
        if Self::should_fail(&self.update_failures, &term.name) {
            return Err(Error::Internal(format!("injected update failure for {}", term.name)));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_term(term).await
    }

    async fn declared_fields(&self, vocabulary_id: VocabularyId) -> Result<FieldSchema> {
        if self.fail_schema.load(Ordering::SeqCst) {
            return Err(Error::Internal("schema unavailable".to_string()));
        }
        self.inner.declared_fields(vocabulary_id).await
    }

    async fn resolve_parent_ids(&self, term: &Term) -> Result<Vec<TermId>> {
        self.inner.resolve_parent_ids(term).await
    }

    async fn get_or_create_vocabulary(&self, display_name: &str) -> Result<Vocabulary> {
        self.inner.get_or_create_vocabulary(display_name).await
    }

    async fn declare_field(
        &self,
        vocabulary_id: VocabularyId,
        field_name: &str,
        kind: FieldKind,
    ) -> Result<()> {
        self.inner.declare_field(vocabulary_id, field_name, kind).await
    }
}

/// Throttle that records every checkpoint and write admission
#[derive(Default)]
pub struct RecordingThrottle {
    points: Mutex<Vec<ThrottlePoint>>,
    writes: AtomicUsize,
}

impl RecordingThrottle {
    pub fn points(&self) -> Vec<ThrottlePoint> {
        self.points.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Throttle for RecordingThrottle {
    async fn pause(&self, point: ThrottlePoint) {
        self.points.lock().unwrap().push(point);
    }

    async fn before_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shares one recording throttle between the importer and the test
pub struct SharedThrottle(pub std::sync::Arc<RecordingThrottle>);

#[async_trait]
impl Throttle for SharedThrottle {
    async fn pause(&self, point: ThrottlePoint) {
        self.0.pause(point).await
    }

    async fn before_write(&self) {
        self.0.before_write().await
    }
}
