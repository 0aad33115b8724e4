//! Term repository boundary
//!
//! The import engine performs all persistence through [`TermRepository`].
//! [`SqliteTermRepository`] is the production implementation; tests wrap it
//! to inject failures.

mod sqlite;

pub use sqlite::SqliteTermRepository;

use async_trait::async_trait;
use taxo_common::db::{FieldKind, FieldSchema, NewTerm, Term, TermId, Vocabulary, VocabularyId};
use taxo_common::Result;

/// Persistence operations the import engine relies on
#[async_trait]
pub trait TermRepository: Send + Sync {
    /// All terms of a vocabulary with exactly this name, in creation order
    async fn find_terms(&self, vocabulary_id: VocabularyId, name: &str) -> Result<Vec<Term>>;

    /// Persist a new term and return it with its assigned id
    async fn create_term(&self, term: &NewTerm) -> Result<Term>;

    /// Save name, description, parents and custom fields of an existing term
    ///
    /// Parents and fields are replaced wholesale by the values on `term`.
    async fn update_term(&self, term: &Term) -> Result<()>;

    /// Custom fields declared for a vocabulary
    async fn declared_fields(&self, vocabulary_id: VocabularyId) -> Result<FieldSchema>;

    /// Stored parent ids of a term, in link order
    async fn resolve_parent_ids(&self, term: &Term) -> Result<Vec<TermId>>;

    /// Look up a vocabulary by the machine key derived from `display_name`,
    /// creating it when absent
    async fn get_or_create_vocabulary(&self, display_name: &str) -> Result<Vocabulary>;

    /// Declare (or redeclare) a custom field on a vocabulary
    async fn declare_field(
        &self,
        vocabulary_id: VocabularyId,
        field_name: &str,
        kind: FieldKind,
    ) -> Result<()>;
}
