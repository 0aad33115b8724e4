//! taxo-import library interface
//!
//! Imports two-level taxonomies (parent/child category trees) from CSV or XML
//! into the SQLite term store. [`engine::Importer`] holds the reconciliation
//! logic; everything it persists goes through [`repository::TermRepository`].

pub mod cache;
pub mod config;
pub mod db;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod repository;
pub mod rows;
pub mod throttle;
pub mod utils;

pub use crate::engine::{ImportOptions, ImportReport, Importer, RowOutcome};
pub use crate::error::{ImportError, ImportResult};
pub use crate::repository::{SqliteTermRepository, TermRepository};
pub use crate::rows::Row;
