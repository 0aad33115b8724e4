//! # Taxo Common Library
//!
//! Shared code for the taxonomy import tooling:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Database initialization, schema and models
//! - Import event bus

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
