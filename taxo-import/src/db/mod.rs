//! Database access for taxo-import beyond the term repository

pub mod runs;
