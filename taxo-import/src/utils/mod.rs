//! Utility modules for taxo-import

pub mod event_lines;
pub mod retry;

pub use event_lines::write_event_lines;
pub use retry::retry_once;
