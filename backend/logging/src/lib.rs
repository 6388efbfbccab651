//! Structured logging for heartlog.
//!
//! Console output (plain or JSON), optional daily-rolling NDJSON files, and
//! redaction of secrets in logged payloads.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LogConfig};
pub use redact::{preview, redact_sensitive_data};
