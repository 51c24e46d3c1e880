//! Error types and result aliases for stubgen-core operations.
//!
//! There are two layers of failure in the pipeline:
//!
//! - [`Error`] — a single operation failed (an I/O call, a parse, a bad
//!   configuration value).
//! - [`UnitFailure`] — an [`Error`] recorded against one pipeline unit.
//!   Per-unit failures are isolated: they never abort sibling units and the
//!   pipeline still resolves successfully, carrying the failure list in its
//!   report.
//!
//! Only [`Error::Config`] is fatal, and only at pipeline construction time,
//! before any unit is processed.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::types::SourceUnit;

/// The main error type for stubgen-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reading a unit's raw text and persisting a generated artifact.
    /// The underlying `std::io::Error` is preserved so callers can inspect
    /// the kind (not found, permission denied, ...).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The declaration extractor could not derive declarations from a
    /// unit's text.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Pipeline configuration is invalid.
    ///
    /// Raised at construction for non-positive concurrency limits or a
    /// missing output location. Fatal: no unit is processed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// Only temporary I/O conditions qualify; parse and configuration
    /// failures are permanent.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            Self::Parse(_) | Self::Config(_) => false,
        }
    }

    /// Static category identifier for logging and failure grouping.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
        }
    }
}

// Serialized as category plus rendered message: `std::io::Error` carries no
// serde support, and callers persisting a report need the classification,
// not the source chain. Serialize-only; errors are not round-tripped.
impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Error", 2)?;
        state.serialize_field("category", self.category())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// A failure recorded against a single pipeline unit.
///
/// `artifacts_written` is non-empty only when the write stage failed partway
/// through a unit's batch; it names the artifacts that were already persisted
/// before the failing write. There is no rollback — the report is accurate
/// about what landed on disk.
#[derive(Debug, Serialize)]
pub struct UnitFailure {
    /// The unit that failed.
    pub unit: SourceUnit,
    /// What went wrong.
    pub error: Error,
    /// Artifact names persisted before the failure, in write order.
    pub artifacts_written: Vec<String>,
}

impl UnitFailure {
    /// Record a failure with no artifacts written.
    #[must_use]
    pub fn new(unit: SourceUnit, error: Error) -> Self {
        Self {
            unit,
            error,
            artifacts_written: Vec::new(),
        }
    }

    /// Attach the names of artifacts persisted before the failure.
    #[must_use]
    pub fn with_written(mut self, written: Vec<String>) -> Self {
        self.artifacts_written = written;
        self
    }
}

impl std::fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.unit, self.error)?;
        if !self.artifacts_written.is_empty() {
            write!(
                f,
                " ({} artifact(s) written before failure)",
                self.artifacts_written.len()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn display_formatting_includes_context() {
        let err = Error::Parse("unbalanced braces".to_string());
        assert_eq!(err.to_string(), "Parse error: unbalanced braces");

        let err = Error::Config("read concurrency must be positive".to_string());
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn io_errors_convert_and_categorize() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.category(), "io");
        assert!(!err.is_recoverable());

        let err: Error = io::Error::new(io::ErrorKind::TimedOut, "slow disk").into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn parse_and_config_are_permanent() {
        assert!(!Error::Parse("bad".into()).is_recoverable());
        assert!(!Error::Config("bad".into()).is_recoverable());
        assert_eq!(Error::Parse("bad".into()).category(), "parse");
        assert_eq!(Error::Config("bad".into()).category(), "config");
    }

    #[test]
    fn unit_failure_serializes_with_error_classification() {
        let failure = UnitFailure::new(
            SourceUnit::from("a.cs"),
            Error::Io(io::Error::new(io::ErrorKind::NotFound, "missing")),
        )
        .with_written(vec!["out/FooTest".to_string()]);

        let json = serde_json::to_value(&failure).expect("serialize");
        assert_eq!(json["unit"], "a.cs");
        assert_eq!(json["error"]["category"], "io");
        assert_eq!(json["error"]["message"], "IO error: missing");
        assert_eq!(json["artifacts_written"][0], "out/FooTest");
    }

    #[test]
    fn unit_failure_display_reports_partial_writes() {
        let failure = UnitFailure::new(
            SourceUnit::from("a.cs"),
            Error::Io(io::Error::other("disk full")),
        )
        .with_written(vec!["out/FooTest".to_string()]);

        let text = failure.to_string();
        assert!(text.contains("a.cs"));
        assert!(text.contains("1 artifact(s) written before failure"));
    }
}
