//! Core data types flowing through the generation pipeline.
//!
//! Every type here is transient and pipeline-scoped: created by one stage,
//! handed downstream with full ownership, and never mutated after creation.
//! That single-writer-then-immutable-handoff discipline is what lets the
//! stages run concurrently without any locks on the data itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for one pipeline input.
///
/// A unit names the raw text to fetch: for the filesystem reader it is a
/// path, but a custom [`SourceReader`](crate::SourceReader) may interpret it
/// as any logical name (a database key, a URL, a fixture label).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceUnit(String);

impl SourceUnit {
    /// Create a unit from any string-like identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceUnit {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SourceUnit {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Raw text fetched for one unit. Output of the read stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSource {
    /// The unit this text was fetched for.
    pub unit: SourceUnit,
    /// The full source text.
    pub text: String,
}

/// Structural summary of one declared type, as produced by a
/// [`DeclarationExtractor`](crate::DeclarationExtractor).
///
/// One [`RawSource`] may yield zero or more declarations, one per type
/// declared in the input. Operation names keep their input order and may
/// repeat (overloads); deduplication happens later, in the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Enclosing namespace, if the type declared one.
    pub namespace: Option<String>,
    /// The declared type's name.
    pub type_name: String,
    /// Names of the type's public operations, in declaration order.
    pub public_operations: Vec<String>,
}

/// One generated output: a destination name plus the full generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Destination identifier under the configured output location.
    pub name: String,
    /// The complete generated text.
    pub content: String,
}

/// All artifacts derived from one unit, handed to the write stage as a
/// single item.
///
/// The batch is atomic at the stage boundary: a write invocation handles one
/// unit's full artifact set together, never interleaved with another unit's.
/// An empty batch is legal (the unit parsed but declared no types) and still
/// counts as processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBatch {
    /// The unit these artifacts were derived from.
    pub unit: SourceUnit,
    /// Artifacts in declaration order. May be empty.
    pub artifacts: Vec<GeneratedArtifact>,
}

/// Outcome of one pipeline run.
///
/// The pipeline resolves successfully even when individual units failed;
/// callers inspect [`failures`](Self::failures) to learn which units did not
/// make it to durable storage and why. Serialize-only: failures carry an
/// [`Error`](crate::Error), which cannot be reconstructed from its
/// serialized form.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    /// Number of units that reached a terminal state (success or failure).
    /// Always equals the number of submitted units.
    pub processed: usize,
    /// Per-unit failures, in completion order.
    pub failures: Vec<crate::error::UnitFailure>,
}

impl PipelineReport {
    /// `true` when every unit was generated and written.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Units that failed, in completion order.
    pub fn failed_units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.failures.iter().map(|f| &f.unit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn source_unit_display_and_conversions() {
        let unit = SourceUnit::from("src/Calculator.cs");
        assert_eq!(unit.as_str(), "src/Calculator.cs");
        assert_eq!(unit.to_string(), "src/Calculator.cs");
        assert_eq!(SourceUnit::new(String::from("a")), SourceUnit::from("a"));
    }

    #[test]
    fn source_unit_serializes_transparently() {
        let unit = SourceUnit::from("lib/Foo.cs");
        let json = serde_json::to_string(&unit).expect("serialize");
        assert_eq!(json, "\"lib/Foo.cs\"");

        let back: SourceUnit = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, unit);
    }

    #[test]
    fn declaration_round_trips_through_json() {
        let decl = Declaration {
            namespace: Some("App".to_string()),
            type_name: "Foo".to_string(),
            public_operations: vec!["Go".to_string(), "Go".to_string()],
        };
        let json = serde_json::to_string(&decl).expect("serialize");
        let back: Declaration = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, decl);
    }

    #[test]
    fn report_success_tracks_failures() {
        let report = PipelineReport {
            processed: 3,
            failures: Vec::new(),
        };
        assert!(report.is_success());
        assert_eq!(report.failed_units().count(), 0);
    }

    #[test]
    fn report_serializes_for_persistence() {
        let report = PipelineReport {
            processed: 2,
            failures: vec![crate::error::UnitFailure::new(
                SourceUnit::from("broken.cs"),
                crate::error::Error::Parse("unbalanced braces".to_string()),
            )],
        };

        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["processed"], 2);
        assert_eq!(json["failures"][0]["unit"], "broken.cs");
        assert_eq!(json["failures"][0]["error"]["category"], "parse");
    }

    #[test]
    fn batch_round_trips_through_json() {
        let batch = ArtifactBatch {
            unit: SourceUnit::from("a.cs"),
            artifacts: vec![GeneratedArtifact {
                name: "out/FooTest".to_string(),
                content: "generated".to_string(),
            }],
        };
        let json = serde_json::to_string(&batch).expect("serialize");
        let back: ArtifactBatch = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.unit, batch.unit);
        assert_eq!(back.artifacts, batch.artifacts);
    }
}
