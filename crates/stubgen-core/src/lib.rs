//! # stubgen-core
//!
//! Core library for batch test-stub generation: given a set of source
//! inputs, derive a structural model of each (types and their public
//! operations) and emit one generated test class per type, writing each
//! artifact to durable storage.
//!
//! ## Architecture
//!
//! Work flows strictly one direction through a three-stage
//! bounded-concurrency pipeline:
//!
//! 1. **Read** — fetch raw text for each [`SourceUnit`] via a
//!    [`SourceReader`].
//! 2. **Generate** — extract [`Declaration`]s with a
//!    [`DeclarationExtractor`] and render one [`GeneratedArtifact`] per type;
//!    a unit's artifacts move downstream together as one [`ArtifactBatch`].
//! 3. **Write** — persist each artifact via an [`ArtifactWriter`].
//!
//! Each stage is an instance of the reusable [`Stage`] runner with its own
//! concurrency limit. Per-unit failures are isolated and collected; the
//! pipeline always resolves with a [`PipelineReport`] accounting for every
//! submitted unit.
//!
//! ## Quick start
//!
//! ```rust
//! use stubgen_core::{Declaration, TestClassGenerator};
//!
//! let generator = TestClassGenerator::new("generated");
//! let artifact = generator.generate(&Declaration {
//!     namespace: Some("App".to_string()),
//!     type_name: "Calculator".to_string(),
//!     public_operations: vec!["Add".to_string(), "Add".to_string()],
//! });
//!
//! assert!(artifact.name.ends_with("CalculatorTest"));
//! assert!(artifact.content.contains("public void AddTest()"));
//! assert!(artifact.content.contains("public void Add1Test()"));
//! ```
//!
//! Running the full pipeline over the filesystem:
//!
//! ```rust,no_run
//! use stubgen_core::{Pipeline, PipelineConfig, SourceUnit};
//!
//! # async fn example() -> stubgen_core::Result<()> {
//! let pipeline = Pipeline::with_defaults(
//!     PipelineConfig::new("generated")
//!         .with_read_concurrency(5)
//!         .with_generate_concurrency(5)
//!         .with_write_concurrency(5),
//! )?;
//!
//! let report = pipeline
//!     .run(vec![SourceUnit::from("src/Calculator.cs")])
//!     .await;
//! for failure in &report.failures {
//!     eprintln!("failed: {failure}");
//! }
//! # Ok(())
//! # }
//! ```

/// Error types and result aliases
pub mod error;
/// Declaration extraction from raw source text
pub mod extractor;
/// Declaration-to-artifact generation (naming and layout)
pub mod generator;
/// The three-stage pipeline orchestrator
pub mod pipeline;
/// Source reading collaborator boundary
pub mod reader;
/// Reusable bounded-concurrency stage runner
pub mod stage;
/// Core data types flowing through the pipeline
pub mod types;
/// Artifact persistence collaborator boundary
pub mod writer;

// Re-export commonly used types
pub use error::{Error, Result, UnitFailure};
pub use extractor::{CSharpExtractor, DeclarationExtractor};
pub use generator::TestClassGenerator;
pub use pipeline::{Pipeline, PipelineConfig};
pub use reader::{FsReader, SourceReader};
pub use stage::{Stage, StageSender};
pub use types::{
    ArtifactBatch, Declaration, GeneratedArtifact, PipelineReport, RawSource, SourceUnit,
};
pub use writer::{ArtifactWriter, FsWriter};
