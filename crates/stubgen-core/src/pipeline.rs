//! Three-stage generation pipeline: read → generate → write.
//!
//! The orchestrator wires three [`Stage`] runners into a linear pipeline
//! with independent concurrency limits, submits a batch of units, and
//! resolves once the write stage has drained. The completion contract is
//! all-or-nothing in the accounting sense: every submitted unit reaches a
//! terminal state (written, or recorded as failed) before [`Pipeline::run`]
//! returns, and `processed` in the report always equals the submitted count.
//!
//! Failure isolation is per unit: a read, parse, or write failure is
//! recorded against that unit and never stops its siblings. Only
//! configuration errors are fatal, and those are raised at construction,
//! before any unit is touched.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{Error, Result, UnitFailure};
use crate::extractor::{CSharpExtractor, DeclarationExtractor};
use crate::generator::TestClassGenerator;
use crate::reader::{FsReader, SourceReader};
use crate::stage::Stage;
use crate::types::{ArtifactBatch, PipelineReport, RawSource, SourceUnit};
use crate::writer::{ArtifactWriter, FsWriter};

/// Output location and per-stage concurrency limits for one pipeline.
///
/// The three limits are independent; none is derived from another. All
/// three default to [`PipelineConfig::DEFAULT_CONCURRENCY`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory (or logical location) artifacts are named under.
    pub output_dir: PathBuf,
    /// Maximum simultaneous read invocations.
    pub read_concurrency: usize,
    /// Maximum simultaneous generate invocations.
    pub generate_concurrency: usize,
    /// Maximum simultaneous write invocations.
    pub write_concurrency: usize,
}

impl PipelineConfig {
    /// Default per-stage concurrency.
    pub const DEFAULT_CONCURRENCY: usize = 5;

    /// Config with the default limits for every stage.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            read_concurrency: Self::DEFAULT_CONCURRENCY,
            generate_concurrency: Self::DEFAULT_CONCURRENCY,
            write_concurrency: Self::DEFAULT_CONCURRENCY,
        }
    }

    /// Set the read-stage limit.
    #[must_use]
    pub const fn with_read_concurrency(mut self, limit: usize) -> Self {
        self.read_concurrency = limit;
        self
    }

    /// Set the generate-stage limit.
    #[must_use]
    pub const fn with_generate_concurrency(mut self, limit: usize) -> Self {
        self.generate_concurrency = limit;
        self
    }

    /// Set the write-stage limit.
    #[must_use]
    pub const fn with_write_concurrency(mut self, limit: usize) -> Self {
        self.write_concurrency = limit;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("output location must not be empty".into()));
        }
        for (name, limit) in [
            ("read", self.read_concurrency),
            ("generate", self.generate_concurrency),
            ("write", self.write_concurrency),
        ] {
            if limit == 0 {
                return Err(Error::Config(format!(
                    "{name} concurrency must be positive, got 0"
                )));
            }
        }
        Ok(())
    }
}

/// The pipeline orchestrator.
///
/// Generic over its three collaborator seams so tests (and alternate
/// frontends) can substitute in-memory implementations. The
/// [`with_defaults`](Pipeline::with_defaults) constructor wires the
/// filesystem reader/writer and the built-in C# extractor.
pub struct Pipeline<R, E, W> {
    config: PipelineConfig,
    reader: Arc<R>,
    extractor: Arc<E>,
    writer: Arc<W>,
    generator: Arc<TestClassGenerator>,
}

fn record(failures: &Mutex<Vec<UnitFailure>>, failure: UnitFailure) {
    failures
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(failure);
}

impl Pipeline<FsReader, CSharpExtractor, FsWriter> {
    /// Pipeline over the filesystem with the built-in C# extractor.
    pub fn with_defaults(config: PipelineConfig) -> Result<Self> {
        Self::new(config, FsReader, CSharpExtractor::new()?, FsWriter)
    }
}

impl<R, E, W> Pipeline<R, E, W>
where
    R: SourceReader + 'static,
    E: DeclarationExtractor + 'static,
    W: ArtifactWriter + 'static,
{
    /// Build a pipeline, validating the configuration.
    ///
    /// Fails with [`Error::Config`] before any unit is processed if a
    /// concurrency limit is zero or the output location is empty.
    pub fn new(config: PipelineConfig, reader: R, extractor: E, writer: W) -> Result<Self> {
        config.validate()?;
        let generator = Arc::new(TestClassGenerator::new(&config.output_dir));
        Ok(Self {
            config,
            reader: Arc::new(reader),
            extractor: Arc::new(extractor),
            writer: Arc::new(writer),
            generator,
        })
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline over `units` and await overall completion.
    ///
    /// Units are submitted to the read stage in the given order; completion
    /// order is unspecified. The returned report accounts for every unit:
    /// `processed == units.len()`, with per-unit failures listed alongside.
    pub async fn run(&self, units: Vec<SourceUnit>) -> PipelineReport {
        let total = units.len();
        info!(units = total, "starting generation pipeline");

        let failures: Arc<Mutex<Vec<UnitFailure>>> = Arc::new(Mutex::new(Vec::new()));
        let processed = Arc::new(AtomicUsize::new(0));

        // Stages are built downstream-first so each upstream work function
        // can capture its downstream sender.
        let write_stage = {
            let writer = Arc::clone(&self.writer);
            let failures = Arc::clone(&failures);
            let processed = Arc::clone(&processed);
            Stage::spawn(
                "write",
                self.config.write_concurrency,
                move |batch: ArtifactBatch| {
                    let writer = Arc::clone(&writer);
                    let failures = Arc::clone(&failures);
                    let processed = Arc::clone(&processed);
                    async move {
                        let mut written = Vec::with_capacity(batch.artifacts.len());
                        let mut failed = None;
                        for artifact in &batch.artifacts {
                            match writer.write(artifact).await {
                                Ok(()) => written.push(artifact.name.clone()),
                                Err(err) => {
                                    failed = Some(err);
                                    break;
                                },
                            }
                        }
                        // Reaching the write stage is terminal for a unit,
                        // success or not.
                        processed.fetch_add(1, Ordering::SeqCst);
                        if let Some(err) = failed {
                            warn!(unit = %batch.unit, written = written.len(), "write failed: {err}");
                            record(
                                &failures,
                                UnitFailure::new(batch.unit, err).with_written(written),
                            );
                        } else {
                            debug!(unit = %batch.unit, artifacts = written.len(), "unit written");
                        }
                    }
                },
            )
        };

        let generate_stage = {
            let extractor = Arc::clone(&self.extractor);
            let generator = Arc::clone(&self.generator);
            let failures = Arc::clone(&failures);
            let processed = Arc::clone(&processed);
            let downstream = write_stage.sender();
            Stage::spawn(
                "generate",
                self.config.generate_concurrency,
                move |raw: RawSource| {
                    let extractor = Arc::clone(&extractor);
                    let generator = Arc::clone(&generator);
                    let failures = Arc::clone(&failures);
                    let processed = Arc::clone(&processed);
                    let downstream = downstream.clone();
                    async move {
                        match extractor.extract(&raw.text) {
                            Ok(declarations) => {
                                let artifacts =
                                    declarations.iter().map(|d| generator.generate(d)).collect();
                                // One batch per unit, even when empty: the
                                // unit still has to count as processed.
                                downstream.submit(ArtifactBatch {
                                    unit: raw.unit,
                                    artifacts,
                                });
                            },
                            Err(err) => {
                                warn!(unit = %raw.unit, "extraction failed: {err}");
                                processed.fetch_add(1, Ordering::SeqCst);
                                record(&failures, UnitFailure::new(raw.unit, err));
                            },
                        }
                    }
                },
            )
        };

        let read_stage = {
            let reader = Arc::clone(&self.reader);
            let failures = Arc::clone(&failures);
            let processed = Arc::clone(&processed);
            let downstream = generate_stage.sender();
            Stage::spawn(
                "read",
                self.config.read_concurrency,
                move |unit: SourceUnit| {
                    let reader = Arc::clone(&reader);
                    let failures = Arc::clone(&failures);
                    let processed = Arc::clone(&processed);
                    let downstream = downstream.clone();
                    async move {
                        match reader.read(&unit).await {
                            Ok(text) => downstream.submit(RawSource { unit, text }),
                            Err(err) => {
                                warn!(unit = %unit, "read failed: {err}");
                                processed.fetch_add(1, Ordering::SeqCst);
                                record(&failures, UnitFailure::new(unit, err));
                            },
                        }
                    }
                },
            )
        };

        for unit in units {
            read_stage.submit(unit);
        }

        // Completion chains: once the read stage drains, its work functions
        // (and their generate senders) are gone, so completing the generate
        // stage closes its queue after the last forwarded item, and likewise
        // for write.
        read_stage.complete().await;
        generate_stage.complete().await;
        write_stage.complete().await;

        let failures = std::mem::take(
            &mut *failures.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let report = PipelineReport {
            processed: processed.load(Ordering::SeqCst),
            failures,
        };
        info!(
            processed = report.processed,
            failures = report.failures.len(),
            "pipeline complete"
        );
        report
    }
}
