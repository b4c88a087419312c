//! Batch orchestration: Extract → Validate → Transform → Load.
//!
//! A run walks [`PipelineStage`] strictly forward. Per-record validation
//! failures are data, not errors: they end up in the [`Partition`]'s invalid
//! side and in the reject sink. Only collaborator failures stop a run, and
//! they stop it immediately with a [`PipelineError`] that carries the stage
//! and the counts reached so far. Nothing is retried or rolled back here; the
//! reject artifact written during validation stays written.
//!
//! Outcomes leave the orchestrator as values ([`BatchResult`],
//! [`PipelineError`]) and through an optional [`PipelineObserver`]. The
//! orchestrator itself holds no global state.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{LoadSink, RecordSource, RejectSink, StoreError};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;
use validate::{ConfigError, Partition, RawRecord, SchemaValidator, partition};

use crate::config::{ConfigLoadError, SalesflowConfig};

/// Default relation enriched records are appended to.
pub const DEFAULT_RELATION: &str = "sales";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Extracting,
    Validating,
    Transforming,
    Loading,
    Done,
    Failed,
}

impl PipelineStage {
    /// The strict successor on the happy path. Terminal stages have none.
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Extracting => Some(PipelineStage::Validating),
            PipelineStage::Validating => Some(PipelineStage::Transforming),
            PipelineStage::Transforming => Some(PipelineStage::Loading),
            PipelineStage::Loading => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Extracting => "extracting",
            PipelineStage::Validating => "validating",
            PipelineStage::Transforming => "transforming",
            PipelineStage::Loading => "loading",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record counts reached by a run, as far as it got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub extracted: usize,
    pub valid: usize,
    pub invalid: usize,
    pub loaded: usize,
}

impl fmt::Display for StageCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extracted={} valid={} invalid={} loaded={}",
            self.extracted, self.valid, self.invalid, self.loaded
        )
    }
}

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub run_id: Uuid,
    pub extracted: usize,
    pub valid: usize,
    pub invalid: usize,
    pub loaded: usize,
    /// `valid / extracted` as a percentage; `0.0` for an empty batch.
    pub success_rate: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    pub fn counts(&self) -> StageCounts {
        StageCounts {
            extracted: self.extracted,
            valid: self.valid,
            invalid: self.invalid,
            loaded: self.loaded,
        }
    }
}

/// Percentage of extracted rows that passed validation.
pub fn success_rate(valid: usize, extracted: usize) -> f64 {
    if extracted == 0 {
        return 0.0;
    }
    valid as f64 / extracted as f64 * 100.0
}

/// Stage-level failures. Each one aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source unavailable: {locator}: {source}")]
    SourceUnavailable {
        locator: String,
        #[source]
        source: StoreError,
    },

    #[error("sink failure while {stage} ({counts}): {source}")]
    SinkFailure {
        stage: PipelineStage,
        counts: StageCounts,
        #[source]
        source: StoreError,
    },

    #[error("unexpected failure while {stage} ({counts}): {message}")]
    Unexpected {
        stage: PipelineStage,
        counts: StageCounts,
        message: String,
    },
}

impl PipelineError {
    /// The stage that was running when the failure happened.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::SourceUnavailable { .. } => PipelineStage::Extracting,
            PipelineError::SinkFailure { stage, .. } | PipelineError::Unexpected { stage, .. } => {
                *stage
            }
        }
    }

    /// Counts reached before the failure.
    pub fn counts(&self) -> StageCounts {
        match self {
            PipelineError::SourceUnavailable { .. } => StageCounts::default(),
            PipelineError::SinkFailure { counts, .. } | PipelineError::Unexpected { counts, .. } => {
                *counts
            }
        }
    }
}

/// The reject sink refused the batch. The partition is still usable.
#[derive(Debug, Error)]
#[error("failed to persist {} rejected records: {source}", .partition.invalid.len())]
pub struct RejectWriteError {
    pub partition: Partition,
    #[source]
    pub source: StoreError,
}

/// Partitions `raws` and, when anything was rejected, hands the diagnostics
/// to `sink` in a single write.
pub fn partition_and_reject(
    raws: Vec<RawRecord>,
    validator: &SchemaValidator,
    sink: &dyn RejectSink,
) -> Result<Partition, RejectWriteError> {
    let partition = partition(raws, validator);
    if partition.invalid.is_empty() {
        return Ok(partition);
    }
    match sink.write(&partition.invalid) {
        Ok(()) => Ok(partition),
        Err(source) => Err(RejectWriteError { partition, source }),
    }
}

/// Hooks for whatever reporting layer the deployment uses.
pub trait PipelineObserver: Send + Sync {
    fn stage_completed(&self, stage: PipelineStage, records: usize, latency: Duration);
    fn run_failed(&self, run_id: Uuid, error: &PipelineError);
    fn run_completed(&self, result: &BatchResult);
}

/// Renders run progress as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn stage_completed(&self, stage: PipelineStage, records: usize, latency: Duration) {
        info!(
            stage = %stage,
            records,
            elapsed_micros = latency.as_micros(),
            "stage_complete"
        );
    }

    fn run_failed(&self, run_id: Uuid, error: &PipelineError) {
        let counts = error.counts();
        error!(
            %run_id,
            stage = %error.stage(),
            extracted = counts.extracted,
            valid = counts.valid,
            invalid = counts.invalid,
            error = %error,
            "pipeline_failed"
        );
    }

    fn run_completed(&self, result: &BatchResult) {
        info!(
            run_id = %result.run_id,
            extracted = result.extracted,
            valid = result.valid,
            invalid = result.invalid,
            loaded = result.loaded,
            success_rate = result.success_rate,
            "pipeline_complete"
        );
    }
}

/// Failures while assembling a [`Pipeline`] from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error("invalid validator configuration: {0}")]
    Validator(#[from] ConfigError),
    #[error("failed to open load backend: {0}")]
    Store(#[from] StoreError),
}

/// One configured ETL pipeline. Reusable across runs.
pub struct Pipeline {
    validator: SchemaValidator,
    source: Box<dyn RecordSource>,
    rejects: Box<dyn RejectSink>,
    loader: Box<dyn LoadSink>,
    relation: String,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl Pipeline {
    pub fn new(
        validator: SchemaValidator,
        source: Box<dyn RecordSource>,
        rejects: Box<dyn RejectSink>,
        loader: Box<dyn LoadSink>,
    ) -> Self {
        Self {
            validator,
            source,
            rejects,
            loader,
            relation: DEFAULT_RELATION.to_string(),
            observer: None,
        }
    }

    /// Assembles the CSV source, JSON reject sink and configured load
    /// backend, reporting through [`TracingObserver`].
    pub fn from_config(cfg: &SalesflowConfig) -> Result<Self, BuildError> {
        let validator = SchemaValidator::new(&cfg.validate)?;
        let source = cfg.source.build()?;
        let rejects = cfg.reject.build();
        let loader = cfg.load.to_backend()?.build()?;

        Ok(Self::new(validator, Box::new(source), Box::new(rejects), loader)
            .with_relation(cfg.load.table.clone())
            .with_observer(Arc::new(TracingObserver)))
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// The load sink, for reading back what runs appended.
    pub fn loader(&self) -> &dyn LoadSink {
        self.loader.as_ref()
    }

    /// Runs one batch from `locator` through every stage.
    pub fn run(&self, locator: &str) -> Result<BatchResult, PipelineError> {
        let mut run = RunTracker::new(self.observer.as_deref());
        let started_at = Utc::now();

        match self.run_stages(locator, &mut run) {
            Ok(()) => {
                let counts = run.counts;
                let result = BatchResult {
                    run_id: run.run_id,
                    extracted: counts.extracted,
                    valid: counts.valid,
                    invalid: counts.invalid,
                    loaded: counts.loaded,
                    success_rate: success_rate(counts.valid, counts.extracted),
                    started_at,
                    finished_at: Utc::now(),
                };
                if let Some(observer) = run.observer {
                    observer.run_completed(&result);
                }
                Ok(result)
            }
            Err(err) => Err(run.fail(err)),
        }
    }

    fn run_stages(&self, locator: &str, run: &mut RunTracker<'_>) -> Result<(), PipelineError> {
        let raws = self
            .source
            .extract(locator)
            .map_err(|source| PipelineError::SourceUnavailable {
                locator: locator.to_string(),
                source,
            })?;
        run.counts.extracted = raws.len();
        run.complete_stage(raws.len());

        let partition = match partition_and_reject(raws, &self.validator, self.rejects.as_ref()) {
            Ok(partition) => partition,
            Err(RejectWriteError { partition, source }) => {
                run.counts.valid = partition.valid.len();
                run.counts.invalid = partition.invalid.len();
                return Err(PipelineError::SinkFailure {
                    stage: run.stage,
                    counts: run.counts,
                    source,
                });
            }
        };
        run.counts.valid = partition.valid.len();
        run.counts.invalid = partition.invalid.len();
        run.complete_stage(partition.total());

        let enriched = transform::transform(partition.valid);
        run.complete_stage(enriched.len());

        let loaded = self
            .loader
            .append(&self.relation, &enriched)
            .map_err(|source| PipelineError::SinkFailure {
                stage: run.stage,
                counts: run.counts,
                source,
            })?;
        if loaded != enriched.len() {
            return Err(PipelineError::Unexpected {
                stage: run.stage,
                counts: run.counts,
                message: format!(
                    "load sink reported {loaded} rows written for a batch of {}",
                    enriched.len()
                ),
            });
        }
        run.counts.loaded = loaded;
        run.complete_stage(loaded);

        Ok(())
    }
}

/// Per-run bookkeeping: current stage, counts, stage timer.
struct RunTracker<'a> {
    run_id: Uuid,
    stage: PipelineStage,
    counts: StageCounts,
    stage_started: Instant,
    observer: Option<&'a dyn PipelineObserver>,
}

impl<'a> RunTracker<'a> {
    fn new(observer: Option<&'a dyn PipelineObserver>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: PipelineStage::Extracting,
            counts: StageCounts::default(),
            stage_started: Instant::now(),
            observer,
        }
    }

    fn complete_stage(&mut self, records: usize) {
        if let Some(observer) = self.observer {
            observer.stage_completed(self.stage, records, self.stage_started.elapsed());
        }
        if let Some(next) = self.stage.next() {
            self.stage = next;
        }
        self.stage_started = Instant::now();
    }

    fn fail(&self, err: PipelineError) -> PipelineError {
        if let Some(observer) = self.observer {
            observer.run_failed(self.run_id, &err);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use store::{InMemoryLoadSink, MemoryRejectSink, MemorySource};
    use transform::EnrichedRecord;
    use validate::{SalesField, ValidateConfig, ValidationDiagnostic};

    use super::*;

    fn validator() -> SchemaValidator {
        SchemaValidator::new(&ValidateConfig::default()).expect("default validator")
    }

    fn raw(value: serde_json::Value) -> RawRecord {
        RawRecord::try_from(value).expect("fixture must be an object")
    }

    fn two_row_batch() -> Vec<RawRecord> {
        vec![
            raw(json!({
                "order_id": "ORD-001",
                "customer_email": "valid@email.com",
                "product_name": "Produto A",
                "quantity": 1,
                "unit_price": 100.0,
                "order_date": "2024-01-01"
            })),
            raw(json!({
                "order_id": "ORD-002",
                "customer_email": "invalid_email",
                "product_name": "Produto B",
                "quantity": 2,
                "unit_price": 200.0,
                "order_date": "2024-01-02"
            })),
        ]
    }

    struct SharedRejects(Arc<MemoryRejectSink>);

    impl RejectSink for SharedRejects {
        fn write(&self, diagnostics: &[ValidationDiagnostic]) -> Result<(), StoreError> {
            self.0.write(diagnostics)
        }
    }

    struct BrokenRejects;

    impl RejectSink for BrokenRejects {
        fn write(&self, _: &[ValidationDiagnostic]) -> Result<(), StoreError> {
            Err(StoreError::backend("disk full"))
        }
    }

    struct BrokenLoader;

    impl LoadSink for BrokenLoader {
        fn append(&self, _: &str, _: &[EnrichedRecord]) -> Result<usize, StoreError> {
            Err(StoreError::backend("connection refused"))
        }

        fn scan(&self, _: &str) -> Result<Vec<EnrichedRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct ShortLoader;

    impl LoadSink for ShortLoader {
        fn append(&self, _: &str, records: &[EnrichedRecord]) -> Result<usize, StoreError> {
            Ok(records.len().saturating_sub(1))
        }

        fn scan(&self, _: &str) -> Result<Vec<EnrichedRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl PipelineObserver for Recorder {
        fn stage_completed(&self, stage: PipelineStage, records: usize, _: Duration) {
            self.events.lock().unwrap().push(format!("{stage}:{records}"));
        }

        fn run_failed(&self, _: Uuid, error: &PipelineError) {
            self.events
                .lock()
                .unwrap()
                .push(format!("failed:{}", error.stage()));
        }

        fn run_completed(&self, result: &BatchResult) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done:{}", result.loaded));
        }
    }

    fn pipeline_with(rejects: Box<dyn RejectSink>, loader: Box<dyn LoadSink>) -> Pipeline {
        let source = MemorySource::new().with_batch("batch", two_row_batch());
        Pipeline::new(validator(), Box::new(source), rejects, loader)
    }

    #[test]
    fn stages_advance_strictly() {
        let mut stage = PipelineStage::Extracting;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            seen.push(next);
            stage = next;
        }
        assert_eq!(
            seen,
            vec![
                PipelineStage::Extracting,
                PipelineStage::Validating,
                PipelineStage::Transforming,
                PipelineStage::Loading,
                PipelineStage::Done,
            ]
        );
        assert!(PipelineStage::Done.is_terminal());
        assert!(PipelineStage::Failed.is_terminal());
        assert_eq!(PipelineStage::Failed.next(), None);
        assert!(!PipelineStage::Loading.is_terminal());
    }

    #[test]
    fn success_rate_handles_empty_batch() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(1, 2), 50.0);
        assert_eq!(success_rate(3, 3), 100.0);
    }

    #[test]
    fn runs_reference_batch() {
        let rejects = Arc::new(MemoryRejectSink::new());
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline_with(
            Box::new(SharedRejects(rejects.clone())),
            Box::new(InMemoryLoadSink::new()),
        )
        .with_observer(recorder.clone());

        let result = pipeline.run("batch").unwrap();
        assert_eq!(result.counts(), StageCounts {
            extracted: 2,
            valid: 1,
            invalid: 1,
            loaded: 1
        });
        assert_eq!(result.success_rate, 50.0);
        assert!(result.finished_at >= result.started_at);

        let diagnostics = rejects.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].row_number, 2);
        assert!(diagnostics[0].mentions(SalesField::CustomerEmail));

        let loaded = pipeline.loader().scan("sales").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].order_id, "ORD-001");
        assert_eq!(loaded[0].total_amount, 100.0);
        assert_eq!(loaded[0].day_of_week, "Monday");

        assert_eq!(recorder.events(), vec![
            "extracting:2",
            "validating:2",
            "transforming:1",
            "loading:1",
            "done:1"
        ]);
    }

    #[test]
    fn clean_batch_skips_reject_sink() {
        let rejects = Arc::new(MemoryRejectSink::new());
        let source = MemorySource::new().with_batch("clean", vec![two_row_batch().remove(0)]);
        let pipeline = Pipeline::new(
            validator(),
            Box::new(source),
            Box::new(SharedRejects(rejects.clone())),
            Box::new(InMemoryLoadSink::new()),
        );

        let result = pipeline.run("clean").unwrap();
        assert_eq!(result.success_rate, 100.0);
        assert_eq!(rejects.write_count(), 0);
    }

    #[test]
    fn empty_batch_completes_with_zero_rate() {
        let source = MemorySource::new().with_batch("empty", Vec::new());
        let pipeline = Pipeline::new(
            validator(),
            Box::new(source),
            Box::new(MemoryRejectSink::new()),
            Box::new(InMemoryLoadSink::new()),
        );
        let result = pipeline.run("empty").unwrap();
        assert_eq!(result.extracted, 0);
        assert_eq!(result.success_rate, 0.0);
    }

    #[test]
    fn missing_source_fails_before_validation() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline_with(
            Box::new(MemoryRejectSink::new()),
            Box::new(InMemoryLoadSink::new()),
        )
        .with_observer(recorder.clone());

        let err = pipeline.run("nowhere").unwrap_err();
        assert!(matches!(&err, PipelineError::SourceUnavailable { source, .. } if source.is_not_found()));
        assert_eq!(err.stage(), PipelineStage::Extracting);
        assert_eq!(recorder.events(), vec!["failed:extracting"]);
    }

    #[test]
    fn reject_write_failure_is_fatal_and_keeps_counts() {
        let pipeline = pipeline_with(Box::new(BrokenRejects), Box::new(InMemoryLoadSink::new()));

        let err = pipeline.run("batch").unwrap_err();
        match &err {
            PipelineError::SinkFailure { stage, counts, .. } => {
                assert_eq!(*stage, PipelineStage::Validating);
                assert_eq!(counts.extracted, 2);
                assert_eq!(counts.valid, 1);
                assert_eq!(counts.invalid, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(pipeline.loader().scan("sales").unwrap().is_empty());
    }

    #[test]
    fn partition_survives_reject_write_failure() {
        let err = partition_and_reject(two_row_batch(), &validator(), &BrokenRejects).unwrap_err();
        assert_eq!(err.partition.valid.len(), 1);
        assert_eq!(err.partition.invalid.len(), 1);
        assert!(err.to_string().contains("1 rejected records"));
    }

    #[test]
    fn load_failure_is_fatal() {
        let rejects = Arc::new(MemoryRejectSink::new());
        let pipeline = pipeline_with(Box::new(SharedRejects(rejects.clone())), Box::new(BrokenLoader));

        let err = pipeline.run("batch").unwrap_err();
        assert_eq!(err.stage(), PipelineStage::Loading);
        assert_eq!(err.counts().loaded, 0);
        // Rejects written during validation are not undone.
        assert_eq!(rejects.write_count(), 1);
    }

    #[test]
    fn observer_sees_failure_at_the_stage_that_broke() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline_with(Box::new(MemoryRejectSink::new()), Box::new(BrokenLoader))
            .with_observer(recorder.clone());

        pipeline.run("batch").unwrap_err();
        assert_eq!(
            recorder.events(),
            vec!["extracting:2", "validating:2", "transforming:1", "failed:loading"]
        );
    }

    #[test]
    fn short_load_count_is_unexpected() {
        let pipeline = pipeline_with(Box::new(MemoryRejectSink::new()), Box::new(ShortLoader));
        let err = pipeline.run("batch").unwrap_err();
        assert!(matches!(err, PipelineError::Unexpected { stage: PipelineStage::Loading, .. }));
    }

    #[test]
    fn custom_relation_is_used() {
        let pipeline = pipeline_with(
            Box::new(MemoryRejectSink::new()),
            Box::new(InMemoryLoadSink::new()),
        )
        .with_relation("sales_2024");

        pipeline.run("batch").unwrap();
        assert_eq!(pipeline.relation(), "sales_2024");
        assert_eq!(pipeline.loader().scan("sales_2024").unwrap().len(), 1);
        assert!(pipeline.loader().scan("sales").unwrap().is_empty());
    }

    #[test]
    fn batch_result_serializes() {
        let pipeline = pipeline_with(
            Box::new(MemoryRejectSink::new()),
            Box::new(InMemoryLoadSink::new()),
        );
        let result = pipeline.run("batch").unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["extracted"], json!(2));
        assert_eq!(value["success_rate"], json!(50.0));
        assert!(value["run_id"].is_string());
    }
}
