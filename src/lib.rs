//! Workspace umbrella crate for salesflow, a sales data-quality ETL.
//!
//! This crate stitches the stage crates together so callers can run a whole
//! batch with one API entry point:
//!
//! - `validate` checks each raw row against the sales schema and splits the
//!   batch into accepted records and rejection diagnostics.
//! - `transform` derives totals, calendar parts and normalized text.
//! - `store` reads CSV input, persists rejects and appends the enriched
//!   output to an in-memory or redb sink.
//!
//! [`Pipeline`] sequences them and returns a [`BatchResult`];
//! [`SalesflowConfig`] builds one from YAML.
//!
//! ```
//! use salesflow::{
//!     InMemoryLoadSink, MemoryRejectSink, MemorySource, Pipeline, RawRecord, SchemaValidator,
//!     ValidateConfig,
//! };
//!
//! let row = RawRecord::new()
//!     .with_field("order_id", "ORD-001")
//!     .with_field("customer_email", "valid@email.com")
//!     .with_field("product_name", "Produto A")
//!     .with_field("quantity", 1)
//!     .with_field("unit_price", 100.0)
//!     .with_field("order_date", "2024-01-01");
//!
//! let pipeline = Pipeline::new(
//!     SchemaValidator::new(&ValidateConfig::default()).unwrap(),
//!     Box::new(MemorySource::new().with_batch("today", vec![row])),
//!     Box::new(MemoryRejectSink::new()),
//!     Box::new(InMemoryLoadSink::new()),
//! );
//!
//! let result = pipeline.run("today").unwrap();
//! assert_eq!(result.loaded, 1);
//! assert_eq!(result.success_rate, 100.0);
//! ```

pub mod config;
pub mod pipeline;

pub use crate::config::{
    ConfigLoadError, DEFAULT_LOAD_PATH, LoadBackendKind, LoadYamlConfig, LoggingYamlConfig,
    RejectYamlConfig, SalesflowConfig, SourceYamlConfig,
};
pub use crate::pipeline::{
    BatchResult, BuildError, DEFAULT_RELATION, Pipeline, PipelineError, PipelineObserver,
    PipelineStage, RejectWriteError, StageCounts, TracingObserver, partition_and_reject,
    success_rate,
};

pub use store::{
    CsvSource, InMemoryLoadSink, JsonRejectSink, LoadBackend, LoadSink, MemoryRejectSink,
    MemorySource, RecordSource, RejectSink, StoreError, read_rejects,
};
#[cfg(feature = "embedded")]
pub use store::RedbLoadSink;
pub use transform::{EnrichedRecord, enrich, transform, transform_at};
pub use validate::{
    Partition, RawRecord, SalesField, SalesRecord, SchemaValidator, ValidateConfig,
    ValidationDiagnostic, ValidationError, Violation, ViolationKind, partition,
};
