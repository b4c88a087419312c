//! Salesflow boundary adapters.
//!
//! The validation and transform layers never touch a file or a database.
//! Everything that does lives here, behind three small traits:
//!
//! - [`RecordSource`] - hands over the raw rows of a batch, in input order.
//! - [`RejectSink`] - persists the diagnostics of rejected rows, once per batch.
//! - [`LoadSink`] - appends enriched records to a named relation.
//!
//! Each trait has an in-memory implementation for tests and a real one for
//! deployments ([`CsvSource`], [`JsonRejectSink`], [`RedbLoadSink`]).
//!
//! ```
//! use store::{MemorySource, RecordSource};
//! use validate::RawRecord;
//!
//! let source = MemorySource::new()
//!     .with_batch("today", vec![RawRecord::new().with_field("order_id", "ORD-1")]);
//! assert_eq!(source.extract("today").unwrap().len(), 1);
//! assert!(source.extract("yesterday").unwrap_err().is_not_found());
//! ```
mod error;
mod load;
mod reject;
mod source;

pub use crate::error::StoreError;
#[cfg(feature = "backend-redb")]
pub use crate::load::RedbLoadSink;
pub use crate::load::{InMemoryLoadSink, LoadBackend, LoadSink};
pub use crate::reject::{read_rejects, JsonRejectSink, MemoryRejectSink, RejectSink};
pub use crate::source::{infer_cell, CsvSource, MemorySource, RecordSource};
