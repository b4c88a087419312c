//! Salesflow validation layer.
//!
//! This is where raw sales rows meet the data-quality contract. Every row is
//! checked on its own against the sales schema and either becomes a typed
//! [`SalesRecord`] or a [`ValidationDiagnostic`] explaining why it was turned
//! away.
//!
//! ## What we do here
//!
//! - **Declare the schema once** - the six sales fields live in a rule table
//!   ([`FieldRule`] + [`Constraint`]) that the validator walks in order.
//! - **Validate per record** - [`SchemaValidator::validate`] returns a plain
//!   `Result`; bad rows are values, never panics.
//! - **Partition batches** - [`partition`] splits a batch into accepted and
//!   rejected rows, stable and total, with 1-based row numbers.
//! - **Log outcomes** - rejected rows and the batch summary go out as
//!   structured `tracing` events. Installing a subscriber is the caller's job.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use validate::{partition, RawRecord, SchemaValidator, ValidateConfig};
//!
//! let validator = SchemaValidator::new(&ValidateConfig::default()).unwrap();
//! let raw = RawRecord::try_from(json!({
//!     "order_id": "ORD-001",
//!     "customer_email": "valid@email.com",
//!     "product_name": "Produto A",
//!     "quantity": 1,
//!     "unit_price": 100.0,
//!     "order_date": "2024-01-01"
//! }))
//! .unwrap();
//!
//! let result = partition(vec![raw], &validator);
//! assert_eq!(result.valid.len(), 1);
//! assert!(result.invalid.is_empty());
//! ```
mod config;
mod error;
mod partition;
mod rules;
mod types;
mod validator;

pub use crate::config::{ConfigError, ValidateConfig};
pub use crate::error::{ValidationError, Violation, ViolationKind};
pub use crate::partition::partition;
pub use crate::rules::{
    sales_rules, Constraint, FieldRule, DATE_MESSAGE, DEFAULT_EMAIL_PATTERN, ORDER_DATE_FORMAT,
    ORDER_DATE_SHAPE, PRICE_MESSAGE, QUANTITY_MESSAGE,
};
pub use crate::types::{
    Partition, RawRecord, SalesField, SalesRecord, SalesRecordParts, ValidationDiagnostic,
};
pub use crate::validator::SchemaValidator;
