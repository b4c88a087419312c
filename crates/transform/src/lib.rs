//! Salesflow transform layer.
//!
//! Turns validated [`SalesRecord`]s into [`EnrichedRecord`]s: line totals,
//! calendar components, English weekday names and normalized text fields.
//!
//! ## Pure function guarantee
//!
//! Apart from the single clock read in [`transform`], no I/O, no locale and
//! no shared state. [`transform_at`] takes the timestamp explicitly and is
//! fully deterministic: same records + same timestamp = same output.
//!
//! ## Invariants worth knowing
//!
//! - Input is already schema-valid; there is no failure path here
//! - Output order matches input order, one record out per record in
//! - Dates come pre-parsed from validation, so decomposition reuses the very
//!   same calendar value instead of re-parsing text
//! - Only `product_name` (trim + title case) and `customer_email`
//!   (lower case) are normalized
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::info;
use validate::SalesRecord;

mod calendar;
mod record;
mod text;

pub use crate::calendar::{weekday_name, DateParts};
pub use crate::record::{enrich, EnrichedRecord};
pub use crate::text::{normalize_email, normalize_product_name, title_case};

/// Enriches a batch, stamping every record with one shared `processed_at`
/// read from the wall clock.
pub fn transform(records: Vec<SalesRecord>) -> Vec<EnrichedRecord> {
    transform_at(records, Utc::now())
}

/// Enriches a batch using the given `processed_at` timestamp.
pub fn transform_at(records: Vec<SalesRecord>, processed_at: DateTime<Utc>) -> Vec<EnrichedRecord> {
    let start = Instant::now();
    let enriched: Vec<EnrichedRecord> = records
        .into_iter()
        .map(|record| enrich(record, processed_at))
        .collect();

    info!(
        records = enriched.len(),
        elapsed_micros = start.elapsed().as_micros(),
        "transform_complete"
    );
    enriched
}
