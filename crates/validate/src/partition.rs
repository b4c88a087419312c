use std::time::Instant;

use tracing::{info, warn};

use crate::error::ValidationError;
use crate::types::{Partition, RawRecord, SalesRecord, ValidationDiagnostic};
use crate::validator::SchemaValidator;

/// Splits a batch into valid records and diagnostics.
///
/// Rows are numbered from 1 in input order. Every row lands in exactly one
/// side and each side keeps the input's relative order, so
/// `partition.total() == raws.len()` always holds. Raw rows that pass are
/// dropped after conversion; rows that fail are moved into their diagnostic.
pub fn partition(raws: Vec<RawRecord>, validator: &SchemaValidator) -> Partition {
    let start = Instant::now();
    let outcomes = classify(&raws, validator);

    let mut valid = Vec::with_capacity(raws.len());
    let mut invalid = Vec::new();

    for (idx, (raw, outcome)) in raws.into_iter().zip(outcomes).enumerate() {
        let row_number = idx + 1;
        match outcome {
            Ok(record) => valid.push(record),
            Err(err) => {
                warn!(row_number, error = %err, "record_rejected");
                invalid.push(ValidationDiagnostic::new(row_number, raw, err));
            }
        }
    }

    let elapsed_micros = start.elapsed().as_micros();
    info!(
        valid = valid.len(),
        invalid = invalid.len(),
        parallel = validator.use_parallel(),
        elapsed_micros,
        "partition_complete"
    );

    Partition { valid, invalid }
}

#[cfg(feature = "parallel")]
fn classify(
    raws: &[RawRecord],
    validator: &SchemaValidator,
) -> Vec<Result<SalesRecord, ValidationError>> {
    use rayon::prelude::*;

    if validator.use_parallel() {
        raws.par_iter().map(|raw| validator.validate(raw)).collect()
    } else {
        raws.iter().map(|raw| validator.validate(raw)).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn classify(
    raws: &[RawRecord],
    validator: &SchemaValidator,
) -> Vec<Result<SalesRecord, ValidationError>> {
    raws.iter().map(|raw| validator.validate(raw)).collect()
}
