use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validate::{SalesRecord, SalesRecordParts};

use crate::calendar::DateParts;
use crate::text::{normalize_email, normalize_product_name};

/// A validated sale plus the fields derived from it, ready for loading.
///
/// Every field is a function of the source [`SalesRecord`] and the
/// `processed_at` clock reading; nothing else is consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub order_id: String,
    /// Lower-cased.
    pub customer_email: String,
    /// Trimmed and title-cased.
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub order_date: NaiveDate,
    /// `quantity * unit_price`, no rounding.
    pub total_amount: f64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub day_of_week: String,
    pub processed_at: DateTime<Utc>,
}

/// Derives one enriched record. Total: a `SalesRecord` is already valid.
pub fn enrich(record: SalesRecord, processed_at: DateTime<Utc>) -> EnrichedRecord {
    let SalesRecordParts {
        order_id,
        customer_email,
        product_name,
        quantity,
        unit_price,
        order_date,
    } = record.into_parts();

    let parts = DateParts::from_date(order_date);

    EnrichedRecord {
        order_id,
        customer_email: normalize_email(&customer_email),
        product_name: normalize_product_name(&product_name),
        quantity,
        unit_price,
        order_date,
        total_amount: quantity as f64 * unit_price,
        year: parts.year,
        month: parts.month,
        day: parts.day,
        day_of_week: parts.day_of_week.to_string(),
        processed_at,
    }
}

impl EnrichedRecord {
    /// True if every field except `processed_at` matches `other`.
    pub fn same_content(&self, other: &EnrichedRecord) -> bool {
        EnrichedRecord {
            processed_at: other.processed_at,
            ..self.clone()
        } == *other
    }
}
