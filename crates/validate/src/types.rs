//! Core data model types for the validate crate.
//!
//! These types describe a sales row at each point of the validation stage:
//!
//! ```text
//! RawRecord (untyped, straight from extraction)
//!        │
//!        ▼ SchemaValidator::validate()
//! ┌──────────────────────────────┬───────────────────────────────┐
//! │ SalesRecord (all rules pass) │ ValidationDiagnostic (reject) │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! A [`SalesRecord`] can only be produced by the validator, so holding one is
//! proof that every field constraint held at the same time.
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ValidationError, Violation};

/// Untyped row exactly as produced by extraction.
///
/// Field order is preserved so rejected rows can be replayed in the same
/// column order they were read in. Values are plain JSON scalars: strings,
/// numbers, booleans or `null` for empty cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Inserts a field, returning the previous value if the name was already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in their original order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for RawRecord {
    type Error = Value;

    /// Accepts a JSON object; any other value is handed back unchanged.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(other),
        }
    }
}

impl FromIterator<(String, Value)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// The six columns of the sales schema, in rule evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesField {
    OrderId,
    CustomerEmail,
    ProductName,
    Quantity,
    UnitPrice,
    OrderDate,
}

impl SalesField {
    pub const ALL: [SalesField; 6] = [
        SalesField::OrderId,
        SalesField::CustomerEmail,
        SalesField::ProductName,
        SalesField::Quantity,
        SalesField::UnitPrice,
        SalesField::OrderDate,
    ];

    /// Column name as it appears in raw input.
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesField::OrderId => "order_id",
            SalesField::CustomerEmail => "customer_email",
            SalesField::ProductName => "product_name",
            SalesField::Quantity => "quantity",
            SalesField::UnitPrice => "unit_price",
            SalesField::OrderDate => "order_date",
        }
    }
}

impl fmt::Display for SalesField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sales row that passed every schema constraint.
///
/// There is no public constructor: records come out of
/// [`SchemaValidator::validate`](crate::SchemaValidator::validate) or not at
/// all. `order_date` keeps the parsed calendar date so later stages never
/// parse it again; it serializes back to `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    order_id: String,
    customer_email: String,
    product_name: String,
    quantity: i64,
    unit_price: f64,
    order_date: NaiveDate,
}

/// Owned fields of a [`SalesRecord`], for consumers that take the record apart.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecordParts {
    pub order_id: String,
    pub customer_email: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub order_date: NaiveDate,
}

impl SalesRecord {
    pub(crate) fn from_parts(parts: SalesRecordParts) -> Self {
        let SalesRecordParts {
            order_id,
            customer_email,
            product_name,
            quantity,
            unit_price,
            order_date,
        } = parts;
        Self {
            order_id,
            customer_email,
            product_name,
            quantity,
            unit_price,
            order_date,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }

    pub fn into_parts(self) -> SalesRecordParts {
        SalesRecordParts {
            order_id: self.order_id,
            customer_email: self.customer_email,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            order_date: self.order_date,
        }
    }
}

/// Why one input row was rejected.
///
/// Exactly one diagnostic exists per invalid row. `error_message` is the
/// aggregated human-readable text; `violations` keeps the per-field detail
/// that the aggregated message flattens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationDiagnostic {
    /// 1-based position of the row in the input batch.
    pub row_number: usize,
    /// The row as extracted, for forensic replay.
    pub raw_fields: RawRecord,
    pub error_message: String,
    #[serde(default)]
    pub violations: Vec<Violation>,
}

impl ValidationDiagnostic {
    pub fn new(row_number: usize, raw_fields: RawRecord, error: ValidationError) -> Self {
        let error_message = error.to_string();
        Self {
            row_number,
            raw_fields,
            error_message,
            violations: error.into_violations(),
        }
    }

    /// True if any violation concerns `field`.
    pub fn mentions(&self, field: SalesField) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

/// Result of splitting a batch into accepted and rejected rows.
///
/// Both sides keep the relative order of the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub valid: Vec<SalesRecord>,
    pub invalid: Vec<ValidationDiagnostic>,
}

impl Partition {
    /// Number of input rows this partition accounts for.
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    pub fn is_all_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}
