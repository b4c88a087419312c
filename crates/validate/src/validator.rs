use crate::config::{ConfigError, ValidateConfig};
use crate::error::{ValidationError, Violation};
use crate::rules::{sales_rules, FieldRule, FieldValue};
use crate::types::{RawRecord, SalesField, SalesRecord, SalesRecordParts};

/// Compiled sales schema.
///
/// Build once with [`SchemaValidator::new`], then call
/// [`validate`](SchemaValidator::validate) per record. The validator holds no
/// mutable state and is `Send + Sync`, so one instance can serve any number
/// of threads.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    rules: Vec<FieldRule>,
    use_parallel: bool,
}

impl SchemaValidator {
    /// Compiles the rule table for `cfg`.
    pub fn new(cfg: &ValidateConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: sales_rules(cfg)?,
            use_parallel: cfg.use_parallel,
        })
    }

    /// The compiled rules, in evaluation order.
    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn use_parallel(&self) -> bool {
        self.use_parallel
    }

    /// Validates one raw record.
    ///
    /// Every rule runs, even after a failure, so the error lists all failing
    /// fields in rule order. A record is valid only if no rule failed.
    pub fn validate(&self, raw: &RawRecord) -> Result<SalesRecord, ValidationError> {
        let mut builder = RecordBuilder::default();
        let mut violations = Vec::new();

        for rule in &self.rules {
            match rule.check(raw.get(rule.field.as_str())) {
                Ok(value) => builder.set(rule.field, value),
                Err(violation) => violations.push(violation),
            }
        }

        if let Some(err) = ValidationError::new(violations) {
            return Err(err);
        }

        builder
            .build()
            .map_err(|field| ValidationError::single(Violation::missing(field)))
    }
}

/// Collects typed values as rules pass.
#[derive(Default)]
struct RecordBuilder {
    order_id: Option<String>,
    customer_email: Option<String>,
    product_name: Option<String>,
    quantity: Option<i64>,
    unit_price: Option<f64>,
    order_date: Option<chrono::NaiveDate>,
}

impl RecordBuilder {
    fn set(&mut self, field: SalesField, value: FieldValue) {
        match (field, value) {
            (SalesField::OrderId, FieldValue::Text(v)) => self.order_id = Some(v),
            (SalesField::CustomerEmail, FieldValue::Text(v)) => self.customer_email = Some(v),
            (SalesField::ProductName, FieldValue::Text(v)) => self.product_name = Some(v),
            (SalesField::Quantity, FieldValue::Int(v)) => self.quantity = Some(v),
            (SalesField::UnitPrice, FieldValue::Float(v)) => self.unit_price = Some(v),
            (SalesField::OrderDate, FieldValue::Date(v)) => self.order_date = Some(v),
            _ => {}
        }
    }

    /// Returns the first field no rule filled in.
    fn build(self) -> Result<SalesRecord, SalesField> {
        Ok(SalesRecord::from_parts(SalesRecordParts {
            order_id: self.order_id.ok_or(SalesField::OrderId)?,
            customer_email: self.customer_email.ok_or(SalesField::CustomerEmail)?,
            product_name: self.product_name.ok_or(SalesField::ProductName)?,
            quantity: self.quantity.ok_or(SalesField::Quantity)?,
            unit_price: self.unit_price.ok_or(SalesField::UnitPrice)?,
            order_date: self.order_date.ok_or(SalesField::OrderDate)?,
        }))
    }
}
