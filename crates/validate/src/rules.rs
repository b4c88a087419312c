//! The sales schema as a table of field rules.
//!
//! Each [`FieldRule`] pairs a field with a [`Constraint`] and, optionally, the
//! message to report when a present value breaks it. The validator walks the
//! table in order; there is no reflection and no per-field code path outside
//! this module.
use std::borrow::Cow;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

use crate::config::{ConfigError, ValidateConfig};
use crate::error::{Violation, ViolationKind};
use crate::types::SalesField;

/// Built-in email grammar: dot-separated local part, at least one
/// dot-separated domain label, alphabetic TLD of two or more letters.
pub const DEFAULT_EMAIL_PATTERN: &str = r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$";

/// Calendar format accepted for `order_date`.
pub const ORDER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Shape an `order_date` string must have before `chrono` parses it. `%Y`
/// alone also takes signed, short and space-padded years.
pub const ORDER_DATE_SHAPE: &str = r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}$";

const MAX_EMAIL_LEN: usize = 254;

pub const QUANTITY_MESSAGE: &str = "Quantity must be greater than zero.";
pub const PRICE_MESSAGE: &str = "Price must be greater than zero.";
pub const DATE_MESSAGE: &str = "Date must be in YYYY-MM-DD format.";
const EMAIL_MESSAGE: &str = "value is not a valid email address";

/// A predicate over one raw value.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// String with a character count in `[min_len, max_len]`.
    Text { min_len: usize, max_len: usize },
    /// String matching an email grammar.
    Email { regex: Regex },
    /// Integer-coercible and strictly positive.
    PositiveInt,
    /// Numeric-coercible, finite and strictly positive.
    PositiveFloat,
    /// String matching `shape` and parsing as a calendar date with the
    /// given `chrono` format.
    Date { format: &'static str, shape: Regex },
}

/// A typed value produced by a passing rule.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

/// One row of the rule table.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: SalesField,
    pub constraint: Constraint,
    /// Overrides the constraint's own message when a present value fails.
    pub message: Option<Cow<'static, str>>,
}

impl FieldRule {
    pub fn new(field: SalesField, constraint: Constraint) -> Self {
        Self {
            field,
            constraint,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Evaluates the rule against the raw value (`None` when the column is absent).
    pub(crate) fn check(&self, value: Option<&Value>) -> Result<FieldValue, Violation> {
        let value = match value {
            None | Some(Value::Null) => return Err(Violation::missing(self.field)),
            Some(value) => value,
        };

        match &self.constraint {
            Constraint::Text { min_len, max_len } => {
                let text = coerce_text(value)
                    .ok_or_else(|| self.fail(ViolationKind::InvalidType, "str type expected"))?;
                let len = text.chars().count();
                if len < *min_len {
                    return Err(self.fail(
                        ViolationKind::OutOfRange,
                        format!("ensure this value has at least {min_len} characters"),
                    ));
                }
                if len > *max_len {
                    return Err(self.fail(
                        ViolationKind::OutOfRange,
                        format!("ensure this value has at most {max_len} characters"),
                    ));
                }
                Ok(FieldValue::Text(text))
            }
            Constraint::Email { regex } => {
                let Value::String(text) = value else {
                    return Err(self.fail(ViolationKind::InvalidType, "str type expected"));
                };
                if text.len() > MAX_EMAIL_LEN || !regex.is_match(text) {
                    return Err(self.fail(ViolationKind::InvalidFormat, EMAIL_MESSAGE));
                }
                Ok(FieldValue::Text(text.clone()))
            }
            Constraint::PositiveInt => match coerce_int(value) {
                Some(n) if n > 0 => Ok(FieldValue::Int(n)),
                Some(_) => Err(self.fail(ViolationKind::OutOfRange, "value must be greater than zero")),
                None => Err(self.fail(ViolationKind::InvalidType, "value is not a valid integer")),
            },
            Constraint::PositiveFloat => match coerce_float(value) {
                Some(n) if n > 0.0 => Ok(FieldValue::Float(n)),
                Some(_) => Err(self.fail(ViolationKind::OutOfRange, "value must be greater than zero")),
                None => Err(self.fail(ViolationKind::InvalidType, "value is not a valid float")),
            },
            Constraint::Date { format, shape } => {
                let Value::String(text) = value else {
                    return Err(self.fail(ViolationKind::InvalidType, "str type expected"));
                };
                if !shape.is_match(text) {
                    return Err(self.fail(ViolationKind::InvalidFormat, "invalid date"));
                }
                NaiveDate::parse_from_str(text, format)
                    .map(FieldValue::Date)
                    .map_err(|_| self.fail(ViolationKind::InvalidFormat, "invalid date"))
            }
        }
    }

    fn fail(&self, kind: ViolationKind, default_message: impl Into<String>) -> Violation {
        let message = match &self.message {
            Some(message) => message.to_string(),
            None => default_message.into(),
        };
        Violation::new(self.field, kind, message)
    }
}

/// Builds the sales rule table for `cfg`, in evaluation order.
pub fn sales_rules(cfg: &ValidateConfig) -> Result<Vec<FieldRule>, ConfigError> {
    cfg.validate()?;

    let pattern = cfg.email_pattern.as_deref().unwrap_or(DEFAULT_EMAIL_PATTERN);
    let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidEmailPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    let date_shape = Regex::new(ORDER_DATE_SHAPE).map_err(|e| ConfigError::InvalidDateShape {
        reason: e.to_string(),
    })?;

    Ok(vec![
        FieldRule::new(
            SalesField::OrderId,
            Constraint::Text {
                min_len: 1,
                max_len: cfg.order_id_max_len,
            },
        ),
        FieldRule::new(SalesField::CustomerEmail, Constraint::Email { regex }),
        FieldRule::new(
            SalesField::ProductName,
            Constraint::Text {
                min_len: 1,
                max_len: cfg.product_name_max_len,
            },
        ),
        FieldRule::new(SalesField::Quantity, Constraint::PositiveInt).with_message(QUANTITY_MESSAGE),
        FieldRule::new(SalesField::UnitPrice, Constraint::PositiveFloat).with_message(PRICE_MESSAGE),
        FieldRule::new(
            SalesField::OrderDate,
            Constraint::Date {
                format: ORDER_DATE_FORMAT,
                shape: date_shape,
            },
        )
        .with_message(DATE_MESSAGE),
    ])
}

// Extractors type-infer numeric-looking cells, so identifiers such as
// `12345` arrive as numbers and are rendered back to text here.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e18)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rule(field: SalesField) -> FieldRule {
        sales_rules(&ValidateConfig::default())
            .expect("default rules compile")
            .into_iter()
            .find(|r| r.field == field)
            .expect("rule present")
    }

    #[test]
    fn table_follows_schema_order() {
        let rules = sales_rules(&ValidateConfig::default()).expect("default rules compile");
        let fields: Vec<SalesField> = rules.iter().map(|r| r.field).collect();
        assert_eq!(fields, SalesField::ALL.to_vec());
    }

    #[test]
    fn missing_and_null_are_both_missing() {
        let order_id = rule(SalesField::OrderId);
        for value in [None, Some(&Value::Null)] {
            let violation = order_id.check(value).expect_err("must fail");
            assert_eq!(violation.kind, ViolationKind::Missing);
            assert_eq!(violation.message, "field required");
        }
    }

    #[test]
    fn text_length_bounds_count_characters() {
        let order_id = rule(SalesField::OrderId);
        assert!(order_id.check(Some(&json!(""))).is_err());
        assert!(order_id.check(Some(&json!("x".repeat(50)))).is_ok());
        let too_long = order_id
            .check(Some(&json!("x".repeat(51))))
            .expect_err("51 chars");
        assert_eq!(too_long.kind, ViolationKind::OutOfRange);

        // 50 multi-byte characters are still 50 characters.
        assert!(order_id.check(Some(&json!("é".repeat(50)))).is_ok());
    }

    #[test]
    fn numeric_identifiers_coerce_to_text() {
        let order_id = rule(SalesField::OrderId);
        assert_eq!(
            order_id.check(Some(&json!(12345))),
            Ok(FieldValue::Text("12345".into()))
        );
        assert!(order_id.check(Some(&json!(true))).is_err());
    }

    #[test]
    fn email_grammar() {
        let email = rule(SalesField::CustomerEmail);
        for ok in [
            "valid@email.com",
            "first.last+tag@sub.example.co",
            "UPPER@Example.COM",
        ] {
            assert!(email.check(Some(&json!(ok))).is_ok(), "{ok} should pass");
        }
        for bad in [
            "invalid_email",
            "email_invalido",
            "no-domain@",
            "@no-local.com",
            "two@@at.com",
            "nodot@localhost",
            ".lead@example.com",
            "trail.@example.com",
            "dou..ble@example.com",
            "space in@example.com",
            "x@-bad.com",
        ] {
            let violation = email.check(Some(&json!(bad))).expect_err(bad);
            assert_eq!(violation.message, "value is not a valid email address");
        }
        let long_local = format!("{}@example.com", "a".repeat(250));
        assert!(email.check(Some(&json!(long_local))).is_err());
    }

    #[test]
    fn quantity_rules() {
        let quantity = rule(SalesField::Quantity);
        assert_eq!(quantity.check(Some(&json!(2))), Ok(FieldValue::Int(2)));
        assert_eq!(quantity.check(Some(&json!(3.0))), Ok(FieldValue::Int(3)));
        assert_eq!(quantity.check(Some(&json!(" 7 "))), Ok(FieldValue::Int(7)));

        for bad in [json!(0), json!(-1), json!(2.5), json!("two"), json!(false)] {
            let violation = quantity.check(Some(&bad)).expect_err("bad quantity");
            assert_eq!(violation.message, QUANTITY_MESSAGE);
        }
    }

    #[test]
    fn price_rules() {
        let price = rule(SalesField::UnitPrice);
        assert_eq!(price.check(Some(&json!(2500.0))), Ok(FieldValue::Float(2500.0)));
        assert_eq!(price.check(Some(&json!(10))), Ok(FieldValue::Float(10.0)));
        assert_eq!(price.check(Some(&json!("19.90"))), Ok(FieldValue::Float(19.9)));

        for bad in [json!(0.0), json!(-5), json!("NaN"), json!("inf"), json!("cheap")] {
            let violation = price.check(Some(&bad)).expect_err("bad price");
            assert_eq!(violation.message, PRICE_MESSAGE);
        }
    }

    #[test]
    fn date_rules() {
        let date = rule(SalesField::OrderDate);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date");
        assert_eq!(
            date.check(Some(&json!("2024-01-15"))),
            Ok(FieldValue::Date(expected))
        );
        // Month and day may drop their leading zero.
        let short = NaiveDate::from_ymd_opt(2024, 1, 5).expect("valid date");
        assert_eq!(date.check(Some(&json!("2024-1-5"))), Ok(FieldValue::Date(short)));

        for bad in [
            json!("15/01/2024"),
            json!("2024-02-30"),
            json!("2024-13-01"),
            json!("yesterday"),
            json!(20240115),
            json!("24-01-15"),
            json!("+2024-01-15"),
            json!(" 2024-01-15"),
            json!("-0001-01-15"),
            json!("2024-01-15 "),
            json!("12024-01-15"),
        ] {
            let violation = date.check(Some(&bad)).expect_err("bad date");
            assert_eq!(violation.message, DATE_MESSAGE);
        }
    }

    #[test]
    fn invalid_email_override_is_a_config_error() {
        let cfg = ValidateConfig {
            email_pattern: Some("([".into()),
            ..Default::default()
        };
        assert!(matches!(
            sales_rules(&cfg),
            Err(ConfigError::InvalidEmailPattern { .. })
        ));
    }
}
