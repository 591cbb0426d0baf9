//! Parameter Validation
//!
//! Validates and type-coerces a caller-supplied parameter map against a
//! query's declared schema, producing the bind map handed to the renderer
//! and executor.
//!
//! # Rules
//! Definitions are processed in schema order; the first offending one wins
//! and no partial bind map escapes. For each definition:
//! - Absent from the input: required fails with `MISSING_PARAMETER`; a
//!   declared default is coerced and bound; otherwise the name binds to
//!   null. The null binding is what makes the
//!   `(:x IS NULL OR col = :x)` pattern work when an optional filter is
//!   omitted.
//! - Present: coerced per declared type, then checked against
//!   `allowed_values` if declared.
//!
//! Caller-supplied keys with no matching definition are dropped, never
//! bound. An explicit JSON `null` is not a valid value for any type.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{DocketError, Result};
use crate::registry::{ParamType, ParameterDefinition};

/// A type-coerced value ready to bind
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl BindValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// JSON rendering of the bound value (dates as ISO strings)
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(i) => Value::Number((*i).into()),
            Self::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number)
            }
            Self::Text(s) => Value::String(s.clone()),
            Self::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Self::Timestamp(t) => Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }
}

/// Validated, coerced parameters keyed by bind variable name
pub type BindMap = HashMap<String, BindValue>;

/// Validate and coerce `provided` against `definitions`
pub fn validate(
    definitions: &[ParameterDefinition],
    provided: &serde_json::Map<String, Value>,
) -> Result<BindMap> {
    let mut bound = BindMap::with_capacity(definitions.len());

    for defn in definitions {
        let value = match provided.get(&defn.name) {
            None => {
                if defn.required {
                    return Err(DocketError::missing_parameter(&defn.name));
                }
                match &defn.default {
                    Some(default) => coerce(&defn.name, default, defn.param_type)?,
                    None => BindValue::Null,
                }
            }
            Some(raw) => {
                let value = coerce(&defn.name, raw, defn.param_type)?;
                if let Some(allowed) = &defn.allowed_values {
                    if !allowed.iter().any(|a| value_matches(&value, a)) {
                        let allowed_json =
                            serde_json::to_string(allowed).unwrap_or_else(|_| "[]".to_string());
                        let got = serde_json::to_string(&value.to_json())
                            .unwrap_or_else(|_| "null".to_string());
                        return Err(DocketError::disallowed_value(&defn.name, allowed_json, got));
                    }
                }
                value
            }
        };

        bound.insert(defn.name.clone(), value);
    }

    Ok(bound)
}

/// Coerce one value against its declared type
fn coerce(name: &str, value: &Value, param_type: ParamType) -> Result<BindValue> {
    match param_type {
        ParamType::Number => coerce_number(name, value),
        ParamType::Date => coerce_date(name, value),
        ParamType::Timestamp => coerce_timestamp(name, value),
        ParamType::Varchar2 => match value {
            Value::String(s) => Ok(BindValue::Text(s.clone())),
            other => {
                Err(DocketError::type_mismatch(name, "VARCHAR2", json_type_name(other)))
            }
        },
    }
}

fn coerce_number(name: &str, value: &Value) -> Result<BindValue> {
    match value {
        // Booleans are never numeric
        Value::Bool(_) => Err(DocketError::type_mismatch(name, "NUMBER", "bool")),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(BindValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(BindValue::Float(f))
            } else {
                Err(DocketError::type_mismatch(name, "NUMBER", format!("number {n}")))
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let parsed = if trimmed.contains('.') {
                trimmed.parse::<f64>().ok().map(BindValue::Float)
            } else {
                trimmed.parse::<i64>().ok().map(BindValue::Integer)
            };
            parsed.ok_or_else(|| {
                DocketError::type_mismatch(name, "NUMBER", format!("string \"{s}\""))
            })
        }
        other => Err(DocketError::type_mismatch(name, "NUMBER", json_type_name(other))),
    }
}

fn coerce_date(name: &str, value: &Value) -> Result<BindValue> {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(BindValue::Date).map_err(
            |_| {
                DocketError::type_mismatch(
                    name,
                    "an ISO date string (YYYY-MM-DD)",
                    format!("string \"{s}\""),
                )
            },
        ),
        other => Err(DocketError::type_mismatch(name, "DATE", json_type_name(other))),
    }
}

fn coerce_timestamp(name: &str, value: &Value) -> Result<BindValue> {
    match value {
        Value::String(s) => parse_timestamp(s).map(BindValue::Timestamp).ok_or_else(|| {
            DocketError::type_mismatch(name, "an ISO datetime string", format!("string \"{s}\""))
        }),
        other => Err(DocketError::type_mismatch(name, "TIMESTAMP", json_type_name(other))),
    }
}

/// Parse an ISO datetime string
///
/// Accepts `T` or space separators and optional fractional seconds; an
/// offset-carrying string is converted to naive UTC. Date-only strings are
/// rejected: a TIMESTAMP parameter needs a time of day.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    chrono::DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()).ok()
}

/// Membership test against one declared allowed value
///
/// Numbers compare numerically (an integer 1 matches an allowed 1.0), dates
/// and timestamps compare against their ISO string form.
fn value_matches(bound: &BindValue, allowed: &Value) -> bool {
    match (bound, allowed) {
        (BindValue::Integer(i), Value::Number(n)) => {
            n.as_i64() == Some(*i) || n.as_f64() == Some(*i as f64)
        }
        (BindValue::Float(f), Value::Number(n)) => n.as_f64() == Some(*f),
        (BindValue::Text(s), Value::String(a)) => s == a,
        (BindValue::Date(_) | BindValue::Timestamp(_), Value::String(a)) => {
            bound.to_json().as_str() == Some(a.as_str())
        }
        _ => false,
    }
}

/// JSON type name for error messages
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
