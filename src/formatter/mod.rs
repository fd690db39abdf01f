//! Projections of extraction rows into the JSON shapes downstream systems consume.
//!
//! - [`format_nested`]: fields keyed by name with quality metrics, for review tooling
//! - [`format_flat`]: one level of `name` / `name_confidence` keys, for storage
//! - [`format_categorized`]: insurance clearance buckets with parsed premises
//!
//! Every projection rebuilds its output from the rows it is given. Nothing is
//! shared between the three shapes.

pub mod flat;
pub mod insurance;
pub mod nested;

pub use flat::format_flat;
pub use insurance::{categorize_field_name, format_categorized, format_categorized_with};
pub use nested::format_nested;

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::schema::{ExtractionRow, TableRow};

/// Field holding a JSON-encoded array of premises instead of a scalar.
pub const PREMISES_JSON_FIELD: &str = "premises_json";

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    pub doc_type: String,
    pub submission_id: Option<String>,
    /// Extra entries merged into `extraction_metadata` of the nested shape.
    pub metadata: Map<String, Value>,
    /// Numeric confidences strictly below this flag a field for review.
    pub confidence_threshold: f64,
    /// Fixed instant for the output timestamp. `None` means now.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            doc_type: "unknown".to_string(),
            submission_id: None,
            metadata: Map::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            timestamp: None,
        }
    }
}

impl FormatOptions {
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            ..Self::default()
        }
    }

    /// Defaults used by insurance clearance submissions.
    pub fn insurance() -> Self {
        Self::new("accord")
    }

    #[must_use]
    pub fn with_submission_id(mut self, submission_id: impl Into<String>) -> Self {
        self.submission_id = Some(submission_id.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub(crate) fn timestamp_string(&self) -> String {
        let ts = self.timestamp.unwrap_or_else(Utc::now);
        ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }

    pub(crate) fn submission_id_value(&self) -> Value {
        self.submission_id
            .as_ref()
            .map(|s| Value::String(s.clone()))
            .unwrap_or(Value::Null)
    }
}

/// Integral confidences serialize as integers so `95` stays `95`.
pub(crate) fn confidence_value(confidence: Option<f64>) -> Value {
    match confidence {
        Some(c) if c.is_finite() && c.fract() == 0.0 && c.abs() < 1e15 => {
            Value::Number(Number::from(c as i64))
        }
        Some(c) => Number::from_f64(c).map(Value::Number).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

/// `{value, confidence}` record used by the nested and categorized shapes.
pub(crate) fn field_record(row: &ExtractionRow) -> Value {
    let mut record = Map::new();
    record.insert("value".to_string(), Value::String(row.value.clone()));
    record.insert("confidence".to_string(), confidence_value(row.confidence));
    Value::Object(record)
}

/// Mean of all numeric confidences, rounded to two decimals.
pub fn average_confidence(rows: &[ExtractionRow]) -> Option<f64> {
    let confidences: Vec<f64> = rows.iter().filter_map(|r| r.confidence).collect();
    if confidences.is_empty() {
        return None;
    }
    let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
    Some(round2(mean))
}

/// Rounds to two decimals, exact ties going to the even digit (70.125 -> 70.12).
pub(crate) fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

pub(crate) fn float_value(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub(crate) fn table_rows_value(tables: &[TableRow]) -> Value {
    Value::Array(
        tables
            .iter()
            .map(|row| {
                Value::Object(
                    row.iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                )
            })
            .collect(),
    )
}
