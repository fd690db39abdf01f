use log::info;
use serde_json::{json, Map, Value};

use super::{average_confidence, confidence_value, float_value, table_rows_value, FormatOptions};
use crate::schema::{ExtractionRow, TableRow};

/// Single-level object with `name` and `name_confidence` keys per field.
///
/// Keys are not namespaced. Callers must keep field names clear of the
/// envelope keys (`submission_id`, `document_type`, `extraction_timestamp`,
/// `average_confidence`, `tables`); on a collision the later write wins.
pub fn format_flat(rows: &[ExtractionRow], tables: &[TableRow], options: &FormatOptions) -> Value {
    let mut result = Map::new();
    result.insert("submission_id".to_string(), options.submission_id_value());
    result.insert("document_type".to_string(), json!(options.doc_type));
    result.insert(
        "extraction_timestamp".to_string(),
        json!(options.timestamp_string()),
    );

    for row in rows {
        result.insert(row.field_name.clone(), Value::String(row.value.clone()));
        result.insert(
            format!("{}_confidence", row.field_name),
            confidence_value(row.confidence),
        );
    }

    if let Some(average) = average_confidence(rows) {
        result.insert("average_confidence".to_string(), float_value(average));
    }

    if !tables.is_empty() {
        result.insert("tables".to_string(), table_rows_value(tables));
    }

    info!(
        "Formatted flat result for '{}': {} keys",
        options.doc_type,
        result.len()
    );
    Value::Object(result)
}
