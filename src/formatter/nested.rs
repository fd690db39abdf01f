use log::{debug, info};
use serde_json::{json, Map, Value};

use super::{average_confidence, field_record, float_value, table_rows_value, FormatOptions};
use crate::schema::{ExtractionRow, TableRow};

/// Fields keyed by name with quality metrics and review flags.
///
/// A field is low confidence when its numeric confidence is below the threshold,
/// and missing when its value is empty whatever its confidence. Either flags the
/// document for review.
pub fn format_nested(rows: &[ExtractionRow], tables: &[TableRow], options: &FormatOptions) -> Value {
    let mut extraction_metadata = Map::new();
    extraction_metadata.insert("timestamp".to_string(), json!(options.timestamp_string()));
    extraction_metadata.insert("fields_count".to_string(), json!(rows.len()));
    extraction_metadata.insert("tables_count".to_string(), json!(tables.len()));
    for (key, value) in &options.metadata {
        extraction_metadata.insert(key.clone(), value.clone());
    }

    let mut fields = Map::new();
    let mut quality_metrics = Map::new();

    if !rows.is_empty() {
        let mut low_confidence_fields = Vec::new();
        let mut missing_fields = Vec::new();

        for row in rows {
            fields.insert(row.field_name.clone(), field_record(row));

            if let Some(confidence) = row.confidence {
                if confidence < options.confidence_threshold {
                    debug!(
                        "Field '{}' below confidence threshold ({} < {})",
                        row.field_name, confidence, options.confidence_threshold
                    );
                    low_confidence_fields.push(row.field_name.clone());
                }
            }
            if row.is_missing() {
                missing_fields.push(row.field_name.clone());
            }
        }

        let requires_review = !low_confidence_fields.is_empty() || !missing_fields.is_empty();
        let average = average_confidence(rows).unwrap_or(0.0);

        quality_metrics.insert("average_confidence".to_string(), float_value(average));
        quality_metrics.insert(
            "low_confidence_fields".to_string(),
            json!(low_confidence_fields),
        );
        quality_metrics.insert("missing_fields".to_string(), json!(missing_fields));
        quality_metrics.insert("requires_review".to_string(), json!(requires_review));
    }

    let mut table_section = Map::new();
    if !tables.is_empty() {
        table_section.insert("data".to_string(), table_rows_value(tables));
        extraction_metadata.insert("table_rows".to_string(), json!(tables.len()));
    }

    info!(
        "Formatted nested result for '{}': {} fields, {} table rows",
        options.doc_type,
        fields.len(),
        tables.len()
    );

    let mut result = Map::new();
    result.insert("submission_id".to_string(), options.submission_id_value());
    result.insert("document_type".to_string(), json!(options.doc_type));
    result.insert(
        "extraction_metadata".to_string(),
        Value::Object(extraction_metadata),
    );
    result.insert("fields".to_string(), Value::Object(fields));
    result.insert("tables".to_string(), Value::Object(table_section));
    result.insert("quality_metrics".to_string(), Value::Object(quality_metrics));
    Value::Object(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn options() -> FormatOptions {
        FormatOptions::new("accord")
            .with_submission_id("SUB-123")
            .with_timestamp(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_quality_metrics() {
        let rows = vec![
            ExtractionRow::new("insured_name", "Acme Corp", 95.0),
            ExtractionRow::new("business_phone", "", 65.0),
        ];

        let result = format_nested(&rows, &[], &options());

        assert_eq!(result["submission_id"], "SUB-123");
        assert_eq!(result["document_type"], "accord");
        assert_eq!(result["fields"]["insured_name"]["value"], "Acme Corp");
        assert_eq!(result["fields"]["insured_name"]["confidence"], 95);

        let metrics = &result["quality_metrics"];
        assert_eq!(metrics["average_confidence"], 80.0);
        assert_eq!(metrics["missing_fields"], json!(["business_phone"]));
        assert_eq!(metrics["low_confidence_fields"], json!(["business_phone"]));
        assert_eq!(metrics["requires_review"], true);
    }

    #[test]
    fn test_missing_field_regardless_of_confidence() {
        let rows = vec![ExtractionRow::new("x", "", 100.0)];
        let result = format_nested(&rows, &[], &options());
        assert_eq!(result["quality_metrics"]["missing_fields"], json!(["x"]));
        assert_eq!(result["quality_metrics"]["low_confidence_fields"], json!([]));
        assert_eq!(result["quality_metrics"]["requires_review"], true);
    }

    #[test]
    fn test_clean_result_does_not_need_review() {
        let rows = vec![
            ExtractionRow::new("a", "1", 70.0),
            ExtractionRow::new("b", "2", 99.0),
        ];
        let result = format_nested(&rows, &[], &options());
        assert_eq!(result["quality_metrics"]["requires_review"], false);
        assert_eq!(result["quality_metrics"]["average_confidence"], 84.5);
    }

    #[test]
    fn test_custom_threshold_flags_low_confidence_only() {
        let rows = vec![
            ExtractionRow::new("a", "x", 80.0),
            ExtractionRow::new("b", "y", 90.0),
            ExtractionRow::new("c", "z", 95.0),
        ];
        let result = format_nested(&rows, &[], &options().with_confidence_threshold(90.0));

        let metrics = &result["quality_metrics"];
        assert_eq!(metrics["low_confidence_fields"], json!(["a"]));
        assert_eq!(metrics["missing_fields"], json!([]));
        assert_eq!(metrics["requires_review"], true);

        let relaxed = format_nested(&rows, &[], &options().with_confidence_threshold(80.0));
        assert_eq!(relaxed["quality_metrics"]["low_confidence_fields"], json!([]));
        assert_eq!(relaxed["quality_metrics"]["requires_review"], false);
    }

    #[test]
    fn test_non_numeric_confidence() {
        let mut row = ExtractionRow::new("a", "1", 0.0);
        row.confidence = None;

        let result = format_nested(&[row], &[], &options());
        assert_eq!(result["fields"]["a"]["confidence"], Value::Null);
        assert_eq!(result["quality_metrics"]["average_confidence"], 0.0);
        assert_eq!(result["quality_metrics"]["requires_review"], false);
    }

    #[test]
    fn test_tables_and_metadata() {
        let mut table_row = TableRow::new();
        table_row.insert("Quantity".to_string(), "2".to_string());
        table_row.insert("tax".to_string(), "0.40".to_string());

        let options = options().with_metadata("source", "email");
        let result = format_nested(
            &[ExtractionRow::new("invoice_number", "INV-1", 90.0)],
            &[table_row.clone(), table_row],
            &options,
        );

        let metadata = &result["extraction_metadata"];
        assert_eq!(metadata["timestamp"], "2025-03-01T12:00:00.000000Z");
        assert_eq!(metadata["fields_count"], 1);
        assert_eq!(metadata["tables_count"], 2);
        assert_eq!(metadata["table_rows"], 2);
        assert_eq!(metadata["source"], "email");

        assert_eq!(result["tables"]["data"][1]["tax"], "0.40");
    }

    #[test]
    fn test_empty_input_is_well_formed() {
        let result = format_nested(&[], &[], &FormatOptions::default());
        assert_eq!(result["submission_id"], Value::Null);
        assert_eq!(result["document_type"], "unknown");
        assert_eq!(result["fields"], json!({}));
        assert_eq!(result["tables"], json!({}));
        assert_eq!(result["quality_metrics"], json!({}));
        assert_eq!(result["extraction_metadata"]["fields_count"], 0);
        assert!(result["extraction_metadata"].get("table_rows").is_none());
    }
}
