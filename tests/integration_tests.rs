use chrono::{TimeZone, Utc};
use docext::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::io::Write;

fn fixed_options(doc_type: &str) -> FormatOptions {
    FormatOptions::new(doc_type)
        .with_submission_id("SUB-123")
        .with_timestamp(Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap())
}

fn sample_rows() -> Vec<ExtractionRow> {
    vec![
        ExtractionRow::new("insured_name", "Acme Corp", 95.0),
        ExtractionRow::new("mailing_address", "123 Main St, NY 10001", 98.0),
        ExtractionRow::new("proposed_eff_date", "01/01/2025", 100.0),
        ExtractionRow::new("business_phone", "(555) 123-4567", 65.0),
    ]
}

fn sample_premises_table() -> Vec<TableRow> {
    let mut premise = TableRow::new();
    premise.insert("premise_address".to_string(), "123 Main St".to_string());
    premise.insert("premise_type".to_string(), "Main Office".to_string());
    premise.insert("premise_building_number".to_string(), "Bldg 1".to_string());
    premise.insert("premise_description".to_string(), "HQ".to_string());
    vec![premise]
}

#[test]
fn test_end_to_end_example() {
    let rows = vec![
        ExtractionRow::new("insured_name", "Acme Corp", 95.0),
        ExtractionRow::new("business_phone", "", 65.0),
    ];

    let nested = format_nested(&rows, &[], &fixed_options("accord"));

    assert_eq!(nested["fields"]["insured_name"]["confidence"], 95);
    assert_eq!(
        nested["quality_metrics"]["missing_fields"],
        json!(["business_phone"])
    );
    assert_eq!(
        nested["quality_metrics"]["low_confidence_fields"],
        json!(["business_phone"])
    );
    assert_eq!(nested["quality_metrics"]["average_confidence"], 80.0);
    assert_eq!(nested["quality_metrics"]["requires_review"], true);
}

#[test]
fn test_every_field_lands_exactly_once() {
    let rows = sample_rows();
    let tables = sample_premises_table();

    let nested = format_nested(&rows, &tables, &fixed_options("accord"));
    assert_eq!(nested["fields"].as_object().unwrap().len(), rows.len());

    let flat = format_flat(&rows, &tables, &fixed_options("accord"));
    for row in &rows {
        assert_eq!(flat[row.field_name.as_str()], row.value.as_str());
        assert!(flat
            .get(format!("{}_confidence", row.field_name))
            .is_some());
    }
    assert_eq!(flat["average_confidence"], 89.5);
    assert_eq!(flat["tables"][0]["premise_type"], "Main Office");

    let categorized = format_categorized(&rows, &tables, &fixed_options("accord"));
    for row in &rows {
        let hits = ["policy_info", "insured_party", "business_info", "metadata"]
            .iter()
            .filter(|bucket| categorized[**bucket].get(&row.field_name).is_some())
            .count();
        assert_eq!(hits, 1, "{} appears in {} buckets", row.field_name, hits);
    }
    assert_eq!(categorized["premises"][0]["premise_address"], "123 Main St");
}

fn bucket_sets(result: &Value) -> Vec<BTreeSet<String>> {
    ["policy_info", "insured_party", "business_info", "metadata"]
        .iter()
        .map(|bucket| {
            result[*bucket]
                .as_object()
                .unwrap()
                .keys()
                .cloned()
                .collect()
        })
        .collect()
}

#[test]
fn test_categorization_is_order_independent() {
    let mut rows = sample_rows();
    rows.push(ExtractionRow::new("primary_business_operations", "Bakery", 80.0));
    rows.push(ExtractionRow::new("fein", "12-3456789", 80.0));

    let forward = format_categorized(&rows, &[], &fixed_options("accord"));
    rows.reverse();
    let backward = format_categorized(&rows, &[], &fixed_options("accord"));

    assert_eq!(bucket_sets(&forward), bucket_sets(&backward));
}

#[test]
fn test_premises_json_variants() {
    let cases = [
        ("[]", json!([]), false),
        ("not json", json!([]), true),
        ("{\"a\":1}", json!([]), false),
        (
            "[{\"premise_street\": \"1 Elm St\"}]",
            json!([{"premise_street": "1 Elm St"}]),
            false,
        ),
    ];

    for (raw, expected, has_error) in cases {
        let rows = vec![ExtractionRow::new(PREMISES_JSON_FIELD, raw, 90.0)];
        let result = format_categorized(&rows, &[], &FormatOptions::insurance());

        assert_eq!(result["premises"], expected, "premises for {:?}", raw);
        assert_eq!(
            result["metadata"].get("premises_parse_error").is_some(),
            has_error,
            "parse error for {:?}",
            raw
        );
        if has_error {
            assert_eq!(result["metadata"]["premises_parse_error"]["value"], raw);
        }
    }
}

#[test]
fn test_rows_from_engine_records() -> anyhow::Result<()> {
    let records = r#"[
        {"fields": "insured_name", "answer": "Acme Corp", "confidence": 95, "document_index": 0},
        {"fields": "dba_names", "answer": "", "confidence": "n/a", "document_index": 0}
    ]"#;
    let rows: Vec<ExtractionRow> = serde_json::from_str(records)?;

    let nested = format_nested(&rows, &[], &FormatOptions::default());
    assert_eq!(nested["quality_metrics"]["average_confidence"], 95.0);
    assert_eq!(nested["quality_metrics"]["missing_fields"], json!(["dba_names"]));
    assert_eq!(nested["quality_metrics"]["low_confidence_fields"], json!([]));
    assert_eq!(nested["fields"]["dba_names"]["confidence"], Value::Null);
    Ok(())
}

#[test]
fn test_prompt_to_formatted_result() -> anyhow::Result<()> {
    let mut page = tempfile::Builder::new().suffix(".jpg").tempfile()?;
    page.write_all(&[0xff, 0xd8, 0xff, 0xe0])?;

    let registry = TemplateRegistry::builtin();
    let assembler = PromptAssembler::new(&registry);
    let request = assembler.fields_request("passport", &[page.path()])?;

    let template = registry.latest("passport")?;
    let expected_keys: Vec<String> = template
        .fields
        .iter()
        .map(|f| normalize_field_name(&f.name))
        .collect();

    let texts = request.text_parts();
    let instruction = texts.last().unwrap();
    let start = instruction.find('{').unwrap();
    let end = instruction.rfind('}').unwrap();
    let format: serde_json::Map<String, Value> =
        serde_json::from_str(&instruction[start..=end])?;
    assert_eq!(format.keys().cloned().collect::<Vec<_>>(), expected_keys);

    let payload = request.to_json()?;
    let url = payload["messages"][0]["content"][2]["image_url"]["url"]
        .as_str()
        .unwrap();
    assert_eq!(url, "data:image/jpeg;base64,/9j/4A==");

    let answer = r#"{"full_name": "Jane Roe", "date_of_birth": "1990-04-01", "passport_number": "X1234567"}"#;
    let rows = parse_fields_response(answer, &template.fields, 0, Some(92.0))?;
    assert_eq!(rows.len(), template.fields.len());

    let nested = format_nested(&rows, &[], &fixed_options("passport"));
    assert_eq!(nested["fields"]["full_name"]["value"], "Jane Roe");
    let missing = nested["quality_metrics"]["missing_fields"].as_array().unwrap();
    assert_eq!(missing.len(), template.fields.len() - 3);
    assert_eq!(nested["quality_metrics"]["requires_review"], true);
    Ok(())
}

#[test]
fn test_missing_image_surfaces_error() {
    let registry = TemplateRegistry::builtin();
    let assembler = PromptAssembler::new(&registry);

    let result = assembler.fields_request("invoice", &["/no/such/page.png"]);
    assert!(matches!(result, Err(DocextError::ImageRead { .. })));
}

#[test]
fn test_table_answer_feeds_legacy_premises() {
    let registry = TemplateRegistry::builtin();
    let legacy = registry.get("accord", 1).unwrap();

    let answer = "| premise_address | premise_type | premise_building_number | premise_description |\n\
                  |:--|:--|:--|:--|\n\
                  | 123 Main St | Main Office | Bldg 1 | HQ |\n\
                  | 9 Dock Rd | '' | '' | Storage |";
    let tables = parse_markdown_table(answer);
    assert_eq!(tables.len(), 2);

    let rows = vec![ExtractionRow::new("insured_name", "Acme Corp", 95.0)];
    let result = format_categorized_with(&rows, &tables, &FormatOptions::insurance(), legacy);

    assert_eq!(result["premises"].as_array().unwrap().len(), 2);
    assert_eq!(result["premises"][1]["premise_type"], "");
    assert_eq!(result["insured_party"]["insured_name"]["value"], "Acme Corp");
}

#[test]
fn test_registry_round_trip_through_file() -> anyhow::Result<()> {
    let registry = TemplateRegistry::builtin();
    let templates: Vec<&DocumentTemplate> = registry.iter().collect();

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(serde_json::to_string(&templates)?.as_bytes())?;

    let loaded = TemplateRegistry::from_path(file.path())?;
    assert_eq!(loaded.len(), registry.len());
    assert_eq!(loaded.latest("accord")?, registry.latest("accord")?);
    Ok(())
}

#[test]
fn test_average_confidence_ties_round_to_even() {
    let mut rows: Vec<ExtractionRow> = (0..7)
        .map(|i| ExtractionRow::new(format!("field_{}", i), "x", 70.0))
        .collect();
    rows.push(ExtractionRow::new("field_7", "x", 71.0));

    let nested = format_nested(&rows, &[], &fixed_options("invoice"));
    assert_eq!(nested["quality_metrics"]["average_confidence"], 70.12);

    let flat = format_flat(&rows, &[], &fixed_options("invoice"));
    assert_eq!(flat["average_confidence"], 70.12);
}
