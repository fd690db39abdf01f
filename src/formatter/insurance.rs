use log::{debug, info, warn};
use serde_json::{json, Map, Value};

use super::{field_record, table_rows_value, FormatOptions, PREMISES_JSON_FIELD};
use crate::schema::{Category, ExtractionRow, TableRow};
use crate::templates::DocumentTemplate;

const POLICY_MARKERS: [&str; 2] = ["eff_date", "exp_date"];
const INSURED_PARTY_MARKERS: [&str; 4] = ["insured_name", "dba_names", "mailing_", "phone"];
const BUSINESS_MARKERS: [&str; 2] = ["business", "operations"];

/// Infers the insurance bucket of a field from substrings of its name.
///
/// Rules are tried in order and the first hit wins, so `business_phone` is
/// insured-party data, not business info.
pub fn categorize_field_name(field_name: &str) -> Category {
    let contains_any = |markers: &[&str]| markers.iter().any(|m| field_name.contains(m));

    if contains_any(&POLICY_MARKERS) {
        Category::PolicyInfo
    } else if contains_any(&INSURED_PARTY_MARKERS) {
        Category::InsuredParty
    } else if contains_any(&BUSINESS_MARKERS) {
        Category::BusinessInfo
    } else {
        Category::Metadata
    }
}

/// Insurance clearance layout using name-based categorization only.
pub fn format_categorized(
    rows: &[ExtractionRow],
    tables: &[TableRow],
    options: &FormatOptions,
) -> Value {
    build(rows, tables, options, None)
}

/// Insurance clearance layout where categories declared on the template's
/// fields take precedence over name-based categorization.
pub fn format_categorized_with(
    rows: &[ExtractionRow],
    tables: &[TableRow],
    options: &FormatOptions,
    template: &DocumentTemplate,
) -> Value {
    build(rows, tables, options, Some(template))
}

enum Premises {
    Parsed(Vec<Value>),
    NotAnArray,
    Malformed,
}

fn parse_premises(raw: &str) -> Premises {
    if raw.trim().is_empty() {
        return Premises::Parsed(Vec::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => Premises::Parsed(items),
        Ok(_) => Premises::NotAnArray,
        Err(_) => Premises::Malformed,
    }
}

fn build(
    rows: &[ExtractionRow],
    tables: &[TableRow],
    options: &FormatOptions,
    template: Option<&DocumentTemplate>,
) -> Value {
    let mut buckets: Vec<(Category, Map<String, Value>)> =
        Category::ALL.iter().map(|c| (*c, Map::new())).collect();
    let mut premises: Vec<Value> = Vec::new();
    let mut parse_error: Option<Value> = None;

    for row in rows {
        if row.field_name == PREMISES_JSON_FIELD {
            premises = match parse_premises(&row.value) {
                Premises::Parsed(items) => items,
                Premises::NotAnArray => {
                    debug!("premises_json is valid JSON but not an array; ignoring");
                    Vec::new()
                }
                Premises::Malformed => {
                    warn!("premises_json could not be parsed; recording parse error");
                    parse_error = Some(field_record(row));
                    Vec::new()
                }
            };
            continue;
        }

        let category = template
            .and_then(|t| t.declared_category(&row.field_name))
            .unwrap_or_else(|| categorize_field_name(&row.field_name));

        if let Some((_, bucket)) = buckets.iter_mut().find(|(c, _)| *c == category) {
            bucket.insert(row.field_name.clone(), field_record(row));
        }
    }

    if premises.is_empty() && !tables.is_empty() {
        debug!("Populating premises from {} legacy table rows", tables.len());
        if let Value::Array(items) = table_rows_value(tables) {
            premises = items;
        }
    }

    let mut take = |category: Category| -> Map<String, Value> {
        buckets
            .iter_mut()
            .find(|(c, _)| *c == category)
            .map(|(_, bucket)| std::mem::take(bucket))
            .unwrap_or_default()
    };

    let policy_info = take(Category::PolicyInfo);
    let insured_party = take(Category::InsuredParty);
    let business_info = take(Category::BusinessInfo);
    let mut metadata = take(Category::Metadata);
    if let Some(error) = parse_error {
        metadata.insert("premises_parse_error".to_string(), error);
    }

    info!(
        "Formatted insurance result for '{}': {} policy, {} insured party, {} business, {} premises, {} metadata",
        options.doc_type,
        policy_info.len(),
        insured_party.len(),
        business_info.len(),
        premises.len(),
        metadata.len()
    );

    let mut result = Map::new();
    result.insert("submission_id".to_string(), options.submission_id_value());
    result.insert("document_type".to_string(), json!(options.doc_type));
    result.insert("extracted_at".to_string(), json!(options.timestamp_string()));
    result.insert(
        Category::PolicyInfo.bucket_key().to_string(),
        Value::Object(policy_info),
    );
    result.insert(
        Category::InsuredParty.bucket_key().to_string(),
        Value::Object(insured_party),
    );
    result.insert("premises".to_string(), Value::Array(premises));
    result.insert(
        Category::BusinessInfo.bucket_key().to_string(),
        Value::Object(business_info),
    );
    result.insert(
        Category::Metadata.bucket_key().to_string(),
        Value::Object(metadata),
    );
    Value::Object(result)
}
