use log::{debug, warn};
use serde_json::Value;

use crate::error::{DocextError, Result};
use crate::llm::prompts::normalize_field_name;
use crate::schema::{ExtractionRow, FieldSpec, TableRow};

/// Strips code fences and chatter around a JSON object in a model answer.
pub fn clean_json_output(raw: &str) -> String {
    if let Some(start) = raw.find('{') {
        if let Some(end) = raw.rfind('}') {
            if end > start {
                return raw[start..=end].to_string();
            }
        }
    }
    raw.trim().to_string()
}

/// Turns the answer to a field extraction request into one row per requested field.
///
/// Rows follow the field order of `fields` and use the normalized names. A field
/// the model left out comes back with an empty value.
pub fn parse_fields_response(
    raw: &str,
    fields: &[FieldSpec],
    document_index: usize,
    confidence: Option<f64>,
) -> Result<Vec<ExtractionRow>> {
    let cleaned = clean_json_output(raw);
    let answer: Value = serde_json::from_str(&cleaned)
        .map_err(|e| DocextError::ResponseParse(format!("fields answer is not JSON: {}", e)))?;
    let object = answer.as_object().ok_or_else(|| {
        DocextError::ResponseParse("fields answer is not a JSON object".to_string())
    })?;

    let rows = fields
        .iter()
        .map(|field| {
            let key = normalize_field_name(&field.name);
            let value = match object.get(&key) {
                None => {
                    debug!("Model answer has no key '{}'", key);
                    String::new()
                }
                Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            ExtractionRow {
                field_name: key,
                value,
                confidence,
                document_index,
            }
        })
        .collect();

    Ok(rows)
}

/// Reads the first markdown pipe table in a model answer.
///
/// Header cells become column names. Only the line right after the header is
/// treated as the alignment row, so a data row of `-` cells is kept. Short rows
/// are padded with empty cells and `''` placeholders become empty strings.
pub fn parse_markdown_table(raw: &str) -> Vec<TableRow> {
    let mut lines = raw
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.starts_with('|'))
        .take_while(|line| line.starts_with('|'));

    let header = match lines.next() {
        Some(line) => split_cells(line),
        None => return Vec::new(),
    };

    let mut lines = lines.peekable();
    if lines
        .peek()
        .is_some_and(|line| is_separator(&split_cells(line)))
    {
        lines.next();
    }

    let mut rows = Vec::new();
    for line in lines {
        let cells = split_cells(line);
        if cells.len() > header.len() {
            warn!(
                "Table row has {} cells but header has {}; extra cells dropped",
                cells.len(),
                header.len()
            );
        }

        let row: TableRow = header
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                (column.clone(), normalize_cell(cell))
            })
            .collect();
        rows.push(row);
    }

    rows
}

fn split_cells(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|').trim_end_matches('|');
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

fn is_separator(cells: &[String]) -> bool {
    cells.iter().all(|c| {
        !c.is_empty() && c.chars().all(|ch| ch == '-' || ch == ':')
    })
}

fn normalize_cell(cell: &str) -> String {
    match cell {
        "''" | "\"\"" => String::new(),
        other => other.to_string(),
    }
}
