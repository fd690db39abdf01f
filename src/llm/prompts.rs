// Instruction text for the two extraction intents (scalar fields, single table).

use serde_json::{Map, Value};

use crate::schema::FieldSpec;

pub const DOCUMENTS_HEADER: &str = "Documents:\n";

pub const PLACEHOLDER_VALUE: &str = "...";

pub const PLACEHOLDER_CELL: &str = "..";

const HEADER_MIN_PADDING: usize = 2;

/// Output key for a field: lowercase, spaces replaced by underscores.
pub fn normalize_field_name(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

/// One `name: description` line per field, names normalized, descriptions verbatim.
pub fn name_description_lines(fields: &[FieldSpec]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", normalize_field_name(&f.name), f.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn fields_intro(fields: &[FieldSpec]) -> String {
    format!(
        "Extract the following fields from the documents:\n {}.",
        name_description_lines(fields)
    )
}

pub fn columns_intro(columns: &[FieldSpec]) -> String {
    format!(
        "Extract the following columns from the documents:\n {}.",
        name_description_lines(columns)
    )
}

/// Example answer object: every normalized field name mapped to a placeholder, in input order.
pub fn fields_output_format(fields: &[FieldSpec]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| {
            (
                normalize_field_name(&f.name),
                Value::String(PLACEHOLDER_VALUE.to_string()),
            )
        })
        .collect()
}

pub fn fields_output_instruction(fields: &[FieldSpec]) -> String {
    format!(
        "Return a JSON with the following format:\n {}. If a field is not found, return '' for that field. Do not give any explanation.",
        Value::Object(fields_output_format(fields))
    )
}

/// Example answer table: header of column names, alignment row, one placeholder row.
///
/// Each column is padded to its header width plus two, the layout pandas'
/// `to_markdown` produces.
pub fn tables_output_format(columns: &[FieldSpec]) -> String {
    let widths: Vec<usize> = columns
        .iter()
        .map(|c| (c.name.chars().count() + HEADER_MIN_PADDING).max(PLACEHOLDER_CELL.len()))
        .collect();

    let row = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!(" {:<width$} ", cell, width = width))
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let header = row(columns.iter().map(|c| c.name.as_str()).collect());
    let separator = format!(
        "|{}|",
        widths
            .iter()
            .map(|w| format!(":{}", "-".repeat(w + 1)))
            .collect::<Vec<_>>()
            .join("|")
    );
    let placeholder = row(vec![PLACEHOLDER_CELL; columns.len()]);

    format!("{}\n{}\n{}", header, separator, placeholder)
}

pub fn tables_output_instruction(columns: &[FieldSpec]) -> String {
    format!(
        "Return ONLY ONE table in markdown format with exactly these columns:\n {}.\n\n\
         IMPORTANT:\n\
         - Return ONLY the requested table, not all tables in the document\n\
         - Use exactly {} columns as specified\n\
         - If a cell is not found, return '' for that column\n\
         - If the table does not exist in the document, return an empty table with just the header row\n\
         - Do not include any other tables, explanations, or text",
        tables_output_format(columns),
        columns.len()
    )
}
