use docext::*;
use std::error::Error;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let rows = vec![
        ExtractionRow::new("insured_name", "Acme Corp", 95.0),
        ExtractionRow::new("mailing_address", "123 Main St, NY 10001", 98.0),
        ExtractionRow::new("proposed_eff_date", "01/01/2025", 100.0),
        ExtractionRow::new("business_phone", "(555) 123-4567", 65.0),
    ];

    let mut premise = TableRow::new();
    premise.insert("premise_address".to_string(), "123 Main St".to_string());
    premise.insert("premise_type".to_string(), "Main Office".to_string());
    premise.insert("premise_building_number".to_string(), "Bldg 1".to_string());
    premise.insert("premise_description".to_string(), "HQ".to_string());
    let tables = vec![premise];

    let options = FormatOptions::insurance().with_submission_id("SUB-123");

    println!("Nested JSON:");
    println!("{}", serde_json::to_string_pretty(&format_nested(&rows, &tables, &options))?);

    println!("\n{}\n", "=".repeat(50));

    println!("Flat JSON:");
    println!("{}", serde_json::to_string_pretty(&format_flat(&rows, &tables, &options))?);

    println!("\n{}\n", "=".repeat(50));

    println!("Insurance System JSON:");
    println!(
        "{}",
        serde_json::to_string_pretty(&format_categorized(&rows, &tables, &options))?
    );

    println!("\n{}\n", "=".repeat(50));

    let registry = TemplateRegistry::builtin();
    let accord = registry.latest("accord")?;
    println!("Field prompt for {} v{}:", accord.doc_type, accord.version);
    println!("{}", llm::prompts::fields_intro(&accord.fields));
    println!("{}", llm::prompts::fields_output_instruction(&accord.fields));

    Ok(())
}
