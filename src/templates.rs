//! Versioned document templates.
//!
//! A [`DocumentTemplate`] lists the scalar fields and table columns to extract
//! for one document type. Templates live in a [`TemplateRegistry`] that callers
//! build (or load from JSON) and hand to the prompt assembler, so several
//! template sets can coexist in one process.

use crate::error::{DocextError, Result};
use crate::schema::{Category, FieldSpec};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DocumentTemplate {
    #[schemars(description = "Document type key, e.g. 'invoice', 'passport', 'accord'")]
    pub doc_type: String,

    #[schemars(description = "Template revision. Higher versions supersede lower ones.")]
    pub version: u32,

    #[serde(default)]
    #[schemars(description = "Human readable name shown in pickers")]
    pub label: String,

    #[serde(default)]
    #[schemars(description = "Scalar fields to extract, in output order")]
    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    #[schemars(description = "Columns of the single table to extract. Empty when the document has no table.")]
    pub table_columns: Vec<FieldSpec>,
}

impl DocumentTemplate {
    pub fn new(doc_type: impl Into<String>, version: u32) -> Self {
        let doc_type = doc_type.into();
        Self {
            label: doc_type.clone(),
            doc_type,
            version,
            fields: Vec::new(),
            table_columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_table_columns(mut self, columns: Vec<FieldSpec>) -> Self {
        self.table_columns = columns;
        self
    }

    /// Declared category of a field, looked up by its raw or normalized name.
    pub fn declared_category(&self, field_name: &str) -> Option<Category> {
        self.fields
            .iter()
            .find(|f| f.name == field_name || crate::normalize_field_name(&f.name) == field_name)
            .and_then(|f| f.category)
    }

    pub fn has_tables(&self) -> bool {
        !self.table_columns.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.doc_type.trim().is_empty() {
            return Err(DocextError::InvalidTemplate(
                "doc_type must not be empty".to_string(),
            ));
        }
        if self.fields.is_empty() && self.table_columns.is_empty() {
            return Err(DocextError::InvalidTemplate(format!(
                "template '{}' v{} defines neither fields nor table columns",
                self.doc_type, self.version
            )));
        }
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Vec<DocumentTemplate>)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<(String, u32), DocumentTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the bundled invoice, passport and ACORD templates.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for template in builtin_templates() {
            registry.register(template);
        }
        registry
    }

    /// Parses a JSON array of templates.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let templates: Vec<DocumentTemplate> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for template in templates {
            template.validate()?;
            registry.register(template);
        }
        debug!("Loaded {} templates from JSON", registry.len());
        Ok(registry)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Inserts a template, replacing any existing one with the same type and version.
    pub fn register(&mut self, template: DocumentTemplate) -> Option<DocumentTemplate> {
        self.templates
            .insert((template.doc_type.clone(), template.version), template)
    }

    pub fn get(&self, doc_type: &str, version: u32) -> Result<&DocumentTemplate> {
        self.templates
            .get(&(doc_type.to_string(), version))
            .ok_or_else(|| DocextError::UnknownTemplate {
                doc_type: doc_type.to_string(),
                version: Some(version),
            })
    }

    /// Highest registered version of a document type.
    pub fn latest(&self, doc_type: &str) -> Result<&DocumentTemplate> {
        self.templates
            .values()
            .filter(|t| t.doc_type == doc_type)
            .max_by_key(|t| t.version)
            .ok_or_else(|| DocextError::UnknownTemplate {
                doc_type: doc_type.to_string(),
                version: None,
            })
    }

    pub fn doc_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.templates.keys().map(|(t, _)| t.as_str()).collect();
        types.dedup();
        types
    }

    pub fn versions(&self, doc_type: &str) -> Vec<u32> {
        self.templates
            .keys()
            .filter(|(t, _)| t == doc_type)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentTemplate> {
        self.templates.values()
    }
}

const IF_NOT_MENTIONED: &str = "If not explicitly mentioned, return ''";

fn builtin_templates() -> Vec<DocumentTemplate> {
    vec![
        invoice_demo(),
        invoice(),
        passport(),
        accord_with_premises_table(),
        accord_with_premises_json(),
    ]
}

fn invoice_demo() -> DocumentTemplate {
    DocumentTemplate::new("invoice", 1)
        .with_label("Invoice (demo)")
        .with_fields(vec![
            FieldSpec::new("invoice_number", "Invoice number"),
            FieldSpec::new("invoice_date", "Invoice date"),
            FieldSpec::new("invoice_amount", "Invoice amount"),
            FieldSpec::new("seller_name", format!("Seller name. {}", IF_NOT_MENTIONED)),
        ])
        .with_table_columns(vec![
            FieldSpec::new("items_description", "Description of the product"),
            FieldSpec::new("Unit Price", "Unit price of the product"),
        ])
}

fn invoice() -> DocumentTemplate {
    DocumentTemplate::new("invoice", 2)
        .with_label("Invoice")
        .with_fields(vec![
            FieldSpec::new("invoice_number", "Invoice number"),
            FieldSpec::new("invoice_date", "Invoice date"),
            FieldSpec::new("invoice_amount", "Invoice amount"),
            FieldSpec::new(
                "invoice_currency",
                format!("Invoice currency. {}", IF_NOT_MENTIONED),
            ),
            FieldSpec::new("document_type", format!("Document type. {}", IF_NOT_MENTIONED)),
            FieldSpec::new("seller_name", format!("Seller name. {}", IF_NOT_MENTIONED)),
            FieldSpec::new("buyer_name", "Buyer name"),
            FieldSpec::new("seller_address", "Seller address"),
            FieldSpec::new("buyer_address", "Buyer address"),
            FieldSpec::new("seller_tax_id", "Seller tax id"),
            FieldSpec::new("buyer_tax_id", "Buyer tax id"),
        ])
        .with_table_columns(vec![
            FieldSpec::new("Quantity", "Total quantity of the product"),
            FieldSpec::new("items_description", "Description of the product"),
            FieldSpec::new("Unit Price", "Unit price of the product"),
            FieldSpec::new("Total Price", "Total price of the product"),
            FieldSpec::new("tax", "tax amount"),
        ])
}

fn passport() -> DocumentTemplate {
    DocumentTemplate::new("passport", 1)
        .with_label("Passport")
        .with_fields(vec![
            FieldSpec::new("full_name", "Full name"),
            FieldSpec::new("date_of_birth", "Date of birth. Return in format YYYY-MM-DD"),
            FieldSpec::new("passport_number", "Passport number"),
            FieldSpec::new("passport_type", "Passport type"),
            FieldSpec::new("date_of_issue", "Date of issue. Return in format YYYY-MM-DD"),
            FieldSpec::new("date_of_expiry", "Date of expiry. Return in format YYYY-MM-DD"),
            FieldSpec::new("place_of_birth", "Place of birth"),
            FieldSpec::new("nationality", "Nationality"),
            FieldSpec::new("gender", "Gender"),
        ])
}

/// Scalar fields shared by every ACORD revision.
fn accord_common_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(
            "insured_name",
            "Legal business name only. Stop at first 'DBA', 'D/B/A', or 'aka'. Example: 'ABC Corp, DBA: XYZ' → extract 'ABC Corp'. Include LLC, Inc, Corp in name.",
        )
        .with_category(Category::InsuredParty),
        FieldSpec::new(
            "dba_names",
            "Found in the APPLICANT INFORMATION section under the NAME box. Business names after 'DBA', 'D/B/A', or 'aka' only. Example: 'ABC Corp, DBA: XYZ, DEF' → extract 'XYZ, DEF'. If no DBA/aka appears, return empty string ''.",
        )
        .with_category(Category::InsuredParty),
        FieldSpec::new(
            "business_phone",
            "The business phone number found in the APPLICANT INFORMATION section. Look for the label 'BUSINESS PHONE', 'Business Phone', or phone number patterns like (XXX) XXX-XXXX. If multiple numbers exist, use the primary business number. If not found, return ''.",
        )
        .with_category(Category::InsuredParty),
        FieldSpec::new(
            "mailing_street",
            "The street address (number and street name) from the mailing address. Example: '123 Main St' or '456 Oak Avenue'. Do not include suite/unit numbers, city, state, or ZIP.",
        )
        .with_category(Category::InsuredParty),
        FieldSpec::new(
            "mailing_street2",
            "The secondary address line from the mailing address such as suite, unit, apartment, or floor number. Example: 'Suite 200' or 'Unit 5B'. Return empty string '' if not provided.",
        )
        .with_category(Category::InsuredParty),
        FieldSpec::new(
            "mailing_city",
            "The city name from the mailing address. Example: 'New York' or 'Boston'.",
        )
        .with_category(Category::InsuredParty),
        FieldSpec::new(
            "mailing_state",
            "The state abbreviation from the mailing address. Example: 'NY' or 'CA'. Use 2-letter state code.",
        )
        .with_category(Category::InsuredParty),
        FieldSpec::new(
            "mailing_zip",
            "The ZIP code from the mailing address. Example: '10001' or '02134-1234'. Include the full ZIP+4 if present.",
        )
        .with_category(Category::InsuredParty),
        FieldSpec::new(
            "proposed_eff_date",
            "The proposed effective date found in the 'POLICY PERIOD' section, usually labeled as 'FROM' or 'Effective Date'. Return in MM/DD/YYYY format.",
        )
        .with_category(Category::PolicyInfo),
        FieldSpec::new(
            "proposed_exp_date",
            "The proposed expiration date found in the 'POLICY PERIOD' section, usually labeled as 'TO' or 'Expiration Date'. Return in MM/DD/YYYY format.",
        )
        .with_category(Category::PolicyInfo),
        FieldSpec::new(
            "primary_business_operations",
            "The description of the insured's primary business operations or business type, typically found in the 'DESCRIPTION OF OPERATIONS' section or 'Business Description' field. Include the complete business activity description.",
        )
        .with_category(Category::BusinessInfo),
    ]
}

/// First ACORD revision: premises come back as a markdown table.
fn accord_with_premises_table() -> DocumentTemplate {
    DocumentTemplate::new("accord", 1)
        .with_label("ACORD application (premises table)")
        .with_fields(accord_common_fields())
        .with_table_columns(vec![
            FieldSpec::new(
                "premise_address",
                "Full street address of the premise from the PREMISES or LOCATIONS section. Do NOT include the mailing address.",
            ),
            FieldSpec::new(
                "premise_type",
                "Premise type ONLY if text like 'Main Office', 'Branch', 'Warehouse' is explicitly visible next to the address, otherwise ''.",
            ),
            FieldSpec::new("premise_building_number", "Building number of the premise, if stated"),
            FieldSpec::new("premise_description", "Description of the premise, if stated"),
        ])
}

/// Current ACORD revision: premises come back as one JSON-encoded field.
fn accord_with_premises_json() -> DocumentTemplate {
    let mut fields = accord_common_fields();
    fields.push(FieldSpec::new(
        crate::formatter::PREMISES_JSON_FIELD,
        "Extract ALL premise locations from sections labeled 'PREMISES', 'LOCATIONS', or 'SCHEDULE OF LOCATIONS' as a JSON array. Each premise must be an object with keys: 'premise_type' (ONLY if text like 'Main Office', 'Branch', 'Warehouse' is explicitly visible next to the address, otherwise use empty string), 'premise_street', 'premise_street2', 'premise_city', 'premise_state', 'premise_zip', 'premise_description'. CRITICAL: Do NOT include the mailing address. Do NOT invent or assume premise_type values - only use what is explicitly written. If the premises section only shows an address without a type label, use empty string for premise_type. Return empty array [] if no premises section exists.",
    ));

    DocumentTemplate::new("accord", 2)
        .with_label("ACORD application")
        .with_fields(fields)
}
