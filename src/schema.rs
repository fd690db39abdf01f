use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Bucket of the insurance-system projection that a scalar field lands in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[schemars(description = "Policy period data such as proposed effective and expiration dates")]
    PolicyInfo,

    #[schemars(description = "Who is insured: legal name, DBA names, mailing address, phone numbers")]
    InsuredParty,

    #[schemars(description = "What the insured does: business type and description of operations")]
    BusinessInfo,

    #[schemars(description = "Anything that does not fit another bucket")]
    Metadata,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::PolicyInfo,
        Category::InsuredParty,
        Category::BusinessInfo,
        Category::Metadata,
    ];

    /// Key of the bucket in the categorized JSON output.
    pub fn bucket_key(self) -> &'static str {
        match self {
            Category::PolicyInfo => "policy_info",
            Category::InsuredParty => "insured_party",
            Category::BusinessInfo => "business_info",
            Category::Metadata => "metadata",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct FieldSpec {
    #[schemars(
        description = "Field or column name. Lowercased with spaces replaced by underscores when used as an output key."
    )]
    #[serde(alias = "field_name")]
    pub name: String,

    #[schemars(description = "Natural-language extraction instruction shown to the model verbatim")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Optional insurance bucket. When set it takes precedence over name-based categorization."
    )]
    pub category: Option<Category>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

/// One extracted scalar value, as produced by the extraction engine.
///
/// Engine records use `fields`/`answer` as column names, both are accepted.
/// A confidence that is missing or not a number deserializes to `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionRow {
    #[serde(alias = "fields")]
    pub field_name: String,

    #[serde(alias = "answer", default, deserialize_with = "lenient_string")]
    pub value: String,

    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub document_index: usize,
}

impl ExtractionRow {
    pub fn new(field_name: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            field_name: field_name.into(),
            value: value.into(),
            confidence: Some(confidence),
            document_index: 0,
        }
    }

    #[must_use]
    pub fn with_document_index(mut self, document_index: usize) -> Self {
        self.document_index = document_index;
        self
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_empty()
    }
}

/// One row of an extracted table, column name to cell text.
pub type TableRow = BTreeMap<String, String>;

fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_f64()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}
