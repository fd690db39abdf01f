//! # docext
//!
//! Templates, prompt assembly and result formatting around a vision-language
//! document extraction model.
//!
//! ## Pipeline
//!
//! - **Templates**: a [`TemplateRegistry`] maps a document type (invoice,
//!   passport, ACORD insurance application) to versioned field and table column
//!   lists with natural-language instructions.
//! - **Prompt assembly**: [`build_field_extraction_request`] and
//!   [`build_table_extraction_request`] turn a field list and document images
//!   into a multimodal chat request. The model call itself is up to the caller.
//! - **Response parsing**: [`parse_fields_response`] and [`parse_markdown_table`]
//!   read the model's answer back into rows.
//! - **Formatting**: [`format_nested`], [`format_flat`] and
//!   [`format_categorized`] reshape extraction rows into the JSON consumed
//!   downstream.
//!
//! ## Example
//!
//! ```rust,ignore
//! use docext::*;
//!
//! let registry = TemplateRegistry::builtin();
//! let request = PromptAssembler::new(&registry).fields_request("accord", &["page1.jpg"])?;
//! // ... send `request` to the model, score the answer ...
//! let rows = vec![
//!     ExtractionRow::new("insured_name", "Acme Corp", 95.0),
//!     ExtractionRow::new("business_phone", "", 65.0),
//! ];
//! let json = format_nested(&rows, &[], &FormatOptions::insurance().with_submission_id("SUB-123"));
//! assert_eq!(json["quality_metrics"]["requires_review"], true);
//! ```

pub mod error;
pub mod formatter;
pub mod llm;
pub mod schema;
pub mod templates;

pub use error::{DocextError, Result};
pub use formatter::{
    average_confidence, categorize_field_name, format_categorized, format_categorized_with,
    format_flat, format_nested, FormatOptions, DEFAULT_CONFIDENCE_THRESHOLD, PREMISES_JSON_FIELD,
};
pub use llm::*;
pub use schema::*;
pub use templates::{DocumentTemplate, TemplateRegistry};
