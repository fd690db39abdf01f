use log::{debug, info};
use std::path::Path;

use crate::error::{DocextError, Result};
use crate::llm::encoder::{FileImageEncoder, ImageEncoder};
use crate::llm::prompts;
use crate::llm::types::{ChatRequest, ContentPart};
use crate::schema::FieldSpec;
use crate::templates::{DocumentTemplate, TemplateRegistry};

/// Request asking the model for one value per field, answered as a JSON object.
pub fn build_field_extraction_request<P: AsRef<Path>>(
    fields: &[FieldSpec],
    images: &[P],
    encoder: &dyn ImageEncoder,
) -> Result<ChatRequest> {
    if fields.is_empty() {
        return Err(DocextError::InvalidSpec(
            "at least one field is required to build a field extraction request".to_string(),
        ));
    }

    let mut content = vec![
        ContentPart::text(prompts::fields_intro(fields)),
        ContentPart::text(prompts::DOCUMENTS_HEADER),
    ];
    content.extend(encode_images(images, encoder)?);
    content.push(ContentPart::text(prompts::fields_output_instruction(fields)));

    info!(
        "Built field extraction request: {} fields, {} images",
        fields.len(),
        images.len()
    );
    Ok(ChatRequest::single_user(content))
}

/// Request asking the model for exactly one markdown table with the given columns.
pub fn build_table_extraction_request<P: AsRef<Path>>(
    columns: &[FieldSpec],
    images: &[P],
    encoder: &dyn ImageEncoder,
) -> Result<ChatRequest> {
    if columns.is_empty() {
        return Err(DocextError::InvalidSpec(
            "at least one column is required to build a table extraction request".to_string(),
        ));
    }

    let mut content = vec![
        ContentPart::text(prompts::columns_intro(columns)),
        ContentPart::text(prompts::DOCUMENTS_HEADER),
    ];
    content.extend(encode_images(images, encoder)?);
    content.push(ContentPart::text(prompts::tables_output_instruction(
        columns,
    )));

    info!(
        "Built table extraction request: {} columns, {} images",
        columns.len(),
        images.len()
    );
    Ok(ChatRequest::single_user(content))
}

fn encode_images<P: AsRef<Path>>(
    images: &[P],
    encoder: &dyn ImageEncoder,
) -> Result<Vec<ContentPart>> {
    images
        .iter()
        .map(|path| {
            let path = path.as_ref();
            debug!("Encoding document image {}", path.display());
            encoder.encode(path).map(ContentPart::image)
        })
        .collect()
}

/// Builds requests for registered document types.
pub struct PromptAssembler<'a> {
    registry: &'a TemplateRegistry,
    encoder: Box<dyn ImageEncoder + 'a>,
}

impl<'a> PromptAssembler<'a> {
    pub fn new(registry: &'a TemplateRegistry) -> Self {
        Self {
            registry,
            encoder: Box::new(FileImageEncoder),
        }
    }

    /// Swap the image source, e.g. for images held in memory or fetched remotely.
    pub fn with_encoder(mut self, encoder: impl ImageEncoder + 'a) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        self.registry
    }

    pub fn fields_request<P: AsRef<Path>>(
        &self,
        doc_type: &str,
        images: &[P],
    ) -> Result<ChatRequest> {
        let template = self.registry.latest(doc_type)?;
        self.fields_request_for(template, images)
    }

    pub fn fields_request_for_version<P: AsRef<Path>>(
        &self,
        doc_type: &str,
        version: u32,
        images: &[P],
    ) -> Result<ChatRequest> {
        let template = self.registry.get(doc_type, version)?;
        self.fields_request_for(template, images)
    }

    pub fn tables_request<P: AsRef<Path>>(
        &self,
        doc_type: &str,
        images: &[P],
    ) -> Result<ChatRequest> {
        let template = self.registry.latest(doc_type)?;
        self.tables_request_for(template, images)
    }

    pub fn tables_request_for_version<P: AsRef<Path>>(
        &self,
        doc_type: &str,
        version: u32,
        images: &[P],
    ) -> Result<ChatRequest> {
        let template = self.registry.get(doc_type, version)?;
        self.tables_request_for(template, images)
    }

    fn fields_request_for<P: AsRef<Path>>(
        &self,
        template: &DocumentTemplate,
        images: &[P],
    ) -> Result<ChatRequest> {
        debug!(
            "Using template {} v{} for field extraction",
            template.doc_type, template.version
        );
        build_field_extraction_request(&template.fields, images, self.encoder.as_ref())
    }

    fn tables_request_for<P: AsRef<Path>>(
        &self,
        template: &DocumentTemplate,
        images: &[P],
    ) -> Result<ChatRequest> {
        debug!(
            "Using template {} v{} for table extraction",
            template.doc_type, template.version
        );
        build_table_extraction_request(&template.table_columns, images, self.encoder.as_ref())
    }
}
