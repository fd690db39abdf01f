use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocextError {
    #[error("Invalid extraction spec: {0}")]
    InvalidSpec(String),

    #[error("Failed to read image {}: {source}", .path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No template registered for document type '{doc_type}'{}", version_suffix(.version))]
    UnknownTemplate {
        doc_type: String,
        version: Option<u32>,
    },

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Could not parse model response: {0}")]
    ResponseParse(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn version_suffix(version: &Option<u32>) -> String {
    match version {
        Some(v) => format!(" (version {})", v),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, DocextError>;
