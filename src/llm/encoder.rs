use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

use crate::error::{DocextError, Result};

const FALLBACK_MIME: &str = "image/jpeg";

/// Turns a document image on disk into something a chat request can embed.
pub trait ImageEncoder {
    /// Returns a `data:` URL for the image at `path`.
    fn encode(&self, path: &Path) -> Result<String>;
}

/// Reads images from the local filesystem and inlines them as base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageEncoder;

impl ImageEncoder for FileImageEncoder {
    fn encode(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|source| DocextError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(data_url(&image_mime_type(path), &bytes))
    }
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// MIME type guessed from the extension; anything that is not an image is sent as JPEG.
pub fn image_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}
