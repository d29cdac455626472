//! Error types for formscan

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for formscan
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for formscan
#[derive(Error, Debug)]
pub enum Error {
    /// Document bytes could not be parsed as a PDF
    #[error("Unsupported document: {reason}")]
    UnsupportedDocument { reason: String },

    /// A single page could not be rendered or recognized
    #[error("Failed to process page {page}: {reason}")]
    PageRender { page: usize, reason: String },

    /// An extracted asset could not be written or moved
    #[error("Asset I/O failed for {}: {source}", path.display())]
    AssetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// OCR engine failure
    #[error("Text recognition failed: {reason}")]
    Recognition { reason: String },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Extraction rule is malformed or its pattern does not compile
    #[error("Invalid extraction rule {field}: {reason}")]
    InvalidRule { field: String, reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encode/decode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file parse error
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// Return a sanitized error message safe to hand back to callers.
    /// Internal details (paths, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::UnsupportedDocument { .. } => "Unsupported document".to_string(),
            Error::PageRender { page, .. } => format!("Failed to process page {}", page + 1),
            Error::AssetIo { .. } => "Failed to store extracted image".to_string(),
            Error::Recognition { .. } => "Text recognition failed".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::InvalidRule { field, .. } => format!("Invalid extraction rule: {}", field),
            Error::Config { reason } => format!("Invalid configuration: {}", reason),
            Error::Io(e) => format!("I/O error: {}", e.kind()),
            Error::Image(_) => "Image processing error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::ConfigParse(_) => "Invalid configuration file".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_client_message_hides_paths() {
        let error = Error::AssetIo {
            path: PathBuf::from("/srv/formscan/photos/0a1b_1_img_1.png"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        assert!(error.to_string().contains("/srv/formscan"));
        assert_eq!(error.client_message(), "Failed to store extracted image");
    }

    #[test]
    fn test_io_client_message_keeps_kind_only() {
        let error = Error::from(io::Error::new(
            io::ErrorKind::NotFound,
            "/home/applicant/form.pdf: no such file",
        ));

        let message = error.client_message();
        assert!(message.starts_with("I/O error: "));
        assert!(!message.contains("/home/applicant"));
    }

    #[test]
    fn test_page_numbers_are_one_based() {
        let error = Error::PageRender {
            page: 0,
            reason: "bitmap allocation failed".to_string(),
        };
        assert_eq!(error.client_message(), "Failed to process page 1");
    }
}
