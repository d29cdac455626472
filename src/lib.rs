//! Application form extraction
//!
//! Turns scanned or digitally filled application-form PDFs into structured
//! candidate records:
//! - pages are rendered with PDFium, binarized and recognized with Tesseract
//! - an ordered rule catalogue pulls personal details, addresses, education
//!   rows and free-form blocks out of the recognized text
//! - embedded images are stored on disk and classified as photo or signature

pub mod assets;
pub mod config;
pub mod error;
pub mod extract;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod publish;
pub mod record;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use extract::{FieldExtractor, FormTemplate, Rule};
pub use ocr::{PageSegMode, TesseractCli, TextRecognizer};
pub use pdf::{DocumentLoader, DocumentModel, EmbeddedImage, ImageEncoding, PdfiumLoader};
pub use pipeline::Extractor;
pub use publish::AssetLinker;
pub use record::{AssetRef, StructuredRecord, NOT_FOUND};
