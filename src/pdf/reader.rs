//! PDFium-backed document model

use super::{DocumentLoader, DocumentModel, EmbeddedImage, ImageEncoding};
use crate::error::{Error, Result};
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;

/// PDF user space is 72 points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Reject bytes that do not start with a PDF header
pub fn validate_header(data: &[u8]) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::UnsupportedDocument {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}

/// Bind PDFium from the working directory, /opt/pdfium/lib, or the system
fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Map PDFium load errors to our error type
fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::UnsupportedDocument {
                reason: "PDF is password protected".to_string(),
            }
        }
        _ => Error::UnsupportedDocument {
            reason: format!("{}", err),
        },
    }
}

fn encode_png(image: &DynamicImage) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut png_bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(png_bytes)
}

/// Loads documents through a single PDFium binding
pub struct PdfiumLoader {
    pdfium: Pdfium,
}

impl PdfiumLoader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pdfium: create_pdfium()?,
        })
    }
}

impl DocumentLoader for PdfiumLoader {
    fn open<'a>(&'a self, data: &'a [u8]) -> Result<Box<dyn DocumentModel + 'a>> {
        validate_header(data)?;

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(map_pdfium_error)?;

        tracing::debug!(pages = document.pages().len(), "document opened");
        Ok(Box::new(PdfiumDocument { document }))
    }
}

/// A document opened by [`PdfiumLoader`]
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>> {
        let page_index = u16::try_from(index).map_err(|_| Error::PageRender {
            page: index,
            reason: "page index out of range".to_string(),
        })?;

        self.document
            .pages()
            .get(page_index)
            .map_err(|e| Error::PageRender {
                page: index,
                reason: format!("Failed to get page {}: {}", index + 1, e),
            })
    }
}

impl DocumentModel for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage> {
        let page = self.page(index)?;

        let config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / POINTS_PER_INCH)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| Error::PageRender {
                page: index,
                reason: format!("Failed to render page {}: {}", index + 1, e),
            })?;

        Ok(bitmap.as_image())
    }

    fn embedded_images(&self, index: usize) -> Result<Vec<EmbeddedImage>> {
        let page = self.page(index)?;
        let mut images = Vec::new();

        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };

            let filters: Vec<String> = image_object
                .filters()
                .iter()
                .map(|filter| filter.name().to_string())
                .collect();

            // Streams that already are image files are stored byte for byte
            if let Some(format) = ImageEncoding::from_filters(filters.as_slice()) {
                match image_object.get_raw_image_data() {
                    Ok(bytes) if !bytes.is_empty() => {
                        images.push(EmbeddedImage { bytes, format });
                        continue;
                    }
                    Ok(_) => {
                        tracing::debug!(page = index + 1, "empty image stream, decoding instead");
                    }
                    Err(e) => {
                        tracing::warn!(page = index + 1, error = %e, "unreadable image stream");
                    }
                }
            }

            let decoded = match image_object.get_processed_image(&self.document) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "undecodable image object");
                    continue;
                }
            };

            match encode_png(&decoded) {
                Ok(bytes) => images.push(EmbeddedImage {
                    bytes,
                    format: ImageEncoding::Png,
                }),
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "failed to encode image object");
                }
            }
        }

        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_detection() {
        let result = validate_header(b"not a pdf");
        assert!(matches!(result, Err(Error::UnsupportedDocument { .. })));
    }

    #[test]
    fn test_truncated_header() {
        assert!(validate_header(b"%PD").is_err());
        assert!(validate_header(b"").is_err());
    }

    #[test]
    fn test_valid_header() {
        assert!(validate_header(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").is_ok());
    }

    #[test]
    fn test_embedded_image_extension() {
        let png = EmbeddedImage {
            bytes: Vec::new(),
            format: ImageEncoding::Png,
        };
        let jpeg = EmbeddedImage {
            bytes: Vec::new(),
            format: ImageEncoding::Jpeg,
        };
        assert_eq!(png.extension(), "png");
        assert_eq!(jpeg.extension(), "jpg");
    }

    #[test]
    fn test_encode_png_header() {
        let image = DynamicImage::new_rgb8(3, 2);
        let bytes = encode_png(&image).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
