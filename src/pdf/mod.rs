//! PDF document model
//!
//! The pipeline only sees the [`DocumentLoader`] and [`DocumentModel`]
//! capabilities; [`PdfiumLoader`] provides them on top of PDFium.

mod reader;

pub use reader::{validate_header, PdfiumDocument, PdfiumLoader};

use crate::error::Result;
use image::DynamicImage;

/// File format of an embedded image's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Png,
    Jpeg,
    Jpeg2000,
}

impl ImageEncoding {
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Png => "png",
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Jpeg2000 => "jp2",
        }
    }

    /// Format of a raw image stream whose filter chain leaves a complete
    /// image file, e.g. a lone `DCTDecode`
    pub fn from_filters<S: AsRef<str>>(filters: &[S]) -> Option<Self> {
        match filters {
            [only] => match only.as_ref() {
                "DCTDecode" | "DCT" => Some(ImageEncoding::Jpeg),
                "JPXDecode" => Some(ImageEncoding::Jpeg2000),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Raster image embedded in a page, as stored by the document model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub bytes: Vec<u8>,
    pub format: ImageEncoding,
}

impl EmbeddedImage {
    /// File extension matching the declared format
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// An opened document
pub trait DocumentModel {
    fn page_count(&self) -> usize;

    /// Render page `index` (0-based) at `dpi`
    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage>;

    /// Raster images of page `index` in embedding order
    fn embedded_images(&self, index: usize) -> Result<Vec<EmbeddedImage>>;
}

/// Opens raw document bytes.
///
/// Fails with [`Error::UnsupportedDocument`](crate::Error::UnsupportedDocument)
/// when the bytes cannot be parsed.
pub trait DocumentLoader {
    fn open<'a>(&'a self, data: &'a [u8]) -> Result<Box<dyn DocumentModel + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["DCTDecode"], Some(ImageEncoding::Jpeg))]
    #[case(&["DCT"], Some(ImageEncoding::Jpeg))]
    #[case(&["JPXDecode"], Some(ImageEncoding::Jpeg2000))]
    #[case(&["FlateDecode"], None)]
    #[case(&["CCITTFaxDecode"], None)]
    #[case(&["FlateDecode", "DCTDecode"], None)]
    #[case(&[], None)]
    fn test_native_format_from_filters(
        #[case] filters: &[&str],
        #[case] expected: Option<ImageEncoding>,
    ) {
        assert_eq!(ImageEncoding::from_filters(filters), expected);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(ImageEncoding::Png.extension(), "png");
        assert_eq!(ImageEncoding::Jpeg.extension(), "jpg");
        assert_eq!(ImageEncoding::Jpeg2000.extension(), "jp2");
    }
}
