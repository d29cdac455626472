//! Text recognition layer
//!
//! Pages are preprocessed and recognized independently on a bounded worker
//! pool, then rejoined in physical page order before concatenation.

mod preprocess;
mod tesseract;

pub use preprocess::{adaptive_threshold, preprocess, upscale};
#[cfg(feature = "native-ocr")]
pub use self::tesseract::TesseractNative;
pub use self::tesseract::TesseractCli;

use crate::config::PreprocessConfig;
use crate::error::{Error, Result};
use image::{DynamicImage, GrayImage};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

/// Tesseract page segmentation modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageSegMode {
    /// Fully automatic segmentation, no orientation detection
    Auto,
    /// Single column of text of variable sizes
    SingleColumn,
    /// Single uniform block of text
    #[default]
    SingleBlock,
    /// Find as much text as possible in no particular order
    SparseText,
    /// Sparse text with orientation and script detection
    SparseTextOsd,
    /// Treat the image as a single text line
    SingleLine,
}

impl PageSegMode {
    /// Numeric `--psm` value understood by tesseract
    pub fn as_psm(self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleColumn => 4,
            PageSegMode::SingleBlock => 6,
            PageSegMode::SingleLine => 7,
            PageSegMode::SparseText => 11,
            PageSegMode::SparseTextOsd => 12,
        }
    }
}

/// Tesseract OCR engine modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineMode {
    Legacy,
    #[default]
    LstmOnly,
    Combined,
    Default,
}

impl EngineMode {
    /// Numeric `--oem` value understood by tesseract
    pub fn as_oem(self) -> u8 {
        match self {
            EngineMode::Legacy => 0,
            EngineMode::LstmOnly => 1,
            EngineMode::Combined => 2,
            EngineMode::Default => 3,
        }
    }
}

/// OCR capability over a single preprocessed page.
///
/// Low confidence is not an error: implementations return their best-effort
/// text, and an empty string is a valid result.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> Result<String>;
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for Box<R> {
    fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> Result<String> {
        (**self).recognize(image, mode)
    }
}

/// Recognized text for one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionResult {
    /// Text of each page, in physical page order
    pub pages: Vec<String>,
    /// Every page text followed by a newline, in physical page order
    pub full_text: String,
}

impl RecognitionResult {
    pub fn from_pages(pages: Vec<String>) -> Self {
        let capacity = pages.iter().map(|p| p.len() + 1).sum();
        let mut full_text = String::with_capacity(capacity);
        for page in &pages {
            full_text.push_str(page);
            full_text.push('\n');
        }
        Self { pages, full_text }
    }

    /// True when no page produced any non-whitespace text
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// Preprocess and recognize every page on `pool`.
///
/// `pages[i]` is `None` when page `i` failed to render; such pages, and pages
/// whose recognition fails, contribute empty text. The collected result keeps
/// physical page order regardless of which worker finishes first.
pub fn recognize_pages<R>(
    pages: Vec<Option<DynamicImage>>,
    recognizer: &R,
    mode: PageSegMode,
    preprocess_config: &PreprocessConfig,
    pool: &ThreadPool,
) -> RecognitionResult
where
    R: TextRecognizer + ?Sized,
{
    let texts: Vec<String> = pool.install(|| {
        pages
            .into_par_iter()
            .enumerate()
            .map(|(index, page)| {
                let Some(page) = page else {
                    return String::new();
                };
                match recognize_page(index, &page, recognizer, mode, preprocess_config) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(page = index + 1, error = %e, "page recognition failed");
                        String::new()
                    }
                }
            })
            .collect()
    });

    RecognitionResult::from_pages(texts)
}

fn recognize_page<R>(
    index: usize,
    page: &DynamicImage,
    recognizer: &R,
    mode: PageSegMode,
    preprocess_config: &PreprocessConfig,
) -> Result<String>
where
    R: TextRecognizer + ?Sized,
{
    let prepared = preprocess(page, preprocess_config);
    let text = recognizer
        .recognize(&prepared, mode)
        .map_err(|e| Error::PageRender {
            page: index,
            reason: e.to_string(),
        })?;

    tracing::debug!(page = index + 1, chars = text.len(), "page recognized");
    Ok(text)
}

/// Build the bounded worker pool used for per-page recognition
pub fn build_pool(workers: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("ocr-worker-{}", i))
        .build()
        .map_err(|e| Error::Config {
            reason: format!("Failed to build OCR worker pool: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::time::Duration;

    /// Recognizer that reports the width of the page it was given
    struct WidthRecognizer;

    impl TextRecognizer for WidthRecognizer {
        fn recognize(&self, image: &GrayImage, _mode: PageSegMode) -> Result<String> {
            // Later pages finish first so ordering cannot come from completion order
            let delay = 200u64.saturating_sub(image.width() as u64);
            std::thread::sleep(Duration::from_millis(delay / 10));
            Ok(format!("width={}", image.width()))
        }
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, image: &GrayImage, _mode: PageSegMode) -> Result<String> {
            if image.width() == 13 {
                return Err(Error::Recognition {
                    reason: "engine crashed".to_string(),
                });
            }
            Ok("ok".to_string())
        }
    }

    fn blank_page(width: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, 4, image::Rgb([255, 255, 255])))
    }

    fn no_scaling() -> PreprocessConfig {
        PreprocessConfig {
            scale: 1.0,
            ..PreprocessConfig::default()
        }
    }

    #[test]
    fn test_from_pages_joins_in_order() {
        let result = RecognitionResult::from_pages(vec!["one".into(), "two".into()]);
        assert_eq!(result.full_text, "one\ntwo\n");
        assert_eq!(result.pages.len(), 2);
    }

    #[test]
    fn test_from_pages_keeps_empty_pages() {
        let result = RecognitionResult::from_pages(vec![String::new(), "b".into()]);
        assert_eq!(result.full_text, "\nb\n");
        assert!(!result.is_blank());
        assert!(RecognitionResult::from_pages(vec![" ".into(), String::new()]).is_blank());
    }

    #[test]
    fn test_parallel_recognition_preserves_page_order() {
        let pool = build_pool(4).unwrap();
        let pages = (1..=12).map(|i| Some(blank_page(i * 10))).collect();

        let result = recognize_pages(
            pages,
            &WidthRecognizer,
            PageSegMode::SingleBlock,
            &no_scaling(),
            &pool,
        );

        let expected: Vec<String> = (1..=12).map(|i| format!("width={}", i * 10)).collect();
        assert_eq!(result.pages, expected);

        let mut last = 0;
        for text in &expected {
            let position = result.full_text.find(text.as_str()).unwrap();
            assert!(position >= last);
            last = position;
        }
    }

    #[test]
    fn test_single_page_document() {
        let pool = build_pool(1).unwrap();
        let result = recognize_pages(
            vec![Some(blank_page(30))],
            &WidthRecognizer,
            PageSegMode::SingleBlock,
            &no_scaling(),
            &pool,
        );
        assert_eq!(result.full_text, "width=30\n");
    }

    #[test]
    fn test_failed_pages_contribute_empty_text() {
        let pool = build_pool(2).unwrap();
        let pages = vec![Some(blank_page(8)), None, Some(blank_page(13)), Some(blank_page(8))];

        let result = recognize_pages(
            pages,
            &FailingRecognizer,
            PageSegMode::SingleBlock,
            &no_scaling(),
            &pool,
        );

        assert_eq!(result.pages, vec!["ok", "", "", "ok"]);
        assert_eq!(result.full_text, "ok\n\n\nok\n");
    }

    #[test]
    fn test_psm_values() {
        assert_eq!(PageSegMode::SingleBlock.as_psm(), 6);
        assert_eq!(PageSegMode::SparseText.as_psm(), 11);
        assert_eq!(EngineMode::LstmOnly.as_oem(), 1);
    }
}
