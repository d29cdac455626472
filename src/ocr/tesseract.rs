//! Tesseract-backed recognizers

use super::{EngineMode, PageSegMode, TextRecognizer};
use crate::config::OcrConfig;
use crate::error::{Error, Result};
use image::GrayImage;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    image.write_to(
        &mut std::io::Cursor::new(&mut png_bytes),
        image::ImageFormat::Png,
    )?;
    Ok(png_bytes)
}

/// Recognizer that pipes each page into the `tesseract` executable
#[derive(Debug, Clone)]
pub struct TesseractCli {
    executable: PathBuf,
    language: String,
    engine_mode: EngineMode,
}

impl TesseractCli {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            language: config.language.clone(),
            engine_mode: config.engine_mode,
        }
    }

    fn command(&self, mode: PageSegMode) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--oem")
            .arg(self.engine_mode.as_oem().to_string())
            .arg("--psm")
            .arg(mode.as_psm().to_string());
        command
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> Result<String> {
        let png_bytes = encode_png(image)?;

        let mut child = self
            .command(mode)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Recognition {
                reason: format!(
                    "Failed to start {}: {}",
                    self.executable.display(),
                    e
                ),
            })?;

        // tesseract reads the whole image before it writes anything.
        // The pipe is closed before waiting so the child always sees EOF.
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png_bytes),
            None => Ok(()),
        };

        let output = child.wait_with_output().map_err(|e| Error::Recognition {
            reason: format!("Failed to wait for tesseract: {}", e),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if let Err(e) = sent {
            return Err(Error::Recognition {
                reason: format!(
                    "Failed to send page image to tesseract ({}): {}",
                    output.status,
                    e
                ) + &stderr_suffix(&stderr),
            });
        }
        if !output.status.success() {
            return Err(Error::Recognition {
                reason: format!("tesseract exited with {}", output.status) + &stderr_suffix(&stderr),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.trim() {
        "" => String::new(),
        text => format!(": {}", text),
    }
}

/// Recognizer that links libtesseract in-process.
///
/// A fresh engine is initialized per page, since a `Tesseract` handle cannot
/// be shared between worker threads.
#[cfg(feature = "native-ocr")]
#[derive(Debug, Clone)]
pub struct TesseractNative {
    language: String,
    engine_mode: EngineMode,
}

#[cfg(feature = "native-ocr")]
impl TesseractNative {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            engine_mode: config.engine_mode,
        }
    }

    fn native_psm(mode: PageSegMode) -> tesseract::PageSegMode {
        match mode {
            PageSegMode::Auto => tesseract::PageSegMode::PsmAuto,
            PageSegMode::SingleColumn => tesseract::PageSegMode::PsmSingleColumn,
            PageSegMode::SingleBlock => tesseract::PageSegMode::PsmSingleBlock,
            PageSegMode::SingleLine => tesseract::PageSegMode::PsmSingleLine,
            PageSegMode::SparseText => tesseract::PageSegMode::PsmSparseText,
            PageSegMode::SparseTextOsd => tesseract::PageSegMode::PsmSparseTextOsd,
        }
    }

    fn native_oem(mode: EngineMode) -> tesseract::OcrEngineMode {
        match mode {
            EngineMode::Legacy => tesseract::OcrEngineMode::TesseractOnly,
            EngineMode::LstmOnly => tesseract::OcrEngineMode::LstmOnly,
            EngineMode::Combined => tesseract::OcrEngineMode::TesseractLstmCombined,
            EngineMode::Default => tesseract::OcrEngineMode::Default,
        }
    }
}

#[cfg(feature = "native-ocr")]
impl TextRecognizer for TesseractNative {
    fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> Result<String> {
        let png_bytes = encode_png(image)?;
        let recognition_error = |e: &dyn std::fmt::Display| Error::Recognition {
            reason: e.to_string(),
        };

        let engine = tesseract::Tesseract::new_with_oem(
            None,
            Some(&self.language),
            Self::native_oem(self.engine_mode),
        )
        .map_err(|e| recognition_error(&e))?;

        let mut engine = engine
            .set_image_from_mem(&png_bytes)
            .map_err(|e| recognition_error(&e))?;
        engine.set_page_seg_mode(Self::native_psm(mode));

        engine.get_text().map_err(|e| recognition_error(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_cli_arguments() {
        let recognizer = TesseractCli::new(&OcrConfig {
            language: "eng+hin".to_string(),
            ..OcrConfig::default()
        });

        let command = recognizer.command(PageSegMode::SparseText);
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(command.get_program(), "tesseract");
        assert_eq!(
            args,
            vec!["stdin", "stdout", "-l", "eng+hin", "--oem", "1", "--psm", "11"]
        );
    }

    #[test]
    fn test_missing_executable_is_recognition_error() {
        let recognizer = TesseractCli::new(&OcrConfig {
            executable: PathBuf::from("/nonexistent/bin/tesseract"),
            ..OcrConfig::default()
        });

        let page = GrayImage::from_pixel(4, 4, Luma([255]));
        let result = recognizer.recognize(&page, PageSegMode::SingleBlock);

        assert!(matches!(result, Err(Error::Recognition { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_exiting_before_reading_page() {
        // Larger than a pipe buffer once encoded, so the write itself fails
        let mut seed = 0x2545_f491_u32;
        let page = GrayImage::from_fn(1024, 1024, |_, _| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            Luma([seed as u8])
        });
        let recognizer = TesseractCli::new(&OcrConfig {
            executable: PathBuf::from("/bin/false"),
            ..OcrConfig::default()
        });

        let result = recognizer.recognize(&page, PageSegMode::SingleBlock);

        match result {
            Err(Error::Recognition { reason }) => {
                assert!(reason.contains("exit"), "unexpected reason {}", reason)
            }
            other => panic!("expected recognition error, got {:?}", other),
        }
    }

    #[test]
    fn test_stderr_suffix() {
        assert_eq!(stderr_suffix("  \n"), "");
        assert_eq!(stderr_suffix("Error opening data file\n"), ": Error opening data file");
    }

    #[test]
    fn test_encode_png_header() {
        let page = GrayImage::from_pixel(2, 2, Luma([0]));
        let bytes = encode_png(&page).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
