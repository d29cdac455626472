//! Pipeline configuration
//!
//! Every setting has a default so an empty TOML file is a valid configuration.

use crate::error::{Error, Result};
use crate::extract::{FormTemplate, Rule};
use crate::ocr::{EngineMode, PageSegMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full configuration for an [`Extractor`](crate::Extractor)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub raster: RasterConfig,
    pub preprocess: PreprocessConfig,
    pub ocr: OcrConfig,
    pub storage: StorageConfig,
    /// Built-in rule catalogue to apply
    pub template: FormTemplate,
    /// Custom rule catalogue; replaces `template` when present
    pub rules: Option<Vec<Rule>>,
    /// Base URL under which the photo and signature directories are served
    pub public_base_url: Option<String>,
}

/// Page rasterization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterConfig {
    /// Render resolution in dots per inch
    pub dpi: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self { dpi: 300 }
    }
}

/// Image preprocessing settings applied before OCR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessConfig {
    /// Adaptive threshold window edge in pixels (odd, >= 3)
    pub window: u32,
    /// Constant subtracted from the local weighted mean
    pub constant: f32,
    /// Upscale factor applied after thresholding
    pub scale: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            window: 11,
            constant: 2.0,
            scale: 1.5,
        }
    }
}

/// OCR engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrConfig {
    /// Tesseract language code(s), e.g. "eng" or "eng+hin"
    pub language: String,
    pub page_seg_mode: PageSegMode,
    pub engine_mode: EngineMode,
    /// Tesseract executable used by the CLI recognizer
    pub executable: PathBuf,
    /// Worker threads for per-page recognition (0 = available parallelism)
    pub workers: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            page_seg_mode: PageSegMode::SingleBlock,
            engine_mode: EngineMode::LstmOnly,
            executable: PathBuf::from("tesseract"),
            workers: 0,
        }
    }
}

/// Destination directories for extracted images
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub photo_dir: PathBuf,
    pub signature_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            photo_dir: PathBuf::from("photos"),
            signature_dir: PathBuf::from("signatures"),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.raster.dpi == 0 {
            return Err(Error::Config {
                reason: "raster.dpi must be positive".to_string(),
            });
        }

        let window = self.preprocess.window;
        if window < 3 || window % 2 == 0 {
            return Err(Error::Config {
                reason: format!("preprocess.window must be odd and >= 3 (got {})", window),
            });
        }

        let scale = self.preprocess.scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::Config {
                reason: format!("preprocess.scale must be positive (got {})", scale),
            });
        }

        if !self.preprocess.constant.is_finite() {
            return Err(Error::Config {
                reason: "preprocess.constant must be finite".to_string(),
            });
        }

        if self.ocr.language.trim().is_empty() {
            return Err(Error::Config {
                reason: "ocr.language must not be empty".to_string(),
            });
        }

        if let Some(rules) = &self.rules {
            if rules.is_empty() {
                return Err(Error::Config {
                    reason: "rules must contain at least one rule".to_string(),
                });
            }
        }

        if let Some(base) = &self.public_base_url {
            url::Url::parse(base).map_err(|e| Error::Config {
                reason: format!("public_base_url is not a valid URL: {}", e),
            })?;
        }

        Ok(())
    }

    /// Rule catalogue selected by this configuration
    pub fn catalogue(&self) -> Vec<Rule> {
        match &self.rules {
            Some(rules) => rules.clone(),
            None => self.template.rules(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Cardinality;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();

        assert_eq!(config.raster.dpi, 300);
        assert_eq!(config.preprocess, PreprocessConfig::default());
        assert_eq!(config.ocr.page_seg_mode, PageSegMode::SingleBlock);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.storage.photo_dir, PathBuf::from("photos"));
        assert_eq!(config.template, FormTemplate::ApplicationForm);
        assert!(config.public_base_url.is_none());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = PipelineConfig::from_toml_str(
            r#"
            template = "block-letters"
            public_base_url = "http://127.0.0.1:5000"

            [ocr]
            page_seg_mode = "sparse-text"
            workers = 2

            [storage]
            photo_dir = "/srv/forms/photos"
            "#,
        )
        .unwrap();

        assert_eq!(config.template, FormTemplate::BlockLetters);
        assert_eq!(config.ocr.page_seg_mode, PageSegMode::SparseText);
        assert_eq!(config.ocr.workers, 2);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.storage.photo_dir, PathBuf::from("/srv/forms/photos"));
        assert_eq!(config.storage.signature_dir, PathBuf::from("signatures"));
    }

    #[test]
    fn test_custom_rules_replace_template() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [[rules]]
            section = "personal_info"
            key = "name"
            pattern = 'Applicant[:\-]?\s*([^\n]+)'
            cardinality = { kind = "single" }
            "#,
        )
        .unwrap();

        let catalogue = config.catalogue();
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue[0].key, "name");
        assert_eq!(catalogue[0].cardinality, Cardinality::Single);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let result = PipelineConfig::from_toml_str("[preprocess]\nwindow = 10\n");
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = PipelineConfig::from_toml_str("[preprocess]\nwindow = 1\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_invalid_scale_and_dpi_rejected() {
        assert!(PipelineConfig::from_toml_str("[preprocess]\nscale = 0.0\n").is_err());
        assert!(PipelineConfig::from_toml_str("[raster]\ndpi = 0\n").is_err());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = PipelineConfig::from_toml_str("public_base_url = \"not a url\"\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = PipelineConfig::from_toml_str("[raster]\nresolution = 200\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }
}
