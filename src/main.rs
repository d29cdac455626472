//! formscan - Entry point
//!
//! Extracts structured candidate records from application form PDFs and
//! prints them as JSON on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use formscan::{
    AssetLinker, DocumentLoader, Extractor, FormTemplate, PipelineConfig, StructuredRecord,
    TextRecognizer,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "formscan")]
#[command(about = "Extract candidate records from application form PDFs", long_about = None)]
struct Args {
    /// PDF files or glob patterns, processed in the given order
    #[arg(required = true)]
    inputs: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in rule catalogue (application-form, block-letters)
    #[arg(short, long)]
    template: Option<FormTemplate>,

    /// Directory for extracted images
    #[arg(long)]
    photo_dir: Option<PathBuf>,

    /// Directory for relocated signatures
    #[arg(long)]
    signature_dir: Option<PathBuf>,

    /// Rewrite photo and signature paths to URLs under this base
    #[arg(long)]
    base_url: Option<String>,

    /// OCR worker threads (0 = available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct BatchEntry {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<StructuredRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl BatchEntry {
    fn pending(source: String) -> Self {
        Self {
            source,
            record: None,
            error: None,
        }
    }

    /// Log the full error, keep only its sanitized message for stdout
    fn failed(source: String, error: &formscan::Error) -> Self {
        tracing::warn!(source = %source, error = %error, "document failed");
        Self {
            source,
            record: None,
            error: Some(error.client_message()),
        }
    }
}

/// Read every input, then run the readable ones through
/// [`Extractor::process_batch`]. Entries keep input order; unreadable files
/// fail in place.
fn run_batch<L, R>(
    extractor: &Extractor<L, R>,
    linker: Option<&AssetLinker>,
    inputs: &[PathBuf],
) -> Vec<BatchEntry>
where
    L: DocumentLoader,
    R: TextRecognizer,
{
    let mut entries = Vec::with_capacity(inputs.len());
    let mut readable = Vec::new();

    for path in inputs {
        let source = path.display().to_string();
        match std::fs::read(path) {
            Ok(data) => {
                readable.push((entries.len(), data));
                entries.push(BatchEntry::pending(source));
            }
            Err(e) => entries.push(BatchEntry::failed(source, &e.into())),
        }
    }

    let results = extractor.process_batch(readable.iter().map(|(_, data)| data));
    for ((slot, _), result) in readable.iter().zip(results) {
        let entry = &mut entries[*slot];
        match result {
            Ok(record) => {
                entry.record = Some(match linker {
                    Some(linker) => linker.link(record),
                    None => record,
                });
            }
            Err(e) => *entry = BatchEntry::failed(std::mem::take(&mut entry.source), &e),
        }
    }

    entries
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(template) = args.template {
        config.template = template;
        config.rules = None;
    }
    if let Some(dir) = &args.photo_dir {
        config.storage.photo_dir = dir.clone();
    }
    if let Some(dir) = &args.signature_dir {
        config.storage.signature_dir = dir.clone();
    }
    if let Some(base) = &args.base_url {
        config.public_base_url = Some(base.clone());
    }
    if let Some(workers) = args.workers {
        config.ocr.workers = workers;
    }

    config.validate()?;
    Ok(config)
}

/// Expand glob patterns; plain paths pass through untouched
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }

        let before = paths.len();
        for entry in glob::glob(input).with_context(|| format!("Invalid pattern {}", input))? {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => tracing::warn!(pattern = %input, error = %e, "unreadable glob entry"),
            }
        }
        if paths.len() == before {
            tracing::warn!(pattern = %input, "pattern matched no files");
        }
    }
    Ok(paths)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let linker = config
        .public_base_url
        .as_deref()
        .map(AssetLinker::new)
        .transpose()?;

    let extractor = Extractor::with_defaults(config)?;
    let inputs = expand_inputs(&args.inputs)?;
    tracing::info!(documents = inputs.len(), "Starting extraction");

    let entries = run_batch(&extractor, linker.as_ref(), &inputs);

    let stdout = std::io::stdout().lock();
    if args.pretty {
        serde_json::to_writer_pretty(stdout, &entries)?;
    } else {
        serde_json::to_writer(stdout, &entries)?;
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formscan::config::StorageConfig;
    use formscan::{DocumentModel, EmbeddedImage, PageSegMode};
    use image::{DynamicImage, GrayImage};
    use tempfile::TempDir;

    struct EmptyDocument;

    impl DocumentModel for EmptyDocument {
        fn page_count(&self) -> usize {
            0
        }

        fn render_page(&self, index: usize, _dpi: u32) -> formscan::Result<DynamicImage> {
            Err(formscan::Error::PageRender {
                page: index,
                reason: "no pages".to_string(),
            })
        }

        fn embedded_images(&self, _index: usize) -> formscan::Result<Vec<EmbeddedImage>> {
            Ok(Vec::new())
        }
    }

    struct EmptyLoader;

    impl DocumentLoader for EmptyLoader {
        fn open<'a>(&'a self, _data: &'a [u8]) -> formscan::Result<Box<dyn DocumentModel + 'a>> {
            Ok(Box::new(EmptyDocument))
        }
    }

    struct Silent;

    impl TextRecognizer for Silent {
        fn recognize(&self, _image: &GrayImage, _mode: PageSegMode) -> formscan::Result<String> {
            Ok(String::new())
        }
    }

    fn extractor(dir: &TempDir) -> Extractor<EmptyLoader, Silent> {
        let config = PipelineConfig {
            storage: StorageConfig {
                photo_dir: dir.path().join("photos"),
                signature_dir: dir.path().join("signatures"),
            },
            ..PipelineConfig::default()
        };
        Extractor::new(config, EmptyLoader, Silent).unwrap()
    }

    #[test]
    fn test_entries_keep_input_order() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor(&dir);
        let missing = dir.path().join("private").join("missing.pdf");
        let blank = dir.path().join("blank.pdf");
        let text = dir.path().join("notes.pdf");
        std::fs::write(&blank, b"%PDF-1.7\n").unwrap();
        std::fs::write(&text, b"plain text").unwrap();

        let entries = run_batch(&extractor, None, &[missing, blank, text]);

        assert_eq!(entries.len(), 3);
        assert!(entries[0].record.is_none());
        assert!(entries[1].record.is_some());
        assert_eq!(entries[1].error, None);
        assert_eq!(entries[2].error.as_deref(), Some("Unsupported document"));
        assert!(entries[2].source.ends_with("notes.pdf"));
    }

    #[test]
    fn test_failed_entry_hides_local_paths() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor(&dir);
        let missing = dir.path().join("private").join("missing.pdf");

        let entries = run_batch(&extractor, None, &[missing]);

        let message = entries[0].error.as_deref().unwrap();
        assert!(message.starts_with("I/O error"));
        assert!(!message.contains("private"));

        let json = serde_json::to_string(&entries).unwrap();
        assert_eq!(json.matches("private").count(), 1, "{}", json);
    }
}
