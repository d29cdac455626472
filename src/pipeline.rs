//! Document to record pipeline

use crate::assets::{assign_roles, extract_assets, AssetStore};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::extract::FieldExtractor;
use crate::ocr::{build_pool, recognize_pages, TesseractCli, TextRecognizer};
use crate::pdf::{validate_header, DocumentLoader, DocumentModel, PdfiumLoader};
use crate::record::{assemble, StructuredRecord};
use image::DynamicImage;
use rayon::ThreadPool;

/// Turns application form PDFs into [`StructuredRecord`]s.
///
/// Stages run to completion one after the other for each document: render,
/// recognize, extract fields, extract images, classify, assemble. Only page
/// recognition runs in parallel.
pub struct Extractor<L, R> {
    config: PipelineConfig,
    loader: L,
    recognizer: R,
    fields: FieldExtractor,
    store: AssetStore,
    pool: ThreadPool,
}

impl Extractor<PdfiumLoader, TesseractCli> {
    /// PDFium rendering with the `tesseract` executable
    pub fn with_defaults(config: PipelineConfig) -> Result<Self> {
        let loader = PdfiumLoader::new()?;
        let recognizer = TesseractCli::new(&config.ocr);
        Self::new(config, loader, recognizer)
    }
}

impl<L, R> Extractor<L, R>
where
    L: DocumentLoader,
    R: TextRecognizer,
{
    /// Validate `config`, compile its rule catalogue and create the asset
    /// directories
    pub fn new(config: PipelineConfig, loader: L, recognizer: R) -> Result<Self> {
        config.validate()?;

        let fields = FieldExtractor::new(config.catalogue())?;
        let store = AssetStore::new(&config.storage);
        store.ensure_dirs()?;
        let pool = build_pool(config.ocr.workers)?;

        tracing::info!(
            template = %config.template,
            custom_rules = config.rules.is_some(),
            workers = pool.current_num_threads(),
            "extractor ready"
        );

        Ok(Self {
            config,
            loader,
            recognizer,
            fields,
            store,
            pool,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Process one document.
    ///
    /// Fails only when the bytes are not a readable PDF. Everything after
    /// that degrades: unreadable pages contribute no text, unmatched fields
    /// hold the sentinel and unwritable images are dropped.
    pub fn process(&self, data: &[u8]) -> Result<StructuredRecord> {
        validate_header(data)?;
        let document = self.loader.open(data)?;
        let page_count = document.page_count();

        let rendered = self.render_pages(document.as_ref());
        let text = recognize_pages(
            rendered,
            &self.recognizer,
            self.config.ocr.page_seg_mode,
            &self.config.preprocess,
            &self.pool,
        );
        if text.is_blank() {
            tracing::warn!(pages = page_count, "no text recognized in document");
        }

        let fields = self.fields.extract(&text.full_text);
        let assets = extract_assets(document.as_ref(), &self.store);
        let assignment = assign_roles(&assets, &self.store);

        tracing::info!(
            pages = page_count,
            images = assets.len(),
            photo = assignment.photo.is_some(),
            signature = assignment.signature.is_some(),
            "document processed"
        );

        Ok(assemble(fields, assignment))
    }

    /// Process documents one at a time in submission order.
    ///
    /// One result per input; a failing document does not stop the batch.
    pub fn process_batch<I, B>(&self, documents: I) -> Vec<Result<StructuredRecord>>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        documents
            .into_iter()
            .enumerate()
            .map(|(index, data)| {
                let result = self.process(data.as_ref());
                if let Err(e) = &result {
                    tracing::warn!(document = index, error = %e, "document rejected");
                }
                result
            })
            .collect()
    }

    fn render_pages(&self, document: &dyn DocumentModel) -> Vec<Option<DynamicImage>> {
        let dpi = self.config.raster.dpi;
        (0..document.page_count())
            .map(|index| match document.render_page(index, dpi) {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "page render failed");
                    None
                }
            })
            .collect()
    }
}
