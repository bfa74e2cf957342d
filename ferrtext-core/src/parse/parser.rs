use std::{
    fmt,
    ops::Range,
    path::{Path, PathBuf},
    time::Instant,
};

use bytes::Bytes;
use pdfium_render::prelude::{PdfDocument, PdfPage, Pdfium};
use snafu::ResultExt;
use tracing::*;
use uuid::Uuid;

use crate::{
    consts::*,
    error::{ConfigSnafu, EnvNotFoundSnafu, FerrtextError, IoWriteSnafu, PdfiumSnafu},
    layout::{
        compose::{compose_document, reconstruct_document},
        config::{LayoutConfig, LayoutConfigBuilder},
        page::DocumentResult,
        word::PageWords,
    },
    parse::{
        ocr::{OcrEngine, TesseractCli, ocr_scale, recognize_pages},
        render::{encode_png, render_page, write_debug_page},
        words::{extract_fallback_text, extract_words},
    },
};

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub layout: LayoutConfig,
    /// Repair mojibake and odd unicode in extracted text.
    pub auto_clean_text: bool,
    pub word_gap_tolerance: f32,
    /// Reconstruct pages on the rayon pool.
    pub parallel: bool,
    /// OCR the document when no page carries a text layer.
    pub ocr_fallback: bool,
    /// Page-space to pixel scale of the debug overlay.
    pub debug_scale: f32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            auto_clean_text: true,
            word_gap_tolerance: WORD_GAP_TOLERANCE,
            parallel: true,
            ocr_fallback: false,
            debug_scale: 2.0,
        }
    }
}

impl ParserConfig {
    pub fn with_layout(layout: &LayoutConfigBuilder) -> Result<Self, FerrtextError> {
        Ok(Self {
            layout: layout.build().context(ConfigSnafu)?,
            ..Self::default()
        })
    }
}

pub enum PdfSource {
    Path(PathBuf),
    Bytes(Bytes),
}

impl fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            PdfSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

/// One extraction request.
#[derive(Debug)]
pub struct Pdf {
    pub uuid: Uuid,
    pub source: PdfSource,
    pub password: Option<String>,
    /// Zero-based page indices; the whole document when `None`.
    pub range: Option<Range<u16>>,
    /// Directory receiving a column overlay per page.
    pub debug: Option<PathBuf>,
}

impl Pdf {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(PdfSource::Path(path.into()))
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::new(PdfSource::Bytes(bytes.into()))
    }

    fn new(source: PdfSource) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            source,
            password: None,
            range: None,
            debug: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_range(mut self, range: Range<u16>) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_debug(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug = Some(dir.into());
        self
    }

    /// Human readable origin, used in errors and logs.
    pub fn display_name(&self) -> String {
        match &self.source {
            PdfSource::Path(path) => path.to_string_lossy().to_string(),
            PdfSource::Bytes(_) => format!("<memory:{}>", self.uuid),
        }
    }
}

/// Stages of one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadDocument,
    WordExtraction,
    Reconstruction,
    Ocr,
    DebugOverlay,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadDocument => "load-document",
            Stage::WordExtraction => "word-extraction",
            Stage::Reconstruction => "reconstruction",
            Stage::Ocr => "ocr",
            Stage::DebugOverlay => "debug-overlay",
        };
        f.write_str(name)
    }
}

/// Runs one stage, logging its duration and outcome.
fn run_stage<T>(stage: Stage, task: impl FnOnce() -> Result<T, FerrtextError>) -> Result<T, FerrtextError> {
    let start = Instant::now();
    info!("Executing stage {stage}");

    let result = task();
    let duration = start.elapsed();

    match &result {
        Ok(_) => info!("Stage {stage} completed in {:?}", duration),
        Err(e) => error!("Stage {stage} failed after {:?}: {}", duration, e),
    }

    result
}

/// Resolves the requested page range against the document length.
///
/// The end is clamped to the page count; a start past the last page is an error.
pub fn resolve_range(page_count: u16, range: Option<&Range<u16>>) -> Option<Range<u16>> {
    match range {
        None => Some(0..page_count),
        Some(range) if range.start > page_count => None,
        Some(range) if range.start == page_count && page_count > 0 => None,
        Some(range) => Some(range.start..range.end.min(page_count).max(range.start)),
    }
}

/// True when there is at least one page and none of them has words or
/// fallback text, i.e. the document needs OCR.
pub fn lacks_text_layer(pages: &[PageWords]) -> bool {
    !pages.is_empty() && pages.iter().all(PageWords::is_blank)
}

pub struct PdfParser {
    pub pdfium: Pdfium,
    pub config: ParserConfig,
    ocr: Option<Box<dyn OcrEngine>>,
}

impl PdfParser {
    /// Binds pdfium from the directory named by `PDFIUM_DYNAMIC_LIB_PATH`.
    #[tracing::instrument(skip_all)]
    pub fn new(config: ParserConfig) -> Result<Self, FerrtextError> {
        info!("Fetching PDFium library path from environment variable.");
        let pdfium_lib_path =
            std::env::var(PDFIUM_LIB_PATH_ENV_NAME).context(EnvNotFoundSnafu {
                name: PDFIUM_LIB_PATH_ENV_NAME,
            })?;

        info!("Creating PDFium instance.");
        let pdfium = Pdfium::new(
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                &pdfium_lib_path,
            ))
            .context(PdfiumSnafu {
                stage: "load-dyn-lib",
            })?,
        );

        Ok(Self::with_pdfium(pdfium, config))
    }

    pub fn with_pdfium(pdfium: Pdfium, config: ParserConfig) -> Self {
        let ocr: Option<Box<dyn OcrEngine>> = if config.ocr_fallback {
            Some(Box::new(TesseractCli::default()))
        } else {
            None
        };

        Self { pdfium, config, ocr }
    }

    /// Replaces the OCR engine and turns the OCR fallback on.
    pub fn with_ocr_engine(mut self, engine: impl OcrEngine + 'static) -> Self {
        self.config.ocr_fallback = true;
        self.ocr = Some(Box::new(engine));
        self
    }

    /// Extracts the document and never fails: an ingestion error is reported
    /// through `success = false` and `error`.
    pub fn extract(&self, pdf: &Pdf) -> DocumentResult {
        self.parse(pdf).unwrap_or_else(|err| {
            error!("extraction of {} failed: {}", pdf.display_name(), err);
            DocumentResult::failure(err)
        })
    }

    #[tracing::instrument(skip_all, fields(pdf = %pdf.uuid))]
    pub fn parse(&self, pdf: &Pdf) -> Result<DocumentResult, FerrtextError> {
        info!("Starting extraction of {}.", pdf.display_name());

        let document = run_stage(Stage::LoadDocument, || self.load_pdf(pdf))?;
        let range = self.page_range(&document, pdf)?;

        let pages = run_stage(Stage::WordExtraction, || {
            Ok(self.extract_page_words(&document, range.clone()))
        })?;

        if let Some(dir) = pdf.debug.as_ref() {
            // overlay problems never change the extraction result
            let _ = run_stage(Stage::DebugOverlay, || {
                self.draw_debug_overlays(&document, range.clone(), &pages, dir)
            });
        }

        if self.config.ocr_fallback && lacks_text_layer(&pages) {
            if let Some(engine) = self.ocr.as_deref() {
                return run_stage(Stage::Ocr, || Ok(self.ocr_document(&document, &pages, engine)));
            }
        }

        run_stage(Stage::Reconstruction, || {
            Ok(reconstruct_document(
                &pages,
                &self.config.layout,
                self.config.parallel,
            ))
        })
    }

    fn load_pdf<'a>(&'a self, pdf: &'a Pdf) -> Result<PdfDocument<'a>, FerrtextError> {
        let password = pdf.password.as_deref();
        match &pdf.source {
            PdfSource::Path(path) => self
                .pdfium
                .load_pdf_from_file(path, password)
                .context(PdfiumSnafu {
                    stage: "load-pdf-by-path",
                }),
            PdfSource::Bytes(bytes) => self
                .pdfium
                .load_pdf_from_byte_slice(bytes, password)
                .context(PdfiumSnafu {
                    stage: "load-pdf-by-bytes",
                }),
        }
    }

    fn page_range(&self, document: &PdfDocument<'_>, pdf: &Pdf) -> Result<Range<u16>, FerrtextError> {
        let page_count = document.pages().len();
        resolve_range(page_count, pdf.range.as_ref()).ok_or_else(|| FerrtextError::ParserErr {
            stage: "parse-pdf".to_string(),
            path: pdf.display_name(),
            message: format!(
                "range {:?} starts after the last of {} pages",
                pdf.range, page_count
            ),
        })
    }

    /// Reads words for every page in `range`. Pages are read one at a time;
    /// a page pdfium cannot read yields an empty page instead of an error.
    fn extract_page_words(&self, document: &PdfDocument<'_>, range: Range<u16>) -> Vec<PageWords> {
        let pages = document.pages();
        range
            .map(|index| {
                let page_number = index as usize + 1;
                match pages.get(index) {
                    Ok(page) => self.read_page(&page, page_number),
                    Err(err) => {
                        warn!("cannot open page {page_number}: {err}");
                        PageWords {
                            page_number,
                            ..PageWords::default()
                        }
                    }
                }
            })
            .collect()
    }

    fn read_page(&self, page: &PdfPage<'_>, page_number: usize) -> PageWords {
        let width = page.width().value;
        let height = page.height().value;
        let clean = self.config.auto_clean_text;

        let words = extract_words(page, self.config.word_gap_tolerance, clean).unwrap_or_else(|err| {
            warn!("no word geometry on page {page_number}: {err}");
            Vec::new()
        });
        debug!("page {page_number}: {} words", words.len());

        let page_words = PageWords::new(page_number, width, height, words);
        if !page_words.words.is_empty() {
            return page_words;
        }

        match extract_fallback_text(page, clean) {
            Ok(text) => page_words.with_fallback_text(text),
            Err(err) => {
                warn!("no text on page {page_number}: {err}");
                page_words
            }
        }
    }

    fn ocr_document(
        &self,
        document: &PdfDocument<'_>,
        pages: &[PageWords],
        engine: &dyn OcrEngine,
    ) -> DocumentResult {
        info!("no text layer found, running {} on {} pages", engine.name(), pages.len());
        let scale = ocr_scale();
        let document_pages = document.pages();

        let results = recognize_pages(pages, engine, |page_words| {
            let index = (page_words.page_number - 1) as u16;
            let page = document_pages.get(index).context(PdfiumSnafu { stage: "ocr-page" })?;
            let image = render_page(&page, scale)?;
            encode_png(&image)
        });

        compose_document(results, &self.config.layout.page_break_marker)
    }

    fn draw_debug_overlays(
        &self,
        document: &PdfDocument<'_>,
        range: Range<u16>,
        pages: &[PageWords],
        dir: &Path,
    ) -> Result<(), FerrtextError> {
        std::fs::create_dir_all(dir).context(IoWriteSnafu {
            path: dir.to_string_lossy(),
        })?;

        let document_pages = document.pages();
        for (index, page_words) in range.zip(pages) {
            let page = document_pages.get(index).context(PdfiumSnafu { stage: "debug-page" })?;
            write_debug_page(
                &page,
                page_words,
                &self.config.layout,
                self.config.debug_scale,
                dir,
            )?;
        }

        Ok(())
    }
}
