pub mod analysis;
pub mod consts;
pub mod error;
pub mod layout;
pub mod parse;

// Re-export commonly used types
pub use error::FerrtextError;
pub use layout::{
    compose::{compose_document, compose_page, reconstruct_document, reconstruct_page},
    config::{LayoutConfig, Profile},
    page::{DocumentResult, PageResult},
    word::{PageWords, Word},
};
pub use parse::{
    ocr::{OcrEngine, TesseractCli},
    parser::{ParserConfig, Pdf, PdfParser, PdfSource},
    runtime::AsyncPdfParser,
};
