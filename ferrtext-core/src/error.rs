use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FerrtextError {
    #[snafu(display("Environment `{}` Not Found, error {}", name, source))]
    EnvNotFound {
        source: std::env::VarError,
        name: String,
    },
    #[snafu(display("Pdfium `{}` error {}", stage, source))]
    Pdfium {
        source: pdfium_render::prelude::PdfiumError,
        stage: String,
    },
    #[snafu(display("Parse pdf error on `{}` for {}, msg {}", stage, path, message))]
    ParserErr {
        stage: String,
        path: String,
        message: String,
    },
    #[snafu(display("Image Write error: {}", source))]
    ImageWrite {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Write `{}` error: {}", path, source))]
    IoWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Ocr `{}` error: {}", stage, message))]
    Ocr { stage: String, message: String },
    #[snafu(display("Serialize result error: {}", source))]
    Json { source: serde_json::Error },
    #[snafu(display("Invalid layout config: {}", source))]
    Config {
        source: crate::layout::config::LayoutConfigBuilderError,
    },
    #[snafu(display("Extraction timed out after {:?}", elapsed))]
    Timeout { elapsed: std::time::Duration },
    #[snafu(display("Extraction worker failed: {}", source))]
    Join { source: tokio::task::JoinError },
}
