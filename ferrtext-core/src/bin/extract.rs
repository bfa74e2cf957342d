use std::{ops::Range, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use ferrtext_core::{
    FerrtextError,
    layout::config::{LayoutConfig, LayoutConfigBuilder, Profile},
    parse::parser::{ParserConfig, Pdf, PdfParser},
};
use tracing::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "extract")]
#[command(about = "Column-aware PDF text extraction")]
struct Args {
    #[arg(help = "Input PDF file path")]
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = Profile::Loose, help = "Preset of layout tunables")]
    profile: Profile,

    #[arg(long, help = "Dead-zone offset left of the page midline")]
    left_gap: Option<f32>,

    #[arg(long, help = "Dead-zone offset right of the page midline")]
    right_gap: Option<f32>,

    #[arg(long, help = "Both columns need strictly more words than this")]
    min_words: Option<usize>,

    #[arg(long, help = "Vertical tolerance of line grouping")]
    tolerance: Option<f32>,

    #[arg(long, help = "Separator between pages in fullText")]
    page_break: Option<String>,

    #[arg(long, value_parser = parse_page_range, help = "Zero-based page range START..END")]
    pages: Option<Range<u16>>,

    #[arg(long, help = "Document password")]
    password: Option<String>,

    #[arg(long, help = "OCR scanned documents with tesseract")]
    ocr: bool,

    #[arg(long, help = "Reconstruct pages on a single thread")]
    sequential: bool,

    #[arg(long, help = "Keep extracted text as pdfium reports it")]
    no_clean: bool,

    #[arg(long, help = "Write column overlays for every page into this directory")]
    debug: Option<PathBuf>,

    #[arg(long, help = "Print only the document text")]
    text: bool,

    #[arg(long, help = "Emit logs as JSON")]
    log_json: bool,
}

impl Args {
    fn layout_builder(&self) -> LayoutConfigBuilder {
        let mut builder = LayoutConfig::builder_from(self.profile);
        if let Some(offset) = self.left_gap {
            builder.left_gap_offset(offset);
        }
        if let Some(offset) = self.right_gap {
            builder.right_gap_offset(offset);
        }
        if let Some(min_words) = self.min_words {
            builder.min_words_per_column(min_words);
        }
        if let Some(tolerance) = self.tolerance {
            builder.vertical_tolerance(tolerance);
        }
        if let Some(marker) = self.page_break.as_deref() {
            builder.page_break_marker(unescape(marker));
        }
        builder
    }

    fn parser_config(&self) -> Result<ParserConfig, FerrtextError> {
        Ok(ParserConfig {
            auto_clean_text: !self.no_clean,
            parallel: !self.sequential,
            ocr_fallback: self.ocr,
            ..ParserConfig::with_layout(&self.layout_builder())?
        })
    }

    fn pdf(&self) -> Pdf {
        let mut pdf = Pdf::from_path(&self.input);
        pdf.password = self.password.clone();
        pdf.range = self.pages.clone();
        pdf.debug = self.debug.clone();
        pdf
    }
}

fn parse_page_range(value: &str) -> Result<Range<u16>, String> {
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got `{value}`"))?;
    let start = start.trim().parse::<u16>().map_err(|e| e.to_string())?;
    let end = end.trim().parse::<u16>().map_err(|e| e.to_string())?;
    if end < start {
        return Err(format!("empty page range `{value}`"));
    }
    Ok(start..end)
}

/// Expands `\n`, `\t`, `\f` and `\\` written on the command line.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{c}'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = args.parser_config().context("invalid layout options")?;
    let parser = PdfParser::new(config).context("cannot initialize pdfium")?;
    let result = parser.extract(&args.pdf());

    if args.text {
        println!("{}", result.full_text);
    } else {
        println!("{}", result.to_json()?);
    }

    if result.success {
        info!("extracted {} pages", result.pages.len());
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
