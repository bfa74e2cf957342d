use std::{sync::Arc, time::Duration};

use snafu::ResultExt;
use tokio::{task, time};
use tracing::*;

use crate::{
    error::{FerrtextError, JoinSnafu},
    layout::page::DocumentResult,
    parse::parser::{Pdf, PdfParser},
};

/// Runs extractions on tokio's blocking pool so async callers are not stalled
/// by pdfium.
#[derive(Clone)]
pub struct AsyncPdfParser {
    parser: Arc<PdfParser>,
}

impl AsyncPdfParser {
    pub fn new(parser: PdfParser) -> Self {
        Self {
            parser: Arc::new(parser),
        }
    }

    /// Like [`PdfParser::parse`], optionally bounded by `timeout`.
    #[tracing::instrument(skip_all, fields(pdf = %pdf.uuid))]
    pub async fn parse(
        &self,
        pdf: Pdf,
        timeout: Option<Duration>,
    ) -> Result<DocumentResult, FerrtextError> {
        let parser = Arc::clone(&self.parser);
        run_blocking(move || parser.parse(&pdf), timeout).await
    }

    /// Like [`PdfParser::extract`]: every failure, including a timeout, becomes
    /// an unsuccessful [`DocumentResult`].
    pub async fn extract(&self, pdf: Pdf, timeout: Option<Duration>) -> DocumentResult {
        settle(self.parse(pdf, timeout).await)
    }
}

/// Runs `job` on the blocking pool inside the current span.
///
/// On timeout the blocking task keeps running to completion; its result is
/// dropped. A panicking job surfaces as [`FerrtextError::Join`].
pub async fn run_blocking<F>(job: F, timeout: Option<Duration>) -> Result<DocumentResult, FerrtextError>
where
    F: FnOnce() -> Result<DocumentResult, FerrtextError> + Send + 'static,
{
    let span = Span::current();
    let handle = task::spawn_blocking(move || {
        let _guard = span.enter();
        job()
    });

    match timeout {
        Some(limit) => match time::timeout(limit, handle).await {
            Ok(joined) => joined.context(JoinSnafu)?,
            Err(_) => {
                warn!("extraction exceeded {:?}", limit);
                Err(FerrtextError::Timeout { elapsed: limit })
            }
        },
        None => handle.await.context(JoinSnafu)?,
    }
}

fn settle(result: Result<DocumentResult, FerrtextError>) -> DocumentResult {
    result.unwrap_or_else(DocumentResult::failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::page::PageResult;

    fn one_page() -> Result<DocumentResult, FerrtextError> {
        Ok(DocumentResult {
            success: true,
            pages: vec![PageResult {
                page_number: 1,
                text: "done".to_string(),
                has_columns: false,
            }],
            full_text: "done".to_string(),
            error: None,
        })
    }

    #[tokio::test]
    async fn test_job_within_timeout() {
        let result = run_blocking(one_page, Some(Duration::from_secs(5))).await.unwrap();
        assert!(result.success);
        assert_eq!(result.full_text, "done");

        let result = run_blocking(one_page, None).await.unwrap();
        assert_eq!(result.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_job_times_out() {
        let limit = Duration::from_millis(20);
        let err = run_blocking(
            || {
                std::thread::sleep(Duration::from_millis(500));
                one_page()
            },
            Some(limit),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FerrtextError::Timeout { elapsed } if elapsed == limit));

        let document = settle(Err(err));
        assert!(!document.success);
        assert!(document.pages.is_empty());
        assert!(document.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_panicking_job_is_a_join_error() {
        let err = run_blocking(
            || -> Result<DocumentResult, FerrtextError> { panic!("pdfium crashed") },
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FerrtextError::Join { .. }));

        let document = settle(Err(err));
        assert!(!document.success);
        assert!(document.error.unwrap().starts_with("Extraction worker failed"));
    }

    #[tokio::test]
    async fn test_job_error_passes_through() {
        let err = run_blocking(
            || {
                Err(FerrtextError::ParserErr {
                    stage: "parse-pdf".to_string(),
                    path: "a.pdf".to_string(),
                    message: "range".to_string(),
                })
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FerrtextError::ParserErr { .. }));
    }
}
