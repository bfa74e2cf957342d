use std::{
    io::{Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::*;

use crate::{
    consts::*,
    error::FerrtextError,
    layout::{page::PageResult, word::PageWords},
};

/// Turns a rasterized page into plain text.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// `png` is a PNG-encoded page image.
    fn recognize(&self, png: &[u8]) -> Result<String, FerrtextError>;
}

/// Runs the `tesseract` executable, feeding the page image through stdin.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub program: String,
    pub languages: String,
    pub page_segmentation_mode: u8,
    /// Per-page limit; the process is killed once it passes.
    pub timeout: Duration,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            program: "tesseract".to_string(),
            languages: OCR_LANGUAGES.to_string(),
            page_segmentation_mode: OCR_PAGE_SEGMENTATION_MODE,
            timeout: OCR_PAGE_TIMEOUT,
        }
    }
}

impl TesseractCli {
    pub fn with_languages(mut self, languages: impl Into<String>) -> Self {
        self.languages = languages.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.languages.clone(),
            "--psm".to_string(),
            self.page_segmentation_mode.to_string(),
        ]
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        &self.program
    }

    fn recognize(&self, png: &[u8]) -> Result<String, FerrtextError> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| FerrtextError::Ocr {
                stage: "spawn".to_string(),
                message: format!("cannot start `{}`: {err}", self.program),
            })?;

        // pipes are serviced off-thread while the child is polled
        let writer = child.stdin.take().map(|mut stdin| {
            let png = png.to_vec();
            thread::spawn(move || stdin.write_all(&png))
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_timeout(&mut child, self.timeout)?;

        if let Some(Err(err)) = writer.and_then(|handle| handle.join().ok()) {
            debug!("{} did not take the whole image: {}", self.program, err);
        }
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(FerrtextError::Ocr {
                stage: "recognize".to_string(),
                message: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

/// Polls the child until it exits, killing it once `timeout` has passed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, FerrtextError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if start.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FerrtextError::Ocr {
                    stage: "timeout".to_string(),
                    message: format!("no result after {:?}, process killed", timeout),
                });
            }
            Ok(None) => thread::sleep(OCR_POLL_INTERVAL),
            Err(err) => {
                return Err(FerrtextError::Ocr {
                    stage: "wait".to_string(),
                    message: err.to_string(),
                });
            }
        }
    }
}

/// Scale from page space to pixels at the OCR resolution.
pub fn ocr_scale() -> f32 {
    OCR_DPI / POINTS_PER_INCH
}

/// Recognizes every page in order. A page whose image or recognition fails
/// keeps empty text; the failure is only logged.
pub fn recognize_pages<F>(pages: &[PageWords], engine: &dyn OcrEngine, mut page_image: F) -> Vec<PageResult>
where
    F: FnMut(&PageWords) -> Result<Vec<u8>, FerrtextError>,
{
    pages
        .iter()
        .map(|page| {
            let text = page_image(page)
                .and_then(|png| engine.recognize(&png))
                .unwrap_or_else(|err| {
                    warn!(
                        "{} failed on page {}: {}",
                        engine.name(),
                        page.page_number,
                        err
                    );
                    String::new()
                });
            info!("ocr page {} produced {} chars", page.page_number, text.chars().count());

            PageResult {
                page_number: page.page_number,
                text,
                has_columns: false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoEngine;

    impl OcrEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        fn recognize(&self, png: &[u8]) -> Result<String, FerrtextError> {
            if png.is_empty() {
                return Err(FerrtextError::Ocr {
                    stage: "recognize".to_string(),
                    message: "empty image".to_string(),
                });
            }
            Ok(String::from_utf8_lossy(png).to_string())
        }
    }

    fn blank_pages(count: usize) -> Vec<PageWords> {
        (1..=count)
            .map(|n| PageWords::new(n, 600.0, 800.0, Vec::new()))
            .collect()
    }

    #[test]
    fn test_recognize_pages_in_order() {
        let pages = blank_pages(3);
        let results = recognize_pages(&pages, &EchoEngine, |page| {
            Ok(format!("scan {}", page.page_number).into_bytes())
        });

        let texts = results.iter().map(|r| r.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["scan 1", "scan 2", "scan 3"]);
        assert!(results.iter().all(|r| !r.has_columns));
    }

    #[test]
    fn test_failed_page_keeps_empty_text() {
        let pages = blank_pages(3);
        let results = recognize_pages(&pages, &EchoEngine, |page| match page.page_number {
            1 => Ok(b"first".to_vec()),
            2 => Ok(Vec::new()),
            _ => Err(FerrtextError::Ocr {
                stage: "render".to_string(),
                message: "no bitmap".to_string(),
            }),
        });

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "first");
        assert_eq!(results[1].text, "");
        assert_eq!(results[2].text, "");
        assert_eq!(results[2].page_number, 3);
    }

    #[test]
    fn test_tesseract_arguments() {
        let tesseract = TesseractCli::default();
        assert_eq!(
            tesseract.args(),
            vec!["stdin", "stdout", "-l", "slk+ces+eng", "--psm", "1"]
        );
        assert_eq!(tesseract.with_languages("eng").args()[3], "eng");
    }

    #[test]
    fn test_missing_executable_is_an_ocr_error() {
        let tesseract = TesseractCli {
            program: "ferrtext-no-such-ocr-binary".to_string(),
            ..TesseractCli::default()
        };
        let err = tesseract.recognize(b"png").unwrap_err();
        assert!(matches!(err, FerrtextError::Ocr { ref stage, .. } if stage == "spawn"));
    }

    #[test]
    fn test_ocr_scale_is_300_dpi() {
        assert!((ocr_scale() - 300.0 / 72.0).abs() < f32::EPSILON);
    }

    /// Writes an executable shell script standing in for tesseract.
    #[cfg(unix)]
    fn stand_in(name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("ferrtext-ocr-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Retries while a freshly written script is still reported busy.
    #[cfg(unix)]
    fn recognize_with(tesseract: &TesseractCli) -> Result<String, FerrtextError> {
        for _ in 0..5 {
            match tesseract.recognize(b"png bytes") {
                Err(FerrtextError::Ocr { ref stage, ref message })
                    if stage == "spawn" && message.contains("busy") =>
                {
                    thread::sleep(Duration::from_millis(50));
                }
                result => return result,
            }
        }
        tesseract.recognize(b"png bytes")
    }

    #[cfg(unix)]
    #[test]
    fn test_stand_in_output_is_trimmed() {
        let tesseract = TesseractCli {
            program: stand_in("fast.sh", "cat > /dev/null\necho '  recognized text  '")
                .to_string_lossy()
                .to_string(),
            ..TesseractCli::default()
        };
        assert_eq!(recognize_with(&tesseract).unwrap(), "recognized text");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_process_reports_stderr() {
        let tesseract = TesseractCli {
            program: stand_in("fail.sh", "cat > /dev/null\necho 'bad image' >&2\nexit 3")
                .to_string_lossy()
                .to_string(),
            ..TesseractCli::default()
        };
        let err = recognize_with(&tesseract).unwrap_err();
        assert!(
            matches!(err, FerrtextError::Ocr { ref stage, ref message } if stage == "recognize" && message == "bad image")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_process_is_killed_after_timeout() {
        let tesseract = TesseractCli {
            program: stand_in("slow.sh", "cat > /dev/null\nsleep 4\necho late")
                .to_string_lossy()
                .to_string(),
            ..TesseractCli::default()
        }
        .with_timeout(Duration::from_millis(300));

        let start = Instant::now();
        let err = recognize_with(&tesseract).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(2), "took {:?}", start.elapsed());
        assert!(matches!(err, FerrtextError::Ocr { ref stage, .. } if stage == "timeout"));

        // the timed-out page is left empty, the document carries on
        let pages = blank_pages(1);
        let results = recognize_pages(&pages, &tesseract, |_| Ok(b"png".to_vec()));
        assert_eq!(results[0].text, "");
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(TesseractCli::default().timeout, Duration::from_secs(60));
    }
}
