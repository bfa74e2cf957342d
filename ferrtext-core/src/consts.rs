/// Environment variable holding the directory of the pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV_NAME: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Offset of the left dead-zone border from the page midline (loose profile).
///
/// Words whose horizontal center lies left of `mid_x - LEFT_GAP_OFFSET` are
/// assigned to the left column without looking at their left edge.
pub const LEFT_GAP_OFFSET: f32 = 30.0;

/// Offset of the right dead-zone border from the page midline (loose profile).
pub const RIGHT_GAP_OFFSET: f32 = 10.0;

/// A page is two-column only when both buckets hold strictly more words than this.
pub const MIN_WORDS_PER_COLUMN: usize = 5;

/// Maximum distance between a word's top and its line's opening top.
pub const VERTICAL_TOLERANCE: f32 = 8.0;

/// Separator between page texts in the document text.
pub const PAGE_BREAK_MARKER: &str = "\n\n";

/// Separator between the left and right column of a two-column page.
pub const COLUMN_SEPARATOR: &str = "\n\n";

/// Stricter profile: a narrow symmetric dead-zone and a larger word quorum.
pub const CONSERVATIVE_GAP_OFFSET: f32 = 10.0;
pub const CONSERVATIVE_MIN_WORDS_PER_COLUMN: usize = 20;
pub const CONSERVATIVE_VERTICAL_TOLERANCE: f32 = 5.0;
pub const CONSERVATIVE_PAGE_BREAK_MARKER: &str = "\n\u{c}\n";

/// Horizontal gap between two glyphs above which they belong to different words.
pub const WORD_GAP_TOLERANCE: f32 = 3.0;

/// Rasterization resolution used for OCR.
pub const OCR_DPI: f32 = 300.0;

/// PDF user space is 72 points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Tesseract languages used by default (Slovak, Czech, English).
pub const OCR_LANGUAGES: &str = "slk+ces+eng";

/// Tesseract page segmentation mode: automatic segmentation with OSD.
pub const OCR_PAGE_SEGMENTATION_MODE: u8 = 1;

/// Longest a single page may spend in the OCR engine.
pub const OCR_PAGE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// How often a running OCR process is checked for completion.
pub const OCR_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(20);
