use crate::analysis::bbox::Bbox;

/// A positioned word as produced by the ingestion backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub bbox: Bbox,
}

impl Word {
    pub fn new(text: impl Into<String>, bbox: Bbox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }

    /// Builds a word from the `(x0, x1, top)` triple; the bottom edge is
    /// left equal to `top` when the backend does not report one.
    pub fn from_extents(text: impl Into<String>, x0: f32, x1: f32, top: f32) -> Self {
        Self::new(text, Bbox::from_edges(x0, top, x1, top))
    }

    pub fn x0(&self) -> f32 {
        self.bbox.min.x
    }

    pub fn x1(&self) -> f32 {
        self.bbox.max.x
    }

    pub fn top(&self) -> f32 {
        self.bbox.min.y
    }

    /// Horizontal center, `(x0 + x1) / 2`.
    pub fn center_x(&self) -> f32 {
        self.bbox.center().x
    }
}

/// Everything the layout stage needs to know about one page, fully
/// materialized before reconstruction starts.
#[derive(Debug, Clone, Default)]
pub struct PageWords {
    /// Physical page number, starting at 1.
    pub page_number: usize,
    pub width: f32,
    pub height: f32,
    pub words: Vec<Word>,
    /// Whole-page text used when no word geometry is available.
    pub fallback_text: String,
}

impl PageWords {
    pub fn new(page_number: usize, width: f32, height: f32, words: Vec<Word>) -> Self {
        Self {
            page_number,
            width,
            height,
            words,
            fallback_text: String::new(),
        }
    }

    pub fn with_fallback_text(mut self, fallback_text: impl Into<String>) -> Self {
        self.fallback_text = fallback_text.into();
        self
    }

    /// A page with no words and no usable fallback text.
    pub fn is_blank(&self) -> bool {
        self.words.is_empty() && self.fallback_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_extents() {
        let word = Word::from_extents("column", 100.0, 140.0, 72.0);
        assert_eq!(word.x0(), 100.0);
        assert_eq!(word.x1(), 140.0);
        assert_eq!(word.top(), 72.0);
        assert_eq!(word.center_x(), 120.0);
    }

    #[test]
    fn test_page_words_blank() {
        let page = PageWords::new(1, 612.0, 792.0, Vec::new());
        assert!(page.is_blank());

        let page = page.with_fallback_text("  \n ");
        assert!(page.is_blank());

        let page = page.with_fallback_text("raw text");
        assert!(!page.is_blank());

        let page = PageWords::new(2, 612.0, 792.0, vec![Word::from_extents("a", 0.0, 5.0, 0.0)]);
        assert!(!page.is_blank());
    }
}
