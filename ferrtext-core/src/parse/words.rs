use pdfium_render::prelude::PdfPage;
use plsfix::fix_text;
use snafu::ResultExt;

use crate::{
    analysis::bbox::Bbox,
    error::{FerrtextError, PdfiumSnafu},
    layout::word::Word,
};

/// Groups glyphs, delivered in content-stream order, into words.
///
/// A word ends at whitespace or control characters, when the next glyph is
/// more than `gap_tolerance` to the right of the word, when it jumps back to
/// the left, or when it moves vertically by more than the word's height.
#[derive(Debug)]
pub struct WordBuilder {
    gap_tolerance: f32,
    words: Vec<Word>,
    text: String,
    bbox: Option<Bbox>,
}

impl WordBuilder {
    pub fn new(gap_tolerance: f32) -> Self {
        Self {
            gap_tolerance,
            words: Vec::new(),
            text: String::new(),
            bbox: None,
        }
    }

    pub fn push(&mut self, ch: char, glyph: Bbox) {
        if ch.is_whitespace() || ch.is_control() {
            self.break_word();
            return;
        }

        if let Some(current) = self.bbox {
            if self.is_detached(&current, &glyph) {
                self.break_word();
            }
        }

        self.text.push(ch);
        self.bbox = Some(match self.bbox {
            Some(current) => current.union(&glyph),
            None => glyph,
        });
    }

    fn is_detached(&self, current: &Bbox, glyph: &Bbox) -> bool {
        let gap = glyph.min.x - current.max.x;
        let backwards = glyph.max.x < current.min.x;
        let line_height = current.height().max(1.0);
        let vertical_jump = (glyph.min.y - current.min.y).abs() > line_height;

        gap > self.gap_tolerance || backwards || vertical_jump
    }

    /// Closes the open word, if any.
    pub fn break_word(&mut self) {
        if let Some(bbox) = self.bbox.take() {
            let text = std::mem::take(&mut self.text);
            self.words.push(Word::new(text, bbox));
        }
    }

    pub fn finish(mut self) -> Vec<Word> {
        self.break_word();
        self.words
    }
}

/// Reads a pdfium page's glyphs and returns its words in page space with a
/// top-left origin.
///
/// Glyphs whose bounds pdfium cannot report are dropped.
pub fn extract_words(
    page: &PdfPage<'_>,
    gap_tolerance: f32,
    clean_text: bool,
) -> Result<Vec<Word>, FerrtextError> {
    let page_height = page.height().value;
    let text = page.text().context(PdfiumSnafu { stage: "text" })?;

    let mut builder = WordBuilder::new(gap_tolerance);
    for glyph in text.chars().iter() {
        let Some(ch) = glyph.unicode_char() else {
            builder.break_word();
            continue;
        };
        let Ok(rect) = glyph.loose_bounds() else {
            continue;
        };
        let bbox = Bbox::from_edges(
            rect.left().value,
            page_height - rect.top().value,
            rect.right().value,
            page_height - rect.bottom().value,
        );
        builder.push(ch, bbox);
    }

    let mut words = builder.finish();
    if clean_text {
        for word in words.iter_mut() {
            word.text = fix_text(&word.text, None);
        }
        words.retain(|word| !word.text.trim().is_empty());
    }

    Ok(words)
}

/// Whole-page text as pdfium serializes it, used when word geometry is missing.
pub fn extract_fallback_text(page: &PdfPage<'_>, clean_text: bool) -> Result<String, FerrtextError> {
    let text = page
        .text()
        .context(PdfiumSnafu { stage: "fallback-text" })?
        .all();

    Ok(if clean_text { fix_text(&text, None) } else { text })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds `text` as fixed-width glyphs starting at `x`, `advance` units apart.
    fn feed(builder: &mut WordBuilder, text: &str, x: f32, top: f32, advance: f32) {
        for (i, ch) in text.chars().enumerate() {
            let x0 = x + i as f32 * advance;
            builder.push(ch, Bbox::from_edges(x0, top, x0 + 5.0, top + 10.0));
        }
    }

    fn texts(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.text.as_str()).collect()
    }

    #[test]
    fn test_whitespace_splits_words() {
        let mut builder = WordBuilder::new(3.0);
        feed(&mut builder, "two words", 10.0, 100.0, 5.0);
        let words = builder.finish();
        assert_eq!(texts(&words), vec!["two", "words"]);
        assert_eq!(words[0].x0(), 10.0);
        assert_eq!(words[0].x1(), 25.0);
        assert_eq!(words[0].top(), 100.0);
        assert_eq!(words[1].x0(), 30.0);
    }

    #[test]
    fn test_horizontal_gap_splits_words() {
        let mut builder = WordBuilder::new(3.0);
        feed(&mut builder, "left", 10.0, 100.0, 5.0);
        // 20 units after the end of "left", no space glyph in between
        feed(&mut builder, "right", 50.0, 100.0, 5.0);
        assert_eq!(texts(&builder.finish()), vec!["left", "right"]);
    }

    #[test]
    fn test_new_line_splits_words() {
        let mut builder = WordBuilder::new(3.0);
        feed(&mut builder, "end", 10.0, 100.0, 5.0);
        // wraps back to the left margin on the next line
        feed(&mut builder, "next", 10.0, 114.0, 5.0);
        assert_eq!(texts(&builder.finish()), vec!["end", "next"]);
    }

    #[test]
    fn test_column_jump_splits_words() {
        let mut builder = WordBuilder::new(3.0);
        feed(&mut builder, "left", 300.0, 100.0, 5.0);
        // content stream continues in the left column at the same height
        feed(&mut builder, "again", 20.0, 100.0, 5.0);
        assert_eq!(texts(&builder.finish()), vec!["left", "again"]);
    }

    #[test]
    fn test_small_kerning_keeps_word() {
        let mut builder = WordBuilder::new(3.0);
        // 2 units between glyphs: inside the tolerance
        feed(&mut builder, "kern", 10.0, 100.0, 7.0);
        let words = builder.finish();
        assert_eq!(texts(&words), vec!["kern"]);
        assert_eq!(words[0].x1(), 36.0);
    }

    #[test]
    fn test_empty_builder() {
        let mut builder = WordBuilder::new(3.0);
        builder.break_word();
        assert!(builder.finish().is_empty());
    }
}
