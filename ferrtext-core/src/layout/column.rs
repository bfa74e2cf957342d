use tracing::*;

use crate::layout::{config::LayoutConfig, word::Word};

/// The column a word was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Disjoint partition of one page's words into a left and a right column.
///
/// Words keep their input order inside each bucket.
#[derive(Debug, Default)]
pub struct ColumnSplit<'a> {
    pub left: Vec<&'a Word>,
    pub right: Vec<&'a Word>,
}

impl ColumnSplit<'_> {
    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }
}

/// Assigns a single word to a column.
///
/// Centers strictly outside the dead-zone `[gap_left, gap_right]` decide by
/// themselves. Inside the dead-zone the left edge is compared to the midline:
/// `x0 < mid_x` goes left, anything else goes right.
pub fn assign(word: &Word, mid_x: f32, gap_left: f32, gap_right: f32) -> Side {
    let center = word.center_x();
    if center < gap_left {
        Side::Left
    } else if center > gap_right {
        Side::Right
    } else if word.x0() < mid_x {
        Side::Left
    } else {
        Side::Right
    }
}

/// Splits `words` into left and right buckets; every word lands in exactly one.
pub fn partition(words: &[Word], mid_x: f32, gap_left: f32, gap_right: f32) -> ColumnSplit<'_> {
    let mut split = ColumnSplit::default();
    for word in words {
        match assign(word, mid_x, gap_left, gap_right) {
            Side::Left => split.left.push(word),
            Side::Right => split.right.push(word),
        }
    }
    split
}

/// Decides single- vs two-column layout for a page and partitions its words.
#[derive(Debug, Clone, Copy)]
pub struct ColumnClassifier<'c> {
    config: &'c LayoutConfig,
}

impl<'c> ColumnClassifier<'c> {
    pub fn new(config: &'c LayoutConfig) -> Self {
        Self { config }
    }

    /// Dead-zone borders and midline for a page of the given width.
    pub fn boundaries(&self, page_width: f32) -> (f32, f32, f32) {
        let mid_x = page_width / 2.0;
        (
            mid_x,
            mid_x - self.config.left_gap_offset,
            mid_x + self.config.right_gap_offset,
        )
    }

    pub fn split<'w>(&self, words: &'w [Word], page_width: f32) -> ColumnSplit<'w> {
        let (mid_x, gap_left, gap_right) = self.boundaries(page_width);
        partition(words, mid_x, gap_left, gap_right)
    }

    /// True when both buckets hold strictly more than `min_words_per_column` words.
    pub fn has_columns(&self, split: &ColumnSplit<'_>) -> bool {
        self.config.detect_columns
            && split.left.len() > self.config.min_words_per_column
            && split.right.len() > self.config.min_words_per_column
    }

    /// Partitions the page and decides whether it has two columns.
    ///
    /// An empty page is never multi-column.
    pub fn classify<'w>(&self, words: &'w [Word], page_width: f32) -> (ColumnSplit<'w>, bool) {
        let split = self.split(words, page_width);
        let has_columns = !words.is_empty() && self.has_columns(&split);
        debug!(
            "column split left={} right={} threshold={} -> has_columns={}",
            split.left.len(),
            split.right.len(),
            self.config.min_words_per_column,
            has_columns
        );
        (split, has_columns)
    }
}
