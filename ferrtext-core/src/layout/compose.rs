use std::borrow::Borrow;

use rayon::prelude::*;
use tracing::*;

use crate::{
    consts::COLUMN_SEPARATOR,
    layout::{
        column::ColumnClassifier,
        config::LayoutConfig,
        line::assemble_lines,
        page::{DocumentResult, PageResult},
        word::{PageWords, Word},
    },
};

/// Builds the text of one page from its column buckets.
///
/// With columns, the whole left column is emitted before the right column no
/// matter how their lines interleave vertically. Without columns, `left` holds
/// all words and `right` is ignored.
pub fn compose_page<L, R>(
    has_columns: bool,
    left: &[L],
    right: &[R],
    vertical_tolerance: f32,
) -> String
where
    L: Borrow<Word>,
    R: Borrow<Word>,
{
    let left_text = assemble_lines(left, vertical_tolerance).join("\n");
    if !has_columns {
        return left_text;
    }

    let right_text = assemble_lines(right, vertical_tolerance).join("\n");
    let mut text = String::with_capacity(left_text.len() + right_text.len() + 2);
    text.push_str(&left_text);
    text.push_str(COLUMN_SEPARATOR);
    text.push_str(&right_text);
    text
}

/// Runs classification, partitioning, line assembly and composition for one page.
///
/// A page without words keeps its fallback text and is never reported as
/// multi-column.
pub fn reconstruct_page(page: &PageWords, config: &LayoutConfig) -> PageResult {
    if page.words.is_empty() {
        debug!(
            "page {} has no word geometry, using fallback text",
            page.page_number
        );
        return PageResult {
            page_number: page.page_number,
            text: page.fallback_text.clone(),
            has_columns: false,
        };
    }

    let (split, has_columns) = ColumnClassifier::new(config).classify(&page.words, page.width);
    debug!("page {}: {} words", page.page_number, page.words.len());

    let text = if has_columns {
        compose_page(true, &split.left, &split.right, config.vertical_tolerance)
    } else {
        compose_page::<Word, Word>(false, &page.words, &[], config.vertical_tolerance)
    };

    PageResult {
        page_number: page.page_number,
        text,
        has_columns,
    }
}

/// Joins page texts in page-number order with the page-break marker.
pub fn compose_document(mut pages: Vec<PageResult>, page_break_marker: &str) -> DocumentResult {
    pages.sort_by_key(|page| page.page_number);

    let full_text = pages
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join(page_break_marker);

    DocumentResult {
        success: true,
        pages,
        full_text,
        error: None,
    }
}

/// Reconstructs every page and composes the document.
///
/// Pages share no state, so with `parallel` they are processed on the rayon
/// pool; each result is written to its own slot and the slots keep input order.
pub fn reconstruct_document(
    pages: &[PageWords],
    config: &LayoutConfig,
    parallel: bool,
) -> DocumentResult {
    let results = if parallel {
        pages
            .par_iter()
            .map(|page| reconstruct_page(page, config))
            .collect::<Vec<_>>()
    } else {
        pages
            .iter()
            .map(|page| reconstruct_page(page, config))
            .collect::<Vec<_>>()
    };

    let multi_column = results.iter().filter(|page| page.has_columns).count();
    info!(
        "reconstructed {} pages, {} with two columns",
        results.len(),
        multi_column
    );

    compose_document(results, &config.page_break_marker)
}
