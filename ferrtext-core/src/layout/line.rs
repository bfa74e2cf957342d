use std::borrow::Borrow;

use crate::layout::word::Word;

/// Groups one column's words into text lines, top to bottom.
///
/// Words are scanned in `(top, x0)` order. A word joins the open line while
/// `|top - line_top| < vertical_tolerance`, where `line_top` is the `top` of
/// the word that opened the line and is never moved by later members. Each
/// closed line is re-sorted by `x0` and joined with single spaces.
pub fn assemble_lines<W: Borrow<Word>>(words: &[W], vertical_tolerance: f32) -> Vec<String> {
    let mut sorted = words.iter().map(Borrow::<Word>::borrow).collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.top().total_cmp(&b.top()).then(a.x0().total_cmp(&b.x0())));

    let mut lines = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return lines;
    };

    let mut current_top = first.top();
    let mut current_line = vec![first];

    for word in iter {
        if (word.top() - current_top).abs() < vertical_tolerance {
            current_line.push(word);
        } else {
            lines.push(close_line(&mut current_line));
            current_top = word.top();
            current_line.push(word);
        }
    }
    lines.push(close_line(&mut current_line));

    lines
}

fn close_line(line: &mut Vec<&Word>) -> String {
    line.sort_by(|a, b| a.x0().total_cmp(&b.x0()));
    let text = line
        .iter()
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    line.clear();
    text
}
