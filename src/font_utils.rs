use lopdf::{content::Content, Document, Object};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::markdown::{normalize_line, Level};

const SIZE_TOLERANCE: f64 = 0.5;
const MAX_HEADING_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub size: f64,
    pub page: usize,
}

/// Heading hints per page number, keyed by the whitespace-normalized line text.
pub type FontHeadings = HashMap<usize, HashMap<String, Level>>;

// Extract text runs with the font size in effect when they were drawn
pub fn extract_runs(doc: &Document) -> Vec<TextRun> {
    let mut runs = Vec::new();

    for (&page_no, &page_id) in doc.get_pages().iter() {
        let page = page_no as usize;

        let content = match doc.get_page_content(page_id).and_then(|data| Content::decode(&data)) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("skipping font analysis of page {}: {}", page, e);
                continue;
            }
        };

        // decode with each font's encoding so runs match `Document::extract_text` lines
        let encodings: HashMap<Vec<u8>, &str> = doc
            .get_page_fonts(page_id)
            .into_iter()
            .map(|(name, font)| (name, font.get_font_encoding()))
            .collect();

        let mut cur_size = 12.0_f64;
        let mut cur_encoding: Option<&str> = None;
        for op in content.operations {
            match op.operator.as_ref() {
                "Tf" => {
                    // operands: font name, font size
                    if let Some(Ok(name)) = op.operands.first().map(Object::as_name) {
                        cur_encoding = encodings.get(name).copied();
                    }
                    if let Some(size) = op.operands.get(1).and_then(as_number) {
                        cur_size = size;
                    }
                }
                "Tj" | "'" | "\"" => {
                    if let Some(Object::String(bytes, _)) = op.operands.last() {
                        push_run(&mut runs, Document::decode_text(cur_encoding, bytes), cur_size, page);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        push_run(&mut runs, decode_array(items, cur_encoding), cur_size, page);
                    }
                }
                _ => {}
            }
        }
    }

    runs
}

fn push_run(runs: &mut Vec<TextRun>, text: String, size: f64, page: usize) {
    if !text.trim().is_empty() {
        runs.push(TextRun { text, size, page });
    }
}

fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Real(r) => Some(*r as f64),
        Object::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

// Wide negative kerning in a TJ array is an inter-word gap
fn decode_array(items: &[Object], encoding: Option<&str>) -> String {
    let mut text = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => text.push_str(&Document::decode_text(encoding, bytes)),
            Object::Integer(i) if *i < -100 => text.push(' '),
            Object::Real(r) if *r < -100.0 => text.push(' '),
            _ => {}
        }
    }
    text
}

/// The size most of the text is set in, weighted by character count.
pub fn body_size(runs: &[TextRun]) -> Option<f64> {
    let mut weights: HashMap<i64, usize> = HashMap::new();
    for run in runs {
        *weights.entry((run.size * 10.0).round() as i64).or_insert(0) += run.text.chars().count();
    }

    weights
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(tenths, _)| tenths as f64 / 10.0)
}

/// Ranks every size larger than the body size and maps the runs set in
/// those sizes to heading levels, largest first.
pub fn heading_levels(runs: &[TextRun]) -> FontHeadings {
    let mut hints = FontHeadings::new();
    let Some(body) = body_size(runs) else {
        return hints;
    };

    let mut sizes: Vec<f64> = runs
        .iter()
        .map(|r| r.size)
        .filter(|&s| s > body + SIZE_TOLERANCE)
        .collect();
    sizes.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    sizes.dedup_by(|a, b| (*a - *b).abs() < 0.1);

    for run in runs {
        let text = normalize_line(&run.text);
        if text.is_empty() || text.chars().count() > MAX_HEADING_CHARS {
            continue;
        }
        if let Some(rank) = sizes.iter().position(|&s| (s - run.size).abs() < 0.1) {
            hints
                .entry(run.page)
                .or_default()
                .entry(text)
                .or_insert_with(|| Level::from_rank(rank));
        }
    }

    hints
}
