//! Markdown rendering of extracted page text.
//!
//! Pages arrive as plain text with one visual line per text line. Each line
//! is classified as a heading, a bullet item or paragraph text, and wrapped
//! paragraph lines are joined back together.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static NUMBERED_HEADING: Lazy<Regex> = Lazy::new(||
    // "1 Introduction", "2.3 Scope", "4.1.2. Details", "IV. Results", "B. Background"
    Regex::new(r"^(?:(\d+(?:\.\d+)*)\.?|([IVXLCDM]+)\.|([A-Z])[\.)])\s+\p{Lu}").unwrap());
static SECTION_HEADING: Lazy<Regex> = Lazy::new(||
    Regex::new(r"^(Chapter|Section|Part)\s+([A-Z0-9]+)").unwrap());
static APPENDIX_HEADING: Lazy<Regex> = Lazy::new(||
    Regex::new(r"^Appendix\s+([A-Z0-9]+)").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(||
    Regex::new(r"^[•◦▪●\-\*–]\s+(.+)$").unwrap());
static ORDERED_ITEM: Lazy<Regex> = Lazy::new(||
    Regex::new(r"^(\d+)[\.)]\s+(.+)$").unwrap());
static DOTTED_LEADERS: Lazy<Regex> = Lazy::new(||
    Regex::new(r"\s*\.{3,}\s*\d*$").unwrap());

const MAX_HEADING_WORDS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    H1,
    H2,
    H3,
    H4,
}

impl Level {
    /// Level for the n-th largest heading size (0 = largest).
    pub fn from_rank(rank: usize) -> Level {
        match rank {
            0 => Level::H1,
            1 => Level::H2,
            2 => Level::H3,
            _ => Level::H4,
        }
    }

    pub fn hashes(self) -> &'static str {
        match self {
            Level::H1 => "#",
            Level::H2 => "##",
            Level::H3 => "###",
            Level::H4 => "####",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: Level,
    pub text: String,
    pub page: usize,
}

/// Text of one page plus any heading levels inferred from font sizes.
#[derive(Debug, Clone, Default)]
pub struct PageText {
    pub number: usize,
    pub text: String,
    pub font_headings: HashMap<String, Level>,
}

impl PageText {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        PageText { number, text: text.into(), font_headings: HashMap::new() }
    }
}

pub fn normalize_line(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Renders all pages, skipping pages without text.
pub fn render_document(pages: &[PageText], page_separators: bool) -> String {
    let rendered: Vec<String> = pages
        .iter()
        .map(render_page)
        .filter(|page| !page.is_empty())
        .collect();

    if rendered.is_empty() {
        return String::new();
    }

    let separator = if page_separators { "\n\n-----\n\n" } else { "\n\n" };
    let mut out = rendered.join(separator);
    out.push('\n');
    out
}

enum Block {
    Paragraph(String),
    Item { marker: String, text: String },
}

struct PageWriter {
    blocks: Vec<String>,
    current: Option<Block>,
    in_list: bool,
}

impl PageWriter {
    fn new() -> Self {
        PageWriter { blocks: Vec::new(), current: None, in_list: false }
    }

    fn flush(&mut self) {
        match self.current.take() {
            Some(Block::Paragraph(text)) => {
                self.blocks.push(text);
                self.in_list = false;
            }
            Some(Block::Item { marker, text }) => {
                let item = format!("{} {}", marker, text);
                match self.blocks.last_mut() {
                    Some(list) if self.in_list => {
                        list.push('\n');
                        list.push_str(&item);
                    }
                    _ => self.blocks.push(item),
                }
                self.in_list = true;
            }
            None => {}
        }
    }

    fn heading(&mut self, level: Level, text: &str) {
        self.flush();
        self.blocks.push(format!("{} {}", level.hashes(), text));
        self.in_list = false;
    }

    fn item(&mut self, marker: String, text: &str) {
        self.flush();
        self.current = Some(Block::Item { marker, text: text.to_string() });
    }

    fn text(&mut self, line: &str) {
        if let Some(Block::Paragraph(buf) | Block::Item { text: buf, .. }) = &mut self.current {
            join_wrapped(buf, line);
        } else {
            self.current = Some(Block::Paragraph(line.to_string()));
        }
    }

    fn finish(mut self) -> String {
        self.flush();
        self.blocks.join("\n\n")
    }
}

pub fn render_page(page: &PageText) -> String {
    let lines: Vec<&str> = page.text.lines().map(|l| l.trim()).collect();
    let mut writer = PageWriter::new();

    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            writer.flush();
            continue;
        }

        if let Some(level) = page.font_headings.get(&normalize_line(line)) {
            writer.heading(*level, &clean_heading_text(line));
        } else if let Some(caps) = BULLET.captures(line) {
            writer.item("-".to_string(), caps[1].trim());
        } else if let Some(caps) = ordered_item(&lines, i) {
            writer.item(format!("{}.", &caps[1]), caps[2].trim());
        } else if let Some(heading) = analyze_potential_heading(line, i, &lines, page.number) {
            writer.heading(heading.level, &heading.text);
        } else {
            writer.text(&normalize_line(line));
        }
    }

    writer.finish()
}

// A numbered line is a list item only when an adjacent line is numbered too;
// a lone "1. Introduction" stays a heading.
fn ordered_item<'a>(lines: &[&'a str], i: usize) -> Option<regex::Captures<'a>> {
    let caps = ORDERED_ITEM.captures(lines[i])?;
    let numbered = |j: usize| lines.get(j).map_or(false, |l| ORDERED_ITEM.is_match(l));
    if (i > 0 && numbered(i - 1)) || numbered(i + 1) {
        Some(caps)
    } else {
        None
    }
}

fn join_wrapped(buf: &mut String, line: &str) {
    let continues_lowercase = line.chars().next().map_or(false, |c| c.is_lowercase());
    let hyphenated = buf.ends_with('-')
        && buf.chars().rev().nth(1).map_or(false, |c| c.is_alphabetic());

    if hyphenated && continues_lowercase {
        buf.pop();
    } else if !(buf.chars().last().map_or(false, is_cjk) && line.chars().next().map_or(false, is_cjk)) {
        buf.push(' ');
    }
    buf.push_str(line);
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F | 0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF |
        0xAC00..=0xD7AF | 0xF900..=0xFAFF | 0xFF00..=0xFFEF)
}

pub fn analyze_potential_heading(
    line: &str,
    line_index: usize,
    all_lines: &[&str],
    page: usize,
) -> Option<Heading> {
    let line = line.trim();
    let char_count = line.chars().count();

    if char_count < 3 || char_count > 150 || is_excluded_text(line) {
        return None;
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() > MAX_HEADING_WORDS {
        return None;
    }

    let heading = |level| Some(Heading { level, text: clean_heading_text(line), page });

    if let Some(caps) = NUMBERED_HEADING.captures(line) {
        let level = match (caps.get(1), caps.get(2)) {
            (Some(number), _) => determine_numbered_level(number.as_str()),
            (None, Some(_)) => Level::H1,
            _ => Level::H2,
        };
        return heading(level);
    }

    if SECTION_HEADING.is_match(line) || APPENDIX_HEADING.is_match(line) {
        return heading(Level::H1);
    }

    let isolated = is_line_isolated(line_index, all_lines);

    if line == line.to_uppercase()
        && line.chars().any(|c| c.is_uppercase())
        && char_count > 5
        && (2..=8).contains(&words.len())
        && isolated
    {
        return heading(Level::H1);
    }

    if line.ends_with(':') && !line.ends_with("::") {
        if (2..=10).contains(&words.len())
            && char_count >= 8
            && char_count <= 80
            && (isolated || has_following_content(line_index, all_lines))
        {
            return heading(Level::H2);
        }
        return None;
    }

    if (2..=8).contains(&words.len()) {
        let capitalized_words = words
            .iter()
            .filter(|word| word.chars().next().map_or(false, |c| c.is_uppercase()))
            .count();

        if capitalized_words >= words.len() - 1
            && capitalized_words >= 2
            && char_count >= 10
            && char_count <= 80
            && isolated
            && has_meaningful_words(&words)
        {
            return heading(determine_heading_level_by_content(line));
        }
    }

    None
}

fn is_line_isolated(line_index: usize, all_lines: &[&str]) -> bool {
    let blank_before = line_index == 0
        || all_lines.get(line_index - 1).map_or(true, |l| l.trim().is_empty());
    let blank_after = all_lines.get(line_index + 1).map_or(true, |l| l.trim().is_empty());

    blank_before && blank_after
}

fn has_following_content(line_index: usize, all_lines: &[&str]) -> bool {
    if let Some(next_line) = all_lines.get(line_index + 1) {
        let next_line = next_line.trim();
        return next_line.chars().count() > 20 && next_line.chars().next().map_or(false, |c| c.is_lowercase());
    }
    false
}

fn has_meaningful_words(words: &[&str]) -> bool {
    let meaningful_count = words
        .iter()
        .filter(|word| {
            word.len() > 3
                && !["The", "And", "For", "With", "From", "That", "This", "Into", "Upon"].contains(word)
        })
        .count();

    meaningful_count >= words.len() / 2
}

fn determine_heading_level_by_content(line: &str) -> Level {
    let line_lower = line.to_lowercase();

    let h1_indicators = [
        "introduction", "overview", "summary", "conclusion", "background",
        "methodology", "results", "discussion", "abstract", "references",
    ];

    if h1_indicators.iter().any(|indicator| line_lower.contains(indicator)) {
        Level::H1
    } else {
        Level::H2
    }
}

pub fn is_excluded_text(line: &str) -> bool {
    let line_lower = line.to_lowercase();

    if ["www.", "http", "@", "©"].iter().any(|s| line_lower.contains(s))
        || line_lower.starts_with("copyright")
    {
        return true;
    }

    let total_chars = line.chars().count();
    let non_letter_count = line.chars().filter(|c| !c.is_alphabetic()).count();
    if total_chars > 0 && non_letter_count as f64 / total_chars as f64 > 0.7 {
        return true;
    }

    let prose_patterns = [
        "the following", "as mentioned", "according to", "it should be noted",
        "please refer", "see section", "as shown in", "this chapter",
        "in this document", "the purpose of", "it is important",
    ];
    if prose_patterns.iter().any(|&pattern| line_lower.contains(pattern)) {
        return true;
    }

    if line.ends_with(',') || line.ends_with(';') {
        return true;
    }
    if line.ends_with('.') && line.split_whitespace().count() > 3 {
        return true;
    }

    let trailing_words = ["and", "or", "the", "of", "in", "to", "for", "with"];
    if let Some(last) = line_lower.split_whitespace().last() {
        if trailing_words.contains(&last) {
            return true;
        }
    }

    line.chars().next().map_or(false, |c| c.is_lowercase())
}

/// Level from the depth of a heading number such as `2`, `2.1` or `2.1.4`.
pub fn determine_numbered_level(number: &str) -> Level {
    match number.split('.').filter(|part| !part.is_empty()).count() {
        0 | 1 => Level::H1,
        2 => Level::H2,
        3 => Level::H3,
        _ => Level::H4,
    }
}

pub fn clean_heading_text(text: &str) -> String {
    let text = DOTTED_LEADERS.replace(text.trim(), "");
    let cleaned = normalize_line(&text);

    match cleaned.strip_suffix(':') {
        Some(stripped) => stripped.trim_end().to_string(),
        None => cleaned,
    }
}
