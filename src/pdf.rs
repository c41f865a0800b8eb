use anyhow::{anyhow, Context, Result};
use gag::Gag;
use lopdf::Document;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::font_utils;
use crate::markdown::{self, PageText};
use crate::DocumentConverter;

/// Converts PDF files to markdown using `pdf-extract`, with a page-by-page
/// `lopdf` fallback for documents it cannot handle.
#[derive(Debug, Clone)]
pub struct PdfMarkdownConverter {
    /// Put a `-----` rule between pages.
    pub page_separators: bool,
}

impl Default for PdfMarkdownConverter {
    fn default() -> Self {
        PdfMarkdownConverter { page_separators: true }
    }
}

impl DocumentConverter for PdfMarkdownConverter {
    fn extract_markdown(&self, input: &Path) -> Result<String> {
        let bytes = std::fs::read(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        log::debug!("read {} bytes from {}", bytes.len(), input.display());

        let pages = extract_pages(&bytes)?;
        log::debug!("extracted {} page(s)", pages.len());
        Ok(markdown::render_document(&pages, self.page_separators))
    }
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>> {
    match try_pdf_extract(bytes) {
        Ok(pages) => return Ok(pages),
        Err(e) => log::warn!("pdf-extract gave no usable text ({}), falling back to lopdf", e),
    }

    extract_with_lopdf(bytes)
}

fn try_pdf_extract(bytes: &[u8]) -> Result<Vec<PageText>> {
    let texts = {
        // pdf-extract prints diagnostics to stdout
        let _quiet = Gag::stdout().ok();
        // and panics on fonts or resources it cannot resolve
        panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem_by_pages(bytes)))
            .map_err(|_| anyhow!("pdf-extract panicked"))??
    };

    if texts.iter().all(|text| text.trim().is_empty()) {
        return Err(anyhow!("No text extracted"));
    }

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText::new(i + 1, text))
        .collect())
}

fn extract_with_lopdf(bytes: &[u8]) -> Result<Vec<PageText>> {
    let doc = Document::load_mem(bytes).context("Input is not a readable PDF document")?;

    let mut font_headings = font_utils::heading_levels(&font_utils::extract_runs(&doc));
    let mut pages = Vec::new();

    for &page_no in doc.get_pages().keys() {
        let number = page_no as usize;

        match doc.extract_text(&[page_no]) {
            Ok(text) => {
                let mut page = PageText::new(number, text);
                page.font_headings = font_headings.remove(&number).unwrap_or_default();
                pages.push(page);
            }
            Err(e) => log::warn!("Could not extract text from page {}: {}", number, e),
        }
    }

    Ok(pages)
}
