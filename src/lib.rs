use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

mod font_utils;
pub mod markdown;
mod pdf;
#[cfg(test)]
mod test_pdf;

pub use pdf::PdfMarkdownConverter;

pub const COMPLETION_MESSAGE: &str = "轉換完成!";

/// Something that can turn a document on disk into markdown text.
pub trait DocumentConverter {
    fn extract_markdown(&self, input: &Path) -> Result<String>;
}

/// Converts `input` and writes the markdown to `output`, replacing any existing file.
///
/// The conversion runs before the output is opened, so a failed conversion
/// leaves whatever was at `output` untouched.
pub fn convert(converter: &dyn DocumentConverter, input: &Path, output: &Path) -> Result<()> {
    let markdown = converter
        .extract_markdown(input)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    log::debug!("converted {} ({} bytes of markdown)", input.display(), markdown.len());

    {
        let file = File::create(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(markdown.as_bytes())?;
        writer.flush()?;
    }

    log::debug!("wrote {}", output.display());
    Ok(())
}
