use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use pdf2md::{convert, PdfMarkdownConverter, COMPLETION_MESSAGE};

#[derive(Parser)]
#[command(name = "pdf2md", version, about = "Convert a PDF file to markdown")]
struct Args {
    /// Input PDF file
    input: PathBuf,
    /// Output markdown file (overwritten if it exists)
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    convert(&PdfMarkdownConverter::default(), &args.input, &args.output)?;
    println!("{COMPLETION_MESSAGE}");
    Ok(())
}
