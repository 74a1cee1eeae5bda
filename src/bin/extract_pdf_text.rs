use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use pdf_bookkey_rs::cli::parse_or_exit;
use pdf_bookkey_rs::logging;
use pdf_bookkey_rs::prelude::*;

#[derive(Parser)]
#[command(name = "extract_pdf_text")]
#[command(about = "Print per-page PDF text content as JSON", long_about = None, version)]
struct Cli {
    /// PDF file to read
    pdf_path: PathBuf,

    /// Page `N` or inclusive range `N-M` (1-based); anything else selects all pages
    #[arg(allow_negative_numbers = true)]
    pages: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli: Cli = parse_or_exit();
    logging::init(cli.verbose);

    let spec = PageSpec::parse(cli.pages.as_deref());
    let pages = extract_pages(&cli.pdf_path, &spec)
        .with_context(|| format!("Error extracting PDF text from {}", cli.pdf_path.display()))?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&pages)?
    } else {
        serde_json::to_string(&pages)?
    };
    println!("{}", json);
    Ok(())
}
