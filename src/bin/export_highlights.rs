use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;

use pdf_bookkey_rs::cli::parse_or_exit;
use pdf_bookkey_rs::logging;
use pdf_bookkey_rs::prelude::*;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Highlights sorted by page, one template block each
    #[value(alias = "md")]
    Markdown,
    /// Highlights with their located context
    Json,
}

#[derive(Parser)]
#[command(name = "export_highlights")]
#[command(about = "Export KOReader highlights of a PDF as Markdown or JSON", long_about = None, version)]
struct Cli {
    /// PDF file, or its metadata.pdf.lua sidecar (no context is located then)
    path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Markdown template with {text}, {page_number}, {highlight}, {iteration},
    /// {preceding} and {succeeding} placeholders
    #[arg(short, long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli: Cli = parse_or_exit();
    logging::init(cli.verbose);

    let template = cli
        .template
        .as_ref()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read template {}", path.display()))
        })
        .transpose()?;

    let export = load_highlights(&cli.path)?;

    let rendered = match cli.format {
        Format::Markdown => export.to_markdown(template.as_deref())?,
        Format::Json => format!("{}\n", serde_json::to_string(&export)?),
    };

    match &cli.output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", rendered),
    }
    Ok(())
}
