use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::info;

use pdf_bookkey_rs::cli::parse_or_exit;
use pdf_bookkey_rs::logging;
use pdf_bookkey_rs::prelude::*;

#[derive(Parser)]
#[command(name = "partial_md5")]
#[command(about = "Print the sampled MD5 book key of a file", long_about = None, version)]
struct Cli {
    /// File to fingerprint
    path: PathBuf,

    /// Print the PDF document identifier instead (trailer /ID, else MD5 of the first kilobyte)
    #[arg(long)]
    pdf_id: bool,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli: Cli = parse_or_exit();
    logging::init(cli.verbose);

    let digest = if cli.pdf_id {
        let id = document_id(&cli.path)?;
        info!(kind = ?id.kind, "document identifier");
        id.hex
    } else {
        partial_md5(&cli.path)?
    };

    println!("{}", digest);
    Ok(())
}
