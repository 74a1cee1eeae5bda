//! KOReader sidecar metadata
//!
//! KOReader keeps highlights for `book.pdf` in `book.sdr/metadata.pdf.lua`.
//! Only the parts the exporter needs are modelled; everything else in the
//! file is ignored.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::lua_table::parse_lua_table;

/// File name of the sidecar for PDF documents
pub const SIDECAR_NAME: &str = "metadata.pdf.lua";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub doc_props: DocProps,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocProps {
    #[serde(default)]
    pub title: Option<String>,
}

/// One highlight. `notes` holds the highlighted passage and `text` the
/// reader's comment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bookmark {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default = "missing_notes")]
    pub notes: String,
}

fn first_page() -> u32 {
    1
}

fn missing_notes() -> String {
    "No notes available".to_string()
}

impl Metadata {
    /// Parse the contents of a sidecar file
    pub fn from_lua(content: &str) -> Result<Self> {
        let value = parse_lua_table(content)?;
        serde_json::from_value(value).context("Unexpected sidecar layout")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let metadata = Self::from_lua(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!(path = %path.display(), bookmarks = metadata.bookmarks.len(), "loaded sidecar");
        Ok(metadata)
    }
}

/// Sidecar candidates for a document, in lookup order
///
/// `book.sdr/metadata.pdf.lua` next to the book comes first, then a
/// `metadata.pdf.lua` in the book's own directory.
pub fn sidecar_candidates(document: &Path) -> Vec<PathBuf> {
    let dir = document.parent().unwrap_or_else(|| Path::new(""));
    let mut candidates = Vec::new();

    if let Some(stem) = document.file_stem() {
        let mut sdr = stem.to_os_string();
        sdr.push(".sdr");
        candidates.push(dir.join(sdr).join(SIDECAR_NAME));
    }
    candidates.push(dir.join(SIDECAR_NAME));
    candidates
}

/// First existing sidecar for `document`
pub fn find_sidecar(document: &Path) -> Result<PathBuf> {
    let candidates = sidecar_candidates(document);
    candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .cloned()
        .with_context(|| {
            format!(
                "No KOReader sidecar found for {} (looked for {})",
                document.display(),
                candidates
                    .iter()
                    .map(|c| c.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
}
