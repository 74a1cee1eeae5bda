//! KOReader highlight export
//!
//! Reads the highlights KOReader stored for a PDF, locates each one in the
//! document text and renders them as Markdown or JSON.

pub mod context;
pub mod lua_table;
pub mod markdown;
pub mod metadata;

pub use context::{
    find_closest_match, page_offsets, AnnotationContext, ContextError, DocumentText,
    CONTEXT_CHARS,
};
pub use lua_table::{parse_lua_table, LuaTableError};
pub use markdown::{render_markdown, render_template, TemplateError, DEFAULT_TEMPLATE};
pub use metadata::{find_sidecar, Bookmark, Metadata};

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::pdf::document_id;

/// One highlight ready for export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub page: u32,
    /// The highlighted passage
    pub highlight: String,
    /// The reader's comment
    pub text: String,
    /// Absent when exporting from a bare sidecar or when no match was found
    pub context: Option<AnnotationContext>,
}

/// Everything exported for one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightExport {
    pub document: String,
    pub title: Option<String>,
    /// Trailer `/ID` or first-kilobyte MD5; only known when the PDF was read
    pub document_id: Option<String>,
    pub annotations: Vec<Annotation>,
}

impl HighlightExport {
    pub fn to_markdown(&self, template: Option<&str>) -> Result<String, TemplateError> {
        render_markdown(&self.document, &self.annotations, template)
    }
}

/// Load highlights for a PDF, or straight from a `.lua` sidecar
///
/// Given a PDF, its sidecar is looked up next to it and every highlight is
/// located in the extracted text. Given a sidecar, highlights carry no
/// context.
pub fn load_highlights(path: &Path) -> Result<HighlightExport> {
    let document = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let is_sidecar = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("lua"));
    if is_sidecar {
        let metadata = Metadata::load(path)?;
        let annotations = metadata
            .bookmarks
            .into_iter()
            .map(|bookmark| annotation_from(bookmark, None))
            .collect();
        return Ok(HighlightExport {
            document,
            title: metadata.doc_props.title,
            document_id: None,
            annotations,
        });
    }

    let sidecar = find_sidecar(path)?;
    let metadata = Metadata::load(&sidecar)?;
    let text = DocumentText::load(path)
        .with_context(|| format!("Error extracting PDF text from {}", path.display()))?;
    let id = document_id(path)?;
    info!(
        pages = text.page_count(),
        highlights = metadata.bookmarks.len(),
        "locating highlights"
    );

    let mut annotations = Vec::with_capacity(metadata.bookmarks.len());
    for bookmark in metadata.bookmarks {
        let context = text
            .find_context(bookmark.page, &bookmark.notes)
            .with_context(|| format!("Cannot place highlight {:?}", bookmark.notes))?;
        if context.is_none() {
            warn!(page = bookmark.page, highlight = %bookmark.notes, "highlight not found on its page");
        }
        annotations.push(annotation_from(bookmark, context));
    }

    Ok(HighlightExport {
        document,
        title: metadata.doc_props.title,
        document_id: Some(id.hex),
        annotations,
    })
}

fn annotation_from(bookmark: Bookmark, context: Option<AnnotationContext>) -> Annotation {
    Annotation {
        page: bookmark.page,
        highlight: bookmark.notes,
        text: bookmark.text,
        context,
    }
}
