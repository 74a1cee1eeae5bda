//! PDF document identifiers
//!
//! Annotation tools key a PDF by the first entry of its trailer `/ID` array.
//! Files without one (or that are not parseable PDFs) fall back to the MD5
//! of their first kilobyte.

use anyhow::{Context, Result};
use lopdf::{Document, Object};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::error::ExtractError;
use super::extractor::load_document;
use super::output_guard::OutputGuard;
use crate::core::md5_of_first_kilobyte;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentIdKind {
    Trailer,
    FirstKilobyte,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentId {
    pub kind: DocumentIdKind,
    pub hex: String,
}

/// Identify a PDF by its trailer `/ID`, or by its first kilobyte
pub fn document_id(path: &Path) -> Result<DocumentId> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let loaded = {
        let _guard = OutputGuard::silence();
        load_document(&bytes)
    };

    identify(path, loaded)
}

fn identify(path: &Path, loaded: Result<Document, ExtractError>) -> Result<DocumentId> {
    match loaded {
        Ok(doc) => {
            if let Some(hex) = trailer_id(&doc) {
                return Ok(DocumentId {
                    kind: DocumentIdKind::Trailer,
                    hex,
                });
            }
            debug!(path = %path.display(), "no trailer /ID");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "not a readable PDF"),
    }

    Ok(DocumentId {
        kind: DocumentIdKind::FirstKilobyte,
        hex: md5_of_first_kilobyte(path)?,
    })
}

fn trailer_id(doc: &Document) -> Option<String> {
    let ids = resolve(doc, doc.trailer.get(b"ID").ok()?)?;
    let first = resolve(doc, ids.as_array().ok()?.first()?)?;

    match first {
        Object::String(bytes, _) if !bytes.is_empty() => Some(hexify(bytes)),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn hexify(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
