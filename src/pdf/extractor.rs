//! Per-page text content extraction
//!
//! `lopdf` parses the document and decodes each page's content stream. The
//! text-showing operators are turned into [`TextItem`]s carrying the string,
//! the active font resource and the text rendering transform.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use serde::Serialize;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::debug;

use super::error::ExtractError;
use super::output_guard::OutputGuard;
use super::page_spec::PageSpec;

const IDENTITY: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// TJ adjustments below this (in thousandths of an em) read as a word gap
const WORD_GAP_THRESHOLD: f64 = -100.0;

/// Text content of one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageText {
    pub page: u32,
    pub content: TextContent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextContent {
    pub items: Vec<TextItem>,
}

impl TextContent {
    /// Item strings joined, with a newline after every end-of-line item
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for item in &self.items {
            text.push_str(&item.text);
            if item.has_eol {
                text.push('\n');
            }
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    #[serde(rename = "str")]
    pub text: String,
    pub font_name: Option<String>,
    pub font_size: f64,
    /// `[a, b, c, d, e, f]` of font size times the text matrix
    pub transform: [f64; 6],
    #[serde(rename = "hasEOL")]
    pub has_eol: bool,
}

/// Extract text content for the selected pages of a PDF file
///
/// # Arguments
/// * `path` - Path to the PDF file
/// * `spec` - Page selection, clamped to the document's page count
///
/// # Returns
/// One entry per selected page, in ascending page order
pub fn extract_pages(path: &Path, spec: &PageSpec) -> Result<Vec<PageText>, ExtractError> {
    let bytes = fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let pages = extract_pages_from_mem(&bytes, spec)?;
    debug!(path = %path.display(), pages = pages.len(), "extracted text");
    Ok(pages)
}

/// Same as [`extract_pages`] for a PDF already in memory
pub fn extract_pages_from_mem(bytes: &[u8], spec: &PageSpec) -> Result<Vec<PageText>, ExtractError> {
    let _guard = OutputGuard::silence();
    extract_unguarded(bytes, spec)
}

fn extract_unguarded(bytes: &[u8], spec: &PageSpec) -> Result<Vec<PageText>, ExtractError> {
    let doc = load_document(bytes)?;
    if doc.is_encrypted() {
        return Err(ExtractError::Encrypted);
    }

    extract_from_document(&doc, spec)
}

/// Parse a document, turning a parser panic into a parse error
pub(crate) fn load_document(bytes: &[u8]) -> Result<Document, ExtractError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| Document::load_mem(bytes)));

    match result {
        Ok(Ok(doc)) => Ok(doc),
        Ok(Err(e)) => Err(ExtractError::Parse(e.to_string())),
        Err(_panic) => Err(ExtractError::Parse("panic inside the PDF parser".into())),
    }
}

fn extract_from_document(doc: &Document, spec: &PageSpec) -> Result<Vec<PageText>, ExtractError> {
    let page_ids = doc.get_pages();
    let range = spec.resolve(page_ids.len() as u32);

    let mut pages = Vec::with_capacity(range.len());
    for page in range.pages() {
        let page_id = *page_ids.get(&page).ok_or(ExtractError::PageNotFound(page))?;
        let content = page_content(doc, page, page_id)?;
        pages.push(PageText { page, content });
    }

    Ok(pages)
}

fn page_content(doc: &Document, page: u32, page_id: ObjectId) -> Result<TextContent, ExtractError> {
    let content_error = |e: lopdf::Error| ExtractError::Content {
        page,
        message: e.to_string(),
    };

    // Every /Contents entry must resolve to a stream; streams are joined with
    // a newline so tokens never run together across the boundary.
    let mut data = Vec::new();
    for stream_id in doc.get_page_contents(page_id) {
        let stream = doc
            .get_object(stream_id)
            .and_then(Object::as_stream)
            .map_err(content_error)?;
        match stream.decompressed_content() {
            Ok(bytes) => data.extend_from_slice(&bytes),
            Err(_) => data.extend_from_slice(&stream.content),
        }
        data.push(b'\n');
    }

    let content = Content::decode(&data).map_err(content_error)?;
    Ok(collect_text_items(&content.operations))
}

/// Text state carried across operators within one content stream
struct TextState {
    font_name: Option<String>,
    font_size: f64,
    leading: f64,
    matrix: [f64; 6],
    line_matrix: [f64; 6],
}

impl TextState {
    fn new() -> Self {
        Self {
            font_name: None,
            font_size: 0.0,
            leading: 0.0,
            matrix: IDENTITY,
            line_matrix: IDENTITY,
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        let [a, b, c, d, e, f] = self.line_matrix;
        self.line_matrix = [a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f];
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn transform(&self) -> [f64; 6] {
        let [a, b, c, d, e, f] = self.matrix;
        let size = self.font_size;
        [size * a, size * b, size * c, size * d, e, f]
    }

    fn item(&self, text: String) -> TextItem {
        TextItem {
            text,
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            transform: self.transform(),
            has_eol: false,
        }
    }
}

fn collect_text_items(operations: &[Operation]) -> TextContent {
    let mut state = TextState::new();
    let mut items: Vec<TextItem> = Vec::new();

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                state.matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "ET" => mark_end_of_line(&mut items),
            "Tf" => {
                state.font_name = operands.first().and_then(name_of);
                state.font_size = operands.get(1).and_then(number).unwrap_or(0.0);
            }
            "TL" => state.leading = operands.first().and_then(number).unwrap_or(0.0),
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if op.operator == "TD" {
                    state.leading = -ty;
                }
                state.move_line(tx, ty);
                if ty != 0.0 {
                    mark_end_of_line(&mut items);
                }
            }
            "Tm" => {
                let values: Vec<f64> = operands.iter().filter_map(number).collect();
                if let Ok(matrix) = <[f64; 6]>::try_from(values.as_slice()) {
                    state.matrix = matrix;
                    state.line_matrix = matrix;
                }
                mark_end_of_line(&mut items);
            }
            "T*" => {
                state.next_line();
                mark_end_of_line(&mut items);
            }
            "Tj" | "TJ" => {
                if let Some(text) = operands.first().and_then(decode_operand) {
                    items.push(state.item(text));
                }
            }
            "'" => {
                state.next_line();
                mark_end_of_line(&mut items);
                if let Some(text) = operands.first().and_then(decode_operand) {
                    items.push(state.item(text));
                }
            }
            "\"" => {
                state.next_line();
                mark_end_of_line(&mut items);
                if let Some(text) = operands.get(2).and_then(decode_operand) {
                    items.push(state.item(text));
                }
            }
            _ => {}
        }
    }

    TextContent { items }
}

fn mark_end_of_line(items: &mut [TextItem]) {
    if let Some(last) = items.last_mut() {
        last.has_eol = true;
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}

fn name_of(object: &Object) -> Option<String> {
    match object {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Decode a `Tj` string or `TJ` array operand
fn decode_operand(operand: &Object) -> Option<String> {
    match operand {
        Object::String(bytes, _) => Some(decode_string(bytes)),
        Object::Array(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    Object::String(bytes, _) => text.push_str(&decode_string(bytes)),
                    other => {
                        if number(other).is_some_and(|gap| gap < WORD_GAP_THRESHOLD) {
                            text.push(' ');
                        }
                    }
                }
            }
            Some(text)
        }
        _ => None,
    }
}

/// UTF-16BE with BOM, then UTF-8, then Latin-1
fn decode_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if let Ok(text) = String::from_utf16(&units) {
            return text;
        }
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
