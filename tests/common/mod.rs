//! Shared fixtures for integration tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Helper to create a test file with given content
pub fn create_test_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Deterministic non-repeating-ish bytes so windows differ from each other
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 131 % 251) as u8).collect()
}

/// Build a PDF with one page per entry, each showing its text with font F1
pub fn create_test_pdf(page_texts: &[&str]) -> Vec<u8> {
    save(build_test_document(page_texts))
}

/// Zero-page PDF whose trailer declares standard-handler encryption
pub fn create_encrypted_pdf() -> Vec<u8> {
    let mut doc = build_test_document(&[]);
    doc.trailer.set(
        "Encrypt",
        Dictionary::from_iter(vec![("Filter", Object::Name(b"Standard".to_vec()))]),
    );
    save(doc)
}

/// PDF whose `page` has a /Contents reference to an object that does not exist
pub fn create_pdf_with_dangling_contents(page_texts: &[&str], page: u32) -> Vec<u8> {
    let mut doc = build_test_document(page_texts);
    let page_id = doc.get_pages()[&page];
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .unwrap()
        .set("Contents", Object::Reference((9999, 0)));
    save(doc)
}

/// Write `pdf` as `book.pdf` in `dir` with `sidecar` as its KOReader metadata
pub fn create_book_with_sidecar(dir: &Path, pdf: &[u8], sidecar: &str) -> PathBuf {
    let book = dir.join("book.pdf");
    fs::write(&book, pdf).unwrap();
    let sdr = dir.join("book.sdr");
    fs::create_dir_all(&sdr).unwrap();
    fs::write(sdr.join("metadata.pdf.lua"), sidecar).unwrap();
    book
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn build_test_document(page_texts: &[&str]) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut page_ids = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let resources = Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
        )]);
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}
