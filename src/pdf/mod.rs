//! PDF page-text extraction and document identifiers

pub mod document_id;
pub mod error;
pub mod extractor;
pub mod output_guard;
pub mod page_spec;

pub use document_id::{document_id, DocumentId, DocumentIdKind};
pub use error::ExtractError;
pub use extractor::{extract_pages, extract_pages_from_mem, PageText, TextContent, TextItem};
pub use output_guard::OutputGuard;
pub use page_spec::{PageRange, PageSpec};

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

    /// Build a PDF with one page per entry of `page_texts`
    pub(crate) fn create_test_pdf(page_texts: &[&str], id: Option<&[u8]>) -> Vec<u8> {
        let (mut doc, _) = build_test_document(page_texts);
        if let Some(id) = id {
            let entry = Object::String(id.to_vec(), StringFormat::Hexadecimal);
            doc.trailer.set("ID", Object::Array(vec![entry.clone(), entry]));
        }
        save(doc)
    }

    /// Unsaved document plus its page ids, for tests that tweak the structure
    pub(crate) fn build_test_document(page_texts: &[&str]) -> (Document, Vec<ObjectId>) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources_id = doc.add_object(Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
        )]));

        let mut page_ids = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

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
                ("Resources", Object::Reference(resources_id)),
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

        (doc, page_ids)
    }

    pub(crate) fn save(mut doc: Document) -> Vec<u8> {
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
