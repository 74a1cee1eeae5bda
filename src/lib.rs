//! PDF Book Key Library
//!
//! Partial MD5 fingerprints for e-reader book keys, per-page PDF text
//! extraction and export of KOReader highlights located in that text.

pub mod annotations;
pub mod cli;
pub mod core;
pub mod logging;
pub mod pdf;

pub use crate::core::partial_hash;
pub use crate::pdf::extractor;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::annotations::{
        load_highlights, render_markdown, Annotation, AnnotationContext, DocumentText,
        HighlightExport, Metadata,
    };
    pub use crate::core::{md5_of_first_kilobyte, partial_md5, sample_windows, SampleWindow};
    pub use crate::pdf::{
        document_id, extract_pages, extract_pages_from_mem, DocumentId, DocumentIdKind,
        ExtractError, PageRange, PageSpec, PageText, TextContent, TextItem,
    };
}
