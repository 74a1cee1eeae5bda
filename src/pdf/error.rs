use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to open {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF is encrypted")]
    Encrypted,

    #[error("Page {0} does not exist in the page tree")]
    PageNotFound(u32),

    #[error("Failed to decode content of page {page}: {message}")]
    Content { page: u32, message: String },
}
