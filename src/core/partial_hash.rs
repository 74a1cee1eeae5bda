//! Partial MD5 fingerprints
//!
//! Hashes a handful of 1 KiB windows instead of the whole file, which is
//! enough to tell books apart and stays fast on multi-gigabyte files.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

use super::sampling::{sample_windows, SampleWindow};

/// Bytes hashed by [`md5_of_first_kilobyte`]
pub const FIRST_KILOBYTE: u64 = 1024;

/// Compute the partial MD5 of a file
///
/// # Arguments
/// * `path` - Path to the file
///
/// # Returns
/// Lowercase hex MD5 of the sampled windows, in offset order
pub fn partial_md5(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    if metadata.is_dir() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "is a directory"))
            .with_context(|| format!("Cannot fingerprint {}", path.display()));
    }
    let file_size = metadata.len();

    let mut context = md5::Context::new();
    let mut windows_read = 0usize;

    for window in sample_windows(file_size) {
        let buffer = read_window(path, window)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        trace!(start = window.start, end = window.end, "hashing window");
        context.consume(&buffer);
        windows_read += 1;
    }

    let digest = format!("{:x}", context.compute());
    debug!(path = %path.display(), file_size, windows_read, %digest, "partial md5");
    Ok(digest)
}

/// Read one window with its own open/seek/read/close cycle
fn read_window(path: &Path, window: SampleWindow) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(window.start))?;
    let mut buffer = vec![0u8; window.len() as usize];
    file.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// MD5 of at most the first kilobyte of a file
pub fn md5_of_first_kilobyte(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut buffer = Vec::with_capacity(FIRST_KILOBYTE as usize);
    file.take(FIRST_KILOBYTE)
        .read_to_end(&mut buffer)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(format!("{:x}", md5::compute(&buffer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    fn file_with(content: &[u8]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_empty_file_hashes_nothing() {
        let temp_file = file_with(b"");
        assert_eq!(partial_md5(temp_file.path()).unwrap(), EMPTY_MD5);
    }

    #[test]
    fn test_small_file_hashes_nothing() {
        let temp_file = file_with(&patterned(200));
        assert_eq!(partial_md5(temp_file.path()).unwrap(), EMPTY_MD5);
    }

    #[test]
    fn test_one_kilobyte_file_hashes_tail() {
        let data = patterned(1024);
        let temp_file = file_with(&data);

        let expected = format!("{:x}", md5::compute(&data[256..1024]));
        assert_eq!(partial_md5(temp_file.path()).unwrap(), expected);
    }

    #[test]
    fn test_windows_are_concatenated_in_order() {
        let data = patterned(3000);
        let temp_file = file_with(&data);

        let mut context = md5::Context::new();
        context.consume(&data[256..1280]);
        context.consume(&data[1024..2048]);
        let expected = format!("{:x}", context.compute());

        assert_eq!(partial_md5(temp_file.path()).unwrap(), expected);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = partial_md5(&temp_dir.path().join("missing.pdf")).unwrap_err();
        let io_err = err.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_directory_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = partial_md5(temp_dir.path()).unwrap_err();
        assert!(err.downcast_ref::<io::Error>().is_some());
    }

    #[test]
    fn test_first_kilobyte() {
        let data = patterned(5000);
        let temp_file = file_with(&data);
        let expected = format!("{:x}", md5::compute(&data[..1024]));
        assert_eq!(md5_of_first_kilobyte(temp_file.path()).unwrap(), expected);

        let short = file_with(b"short");
        let expected = format!("{:x}", md5::compute(b"short"));
        assert_eq!(md5_of_first_kilobyte(short.path()).unwrap(), expected);
    }
}
