//! Sampling policy for partial file fingerprints
//!
//! Windows start at `STEP * 4^i` for `i` in `-1..=10`, so the first sample
//! sits at byte 256 and each following one is four times further in.
//! The sequence is pure arithmetic over the file size and performs no I/O.

use std::iter::FusedIterator;

/// Base offset unit in bytes
pub const STEP: u64 = 1024;

/// Maximum number of bytes read per window
pub const WINDOW: u64 = 1024;

/// First and last exponent of the geometric offset sequence
const FIRST_INDEX: i32 = -1;
const LAST_INDEX: i32 = 10;

/// Upper bound on the number of windows sampled from any file
pub const MAX_WINDOWS: usize = (LAST_INDEX - FIRST_INDEX + 1) as usize;

/// One contiguous byte range `[start, end)` fed to the digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    pub start: u64,
    pub end: u64,
}

impl SampleWindow {
    /// Number of bytes covered by this window
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Unclamped start offset for sequence index `i`
///
/// Negative indices shift right, so `candidate_offset(-1)` is `STEP / 4`.
pub fn candidate_offset(index: i32) -> u64 {
    if index < 0 {
        STEP >> (-2 * index)
    } else {
        STEP << (2 * index)
    }
}

/// Lazy, finite sequence of sampling windows for a file of a given size
///
/// Clone before consuming (or call [`sample_windows`] again) to replay the
/// sequence from the start.
#[derive(Debug, Clone)]
pub struct SampleWindows {
    file_size: u64,
    index: i32,
    finished: bool,
}

impl SampleWindows {
    pub fn new(file_size: u64) -> Self {
        Self {
            file_size,
            index: FIRST_INDEX,
            finished: false,
        }
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

impl Iterator for SampleWindows {
    type Item = SampleWindow;

    fn next(&mut self) -> Option<SampleWindow> {
        if self.finished || self.index > LAST_INDEX {
            self.finished = true;
            return None;
        }

        // Clamp first, then test: a start that lands on EOF ends the sequence.
        let start = self.file_size.min(candidate_offset(self.index));
        let end = (start + WINDOW).min(self.file_size);
        if start >= self.file_size {
            self.finished = true;
            return None;
        }

        self.index += 1;
        Some(SampleWindow { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            let remaining = (LAST_INDEX - self.index + 1).max(0) as usize;
            (0, Some(remaining))
        }
    }
}

impl FusedIterator for SampleWindows {}

/// Windows sampled from a file of `file_size` bytes, in increasing offset order
pub fn sample_windows(file_size: u64) -> SampleWindows {
    SampleWindows::new(file_size)
}
