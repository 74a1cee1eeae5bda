//! Locating a highlight in the document text
//!
//! Positions are counted in characters over the concatenated plain text of
//! every page, so `page_offsets[p - 1]` is where page `p` starts. Within its
//! page a highlight is matched fuzzily: every window of the highlight's length
//! is scored by longest common subsequence and the best (earliest on ties)
//! wins.

use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::pdf::{extract_pages, ExtractError, PageSpec, PageText};

/// Characters of surrounding text kept on each side of a match
pub const CONTEXT_CHARS: usize = 31;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Page {page} is out of range (document has {pages} pages)")]
    PageOutOfRange { page: u32, pages: usize },
}

/// Where a highlight sits in the document, plus the text around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationContext {
    pub preceding: String,
    pub succeeding: String,
    pub start_pos: usize,
    pub end_pos: usize,
}

/// Plain text of every page with cumulative offsets
#[derive(Debug, Clone, Default)]
pub struct DocumentText {
    pages: Vec<Vec<char>>,
    offsets: Vec<usize>,
}

impl DocumentText {
    /// Build from a complete, ordered page list
    pub fn from_pages(pages: &[PageText]) -> Self {
        let pages: Vec<Vec<char>> = pages
            .iter()
            .map(|page| page.content.plain_text().chars().collect())
            .collect();
        let offsets = cumulative_offsets(pages.iter().map(Vec::len));
        Self { pages, offsets }
    }

    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        let pages = extract_pages(path, &PageSpec::All)?;
        Ok(Self::from_pages(&pages))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// `page_count() + 1` entries, starting at 0
    pub fn page_offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Locate `highlight` on 1-based `page`
    ///
    /// `Ok(None)` means the page has no text resembling the highlight.
    pub fn find_context(
        &self,
        page: u32,
        highlight: &str,
    ) -> Result<Option<AnnotationContext>, ContextError> {
        let index = (page as usize)
            .checked_sub(1)
            .filter(|&index| index < self.pages.len())
            .ok_or(ContextError::PageOutOfRange {
                page,
                pages: self.pages.len(),
            })?;

        let text = &self.pages[index];
        let needle: Vec<char> = highlight.chars().collect();
        let Some(match_index) = find_closest_match(text, &needle) else {
            return Ok(None);
        };

        let match_end = match_index + needle.len();
        let local_start = match_index.saturating_sub(CONTEXT_CHARS);
        let local_end = text.len().min(match_end + CONTEXT_CHARS);
        let succeeding_start = match_end.min(local_end);

        let start_pos = self.offsets[index] + match_index;
        Ok(Some(AnnotationContext {
            preceding: text[local_start..match_index].iter().collect(),
            succeeding: text[succeeding_start..local_end].iter().collect(),
            start_pos,
            end_pos: start_pos + needle.len(),
        }))
    }
}

/// Start offset of each page given the page text lengths, plus the total
pub fn page_offsets(pages: &[PageText]) -> Vec<usize> {
    cumulative_offsets(pages.iter().map(|page| page.content.plain_text().chars().count()))
}

fn cumulative_offsets(lengths: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut offsets = vec![0];
    let mut total = 0;
    for len in lengths {
        total += len;
        offsets.push(total);
    }
    offsets
}

/// Start of the window of `haystack` most similar to `needle`
///
/// A haystack shorter than the needle is compared as a whole. Returns `None`
/// when nothing has a character in common with the needle.
pub fn find_closest_match(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || haystack.is_empty() {
        return None;
    }

    if haystack.len() <= needle.len() {
        return (lcs_len(haystack, needle) > 0).then_some(0);
    }

    if let Some(exact) = haystack.windows(needle.len()).position(|w| w == needle) {
        return Some(exact);
    }

    let (score, index) = (0..=haystack.len() - needle.len())
        .into_par_iter()
        .map(|i| (lcs_len(&haystack[i..i + needle.len()], needle), i))
        .reduce(
            || (0, usize::MAX),
            |a, b| {
                if a.0 > b.0 || (a.0 == b.0 && a.1 < b.1) {
                    a
                } else {
                    b
                }
            },
        );

    (score > 0).then_some(index)
}

/// Longest common subsequence length
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
