//! Page specifier parsing and clamping
//!
//! A specifier is either a single page (`"3"`) or an inclusive range
//! (`"2-10"`), both 1-based. Anything else selects the whole document.

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::RangeInclusive;

lazy_static! {
    static ref SINGLE_PAGE: Regex = Regex::new(r"^[0-9]+$").expect("single page pattern");
    static ref PAGE_RANGE: Regex = Regex::new(r"^([0-9]+)-([0-9]+)$").expect("page range pattern");
}

/// Requested page selection, before it is clamped to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSpec {
    #[default]
    All,
    Single(u64),
    Range(u64, u64),
}

impl PageSpec {
    /// Parse an optional command-line specifier
    ///
    /// Malformed input falls back to [`PageSpec::All`].
    pub fn parse(spec: Option<&str>) -> Self {
        let Some(spec) = spec else {
            return PageSpec::All;
        };

        if SINGLE_PAGE.is_match(spec) {
            return PageSpec::Single(parse_page_number(spec));
        }

        if let Some(caps) = PAGE_RANGE.captures(spec) {
            return PageSpec::Range(parse_page_number(&caps[1]), parse_page_number(&caps[2]));
        }

        tracing::warn!(spec, "unrecognised page specifier, extracting all pages");
        PageSpec::All
    }

    /// Clamp this selection to a document with `num_pages` pages
    pub fn resolve(&self, num_pages: u32) -> PageRange {
        let last = u64::from(num_pages);
        let (start, end) = match *self {
            PageSpec::All => (1, last),
            PageSpec::Single(page) => {
                let page = page.min(last).max(1);
                (page, page)
            }
            PageSpec::Range(start, end) => (start.max(1), end.min(last)),
        };

        PageRange {
            start: clamp_to_u32(start),
            end: clamp_to_u32(end),
        }
    }
}

/// Digits only; values beyond `u64` saturate
fn parse_page_number(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

fn clamp_to_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Inclusive, 1-based page range; empty when `start > end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    /// Page numbers in ascending order
    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }
}
