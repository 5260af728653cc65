use gvas_core::Matcher;
use memchr::memchr;

use crate::REANCHOR;

/// Single-byte-anchor incremental matcher.
///
/// This is the search the save tooling has always used. It is kept
/// byte-for-byte compatible, including its one quirk: after a partial match
/// fails, scanning resumes from the mismatching byte instead of one past the
/// old anchor. Candidates that start between the two are never tried, e.g.
/// `AAB` is not found in `AAAB`.
///
/// The quirk cannot trigger when `needle[0]` does not occur again inside the
/// needle; there the result is always the leftmost match.
pub struct ReanchorMatcher;

impl Matcher for ReanchorMatcher {
    fn name(&self) -> &'static str {
        REANCHOR
    }

    fn find(&self, haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
        find_subsequence(haystack, needle, from)
    }
}

/// Position at which `needle` begins, searching at or after `from`.
///
/// Returns `None` for an empty needle, for `from >= haystack.len()`, and
/// whenever the needle cannot be completely matched before the buffer ends.
/// Scratch space is O(1).
pub fn find_subsequence(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    let (&first, rest) = needle.split_first()?;
    let anchor = next_anchor(haystack, first, from)?;
    if rest.is_empty() {
        return Some(anchor);
    }

    // needle[0] is matched at `anchor`; compare the rest byte by byte.
    let mut matched = 1;
    let mut pos = anchor + 1;
    while pos < haystack.len() {
        if haystack[pos] == needle[matched] {
            matched += 1;
            if matched == needle.len() {
                return Some(pos + 1 - needle.len());
            }
            pos += 1;
        } else {
            // Re-anchor at or after the mismatching byte, not anchor + 1.
            let anchor = next_anchor(haystack, first, pos)?;
            matched = 1;
            pos = anchor + 1;
        }
    }
    None
}

#[inline]
fn next_anchor(haystack: &[u8], byte: u8, from: usize) -> Option<usize> {
    let rest = haystack.get(from..)?;
    memchr(byte, rest).map(|i| from + i)
}
