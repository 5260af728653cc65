use gvas_core::Matcher;
use memchr::memmem;

use crate::EXACT;

/// Leftmost exact match via `memchr::memmem` (two-way with SIMD prefilter).
///
/// Unlike [`ReanchorMatcher`](crate::ReanchorMatcher) this never skips an
/// overlapping candidate, so on inputs with long runs of the needle's first
/// byte the two can disagree. Pick this one when leftmost-ness matters more
/// than agreement with existing tooling.
pub struct ExactMatcher;

impl Matcher for ExactMatcher {
    fn name(&self) -> &'static str {
        EXACT
    }

    fn find(&self, haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        let rest = haystack.get(from..)?;
        memmem::find(rest, needle).map(|i| from + i)
    }
}
