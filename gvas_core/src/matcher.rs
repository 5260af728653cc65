use crate::error::ScanError;

/// Byte-pattern search strategy used to locate markers in a save buffer.
///
/// Implementations:
/// - Are identified by a stable `name()` used on the command line.
/// - Must never index out of bounds, whatever `needle.len()` or `from` is.
///   `from == haystack.len()`, `from > haystack.len()`, an empty needle and a
///   needle longer than the remaining bytes all return `None`.
/// - Must only return positions where `haystack[pos..pos + needle.len()]`
///   equals `needle` exactly. They need not return the leftmost such position.
pub trait Matcher: Send + Sync {
    /// Stable strategy name for CLI display and selection.
    fn name(&self) -> &'static str;

    /// First match at or after `from`, as the strategy defines "first".
    fn find(&self, haystack: &[u8], needle: &[u8], from: usize) -> Option<usize>;
}

/// Checked entry point around [`Matcher::find`].
///
/// An empty needle or a start offset past the end is a caller bug and is
/// reported as [`ScanError::MalformedInput`] rather than folded into "no match".
pub fn locate(
    matcher: &dyn Matcher,
    haystack: &[u8],
    needle: &[u8],
    from: usize,
) -> Result<Option<usize>, ScanError> {
    if needle.is_empty() {
        return Err(ScanError::MalformedInput("empty needle"));
    }
    if from > haystack.len() {
        return Err(ScanError::MalformedInput("start offset past end of buffer"));
    }
    Ok(matcher.find(haystack, needle, from))
}
