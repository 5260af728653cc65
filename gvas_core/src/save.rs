use std::path::Path;

use tracing::{debug, trace};

use crate::error::ScanError;
use crate::format::{decode_count, is_valid_header, read_f32_le, MAGIC_LEN};
use crate::key::MarkerKey;
use crate::matcher::{locate, Matcher};

/// Read a whole save file into memory.
///
/// Any I/O failure is reported as [`ScanError::Read`] before a single byte is
/// examined. The result still has to pass [`SaveFile::new`].
pub fn read_save(path: impl AsRef<Path>) -> Result<Vec<u8>, ScanError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), len = data.len(), "read save file");
    Ok(data)
}

/// A save buffer whose magic header has been checked.
///
/// # Lookup sequence
/// 1. [`SaveFile::new`] rejects anything without the GVAS magic.
/// 2. Optionally, [`find_section`] locates an ASCII section marker such as
///    `Resources` so key searches start inside that section.
/// 3. [`read_count`] searches for the 16-byte key and decodes the f32 stored
///    right after it.
///
/// The view borrows the buffer and never modifies it, so it can be copied
/// freely and shared across threads.
///
/// [`find_section`]: SaveFile::find_section
/// [`read_count`]: SaveFile::read_count
#[derive(Debug, Clone, Copy)]
pub struct SaveFile<'a> {
    data: &'a [u8],
}

impl<'a> SaveFile<'a> {
    /// Validate the magic header and wrap `data`.
    pub fn new(data: &'a [u8]) -> Result<Self, ScanError> {
        if !is_valid_header(data) {
            debug!(len = data.len(), "rejecting buffer without GVAS magic");
            return Err(ScanError::InvalidHeader { len: data.len() });
        }
        Ok(Self { data })
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: a valid save holds at least the magic.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes following the magic header.
    pub fn body(&self) -> &'a [u8] {
        &self.data[MAGIC_LEN..]
    }

    /// Position of `needle` at or after `from`, or `None`.
    pub fn locate(
        &self,
        matcher: &dyn Matcher,
        needle: &[u8],
        from: usize,
    ) -> Result<Option<usize>, ScanError> {
        let pos = locate(matcher, self.data, needle, from)?;
        trace!(
            matcher = matcher.name(),
            needle_len = needle.len(),
            from,
            ?pos,
            "marker search"
        );
        Ok(pos)
    }

    /// Lazily yield every match position of `needle`, scanning from offset 0.
    ///
    /// Each subsequent search starts one byte after the previous hit, so
    /// overlapping occurrences are reported. Nothing is buffered; callers that
    /// only want the first few hits can `take(n)`.
    pub fn hits<'n>(
        &self,
        matcher: &'n dyn Matcher,
        needle: &'n [u8],
    ) -> Result<Hits<'a, 'n>, ScanError> {
        if needle.is_empty() {
            return Err(ScanError::MalformedInput("empty needle"));
        }
        Ok(Hits {
            matcher,
            haystack: self.data,
            needle,
            from: 0,
        })
    }

    /// Every match position of `needle`, collected.
    pub fn locate_all(
        &self,
        matcher: &dyn Matcher,
        needle: &[u8],
    ) -> Result<Vec<usize>, ScanError> {
        Ok(self.hits(matcher, needle)?.collect())
    }

    /// Offset of the ASCII section marker `name`.
    pub fn find_section(&self, matcher: &dyn Matcher, name: &str) -> Result<usize, ScanError> {
        let pos = self
            .locate(matcher, name.as_bytes(), 0)?
            .ok_or_else(|| ScanError::MarkerNotFound {
                marker: format!("section {:?}", name),
                from: 0,
            })?;
        debug!(section = name, offset = pos, "found section marker");
        Ok(pos)
    }

    /// Offset just past `key`, searching at or after `from`.
    pub fn key_end(
        &self,
        matcher: &dyn Matcher,
        key: &MarkerKey,
        from: usize,
    ) -> Result<usize, ScanError> {
        let pos = self
            .locate(matcher, key.as_ref(), from)?
            .ok_or_else(|| ScanError::MarkerNotFound {
                marker: key.to_string(),
                from,
            })?;
        Ok(pos + key.as_bytes().len())
    }

    /// Raw f32 stored right after `key`.
    pub fn read_value(
        &self,
        matcher: &dyn Matcher,
        key: &MarkerKey,
        from: usize,
    ) -> Result<f32, ScanError> {
        let end = self.key_end(matcher, key, from)?;
        read_f32_le(self.data, end)
    }

    /// Clamped count stored right after `key`.
    pub fn read_count(
        &self,
        matcher: &dyn Matcher,
        key: &MarkerKey,
        from: usize,
    ) -> Result<u32, ScanError> {
        let end = self.key_end(matcher, key, from)?;
        let count = decode_count(self.data, end)?;
        debug!(key = %key, marker_end = end, count, "read count");
        Ok(count)
    }

    /// Like [`read_count`](Self::read_count), but the key search starts at the
    /// section marker `section`.
    pub fn read_count_in_section(
        &self,
        matcher: &dyn Matcher,
        section: &str,
        key: &MarkerKey,
    ) -> Result<u32, ScanError> {
        let from = self.find_section(matcher, section)?;
        self.read_count(matcher, key, from)
    }
}

/// Iterator returned by [`SaveFile::hits`].
pub struct Hits<'a, 'n> {
    matcher: &'n dyn Matcher,
    haystack: &'a [u8],
    needle: &'n [u8],
    from: usize,
}

impl Iterator for Hits<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.from > self.haystack.len() {
            return None;
        }
        let pos = self.matcher.find(self.haystack, self.needle, self.from)?;
        self.from = pos + 1;
        Some(pos)
    }
}

/// Map "marker not found" onto a zero count, passing other errors through.
pub fn count_or_zero(result: Result<u32, ScanError>) -> Result<u32, ScanError> {
    match result {
        Err(ScanError::MarkerNotFound { .. }) => Ok(0),
        other => other,
    }
}
