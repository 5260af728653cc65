use tracing::trace;

use crate::error::ScanError;

/// Magic bytes at the start of every GVAS save: "GVAS".
pub const MAGIC: &[u8; 4] = b"GVAS";

/// Length of the magic header in bytes.
pub const MAGIC_LEN: usize = MAGIC.len();

/// Size of a marker key in bytes (two big-endian u64 halves).
pub const KEY_LEN: usize = 16;

/// Size of the numeric field stored right after a marker key.
///   value:f32 LE = 4
pub const FIELD_LEN: usize = 4;

/// Largest count a field can decode to. Counters in the save are signed
/// 32-bit on the game side, so anything above saturates here.
pub const MAX_COUNT: u32 = i32::MAX as u32;

/// ASCII marker of the section that holds per-item resource counters.
pub const DEFAULT_SECTION: &str = "Resources";

// ── Header ─────────────────────────────────────────────────────────────────

/// Returns `true` iff `buf` starts with [`MAGIC`].
///
/// Buffers shorter than [`MAGIC_LEN`] are never valid.
pub fn is_valid_header(buf: &[u8]) -> bool {
    buf.len() >= MAGIC_LEN && &buf[..MAGIC_LEN] == MAGIC
}

// ── Field decoding ─────────────────────────────────────────────────────────

/// Read exactly [`FIELD_LEN`] bytes at `offset` as a little-endian binary32.
///
/// Fails with [`ScanError::TruncatedField`] when fewer than four bytes remain.
/// Short fields are never zero-padded.
pub fn read_f32_le(buf: &[u8], offset: usize) -> Result<f32, ScanError> {
    let truncated = || ScanError::TruncatedField {
        offset,
        available: buf.len().saturating_sub(offset),
    };
    let end = offset.checked_add(FIELD_LEN).ok_or_else(truncated)?;
    let bytes: [u8; FIELD_LEN] = buf
        .get(offset..end)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(truncated)?;
    Ok(f32::from_le_bytes(bytes))
}

/// Map a decoded float onto a non-negative count.
///
/// NaN and negative values become 0. Everything else truncates toward zero and
/// saturates at [`MAX_COUNT`].
pub fn clamp_count(value: f32) -> u32 {
    if value.is_nan() || value < 0.0 {
        return 0;
    }
    // `as` saturates at u32::MAX for large finite values and +inf.
    (value as u32).min(MAX_COUNT)
}

/// Decode the count stored at `marker_end` (the first byte after a key match).
pub fn decode_count(buf: &[u8], marker_end: usize) -> Result<u32, ScanError> {
    let raw = read_f32_le(buf, marker_end)?;
    let count = clamp_count(raw);
    trace!(marker_end, raw, count, "decoded count field");
    Ok(count)
}
