use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

use crate::format::KEY_LEN;

/// A 16-byte marker searched for inside a save buffer.
///
/// The bytes are the big-endian packing of two `u64` halves, high half first.
/// Only the bit pattern matters; version and variant bits are not checked.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerKey(Uuid);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid marker key: {0}")]
pub struct KeyParseError(#[from] uuid::Error);

impl MarkerKey {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Pack `high` then `low`, each big-endian.
    pub const fn from_halves(high: u64, low: u64) -> Self {
        Self(Uuid::from_u64_pair(high, low))
    }

    /// Split back into `(high, low)`.
    pub fn halves(&self) -> (u64, u64) {
        self.0.as_u64_pair()
    }

    /// Fold a text label into a key.
    ///
    /// The first 16 UTF-16 units are shifted into the high half, the rest into
    /// the low half: `half = (half << 8) | unit`. Bits shifted past the top of
    /// a half are dropped, so only the trailing units of each half survive.
    pub fn from_label(label: &str) -> Self {
        let mut high = 0u64;
        let mut low = 0u64;
        for (i, unit) in label.encode_utf16().enumerate() {
            if i < KEY_LEN {
                high = (high << 8) | u64::from(unit);
            } else {
                low = (low << 8) | u64::from(unit);
            }
        }
        Self::from_halves(high, low)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        self.0.as_bytes()
    }
}

impl AsRef<[u8]> for MarkerKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Accepts the usual 128-bit id spellings: 32 bare hex digits, the dashed
/// 8-4-4-4-12 form, `{braced}` and `urn:uuid:`.
impl FromStr for MarkerKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// 32 lowercase hex digits, no dashes.
impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.simple(), f)
    }
}

impl fmt::Debug for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkerKey({})", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_pack_big_endian() {
        let key = MarkerKey::from_halves(0x0011_2233_4455_6677, 0x8899_aabb_ccdd_eeff);
        assert_eq!(
            key.as_bytes(),
            &[
                0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc,
                0xdd, 0xee, 0xff
            ]
        );
        assert_eq!(key.halves(), (0x0011_2233_4455_6677, 0x8899_aabb_ccdd_eeff));
    }

    #[test]
    fn halves_extremes() {
        for (hi, lo) in [(0, 0), (u64::MAX, u64::MAX), (0, u64::MAX), (u64::MAX, 0)] {
            assert_eq!(MarkerKey::from_halves(hi, lo).halves(), (hi, lo));
        }
        assert_eq!(MarkerKey::from_halves(u64::MAX, u64::MAX).as_bytes(), &[0xff; 16]);
    }

    #[test]
    fn parse_plain_dashed_and_braced() {
        let plain: MarkerKey = "00112233445566778899aabbccddeeff".parse().unwrap();
        let dashed: MarkerKey = "00112233-4455-6677-8899-AABBCCDDEEFF".parse().unwrap();
        let braced: MarkerKey = "{00112233-4455-6677-8899-aabbccddeeff}".parse().unwrap();
        assert_eq!(plain, dashed);
        assert_eq!(plain, braced);
        assert_eq!(plain.to_string(), "00112233445566778899aabbccddeeff");
        assert_eq!(
            format!("{:?}", plain),
            "MarkerKey(00112233445566778899aabbccddeeff)"
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        for bad in [
            "0011",
            "00112233445566778899aabbccddeeff00",
            "+0112233445566778899aabbccddeeff",
            "g0112233445566778899aabbccddeeff",
            "0x00112233445566778899aabbccddeeff",
            " 00112233445566778899aabbccddeeff ",
            "--00112233445566778899aabbccddeeff--",
            "0011223344556677-8899aabbccddeeff",
            "0-0-1-1-2-2-3-3-4-4-5-5-6-6-7-7-8-8-9-9-a-a-b-b-c-c-d-d-e-e-f-f",
        ] {
            assert!(bad.parse::<MarkerKey>().is_err(), "accepted {bad:?}");
        }
        let err = "0011".parse::<MarkerKey>().unwrap_err();
        assert!(err.to_string().starts_with("invalid marker key"));
    }

    #[test]
    fn label_folds_into_halves() {
        let key = MarkerKey::from_label("AB");
        assert_eq!(key.halves(), (0x4142, 0));

        // 17 units: the 17th lands in the low half; only the last 8 of the
        // first 16 survive in the high half.
        let key = MarkerKey::from_label("abcdefghijklmnopq");
        assert_eq!(key.halves(), (u64::from_be_bytes(*b"ijklmnop"), u64::from(b'q')));
    }

    #[test]
    fn label_empty_is_zero() {
        assert_eq!(MarkerKey::from_label("").halves(), (0, 0));
    }
}
