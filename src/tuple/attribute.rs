use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use crate::common::{BlockId, DbError, Result, ATTR_SIZE};

use super::AttrType;

/// A record is a fixed number of attribute slots.
pub type Record = Vec<Attribute>;

/// The raw 16 bytes of one attribute value.
///
/// Numbers are stored as a little-endian `f64` in the first 8 bytes, strings
/// as at most 15 bytes followed by NUL padding. Which reading applies is
/// decided by the attribute's catalog type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute([u8; ATTR_SIZE]);

impl Attribute {
    /// Longest string that still leaves room for the terminator.
    pub const MAX_STRING_LEN: usize = ATTR_SIZE - 1;

    /// Copies an attribute out of a record area. `bytes` must hold at least 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut raw = [0u8; ATTR_SIZE];
        raw.copy_from_slice(&bytes[..ATTR_SIZE]);
        Self(raw)
    }

    pub fn number(value: f64) -> Self {
        let mut raw = [0u8; ATTR_SIZE];
        raw[..8].copy_from_slice(&value.to_le_bytes());
        Self(raw)
    }

    pub fn string(value: &str) -> Result<Self> {
        let bytes = value.as_bytes();
        if bytes.len() > Self::MAX_STRING_LEN {
            return Err(DbError::StringTooLong(value.to_string()));
        }
        let mut raw = [0u8; ATTR_SIZE];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Catalog records store block numbers as numbers, with -1 for "none".
    pub fn block(block: Option<BlockId>) -> Self {
        Self::number(f64::from(BlockId::to_link(block)))
    }

    pub fn as_bytes(&self) -> &[u8; ATTR_SIZE] {
        &self.0
    }

    pub fn as_number(&self) -> f64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.0[..8]);
        f64::from_le_bytes(raw)
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.str_bytes())
    }

    /// Numeric catalog field read as a count or offset.
    pub fn as_usize(&self) -> usize {
        let value = self.as_number();
        if value <= 0.0 {
            0
        } else {
            value as usize
        }
    }

    pub fn as_block(&self) -> Option<BlockId> {
        let value = self.as_number();
        if value < 0.0 || value > f64::from(u32::MAX) {
            None
        } else {
            Some(BlockId(value as u32))
        }
    }

    fn str_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(ATTR_SIZE);
        &self.0[..end]
    }

    /// Orders two values of the same attribute type.
    ///
    /// Strings compare byte-wise up to their terminator. Numbers use the IEEE
    /// total order with both zeros equal, so a positive NaN sorts above infinity.
    pub fn compare(&self, other: &Attribute, attr_type: AttrType) -> Ordering {
        match attr_type {
            AttrType::String => self.str_bytes().cmp(other.str_bytes()),
            AttrType::Number => {
                let zero_as_positive = |n: f64| if n == 0.0 { 0.0 } else { n };
                let (a, b) = (zero_as_positive(self.as_number()), zero_as_positive(other.as_number()));
                a.total_cmp(&b)
            }
        }
    }
}

impl Default for Attribute {
    fn default() -> Self {
        Self([0u8; ATTR_SIZE])
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({:02x?})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_layout() {
        let attr = Attribute::number(55.5);
        assert_eq!(&attr.as_bytes()[..8], &55.5f64.to_le_bytes());
        assert!(attr.as_bytes()[8..].iter().all(|&b| b == 0));
        assert_eq!(attr.as_number(), 55.5);
    }

    #[test]
    fn test_string_layout() {
        let attr = Attribute::string("Marks").unwrap();
        assert_eq!(&attr.as_bytes()[..6], b"Marks\0");
        assert_eq!(attr.as_str(), "Marks");

        let longest = "abcdefghijklmno";
        assert_eq!(Attribute::string(longest).unwrap().as_str(), longest);
        assert!(matches!(
            Attribute::string("abcdefghijklmnop"),
            Err(DbError::StringTooLong(_))
        ));
    }

    #[test]
    fn test_block_fields() {
        assert_eq!(Attribute::block(None).as_block(), None);
        assert_eq!(Attribute::block(Some(BlockId(42))).as_block(), Some(BlockId(42)));
        assert_eq!(Attribute::number(-1.0).as_usize(), 0);
    }

    #[test]
    fn test_compare_total_order() {
        // positive NaN sorts last
        let nan = f64::NAN.abs();
        let nums: Vec<Attribute> = [f64::NEG_INFINITY, -3.5, 0.0, 1.0, 1.0, 2.25, 1e9, f64::INFINITY, nan]
            .iter()
            .map(|&v| Attribute::number(v))
            .collect();
        let strs: Vec<Attribute> = ["", "Z", "a", "ab", "abc", "b"]
            .iter()
            .map(|s| Attribute::string(s).unwrap())
            .collect();

        for (values, ty) in [(&nums, AttrType::Number), (&strs, AttrType::String)] {
            for a in values.iter() {
                assert_eq!(a.compare(a, ty), Ordering::Equal);
                for b in values.iter() {
                    assert_eq!(a.compare(b, ty), b.compare(a, ty).reverse());
                    for c in values.iter() {
                        if a.compare(b, ty) != Ordering::Greater
                            && b.compare(c, ty) != Ordering::Greater
                        {
                            assert_ne!(a.compare(c, ty), Ordering::Greater);
                        }
                    }
                }
            }
            // inputs are listed in ascending order
            for pair in values.windows(2) {
                assert_ne!(pair[0].compare(&pair[1], ty), Ordering::Greater);
            }
        }
    }

    #[test]
    fn test_negative_zero_equal() {
        let a = Attribute::number(0.0);
        let b = Attribute::number(-0.0);
        assert_eq!(a.compare(&b, AttrType::Number), Ordering::Equal);
    }

    #[test]
    fn test_nan_is_ordered() {
        let nan = Attribute::number(f64::NAN.abs());
        let five = Attribute::number(5.0);
        let six = Attribute::number(6.0);
        assert_eq!(nan.compare(&nan, AttrType::Number), Ordering::Equal);
        assert_eq!(nan.compare(&five, AttrType::Number), Ordering::Greater);
        assert_eq!(six.compare(&nan, AttrType::Number), Ordering::Less);
        assert_eq!(five.compare(&six, AttrType::Number), Ordering::Less);
    }
}
