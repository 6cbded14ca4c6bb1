use std::fmt;

use crate::common::{DbError, Result};

/// Type of an attribute. Values carry no tag of their own, so every reader
/// has to know the type from the attribute catalog before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    /// 64-bit floating point, little-endian in the first 8 bytes
    Number,

    /// NUL-terminated string of at most 15 bytes
    String,
}

impl AttrType {
    /// Numeric code stored in the attribute catalog.
    pub fn code(self) -> f64 {
        match self {
            AttrType::Number => 0.0,
            AttrType::String => 1.0,
        }
    }

    pub fn from_code(code: f64) -> Result<Self> {
        if code == 0.0 {
            Ok(AttrType::Number)
        } else if code == 1.0 {
            Ok(AttrType::String)
        } else {
            Err(DbError::TypeMismatch(format!("unknown attribute type code {code}")))
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Number => f.write_str("NUM"),
            AttrType::String => f.write_str("STR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(AttrType::from_code(AttrType::Number.code()).unwrap(), AttrType::Number);
        assert_eq!(AttrType::from_code(AttrType::String.code()).unwrap(), AttrType::String);
        assert!(AttrType::from_code(2.0).is_err());
    }
}
