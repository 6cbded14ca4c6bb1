use std::fmt;

use crate::common::{DbError, Result};

use super::{AttrType, Attribute};

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
}

impl Value {
    pub fn attr_type(&self) -> AttrType {
        match self {
            Value::Number(_) => AttrType::Number,
            Value::String(_) => AttrType::String,
        }
    }

    /// Parses user text as a value of the given type.
    pub fn parse(text: &str, attr_type: AttrType) -> Result<Self> {
        match attr_type {
            AttrType::Number => match text.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Value::Number(n)),
                _ => Err(DbError::TypeMismatch(format!("{text:?} is not a finite number"))),
            },
            AttrType::String => Ok(Value::String(text.to_string())),
        }
    }

    pub fn decode(attr: &Attribute, attr_type: AttrType) -> Self {
        match attr_type {
            AttrType::Number => Value::Number(attr.as_number()),
            AttrType::String => Value::String(attr.as_str().into_owned()),
        }
    }

    pub fn to_attribute(&self) -> Result<Attribute> {
        match self {
            Value::Number(n) => Ok(Attribute::number(*n)),
            Value::String(s) => Attribute::string(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
        }
    }
}
