mod attribute;
mod data_type;
mod value;

pub use attribute::{Attribute, Record};
pub use data_type::AttrType;
pub use value::Value;
