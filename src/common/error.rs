use thiserror::Error;

use super::types::BlockId;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Block, slot or entry out of bound")]
    OutOfBound,

    #[error("Attribute is not indexed")]
    NoIndex,

    #[error("Disk is full, no unused block left")]
    DiskFull,

    #[error("{0} is not a block of the expected type")]
    InvalidBlock(BlockId),

    #[error("Relation {0} does not exist")]
    RelationNotExist(String),

    #[error("Relation {0} already exists")]
    RelationExists(String),

    #[error("Attribute {0} does not exist")]
    AttributeNotExist(String),

    #[error("Attribute {0} already exists")]
    AttributeExists(String),

    #[error("Open relation table is full")]
    CacheFull,

    #[error("Relation {0} is not open")]
    RelationNotOpen(String),

    #[error("Expected {expected} attribute values, got {actual}")]
    AttributeCountMismatch { expected: usize, actual: usize },

    #[error("Attribute {0} is declared more than once")]
    DuplicateAttribute(String),

    #[error("Relation {0} is open")]
    RelationOpen(String),

    #[error("Attribute type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Relation catalog is full")]
    MaxRelations,

    #[error("A relation needs between 1 and {max} attributes, got {actual}")]
    MaxAttributes { max: usize, actual: usize },

    #[error("Operation not permitted on a catalog relation")]
    NotPermitted,

    #[error("Record not found")]
    NotFound,

    #[error("{0} is not resident in the buffer pool")]
    BlockNotInBuffer(BlockId),

    #[error("String value {0:?} exceeds 15 bytes")]
    StringTooLong(String),

    #[error("Unknown operator {0:?}")]
    InvalidOperator(String),
}

impl DbError {
    /// Classic negative status code of this error.
    pub fn code(&self) -> i32 {
        match self {
            DbError::OutOfBound | DbError::StringTooLong(_) => -1,
            DbError::NoIndex => -3,
            DbError::DiskFull => -4,
            DbError::InvalidBlock(_) => -5,
            DbError::RelationNotExist(_) => -6,
            DbError::RelationExists(_) => -7,
            DbError::AttributeNotExist(_) => -8,
            DbError::AttributeExists(_) => -9,
            DbError::CacheFull => -10,
            DbError::RelationNotOpen(_) => -11,
            DbError::AttributeCountMismatch { .. } => -12,
            DbError::DuplicateAttribute(_) => -13,
            DbError::RelationOpen(_) => -14,
            DbError::TypeMismatch(_) => -15,
            DbError::Io(_) | DbError::InvalidOperator(_) => -16,
            DbError::MaxRelations => -17,
            DbError::MaxAttributes { .. } => -18,
            DbError::NotPermitted => -19,
            DbError::NotFound => -20,
            DbError::BlockNotInBuffer(_) => -21,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
