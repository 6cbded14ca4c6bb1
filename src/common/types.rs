use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::config::INVALID_BLOCK_NUM;
use super::error::DbError;

/// Block identifier - the position of a block on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Decodes an on-disk link, where negative values mean "no block".
    pub fn from_link(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// Encodes an optional link the way block headers and entries store it.
    pub fn to_link(block: Option<Self>) -> i32 {
        block
            .and_then(|b| i32::try_from(b.0).ok())
            .unwrap_or(INVALID_BLOCK_NUM)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

/// Frame identifier type - identifies a buffer frame in the buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl FrameId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.0)
    }
}

/// Slot of the open-relation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelId(pub usize);

impl RelId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelId({})", self.0)
    }
}

/// Record identifier - a slot inside a record block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub block: BlockId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(block: BlockId, slot: usize) -> Self {
        Self { block, slot }
    }
}

/// Position of an entry inside a leaf index block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexId {
    pub block: BlockId,
    pub index: usize,
}

impl IndexId {
    pub fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }
}

/// What a block is used for, as recorded in the allocation map and the block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Record,
    IndexInternal,
    IndexLeaf,
    Unused,
    AllocMap,
}

impl BlockType {
    pub fn to_byte(self) -> u8 {
        match self {
            BlockType::Record => 0,
            BlockType::IndexInternal => 1,
            BlockType::IndexLeaf => 2,
            BlockType::Unused => 3,
            BlockType::AllocMap => 4,
        }
    }

    /// Unknown tags are reported as `InvalidBlock` by callers that care.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(BlockType::Record),
            1 => Some(BlockType::IndexInternal),
            2 => Some(BlockType::IndexLeaf),
            3 => Some(BlockType::Unused),
            4 => Some(BlockType::AllocMap),
            _ => None,
        }
    }
}

/// Relational operator used by searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Ge,
    ];

    /// Whether `stored OP target` holds, given `stored.compare(target)`.
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

impl FromStr for CompareOp {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(CompareOp::Eq),
            "!=" | "<>" => Ok(CompareOp::Ne),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            _ => Err(DbError::InvalidOperator(s.to_string())),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(symbol)
    }
}
