use crate::common::{BlockId, BlockType};

/// Common block header layout:
///
/// | Field        | Offset | Size |
/// |--------------|--------|------|
/// | block_type   | 0      | 4    |
/// | parent       | 4      | 4    |
/// | left         | 8      | 4    |
/// | right        | 12     | 4    |
/// | num_entries  | 16     | 4    |
/// | num_attrs    | 20     | 4    |
/// | num_slots    | 24     | 4    |
/// | reserved     | 28     | 4    |
///
/// Links are little-endian i32 with -1 meaning "no block".
const BLOCK_TYPE_OFFSET: usize = 0;
const PARENT_OFFSET: usize = 4;
const LEFT_OFFSET: usize = 8;
const RIGHT_OFFSET: usize = 12;
const NUM_ENTRIES_OFFSET: usize = 16;
const NUM_ATTRS_OFFSET: usize = 20;
const NUM_SLOTS_OFFSET: usize = 24;

pub(crate) fn read_i32(data: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

pub(crate) fn write_i32(data: &mut [u8], offset: usize, value: i32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn read_count(data: &[u8], offset: usize) -> usize {
    usize::try_from(read_i32(data, offset)).unwrap_or(0)
}

fn write_count(data: &mut [u8], offset: usize, value: usize) {
    write_i32(data, offset, i32::try_from(value).unwrap_or(i32::MAX));
}

/// Decoded form of the 32-byte header every block starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_type: BlockType,
    pub parent: Option<BlockId>,
    pub left: Option<BlockId>,
    pub right: Option<BlockId>,
    pub num_entries: usize,
    /// Record blocks only
    pub num_attrs: usize,
    /// Record blocks only
    pub num_slots: usize,
}

impl BlockHeader {
    /// A header with no links and zero counts.
    pub fn new(block_type: BlockType) -> Self {
        Self {
            block_type,
            parent: None,
            left: None,
            right: None,
            num_entries: 0,
            num_attrs: 0,
            num_slots: 0,
        }
    }

    /// Reads the header at the start of `data`. Unknown type tags decode as `Unused`.
    pub fn read(data: &[u8]) -> Self {
        let tag = read_i32(data, BLOCK_TYPE_OFFSET);
        let block_type = u8::try_from(tag)
            .ok()
            .and_then(BlockType::from_byte)
            .unwrap_or(BlockType::Unused);
        Self {
            block_type,
            parent: BlockId::from_link(read_i32(data, PARENT_OFFSET)),
            left: BlockId::from_link(read_i32(data, LEFT_OFFSET)),
            right: BlockId::from_link(read_i32(data, RIGHT_OFFSET)),
            num_entries: read_count(data, NUM_ENTRIES_OFFSET),
            num_attrs: read_count(data, NUM_ATTRS_OFFSET),
            num_slots: read_count(data, NUM_SLOTS_OFFSET),
        }
    }

    /// Writes the header into the first 32 bytes of `data`, leaving the reserved word alone.
    pub fn write(&self, data: &mut [u8]) {
        write_block_type(data, self.block_type);
        write_i32(data, PARENT_OFFSET, BlockId::to_link(self.parent));
        write_i32(data, LEFT_OFFSET, BlockId::to_link(self.left));
        write_i32(data, RIGHT_OFFSET, BlockId::to_link(self.right));
        write_count(data, NUM_ENTRIES_OFFSET, self.num_entries);
        write_count(data, NUM_ATTRS_OFFSET, self.num_attrs);
        write_count(data, NUM_SLOTS_OFFSET, self.num_slots);
    }
}

/// Overwrites only the type tag of a block.
pub fn write_block_type(data: &mut [u8], block_type: BlockType) {
    write_i32(data, BLOCK_TYPE_OFFSET, i32::from(block_type.to_byte()));
}
