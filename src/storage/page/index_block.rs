use crate::common::{
    BlockId, DbError, RecordId, Result, ATTR_SIZE, HEADER_SIZE, INTERNAL_ENTRY_SIZE,
    LEAF_ENTRY_SIZE, MAX_KEYS_INTERNAL, MAX_KEYS_LEAF,
};
use crate::tuple::Attribute;

use super::block_header::{read_i32, write_i32};
use super::BlockHeader;

/// Leaf entry layout (32 bytes each, starting right after the header):
///
/// | Field  | Offset | Size |
/// |--------|--------|------|
/// | key    | 0      | 16   |
/// | block  | 16     | 4    |
/// | slot   | 20     | 4    |
/// | unused | 24     | 8    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    pub key: Attribute,
    pub rid: RecordId,
}

/// Internal entry layout (20-byte stride starting right after the header):
///
/// | Field  | Offset | Size |
/// |--------|--------|------|
/// | lchild | 0      | 4    |
/// | key    | 4      | 16   |
/// | rchild | 20     | 4    |
///
/// An entry's `rchild` is stored in the same bytes as the next entry's `lchild`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalEntry {
    pub lchild: Option<BlockId>,
    pub key: Attribute,
    pub rchild: Option<BlockId>,
}

fn leaf_offset(index: usize) -> Result<usize> {
    if index >= MAX_KEYS_LEAF {
        return Err(DbError::OutOfBound);
    }
    Ok(HEADER_SIZE + index * LEAF_ENTRY_SIZE)
}

fn internal_offset(index: usize) -> Result<usize> {
    if index >= MAX_KEYS_INTERNAL {
        return Err(DbError::OutOfBound);
    }
    Ok(HEADER_SIZE + index * INTERNAL_ENTRY_SIZE)
}

/// View over a leaf index block.
pub struct LeafBlock<B> {
    data: B,
}

impl<B: AsRef<[u8]>> LeafBlock<B> {
    pub fn new(data: B) -> Self {
        Self { data }
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader::read(self.data.as_ref())
    }

    pub fn entry(&self, index: usize) -> Result<LeafEntry> {
        let offset = leaf_offset(index)?;
        let data = self.data.as_ref();
        let block = BlockId::from_link(read_i32(data, offset + ATTR_SIZE))
            .ok_or(DbError::OutOfBound)?;
        let slot = usize::try_from(read_i32(data, offset + ATTR_SIZE + 4))
            .map_err(|_| DbError::OutOfBound)?;
        Ok(LeafEntry {
            key: Attribute::from_slice(&data[offset..]),
            rid: RecordId::new(block, slot),
        })
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> LeafBlock<B> {
    pub fn set_header(&mut self, header: &BlockHeader) {
        header.write(self.data.as_mut());
    }

    pub fn set_entry(&mut self, index: usize, entry: &LeafEntry) -> Result<()> {
        let offset = leaf_offset(index)?;
        let slot = i32::try_from(entry.rid.slot).map_err(|_| DbError::OutOfBound)?;
        let data = self.data.as_mut();
        data[offset..offset + ATTR_SIZE].copy_from_slice(entry.key.as_bytes());
        write_i32(data, offset + ATTR_SIZE, BlockId::to_link(Some(entry.rid.block)));
        write_i32(data, offset + ATTR_SIZE + 4, slot);
        data[offset + ATTR_SIZE + 8..offset + LEAF_ENTRY_SIZE].fill(0);
        Ok(())
    }
}

/// View over an internal index block.
pub struct InternalBlock<B> {
    data: B,
}

impl<B: AsRef<[u8]>> InternalBlock<B> {
    pub fn new(data: B) -> Self {
        Self { data }
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader::read(self.data.as_ref())
    }

    pub fn entry(&self, index: usize) -> Result<InternalEntry> {
        let offset = internal_offset(index)?;
        let data = self.data.as_ref();
        Ok(InternalEntry {
            lchild: BlockId::from_link(read_i32(data, offset)),
            key: Attribute::from_slice(&data[offset + 4..]),
            rchild: BlockId::from_link(read_i32(data, offset + 4 + ATTR_SIZE)),
        })
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> InternalBlock<B> {
    pub fn set_header(&mut self, header: &BlockHeader) {
        header.write(self.data.as_mut());
    }

    pub fn set_entry(&mut self, index: usize, entry: &InternalEntry) -> Result<()> {
        let offset = internal_offset(index)?;
        let data = self.data.as_mut();
        write_i32(data, offset, BlockId::to_link(entry.lchild));
        data[offset + 4..offset + 4 + ATTR_SIZE].copy_from_slice(entry.key.as_bytes());
        write_i32(data, offset + 4 + ATTR_SIZE, BlockId::to_link(entry.rchild));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BlockType, BLOCK_SIZE};

    #[test]
    fn test_leaf_entries() {
        let mut data = vec![0u8; BLOCK_SIZE];
        let mut leaf = LeafBlock::new(&mut data[..]);
        leaf.set_header(&BlockHeader::new(BlockType::IndexLeaf));

        let entry = LeafEntry {
            key: Attribute::number(12.0),
            rid: RecordId::new(BlockId(40), 7),
        };
        leaf.set_entry(MAX_KEYS_LEAF - 1, &entry).unwrap();
        assert_eq!(leaf.entry(MAX_KEYS_LEAF - 1).unwrap(), entry);
        assert!(matches!(leaf.set_entry(MAX_KEYS_LEAF, &entry), Err(DbError::OutOfBound)));

        // last entry ends exactly at the end of the block
        assert_eq!(read_i32(&data, BLOCK_SIZE - 16), 40);
        assert_eq!(read_i32(&data, BLOCK_SIZE - 12), 7);
    }

    #[test]
    fn test_leaf_rejects_bad_record_ids() {
        let mut data = vec![0u8; BLOCK_SIZE];
        let mut leaf = LeafBlock::new(&mut data[..]);
        let entry = LeafEntry {
            key: Attribute::number(1.0),
            rid: RecordId::new(BlockId(9), usize::MAX),
        };
        assert!(matches!(leaf.set_entry(0, &entry), Err(DbError::OutOfBound)));

        let offset = HEADER_SIZE + ATTR_SIZE;
        write_i32(&mut data, offset, 9);
        write_i32(&mut data, offset + 4, -5);
        assert!(matches!(LeafBlock::new(&data[..]).entry(0), Err(DbError::OutOfBound)));

        write_i32(&mut data, offset, -1);
        write_i32(&mut data, offset + 4, 3);
        assert!(matches!(LeafBlock::new(&data[..]).entry(0), Err(DbError::OutOfBound)));
    }

    #[test]
    fn test_internal_children_overlap() {
        let mut data = vec![0u8; BLOCK_SIZE];
        let mut node = InternalBlock::new(&mut data[..]);
        node.set_entry(
            0,
            &InternalEntry {
                lchild: Some(BlockId(10)),
                key: Attribute::number(5.0),
                rchild: Some(BlockId(11)),
            },
        )
        .unwrap();

        let next = node.entry(1).unwrap();
        assert_eq!(next.lchild, Some(BlockId(11)));

        node.set_entry(
            1,
            &InternalEntry {
                lchild: Some(BlockId(12)),
                key: Attribute::number(9.0),
                rchild: None,
            },
        )
        .unwrap();
        assert_eq!(node.entry(0).unwrap().rchild, Some(BlockId(12)));
        assert_eq!(node.entry(1).unwrap().rchild, None);
        assert!(matches!(node.entry(MAX_KEYS_INTERNAL), Err(DbError::OutOfBound)));
    }
}
