use crate::common::{BlockId, BlockType, Result};
use crate::storage::page::{
    BlockHeader, InternalBlock, InternalEntry, LeafBlock, LeafEntry, RecordBlock,
};
use crate::tuple::{Attribute, Record};

use super::BufferPool;

/// Handle to a block by number.
///
/// The handle holds no bytes: every accessor fetches the block through the
/// pool, copies what it needs and lets go of the frame before returning.
#[derive(Clone, Copy)]
pub struct BlockBuffer<'a> {
    pool: &'a BufferPool,
    block: BlockId,
}

impl<'a> BlockBuffer<'a> {
    /// Binds an existing block. No I/O happens until the first access.
    pub fn new(pool: &'a BufferPool, block: BlockId) -> Self {
        Self { pool, block }
    }

    /// Allocates a new block of the given type.
    pub fn allocate(pool: &'a BufferPool, block_type: BlockType) -> Result<Self> {
        let block = pool.allocate(block_type)?;
        Ok(Self { pool, block })
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn header(&self) -> Result<BlockHeader> {
        let guard = self.pool.read_block(self.block)?;
        Ok(BlockHeader::read(&guard))
    }

    pub fn set_header(&self, header: &BlockHeader) -> Result<()> {
        let mut guard = self.pool.write_block(self.block)?;
        header.write(&mut guard);
        Ok(())
    }

    /// Updates both the block's own tag and the allocation map.
    pub fn set_block_type(&self, block_type: BlockType) -> Result<()> {
        self.pool.set_block_type(self.block, block_type)
    }

    pub fn release(self) -> Result<()> {
        self.pool.release(self.block)
    }
}

/// Record block handle.
#[derive(Clone, Copy)]
pub struct RecBuffer<'a> {
    inner: BlockBuffer<'a>,
}

impl<'a> RecBuffer<'a> {
    pub fn new(pool: &'a BufferPool, block: BlockId) -> Self {
        Self {
            inner: BlockBuffer::new(pool, block),
        }
    }

    pub fn allocate(pool: &'a BufferPool) -> Result<Self> {
        Ok(Self {
            inner: BlockBuffer::allocate(pool, BlockType::Record)?,
        })
    }

    pub fn block(&self) -> BlockId {
        self.inner.block
    }

    pub fn header(&self) -> Result<BlockHeader> {
        self.inner.header()
    }

    pub fn set_header(&self, header: &BlockHeader) -> Result<()> {
        self.inner.set_header(header)
    }

    /// Writes `header` and marks every slot it describes as free.
    pub fn init(&self, header: &BlockHeader) -> Result<()> {
        let mut guard = self.inner.pool.write_block(self.inner.block)?;
        RecordBlock::new(&mut guard[..]).init(header)
    }

    pub fn record(&self, slot: usize) -> Result<Record> {
        let guard = self.inner.pool.read_block(self.inner.block)?;
        RecordBlock::new(&guard[..]).record(slot)
    }

    pub fn set_record(&self, slot: usize, record: &[Attribute]) -> Result<()> {
        let mut guard = self.inner.pool.write_block(self.inner.block)?;
        RecordBlock::new(&mut guard[..]).set_record(slot, record)
    }

    /// Copy of the slot map.
    pub fn slot_map(&self) -> Result<Vec<u8>> {
        let guard = self.inner.pool.read_block(self.inner.block)?;
        let map = RecordBlock::new(&guard[..]).slot_map()?.to_vec();
        Ok(map)
    }

    pub fn set_slot_map(&self, map: &[u8]) -> Result<()> {
        let mut guard = self.inner.pool.write_block(self.inner.block)?;
        RecordBlock::new(&mut guard[..]).set_slot_map(map)
    }

    /// Sets one slot map byte.
    pub fn set_slot(&self, slot: usize, state: u8) -> Result<()> {
        let mut guard = self.inner.pool.write_block(self.inner.block)?;
        RecordBlock::new(&mut guard[..]).set_slot(slot, state)
    }

    pub fn release(self) -> Result<()> {
        self.inner.release()
    }
}

/// Leaf index block handle.
#[derive(Clone, Copy)]
pub struct IndLeaf<'a> {
    inner: BlockBuffer<'a>,
}

impl<'a> IndLeaf<'a> {
    pub fn new(pool: &'a BufferPool, block: BlockId) -> Self {
        Self {
            inner: BlockBuffer::new(pool, block),
        }
    }

    pub fn allocate(pool: &'a BufferPool) -> Result<Self> {
        Ok(Self {
            inner: BlockBuffer::allocate(pool, BlockType::IndexLeaf)?,
        })
    }

    pub fn block(&self) -> BlockId {
        self.inner.block
    }

    pub fn header(&self) -> Result<BlockHeader> {
        self.inner.header()
    }

    pub fn set_header(&self, header: &BlockHeader) -> Result<()> {
        self.inner.set_header(header)
    }

    pub fn entry(&self, index: usize) -> Result<LeafEntry> {
        let guard = self.inner.pool.read_block(self.inner.block)?;
        LeafBlock::new(&guard[..]).entry(index)
    }

    /// Reads the first `count` entries in one fetch.
    pub fn entries(&self, count: usize) -> Result<Vec<LeafEntry>> {
        let guard = self.inner.pool.read_block(self.inner.block)?;
        let leaf = LeafBlock::new(&guard[..]);
        (0..count).map(|i| leaf.entry(i)).collect()
    }

    pub fn set_entry(&self, index: usize, entry: &LeafEntry) -> Result<()> {
        let mut guard = self.inner.pool.write_block(self.inner.block)?;
        LeafBlock::new(&mut guard[..]).set_entry(index, entry)
    }

    /// Writes `entries` starting at position 0 in one fetch.
    pub fn set_entries(&self, entries: &[LeafEntry]) -> Result<()> {
        let mut guard = self.inner.pool.write_block(self.inner.block)?;
        let mut leaf = LeafBlock::new(&mut guard[..]);
        for (i, entry) in entries.iter().enumerate() {
            leaf.set_entry(i, entry)?;
        }
        Ok(())
    }

    pub fn release(self) -> Result<()> {
        self.inner.release()
    }
}

/// Internal index block handle.
#[derive(Clone, Copy)]
pub struct IndInternal<'a> {
    inner: BlockBuffer<'a>,
}

impl<'a> IndInternal<'a> {
    pub fn new(pool: &'a BufferPool, block: BlockId) -> Self {
        Self {
            inner: BlockBuffer::new(pool, block),
        }
    }

    pub fn allocate(pool: &'a BufferPool) -> Result<Self> {
        Ok(Self {
            inner: BlockBuffer::allocate(pool, BlockType::IndexInternal)?,
        })
    }

    pub fn block(&self) -> BlockId {
        self.inner.block
    }

    pub fn header(&self) -> Result<BlockHeader> {
        self.inner.header()
    }

    pub fn set_header(&self, header: &BlockHeader) -> Result<()> {
        self.inner.set_header(header)
    }

    pub fn entry(&self, index: usize) -> Result<InternalEntry> {
        let guard = self.inner.pool.read_block(self.inner.block)?;
        InternalBlock::new(&guard[..]).entry(index)
    }

    pub fn entries(&self, count: usize) -> Result<Vec<InternalEntry>> {
        let guard = self.inner.pool.read_block(self.inner.block)?;
        let node = InternalBlock::new(&guard[..]);
        (0..count).map(|i| node.entry(i)).collect()
    }

    pub fn set_entry(&self, index: usize, entry: &InternalEntry) -> Result<()> {
        let mut guard = self.inner.pool.write_block(self.inner.block)?;
        InternalBlock::new(&mut guard[..]).set_entry(index, entry)
    }

    /// Writes `entries` in order starting at position 0. Each entry's right
    /// child is overwritten by the next entry's left child, so neighbours
    /// must agree on the child they share.
    pub fn set_entries(&self, entries: &[InternalEntry]) -> Result<()> {
        let mut guard = self.inner.pool.write_block(self.inner.block)?;
        let mut node = InternalBlock::new(&mut guard[..]);
        for (i, entry) in entries.iter().enumerate() {
            node.set_entry(i, entry)?;
        }
        Ok(())
    }

    pub fn release(self) -> Result<()> {
        self.inner.release()
    }
}
