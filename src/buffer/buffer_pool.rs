use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{
    BlockId, BlockType, DbError, FrameId, Result, BLOCK_ALLOCATION_MAP_SIZE, BLOCK_SIZE,
};
use crate::storage::disk::DiskManager;
use crate::storage::page::{write_block_type, BlockHeader};

use super::{AgeReplacer, FrameHeader, ReadBlockGuard, WriteBlockGuard};

/// Everything the pool lock protects.
pub(crate) struct PoolState {
    /// The buffer pool frames
    pub(crate) frames: Vec<FrameHeader>,
    /// Block table: maps resident blocks to frames
    block_table: HashMap<BlockId, FrameId>,
    /// Frames that hold no block
    free_list: VecDeque<FrameId>,
    /// Replacement policy over the resident frames
    replacer: AgeReplacer,
    /// In-memory copy of the block-type allocation map, one entry per disk block
    alloc_map: Vec<BlockType>,
}

impl PoolState {
    fn check_block(&self, block: BlockId) -> Result<usize> {
        let index = block.as_usize();
        if index >= self.alloc_map.len() {
            return Err(DbError::OutOfBound);
        }
        Ok(index)
    }

    /// Brings a block into a frame, reading it from disk on a miss.
    fn fetch(&mut self, disk: &DiskManager, block: BlockId) -> Result<FrameId> {
        self.check_block(block)?;
        if let Some(&frame_id) = self.block_table.get(&block) {
            self.replacer.record_access(frame_id);
            return Ok(frame_id);
        }

        let frame_id = self.get_free_frame(disk)?;
        let frame = &mut self.frames[frame_id.as_usize()];
        disk.read_block(block, &mut frame.data[..])?;
        frame.set_block(block);
        frame.set_dirty(false);

        self.block_table.insert(block, frame_id);
        self.replacer.record_access(frame_id);
        Ok(frame_id)
    }

    /// Gets a free frame, either from the free list or by evicting the oldest block.
    fn get_free_frame(&mut self, disk: &DiskManager) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(DbError::OutOfBound)?;
        let frame = &mut self.frames[frame_id.as_usize()];
        if let Some(old_block) = frame.block() {
            if frame.is_dirty() {
                disk.write_block(old_block, &frame.data[..])?;
            }
            debug!(block = old_block.as_u32(), dirty = frame.is_dirty(), "evicted block");
            self.block_table.remove(&old_block);
        }
        frame.reset();
        Ok(frame_id)
    }
}

/// BufferPool caches disk blocks in a fixed number of frames and owns the
/// block-type allocation map. Every access to block contents goes through it.
///
/// Replacement prefers a free frame, then the resident block that has gone
/// longest without an access. Dirty victims are written back before reuse.
pub struct BufferPool {
    /// Number of frames in the pool
    capacity: usize,
    /// Lock-protected frames and bookkeeping
    state: Mutex<PoolState>,
    /// The disk behind the pool
    disk: DiskManager,
}

impl BufferPool {
    /// Creates a pool of `capacity` frames and loads the allocation map from
    /// the first blocks of the disk.
    pub fn new(disk: DiskManager, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DbError::OutOfBound);
        }

        let mut raw = vec![0u8; BLOCK_ALLOCATION_MAP_SIZE * BLOCK_SIZE];
        if disk.num_blocks() > raw.len() {
            return Err(DbError::OutOfBound);
        }
        disk.read_blocks(BlockId::new(0), BLOCK_ALLOCATION_MAP_SIZE, &mut raw)?;
        let alloc_map = raw[..disk.num_blocks()]
            .iter()
            .map(|&b| BlockType::from_byte(b).unwrap_or(BlockType::Unused))
            .collect();

        let mut frames = Vec::with_capacity(capacity);
        let mut free_list = VecDeque::with_capacity(capacity);
        for i in 0..capacity {
            let frame_id = FrameId::new(i as u32);
            frames.push(FrameHeader::new(frame_id));
            free_list.push_back(frame_id);
        }

        Ok(Self {
            capacity,
            state: Mutex::new(PoolState {
                frames,
                block_table: HashMap::new(),
                free_list,
                replacer: AgeReplacer::new(capacity),
                alloc_map,
            }),
            disk,
        })
    }

    /// Fetches a block for read access.
    pub fn read_block(&self, block: BlockId) -> Result<ReadBlockGuard<'_>> {
        let mut state = self.state.lock();
        let frame_id = state.fetch(&self.disk, block)?;
        Ok(ReadBlockGuard::new(state, frame_id, block))
    }

    /// Fetches a block for write access.
    pub fn write_block(&self, block: BlockId) -> Result<WriteBlockGuard<'_>> {
        let mut state = self.state.lock();
        let frame_id = state.fetch(&self.disk, block)?;
        Ok(WriteBlockGuard::new(state, frame_id, block))
    }

    /// Marks a resident block dirty.
    pub fn mark_dirty(&self, block: BlockId) -> Result<()> {
        let mut state = self.state.lock();
        let frame_id = *state
            .block_table
            .get(&block)
            .ok_or(DbError::BlockNotInBuffer(block))?;
        state.frames[frame_id.as_usize()].set_dirty(true);
        Ok(())
    }

    /// Claims the first unused block for `block_type` and installs it in a
    /// frame with a fresh header: no links, zero counts.
    pub fn allocate(&self, block_type: BlockType) -> Result<BlockId> {
        let mut state = self.state.lock();
        let index = state
            .alloc_map
            .iter()
            .position(|&ty| ty == BlockType::Unused)
            .ok_or(DbError::DiskFull)?;
        let block = BlockId::new(index as u32);

        let frame_id = match state.block_table.get(&block) {
            Some(&frame_id) => frame_id,
            None => state.get_free_frame(&self.disk)?,
        };
        let frame = &mut state.frames[frame_id.as_usize()];
        frame.data.fill(0);
        BlockHeader::new(block_type).write(&mut frame.data[..]);
        frame.set_block(block);
        frame.set_dirty(true);

        state.block_table.insert(block, frame_id);
        state.replacer.record_access(frame_id);
        state.alloc_map[index] = block_type;

        debug!(block = block.as_u32(), ?block_type, "allocated block");
        Ok(block)
    }

    /// Returns a block to the unused pool. A resident copy is dropped without
    /// being written, so later fetches of the block never see stale bytes.
    pub fn release(&self, block: BlockId) -> Result<()> {
        let mut state = self.state.lock();
        let index = state.check_block(block)?;
        if state.alloc_map[index] == BlockType::AllocMap {
            return Err(DbError::NotPermitted);
        }
        state.alloc_map[index] = BlockType::Unused;

        if let Some(frame_id) = state.block_table.remove(&block) {
            state.frames[frame_id.as_usize()].reset();
            state.replacer.remove(frame_id);
            state.free_list.push_back(frame_id);
        }

        debug!(block = block.as_u32(), "released block");
        Ok(())
    }

    /// Returns the allocation-map entry of a block.
    pub fn block_type(&self, block: BlockId) -> Result<BlockType> {
        let state = self.state.lock();
        let index = state.check_block(block)?;
        Ok(state.alloc_map[index])
    }

    /// Sets a block's type in both the allocation map and the block's own tag.
    pub fn set_block_type(&self, block: BlockId, block_type: BlockType) -> Result<()> {
        let mut state = self.state.lock();
        let index = state.check_block(block)?;
        let frame_id = state.fetch(&self.disk, block)?;
        let frame = &mut state.frames[frame_id.as_usize()];
        write_block_type(&mut frame.data[..], block_type);
        frame.set_dirty(true);
        state.alloc_map[index] = block_type;
        Ok(())
    }

    /// Number of blocks of the given type according to the allocation map.
    pub fn count_blocks(&self, block_type: BlockType) -> usize {
        self.state
            .lock()
            .alloc_map
            .iter()
            .filter(|&&ty| ty == block_type)
            .count()
    }

    /// Returns true if the block currently occupies a frame.
    pub fn is_resident(&self, block: BlockId) -> bool {
        self.state.lock().block_table.contains_key(&block)
    }

    /// Returns the dirty flag of a resident block.
    pub fn is_dirty(&self, block: BlockId) -> Option<bool> {
        let state = self.state.lock();
        let frame_id = state.block_table.get(&block)?;
        Some(state.frames[frame_id.as_usize()].is_dirty())
    }

    /// Returns the number of frames that hold no block.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Returns the number of frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of blocks on the disk.
    pub fn num_blocks(&self) -> usize {
        self.disk.num_blocks()
    }

    pub fn disk(&self) -> &DiskManager {
        &self.disk
    }

    /// Persists the allocation map and writes every dirty frame back to disk.
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock();

        let mut raw = vec![BlockType::Unused.to_byte(); BLOCK_ALLOCATION_MAP_SIZE * BLOCK_SIZE];
        for (byte, ty) in raw.iter_mut().zip(state.alloc_map.iter()) {
            *byte = ty.to_byte();
        }
        self.disk
            .write_blocks(BlockId::new(0), BLOCK_ALLOCATION_MAP_SIZE, &raw)?;

        for frame in state.frames.iter_mut() {
            if let Some(block) = frame.block() {
                if frame.is_dirty() {
                    self.disk.write_block(block, &frame.data[..])?;
                    frame.set_dirty(false);
                }
            }
        }
        Ok(())
    }
}
