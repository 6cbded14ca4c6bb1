use std::ops::{Deref, DerefMut};

use parking_lot::MutexGuard;

use crate::common::{BlockId, FrameId};

use super::buffer_pool::PoolState;

/// RAII guard for read-only access to a cached block.
///
/// The guard holds the pool lock, so the frame cannot be evicted or released
/// while it is alive. Drop it before calling back into the pool.
pub struct ReadBlockGuard<'a> {
    state: MutexGuard<'a, PoolState>,
    frame_id: FrameId,
    block: BlockId,
}

impl<'a> ReadBlockGuard<'a> {
    pub(crate) fn new(state: MutexGuard<'a, PoolState>, frame_id: FrameId, block: BlockId) -> Self {
        Self {
            state,
            frame_id,
            block,
        }
    }

    /// Returns the block number.
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Returns the block contents.
    pub fn data(&self) -> &[u8] {
        &self.state.frames[self.frame_id.as_usize()].data[..]
    }
}

impl Deref for ReadBlockGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

/// RAII guard for read-write access to a cached block.
/// Marks the frame dirty on drop if the contents were borrowed mutably.
pub struct WriteBlockGuard<'a> {
    state: MutexGuard<'a, PoolState>,
    frame_id: FrameId,
    block: BlockId,
    is_dirty: bool,
}

impl<'a> WriteBlockGuard<'a> {
    pub(crate) fn new(state: MutexGuard<'a, PoolState>, frame_id: FrameId, block: BlockId) -> Self {
        Self {
            state,
            frame_id,
            block,
            is_dirty: false,
        }
    }

    /// Returns the block number.
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Returns the block contents.
    pub fn data(&self) -> &[u8] {
        &self.state.frames[self.frame_id.as_usize()].data[..]
    }

    /// Returns the block contents for modification and marks the block dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.is_dirty = true;
        &mut self.state.frames[self.frame_id.as_usize()].data[..]
    }
}

impl Deref for WriteBlockGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl DerefMut for WriteBlockGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl Drop for WriteBlockGuard<'_> {
    fn drop(&mut self) {
        if self.is_dirty {
            let frame_id = self.frame_id.as_usize();
            self.state.frames[frame_id].set_dirty(true);
        }
    }
}
