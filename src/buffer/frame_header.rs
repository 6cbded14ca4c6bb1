use crate::common::{BlockId, FrameId, BLOCK_SIZE};

/// FrameHeader manages a single buffer frame in the buffer pool.
/// It stores which block the frame caches, whether it was modified and
/// the block bytes themselves.
pub struct FrameHeader {
    /// The frame ID (index in the buffer pool)
    frame_id: FrameId,
    /// The block cached in this frame (None if the frame is free)
    block: Option<BlockId>,
    /// Whether the block has been modified since being read from disk
    is_dirty: bool,
    /// The block contents
    pub(crate) data: Box<[u8; BLOCK_SIZE]>,
}

impl FrameHeader {
    /// Creates a new, free FrameHeader for the given frame ID.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            block: None,
            is_dirty: false,
            data: Box::new([0u8; BLOCK_SIZE]),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the block cached in this frame.
    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    pub(crate) fn set_block(&mut self, block: BlockId) {
        self.block = Some(block);
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    /// Returns the frame to its free state, abandoning the contents.
    pub(crate) fn reset(&mut self) {
        self.block = None;
        self.is_dirty = false;
        self.data.fill(0);
    }
}
