use super::error::{DbError, Result};
use super::types::{BlockId, RelId};

/// Size of a disk block in bytes (2 KB)
pub const BLOCK_SIZE: usize = 2048;

/// Largest disk the allocation map can describe: one byte per block over 4 blocks
pub const DISK_BLOCKS: usize = 8192;

/// Number of blocks reserved for the block-type allocation map
pub const BLOCK_ALLOCATION_MAP_SIZE: usize = 4;

/// Default buffer pool size (number of frames)
pub const BUFFER_CAPACITY: usize = 32;

/// Default number of open-relation slots, including the two catalogs
pub const MAX_OPEN: usize = 12;

/// Every attribute value occupies exactly this many bytes
pub const ATTR_SIZE: usize = 16;

/// Size of the common block header
pub const HEADER_SIZE: usize = 32;

/// Bytes left for the slot map and records after the header
pub const RECORD_AREA_SIZE: usize = BLOCK_SIZE - HEADER_SIZE;

/// Most attributes a relation can have while still fitting one record per block
pub const MAX_ATTRS: usize = (RECORD_AREA_SIZE - 1) / ATTR_SIZE;

/// Sentinel written to disk for a missing block link
pub const INVALID_BLOCK_NUM: i32 = -1;

/// Slot map byte for a slot holding a record
pub const SLOT_OCCUPIED: u8 = 1;

/// Slot map byte for a free slot
pub const SLOT_UNOCCUPIED: u8 = 0;

/// Block holding the relation catalog
pub const RELCAT_BLOCK: BlockId = BlockId(4);

/// First block of the attribute catalog
pub const ATTRCAT_BLOCK: BlockId = BlockId(5);

/// Open-relation slot of the relation catalog
pub const RELCAT_RELID: RelId = RelId(0);

/// Open-relation slot of the attribute catalog
pub const ATTRCAT_RELID: RelId = RelId(1);

pub const RELCAT_RELNAME: &str = "RELATIONCAT";
pub const ATTRCAT_RELNAME: &str = "ATTRIBUTECAT";

/// Both catalogs carry six attributes per record
pub const CATALOG_NO_ATTRS: usize = 6;

/// Slots per block for a six-attribute relation
pub const CATALOG_NO_SLOTS: usize = RECORD_AREA_SIZE / (ATTR_SIZE * CATALOG_NO_ATTRS + 1);

pub const RELCAT_ATTR_RELNAME: &str = "RelName";
pub const RELCAT_ATTR_NO_ATTRIBUTES: &str = "#Attributes";
pub const RELCAT_ATTR_NO_RECORDS: &str = "#Records";
pub const RELCAT_ATTR_FIRST_BLOCK: &str = "FirstBlock";
pub const RELCAT_ATTR_LAST_BLOCK: &str = "LastBlock";
pub const RELCAT_ATTR_NO_SLOTS: &str = "#Slots";

pub const ATTRCAT_ATTR_RELNAME: &str = "RelName";
pub const ATTRCAT_ATTR_ATTRIBUTE_NAME: &str = "AttributeName";
pub const ATTRCAT_ATTR_ATTRIBUTE_TYPE: &str = "AttributeType";
pub const ATTRCAT_ATTR_PRIMARY_FLAG: &str = "PrimaryFlag";
pub const ATTRCAT_ATTR_ROOT_BLOCK: &str = "RootBlock";
pub const ATTRCAT_ATTR_OFFSET: &str = "Offset";

// Record field positions, shared by both catalog layouts.
pub const RELCAT_REL_NAME_INDEX: usize = 0;
pub const RELCAT_NO_ATTRIBUTES_INDEX: usize = 1;
pub const RELCAT_NO_RECORDS_INDEX: usize = 2;
pub const RELCAT_FIRST_BLOCK_INDEX: usize = 3;
pub const RELCAT_LAST_BLOCK_INDEX: usize = 4;
pub const RELCAT_NO_SLOTS_PER_BLOCK_INDEX: usize = 5;

pub const ATTRCAT_REL_NAME_INDEX: usize = 0;
pub const ATTRCAT_ATTR_NAME_INDEX: usize = 1;
pub const ATTRCAT_ATTR_TYPE_INDEX: usize = 2;
pub const ATTRCAT_PRIMARY_FLAG_INDEX: usize = 3;
pub const ATTRCAT_ROOT_BLOCK_INDEX: usize = 4;
pub const ATTRCAT_OFFSET_INDEX: usize = 5;

/// Stride of an internal index entry; the right child overlaps the next entry's left child
pub const INTERNAL_ENTRY_SIZE: usize = 20;

/// Stride of a leaf index entry (key, block, slot, padding)
pub const LEAF_ENTRY_SIZE: usize = 32;

/// Maximum entries held by an internal node
pub const MAX_KEYS_INTERNAL: usize = 100;

/// Index of the key promoted when an overflowing internal node splits
pub const MIDDLE_INDEX_INTERNAL: usize = 50;

/// Maximum entries held by a leaf
pub const MAX_KEYS_LEAF: usize = 63;

/// Index of the last entry kept by the left leaf after a split
pub const MIDDLE_INDEX_LEAF: usize = 31;

/// Partial-success code reported when an insert had to drop one or more indexes
pub const E_INDEX_BLOCKS_RELEASED: i32 = -22;

/// Number of slots a record block offers a relation with `num_attrs` attributes.
pub fn slots_per_block(num_attrs: usize) -> usize {
    RECORD_AREA_SIZE / (ATTR_SIZE * num_attrs + 1)
}

/// Sizing knobs for a database instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    /// Number of blocks in the disk file
    pub disk_blocks: usize,
    /// Number of frames in the buffer pool
    pub buffer_capacity: usize,
    /// Number of open-relation slots, including the two catalogs
    pub max_open: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            disk_blocks: DISK_BLOCKS,
            buffer_capacity: BUFFER_CAPACITY,
            max_open: MAX_OPEN,
        }
    }
}

impl StorageOptions {
    /// Options for a disk of `disk_blocks` blocks with default pool and table sizes.
    pub fn with_disk_blocks(disk_blocks: usize) -> Self {
        Self {
            disk_blocks,
            ..Self::default()
        }
    }

    /// Rejects sizes the on-disk layout cannot describe.
    pub fn validate(&self) -> Result<()> {
        // the allocation map plus both catalog blocks must fit
        let reserved = ATTRCAT_BLOCK.as_usize() + 1;
        if self.disk_blocks <= reserved || self.disk_blocks > DISK_BLOCKS {
            return Err(DbError::OutOfBound);
        }
        if self.buffer_capacity == 0 || self.max_open <= ATTRCAT_RELID.as_usize() + 1 {
            return Err(DbError::OutOfBound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_slots() {
        assert_eq!(CATALOG_NO_SLOTS, 20);
        assert_eq!(slots_per_block(2), 61);
        assert_eq!(slots_per_block(125), 1);
    }

    #[test]
    fn test_options_validate() {
        assert!(StorageOptions::default().validate().is_ok());
        assert!(StorageOptions::with_disk_blocks(6).validate().is_err());
        assert!(StorageOptions::with_disk_blocks(DISK_BLOCKS + 1).validate().is_err());
        let options = StorageOptions {
            max_open: 2,
            ..StorageOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
