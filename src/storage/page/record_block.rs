use crate::common::{
    BlockType, DbError, Result, ATTR_SIZE, BLOCK_SIZE, HEADER_SIZE, SLOT_OCCUPIED, SLOT_UNOCCUPIED,
};
use crate::tuple::{Attribute, Record};

use super::BlockHeader;

/// Record block layout:
///
/// | Region   | Offset                      | Size                    |
/// |----------|-----------------------------|-------------------------|
/// | header   | 0                           | 32                      |
/// | slot map | 32                          | num_slots               |
/// | records  | 32 + num_slots              | num_slots * record_size |
///
/// `record_size` is `num_attrs * 16`; both counts come from the header.
pub struct RecordBlock<B> {
    data: B,
}

impl<B: AsRef<[u8]>> RecordBlock<B> {
    /// Creates a view over a block buffer.
    pub fn new(data: B) -> Self {
        Self { data }
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader::read(self.data.as_ref())
    }

    /// The slot map, one byte per slot.
    pub fn slot_map(&self) -> Result<&[u8]> {
        let num_slots = self.layout()?.num_slots;
        Ok(&self.data.as_ref()[HEADER_SIZE..HEADER_SIZE + num_slots])
    }

    pub fn is_occupied(&self, slot: usize) -> Result<bool> {
        let map = self.slot_map()?;
        map.get(slot)
            .map(|&b| b == SLOT_OCCUPIED)
            .ok_or(DbError::OutOfBound)
    }

    /// Index of the first free slot, if any.
    pub fn free_slot(&self) -> Result<Option<usize>> {
        Ok(self.slot_map()?.iter().position(|&b| b == SLOT_UNOCCUPIED))
    }

    pub fn record(&self, slot: usize) -> Result<Record> {
        let layout = self.layout()?;
        let offset = layout.record_offset(slot)?;
        let data = self.data.as_ref();
        Ok((0..layout.num_attrs)
            .map(|i| Attribute::from_slice(&data[offset + i * ATTR_SIZE..]))
            .collect())
    }

    fn layout(&self) -> Result<Layout> {
        let header = self.header();
        Layout::checked(header.num_slots, header.num_attrs)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> RecordBlock<B> {
    /// Writes a fresh header and marks every slot free.
    pub fn init(&mut self, header: &BlockHeader) -> Result<()> {
        Layout::checked(header.num_slots, header.num_attrs)?;
        let data = self.data.as_mut();
        header.write(data);
        data[HEADER_SIZE..HEADER_SIZE + header.num_slots].fill(SLOT_UNOCCUPIED);
        Ok(())
    }

    pub fn set_header(&mut self, header: &BlockHeader) {
        header.write(self.data.as_mut());
    }

    /// Replaces the whole slot map; `map` must have exactly `num_slots` bytes.
    pub fn set_slot_map(&mut self, map: &[u8]) -> Result<()> {
        let num_slots = self.layout()?.num_slots;
        if map.len() != num_slots {
            return Err(DbError::OutOfBound);
        }
        self.data.as_mut()[HEADER_SIZE..HEADER_SIZE + num_slots].copy_from_slice(map);
        Ok(())
    }

    pub fn set_slot(&mut self, slot: usize, state: u8) -> Result<()> {
        let num_slots = self.layout()?.num_slots;
        if slot >= num_slots {
            return Err(DbError::OutOfBound);
        }
        self.data.as_mut()[HEADER_SIZE + slot] = state;
        Ok(())
    }

    pub fn set_record(&mut self, slot: usize, record: &[Attribute]) -> Result<()> {
        let layout = self.layout()?;
        if record.len() != layout.num_attrs {
            return Err(DbError::AttributeCountMismatch {
                expected: layout.num_attrs,
                actual: record.len(),
            });
        }
        let offset = layout.record_offset(slot)?;
        let data = self.data.as_mut();
        for (i, attr) in record.iter().enumerate() {
            let start = offset + i * ATTR_SIZE;
            data[start..start + ATTR_SIZE].copy_from_slice(attr.as_bytes());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    num_slots: usize,
    num_attrs: usize,
}

impl Layout {
    /// Rejects headers whose slot map and records would not fit in one block.
    fn checked(num_slots: usize, num_attrs: usize) -> Result<Self> {
        let record_size = num_attrs.checked_mul(ATTR_SIZE).ok_or(DbError::OutOfBound)?;
        let used = record_size
            .checked_add(1)
            .and_then(|per_slot| per_slot.checked_mul(num_slots))
            .ok_or(DbError::OutOfBound)?;
        if HEADER_SIZE + used > BLOCK_SIZE {
            return Err(DbError::OutOfBound);
        }
        Ok(Self {
            num_slots,
            num_attrs,
        })
    }

    fn record_offset(&self, slot: usize) -> Result<usize> {
        if slot >= self.num_slots {
            return Err(DbError::OutOfBound);
        }
        Ok(HEADER_SIZE + self.num_slots + slot * self.num_attrs * ATTR_SIZE)
    }
}

/// Header for an empty record block of a relation with `num_attrs` attributes.
pub fn record_block_header(num_attrs: usize, num_slots: usize) -> BlockHeader {
    let mut header = BlockHeader::new(BlockType::Record);
    header.num_attrs = num_attrs;
    header.num_slots = num_slots;
    header
}
