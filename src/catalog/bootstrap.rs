use tracing::info;

use crate::common::*;
use crate::storage::disk::DiskManager;
use crate::storage::page::{record_block_header, RecordBlock};
use crate::tuple::AttrType;

use super::{AttrCatEntry, RelCatEntry};

/// Attribute layout of the relation catalog, in offset order.
const RELCAT_ATTRS: [(&str, AttrType); CATALOG_NO_ATTRS] = [
    (RELCAT_ATTR_RELNAME, AttrType::String),
    (RELCAT_ATTR_NO_ATTRIBUTES, AttrType::Number),
    (RELCAT_ATTR_NO_RECORDS, AttrType::Number),
    (RELCAT_ATTR_FIRST_BLOCK, AttrType::Number),
    (RELCAT_ATTR_LAST_BLOCK, AttrType::Number),
    (RELCAT_ATTR_NO_SLOTS, AttrType::Number),
];

/// Attribute layout of the attribute catalog, in offset order.
const ATTRCAT_ATTRS: [(&str, AttrType); CATALOG_NO_ATTRS] = [
    (ATTRCAT_ATTR_RELNAME, AttrType::String),
    (ATTRCAT_ATTR_ATTRIBUTE_NAME, AttrType::String),
    (ATTRCAT_ATTR_ATTRIBUTE_TYPE, AttrType::Number),
    (ATTRCAT_ATTR_PRIMARY_FLAG, AttrType::Number),
    (ATTRCAT_ATTR_ROOT_BLOCK, AttrType::Number),
    (ATTRCAT_ATTR_OFFSET, AttrType::Number),
];

/// The records both catalogs describe themselves with, as written by `format_disk`.
fn bootstrap_relations() -> [RelCatEntry; 2] {
    let mut relcat = RelCatEntry::new(RELCAT_RELNAME, CATALOG_NO_ATTRS);
    relcat.num_recs = 2;
    relcat.first_block = Some(RELCAT_BLOCK);
    relcat.last_block = Some(RELCAT_BLOCK);

    let mut attrcat = RelCatEntry::new(ATTRCAT_RELNAME, CATALOG_NO_ATTRS);
    attrcat.num_recs = 2 * CATALOG_NO_ATTRS;
    attrcat.first_block = Some(ATTRCAT_BLOCK);
    attrcat.last_block = Some(ATTRCAT_BLOCK);

    [relcat, attrcat]
}

fn bootstrap_attributes() -> Vec<AttrCatEntry> {
    let relcat = RELCAT_ATTRS
        .iter()
        .enumerate()
        .map(|(offset, (name, ty))| AttrCatEntry::new(RELCAT_RELNAME, name, *ty, offset));
    let attrcat = ATTRCAT_ATTRS
        .iter()
        .enumerate()
        .map(|(offset, (name, ty))| AttrCatEntry::new(ATTRCAT_RELNAME, name, *ty, offset));
    relcat.chain(attrcat).collect()
}

/// A disk is formatted once its allocation map describes itself.
pub fn is_formatted(disk: &DiskManager) -> Result<bool> {
    let mut data = [0u8; BLOCK_SIZE];
    disk.read_block(BlockId::new(0), &mut data)?;
    Ok(data[..BLOCK_ALLOCATION_MAP_SIZE]
        .iter()
        .all(|&b| b == BlockType::AllocMap.to_byte()))
}

/// Writes an empty database: the allocation map and both catalog blocks.
pub fn format_disk(disk: &DiskManager) -> Result<()> {
    let num_blocks = disk.num_blocks();
    if num_blocks <= ATTRCAT_BLOCK.as_usize() {
        return Err(DbError::OutOfBound);
    }

    let mut map = vec![BlockType::Unused.to_byte(); BLOCK_ALLOCATION_MAP_SIZE * BLOCK_SIZE];
    map[..BLOCK_ALLOCATION_MAP_SIZE].fill(BlockType::AllocMap.to_byte());
    map[RELCAT_BLOCK.as_usize()] = BlockType::Record.to_byte();
    map[ATTRCAT_BLOCK.as_usize()] = BlockType::Record.to_byte();
    disk.write_blocks(BlockId::new(0), BLOCK_ALLOCATION_MAP_SIZE, &map)?;

    let relations = bootstrap_relations();
    let relation_records = relations
        .iter()
        .map(|r| r.to_record())
        .collect::<Result<Vec<_>>>()?;
    let attribute_records = bootstrap_attributes()
        .iter()
        .map(|a| a.to_record())
        .collect::<Result<Vec<_>>>()?;

    for (block, records) in [
        (RELCAT_BLOCK, relation_records),
        (ATTRCAT_BLOCK, attribute_records),
    ] {
        let mut data = vec![0u8; BLOCK_SIZE];
        let mut header = record_block_header(CATALOG_NO_ATTRS, CATALOG_NO_SLOTS);
        header.num_entries = records.len();
        let mut view = RecordBlock::new(&mut data[..]);
        view.init(&header)?;
        for (slot, record) in records.iter().enumerate() {
            view.set_record(slot, record)?;
            view.set_slot(slot, SLOT_OCCUPIED)?;
        }
        disk.write_block(block, &data)?;
    }

    disk.sync()?;
    info!(path = disk.get_db_path(), num_blocks, "formatted disk");
    Ok(())
}
