use tracing::debug;

use crate::buffer::{BufferPool, RecBuffer};
use crate::catalog::{AttrCatEntry, CatalogCache, RelCatEntry};
use crate::common::*;
use crate::index::BPlusTree;
use crate::storage::page::record_block_header;
use crate::tuple::{Attribute, Record};

/// Position of a search: the record cursor is used by linear scans, the
/// index cursor by B+ tree scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCursor {
    pub record: Option<RecordId>,
    pub index: Option<IndexId>,
}

impl SearchCursor {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of a successful insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStatus {
    Inserted(RecordId),
    /// The record was stored, but one or more indexes ran out of disk and were dropped
    IndexesReleased(RecordId),
}

impl InsertStatus {
    pub fn rid(&self) -> RecordId {
        match self {
            InsertStatus::Inserted(rid) | InsertStatus::IndexesReleased(rid) => *rid,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            InsertStatus::Inserted(_) => 0,
            InsertStatus::IndexesReleased(_) => E_INDEX_BLOCKS_RELEASED,
        }
    }
}

/// Record access over the relations of an open-relation table.
pub struct BlockAccess<'a> {
    pool: &'a BufferPool,
    cache: &'a mut CatalogCache,
}

impl<'a> BlockAccess<'a> {
    pub fn new(pool: &'a BufferPool, cache: &'a mut CatalogCache) -> Self {
        Self { pool, cache }
    }

    fn tree(&mut self) -> BPlusTree<'_> {
        BPlusTree::new(self.pool, self.cache)
    }

    /// Walks the record chain from `start`, returning the first occupied
    /// record that `matches` accepts.
    fn scan<F>(&self, start: Option<(BlockId, usize)>, mut matches: F) -> Result<Option<(RecordId, Record)>>
    where
        F: FnMut(&Record) -> bool,
    {
        let mut next = start;
        while let Some((block, first_slot)) = next {
            let buffer = RecBuffer::new(self.pool, block);
            let header = buffer.header()?;
            let map = buffer.slot_map()?;
            for slot in first_slot..header.num_slots {
                if map[slot] != SLOT_OCCUPIED {
                    continue;
                }
                let record = buffer.record(slot)?;
                if matches(&record) {
                    return Ok(Some((RecordId::new(block, slot), record)));
                }
            }
            next = header.right.map(|right| (right, 0));
        }
        Ok(None)
    }

    fn scan_start(&self, rel: RelId, cursor: Option<RecordId>) -> Result<Option<(BlockId, usize)>> {
        Ok(match cursor {
            None => self.cache.relations.get(rel)?.first_block.map(|b| (b, 0)),
            Some(rid) => Some((rid.block, rid.slot + 1)),
        })
    }

    /// Next record after `cursor` whose `attr_name` compares to `value` as `op` asks.
    pub fn linear_search(
        &self,
        rel: RelId,
        attr_name: &str,
        value: &Attribute,
        op: CompareOp,
        cursor: Option<RecordId>,
    ) -> Result<Option<RecordId>> {
        let attr = self.cache.attributes.get_by_name(rel, attr_name)?;
        let (offset, attr_type) = (attr.offset, attr.attr_type);
        let start = self.scan_start(rel, cursor)?;
        let hit = self.scan(start, |record| {
            record
                .get(offset)
                .is_some_and(|field| op.matches(field.compare(value, attr_type)))
        })?;
        Ok(hit.map(|(rid, _)| rid))
    }

    /// Next matching record, through the attribute's index when it has one.
    pub fn search(
        &mut self,
        rel: RelId,
        attr_name: &str,
        value: &Attribute,
        op: CompareOp,
        cursor: &mut SearchCursor,
    ) -> Result<Option<Record>> {
        let indexed = self
            .cache
            .attributes
            .get_by_name(rel, attr_name)?
            .root_block
            .is_some();

        let hit = if indexed {
            let found = self.tree().search(rel, attr_name, value, op, cursor.index)?;
            found.map(|(index_id, rid)| {
                cursor.index = Some(index_id);
                rid
            })
        } else {
            let found = self.linear_search(rel, attr_name, value, op, cursor.record)?;
            if found.is_some() {
                cursor.record = found;
            }
            found
        };
        hit.map(|rid| self.record(rid)).transpose()
    }

    /// Next occupied record after `cursor`, advancing it.
    pub fn project(&self, rel: RelId, cursor: &mut Option<RecordId>) -> Result<Option<Record>> {
        let start = self.scan_start(rel, *cursor)?;
        Ok(self.scan(start, |_| true)?.map(|(rid, record)| {
            *cursor = Some(rid);
            record
        }))
    }

    /// `search` driven by the cursors kept in the caches.
    pub fn search_next(
        &mut self,
        rel: RelId,
        attr_name: &str,
        value: &Attribute,
        op: CompareOp,
    ) -> Result<Option<Record>> {
        let mut cursor = SearchCursor {
            record: self.cache.relations.search_index(rel)?,
            index: self.cache.attributes.search_index(rel, attr_name)?,
        };
        let record = self.search(rel, attr_name, value, op, &mut cursor)?;
        self.cache.relations.set_search_index(rel, cursor.record)?;
        self.cache
            .attributes
            .set_search_index(rel, attr_name, cursor.index)?;
        Ok(record)
    }

    /// `project` driven by the relation's cached cursor.
    pub fn project_next(&mut self, rel: RelId) -> Result<Option<Record>> {
        let mut cursor = self.cache.relations.search_index(rel)?;
        let record = self.project(rel, &mut cursor)?;
        self.cache.relations.set_search_index(rel, cursor)?;
        Ok(record)
    }

    /// The record stored at `rid`.
    pub fn record(&self, rid: RecordId) -> Result<Record> {
        let buffer = RecBuffer::new(self.pool, rid.block);
        let map = buffer.slot_map()?;
        match map.get(rid.slot) {
            Some(&SLOT_OCCUPIED) => buffer.record(rid.slot),
            Some(_) => Err(DbError::NotFound),
            None => Err(DbError::OutOfBound),
        }
    }

    /// Stores `record` in the first free slot of `rel`, growing the chain if
    /// needed, then adds it to every index of the relation.
    pub fn insert(&mut self, rel: RelId, record: &[Attribute]) -> Result<InsertStatus> {
        let mut rel_entry = self.cache.relations.get(rel)?.clone();
        if record.len() != rel_entry.num_attrs {
            return Err(DbError::AttributeCountMismatch {
                expected: rel_entry.num_attrs,
                actual: record.len(),
            });
        }

        let mut free = None;
        let mut tail = None;
        let mut next = rel_entry.first_block;
        while let Some(block) = next {
            let buffer = RecBuffer::new(self.pool, block);
            let map = buffer.slot_map()?;
            if let Some(slot) = map.iter().position(|&s| s == SLOT_UNOCCUPIED) {
                free = Some(RecordId::new(block, slot));
                break;
            }
            tail = Some(block);
            next = buffer.header()?.right;
        }

        let rid = match free {
            Some(rid) => rid,
            None => {
                if rel == RELCAT_RELID {
                    return Err(DbError::MaxRelations);
                }
                let rid = self.append_block(&mut rel_entry, tail)?;
                debug!(rel = rel_entry.rel_name.as_str(), block = rid.block.as_u32(), "extended relation");
                rid
            }
        };

        let buffer = RecBuffer::new(self.pool, rid.block);
        buffer.set_record(rid.slot, record)?;
        buffer.set_slot(rid.slot, SLOT_OCCUPIED)?;
        let mut header = buffer.header()?;
        header.num_entries += 1;
        buffer.set_header(&header)?;

        rel_entry.num_recs += 1;
        self.cache.relations.set(rel, rel_entry)?;

        let mut released = false;
        for attr in self.cache.attributes.attributes(rel)? {
            if attr.root_block.is_none() {
                continue;
            }
            let key = record.get(attr.offset).ok_or(DbError::OutOfBound)?;
            match self.tree().insert(rel, &attr.attr_name, key, rid) {
                Ok(()) => {}
                Err(DbError::DiskFull) => released = true,
                Err(err) => return Err(err),
            }
        }

        Ok(if released {
            InsertStatus::IndexesReleased(rid)
        } else {
            InsertStatus::Inserted(rid)
        })
    }

    /// Links a fresh record block after `tail` and returns its first slot.
    fn append_block(&self, rel_entry: &mut RelCatEntry, tail: Option<BlockId>) -> Result<RecordId> {
        let buffer = RecBuffer::allocate(self.pool)?;
        let mut header = record_block_header(rel_entry.num_attrs, rel_entry.num_slots_per_block);
        header.left = tail;
        buffer.init(&header)?;

        match tail {
            Some(tail) => {
                let tail_buffer = RecBuffer::new(self.pool, tail);
                let mut tail_header = tail_buffer.header()?;
                tail_header.right = Some(buffer.block());
                tail_buffer.set_header(&tail_header)?;
            }
            None => rel_entry.first_block = Some(buffer.block()),
        }
        rel_entry.last_block = Some(buffer.block());
        Ok(RecordId::new(buffer.block(), 0))
    }

    /// Frees one catalog slot and keeps the catalog's cached counts right.
    /// Returns true when the slot's block became empty and was released.
    fn remove_catalog_record(&mut self, catalog: RelId, rid: RecordId) -> Result<bool> {
        let buffer = RecBuffer::new(self.pool, rid.block);
        buffer.set_slot(rid.slot, SLOT_UNOCCUPIED)?;
        let mut header = buffer.header()?;
        header.num_entries = header.num_entries.saturating_sub(1);
        buffer.set_header(&header)?;

        let mut catalog_entry = self.cache.relations.get(catalog)?.clone();
        catalog_entry.num_recs = catalog_entry.num_recs.saturating_sub(1);

        let emptied = header.num_entries == 0 && catalog_entry.first_block != Some(rid.block);
        if emptied {
            if let Some(left) = header.left {
                let left_buffer = RecBuffer::new(self.pool, left);
                let mut left_header = left_buffer.header()?;
                left_header.right = header.right;
                left_buffer.set_header(&left_header)?;
            }
            match header.right {
                Some(right) => {
                    let right_buffer = RecBuffer::new(self.pool, right);
                    let mut right_header = right_buffer.header()?;
                    right_header.left = header.left;
                    right_buffer.set_header(&right_header)?;
                }
                None => catalog_entry.last_block = header.left,
            }
            buffer.release()?;
        }
        self.cache.relations.set(catalog, catalog_entry)?;
        Ok(emptied)
    }

    fn find_relation(&self, rel_name: &str) -> Result<Option<RecordId>> {
        let key = Attribute::string(rel_name)?;
        self.linear_search(RELCAT_RELID, RELCAT_ATTR_RELNAME, &key, CompareOp::Eq, None)
    }

    /// Record ids of every attribute catalog record of `rel_name`.
    fn attribute_records(&self, rel_name: &str) -> Result<Vec<(RecordId, AttrCatEntry)>> {
        let key = Attribute::string(rel_name)?;
        let mut attrs = Vec::new();
        let mut cursor = None;
        while let Some(rid) =
            self.linear_search(ATTRCAT_RELID, ATTRCAT_ATTR_RELNAME, &key, CompareOp::Eq, cursor)?
        {
            attrs.push((rid, AttrCatEntry::from_record(&self.record(rid)?)?));
            cursor = Some(rid);
        }
        Ok(attrs)
    }

    /// Drops a relation: its record blocks, its indexes and its catalog records.
    pub fn delete_relation(&mut self, rel_name: &str) -> Result<()> {
        if rel_name == RELCAT_RELNAME || rel_name == ATTRCAT_RELNAME {
            return Err(DbError::NotPermitted);
        }
        let rel_rid = self
            .find_relation(rel_name)?
            .ok_or_else(|| DbError::RelationNotExist(rel_name.to_string()))?;
        let rel_entry = RelCatEntry::from_record(&self.record(rel_rid)?)?;

        let mut next = rel_entry.first_block;
        while let Some(block) = next {
            let buffer = RecBuffer::new(self.pool, block);
            next = buffer.header()?.right;
            buffer.release()?;
        }

        let key = Attribute::string(rel_name)?;
        let mut cursor = None;
        while let Some(rid) =
            self.linear_search(ATTRCAT_RELID, ATTRCAT_ATTR_RELNAME, &key, CompareOp::Eq, cursor)?
        {
            let attr = AttrCatEntry::from_record(&self.record(rid)?)?;
            // the released block's slots can no longer be resumed from
            cursor = if self.remove_catalog_record(ATTRCAT_RELID, rid)? {
                None
            } else {
                Some(rid)
            };
            if let Some(root) = attr.root_block {
                self.tree().destroy(root)?;
            }
        }

        self.remove_catalog_record(RELCAT_RELID, rel_rid)?;
        debug!(rel = rel_name, "deleted relation");
        Ok(())
    }

    /// Renames a relation in its catalog record and in every attribute record.
    pub fn rename_relation(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if self.find_relation(new_name)?.is_some() {
            return Err(DbError::RelationExists(new_name.to_string()));
        }
        let rel_rid = self
            .find_relation(old_name)?
            .ok_or_else(|| DbError::RelationNotExist(old_name.to_string()))?;

        let new_key = Attribute::string(new_name)?;
        let mut record = self.record(rel_rid)?;
        record[RELCAT_REL_NAME_INDEX] = new_key;
        RecBuffer::new(self.pool, rel_rid.block).set_record(rel_rid.slot, &record)?;

        for (rid, _) in self.attribute_records(old_name)? {
            let mut record = self.record(rid)?;
            record[ATTRCAT_REL_NAME_INDEX] = new_key;
            RecBuffer::new(self.pool, rid.block).set_record(rid.slot, &record)?;
        }
        Ok(())
    }

    /// Renames one attribute of a relation in the attribute catalog.
    pub fn rename_attribute(&mut self, rel_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        if self.find_relation(rel_name)?.is_none() {
            return Err(DbError::RelationNotExist(rel_name.to_string()));
        }
        let new_key = Attribute::string(new_name)?;

        let attrs = self.attribute_records(rel_name)?;
        if attrs.iter().any(|(_, attr)| attr.attr_name == new_name) {
            return Err(DbError::AttributeExists(new_name.to_string()));
        }
        let (rid, _) = attrs
            .into_iter()
            .find(|(_, attr)| attr.attr_name == old_name)
            .ok_or_else(|| DbError::AttributeNotExist(old_name.to_string()))?;

        let mut record = self.record(rid)?;
        record[ATTRCAT_ATTR_NAME_INDEX] = new_key;
        RecBuffer::new(self.pool, rid.block).set_record(rid.slot, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{format_disk, AttrCacheEntry, RelCacheEntry};
    use crate::storage::disk::DiskManager;
    use crate::tuple::AttrType;
    use tempfile::NamedTempFile;

    const REL: RelId = RelId(2);

    /// A pool over a formatted disk plus a cache with a hand-installed
    /// two-attribute relation in slot 2 that has no blocks yet.
    fn setup(temp_file: &NamedTempFile) -> (BufferPool, CatalogCache) {
        let disk = DiskManager::new(temp_file.path(), 64).unwrap();
        format_disk(&disk).unwrap();
        let pool = BufferPool::new(disk, 8).unwrap();

        let mut cache = CatalogCache::new(4);
        let rel_entry = RelCatEntry::new("T", 2);
        let rec_id = RecordId::new(RELCAT_BLOCK, 2);
        cache
            .relations
            .install(REL, RelCacheEntry::new(rel_entry, rec_id))
            .unwrap();
        let attrs = vec![
            AttrCacheEntry::new(
                AttrCatEntry::new("T", "Key", AttrType::Number, 0),
                RecordId::new(ATTRCAT_BLOCK, 12),
            ),
            AttrCacheEntry::new(
                AttrCatEntry::new("T", "Name", AttrType::String, 1),
                RecordId::new(ATTRCAT_BLOCK, 13),
            ),
        ];
        cache.attributes.install(REL, attrs).unwrap();
        (pool, cache)
    }

    fn row(key: f64, name: &str) -> Record {
        vec![Attribute::number(key), Attribute::string(name).unwrap()]
    }

    #[test]
    fn test_insert_then_read_back() {
        let temp_file = NamedTempFile::new().unwrap();
        let (pool, mut cache) = setup(&temp_file);
        let mut access = BlockAccess::new(&pool, &mut cache);

        let status = access.insert(REL, &row(1.0, "one")).unwrap();
        assert_eq!(status.code(), 0);
        let record = access.record(status.rid()).unwrap();
        assert_eq!(record, row(1.0, "one"));

        assert!(matches!(
            access.insert(REL, &[Attribute::number(1.0)]),
            Err(DbError::AttributeCountMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            access.record(RecordId::new(status.rid().block, 1)),
            Err(DbError::NotFound)
        ));
    }

    #[test]
    fn test_full_tail_grows_by_one_block() {
        let temp_file = NamedTempFile::new().unwrap();
        let (pool, mut cache) = setup(&temp_file);
        let slots = slots_per_block(2);
        {
            let mut access = BlockAccess::new(&pool, &mut cache);
            for i in 0..slots {
                access.insert(REL, &row(i as f64, "r")).unwrap();
            }
        }
        let first = cache.relations.get(REL).unwrap().first_block.unwrap();
        assert_eq!(cache.relations.get(REL).unwrap().last_block, Some(first));
        let before = pool.count_blocks(BlockType::Record);

        let rid = BlockAccess::new(&pool, &mut cache)
            .insert(REL, &row(-1.0, "x"))
            .unwrap()
            .rid();
        assert_eq!(pool.count_blocks(BlockType::Record), before + 1);
        assert_eq!(rid.slot, 0);

        let entry = cache.relations.get(REL).unwrap();
        assert_eq!(entry.num_recs, slots + 1);
        assert_eq!(entry.last_block, Some(rid.block));
        assert_eq!(RecBuffer::new(&pool, first).header().unwrap().right, Some(rid.block));
        assert_eq!(RecBuffer::new(&pool, rid.block).header().unwrap().left, Some(first));
    }

    #[test]
    fn test_linear_search_resumes_after_cursor() {
        let temp_file = NamedTempFile::new().unwrap();
        let (pool, mut cache) = setup(&temp_file);
        let mut access = BlockAccess::new(&pool, &mut cache);
        for i in 0..10 {
            access.insert(REL, &row((i % 3) as f64, "v")).unwrap();
        }

        let target = Attribute::number(1.0);
        let mut cursor = None;
        let mut hits = 0;
        while let Some(rid) = access
            .linear_search(REL, "Key", &target, CompareOp::Eq, cursor)
            .unwrap()
        {
            hits += 1;
            cursor = Some(rid);
        }
        assert_eq!(hits, 3);
        assert!(cursor.is_some());

        let mut cursor = SearchCursor::default();
        let mut below = 0;
        while access
            .search(REL, "Key", &target, CompareOp::Lt, &mut cursor)
            .unwrap()
            .is_some()
        {
            below += 1;
        }
        assert_eq!(below, 4);
    }

    #[test]
    fn test_project_next_uses_cached_cursor() {
        let temp_file = NamedTempFile::new().unwrap();
        let (pool, mut cache) = setup(&temp_file);
        let mut access = BlockAccess::new(&pool, &mut cache);
        for i in 0..5 {
            access.insert(REL, &row(i as f64, "p")).unwrap();
        }

        let mut seen = Vec::new();
        while let Some(record) = access.project_next(REL).unwrap() {
            seen.push(record[0].as_number());
        }
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(access.project_next(REL).unwrap().is_none());

        cache.relations.reset_search_index(REL).unwrap();
        let mut access = BlockAccess::new(&pool, &mut cache);
        assert!(access.project_next(REL).unwrap().is_some());
    }
}
