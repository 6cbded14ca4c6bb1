use crate::common::{DbError, RecordId, RelId, Result};

use super::RelCatEntry;

/// Cached relation catalog record of one open relation.
#[derive(Debug, Clone)]
pub struct RelCacheEntry {
    pub(crate) entry: RelCatEntry,
    /// Where the catalog record lives, for write-back
    pub(crate) rec_id: RecordId,
    pub(crate) dirty: bool,
    /// Last record returned by a cached scan over this relation
    pub(crate) search_index: Option<RecordId>,
}

impl RelCacheEntry {
    pub fn new(entry: RelCatEntry, rec_id: RecordId) -> Self {
        Self {
            entry,
            rec_id,
            dirty: false,
            search_index: None,
        }
    }

    pub fn entry(&self) -> &RelCatEntry {
        &self.entry
    }

    pub fn rec_id(&self) -> RecordId {
        self.rec_id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Relation cache, indexed by open-relation slot.
pub struct RelationCache {
    entries: Vec<Option<RelCacheEntry>>,
}

impl RelationCache {
    pub fn new(max_open: usize) -> Self {
        Self {
            entries: vec![None; max_open],
        }
    }

    fn slot(&self, rel: RelId) -> Result<&RelCacheEntry> {
        self.entries
            .get(rel.as_usize())
            .ok_or(DbError::OutOfBound)?
            .as_ref()
            .ok_or_else(|| DbError::RelationNotOpen(rel.to_string()))
    }

    fn slot_mut(&mut self, rel: RelId) -> Result<&mut RelCacheEntry> {
        self.entries
            .get_mut(rel.as_usize())
            .ok_or(DbError::OutOfBound)?
            .as_mut()
            .ok_or_else(|| DbError::RelationNotOpen(rel.to_string()))
    }

    pub fn get(&self, rel: RelId) -> Result<&RelCatEntry> {
        Ok(&self.slot(rel)?.entry)
    }

    /// Replaces the cached record and marks it for write-back.
    pub fn set(&mut self, rel: RelId, entry: RelCatEntry) -> Result<()> {
        let slot = self.slot_mut(rel)?;
        slot.entry = entry;
        slot.dirty = true;
        Ok(())
    }

    pub fn is_dirty(&self, rel: RelId) -> Result<bool> {
        Ok(self.slot(rel)?.dirty)
    }

    pub fn search_index(&self, rel: RelId) -> Result<Option<RecordId>> {
        Ok(self.slot(rel)?.search_index)
    }

    pub fn set_search_index(&mut self, rel: RelId, search_index: Option<RecordId>) -> Result<()> {
        self.slot_mut(rel)?.search_index = search_index;
        Ok(())
    }

    pub fn reset_search_index(&mut self, rel: RelId) -> Result<()> {
        self.set_search_index(rel, None)
    }

    pub fn is_occupied(&self, rel: RelId) -> bool {
        matches!(self.entries.get(rel.as_usize()), Some(Some(_)))
    }

    pub(crate) fn install(&mut self, rel: RelId, entry: RelCacheEntry) -> Result<()> {
        let slot = self.entries.get_mut(rel.as_usize()).ok_or(DbError::OutOfBound)?;
        *slot = Some(entry);
        Ok(())
    }

    pub(crate) fn entry_mut(&mut self, rel: RelId) -> Result<&mut RelCacheEntry> {
        self.slot_mut(rel)
    }

    pub(crate) fn take(&mut self, rel: RelId) -> Option<RelCacheEntry> {
        self.entries.get_mut(rel.as_usize())?.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BlockId;

    #[test]
    fn test_lookup_errors() {
        let mut cache = RelationCache::new(4);
        assert!(matches!(cache.get(RelId(4)), Err(DbError::OutOfBound)));
        assert!(matches!(cache.get(RelId(2)), Err(DbError::RelationNotOpen(_))));

        let rec_id = RecordId::new(BlockId::new(4), 2);
        cache
            .install(RelId(2), RelCacheEntry::new(RelCatEntry::new("R", 1), rec_id))
            .unwrap();
        assert_eq!(cache.get(RelId(2)).unwrap().rel_name, "R");
        assert!(!cache.is_dirty(RelId(2)).unwrap());
    }

    #[test]
    fn test_set_marks_dirty_and_cursor() {
        let mut cache = RelationCache::new(4);
        let rec_id = RecordId::new(BlockId::new(4), 2);
        cache
            .install(RelId(2), RelCacheEntry::new(RelCatEntry::new("R", 1), rec_id))
            .unwrap();

        let mut entry = cache.get(RelId(2)).unwrap().clone();
        entry.num_recs = 5;
        cache.set(RelId(2), entry).unwrap();
        assert!(cache.is_dirty(RelId(2)).unwrap());

        let cursor = Some(RecordId::new(BlockId::new(9), 3));
        cache.set_search_index(RelId(2), cursor).unwrap();
        assert_eq!(cache.search_index(RelId(2)).unwrap(), cursor);
        cache.reset_search_index(RelId(2)).unwrap();
        assert_eq!(cache.search_index(RelId(2)).unwrap(), None);

        assert!(cache.take(RelId(2)).is_some());
        assert!(!cache.is_occupied(RelId(2)));
    }
}
