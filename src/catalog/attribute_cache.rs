use crate::common::{DbError, IndexId, RecordId, RelId, Result};

use super::AttrCatEntry;

/// Cached attribute catalog record.
#[derive(Debug, Clone)]
pub struct AttrCacheEntry {
    pub(crate) entry: AttrCatEntry,
    pub(crate) rec_id: RecordId,
    pub(crate) dirty: bool,
    /// Leaf position of the last hit of a cached index scan
    pub(crate) search_index: Option<IndexId>,
}

impl AttrCacheEntry {
    pub fn new(entry: AttrCatEntry, rec_id: RecordId) -> Self {
        Self {
            entry,
            rec_id,
            dirty: false,
            search_index: None,
        }
    }

    pub fn entry(&self) -> &AttrCatEntry {
        &self.entry
    }

    pub fn rec_id(&self) -> RecordId {
        self.rec_id
    }
}

/// Attribute cache: for every open relation, its attributes ordered by offset.
pub struct AttributeCache {
    entries: Vec<Option<Vec<AttrCacheEntry>>>,
}

impl AttributeCache {
    pub fn new(max_open: usize) -> Self {
        Self {
            entries: vec![None; max_open],
        }
    }

    fn list(&self, rel: RelId) -> Result<&Vec<AttrCacheEntry>> {
        self.entries
            .get(rel.as_usize())
            .ok_or(DbError::OutOfBound)?
            .as_ref()
            .ok_or_else(|| DbError::RelationNotOpen(rel.to_string()))
    }

    fn list_mut(&mut self, rel: RelId) -> Result<&mut Vec<AttrCacheEntry>> {
        self.entries
            .get_mut(rel.as_usize())
            .ok_or(DbError::OutOfBound)?
            .as_mut()
            .ok_or_else(|| DbError::RelationNotOpen(rel.to_string()))
    }

    fn by_name_mut(&mut self, rel: RelId, attr_name: &str) -> Result<&mut AttrCacheEntry> {
        self.list_mut(rel)?
            .iter_mut()
            .find(|a| a.entry.attr_name == attr_name)
            .ok_or_else(|| DbError::AttributeNotExist(attr_name.to_string()))
    }

    pub fn get_by_name(&self, rel: RelId, attr_name: &str) -> Result<&AttrCatEntry> {
        self.list(rel)?
            .iter()
            .map(|a| &a.entry)
            .find(|e| e.attr_name == attr_name)
            .ok_or_else(|| DbError::AttributeNotExist(attr_name.to_string()))
    }

    pub fn get_by_offset(&self, rel: RelId, offset: usize) -> Result<&AttrCatEntry> {
        self.list(rel)?
            .iter()
            .map(|a| &a.entry)
            .find(|e| e.offset == offset)
            .ok_or_else(|| DbError::AttributeNotExist(format!("at offset {offset}")))
    }

    /// Replaces the cached record of `attr_name` and marks it for write-back.
    pub fn set_by_name(&mut self, rel: RelId, attr_name: &str, entry: AttrCatEntry) -> Result<()> {
        let attr = self.by_name_mut(rel, attr_name)?;
        attr.entry = entry;
        attr.dirty = true;
        Ok(())
    }

    pub fn set_by_offset(&mut self, rel: RelId, offset: usize, entry: AttrCatEntry) -> Result<()> {
        let attr = self
            .list_mut(rel)?
            .iter_mut()
            .find(|a| a.entry.offset == offset)
            .ok_or_else(|| DbError::AttributeNotExist(format!("at offset {offset}")))?;
        attr.entry = entry;
        attr.dirty = true;
        Ok(())
    }

    /// Copies of all attribute records of a relation, in offset order.
    pub fn attributes(&self, rel: RelId) -> Result<Vec<AttrCatEntry>> {
        Ok(self.list(rel)?.iter().map(|a| a.entry.clone()).collect())
    }

    pub fn search_index(&self, rel: RelId, attr_name: &str) -> Result<Option<IndexId>> {
        self.list(rel)?
            .iter()
            .find(|a| a.entry.attr_name == attr_name)
            .map(|a| a.search_index)
            .ok_or_else(|| DbError::AttributeNotExist(attr_name.to_string()))
    }

    pub fn set_search_index(
        &mut self,
        rel: RelId,
        attr_name: &str,
        search_index: Option<IndexId>,
    ) -> Result<()> {
        self.by_name_mut(rel, attr_name)?.search_index = search_index;
        Ok(())
    }

    pub fn reset_search_index(&mut self, rel: RelId, attr_name: &str) -> Result<()> {
        self.set_search_index(rel, attr_name, None)
    }

    pub(crate) fn install(&mut self, rel: RelId, mut attrs: Vec<AttrCacheEntry>) -> Result<()> {
        let slot = self.entries.get_mut(rel.as_usize()).ok_or(DbError::OutOfBound)?;
        attrs.sort_by_key(|a| a.entry.offset);
        *slot = Some(attrs);
        Ok(())
    }

    pub(crate) fn entries_mut(&mut self, rel: RelId) -> Result<&mut Vec<AttrCacheEntry>> {
        self.list_mut(rel)
    }

    pub(crate) fn take(&mut self, rel: RelId) -> Option<Vec<AttrCacheEntry>> {
        self.entries.get_mut(rel.as_usize())?.take()
    }
}
