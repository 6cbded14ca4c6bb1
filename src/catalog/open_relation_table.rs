use tracing::info;

use crate::access::BlockAccess;
use crate::buffer::{BufferPool, RecBuffer};
use crate::common::*;
use crate::tuple::Attribute;

use super::{AttrCacheEntry, AttrCatEntry, CatalogCache, RelCacheEntry, RelCatEntry};

/// Bounded table of open relations. Slots 0 and 1 always hold the two catalogs.
pub struct OpenRelTable {
    names: Vec<Option<String>>,
    cache: CatalogCache,
}

impl OpenRelTable {
    /// Loads both catalogs into slots 0 and 1 from their fixed blocks.
    pub fn bootstrap(pool: &BufferPool, max_open: usize) -> Result<Self> {
        if max_open <= ATTRCAT_RELID.as_usize() + 1 {
            return Err(DbError::OutOfBound);
        }
        let mut cache = CatalogCache::new(max_open);

        let relcat = RecBuffer::new(pool, RELCAT_BLOCK);
        let attrcat = RecBuffer::new(pool, ATTRCAT_BLOCK);
        for rel in [RELCAT_RELID, ATTRCAT_RELID] {
            let slot = rel.as_usize();
            let entry = RelCatEntry::from_record(&relcat.record(slot)?)?;
            let rec_id = RecordId::new(RELCAT_BLOCK, slot);
            cache.relations.install(rel, RelCacheEntry::new(entry, rec_id))?;

            let first = slot * CATALOG_NO_ATTRS;
            let attrs = (first..first + CATALOG_NO_ATTRS)
                .map(|slot| -> Result<AttrCacheEntry> {
                    let entry = AttrCatEntry::from_record(&attrcat.record(slot)?)?;
                    Ok(AttrCacheEntry::new(entry, RecordId::new(ATTRCAT_BLOCK, slot)))
                })
                .collect::<Result<Vec<_>>>()?;
            cache.attributes.install(rel, attrs)?;
        }

        let mut names = vec![None; max_open];
        names[RELCAT_RELID.as_usize()] = Some(RELCAT_RELNAME.to_string());
        names[ATTRCAT_RELID.as_usize()] = Some(ATTRCAT_RELNAME.to_string());
        Ok(Self { names, cache })
    }

    pub fn max_open(&self) -> usize {
        self.names.len()
    }

    pub fn rel_id(&self, rel_name: &str) -> Option<RelId> {
        self.names
            .iter()
            .position(|name| name.as_deref() == Some(rel_name))
            .map(RelId::new)
    }

    pub fn rel_name(&self, rel: RelId) -> Option<&str> {
        self.names.get(rel.as_usize())?.as_deref()
    }

    /// Names of every open relation with their slots, catalogs included.
    pub fn open_relations(&self) -> impl Iterator<Item = (RelId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| name.as_deref().map(|n| (RelId::new(i), n)))
    }

    /// Opens `rel_name`, or returns its slot if it is already open.
    pub fn open_rel(&mut self, pool: &BufferPool, rel_name: &str) -> Result<RelId> {
        if let Some(rel) = self.rel_id(rel_name) {
            return Ok(rel);
        }
        let free = self
            .names
            .iter()
            .position(Option::is_none)
            .map(RelId::new)
            .ok_or(DbError::CacheFull)?;

        let key = Attribute::string(rel_name)?;
        let access = BlockAccess::new(pool, &mut self.cache);
        let rec_id = access
            .linear_search(RELCAT_RELID, RELCAT_ATTR_RELNAME, &key, CompareOp::Eq, None)?
            .ok_or_else(|| DbError::RelationNotExist(rel_name.to_string()))?;
        let entry = RelCatEntry::from_record(&access.record(rec_id)?)?;

        let mut attrs = Vec::with_capacity(entry.num_attrs);
        let mut cursor = None;
        while let Some(attr_id) =
            access.linear_search(ATTRCAT_RELID, ATTRCAT_ATTR_RELNAME, &key, CompareOp::Eq, cursor)?
        {
            let attr = AttrCatEntry::from_record(&access.record(attr_id)?)?;
            attrs.push(AttrCacheEntry::new(attr, attr_id));
            cursor = Some(attr_id);
        }
        if attrs.len() != entry.num_attrs {
            return Err(DbError::AttributeCountMismatch {
                expected: entry.num_attrs,
                actual: attrs.len(),
            });
        }

        self.cache
            .relations
            .install(free, RelCacheEntry::new(entry, rec_id))?;
        self.cache.attributes.install(free, attrs)?;
        self.names[free.as_usize()] = Some(rel_name.to_string());
        info!(rel = rel_name, slot = free.as_usize(), "opened relation");
        Ok(free)
    }

    /// Writes back and frees the slot of an open user relation.
    pub fn close_rel(&mut self, pool: &BufferPool, rel: RelId) -> Result<()> {
        if rel == RELCAT_RELID || rel == ATTRCAT_RELID {
            return Err(DbError::NotPermitted);
        }
        let name = self
            .names
            .get(rel.as_usize())
            .ok_or(DbError::OutOfBound)?
            .clone()
            .ok_or_else(|| DbError::RelationNotOpen(rel.to_string()))?;

        self.cache.evict(pool, rel)?;
        self.names[rel.as_usize()] = None;
        info!(rel = name.as_str(), slot = rel.as_usize(), "closed relation");
        Ok(())
    }

    /// Closes every user relation, then writes back both catalogs.
    pub fn teardown(&mut self, pool: &BufferPool) -> Result<()> {
        for i in (ATTRCAT_RELID.as_usize() + 1)..self.names.len() {
            if self.names[i].is_some() {
                self.close_rel(pool, RelId::new(i))?;
            }
        }
        self.cache.write_back(pool, ATTRCAT_RELID)?;
        self.cache.write_back(pool, RELCAT_RELID)
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CatalogCache {
        &mut self.cache
    }
}
