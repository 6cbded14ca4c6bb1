//! Catalog metadata: the on-disk catalog record formats, the in-memory
//! relation and attribute caches, and the open-relation table that owns them.

mod attribute_cache;
mod bootstrap;
mod catalog_entry;
mod open_relation_table;
mod relation_cache;

pub use attribute_cache::*;
pub use bootstrap::*;
pub use catalog_entry::*;
pub use open_relation_table::*;
pub use relation_cache::*;

use crate::buffer::{BufferPool, RecBuffer};
use crate::common::{RelId, Result};

/// Relation and attribute caches of every open relation.
pub struct CatalogCache {
    pub relations: RelationCache,
    pub attributes: AttributeCache,
}

impl CatalogCache {
    pub fn new(max_open: usize) -> Self {
        Self {
            relations: RelationCache::new(max_open),
            attributes: AttributeCache::new(max_open),
        }
    }

    /// Writes every dirty cached record of `rel` back to its catalog slot.
    /// This is the only path by which cached metadata reaches the disk.
    pub fn write_back(&mut self, pool: &BufferPool, rel: RelId) -> Result<()> {
        for attr in self.attributes.entries_mut(rel)?.iter_mut() {
            if attr.dirty {
                RecBuffer::new(pool, attr.rec_id.block)
                    .set_record(attr.rec_id.slot, &attr.entry.to_record()?)?;
                attr.dirty = false;
            }
        }

        let rel_entry = self.relations.entry_mut(rel)?;
        if rel_entry.dirty {
            RecBuffer::new(pool, rel_entry.rec_id.block)
                .set_record(rel_entry.rec_id.slot, &rel_entry.entry.to_record()?)?;
            rel_entry.dirty = false;
        }
        Ok(())
    }

    /// Writes back and then drops the cached records of `rel`.
    pub(crate) fn evict(&mut self, pool: &BufferPool, rel: RelId) -> Result<()> {
        self.write_back(pool, rel)?;
        self.attributes.take(rel);
        self.relations.take(rel);
        Ok(())
    }
}
