use std::path::Path;

use tracing::{info, warn};

use crate::access::{BlockAccess, InsertStatus, SearchCursor};
use crate::buffer::BufferPool;
use crate::catalog::{format_disk, is_formatted, AttrCatEntry, OpenRelTable, RelCatEntry};
use crate::common::*;
use crate::index::BPlusTree;
use crate::storage::disk::DiskManager;
use crate::tuple::{Attribute, Record};

/// One open database: the disk, its buffer pool and the open-relation table.
///
/// Dropping a `Database` writes everything back; call [`Database::close`]
/// to see the errors that drop can only log.
pub struct Database {
    pub(crate) pool: BufferPool,
    pub(crate) open_rels: OpenRelTable,
    closed: bool,
}

impl Database {
    /// Opens the database file at `path`, formatting it first if it does not
    /// hold a database yet.
    pub fn open<P: AsRef<Path>>(path: P, options: StorageOptions) -> Result<Self> {
        options.validate()?;
        let disk = DiskManager::new(path, options.disk_blocks)?;
        if !is_formatted(&disk)? {
            format_disk(&disk)?;
        }
        let pool = BufferPool::new(disk, options.buffer_capacity)?;
        let open_rels = OpenRelTable::bootstrap(&pool, options.max_open)?;
        info!(
            path = pool.disk().get_db_path(),
            blocks = options.disk_blocks,
            frames = options.buffer_capacity,
            "opened database"
        );
        Ok(Self {
            pool,
            open_rels,
            closed: false,
        })
    }

    /// Writes back every cache, flushes the pool and syncs the disk.
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.open_rels.teardown(&self.pool)?;
        self.pool.flush_all()?;
        self.pool.disk().sync()?;
        info!(path = self.pool.disk().get_db_path(), "closed database");
        Ok(())
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn open_rel_table(&self) -> &OpenRelTable {
        &self.open_rels
    }

    pub fn block_access(&mut self) -> BlockAccess<'_> {
        BlockAccess::new(&self.pool, self.open_rels.cache_mut())
    }

    pub fn bplus_tree(&mut self) -> BPlusTree<'_> {
        BPlusTree::new(&self.pool, self.open_rels.cache_mut())
    }

    pub fn rel_id(&self, rel_name: &str) -> Option<RelId> {
        self.open_rels.rel_id(rel_name)
    }

    /// Slot of an open relation, or `RelationNotOpen`.
    pub(crate) fn open_rel_id(&self, rel_name: &str) -> Result<RelId> {
        self.rel_id(rel_name)
            .ok_or_else(|| DbError::RelationNotOpen(rel_name.to_string()))
    }

    /// Cached catalog record of an open relation.
    pub fn relation(&self, rel: RelId) -> Result<&RelCatEntry> {
        self.open_rels.cache().relations.get(rel)
    }

    pub fn attribute(&self, rel: RelId, attr_name: &str) -> Result<&AttrCatEntry> {
        self.open_rels.cache().attributes.get_by_name(rel, attr_name)
    }

    /// Attributes of an open relation in offset order.
    pub fn attributes(&self, rel: RelId) -> Result<Vec<AttrCatEntry>> {
        self.open_rels.cache().attributes.attributes(rel)
    }

    pub fn insert_record(&mut self, rel: RelId, record: &[Attribute]) -> Result<InsertStatus> {
        self.block_access().insert(rel, record)
    }

    pub fn search(
        &mut self,
        rel: RelId,
        attr_name: &str,
        value: &Attribute,
        op: CompareOp,
        cursor: &mut SearchCursor,
    ) -> Result<Option<Record>> {
        self.block_access().search(rel, attr_name, value, op, cursor)
    }

    pub fn reset_search_index(&mut self, rel: RelId) -> Result<()> {
        self.open_rels.cache_mut().relations.reset_search_index(rel)
    }

    pub fn reset_attr_search_index(&mut self, rel: RelId, attr_name: &str) -> Result<()> {
        self.open_rels
            .cache_mut()
            .attributes
            .reset_search_index(rel, attr_name)
    }

    /// Next match of a scan whose position is kept in the caches. Reset the
    /// cursors before the first call of each scan.
    pub fn search_next(
        &mut self,
        rel: RelId,
        attr_name: &str,
        value: &Attribute,
        op: CompareOp,
    ) -> Result<Option<Record>> {
        self.block_access().search_next(rel, attr_name, value, op)
    }

    pub fn project_next(&mut self, rel: RelId) -> Result<Option<Record>> {
        self.block_access().project_next(rel)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(%err, "failed to write back database on drop");
        }
    }
}
