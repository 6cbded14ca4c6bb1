use std::cmp::Ordering;

use tracing::{info, warn};

use crate::buffer::{BlockBuffer, BufferPool, IndInternal, IndLeaf, RecBuffer};
use crate::catalog::{AttrCatEntry, CatalogCache};
use crate::common::*;
use crate::storage::page::{InternalEntry, LeafEntry};
use crate::tuple::{AttrType, Attribute};

/// Child of the first entry accepted by `qualifies`, or the rightmost child.
fn route<F>(entries: &[InternalEntry], qualifies: F) -> Option<BlockId>
where
    F: Fn(&InternalEntry) -> bool,
{
    match entries.iter().find(|e| qualifies(e)) {
        Some(entry) => entry.lchild,
        None => entries.last().and_then(|e| e.rchild),
    }
}

/// B+ tree operations over the indexes of open relations.
///
/// The root of each index lives in the attribute cache. Leaves hold
/// `(key, record id)` pairs in ascending order and are chained both ways,
/// and every internal key is the largest key of the subtree to its left.
pub struct BPlusTree<'a> {
    pool: &'a BufferPool,
    cache: &'a mut CatalogCache,
}

impl<'a> BPlusTree<'a> {
    pub fn new(pool: &'a BufferPool, cache: &'a mut CatalogCache) -> Self {
        Self { pool, cache }
    }

    fn set_root(&mut self, rel: RelId, attr_name: &str, root: Option<BlockId>) -> Result<()> {
        let mut entry = self.cache.attributes.get_by_name(rel, attr_name)?.clone();
        entry.root_block = root;
        self.cache.attributes.set_by_name(rel, attr_name, entry)
    }

    /// Next leaf entry after `cursor` whose key compares to `value` as `op`
    /// asks. Returns the entry's position along with the record it points to.
    pub fn search(
        &self,
        rel: RelId,
        attr_name: &str,
        value: &Attribute,
        op: CompareOp,
        cursor: Option<IndexId>,
    ) -> Result<Option<(IndexId, RecordId)>> {
        let attr = self.cache.attributes.get_by_name(rel, attr_name)?;
        let root = attr.root_block.ok_or(DbError::NoIndex)?;
        let attr_type = attr.attr_type;

        let (mut block, mut index) = match cursor {
            None => (self.descend(root, value, attr_type, op)?, 0),
            Some(cursor) => {
                let header = IndLeaf::new(self.pool, cursor.block).header()?;
                if cursor.index + 1 < header.num_entries {
                    (cursor.block, cursor.index + 1)
                } else {
                    match header.right {
                        Some(right) => (right, 0),
                        None => return Ok(None),
                    }
                }
            }
        };

        loop {
            let leaf = IndLeaf::new(self.pool, block);
            let header = leaf.header()?;
            let entries = leaf.entries(header.num_entries)?;
            for (i, entry) in entries.iter().enumerate().skip(index) {
                let ord = entry.key.compare(value, attr_type);
                if op.matches(ord) {
                    return Ok(Some((IndexId::new(block, i), entry.rid)));
                }
                // keys only grow from here on
                if ord == Ordering::Greater
                    && matches!(op, CompareOp::Eq | CompareOp::Le | CompareOp::Lt)
                {
                    return Ok(None);
                }
            }
            match (op, header.right) {
                (CompareOp::Ne, Some(right)) => {
                    block = right;
                    index = 0;
                }
                _ => return Ok(None),
            }
        }
    }

    /// Walks from `root` down to the leaf where a scan for `op` starts.
    fn descend(
        &self,
        root: BlockId,
        value: &Attribute,
        attr_type: AttrType,
        op: CompareOp,
    ) -> Result<BlockId> {
        let mut block = root;
        while self.pool.block_type(block)? == BlockType::IndexInternal {
            let node = IndInternal::new(self.pool, block);
            let entries = node.entries(node.header()?.num_entries)?;
            let child = match op {
                CompareOp::Ne | CompareOp::Lt | CompareOp::Le => {
                    entries.first().and_then(|e| e.lchild)
                }
                CompareOp::Eq | CompareOp::Ge => {
                    route(&entries, |e| e.key.compare(value, attr_type) != Ordering::Less)
                }
                CompareOp::Gt => {
                    route(&entries, |e| e.key.compare(value, attr_type) == Ordering::Greater)
                }
            };
            block = child.ok_or(DbError::InvalidBlock(block))?;
        }
        Ok(block)
    }

    /// Builds an index on `attr_name` from every record of the relation.
    /// Does nothing if the attribute is already indexed.
    pub fn create(&mut self, rel: RelId, attr_name: &str) -> Result<()> {
        if rel == RELCAT_RELID || rel == ATTRCAT_RELID {
            return Err(DbError::NotPermitted);
        }
        let attr = self.cache.attributes.get_by_name(rel, attr_name)?.clone();
        if attr.root_block.is_some() {
            return Ok(());
        }
        let first_block = self.cache.relations.get(rel)?.first_block;

        let root = IndLeaf::allocate(self.pool)?;
        self.set_root(rel, attr_name, Some(root.block()))?;

        let mut next = first_block;
        while let Some(block) = next {
            let buffer = RecBuffer::new(self.pool, block);
            let header = buffer.header()?;
            let map = buffer.slot_map()?;
            for slot in 0..header.num_slots {
                if map[slot] != SLOT_OCCUPIED {
                    continue;
                }
                let record = buffer.record(slot)?;
                let key = record.get(attr.offset).ok_or(DbError::OutOfBound)?;
                // a disk-full insert has already torn the tree down
                self.insert(rel, attr_name, key, RecordId::new(block, slot))?;
            }
            next = header.right;
        }

        info!(rel = attr.rel_name.as_str(), attr = attr_name, "created index");
        Ok(())
    }

    /// Adds `(value, rid)` to the index on `attr_name`.
    ///
    /// If a split runs out of disk, the whole index is destroyed, the
    /// attribute becomes unindexed and `DiskFull` is returned.
    pub fn insert(&mut self, rel: RelId, attr_name: &str, value: &Attribute, rid: RecordId) -> Result<()> {
        let attr = self.cache.attributes.get_by_name(rel, attr_name)?.clone();
        let root = attr.root_block.ok_or(DbError::NoIndex)?;

        let leaf = self.find_leaf_to_insert(root, value, attr.attr_type)?;
        let entry = LeafEntry { key: *value, rid };
        match self.insert_into_leaf(rel, &attr, leaf, entry) {
            Err(DbError::DiskFull) => {
                // a new root may have been installed before the failure
                let current = self
                    .cache
                    .attributes
                    .get_by_name(rel, attr_name)?
                    .root_block;
                self.set_root(rel, attr_name, None)?;
                if let Some(current) = current {
                    self.destroy(current)?;
                }
                warn!(
                    rel = attr.rel_name.as_str(),
                    attr = attr_name,
                    "disk full during index insert, index dropped"
                );
                Err(DbError::DiskFull)
            }
            other => other,
        }
    }

    /// Leaf that `value` belongs in: at every level, the child left of the
    /// first key not smaller than `value`.
    fn find_leaf_to_insert(&self, root: BlockId, value: &Attribute, attr_type: AttrType) -> Result<BlockId> {
        let mut block = root;
        while self.pool.block_type(block)? == BlockType::IndexInternal {
            let node = IndInternal::new(self.pool, block);
            let entries = node.entries(node.header()?.num_entries)?;
            block = route(&entries, |e| e.key.compare(value, attr_type) != Ordering::Less)
                .ok_or(DbError::InvalidBlock(block))?;
        }
        Ok(block)
    }

    fn insert_into_leaf(&mut self, rel: RelId, attr: &AttrCatEntry, leaf: BlockId, entry: LeafEntry) -> Result<()> {
        let buffer = IndLeaf::new(self.pool, leaf);
        let mut header = buffer.header()?;
        let mut entries = buffer.entries(header.num_entries)?;

        // after any equal keys
        let pos = entries
            .iter()
            .position(|e| e.key.compare(&entry.key, attr.attr_type) == Ordering::Greater)
            .unwrap_or(entries.len());
        entries.insert(pos, entry);

        if entries.len() <= MAX_KEYS_LEAF {
            buffer.set_entries(&entries)?;
            header.num_entries = entries.len();
            return buffer.set_header(&header);
        }

        let right = self.split_leaf(leaf, &entries)?;
        let separator = InternalEntry {
            lchild: Some(leaf),
            key: entries[MIDDLE_INDEX_LEAF].key,
            rchild: Some(right),
        };
        match header.parent {
            Some(parent) => self.insert_into_internal(rel, attr, parent, separator),
            None => self.create_new_root(rel, attr, separator),
        }
    }

    /// Moves the upper half of an overflowing leaf into a new right sibling.
    fn split_leaf(&self, leaf: BlockId, entries: &[LeafEntry]) -> Result<BlockId> {
        let right = IndLeaf::allocate(self.pool)?;
        let left = IndLeaf::new(self.pool, leaf);
        let mut left_header = left.header()?;
        let (lower, upper) = entries.split_at(MIDDLE_INDEX_LEAF + 1);

        let mut right_header = right.header()?;
        right_header.parent = left_header.parent;
        right_header.left = Some(leaf);
        right_header.right = left_header.right;
        right_header.num_entries = upper.len();
        right.set_header(&right_header)?;
        right.set_entries(upper)?;

        if let Some(old_right) = left_header.right {
            let sibling = IndLeaf::new(self.pool, old_right);
            let mut sibling_header = sibling.header()?;
            sibling_header.left = Some(right.block());
            sibling.set_header(&sibling_header)?;
        }

        left_header.right = Some(right.block());
        left_header.num_entries = lower.len();
        left.set_header(&left_header)?;
        left.set_entries(lower)?;
        Ok(right.block())
    }

    /// Adds `entry` to an internal node, next to the child it splits.
    fn insert_into_internal(
        &mut self,
        rel: RelId,
        attr: &AttrCatEntry,
        block: BlockId,
        entry: InternalEntry,
    ) -> Result<()> {
        let node = IndInternal::new(self.pool, block);
        let mut header = node.header()?;
        let mut entries = node.entries(header.num_entries)?;

        let pos = entries
            .iter()
            .position(|e| e.lchild == entry.lchild)
            .unwrap_or(entries.len());
        entries.insert(pos, entry);
        if let Some(next) = entries.get_mut(pos + 1) {
            next.lchild = entry.rchild;
        }

        if entries.len() <= MAX_KEYS_INTERNAL {
            node.set_entries(&entries)?;
            header.num_entries = entries.len();
            return node.set_header(&header);
        }

        let right = match self.split_internal(block, &entries) {
            Ok(right) => right,
            Err(err) => {
                if let Some(orphan) = entry.rchild {
                    self.destroy(orphan)?;
                }
                return Err(err);
            }
        };
        let separator = InternalEntry {
            lchild: Some(block),
            key: entries[MIDDLE_INDEX_INTERNAL].key,
            rchild: Some(right),
        };
        match header.parent {
            Some(parent) => self.insert_into_internal(rel, attr, parent, separator),
            None => self.create_new_root(rel, attr, separator),
        }
    }

    /// Splits an overflowing internal node around its middle entry, whose
    /// key the caller promotes. The children moved right are re-parented.
    fn split_internal(&self, block: BlockId, entries: &[InternalEntry]) -> Result<BlockId> {
        let right = IndInternal::allocate(self.pool)?;
        let left = IndInternal::new(self.pool, block);
        let mut left_header = left.header()?;
        let lower = &entries[..MIDDLE_INDEX_INTERNAL];
        let upper = &entries[MIDDLE_INDEX_INTERNAL + 1..];

        let mut right_header = right.header()?;
        right_header.parent = left_header.parent;
        right_header.num_entries = upper.len();
        right.set_header(&right_header)?;
        right.set_entries(upper)?;

        left_header.num_entries = lower.len();
        left.set_header(&left_header)?;
        left.set_entries(lower)?;

        let moved = upper
            .first()
            .and_then(|e| e.lchild)
            .into_iter()
            .chain(upper.iter().filter_map(|e| e.rchild));
        for child in moved {
            self.set_parent(child, right.block())?;
        }
        Ok(right.block())
    }

    fn set_parent(&self, child: BlockId, parent: BlockId) -> Result<()> {
        let buffer = BlockBuffer::new(self.pool, child);
        let mut header = buffer.header()?;
        header.parent = Some(parent);
        buffer.set_header(&header)
    }

    /// Puts a new root above a split root.
    fn create_new_root(&mut self, rel: RelId, attr: &AttrCatEntry, entry: InternalEntry) -> Result<()> {
        let root = match IndInternal::allocate(self.pool) {
            Ok(root) => root,
            Err(err) => {
                if let Some(orphan) = entry.rchild {
                    self.destroy(orphan)?;
                }
                return Err(err);
            }
        };

        let mut header = root.header()?;
        header.num_entries = 1;
        root.set_header(&header)?;
        root.set_entry(0, &entry)?;
        for child in [entry.lchild, entry.rchild].into_iter().flatten() {
            self.set_parent(child, root.block())?;
        }
        self.set_root(rel, &attr.attr_name, Some(root.block()))
    }

    /// Releases every block of the subtree rooted at `block`.
    pub fn destroy(&self, block: BlockId) -> Result<()> {
        match self.pool.block_type(block)? {
            BlockType::IndexLeaf => IndLeaf::new(self.pool, block).release(),
            BlockType::IndexInternal => {
                let node = IndInternal::new(self.pool, block);
                let entries = node.entries(node.header()?.num_entries)?;
                let children = entries
                    .first()
                    .map(|e| e.lchild)
                    .into_iter()
                    .chain(entries.iter().map(|e| e.rchild));
                for child in children {
                    self.destroy(child.ok_or(DbError::InvalidBlock(block))?)?;
                }
                node.release()
            }
            _ => Err(DbError::InvalidBlock(block)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{format_disk, AttrCacheEntry, RelCacheEntry, RelCatEntry};
    use crate::storage::disk::DiskManager;
    use tempfile::NamedTempFile;

    const REL: RelId = RelId(2);

    fn setup(temp_file: &NamedTempFile, num_blocks: usize) -> (BufferPool, CatalogCache) {
        let disk = DiskManager::new(temp_file.path(), num_blocks).unwrap();
        format_disk(&disk).unwrap();
        let pool = BufferPool::new(disk, 8).unwrap();

        let mut cache = CatalogCache::new(4);
        cache
            .relations
            .install(
                REL,
                RelCacheEntry::new(RelCatEntry::new("T", 1), RecordId::new(RELCAT_BLOCK, 2)),
            )
            .unwrap();
        cache
            .attributes
            .install(
                REL,
                vec![AttrCacheEntry::new(
                    AttrCatEntry::new("T", "Key", AttrType::Number, 0),
                    RecordId::new(ATTRCAT_BLOCK, 12),
                )],
            )
            .unwrap();
        (pool, cache)
    }

    fn rid(n: usize) -> RecordId {
        RecordId::new(BlockId::new(1000), n)
    }

    /// Leaves of the tree from left to right, following sibling links.
    fn leaves(pool: &BufferPool, root: BlockId) -> Vec<BlockId> {
        let mut block = root;
        while pool.block_type(block).unwrap() == BlockType::IndexInternal {
            block = IndInternal::new(pool, block).entry(0).unwrap().lchild.unwrap();
        }
        let mut chain = vec![block];
        while let Some(right) = IndLeaf::new(pool, block).header().unwrap().right {
            chain.push(right);
            block = right;
        }
        chain
    }

    #[test]
    fn test_errors() {
        let temp_file = NamedTempFile::new().unwrap();
        let (pool, mut cache) = setup(&temp_file, 64);
        let mut tree = BPlusTree::new(&pool, &mut cache);

        assert!(matches!(
            tree.insert(REL, "Key", &Attribute::number(1.0), rid(0)),
            Err(DbError::NoIndex)
        ));
        assert!(matches!(
            tree.create(ATTRCAT_RELID, ATTRCAT_ATTR_OFFSET),
            Err(DbError::NotPermitted)
        ));
        assert!(matches!(
            tree.destroy(RELCAT_BLOCK),
            Err(DbError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_leaf_split() {
        let temp_file = NamedTempFile::new().unwrap();
        let (pool, mut cache) = setup(&temp_file, 64);
        let mut tree = BPlusTree::new(&pool, &mut cache);
        tree.create(REL, "Key").unwrap();

        for n in (0..=MAX_KEYS_LEAF).rev() {
            tree.insert(REL, "Key", &Attribute::number(n as f64), rid(n)).unwrap();
        }

        let root = cache.attributes.get_by_name(REL, "Key").unwrap().root_block.unwrap();
        assert_eq!(pool.block_type(root).unwrap(), BlockType::IndexInternal);
        let separator = IndInternal::new(&pool, root).entry(0).unwrap();
        assert_eq!(separator.key.as_number(), MIDDLE_INDEX_LEAF as f64);

        let chain = leaves(&pool, root);
        assert_eq!(chain.len(), 2);
        let (left, right) = (IndLeaf::new(&pool, chain[0]), IndLeaf::new(&pool, chain[1]));
        assert_eq!(left.header().unwrap().num_entries, 32);
        assert_eq!(right.header().unwrap().num_entries, 32);
        assert_eq!(right.header().unwrap().left, Some(chain[0]));
        assert_eq!(right.header().unwrap().parent, Some(root));
        assert_eq!(left.entry(31).unwrap().key.as_number(), 31.0);
        assert_eq!(right.entry(0).unwrap().key.as_number(), 32.0);
    }

    #[test]
    fn test_duplicate_keys_found_across_leaves() {
        let temp_file = NamedTempFile::new().unwrap();
        let (pool, mut cache) = setup(&temp_file, 64);
        let mut tree = BPlusTree::new(&pool, &mut cache);
        tree.create(REL, "Key").unwrap();
        for n in 0..150 {
            tree.insert(REL, "Key", &Attribute::number(7.0), rid(n)).unwrap();
        }
        tree.insert(REL, "Key", &Attribute::number(3.0), rid(150)).unwrap();

        let mut found = Vec::new();
        let mut cursor = None;
        while let Some((index_id, hit)) = tree
            .search(REL, "Key", &Attribute::number(7.0), CompareOp::Eq, cursor)
            .unwrap()
        {
            found.push(hit.slot);
            cursor = Some(index_id);
        }
        found.sort_unstable();
        assert_eq!(found, (0..150).collect::<Vec<_>>());

        let below = tree
            .search(REL, "Key", &Attribute::number(7.0), CompareOp::Lt, None)
            .unwrap()
            .map(|(_, hit)| hit.slot);
        assert_eq!(below, Some(150));
    }

    #[test]
    fn test_disk_full_drops_index() {
        let temp_file = NamedTempFile::new().unwrap();
        // catalog blocks plus exactly one free block for the root leaf
        let (pool, mut cache) = setup(&temp_file, 7);
        let mut tree = BPlusTree::new(&pool, &mut cache);
        tree.create(REL, "Key").unwrap();

        let mut result = Ok(());
        for n in 0..=MAX_KEYS_LEAF {
            result = tree.insert(REL, "Key", &Attribute::number(n as f64), rid(n));
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(DbError::DiskFull)));
        assert_eq!(cache.attributes.get_by_name(REL, "Key").unwrap().root_block, None);
        assert_eq!(pool.count_blocks(BlockType::IndexLeaf), 0);
        assert_eq!(pool.count_blocks(BlockType::IndexInternal), 0);
        assert!(cache.attributes.entries_mut(REL).unwrap()[0].dirty);
    }

    #[test]
    fn test_failed_rollback_still_clears_root() {
        let temp_file = NamedTempFile::new().unwrap();
        // room for one leaf and one internal node
        let (pool, mut cache) = setup(&temp_file, 8);
        let leaf = {
            let mut tree = BPlusTree::new(&pool, &mut cache);
            tree.create(REL, "Key").unwrap();
            for n in 0..MAX_KEYS_LEAF {
                tree.insert(REL, "Key", &Attribute::number(n as f64), rid(n)).unwrap();
            }
            cache.attributes.get_by_name(REL, "Key").unwrap().root_block.unwrap()
        };

        // a root whose right child is not an index block
        let root = IndInternal::allocate(&pool).unwrap();
        let mut header = root.header().unwrap();
        header.num_entries = 1;
        root.set_header(&header).unwrap();
        root.set_entry(
            0,
            &InternalEntry {
                lchild: Some(leaf),
                key: Attribute::number((MAX_KEYS_LEAF - 1) as f64),
                rchild: Some(RELCAT_BLOCK),
            },
        )
        .unwrap();
        let mut tree = BPlusTree::new(&pool, &mut cache);
        tree.set_root(REL, "Key", Some(root.block())).unwrap();

        // the leaf split finds the disk full, then teardown trips on the catalog block
        assert!(matches!(
            tree.insert(REL, "Key", &Attribute::number(1.0), rid(100)),
            Err(DbError::InvalidBlock(RELCAT_BLOCK))
        ));
        assert_eq!(cache.attributes.get_by_name(REL, "Key").unwrap().root_block, None);
        assert_eq!(pool.count_blocks(BlockType::IndexLeaf), 0);
    }
}
