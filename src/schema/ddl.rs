use std::collections::HashSet;

use tracing::info;

use crate::catalog::{AttrCatEntry, RelCatEntry};
use crate::common::*;
use crate::database::Database;
use crate::tuple::{AttrType, Attribute};

fn is_catalog(rel_name: &str) -> bool {
    rel_name == RELCAT_RELNAME || rel_name == ATTRCAT_RELNAME
}

impl Database {
    /// Fails with `RelationOpen` if `rel_name` is in the open-relation table.
    fn ensure_closed(&self, rel_name: &str) -> Result<()> {
        match self.rel_id(rel_name) {
            Some(_) => Err(DbError::RelationOpen(rel_name.to_string())),
            None => Ok(()),
        }
    }

    /// Slot of an open user relation.
    fn user_rel_id(&self, rel_name: &str) -> Result<RelId> {
        if is_catalog(rel_name) {
            return Err(DbError::NotPermitted);
        }
        self.open_rel_id(rel_name)
    }

    /// Adds a relation with the given attributes, in order, to the catalogs.
    pub fn create_rel(&mut self, rel_name: &str, attrs: &[(&str, AttrType)]) -> Result<()> {
        let key = Attribute::string(rel_name)?;
        let exists = self.block_access().linear_search(
            RELCAT_RELID,
            RELCAT_ATTR_RELNAME,
            &key,
            CompareOp::Eq,
            None,
        )?;
        if exists.is_some() {
            return Err(DbError::RelationExists(rel_name.to_string()));
        }
        if attrs.is_empty() || attrs.len() > MAX_ATTRS {
            return Err(DbError::MaxAttributes {
                max: MAX_ATTRS,
                actual: attrs.len(),
            });
        }
        let mut seen = HashSet::new();
        for (attr_name, _) in attrs {
            Attribute::string(attr_name)?;
            if !seen.insert(*attr_name) {
                return Err(DbError::DuplicateAttribute(attr_name.to_string()));
            }
        }

        let rel_record = RelCatEntry::new(rel_name, attrs.len()).to_record()?;
        self.block_access().insert(RELCAT_RELID, &rel_record)?;

        for (offset, (attr_name, attr_type)) in attrs.iter().enumerate() {
            let record = AttrCatEntry::new(rel_name, attr_name, *attr_type, offset).to_record()?;
            if let Err(err) = self.block_access().insert(ATTRCAT_RELID, &record) {
                self.block_access().delete_relation(rel_name)?;
                return Err(err);
            }
        }
        info!(rel = rel_name, attrs = attrs.len(), "created relation");
        Ok(())
    }

    /// Removes a closed relation with all its records and indexes.
    pub fn delete_rel(&mut self, rel_name: &str) -> Result<()> {
        if is_catalog(rel_name) {
            return Err(DbError::NotPermitted);
        }
        self.ensure_closed(rel_name)?;
        self.block_access().delete_relation(rel_name)?;
        info!(rel = rel_name, "deleted relation");
        Ok(())
    }

    pub fn open_rel(&mut self, rel_name: &str) -> Result<RelId> {
        self.open_rels.open_rel(&self.pool, rel_name)
    }

    pub fn close_rel(&mut self, rel_name: &str) -> Result<()> {
        let rel = self.user_rel_id(rel_name)?;
        self.open_rels.close_rel(&self.pool, rel)
    }

    pub fn rename_rel(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if is_catalog(old_name) || is_catalog(new_name) {
            return Err(DbError::NotPermitted);
        }
        self.ensure_closed(old_name)?;
        self.block_access().rename_relation(old_name, new_name)?;
        info!(from = old_name, to = new_name, "renamed relation");
        Ok(())
    }

    pub fn rename_attr(&mut self, rel_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        if is_catalog(rel_name) {
            return Err(DbError::NotPermitted);
        }
        self.ensure_closed(rel_name)?;
        self.block_access()
            .rename_attribute(rel_name, old_name, new_name)
    }

    /// Builds a B+ tree over `attr_name` of an open relation.
    pub fn create_index(&mut self, rel_name: &str, attr_name: &str) -> Result<()> {
        let rel = self.user_rel_id(rel_name)?;
        self.bplus_tree().create(rel, attr_name)
    }

    /// Releases the B+ tree over `attr_name` of an open relation.
    pub fn drop_index(&mut self, rel_name: &str, attr_name: &str) -> Result<()> {
        let rel = self.user_rel_id(rel_name)?;
        let mut attr = self.attribute(rel, attr_name)?.clone();
        let root = attr.root_block.ok_or(DbError::NoIndex)?;

        self.bplus_tree().destroy(root)?;
        attr.root_block = None;
        self.open_rels
            .cache_mut()
            .attributes
            .set_by_name(rel, attr_name, attr)?;
        info!(rel = rel_name, attr = attr_name, "dropped index");
        Ok(())
    }
}
