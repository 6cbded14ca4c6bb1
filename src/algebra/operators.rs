use tracing::{info, warn};

use crate::access::{InsertStatus, SearchCursor};
use crate::common::*;
use crate::database::Database;
use crate::tuple::{AttrType, Value};

impl Database {
    /// Parses `values` against the attribute types of `rel_name` and inserts them as one record.
    pub fn insert(&mut self, rel_name: &str, values: &[&str]) -> Result<InsertStatus> {
        let rel = self.open_rel_id(rel_name)?;
        let attrs = self.attributes(rel)?;
        if values.len() != attrs.len() {
            return Err(DbError::AttributeCountMismatch {
                expected: attrs.len(),
                actual: values.len(),
            });
        }
        let record = attrs
            .iter()
            .zip(values)
            .map(|(attr, text)| Value::parse(text, attr.attr_type)?.to_attribute())
            .collect::<Result<Vec<_>>>()?;
        self.insert_record(rel, &record)
    }

    /// Creates and opens `target`, runs `fill` against it, and closes it. If
    /// `fill` fails the half-built target is deleted.
    fn build_target<F>(&mut self, target: &str, attrs: &[(&str, AttrType)], fill: F) -> Result<()>
    where
        F: FnOnce(&mut Self, RelId) -> Result<()>,
    {
        self.create_rel(target, attrs)?;
        let result = self.open_rel(target).and_then(|rel| fill(self, rel));
        if let Err(err) = result {
            warn!(rel = target, %err, "dropping partially built relation");
            if self.rel_id(target).is_some() {
                self.close_rel(target)?;
            }
            self.delete_rel(target)?;
            return Err(err);
        }
        self.close_rel(target)
    }

    /// Copies the records of `src` whose `attr_name` compares to `value` as
    /// `op` asks into a new relation `target` with the same attributes.
    pub fn select(
        &mut self,
        src: &str,
        target: &str,
        attr_name: &str,
        op: CompareOp,
        value: &str,
    ) -> Result<()> {
        let src_rel = self.open_rel_id(src)?;
        let attr = self.attribute(src_rel, attr_name)?.clone();
        let key = Value::parse(value, attr.attr_type)?.to_attribute()?;

        let src_attrs = self.attributes(src_rel)?;
        let target_attrs = src_attrs
            .iter()
            .map(|a| (a.attr_name.as_str(), a.attr_type))
            .collect::<Vec<_>>();

        self.build_target(target, &target_attrs, |db, target_rel| {
            let mut cursor = SearchCursor::default();
            while let Some(record) = db.search(src_rel, attr_name, &key, op, &mut cursor)? {
                db.insert_record(target_rel, &record)?;
            }
            Ok(())
        })?;
        info!(src, dst = target, attr = attr_name, %op, "selected");
        Ok(())
    }

    /// Copies the chosen attributes of every record of `src` into a new relation `target`.
    pub fn project(&mut self, src: &str, target: &str, attr_names: &[&str]) -> Result<()> {
        let src_rel = self.open_rel_id(src)?;
        let chosen = attr_names
            .iter()
            .map(|name| self.attribute(src_rel, name).cloned())
            .collect::<Result<Vec<_>>>()?;
        let target_attrs = chosen
            .iter()
            .map(|a| (a.attr_name.as_str(), a.attr_type))
            .collect::<Vec<_>>();
        let offsets = chosen.iter().map(|a| a.offset).collect::<Vec<_>>();

        self.build_target(target, &target_attrs, |db, target_rel| {
            let mut cursor = None;
            while let Some(record) = db.block_access().project(src_rel, &mut cursor)? {
                let projected = offsets.iter().map(|&i| record[i]).collect::<Vec<_>>();
                db.insert_record(target_rel, &projected)?;
            }
            Ok(())
        })?;
        info!(src, dst = target, "projected");
        Ok(())
    }

    /// Equi-join of `src1.attr1` with `src2.attr2` into a new relation
    /// `target`. The target holds every attribute of `src1` followed by those
    /// of `src2` except `attr2`. `attr2` is indexed first if it is not already.
    pub fn join(
        &mut self,
        src1: &str,
        src2: &str,
        target: &str,
        attr1: &str,
        attr2: &str,
    ) -> Result<()> {
        let rel1 = self.open_rel_id(src1)?;
        let rel2 = self.open_rel_id(src2)?;
        let join1 = self.attribute(rel1, attr1)?.clone();
        let join2 = self.attribute(rel2, attr2)?.clone();
        if join1.attr_type != join2.attr_type {
            return Err(DbError::TypeMismatch(format!(
                "{src1}.{attr1} is {} but {src2}.{attr2} is {}",
                join1.attr_type, join2.attr_type
            )));
        }

        let attrs1 = self.attributes(rel1)?;
        let attrs2 = self
            .attributes(rel2)?
            .into_iter()
            .filter(|a| a.offset != join2.offset)
            .collect::<Vec<_>>();
        let target_attrs = attrs1
            .iter()
            .chain(attrs2.iter())
            .map(|a| (a.attr_name.as_str(), a.attr_type))
            .collect::<Vec<_>>();

        if join2.root_block.is_none() {
            self.create_index(src2, attr2)?;
        }

        self.build_target(target, &target_attrs, |db, target_rel| {
            let mut outer = None;
            while let Some(left) = db.block_access().project(rel1, &mut outer)? {
                let key = left[join1.offset];
                let mut inner = SearchCursor::default();
                while let Some(right) = db.search(rel2, attr2, &key, CompareOp::Eq, &mut inner)? {
                    let mut joined = left.clone();
                    joined.extend(
                        right
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| *i != join2.offset)
                            .map(|(_, attr)| *attr),
                    );
                    db.insert_record(target_rel, &joined)?;
                }
            }
            Ok(())
        })?;
        info!(src1, src2, dst = target, "joined");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_insert_parses_values() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut db = Database::open(temp_file.path(), StorageOptions::with_disk_blocks(64)).unwrap();
        db.create_rel("R", &[("Name", AttrType::String), ("N", AttrType::Number)])
            .unwrap();

        assert!(matches!(
            db.insert("R", &["a", "1"]),
            Err(DbError::RelationNotOpen(_))
        ));
        db.open_rel("R").unwrap();
        assert!(matches!(
            db.insert("R", &["a"]),
            Err(DbError::AttributeCountMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            db.insert("R", &["a", "one"]),
            Err(DbError::TypeMismatch(_))
        ));
        let status = db.insert("R", &["a", " 1.5"]).unwrap();
        assert_eq!(status.code(), 0);

        let rel = db.rel_id("R").unwrap();
        let record = db.block_access().record(status.rid()).unwrap();
        assert_eq!(record[0].as_str(), "a");
        assert_eq!(record[1].as_number(), 1.5);
        assert_eq!(db.relation(rel).unwrap().num_recs, 1);
    }
}
