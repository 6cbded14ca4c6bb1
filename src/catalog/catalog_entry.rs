use crate::common::*;
use crate::tuple::{AttrType, Attribute, Record};

fn field(record: &[Attribute], index: usize) -> Result<&Attribute> {
    record.get(index).ok_or(DbError::AttributeCountMismatch {
        expected: CATALOG_NO_ATTRS,
        actual: record.len(),
    })
}

/// One record of the relation catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelCatEntry {
    pub rel_name: String,
    pub num_attrs: usize,
    pub num_recs: usize,
    pub first_block: Option<BlockId>,
    pub last_block: Option<BlockId>,
    pub num_slots_per_block: usize,
}

impl RelCatEntry {
    /// Entry for a new, empty relation.
    pub fn new(rel_name: &str, num_attrs: usize) -> Self {
        Self {
            rel_name: rel_name.to_string(),
            num_attrs,
            num_recs: 0,
            first_block: None,
            last_block: None,
            num_slots_per_block: slots_per_block(num_attrs),
        }
    }

    pub fn from_record(record: &[Attribute]) -> Result<Self> {
        Ok(Self {
            rel_name: field(record, RELCAT_REL_NAME_INDEX)?.as_str().into_owned(),
            num_attrs: field(record, RELCAT_NO_ATTRIBUTES_INDEX)?.as_usize(),
            num_recs: field(record, RELCAT_NO_RECORDS_INDEX)?.as_usize(),
            first_block: field(record, RELCAT_FIRST_BLOCK_INDEX)?.as_block(),
            last_block: field(record, RELCAT_LAST_BLOCK_INDEX)?.as_block(),
            num_slots_per_block: field(record, RELCAT_NO_SLOTS_PER_BLOCK_INDEX)?.as_usize(),
        })
    }

    pub fn to_record(&self) -> Result<Record> {
        Ok(vec![
            Attribute::string(&self.rel_name)?,
            Attribute::number(self.num_attrs as f64),
            Attribute::number(self.num_recs as f64),
            Attribute::block(self.first_block),
            Attribute::block(self.last_block),
            Attribute::number(self.num_slots_per_block as f64),
        ])
    }
}

/// One record of the attribute catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrCatEntry {
    pub rel_name: String,
    pub attr_name: String,
    pub attr_type: AttrType,
    pub primary_flag: bool,
    pub root_block: Option<BlockId>,
    /// Position of the attribute within a record
    pub offset: usize,
}

impl AttrCatEntry {
    pub fn new(rel_name: &str, attr_name: &str, attr_type: AttrType, offset: usize) -> Self {
        Self {
            rel_name: rel_name.to_string(),
            attr_name: attr_name.to_string(),
            attr_type,
            primary_flag: false,
            root_block: None,
            offset,
        }
    }

    pub fn from_record(record: &[Attribute]) -> Result<Self> {
        Ok(Self {
            rel_name: field(record, ATTRCAT_REL_NAME_INDEX)?.as_str().into_owned(),
            attr_name: field(record, ATTRCAT_ATTR_NAME_INDEX)?.as_str().into_owned(),
            attr_type: AttrType::from_code(field(record, ATTRCAT_ATTR_TYPE_INDEX)?.as_number())?,
            primary_flag: field(record, ATTRCAT_PRIMARY_FLAG_INDEX)?.as_number() != 0.0,
            root_block: field(record, ATTRCAT_ROOT_BLOCK_INDEX)?.as_block(),
            offset: field(record, ATTRCAT_OFFSET_INDEX)?.as_usize(),
        })
    }

    pub fn to_record(&self) -> Result<Record> {
        Ok(vec![
            Attribute::string(&self.rel_name)?,
            Attribute::string(&self.attr_name)?,
            Attribute::number(self.attr_type.code()),
            Attribute::number(if self.primary_flag { 1.0 } else { 0.0 }),
            Attribute::block(self.root_block),
            Attribute::number(self.offset as f64),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relcat_record() {
        let mut entry = RelCatEntry::new("Students", 2);
        entry.first_block = Some(BlockId::new(6));
        entry.last_block = Some(BlockId::new(9));
        entry.num_recs = 200;
        assert_eq!(entry.num_slots_per_block, 61);

        let record = entry.to_record().unwrap();
        assert_eq!(record[RELCAT_REL_NAME_INDEX].as_str(), "Students");
        assert_eq!(record[RELCAT_FIRST_BLOCK_INDEX].as_number(), 6.0);
        assert_eq!(RelCatEntry::from_record(&record).unwrap(), entry);

        let empty = RelCatEntry::new("Empty", 1).to_record().unwrap();
        assert_eq!(empty[RELCAT_LAST_BLOCK_INDEX].as_number(), -1.0);
    }

    #[test]
    fn test_attrcat_record() {
        let mut entry = AttrCatEntry::new("Students", "Marks", AttrType::Number, 1);
        entry.root_block = Some(BlockId::new(30));
        let record = entry.to_record().unwrap();
        assert_eq!(record[ATTRCAT_ATTR_TYPE_INDEX].as_number(), 0.0);
        assert_eq!(AttrCatEntry::from_record(&record).unwrap(), entry);

        assert!(matches!(
            AttrCatEntry::from_record(&record[..3]),
            Err(DbError::AttributeCountMismatch { .. })
        ));
    }
}
