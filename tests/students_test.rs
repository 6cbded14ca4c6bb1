//! End-to-end run over a Students relation, mirroring the binary's workload

use relstore::common::*;
use relstore::tuple::{AttrType, Value};
use relstore::{Database, SearchCursor};
use tempfile::NamedTempFile;

const RECORDS: usize = 200;

fn marks(i: usize) -> usize {
    i * 37 % 101
}

#[test]
fn test_students_workload() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = Database::open(temp_file.path(), StorageOptions::with_disk_blocks(256)).unwrap();

    db.create_rel("Students", &[("Name", AttrType::String), ("Marks", AttrType::Number)])
        .unwrap();
    let rel = db.open_rel("Students").unwrap();
    for i in 0..RECORDS {
        let name = format!("S{i}");
        let marks = marks(i).to_string();
        let status = db.insert("Students", &[name.as_str(), marks.as_str()]).unwrap();
        assert_eq!(status.code(), 0);
    }
    assert_eq!(db.relation(rel).unwrap().num_recs, RECORDS);

    let target = Value::Number(55.0).to_attribute().unwrap();
    let linear = (0..RECORDS).filter(|&i| marks(i) == 55).count();

    db.reset_search_index(rel).unwrap();
    let mut scanned = 0;
    while db
        .search_next(rel, "Marks", &target, CompareOp::Eq)
        .unwrap()
        .is_some()
    {
        scanned += 1;
    }
    assert_eq!(scanned, linear);

    db.create_index("Students", "Marks").unwrap();
    assert!(db.pool().count_blocks(BlockType::IndexLeaf) > 0);

    db.reset_attr_search_index(rel, "Marks").unwrap();
    let mut indexed = Vec::new();
    while let Some(record) = db
        .search_next(rel, "Marks", &target, CompareOp::Eq)
        .unwrap()
    {
        indexed.push(record[0].as_str().into_owned());
    }
    assert_eq!(indexed.len(), linear);
    assert!(indexed.iter().all(|name| {
        let i = name[1..].parse::<usize>().unwrap();
        marks(i) == 55
    }));

    // every match again, through the explicit cursor
    let mut cursor = SearchCursor::default();
    let mut passed = 0;
    while db
        .search(rel, "Marks", &Value::Number(90.0).to_attribute().unwrap(), CompareOp::Ge, &mut cursor)
        .unwrap()
        .is_some()
    {
        passed += 1;
    }
    assert_eq!(passed, (0..RECORDS).filter(|&i| marks(i) >= 90).count());

    db.close_rel("Students").unwrap();
    db.delete_rel("Students").unwrap();
    assert_eq!(db.pool().count_blocks(BlockType::Record), 2);
    assert_eq!(db.pool().count_blocks(BlockType::IndexLeaf), 0);
    assert_eq!(db.pool().count_blocks(BlockType::IndexInternal), 0);
    db.close().unwrap();
}
