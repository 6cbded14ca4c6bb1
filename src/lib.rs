//! relstore - a block-oriented, single-user relational storage engine
//!
//! Relations live in fixed-size 2 KB blocks of a single disk file and are
//! described by two self-describing catalog relations. Every block access
//! goes through a small buffer pool.
//!
//! # Architecture
//!
//! The crate is organized into layers, leaves first:
//!
//! - **Storage** (`storage`): disk I/O and the binary block layouts
//!   - `DiskManager`: reads and writes whole blocks of the database file
//!   - `BlockHeader`, `RecordBlock`, `LeafBlock`, `InternalBlock`: views over block bytes
//!
//! - **Buffer Pool** (`buffer`): caches blocks in frames and owns the allocation map
//!   - `BufferPool`: fetch, allocate, release and flush blocks
//!   - `AgeReplacer`: evicts the block that has gone longest without an access
//!   - `RecBuffer`/`IndLeaf`/`IndInternal`: typed handles to a block number
//!
//! - **Catalog** (`catalog`): catalog records and the caches of open relations
//!   - `OpenRelTable`: bounded table of open relations with their caches
//!
//! - **Access** (`access`): linear search, project, insert, delete and rename
//!
//! - **Index** (`index`): B+ tree search, build, insert and destroy
//!
//! - **Schema** and **Algebra** (`schema`, `algebra`): relation definitions
//!   and select/project/join, as methods on [`Database`]
//!
//! # Example
//!
//! ```rust,no_run
//! use relstore::common::{CompareOp, StorageOptions};
//! use relstore::tuple::{AttrType, Value};
//! use relstore::Database;
//!
//! let mut db = Database::open("students.db", StorageOptions::with_disk_blocks(256)).unwrap();
//! db.create_rel("Students", &[("Name", AttrType::String), ("Marks", AttrType::Number)])
//!     .unwrap();
//! let rel = db.open_rel("Students").unwrap();
//! db.insert("Students", &["Alice", "91"]).unwrap();
//! db.create_index("Students", "Marks").unwrap();
//!
//! let target = Value::Number(91.0).to_attribute().unwrap();
//! db.reset_search_index(rel).unwrap();
//! db.reset_attr_search_index(rel, "Marks").unwrap();
//! while let Some(record) = db.search_next(rel, "Marks", &target, CompareOp::Eq).unwrap() {
//!     println!("{}", record[0].as_str());
//! }
//! db.close().unwrap();
//! ```

pub mod access;
pub mod algebra;
pub mod buffer;
pub mod catalog;
pub mod common;
pub mod database;
pub mod index;
pub mod schema;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use access::{InsertStatus, SearchCursor};
pub use common::{BlockId, DbError, RecordId, RelId, Result};
pub use database::Database;
