//! Relation and index definitions: create, delete, open, close and rename
//! relations and attributes, build and drop indexes.

mod ddl;
