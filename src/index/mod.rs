//! B+ tree indexes over single attributes.

mod bplus_tree;

pub use bplus_tree::BPlusTree;
