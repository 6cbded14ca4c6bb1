//! Record-level access to relations: scans, inserts, and catalog maintenance.

mod block_access;

pub use block_access::*;
