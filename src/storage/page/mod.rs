mod block_header;
mod index_block;
mod record_block;

pub use block_header::{write_block_type, BlockHeader};
pub use index_block::{InternalBlock, InternalEntry, LeafBlock, LeafEntry};
pub use record_block::{record_block_header, RecordBlock};
