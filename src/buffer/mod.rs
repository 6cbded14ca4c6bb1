mod age_replacer;
mod block_buffer;
mod block_guard;
mod buffer_pool;
mod frame_header;

pub use age_replacer::*;
pub use block_buffer::*;
pub use block_guard::*;
pub use buffer_pool::BufferPool;
pub use frame_header::*;
