//! Integration tests for the buffer pool

use relstore::buffer::{BufferPool, RecBuffer};
use relstore::catalog::format_disk;
use relstore::common::*;
use relstore::storage::disk::DiskManager;
use relstore::storage::page::record_block_header;
use relstore::tuple::Attribute;
use tempfile::NamedTempFile;

fn create_pool(capacity: usize, num_blocks: usize) -> (BufferPool, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let disk = DiskManager::new(temp_file.path(), num_blocks).unwrap();
    format_disk(&disk).unwrap();
    (BufferPool::new(disk, capacity).unwrap(), temp_file)
}

#[test]
fn test_buffer_pool_allocates_first_unused_block() {
    let (pool, _temp) = create_pool(4, 32);

    let first = pool.allocate(BlockType::Record).unwrap();
    let second = pool.allocate(BlockType::IndexLeaf).unwrap();
    assert_eq!(first, BlockId::new(6));
    assert_eq!(second, BlockId::new(7));
    assert_eq!(pool.block_type(second).unwrap(), BlockType::IndexLeaf);

    pool.release(first).unwrap();
    assert_eq!(pool.allocate(BlockType::Record).unwrap(), first);
}

#[test]
fn test_buffer_pool_eviction_writes_dirty_blocks() {
    let (pool, _temp) = create_pool(3, 64);

    let mut blocks = Vec::new();
    for i in 0..10 {
        let block = pool.allocate(BlockType::Record).unwrap();
        let mut guard = pool.write_block(block).unwrap();
        guard[HEADER_SIZE] = i as u8;
        blocks.push(block);
    }
    assert!(!pool.is_resident(blocks[0]));

    for (i, &block) in blocks.iter().enumerate() {
        let guard = pool.read_block(block).unwrap();
        assert_eq!(guard[HEADER_SIZE], i as u8);
    }
}

#[test]
fn test_buffer_pool_release_invalidates_frame() {
    let (pool, _temp) = create_pool(4, 32);

    let block = pool.allocate(BlockType::Record).unwrap();
    let buffer = RecBuffer::new(&pool, block);
    buffer.init(&record_block_header(1, slots_per_block(1))).unwrap();
    buffer.set_record(0, &[Attribute::number(42.0)]).unwrap();
    assert!(pool.is_resident(block));

    buffer.release().unwrap();
    assert!(!pool.is_resident(block));
    assert_eq!(pool.free_frame_count(), 4);

    let again = pool.allocate(BlockType::IndexLeaf).unwrap();
    assert_eq!(again, block);
    let guard = pool.read_block(again).unwrap();
    assert!(guard[HEADER_SIZE..].iter().all(|&b| b == 0));
}

#[test]
fn test_buffer_pool_errors() {
    let (pool, _temp) = create_pool(2, 8);

    assert!(matches!(
        pool.read_block(BlockId::new(8)),
        Err(DbError::OutOfBound)
    ));
    assert!(matches!(
        pool.mark_dirty(BlockId::new(7)),
        Err(DbError::BlockNotInBuffer(_))
    ));
    assert!(matches!(
        pool.release(BlockId::new(0)),
        Err(DbError::NotPermitted)
    ));

    pool.allocate(BlockType::Record).unwrap();
    pool.allocate(BlockType::Record).unwrap();
    assert!(matches!(
        pool.allocate(BlockType::Record),
        Err(DbError::DiskFull)
    ));
}

#[test]
fn test_buffer_pool_flush_persists_map_and_blocks() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    let block = {
        let disk = DiskManager::new(&path, 32).unwrap();
        format_disk(&disk).unwrap();
        let pool = BufferPool::new(disk, 4).unwrap();
        let block = pool.allocate(BlockType::IndexInternal).unwrap();
        pool.write_block(block).unwrap()[HEADER_SIZE] = 0x5A;
        pool.flush_all().unwrap();
        assert_eq!(pool.is_dirty(block), Some(false));
        block
    };

    let pool = BufferPool::new(DiskManager::new(&path, 32).unwrap(), 4).unwrap();
    assert_eq!(pool.block_type(block).unwrap(), BlockType::IndexInternal);
    assert_eq!(pool.count_blocks(BlockType::Unused), 32 - 7);
    assert_eq!(pool.read_block(block).unwrap()[HEADER_SIZE], 0x5A);
}
