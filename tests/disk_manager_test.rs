//! Integration tests for the disk manager

use relstore::common::{BlockId, DbError, BLOCK_SIZE};
use relstore::storage::disk::DiskManager;
use tempfile::NamedTempFile;

#[test]
fn test_disk_manager_read_write_block() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path(), 16).unwrap();

    let mut write_data = [0u8; BLOCK_SIZE];
    for (i, byte) in write_data.iter_mut().enumerate() {
        *byte = (i % 256) as u8;
    }
    dm.write_block(BlockId::new(9), &write_data).unwrap();

    let mut read_data = [0u8; BLOCK_SIZE];
    dm.read_block(BlockId::new(9), &mut read_data).unwrap();
    assert_eq!(write_data, read_data);
    assert_eq!(dm.get_num_writes(), 1);
    assert_eq!(dm.get_num_reads(), 1);
}

#[test]
fn test_disk_manager_unwritten_blocks_read_as_zero() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path(), 16).unwrap();
    dm.write_block(BlockId::new(2), &[0xAB; BLOCK_SIZE]).unwrap();

    let mut data = [0xFFu8; BLOCK_SIZE];
    dm.read_block(BlockId::new(1), &mut data).unwrap();
    assert!(data.iter().all(|&b| b == 0));
    dm.read_block(BlockId::new(15), &mut data).unwrap();
    assert!(data.iter().all(|&b| b == 0));
}

#[test]
fn test_disk_manager_bounds() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path(), 8).unwrap();

    let mut data = [0u8; BLOCK_SIZE];
    assert!(matches!(
        dm.read_block(BlockId::new(8), &mut data),
        Err(DbError::OutOfBound)
    ));
    assert!(matches!(
        dm.write_block(BlockId::new(0), &data[..100]),
        Err(DbError::OutOfBound)
    ));
    let mut many = vec![0u8; 3 * BLOCK_SIZE];
    assert!(matches!(
        dm.read_blocks(BlockId::new(6), 3, &mut many),
        Err(DbError::OutOfBound)
    ));
    dm.read_blocks(BlockId::new(5), 3, &mut many).unwrap();
}

#[test]
fn test_disk_manager_persistence() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    {
        let dm = DiskManager::new(&path, 32).unwrap();
        let mut data = [0u8; BLOCK_SIZE];
        data[..7].copy_from_slice(b"persist");
        dm.write_block(BlockId::new(20), &data).unwrap();
    }

    let dm = DiskManager::new(&path, 32).unwrap();
    let mut data = [0u8; BLOCK_SIZE];
    dm.read_block(BlockId::new(20), &mut data).unwrap();
    assert_eq!(&data[..7], b"persist");
}
