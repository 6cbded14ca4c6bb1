use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{BlockId, DbError, Result, BLOCK_SIZE};

/// DiskManager reads and writes fixed-size blocks of a single database file.
/// The disk has a fixed number of blocks; reading a block past the end of
/// the file yields zeros.
pub struct DiskManager {
    /// The database file
    db_file: Mutex<File>,
    /// Path to the database file
    db_path: String,
    /// Number of blocks on the disk
    num_blocks: usize,
    /// Number of disk reads performed (counts each I/O operation, not blocks)
    num_reads: AtomicU32,
    /// Number of disk writes performed (counts each I/O operation, not blocks)
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the database file at `db_path`, creating it if needed.
    pub fn new<P: AsRef<Path>>(db_path: P, num_blocks: usize) -> Result<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&db_path)?;

        Ok(Self {
            db_file: Mutex::new(file),
            db_path: path_str,
            num_blocks,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    fn check_range(&self, start: BlockId, count: usize, len: usize) -> Result<u64> {
        if len != count * BLOCK_SIZE || start.as_usize() + count > self.num_blocks {
            return Err(DbError::OutOfBound);
        }
        Ok(start.as_u32() as u64 * BLOCK_SIZE as u64)
    }

    /// Reads a block into `data`, which must be exactly BLOCK_SIZE bytes.
    pub fn read_block(&self, block: BlockId, data: &mut [u8]) -> Result<()> {
        self.read_blocks(block, 1, data)
    }

    /// Writes `data`, exactly BLOCK_SIZE bytes, to a block.
    pub fn write_block(&self, block: BlockId, data: &[u8]) -> Result<()> {
        self.write_blocks(block, 1, data)
    }

    /// Reads `count` contiguous blocks with a single seek and read.
    pub fn read_blocks(&self, start: BlockId, count: usize, data: &mut [u8]) -> Result<()> {
        let offset = self.check_range(start, count, data.len())?;

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(offset))?;

        // a short file reads as zeros past its end
        let mut filled = 0;
        while filled < data.len() {
            let n = file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data[filled..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes `count` contiguous blocks with a single seek and write.
    pub fn write_blocks(&self, start: BlockId, count: usize, data: &[u8]) -> Result<()> {
        let offset = self.check_range(start, count, data.len())?;

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the number of blocks on the disk.
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Returns the number of disk reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of disk writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the path to the database file.
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        let file = self.db_file.lock();
        file.sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let file = self.db_file.get_mut();
        let _ = file.sync_all();
    }
}
