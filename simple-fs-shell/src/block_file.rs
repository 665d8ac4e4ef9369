use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use block_dev::{BLOCK_SIZE, BlockDevice};
use send_wrapper::SendWrapper;

/// A disk image on the host file system, emulating a block device.
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    blocks: usize,
}

impl BlockFile {
    pub fn new(fd: File, blocks: usize) -> Self {
        Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            blocks,
        }
    }

    /// Opens (or creates) the image and sizes it to exactly `blocks` blocks.
    pub fn open(path: impl AsRef<Path>, blocks: usize) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        fd.set_len((blocks * BLOCK_SIZE) as u64)?;

        Ok(Self::new(fd, blocks))
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        assert!(block_id < self.blocks, "block {block_id} out of range");
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        file.read_exact(&mut buf[..BLOCK_SIZE])
            .expect("not a complete block!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        assert!(block_id < self.blocks, "block {block_id} out of range");
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        file.write_all(&buf[..BLOCK_SIZE])
            .expect("not a complete block!");
    }

    #[inline]
    fn block_count(&self) -> usize {
        self.blocks
    }
}
