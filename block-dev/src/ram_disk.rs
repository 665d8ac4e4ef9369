use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::{BLOCK_SIZE, BlockDevice};

/// 内存上的块设备，所有块初始为全零
#[derive(Debug)]
pub struct RamDisk {
    blocks: Mutex<Vec<[u8; BLOCK_SIZE]>>,
}

impl RamDisk {
    pub fn new(block_count: usize) -> Self {
        Self {
            blocks: Mutex::new(vec![[0; BLOCK_SIZE]; block_count]),
        }
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let blocks = self.blocks.lock();
        assert!(block_id < blocks.len(), "block {block_id} out of range");
        buf.copy_from_slice(&blocks[block_id]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut blocks = self.blocks.lock();
        assert!(block_id < blocks.len(), "block {block_id} out of range");
        blocks[block_id].copy_from_slice(buf);
    }

    #[inline]
    fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_start_zeroed() {
        let disk = RamDisk::new(4);
        let mut buf = [0xff; BLOCK_SIZE];
        disk.read_block(3, &mut buf);
        assert!(buf.iter().all(|&b| b == 0));
        assert_eq!(4, disk.block_count());
    }

    #[test]
    fn write_then_read() {
        let disk = RamDisk::new(2);
        let mut data = [0; BLOCK_SIZE];
        data[..5].copy_from_slice(b"hello");
        disk.write_block(1, &data);

        let mut buf = [0; BLOCK_SIZE];
        disk.read_block(1, &mut buf);
        assert_eq!(&buf[..5], b"hello");
        disk.read_block(0, &mut buf);
        assert_eq!(&buf[..5], &[0; 5]);
    }

    #[test]
    #[should_panic]
    fn out_of_range() {
        let disk = RamDisk::new(1);
        let mut buf = [0; BLOCK_SIZE];
        disk.read_block(1, &mut buf);
    }
}
