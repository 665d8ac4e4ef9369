//! # 卷层
//!
//! 格式化与挂载卷，并在挂载后提供文件的创建、删除、读写。
//! 挂载状态由 [`Volume`] 自身持有，卸载即丢弃。

use alloc::sync::Arc;

use block_dev::BlockDevice;
use log::{debug, info, warn};

use crate::block::{Block, DataBlock, InodeBlock};
use crate::cache::AllocationCache;
use crate::debug::Report;
use crate::layout::{DiskInode, SuperBlock};
use crate::{BlockId, Error, Result};
use crate::{BLOCK_SIZE, INODES_PER_BLOCK, MAX_FILE_SIZE};

pub struct Volume {
    block_device: Arc<dyn BlockDevice>,
    mounted: Option<Mounted>,
}

/// 挂载期间的状态
#[derive(Debug)]
struct Mounted {
    super_block: SuperBlock,
    cache: AllocationCache,
}

impl Mounted {
    fn check(&self, inumber: u32) -> Result<()> {
        if inumber < self.super_block.inode_count() {
            Ok(())
        } else {
            Err(Error::InvalidInodeNumber(inumber))
        }
    }

    fn load_valid(&self, block_device: &Arc<dyn BlockDevice>, inumber: u32) -> Result<DiskInode> {
        self.check(inumber)?;
        let inode = DiskInode::load(block_device, inumber);
        if inode.is_valid() {
            Ok(inode)
        } else {
            Err(Error::InodeNotAllocated(inumber))
        }
    }
}

impl Volume {
    pub fn new(block_device: Arc<dyn BlockDevice>) -> Self {
        Self {
            block_device,
            mounted: None,
        }
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// 已挂载卷的超级块
    pub fn super_block(&self) -> Option<&SuperBlock> {
        self.mounted.as_ref().map(|mounted| &mounted.super_block)
    }

    /// 空闲数据块数
    pub fn free_blocks(&self) -> Result<usize> {
        Ok(self.mounted()?.cache.free_blocks())
    }

    /// 块是否被占用：超级块、索引节点区或被有效文件引用
    pub fn is_allocated(&self, block_id: BlockId) -> Result<bool> {
        Ok(self.mounted()?.cache.is_allocated(block_id))
    }

    /// 空闲索引节点数
    pub fn free_inodes(&self) -> Result<usize> {
        Ok(self.mounted()?.cache.free_inodes())
    }

    /// 写入超级块并清空索引节点区，不触及数据块
    pub fn format(&mut self) -> Result<()> {
        if self.is_mounted() {
            return Err(Error::AlreadyMounted);
        }

        let block_count = self.block_device.block_count();
        let super_block =
            SuperBlock::for_device(block_count).ok_or(Error::UnsupportedGeometry(block_count))?;

        let mut block = Block::zeroed();
        block.map_mut(0, |sb: &mut SuperBlock| *sb = super_block);
        block.store(&self.block_device, 0);

        let empty = Block::zeroed();
        for block_id in super_block.inode_blocks() {
            empty.store(&self.block_device, block_id);
        }

        info!(
            "formatted {} blocks: {} inode blocks, {} inodes",
            super_block.nblocks, super_block.ninodeblocks, super_block.ninodes
        );
        Ok(())
    }

    /// 读出超级块，扫描全部有效索引节点以重建分配缓存
    pub fn mount(&mut self) -> Result<()> {
        if self.is_mounted() {
            return Err(Error::AlreadyMounted);
        }

        let block_device = &self.block_device;
        let super_block = Block::load(block_device, 0).map(0, |sb: &SuperBlock| *sb);
        if !super_block.fits(block_device.block_count()) {
            return Err(Error::NotFormatted);
        }

        let mut cache = AllocationCache::new(&super_block);
        let mut files = 0;
        for block_id in super_block.inode_blocks() {
            Block::load(block_device, block_id).map(0, |inodes: &InodeBlock| {
                let first = (block_id - 1) * INODES_PER_BLOCK as u32;
                for (inumber, inode) in (first..).zip(inodes) {
                    if !inode.is_valid() {
                        continue;
                    }

                    files += 1;
                    cache.occupy_inode(inumber);
                    inode
                        .blocks(block_device, super_block.nblocks)
                        .into_iter()
                        .for_each(|block_id| cache.occupy(BlockId::new(block_id)));
                }
            });
        }

        info!(
            "mounted {} blocks: {files} files, {} free blocks",
            super_block.nblocks,
            cache.free_blocks()
        );
        self.mounted = Some(Mounted { super_block, cache });
        Ok(())
    }

    /// 分配一个新的空文件并返回其编号，编号从 1 开始
    pub fn create(&mut self) -> Result<u32> {
        let mounted = self.mounted.as_mut().ok_or(Error::NotMounted)?;
        let inumber = mounted.cache.alloc_inode().ok_or(Error::NoFreeInode)?;

        let mut inode = DiskInode::default();
        inode.init();
        inode.store(&self.block_device, inumber);

        debug!("created inode {inumber}");
        Ok(inumber)
    }

    /// 释放文件及其全部块；对未分配的索引节点什么也不做
    pub fn delete(&mut self, inumber: u32) -> Result<()> {
        let mounted = self.mounted.as_mut().ok_or(Error::NotMounted)?;
        mounted.check(inumber)?;

        let mut inode = DiskInode::load(&self.block_device, inumber);
        if !inode.is_valid() {
            debug!("inode {inumber} is already free");
            return Ok(());
        }

        let blocks = inode.clear(&self.block_device, mounted.super_block.nblocks);
        DiskInode::default().store(&self.block_device, inumber);

        debug!("deleted inode {inumber}, freeing {} blocks", blocks.len());
        for block_id in blocks {
            mounted.cache.dealloc(BlockId::new(block_id));
        }
        mounted.cache.dealloc_inode(inumber);

        Ok(())
    }

    pub fn getsize(&self, inumber: u32) -> Result<u32> {
        let mounted = self.mounted()?;
        mounted
            .load_valid(&self.block_device, inumber)
            .map(|inode| inode.size)
    }

    /// 从 `offset` 开始读出至多 `buf.len()` 字节，返回读出的字节数。
    /// `offset` 恰为文件末尾时返回 0。
    pub fn read(&self, inumber: u32, buf: &mut [u8], offset: usize) -> Result<usize> {
        let mounted = self.mounted()?;
        let inode = mounted.load_valid(&self.block_device, inumber)?;

        let size = inode.size as usize;
        if offset > size {
            return Err(Error::OffsetBeyondSize { offset, size });
        }

        let read_size = inode.read_at(offset, buf, &self.block_device);
        debug!("read {read_size} bytes from inode {inumber} at {offset}");
        Ok(read_size)
    }

    /// 从 `offset` 开始写入 `data`，返回写入的字节数。
    ///
    /// 写入前会释放文件原有的全部块，文件大小变为 `offset` 加上写入的字节数；
    /// `offset` 之前的数据不保留，读出为零。
    /// 空间耗尽时保留已写入的部分；一个字节都没写入时文件变为空，返回 [`Error::NoFreeBlock`]。
    pub fn write(&mut self, inumber: u32, data: &[u8], offset: usize) -> Result<usize> {
        let mounted = self.mounted.as_mut().ok_or(Error::NotMounted)?;
        let mut inode = mounted.load_valid(&self.block_device, inumber)?;

        if offset >= MAX_FILE_SIZE {
            return Err(Error::OffsetBeyondSize {
                offset,
                size: MAX_FILE_SIZE,
            });
        }

        for block_id in inode.clear(&self.block_device, mounted.super_block.nblocks) {
            mounted.cache.dealloc(BlockId::new(block_id));
        }

        let mut start = offset;
        let end = offset.saturating_add(data.len()).min(MAX_FILE_SIZE);
        let mut written_size = 0;
        while start < end {
            let block_index = start / BLOCK_SIZE;
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_write_size = current_block_end - start;

            let Some(block_id) = inode.attach(block_index, &self.block_device, || {
                mounted.cache.alloc().map(u32::from)
            }) else {
                warn!("volume is full after writing {written_size} bytes to inode {inumber}");
                break;
            };

            let mut block = Block::zeroed();
            block.map_mut(0, |data_block: &mut DataBlock| {
                let src = &data[written_size..written_size + block_write_size];
                data_block[start % BLOCK_SIZE..start % BLOCK_SIZE + block_write_size]
                    .copy_from_slice(src);
            });
            block.store(&self.block_device, block_id);

            written_size += block_write_size;
            start = current_block_end;
        }

        if written_size == 0 && !data.is_empty() {
            inode.size = 0;
            inode.store(&self.block_device, inumber);
            return Err(Error::NoFreeBlock);
        }

        inode.size = (offset + written_size) as u32;
        inode.store(&self.block_device, inumber);

        debug!("wrote {written_size} bytes to inode {inumber} at {offset}");
        Ok(written_size)
    }

    /// 只读遍历超级块与索引节点区，挂载与否均可
    pub fn debug(&self) -> Report {
        Report::collect(&self.block_device)
    }
}

impl Volume {
    #[inline]
    fn mounted(&self) -> Result<&Mounted> {
        self.mounted.as_ref().ok_or(Error::NotMounted)
    }
}
