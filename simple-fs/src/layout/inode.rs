//! 索引节点
//!
//! - 直接索引：[`POINTERS_PER_INODE`] 个块编号，覆盖文件的前 5 个数据块
//! - 一级间接索引：指向一个间接索引块，其中 [`POINTERS_PER_BLOCK`] 个块编号
//!   覆盖之后的数据块
//!
//! 块编号 0 表示未使用；未使用的数据块读出全零。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use log::warn;

use crate::block::{Block, DataBlock, IndirectBlock, InodeBlock};
use crate::{BLOCK_SIZE, INODES_PER_BLOCK, POINTERS_PER_BLOCK, POINTERS_PER_INODE};

/// 直接索引可编号数量
const DIRECT_COUNT: usize = POINTERS_PER_INODE;
/// 用上一级索引时的编号容量
const INDIRECT1_CAP: usize = DIRECT_COUNT + POINTERS_PER_BLOCK;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DiskInode {
    /// 非 0 表示正在使用
    pub(crate) isvalid: u32,
    /// 文件字节数
    pub size: u32,
    /// 直接索引
    pub direct: [u32; DIRECT_COUNT],
    /// 指向一个一级索引块
    pub indirect: u32,
}

impl DiskInode {
    #[inline]
    pub fn init(&mut self) {
        *self = Self {
            isvalid: 1,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.isvalid != 0
    }

    /// 通过编号获取索引节点在磁盘上的位置：**块ID**以及**块内下标**
    #[inline]
    pub fn position(inumber: u32) -> (u32, usize) {
        let per_block = INODES_PER_BLOCK as u32;
        (1 + inumber / per_block, (inumber % per_block) as usize)
    }

    pub fn load(block_device: &Arc<dyn BlockDevice>, inumber: u32) -> Self {
        let (block_id, index) = Self::position(inumber);
        Block::load(block_device, block_id).map(0, |inodes: &InodeBlock| inodes[index])
    }

    pub fn store(&self, block_device: &Arc<dyn BlockDevice>, inumber: u32) {
        let (block_id, index) = Self::position(inumber);
        let mut block = Block::load(block_device, block_id);
        block.map_mut(0, |inodes: &mut InodeBlock| inodes[index] = *self);
        block.store(block_device, block_id);
    }

    /// 逻辑上 inode 指向一系列数据块，此处传入的是这些数据块的索引（逻辑索引），
    /// 返回其块ID，0 表示未分配
    pub fn block_id(&self, block_index: usize, block_device: &Arc<dyn BlockDevice>) -> u32 {
        if block_index < DIRECT_COUNT {
            self.direct[block_index]
        } else if block_index < INDIRECT1_CAP && self.indirect != 0 {
            Block::load(block_device, self.indirect).map(0, |indirect: &IndirectBlock| {
                // 剔去直接索引的部分
                indirect[block_index - DIRECT_COUNT]
            })
        } else {
            0
        }
    }

    /// 为第 `block_index` 个数据块分配新块并登记，必要时先分配间接索引块。
    /// `alloc` 耗尽时返回空，已登记的部分保持不变。
    pub fn attach(
        &mut self,
        block_index: usize,
        block_device: &Arc<dyn BlockDevice>,
        mut alloc: impl FnMut() -> Option<u32>,
    ) -> Option<u32> {
        assert!(block_index < INDIRECT1_CAP);

        if block_index < DIRECT_COUNT {
            let block_id = alloc()?;
            self.direct[block_index] = block_id;
            return Some(block_id);
        }

        if self.indirect == 0 {
            let indirect = alloc()?;
            // 复用的块可能残留旧的编号
            Block::zeroed().store(block_device, indirect);
            self.indirect = indirect;
        }

        let block_id = alloc()?;
        let mut indirect = Block::load(block_device, self.indirect);
        indirect.map_mut(0, |pointers: &mut IndirectBlock| {
            pointers[block_index - DIRECT_COUNT] = block_id;
        });
        indirect.store(block_device, self.indirect);

        Some(block_id)
    }

    /// 该 inode 引用的全部块：直接索引块、间接索引块及其登记的块。
    /// 超出 `nblocks` 的编号被忽略。
    pub fn blocks(&self, block_device: &Arc<dyn BlockDevice>, nblocks: u32) -> Vec<u32> {
        let in_range = |&block_id: &u32| {
            if block_id >= nblocks {
                warn!("ignoring block pointer {block_id} beyond {nblocks} blocks");
                false
            } else {
                true
            }
        };

        let mut blocks: Vec<u32> = self
            .direct
            .iter()
            .copied()
            .filter(|&block_id| block_id != 0)
            .filter(in_range)
            .collect();

        if self.indirect != 0 && in_range(&self.indirect) {
            blocks.push(self.indirect);
            Block::load(block_device, self.indirect).map(0, |indirect: &IndirectBlock| {
                blocks.extend(
                    indirect
                        .iter()
                        .copied()
                        .filter(|&block_id| block_id != 0)
                        .filter(in_range),
                );
            });
        }

        blocks
    }

    /// 清空大小与全部索引，返回原先引用的块
    pub fn clear(&mut self, block_device: &Arc<dyn BlockDevice>, nblocks: u32) -> Vec<u32> {
        let blocks = self.blocks(block_device, nblocks);
        self.size = 0;
        self.direct.fill(0);
        self.indirect = 0;
        blocks
    }

    /// 从指定位置(字节偏移)读出数据填充`buf`，不越过文件末尾
    pub fn read_at(
        &self,
        offset: usize,
        buf: &mut [u8],
        block_device: &Arc<dyn BlockDevice>,
    ) -> usize {
        let mut start = offset;
        let end = offset.saturating_add(buf.len()).min(self.size as usize);

        // 已读取多少字节
        let mut read_size = 0;
        while start < end {
            let block_index = start / BLOCK_SIZE;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_read_size = current_block_end - start;
            let dest = &mut buf[read_size..read_size + block_read_size];

            match self.block_id(block_index, block_device) {
                0 => dest.fill(0),
                block_id => {
                    Block::load(block_device, block_id).map(0, |data_block: &DataBlock| {
                        // 绝对地址 % 块大小 = 块内偏移
                        let src =
                            &data_block[start % BLOCK_SIZE..start % BLOCK_SIZE + block_read_size];
                        dest.copy_from_slice(src);
                    })
                }
            }

            read_size += block_read_size;
            start = current_block_end;
        }

        read_size
    }
}
