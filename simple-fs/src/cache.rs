//! # 分配缓存层
//!
//! 挂载时扫描索引节点图重建，只存在于内存中，从不落盘：
//! - 块位图：每块一位，置位表示已占用
//! - 索引节点有效表：每个索引节点一位，置位表示已分配

use alloc::vec;
use alloc::vec::Vec;

use derive_more::Into;
use log::{trace, warn};

use crate::SuperBlock;

/// 块编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Into)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// 位图，按 64 位分组存放。
/// 末组中超出长度的位恒为 1，分配时不会被选中。
#[derive(Debug)]
struct Bitmap {
    groups: Vec<u64>,
    len: usize,
}

impl Bitmap {
    fn new(len: usize) -> Self {
        let mut groups = vec![0; len.div_ceil(64)];
        if len % 64 != 0 {
            if let Some(last) = groups.last_mut() {
                *last = u64::MAX << (len % 64);
            }
        }
        Self { groups, len }
    }

    #[inline]
    fn get(&self, index: usize) -> bool {
        index < self.len && self.groups[index / 64] & (1 << (index % 64)) != 0
    }

    #[inline]
    fn set(&mut self, index: usize) {
        self.groups[index / 64] |= 1 << (index % 64);
    }

    #[inline]
    fn clear(&mut self, index: usize) {
        self.groups[index / 64] &= !(1 << (index % 64));
    }

    /// 找到编号最小的空闲位并置位
    fn alloc(&mut self) -> Option<usize> {
        let (group_index, ingroup_index) =
            self.groups
                .iter()
                .enumerate()
                .find_map(|(group_index, &bits)| {
                    (bits != u64::MAX).then_some((group_index, bits.trailing_ones() as usize))
                })?;

        self.groups[group_index] |= 1 << ingroup_index;
        Some(group_index * 64 + ingroup_index)
    }

    #[inline]
    fn count_free(&self) -> usize {
        self.groups.iter().map(|bits| bits.count_zeros() as usize).sum()
    }
}

#[derive(Debug)]
pub struct AllocationCache {
    blocks: Bitmap,
    inodes: Bitmap,
    /// 数据区起始块：超级块与索引节点区之后
    data_start: u32,
}

impl AllocationCache {
    /// 超级块与索引节点区预先标记为占用；0 号索引节点永不分配
    pub fn new(super_block: &SuperBlock) -> Self {
        let mut blocks = Bitmap::new(super_block.nblocks as usize);
        blocks.set(0);
        super_block
            .inode_blocks()
            .for_each(|block_id| blocks.set(block_id as usize));

        let mut inodes = Bitmap::new(super_block.inode_count() as usize);
        inodes.set(0);

        Self {
            blocks,
            inodes,
            data_start: super_block.inode_blocks().end,
        }
    }

    /// 挂载扫描时登记已被引用的块
    pub fn occupy(&mut self, block_id: BlockId) {
        if block_id.index() < self.blocks.len {
            self.blocks.set(block_id.index());
        } else {
            warn!("cannot occupy {block_id:?}: beyond the volume");
        }
    }

    /// 分配编号最小的空闲块
    pub fn alloc(&mut self) -> Option<BlockId> {
        let index = self.blocks.alloc()?;
        let block_id = BlockId(index as u32);
        trace!("alloc {block_id:?}");
        Some(block_id)
    }

    pub fn dealloc(&mut self, block_id: BlockId) {
        if block_id.0 < self.data_start || block_id.index() >= self.blocks.len {
            warn!("refusing to free reserved or out-of-range {block_id:?}");
            return;
        }
        trace!("dealloc {block_id:?}");
        self.blocks.clear(block_id.index());
    }

    #[inline]
    pub fn is_allocated(&self, block_id: BlockId) -> bool {
        self.blocks.get(block_id.index())
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.blocks.count_free()
    }

    /// 挂载扫描时登记有效的索引节点
    pub fn occupy_inode(&mut self, inumber: u32) {
        if (inumber as usize) < self.inodes.len {
            self.inodes.set(inumber as usize);
        }
    }

    /// 分配编号最小的空闲索引节点
    #[inline]
    pub fn alloc_inode(&mut self) -> Option<u32> {
        self.inodes.alloc().map(|inumber| inumber as u32)
    }

    pub fn dealloc_inode(&mut self, inumber: u32) {
        if inumber != 0 && (inumber as usize) < self.inodes.len {
            self.inodes.clear(inumber as usize);
        }
    }

    #[cfg(test)]
    pub fn is_inode_valid(&self, inumber: u32) -> bool {
        inumber != 0 && self.inodes.get(inumber as usize)
    }

    #[inline]
    pub fn free_inodes(&self) -> usize {
        self.inodes.count_free()
    }
}
