//! # 块编解码层
//!
//! 磁盘块本身不携带类型信息，由引用它的一方决定如何解释：
//! - 0 号块：超级块
//! - 索引节点区：[`INODES_PER_BLOCK`](crate::INODES_PER_BLOCK) 个索引节点
//! - 被 `indirect` 引用：间接索引块
//! - 其余：数据块

use alloc::sync::Arc;
use core::mem;

use block_dev::BlockDevice;

use crate::layout::{DiskInode, SuperBlock};
use crate::{BLOCK_SIZE, INODES_PER_BLOCK, POINTERS_PER_BLOCK};

/// 索引节点块
pub type InodeBlock = [DiskInode; INODES_PER_BLOCK];
/// 间接索引块，0 表示未使用
pub type IndirectBlock = [u32; POINTERS_PER_BLOCK];
/// 数据块
pub type DataBlock = [u8; BLOCK_SIZE];

/// 可以直接覆盖在块数据上的类型：任意位模式都合法，且不含指针
///
/// # Safety
///
/// 实现者必须是 `#[repr(C)]` 的纯整数结构
pub unsafe trait Plain: Sized {}

unsafe impl Plain for SuperBlock {}
unsafe impl Plain for DiskInode {}
unsafe impl Plain for InodeBlock {}
unsafe impl Plain for IndirectBlock {}
unsafe impl Plain for DataBlock {}

/// 内存中的一个磁盘块
#[repr(C, align(8))]
pub struct Block {
    data: DataBlock,
}

impl Block {
    #[inline]
    pub const fn zeroed() -> Self {
        Self {
            data: [0; BLOCK_SIZE],
        }
    }

    pub fn load(block_device: &Arc<dyn BlockDevice>, block_id: u32) -> Self {
        let mut block = Self::zeroed();
        block_device.read_block(block_id as usize, &mut block.data);
        block
    }

    #[inline]
    pub fn store(&self, block_device: &Arc<dyn BlockDevice>, block_id: u32) {
        block_device.write_block(block_id as usize, &self.data);
    }

    pub fn get<T: Plain>(&self, offset: usize) -> &T {
        assert!(mem::size_of::<T>() + offset <= BLOCK_SIZE);
        assert_eq!(0, offset % mem::align_of::<T>());
        let addr = self.data[offset..].as_ptr().cast::<T>();
        unsafe { &*addr }
    }

    pub fn get_mut<T: Plain>(&mut self, offset: usize) -> &mut T {
        assert!(mem::size_of::<T>() + offset <= BLOCK_SIZE);
        assert_eq!(0, offset % mem::align_of::<T>());
        let addr = self.data[offset..].as_mut_ptr().cast::<T>();
        unsafe { &mut *addr }
    }

    #[inline]
    pub fn map<T: Plain, V>(&self, offset: usize, f: impl FnOnce(&T) -> V) -> V {
        f(self.get(offset))
    }

    #[inline]
    pub fn map_mut<T: Plain, V>(&mut self, offset: usize, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut(offset))
    }
}
