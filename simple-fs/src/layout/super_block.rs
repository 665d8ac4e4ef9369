use core::ops::Range;

use crate::{FORMAT_INODES, INODES_PER_BLOCK, MAGIC};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 记录卷的几何信息
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    magic: u32,
    /// 卷占据块数
    pub nblocks: u32,
    /// 索引节点区占据块数
    pub ninodeblocks: u32,
    /// 索引节点总数，格式化时固定为 [`FORMAT_INODES`]
    pub ninodes: u32,
}

impl SuperBlock {
    /// 按设备块数计算几何信息：索引节点区占一成再加一块。
    /// 设备放不下超级块、索引节点区和至少一个数据块时返回空。
    pub fn for_device(block_count: usize) -> Option<Self> {
        let nblocks = u32::try_from(block_count).ok()?;
        let ninodeblocks = nblocks / 10 + 1;
        (nblocks >= ninodeblocks + 2).then_some(Self {
            magic: MAGIC,
            nblocks,
            ninodeblocks,
            ninodes: FORMAT_INODES,
        })
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    /// 记录的几何信息能否落在有 `block_count` 块的设备上
    pub fn fits(&self, block_count: usize) -> bool {
        self.is_valid()
            && self.ninodeblocks > 0
            && self.ninodes > 0
            && self.ninodeblocks < self.nblocks
            && self.nblocks as usize <= block_count
    }

    /// 索引节点区的块号范围
    #[inline]
    pub fn inode_blocks(&self) -> Range<u32> {
        1..1 + self.ninodeblocks
    }

    /// 实际可寻址的索引节点数：不超过索引节点区的容量
    #[inline]
    pub fn inode_count(&self) -> u32 {
        self.ninodes
            .min(self.ninodeblocks.saturating_mul(INODES_PER_BLOCK as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry() {
        let sb = SuperBlock::for_device(64).unwrap();
        assert!(sb.is_valid());
        assert_eq!(64, sb.nblocks);
        assert_eq!(7, sb.ninodeblocks);
        assert_eq!(640, sb.ninodes);
        assert_eq!(1..8, sb.inode_blocks());
        assert_eq!(640, sb.inode_count());
    }

    #[test]
    fn small_device_clamps_inodes() {
        let sb = SuperBlock::for_device(20).unwrap();
        assert_eq!(3, sb.ninodeblocks);
        assert_eq!(640, sb.ninodes);
        assert_eq!(384, sb.inode_count());
    }

    #[test]
    fn too_small() {
        assert!(SuperBlock::for_device(0).is_none());
        assert!(SuperBlock::for_device(2).is_none());
        assert!(SuperBlock::for_device(3).is_some());
    }

    #[test]
    fn fits() {
        let sb = SuperBlock::for_device(64).unwrap();
        assert!(sb.fits(64));
        assert!(sb.fits(128));
        assert!(!sb.fits(63));
        assert!(!SuperBlock::default().fits(64));

        let empty = SuperBlock { ninodes: 0, ..sb };
        assert_eq!(0, empty.inode_count());
        assert!(!empty.fits(64));
    }
}
