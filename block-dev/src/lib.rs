//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备；[`BlockDevice`] 是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 块的大小固定为 [`BLOCK_SIZE`] 字节，块号范围为 `0..block_count()`，
//! 越界访问的行为由驱动自行决定。

#![no_std]

extern crate alloc;

mod ram_disk;

pub use self::ram_disk::RamDisk;

/// 块大小（字节）
pub const BLOCK_SIZE: usize = 4096;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync {
    /// 读出整块，`buf` 的长度必须为 [`BLOCK_SIZE`]
    fn read_block(&self, block_id: usize, buf: &mut [u8]);

    /// 写入整块，`buf` 的长度必须为 [`BLOCK_SIZE`]
    fn write_block(&self, block_id: usize, buf: &[u8]);

    /// 设备的总块数，在设备生命周期内不变
    fn block_count(&self) -> usize;
}
