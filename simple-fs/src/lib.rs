#![no_std]

extern crate alloc;

/* simple-fs 的整体架构，自上而下 */

// 卷层：挂载状态，文件的创建、删除、读写
mod volume;

// 诊断层：只读遍历元数据并生成文本报告
mod debug;

// 分配缓存层：挂载时重建的块位图与索引节点有效表
mod cache;

// 磁盘数据结构层：超级块、索引节点、间接索引块
mod layout;

// 块编解码层：把一个磁盘块解释为某种磁盘数据结构
mod block;

mod error;

pub use block_dev::{BLOCK_SIZE, BlockDevice};

pub use self::{
    cache::BlockId,
    debug::{InodeReport, Report},
    error::{Error, Result},
    layout::{DiskInode, SuperBlock},
    volume::Volume,
};

pub const MAGIC: u32 = 0xf0f03410;
/// 每个索引节点块容纳的索引节点数
pub const INODES_PER_BLOCK: usize = 128;
/// 每个索引节点的直接索引数
pub const POINTERS_PER_INODE: usize = 5;
/// 每个间接索引块容纳的块编号数
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;
/// 格式化时写入超级块的索引节点总数
pub const FORMAT_INODES: u32 = (INODES_PER_BLOCK * 5) as u32;
/// 单个文件的最大字节数
pub const MAX_FILE_SIZE: usize = (POINTERS_PER_INODE + POINTERS_PER_BLOCK) * BLOCK_SIZE;
