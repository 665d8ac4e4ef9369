//! # 磁盘数据结构层
//!
//! simple-fs 的磁盘布局：
//! 超级块 | 索引节点区 | 数据块与间接索引块（不区分）

mod super_block;
pub use super_block::SuperBlock;

mod inode;
pub use inode::DiskInode;
