//! # 诊断层
//!
//! 只读地遍历超级块与索引节点区，生成可打印的报告。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use block_dev::BlockDevice;

use crate::block::{Block, IndirectBlock, InodeBlock};
use crate::layout::SuperBlock;
use crate::INODES_PER_BLOCK;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub super_block: SuperBlock,
    /// 有效的索引节点，超级块不合法时为空
    pub inodes: Vec<InodeReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeReport {
    pub inumber: u32,
    pub size: u32,
    /// 非零的直接索引
    pub direct: Vec<u32>,
    /// 间接索引块及其中非零的编号
    pub indirect: Option<(u32, Vec<u32>)>,
}

impl Report {
    pub fn collect(block_device: &Arc<dyn BlockDevice>) -> Self {
        let super_block = Block::load(block_device, 0).map(0, |sb: &SuperBlock| *sb);
        let mut inodes = Vec::new();

        if super_block.fits(block_device.block_count()) {
            for block_id in super_block.inode_blocks() {
                let first = (block_id - 1) * INODES_PER_BLOCK as u32;
                Block::load(block_device, block_id).map(0, |block: &InodeBlock| {
                    let valid = (first..).zip(block).filter(|(_, inode)| inode.is_valid());
                    for (inumber, inode) in valid {
                        let indirect = (inode.indirect != 0 && inode.indirect < super_block.nblocks)
                            .then(|| {
                                let pointers = Block::load(block_device, inode.indirect)
                                    .map(0, |pointers: &IndirectBlock| nonzero(pointers));
                                (inode.indirect, pointers)
                            });

                        inodes.push(InodeReport {
                            inumber,
                            size: inode.size,
                            direct: nonzero(&inode.direct),
                            indirect,
                        });
                    }
                });
            }
        }

        Self {
            super_block,
            inodes,
        }
    }
}

fn nonzero(pointers: &[u32]) -> Vec<u32> {
    pointers.iter().copied().filter(|&block_id| block_id != 0).collect()
}

fn write_pointers(f: &mut fmt::Formatter<'_>, label: &str, pointers: &[u32]) -> fmt::Result {
    write!(f, "    {label}:")?;
    for block_id in pointers {
        write!(f, " {block_id}")?;
    }
    writeln!(f)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sb = &self.super_block;
        writeln!(f, "superblock:")?;
        if sb.is_valid() {
            writeln!(f, "    magic number is valid")?;
        } else {
            writeln!(f, "    magic number is not valid")?;
        }
        writeln!(f, "    {} blocks", sb.nblocks)?;
        writeln!(f, "    {} inode blocks", sb.ninodeblocks)?;
        writeln!(f, "    {} inodes", sb.ninodes)?;

        for inode in &self.inodes {
            writeln!(f, "inode {}:", inode.inumber)?;
            writeln!(f, "    size: {} bytes", inode.size)?;
            write_pointers(f, "direct blocks", &inode.direct)?;
            if let Some((block_id, pointers)) = &inode.indirect {
                writeln!(f, "    indirect block: {block_id}")?;
                write_pointers(f, "indirect data blocks", pointers)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use block_dev::{BLOCK_SIZE, RamDisk};

    use super::*;
    use crate::Volume;

    #[test]
    fn unformatted() {
        let dev: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(8));
        let report = Report::collect(&dev);
        assert!(report.inodes.is_empty());
        assert_eq!(
            "superblock:\n    magic number is not valid\n    0 blocks\n    0 inode blocks\n    0 inodes\n",
            report.to_string()
        );
    }

    #[test]
    fn files() {
        let dev: Arc<dyn BlockDevice> = Arc::new(RamDisk::new(64));
        let mut volume = Volume::new(dev.clone());
        volume.format().unwrap();
        volume.mount().unwrap();

        let small = volume.create().unwrap();
        volume.write(small, b"hello", 0).unwrap();
        let empty = volume.create().unwrap();
        let large = volume.create().unwrap();
        volume.write(large, &vec![1; 6 * BLOCK_SIZE + 1], 0).unwrap();

        let report = volume.debug();
        assert_eq!(report, Report::collect(&dev));
        assert_eq!(3, report.inodes.len());
        assert_eq!(
            InodeReport {
                inumber: large,
                size: (6 * BLOCK_SIZE + 1) as u32,
                direct: vec![9, 10, 11, 12, 13],
                indirect: Some((14, vec![15, 16])),
            },
            report.inodes[2]
        );

        let expected = "\
superblock:
    magic number is valid
    64 blocks
    7 inode blocks
    640 inodes
inode 1:
    size: 5 bytes
    direct blocks: 8
inode 2:
    size: 0 bytes
    direct blocks:
inode 3:
    size: 24577 bytes
    direct blocks: 9 10 11 12 13
    indirect block: 14
    indirect data blocks: 15 16
";
        assert_eq!((small, empty), (1, 2));
        assert_eq!(expected, report.to_string());
    }
}
