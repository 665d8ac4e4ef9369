use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("volume is not mounted")]
    NotMounted,
    #[error("volume is already mounted")]
    AlreadyMounted,
    #[error("inode {0} is out of range")]
    InvalidInodeNumber(u32),
    #[error("inode {0} is not allocated")]
    InodeNotAllocated(u32),
    #[error("offset {offset} is beyond size {size}")]
    OffsetBeyondSize { offset: usize, size: usize },
    #[error("no free inode left")]
    NoFreeInode,
    #[error("no free block left")]
    NoFreeBlock,
    #[error("device does not contain a formatted volume")]
    NotFormatted,
    #[error("a volume cannot be laid out on a device of {0} blocks")]
    UnsupportedGeometry(usize),
}
