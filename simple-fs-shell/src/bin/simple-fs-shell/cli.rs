use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Disk image, created if missing
    pub image: PathBuf,

    /// Number of 4096-byte blocks in the image
    pub blocks: usize,
}
