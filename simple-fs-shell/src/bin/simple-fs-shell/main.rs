mod cli;

use std::io;
use std::sync::Arc;

use clap::Parser;
use cli::Cli;
use simple_fs::Volume;
use simple_fs_shell::{BlockFile, Shell};

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let block_file = BlockFile::open(&cli.image, cli.blocks)?;
    println!(
        "opened emulated disk image {:?} with {} blocks",
        cli.image, cli.blocks
    );

    let mut shell = Shell::new(Volume::new(Arc::new(block_file)));
    shell.run(io::stdin().lock(), io::stdout().lock())
}
