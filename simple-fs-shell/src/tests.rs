use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use block_dev::{BLOCK_SIZE, BlockDevice, RamDisk};
use clap::Parser;
use simple_fs::Volume;

use crate::{BlockFile, Command, Line, Shell};

fn parse(line: &str) -> Result<Command, clap::Error> {
    Line::try_parse_from(line.split_whitespace()).map(|line| line.command)
}

fn session(shell: &mut Shell, script: &str) -> String {
    let mut out = Vec::new();
    shell.run(Cursor::new(script), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn parse_commands() {
    assert_eq!(Command::Format, parse("format").unwrap());
    assert_eq!(Command::Delete { inumber: 3 }, parse("delete 3").unwrap());
    assert_eq!(Command::Getsize { inumber: 12 }, parse("  getsize   12 ").unwrap());
    assert_eq!(
        Command::Copyin {
            file: PathBuf::from("/tmp/a"),
            inumber: 1
        },
        parse("copyin /tmp/a 1").unwrap()
    );
    assert_eq!(
        Command::Copyout {
            inumber: 2,
            file: PathBuf::from("b.txt")
        },
        parse("copyout 2 b.txt").unwrap()
    );
    assert_eq!(Command::Quit, parse("exit").unwrap());
}

#[test]
fn parse_errors() {
    assert!(parse("delete").is_err());
    assert!(parse("delete one").is_err());
    assert!(parse("mkdir x").is_err());
}

#[test]
fn hello_session() {
    let mut shell = Shell::new(Volume::new(Arc::new(RamDisk::new(64))));
    let out = session(&mut shell, "format\nmount\ncreate\ngetsize 1\nquit\ngetsize 1\n");

    assert!(out.contains("disk formatted."));
    assert!(out.contains("disk mounted."));
    assert!(out.contains("created inode 1"));
    assert!(out.contains("inode 1 has size 0"));
    assert_eq!(1, out.matches("has size").count());
    assert!(shell.volume().is_mounted());
}

#[test]
fn errors_are_reported() {
    let mut shell = Shell::new(Volume::new(Arc::new(RamDisk::new(64))));
    let out = session(&mut shell, "create\nformat\nmount\nmount\ndelete 9999\nbogus\n");

    assert!(out.contains("create failed: volume is not mounted"));
    assert!(out.contains("mount failed: volume is already mounted"));
    assert!(out.contains("delete failed: inode 9999 is out of range"));
    assert!(out.contains("error:"));
}

#[test]
fn copy_in_and_out() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source");
    let dest = dir.path().join("dest");
    let data: Vec<u8> = (0..10 * BLOCK_SIZE + 7).map(|i| (i % 7) as u8).collect();
    fs::write(&source, &data).unwrap();

    let mut shell = Shell::new(Volume::new(Arc::new(RamDisk::new(64))));
    let script = format!(
        "format\nmount\ncreate\ncopyin {} 1\ncopyout 1 {}\ngetsize 1\n",
        source.display(),
        dest.display()
    );
    let out = session(&mut shell, &script);

    assert_eq!(2, out.matches(&format!("{} bytes copied", data.len())).count());
    assert!(out.contains(&format!("inode 1 has size {}", data.len())));
    assert_eq!(data, fs::read(&dest).unwrap());
}

#[test]
fn cat() {
    let mut volume = Volume::new(Arc::new(RamDisk::new(64)));
    volume.format().unwrap();
    volume.mount().unwrap();
    let inumber = volume.create().unwrap();
    volume.write(inumber, b"hello, world\n", 0).unwrap();

    let mut shell = Shell::new(volume);
    let out = session(&mut shell, &format!("cat {inumber}\ncat 5\n"));
    assert!(out.contains("hello, world\n"));
    assert!(out.contains("cat failed: inode 5 is not allocated"));
}

#[test]
fn block_file_persists() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("disk.img");

    {
        let block_file = BlockFile::open(&image, 20).unwrap();
        assert_eq!(20, block_file.block_count());
        let mut shell = Shell::new(Volume::new(Arc::new(block_file)));
        let out = session(&mut shell, "format\nmount\ncreate\n");
        assert!(out.contains("created inode 1"));
    }
    assert_eq!(
        (20 * BLOCK_SIZE) as u64,
        fs::metadata(&image).unwrap().len()
    );

    let mut volume = Volume::new(Arc::new(BlockFile::open(&image, 20).unwrap()));
    volume.mount().unwrap();
    assert_eq!(Ok(5), volume.write(1, b"again", 0));

    let report = volume.debug();
    assert_eq!(1, report.inodes.len());
    assert_eq!(5, report.inodes[0].size);
}

#[test]
fn block_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let block_file = BlockFile::open(dir.path().join("raw.img"), 4).unwrap();

    let mut data = [0; BLOCK_SIZE];
    data[BLOCK_SIZE - 3..].copy_from_slice(b"end");
    block_file.write_block(3, &data);

    let mut buf = [0xff; BLOCK_SIZE];
    block_file.read_block(3, &mut buf);
    assert_eq!(data, buf);
    block_file.read_block(0, &mut buf);
    assert!(buf.iter().all(|&b| b == 0));
}
