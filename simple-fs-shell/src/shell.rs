use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::info;
use simple_fs::Volume;

/// Bytes moved per read by `cat` and `copyout`.
const CHUNK_SIZE: usize = 16 * 1024;

/// One shell input line.
#[derive(Debug, Parser)]
#[command(multicall = true)]
pub struct Line {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Write a fresh file system onto the disk
    Format,
    /// Mount the file system on the disk
    Mount,
    /// Print the superblock and every valid inode
    Debug,
    /// Create an empty file
    Create,
    /// Delete a file
    Delete { inumber: u32 },
    /// Print the size of a file
    Getsize { inumber: u32 },
    /// Print the contents of a file
    Cat { inumber: u32 },
    /// Copy a host file into a file
    Copyin { file: PathBuf, inumber: u32 },
    /// Copy a file out to a host file
    Copyout { inumber: u32, file: PathBuf },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

pub struct Shell {
    volume: Volume,
}

impl Shell {
    pub fn new(volume: Volume) -> Self {
        Self { volume }
    }

    #[inline]
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Reads commands until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead, mut out: impl Write) -> io::Result<()> {
        let mut lines = input.lines();
        loop {
            write!(out, " simplefs> ")?;
            out.flush()?;

            let Some(line) = lines.next().transpose()? else {
                writeln!(out)?;
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            match Line::try_parse_from(line.split_whitespace()) {
                Ok(Line {
                    command: Command::Quit,
                }) => return Ok(()),
                Ok(Line { command }) => self.execute(command, &mut out)?,
                Err(err) => write!(out, "{err}")?,
            }
        }
    }

    /// Runs one command. Only failures to write to `out` are returned;
    /// file system and host file errors are reported on `out`.
    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> io::Result<()> {
        info!("{command:?}");
        match command {
            Command::Format => match self.volume.format() {
                Ok(()) => writeln!(out, "disk formatted."),
                Err(err) => writeln!(out, "format failed: {err}"),
            },
            Command::Mount => match self.volume.mount() {
                Ok(()) => writeln!(out, "disk mounted."),
                Err(err) => writeln!(out, "mount failed: {err}"),
            },
            Command::Debug => write!(out, "{}", self.volume.debug()),
            Command::Create => match self.volume.create() {
                Ok(inumber) => writeln!(out, "created inode {inumber}"),
                Err(err) => writeln!(out, "create failed: {err}"),
            },
            Command::Delete { inumber } => match self.volume.delete(inumber) {
                Ok(()) => writeln!(out, "inode {inumber} deleted."),
                Err(err) => writeln!(out, "delete failed: {err}"),
            },
            Command::Getsize { inumber } => match self.volume.getsize(inumber) {
                Ok(size) => writeln!(out, "inode {inumber} has size {size}"),
                Err(err) => writeln!(out, "getsize failed: {err}"),
            },
            Command::Cat { inumber } => {
                let mut contents = Vec::new();
                match self.copy_out(inumber, &mut contents) {
                    Ok(_) => out.write_all(&contents),
                    Err(err) => writeln!(out, "cat failed: {err}"),
                }
            }
            Command::Copyin { file, inumber } => match self.copy_in(&file, inumber) {
                Ok(copied) => writeln!(out, "{copied} bytes copied"),
                Err(err) => writeln!(out, "copyin failed: {err}"),
            },
            Command::Copyout { inumber, file } => {
                let mut contents = Vec::new();
                match self
                    .copy_out(inumber, &mut contents)
                    .and_then(|copied| fs::write(&file, &contents).map(|()| copied))
                {
                    Ok(copied) => writeln!(out, "{copied} bytes copied"),
                    Err(err) => writeln!(out, "copyout failed: {err}"),
                }
            }
            Command::Quit => Ok(()),
        }
    }

    /// Writes the whole host file in one call: every write truncates the file.
    fn copy_in(&mut self, path: &Path, inumber: u32) -> io::Result<usize> {
        let data = fs::read(path)?;
        self.volume.write(inumber, &data, 0).map_err(io::Error::other)
    }

    fn copy_out(&self, inumber: u32, dest: &mut Vec<u8>) -> io::Result<usize> {
        let mut buf = vec![0; CHUNK_SIZE];
        let mut offset = 0;
        loop {
            let read_size = self
                .volume
                .read(inumber, &mut buf, offset)
                .map_err(io::Error::other)?;
            if read_size == 0 {
                return Ok(offset);
            }
            dest.extend_from_slice(&buf[..read_size]);
            offset += read_size;
        }
    }
}
