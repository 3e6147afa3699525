//! Line-oriented command loop over a mounted volume. Commands are
//! tokenized at the first whitespace; `write`, `apfile` and `wblock` treat
//! the remainder of the line after the name/index as verbatim content.
//! Errors are reported as one-line messages and never escape the loop.

use crate::error_fs::FsError;
use crate::volume::Volume;
use fatsim_api::fs::{BlockSupport, DirSupport, FileSupport, VolumeSupport};
use fatsim_api::types::EntryInfo;
use std::io::{self, BufRead, Write};

/// Split off the first whitespace-delimited token.
fn split_first(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn report<W: Write>(out: &mut W, res: Result<(), FsError>, ok: &str) -> io::Result<()> {
    match res {
        Ok(()) => writeln!(out, "{}", ok),
        Err(e) => writeln!(out, "Error: {}", e),
    }
}

fn print_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Available commands:")?;
    writeln!(out, "  touch <name>              create an empty file")?;
    writeln!(out, "  ls                        list the current directory")?;
    writeln!(out, "  rm | delete <name>        delete a file or subtree")?;
    writeln!(out, "  write <name> <content>    overwrite a file")?;
    writeln!(out, "  apfile <name> <content>   append to a file")?;
    writeln!(out, "  read <name>               print a file's content")?;
    writeln!(out, "  tcate | truncate <name> <size>  shrink a file")?;
    writeln!(out, "  mkdir <name>              create a subdirectory")?;
    writeln!(out, "  cd <name> | cd ..         change the current directory")?;
    writeln!(out, "  rname <old> <new>         rename a file or subdirectory")?;
    writeln!(out, "  move <file> <dir>         move a file into a subdirectory")?;
    writeln!(out, "  rblock <index>            dump a block")?;
    writeln!(out, "  wblock <index> <content>  raw write into a free block")?;
    writeln!(out, "  info <name>               metadata for an entry")?;
    writeln!(out, "  part                      reformat the volume")?;
    writeln!(out, "  help                      this list")?;
    writeln!(out, "  exit                      quit")
}

/// Run the command loop until `exit` or end of input. All filesystem
/// failures are reported and the loop continues; only IO failures on the
/// REPL's own streams are returned.
pub fn run<R: BufRead, W: Write>(vol: &mut Volume, input: R, out: &mut W) -> io::Result<()> {
    writeln!(out, "Simple FAT File System Simulator")?;
    writeln!(out, "Type 'help' for the list of commands.")?;

    let mut lines = input.lines();
    loop {
        write!(out, "Enter command: ")?;
        out.flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (cmd, rest) = split_first(line);

        match cmd {
            "touch" => {
                let (name, _) = split_first(rest);
                if name.is_empty() {
                    writeln!(out, "Usage: touch <name>")?;
                } else {
                    report(
                        out,
                        vol.create(name, b""),
                        &format!("File '{}' created successfully.", name),
                    )?;
                }
            }
            "ls" => {
                let listing = match vol.list() {
                    Ok(l) => l,
                    Err(e) => {
                        writeln!(out, "Error: {}", e)?;
                        continue;
                    }
                };
                if listing.directories.is_empty() {
                    writeln!(out, "No directories in the current directory.")?;
                } else {
                    writeln!(out, "Directories in current directory:")?;
                    for d in &listing.directories {
                        writeln!(out, "- {} (Directory)", d)?;
                    }
                }
                if listing.files.is_empty() {
                    writeln!(out, "No files in the directory.")?;
                } else {
                    writeln!(out, "Files in current directory:")?;
                    for (name, size) in &listing.files {
                        writeln!(out, "- {} (Size: {} bytes)", name, size)?;
                    }
                }
            }
            "rm" | "delete" => {
                let (name, _) = split_first(rest);
                report(
                    out,
                    vol.remove(name),
                    &format!("'{}' deleted successfully.", name),
                )?;
            }
            "write" => {
                let (name, content) = split_first(rest);
                report(
                    out,
                    vol.write(name, content.as_bytes()),
                    &format!("File '{}' updated successfully.", name),
                )?;
            }
            "apfile" => {
                let (name, content) = split_first(rest);
                report(
                    out,
                    vol.append(name, content.as_bytes()),
                    &format!("Appended to file '{}'.", name),
                )?;
            }
            "read" => {
                let (name, _) = split_first(rest);
                match vol.read(name) {
                    Ok(bytes) => {
                        out.write_all(&bytes)?;
                        writeln!(out)?;
                    }
                    Err(e) => writeln!(out, "Error: {}", e)?,
                }
            }
            "tcate" | "truncate" => {
                let (name, size) = split_first(rest);
                let (size, _) = split_first(size);
                match size.parse::<u64>() {
                    Ok(size) => report(
                        out,
                        vol.truncate(name, size),
                        &format!("File '{}' truncated successfully.", name),
                    )?,
                    Err(_) => writeln!(out, "Usage: truncate <name> <size>")?,
                }
            }
            "mkdir" => {
                let (name, _) = split_first(rest);
                report(
                    out,
                    vol.mkdir(name),
                    &format!("Directory '{}' created successfully.", name),
                )?;
            }
            "cd" => {
                let (name, _) = split_first(rest);
                if let Err(e) = vol.cd(name) {
                    writeln!(out, "Error: {}", e)?;
                }
            }
            "rname" => {
                let (old, rest) = split_first(rest);
                let (new, _) = split_first(rest);
                report(
                    out,
                    vol.rename(old, new),
                    &format!("Renamed '{}' to '{}'.", old, new),
                )?;
            }
            "move" => {
                let (name, rest) = split_first(rest);
                let (dir, _) = split_first(rest);
                report(
                    out,
                    vol.move_file(name, dir),
                    &format!("Moved '{}' into '{}'.", name, dir),
                )?;
            }
            "rblock" => {
                let (idx, _) = split_first(rest);
                match idx.parse::<u64>() {
                    Ok(idx) => match vol.read_block(idx) {
                        Ok(block) => {
                            let free = block.trailing_free_bytes() as usize;
                            let used = block.len() as usize - free;
                            writeln!(out, "Block {}:", idx)?;
                            writeln!(
                                out,
                                "{}",
                                String::from_utf8_lossy(&block.contents_as_ref()[..used])
                            )?;
                            writeln!(out, "({} free bytes)", free)?;
                        }
                        Err(e) => writeln!(out, "Error: {}", e)?,
                    },
                    Err(_) => writeln!(out, "Usage: rblock <index>")?,
                }
            }
            "wblock" => {
                let (idx, content) = split_first(rest);
                match idx.parse::<u64>() {
                    Ok(idx) => report(
                        out,
                        vol.write_block(idx, content.as_bytes()),
                        &format!("Block {} written.", idx),
                    )?,
                    Err(_) => writeln!(out, "Usage: wblock <index> <content>")?,
                }
            }
            "info" => {
                let (name, _) = split_first(rest);
                match vol.stat(name) {
                    Ok(EntryInfo::File {
                        name,
                        size,
                        start_block,
                        blocks,
                    }) => writeln!(
                        out,
                        "File '{}': {} bytes, start block {}, {} block(s)",
                        name, size, start_block, blocks
                    )?,
                    Ok(EntryInfo::Directory {
                        name,
                        files,
                        subdirectories,
                    }) => writeln!(
                        out,
                        "Directory '{}': {} file(s), {} subdirectories",
                        name, files, subdirectories
                    )?,
                    Err(e) => writeln!(out, "Error: {}", e)?,
                }
            }
            "part" => {
                report(out, vol.partition(), "Volume reformatted.")?;
            }
            "help" => print_help(out)?,
            "exit" => break,
            _ => writeln!(out, "Invalid command. Please try again.")?,
        }
    }
    Ok(())
}
