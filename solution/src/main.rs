//! Entry point of the `fatsim` binary: open (or create) the image named
//! by the first argument, then hand control to the command loop.

use anyhow::Context;
use fatsim_api::fs::VolumeSupport;
use fatsim_api::types::DISK_FILE;
use fatsim_sol::repl;
use fatsim_sol::volume::Volume;
use std::env;
use std::io;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| DISK_FILE.to_string());
    let mut vol =
        Volume::open(&path).with_context(|| format!("cannot open the volume image at '{}'", path))?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    repl::run(&mut vol, stdin.lock(), &mut stdout.lock())?;
    Ok(())
}
