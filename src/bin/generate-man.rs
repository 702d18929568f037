// Render the advfilter man page to stdout, or to the file given as the
// first argument

use advfilter::cli::Cli;
use anyhow::{Context, Result};
use clap::CommandFactory;
use std::io::Write;

fn main() -> Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    let mut buffer: Vec<u8> = Vec::new();
    man.render(&mut buffer).context("Failed to render man page")?;

    match std::env::args().nth(1) {
        Some(path) => std::fs::write(&path, &buffer).with_context(|| format!("Failed to write {}", path))?,
        None => std::io::stdout().write_all(&buffer).context("Failed to write man page")?,
    }
    Ok(())
}
