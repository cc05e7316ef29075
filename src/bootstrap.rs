use crate::config::Config;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// Table-generation program launched once the workspace is ready.
/// Resolved through `PATH` and invoked with no arguments; it reads its
/// own connection settings.
pub const GEN_TABLES_PROGRAM: &str = "gen_tables";

/// Create every output directory the pipeline writes into, missing
/// parents included. Safe to run repeatedly; returns the ensured
/// directories in creation order.
pub fn ensure_output_dirs(config: &Config) -> Result<Vec<PathBuf>> {
    let roots = config.output_roots();
    for dir in &roots {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create output directory {}", dir.display()))?;
    }
    Ok(roots)
}

/// Launch the table-generation program and wait for it to finish, with
/// its output going straight to this process's standard streams. Fails
/// if the program cannot be launched or exits non-zero.
pub fn run_gen_tables(program: &str) -> Result<()> {
    let status = Command::new(program)
        .status()
        .with_context(|| format!("cannot launch table generator `{program}`"))?;
    if !status.success() {
        bail!("table generator `{program}` failed: {status}");
    }
    Ok(())
}

/// One-shot workspace bootstrap: create the output directory tree, then
/// regenerate the MusicBrainz reference tables.
pub fn run(config: &Config, gen_tables: &str) -> Result<()> {
    println!("Preparing pipeline workspace");
    for dir in ensure_output_dirs(config)? {
        println!("  Ensured {}", dir.display());
    }

    println!("Generating MB tables with `{gen_tables}`");
    run_gen_tables(gen_tables)?;

    println!("Workspace ready.");
    Ok(())
}
