use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mlhd_prep::config::Config;
use mlhd_prep::{bootstrap, paths};
use std::path::PathBuf;

/// Prepare the MLHD+ cleanup workspace and generate the MB tables.
#[derive(Parser, Debug)]
#[command(name = "mlhd-prep", version)]
struct Args {
    /// Configuration file (default: ./mlhd.toml when present).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Table-generation program to launch once the workspace is ready.
    #[arg(long, value_name = "PROGRAM", default_value = bootstrap::GEN_TABLES_PROGRAM)]
    gen_tables: String,

    /// Validate and print the configuration without touching anything.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    if args.dry_run {
        return report(&config);
    }

    bootstrap::run(&config, &args.gen_tables)
}

/// Print the resolved configuration and, when a raw dump is configured,
/// count the listen archives under it. Read-only.
fn report(config: &Config) -> Result<()> {
    match &config.mlhd_root {
        Some(root) => println!("MLHD root:     {}", root.display()),
        None => println!("MLHD root:     (unset)"),
    }
    println!("MB tables:     {}", config.mb_root.display());
    println!("Samples:       {}", config.sample_root.display());
    println!("Run logs:      {}", config.log_write_root.display());
    println!("HTML reports:  {}", config.html_root.display());
    println!("Mapper output: {}", config.mapper_output_root.display());
    match &config.write_root {
        Some(root) => println!("Cleaned files: {}", root.display()),
        None => println!("Cleaned files: (unset)"),
    }
    println!("Log epoch:     every {} files", config.log_epoch);
    println!("MB database:   {}", config.db.connection_url());

    if let Some(root) = &config.mlhd_root {
        let pb = scan_progress();
        let files = paths::collect_listen_files_with(root, |count| pb.set_position(count))?;
        pb.finish_and_clear();
        println!("Raw archives:  {} under {}", files.len(), root.display());
    }

    println!("Configuration is valid.");
    Ok(())
}

fn scan_progress() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("Scanning raw dump {spinner} {pos} files")
            .unwrap(),
    );
    pb
}
