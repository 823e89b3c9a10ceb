use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sharrd_parts::config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sharrd")]
#[command(about = "Split secrets and files with Shamir's Secret Sharing", long_about = None)]
#[command(version)]
struct Cli {
    /// Path of the configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init,

    /// Split a file into part files, block by block
    Split {
        /// File to split
        input: PathBuf,

        /// Output prefix; part i is written to <prefix><i>of<n>.json
        #[arg(long, short)]
        prefix: String,

        /// Number of parts to create
        #[arg(long, short = 'n')]
        parts: Option<u8>,

        /// Number of parts required to recover the file
        #[arg(long, short)]
        threshold: Option<u8>,

        /// Overwrite part files that already have content
        #[arg(long)]
        truncate: bool,

        /// Report progress for every block
        #[arg(long, short)]
        verbose: bool,
    },

    /// Rebuild a file from part files
    Combine {
        /// Part files, at least as many as the threshold
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file; without it the parts are only verified
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it already has content
        #[arg(long)]
        truncate: bool,

        /// Report progress for every block
        #[arg(long, short)]
        verbose: bool,
    },

    /// Split a small secret (such as a cipher key) into key part files
    SplitKey {
        /// File holding the secret; standard input when omitted
        input: Option<PathBuf>,

        /// Output prefix; part i is written to <prefix><i>of<n>.json
        #[arg(long, short)]
        prefix: String,

        /// Number of parts to create
        #[arg(long, short = 'n')]
        parts: Option<u8>,

        /// Number of parts required to recover the secret
        #[arg(long, short)]
        threshold: Option<u8>,

        /// Overwrite key files that already have content
        #[arg(long)]
        truncate: bool,
    },

    /// Recover a secret from key part files
    CombineKey {
        /// Key part files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file; standard output when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it already has content
        #[arg(long)]
        truncate: bool,
    },
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Load config for all commands except init
    let config = match cli.command {
        Commands::Init => Config::default(),
        _ => Config::load(config_path).context("Failed to load configuration")?,
    };

    match cli.command {
        Commands::Init => commands::init(config_path)?,
        Commands::Split {
            input,
            prefix,
            parts,
            threshold,
            truncate,
            verbose,
        } => commands::split(&config, &input, &prefix, parts, threshold, truncate, verbose)?,
        Commands::Combine {
            inputs,
            output,
            truncate,
            verbose,
        } => commands::combine(&config, &inputs, output.as_deref(), truncate, verbose)?,
        Commands::SplitKey {
            input,
            prefix,
            parts,
            threshold,
            truncate,
        } => commands::split_key(&config, input.as_deref(), &prefix, parts, threshold, truncate)?,
        Commands::CombineKey {
            inputs,
            output,
            truncate,
        } => commands::combine_key(&inputs, output.as_deref(), truncate)?,
    }

    Ok(())
}
