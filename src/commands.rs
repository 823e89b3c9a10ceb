use anyhow::{anyhow, Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use sharrd_parts::config::Config;
use sharrd_parts::part::{self, Part};
use sharrd_parts::splitter::BlockProgress;
use sharrd_parts::{combiner, splitter, storage};

/// Execute the init command
pub fn init(config_path: Option<&Path>) -> Result<()> {
    let path = Config::default().save(config_path)?;
    println!("{} {}", style("Configuration written to").green(), path.display());
    Ok(())
}

/// Execute the split command
pub fn split(
    config: &Config,
    input: &Path,
    prefix: &str,
    parts: Option<u8>,
    threshold: Option<u8>,
    truncate: bool,
    verbose: bool,
) -> Result<()> {
    let parts = parts.unwrap_or(config.default_parts);
    let threshold = threshold.unwrap_or(config.default_threshold);
    let opts = config.file_options(truncate, verbose);

    let pb = block_progress_bar(verbose);
    let summary = splitter::split_file_into_parts(input, parts, threshold, prefix, &opts, &mut |p| {
        advance(&pb, p)
    })
    .with_context(|| format!("Failed to split {}", input.display()))?;
    pb.finish_and_clear();

    println!(
        "{} {} into {} parts ({} required), {} blocks",
        style("Split").green().bold(),
        input.display(),
        parts,
        threshold,
        summary.blocks
    );
    print_files(&summary.files);
    Ok(())
}

/// Execute the combine command
pub fn combine(
    config: &Config,
    inputs: &[PathBuf],
    output: Option<&Path>,
    truncate: bool,
    verbose: bool,
) -> Result<()> {
    let opts = config.file_options(truncate, verbose);

    let pb = block_progress_bar(verbose);
    let summary = combiner::combine_parts_into_file(inputs, output, &opts, &mut |p| advance(&pb, p))
        .context("Failed to combine part files")?;
    pb.finish_and_clear();

    match output {
        Some(path) => println!(
            "{} {} bytes in {} blocks into {}",
            style("Recovered").green().bold(),
            summary.bytes,
            summary.blocks,
            path.display()
        ),
        None => println!(
            "{} {} blocks ({} bytes)",
            style("Verified").green().bold(),
            summary.blocks,
            summary.bytes
        ),
    }
    Ok(())
}

/// Execute the split-key command
pub fn split_key(
    config: &Config,
    input: Option<&Path>,
    prefix: &str,
    parts: Option<u8>,
    threshold: Option<u8>,
    truncate: bool,
) -> Result<()> {
    let parts = parts.unwrap_or(config.default_parts);
    let threshold = threshold.unwrap_or(config.default_threshold);

    let mut secret = Zeroizing::new(Vec::new());
    match input {
        Some(path) => {
            storage::open_input_file(path)?
                .read_to_end(&mut secret)
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        None => {
            io::stdin()
                .read_to_end(&mut secret)
                .context("Failed to read secret from standard input")?;
        }
    }

    let key_parts = Part::split_secret(&secret, parts, threshold).context("Failed to split secret")?;
    let files = part::write_key_files(&key_parts, prefix, truncate)?;

    println!(
        "{} secret into {} key parts ({} required)",
        style("Split").green().bold(),
        parts,
        threshold
    );
    print_files(&files);
    Ok(())
}

/// Execute the combine-key command
pub fn combine_key(inputs: &[PathBuf], output: Option<&Path>, truncate: bool) -> Result<()> {
    let key_parts = part::read_key_files(inputs)?;
    let need = key_parts.first().map(|p| p.threshold).unwrap_or(2);
    if key_parts.len() < need as usize {
        return Err(anyhow!(
            "Not enough key parts provided. Need at least {}, got {}",
            need,
            key_parts.len()
        ));
    }

    let secret = Zeroizing::new(Part::combine(&key_parts).context("Failed to recover secret")?);

    match output {
        Some(path) => {
            let mut file = storage::open_output_file(path, truncate)?;
            file.write_all(&secret)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {} bytes into {}", style("Recovered").green().bold(), secret.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&secret).context("Failed to write secret")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn block_progress_bar(verbose: bool) -> ProgressBar {
    if !verbose {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(progress_style) =
        ProgressStyle::with_template("{bar:40.green/dim} {pos}/{len} blocks {msg}")
    {
        pb.set_style(progress_style);
    }
    pb
}

fn advance(pb: &ProgressBar, progress: &BlockProgress) {
    pb.set_length(progress.blocks);
    pb.set_position(progress.block);
    pb.set_message(format!("({} bytes)", progress.bytes));
}

fn print_files(files: &[PathBuf]) {
    println!("{}", style("─".repeat(50)).dim());
    for file in files {
        println!("  {}", file.display());
    }
    println!("{}", style("─".repeat(50)).dim());
}
