use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::FileOptions;
use crate::part::{Part, PartError};
use crate::shamir::ShamirError;
use crate::storage::{self, OutputRegistry};

/// Progress of a block-wise split or combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockProgress {
    /// 1-based block just finished
    pub block: u64,
    pub blocks: u64,
    /// Plaintext bytes in this block
    pub bytes: usize,
}

/// Outcome of a block-wise split or combine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub blocks: u64,
    /// Plaintext bytes processed
    pub bytes: u64,
    /// Files written, if any
    pub files: Vec<PathBuf>,
}

/// Split the file at `input` into `parts` part files under `output_prefix`.
///
/// Share `i` of every block is appended to `{output_prefix}{i}of{parts}.json`.
/// The shares of one block are written concurrently; the next block starts
/// only once all of them are on disk. `on_block` is called after each block
/// when `opts.verbose` is set.
pub fn split_file_into_parts(
    input: &Path,
    parts: u8,
    threshold: u8,
    output_prefix: &str,
    opts: &FileOptions,
    on_block: &mut dyn FnMut(&BlockProgress),
) -> Result<TransferSummary, PartError> {
    if opts.block_size == 0 {
        return Err(PartError::InvalidBlockSize);
    }

    let file = storage::open_input_file(input)?;
    let size = file.metadata().map_err(|e| PartError::io(input, e))?.len();
    if size == 0 {
        return Err(ShamirError::EmptySecret.into());
    }
    let blocks = size.div_ceil(opts.block_size as u64);
    info!(input = %input.display(), size, blocks, parts, threshold, "splitting file");

    let paths: Vec<PathBuf> = (1..=parts)
        .map(|part| storage::part_file_path(output_prefix, part, parts))
        .collect();
    let registry = OutputRegistry::new(opts.truncate);

    let mut reader = BufReader::new(file);
    let mut buffer = Zeroizing::new(vec![0u8; opts.block_size]);
    let mut total = 0u64;

    for block in 1..=blocks {
        let read = read_block(&mut reader, &mut buffer).map_err(|e| PartError::io(input, e))?;
        if read == 0 {
            return Err(PartError::io(
                input,
                std::io::Error::new(ErrorKind::UnexpectedEof, format!("input ended before block {block}")),
            ));
        }

        let records = Part::split_block(&buffer[..read], parts, threshold, block, blocks)?;
        let lines = records
            .iter()
            .map(|record| -> Result<String, PartError> {
                let mut line = String::new();
                if block > 1 {
                    line.push_str(opts.separator.as_str());
                }
                line.push_str(&record.to_record()?);
                Ok(line)
            })
            .collect::<Result<Vec<_>, _>>()?;

        write_block(&registry, &paths, lines)?;
        total += read as u64;
        debug!(block, blocks, bytes = read, "block written");

        if opts.verbose {
            on_block(&BlockProgress {
                block,
                blocks,
                bytes: read,
            });
        }
    }

    debug!(files = registry.len(), "closing part files");
    registry.close_all()?;

    Ok(TransferSummary {
        blocks,
        bytes: total,
        files: paths,
    })
}

/// Fill `buffer` as far as the input allows; short only at end of input.
fn read_block<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Append one record to each part file, one writer thread per file.
///
/// Writers are not cancelled when a sibling fails: every thread finishes,
/// all errors are collected and the first one is returned.
fn write_block(registry: &OutputRegistry, paths: &[PathBuf], lines: Vec<String>) -> Result<(), PartError> {
    let results: Vec<Result<(), PartError>> = thread::scope(|scope| {
        let writers: Vec<_> = paths
            .iter()
            .zip(lines)
            .map(|(path, line)| scope.spawn(move || append_record(registry, path, &line)))
            .collect();

        writers
            .into_iter()
            .map(|writer| writer.join().unwrap_or(Err(PartError::WriterPanicked)))
            .collect()
    });

    let mut errors = results.into_iter().filter_map(Result::err);
    match errors.next() {
        Some(first) => {
            for other in errors {
                warn!(error = %other, "additional part writer failure");
            }
            Err(first)
        }
        None => Ok(()),
    }
}

fn append_record(registry: &OutputRegistry, path: &Path, line: &str) -> Result<(), PartError> {
    use std::io::Write;

    let file = registry.open(path)?;
    // One write_all per record so a failing sibling never leaves half a line
    (&*file)
        .write_all(line.as_bytes())
        .map_err(|e| PartError::io(path, e))
}
