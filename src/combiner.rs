use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::FileOptions;
use crate::part::{Part, PartError};
use crate::splitter::{BlockProgress, TransferSummary};
use crate::storage;

/// Line reader over one part file, skipping blank separator lines
struct PartReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl PartReader {
    fn open(path: &Path) -> Result<Self, PartError> {
        let file = storage::open_input_file(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    /// Next record with its 1-based line number, `None` at end of file
    fn next_record(&mut self) -> Result<Option<(usize, String)>, PartError> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line.map_err(|e| PartError::io(&self.path, e))?;
            if !line.trim().is_empty() {
                return Ok(Some((self.line_no, line)));
            }
        }
        Ok(None)
    }
}

/// Rebuild a file from part files written by the block splitter.
///
/// The inputs are read in lock-step, one block per step. Each block is
/// checked (digest agreement, threshold, block order), reconstructed and
/// verified against its digest before it is appended to `output`. With no
/// `output` the parts are only verified.
pub fn combine_parts_into_file<P: AsRef<Path>>(
    inputs: &[P],
    output: Option<&Path>,
    opts: &FileOptions,
    on_block: &mut dyn FnMut(&BlockProgress),
) -> Result<TransferSummary, PartError> {
    if inputs.is_empty() {
        return Err(PartError::NoInput);
    }

    let mut readers = inputs
        .iter()
        .map(|path| PartReader::open(path.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let mut output_file: Option<File> = None;
    let mut count = 0u64;
    let mut total = 0u64;
    let mut blocks: Option<u64> = None;

    loop {
        let mut records = Vec::with_capacity(readers.len());
        for reader in readers.iter_mut() {
            records.push(reader.next_record()?);
        }

        if records.iter().all(Option::is_none) {
            break;
        }
        if let Some(short) = records.iter().position(Option::is_none) {
            return Err(PartError::PartFileLengthMismatch {
                path: readers[short].path.clone(),
                block: count + 1,
            });
        }

        let parts = records
            .into_iter()
            .flatten()
            .zip(&readers)
            .map(|((line, record), reader)| {
                Part::from_record(&record).map_err(|source| PartError::Malformed {
                    path: reader.path.clone(),
                    line,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total_blocks = verify_step(&parts, &readers, count + 1, blocks)?;
        if blocks.is_none() {
            info!(blocks = total_blocks, inputs = inputs.len(), "combining part files");
            blocks = Some(total_blocks);
        }

        let secret = Zeroizing::new(Part::combine(&parts)?);

        if let Some(path) = output {
            if output_file.is_none() {
                output_file = Some(storage::open_output_file(path, opts.truncate)?);
            }
            if let Some(file) = output_file.as_mut() {
                file.write_all(&secret).map_err(|e| PartError::io(path, e))?;
            }
        }

        count += 1;
        total += secret.len() as u64;
        debug!(block = count, blocks = total_blocks, bytes = secret.len(), "block recovered");

        if opts.verbose {
            on_block(&BlockProgress {
                block: count,
                blocks: total_blocks,
                bytes: secret.len(),
            });
        }
    }

    let Some(blocks) = blocks else {
        return Err(PartError::NoBlocks);
    };
    if let (Some(path), Some(file)) = (output, output_file.as_ref()) {
        file.sync_all().map_err(|e| PartError::io(path, e))?;
    }
    if count != blocks {
        return Err(PartError::BlockCountMismatch {
            expected: blocks,
            recovered: count,
        });
    }

    Ok(TransferSummary {
        blocks: count,
        bytes: total,
        files: output.map(Path::to_path_buf).into_iter().collect(),
    })
}

/// Consistency checks on one step, before any reconstruction.
///
/// Returns the block total the step agrees on; every step of a file must
/// carry the same total as the first one.
fn verify_step(
    parts: &[Part],
    readers: &[PartReader],
    expected_block: u64,
    expected_blocks: Option<u64>,
) -> Result<u64, PartError> {
    let first = &parts[0];
    for (part, reader) in parts.iter().zip(readers) {
        if part.digest != first.digest {
            return Err(PartError::PartDigestMismatch {
                location: reader.path.display().to_string(),
                expected: first.digest.clone(),
                actual: part.digest.clone(),
            });
        }
    }

    let blocks = expected_blocks.unwrap_or(first.blocks);
    for (part, reader) in parts.iter().zip(readers) {
        let fields = [
            ("parts", first.parts as u64, part.parts as u64),
            ("threshold", first.threshold as u64, part.threshold as u64),
            ("blocks", blocks, part.blocks),
        ];
        if let Some(&(field, expected, found)) = fields.iter().find(|(_, e, f)| e != f) {
            return Err(PartError::ParameterMismatch {
                path: reader.path.clone(),
                field,
                expected,
                found,
            });
        }
    }

    if parts.len() < first.threshold as usize {
        return Err(PartError::NotEnoughParts {
            need: first.threshold,
            have: parts.len(),
        });
    }

    for (part, reader) in parts.iter().zip(readers) {
        if part.block != expected_block {
            return Err(PartError::BlockMismatch {
                path: reader.path.clone(),
                expected: expected_block,
                found: part.block,
            });
        }
    }
    if expected_block > blocks {
        return Err(PartError::BlockCountMismatch {
            expected: blocks,
            recovered: expected_block,
        });
    }

    Ok(blocks)
}
