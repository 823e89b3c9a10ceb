use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroize;

use crate::shamir::{self, ShamirError, Share};
use crate::storage;

/// URL-safe base64, unpadded on write, padding optional on read
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum PartError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: malformed part record: {source}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("not a valid key part: {}", path.display())]
    InvalidKeyPart {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode part record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("part {part}: invalid payload encoding: {source}")]
    Payload {
        part: u8,
        #[source]
        source: base64::DecodeError,
    },
    #[error("secret digest mismatch in {location}: expected {expected}, found {actual}")]
    PartDigestMismatch {
        location: String,
        expected: String,
        actual: String,
    },
    #[error("secret digest mismatch in block {block}: expected {expected}, recovered {actual}")]
    SecretDigestMismatch {
        block: u64,
        expected: String,
        actual: String,
    },
    #[error("need {need} input files, got {have}")]
    NotEnoughParts { need: u8, have: usize },
    #[error("block mismatch in {}: expected block {expected}, found {found}", path.display())]
    BlockMismatch {
        path: PathBuf,
        expected: u64,
        found: u64,
    },
    #[error("{field} mismatch in {}: expected {expected}, found {found}", path.display())]
    ParameterMismatch {
        path: PathBuf,
        field: &'static str,
        expected: u64,
        found: u64,
    },
    #[error("parts describe {expected} blocks but {recovered} were found")]
    BlockCountMismatch { expected: u64, recovered: u64 },
    #[error("{} ran out of parts before block {block} while other files continue", path.display())]
    PartFileLengthMismatch { path: PathBuf, block: u64 },
    #[error("output file is not empty: {}", .0.display())]
    OutputNotEmpty(PathBuf),
    #[error("no input files")]
    NoInput,
    #[error("input files contain no parts")]
    NoBlocks,
    #[error("block size must be greater than 0")]
    InvalidBlockSize,
    #[error("a part writer panicked")]
    WriterPanicked,
    #[error(transparent)]
    Shamir(#[from] ShamirError),
}

impl PartError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PartError::Io {
            path: path.into(),
            source,
        }
    }
}

/// One share of one block, together with the scheme parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Total number of shares
    pub parts: u8,
    /// 1-based index of this share
    pub part: u8,
    pub threshold: u8,
    /// 1-based block index
    #[serde(default)]
    pub block: u64,
    #[serde(default)]
    pub blocks: u64,
    /// Digest of the plaintext block this share belongs to
    pub digest: String,
    /// Base64 (URL-safe) share bytes
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

/// BLAKE3 of `data` as lowercase hex; both ends of a split must agree on it.
pub fn compute_digest(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

impl Part {
    pub fn new(share: &Share, parts: u8, part: u8, threshold: u8, digest: &str) -> Self {
        Self {
            parts,
            part,
            threshold,
            block: 1,
            blocks: 1,
            digest: digest.to_string(),
            payload: PAYLOAD_ENGINE.encode(share.as_bytes()),
            timestamp: Utc::now(),
        }
    }

    /// Split a whole secret into key parts (a single block).
    pub fn split_secret(secret: &[u8], parts: u8, threshold: u8) -> Result<Vec<Part>, PartError> {
        Self::split_block(secret, parts, threshold, 1, 1)
    }

    /// Split one block of a larger secret.
    pub fn split_block(
        secret: &[u8],
        parts: u8,
        threshold: u8,
        block: u64,
        blocks: u64,
    ) -> Result<Vec<Part>, PartError> {
        let shares = shamir::split(secret, parts, threshold)?;
        let digest = compute_digest(secret);

        let records = shares
            .iter()
            .zip(1..=parts)
            .map(|(share, part)| Part {
                block,
                blocks,
                ..Part::new(share, parts, part, threshold, &digest)
            })
            .collect();

        Ok(records)
    }

    /// Decode the share carried in the payload.
    pub fn share(&self) -> Result<Share, PartError> {
        PAYLOAD_ENGINE
            .decode(&self.payload)
            .map(Share::from)
            .map_err(|source| PartError::Payload {
                part: self.part,
                source,
            })
    }

    /// Recover the secret from parts of one block and verify its digest.
    pub fn combine(parts: &[Part]) -> Result<Vec<u8>, PartError> {
        let Some(first) = parts.first() else {
            return Err(ShamirError::NotEnoughShares.into());
        };
        for part in parts {
            if part.digest != first.digest {
                return Err(PartError::PartDigestMismatch {
                    location: format!("part {}", part.part),
                    expected: first.digest.clone(),
                    actual: part.digest.clone(),
                });
            }
        }

        let shares = parts.iter().map(Part::share).collect::<Result<Vec<_>, _>>()?;
        let mut secret = shamir::combine(&shares)?;

        let actual = compute_digest(&secret);
        if actual != first.digest {
            secret.zeroize();
            return Err(PartError::SecretDigestMismatch {
                block: first.block,
                expected: first.digest.clone(),
                actual,
            });
        }

        Ok(secret)
    }

    /// Single-line JSON, as stored in part files.
    pub fn to_record(&self) -> Result<String, PartError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_record(line: &str) -> Result<Part, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Write each key part to `{prefix}{part}of{parts}.json` as a JSON document.
pub fn write_key_files(parts: &[Part], prefix: &str, truncate: bool) -> Result<Vec<PathBuf>, PartError> {
    let mut written = Vec::with_capacity(parts.len());
    for part in parts {
        let path = storage::part_file_path(prefix, part.part, part.parts);
        let mut document = serde_json::to_string_pretty(part)?;
        document.push('\n');

        let mut file = storage::open_output_file(&path, truncate)?;
        file.write_all(document.as_bytes())
            .map_err(|e| PartError::io(&path, e))?;
        debug!(path = %path.display(), "wrote key part");
        written.push(path);
    }
    Ok(written)
}

/// Read one key part from each file.
pub fn read_key_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Part>, PartError> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let mut content = String::new();
            storage::open_input_file(path)?
                .read_to_string(&mut content)
                .map_err(|e| PartError::io(path, e))?;
            serde_json::from_str(&content).map_err(|source| PartError::InvalidKeyPart {
                path: path.to_path_buf(),
                source,
            })
        })
        .collect()
}
