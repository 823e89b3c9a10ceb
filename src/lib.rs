//! # Shamir's Secret Sharing for secrets and files
//!
//! A secret is split byte by byte: every byte becomes the intercept of a
//! random polynomial of degree `threshold - 1` over GF(2^8), and each share
//! holds that polynomial evaluated at the share's own non-zero x-coordinate.
//! Any `threshold` shares recover the secret with Lagrange interpolation at
//! x = 0; fewer reveal nothing about it.
//!
//! Large inputs are handled block by block. Every block is split on its own
//! and each share is wrapped in a [`part::Part`] record carrying the scheme
//! parameters and a digest of the plaintext block. Share `i` of every block
//! is appended to the part file for index `i`, so a file split 3-of-5 turns
//! into five part files, any three of which rebuild it.
//!
//! ```no_run
//! use sharrd_parts::config::FileOptions;
//! use sharrd_parts::{combiner, splitter};
//! use std::path::Path;
//!
//! let opts = FileOptions::default();
//! let summary = splitter::split_file_into_parts(
//!     Path::new("backup.tar"), 5, 3, "backup-", &opts, &mut |_| {},
//! )?;
//! combiner::combine_parts_into_file(
//!     &summary.files[..3], Some(Path::new("restored.tar")), &opts, &mut |_| {},
//! )?;
//! # Ok::<(), sharrd_parts::part::PartError>(())
//! ```

/// Block-wise reconstruction of files from part files.
pub mod combiner;

/// Configuration file and the options shared by splitter and combiner.
pub mod config;

/// The persisted share record, key-part files and digests.
pub mod part;

/// GF(2^8) arithmetic, polynomials and the share codec.
pub mod shamir;

/// Block-wise splitting of files into part files.
pub mod splitter;

/// File handles: input/output opening and the output registry.
pub mod storage;

pub use part::{Part, PartError};
pub use shamir::{combine, split, ShamirError, Share};
