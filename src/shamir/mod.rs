pub mod gf256;
pub mod polynomial;

use std::collections::HashSet;

use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::debug;

pub use gf256::FieldError;
use polynomial::{interpolate, Polynomial};

#[derive(Debug, Error)]
pub enum ShamirError {
    #[error("threshold must be at least 2")]
    ThresholdTooSmall,
    #[error("threshold cannot be greater than parts")]
    ThresholdExceedsParts,
    #[error("secret is empty")]
    EmptySecret,
    #[error("length of shares must be at least 2")]
    NotEnoughShares,
    #[error("length of first share must be at least 2")]
    FirstShareTooShort,
    #[error("length of shares[{index}] must be {expected}")]
    InconsistentShareLength { index: usize, expected: usize },
    #[error("duplicated share is disallowed")]
    DuplicateShares,
    #[error("share x-coordinate cannot be zero")]
    ZeroShareIdentifier,
    #[error("randomness source failed: {0}")]
    Randomness(#[from] rand::Error),
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// One share of a secret: the payload bytes followed by the x-coordinate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share(Vec<u8>);

impl Share {
    /// Evaluation point, the trailing byte
    pub fn x(&self) -> u8 {
        self.0.last().copied().unwrap_or(0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Share {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Share {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Split a secret into `parts` shares, any `threshold` of which recover it.
///
/// Randomness comes from a ChaCha20 stream seeded by the operating system.
pub fn split(secret: &[u8], parts: u8, threshold: u8) -> Result<Vec<Share>, ShamirError> {
    validate(secret, parts, threshold)?;
    let mut rng = ChaCha20Rng::from_rng(OsRng)?;
    split_with_rng(secret, parts, threshold, &mut rng)
}

/// Same as [`split`] with a caller-provided random source.
pub fn split_with_rng<R: RngCore + ?Sized>(
    secret: &[u8],
    parts: u8,
    threshold: u8,
    rng: &mut R,
) -> Result<Vec<Share>, ShamirError> {
    validate(secret, parts, threshold)?;

    let x_coords = unique_x_coordinates(parts, rng)?;
    let secret_len = secret.len();

    let mut shares: Vec<Vec<u8>> = x_coords
        .iter()
        .map(|&x| {
            let mut share = vec![0u8; secret_len + 1];
            share[secret_len] = x;
            share
        })
        .collect();

    let degree = threshold - 1;
    for (j, &intercept) in secret.iter().enumerate() {
        let poly = Polynomial::random(intercept, degree, rng)?;
        for (share, &x) in shares.iter_mut().zip(&x_coords) {
            share[j] = poly.evaluate(x);
        }
    }

    Ok(shares.into_iter().map(Share).collect())
}

/// Combine shares to recover the original secret.
///
/// No integrity check happens here; with fewer shares than the threshold
/// the result is simply some other byte string.
pub fn combine<S: AsRef<[u8]>>(shares: &[S]) -> Result<Vec<u8>, ShamirError> {
    if shares.len() < 2 {
        return Err(ShamirError::NotEnoughShares);
    }

    let share_len = shares[0].as_ref().len();
    if share_len < 2 {
        return Err(ShamirError::FirstShareTooShort);
    }
    for (index, share) in shares.iter().enumerate().skip(1) {
        if share.as_ref().len() != share_len {
            return Err(ShamirError::InconsistentShareLength {
                index,
                expected: share_len,
            });
        }
    }

    let x_samples: Vec<u8> = shares.iter().map(|s| s.as_ref()[share_len - 1]).collect();
    let mut seen = HashSet::with_capacity(x_samples.len());
    for &x in &x_samples {
        if x == 0 {
            return Err(ShamirError::ZeroShareIdentifier);
        }
        if !seen.insert(x) {
            return Err(ShamirError::DuplicateShares);
        }
    }

    let mut secret = Vec::with_capacity(share_len - 1);
    let mut y_samples = vec![0u8; shares.len()];
    for idx in 0..share_len - 1 {
        for (y, share) in y_samples.iter_mut().zip(shares) {
            *y = share.as_ref()[idx];
        }
        secret.push(interpolate(&x_samples, &y_samples, 0)?);
    }

    Ok(secret)
}

fn validate(secret: &[u8], parts: u8, threshold: u8) -> Result<(), ShamirError> {
    if threshold < 2 {
        return Err(ShamirError::ThresholdTooSmall);
    }
    if threshold > parts {
        return Err(ShamirError::ThresholdExceedsParts);
    }
    if secret.is_empty() {
        return Err(ShamirError::EmptySecret);
    }
    Ok(())
}

/// Distinct, non-zero evaluation points; zero is where the secret lives.
fn unique_x_coordinates<R: RngCore + ?Sized>(count: u8, rng: &mut R) -> Result<Vec<u8>, ShamirError> {
    let mut x_coords = vec![0u8; count as usize];
    rng.try_fill_bytes(&mut x_coords)?;

    let mut used = HashSet::with_capacity(count as usize);
    let mut redraws = 0usize;
    let mut buf = [0u8; 1];
    for x in x_coords.iter_mut() {
        while *x == 0 || used.contains(x) {
            rng.try_fill_bytes(&mut buf)?;
            *x = buf[0];
            redraws += 1;
        }
        used.insert(*x);
    }
    debug!(count, redraws, "generated share x-coordinates");

    Ok(x_coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(shares: &[Share], indices: &[usize]) -> Vec<Share> {
        indices.iter().map(|&i| shares[i].clone()).collect()
    }

    #[test]
    fn test_split_and_combine() {
        let secret = b"Secret seed phrase for testing";

        // Split into 5 shares, require 3 to reconstruct
        let shares = split(secret, 5, 3).unwrap();
        assert_eq!(shares.len(), 5);

        for share in &shares {
            assert_eq!(share.len(), secret.len() + 1);
            assert_ne!(share.x(), 0);
        }

        let recovered = combine(&shares).unwrap();
        assert_eq!(recovered, secret);

        for subset in [[0, 2, 4], [1, 2, 3], [4, 0, 1], [3, 4, 2]] {
            let recovered_partial = combine(&pick(&shares, &subset)).unwrap();
            assert_eq!(recovered_partial, secret);
        }
    }

    #[test]
    fn test_hello_scenario() {
        let secret = b"hello";
        let shares = split(secret, 5, 3).unwrap();
        assert_eq!(shares.len(), 5);
        assert!(shares.iter().all(|s| s.len() == 6));
        assert_eq!(combine(&pick(&shares, &[0, 1, 2])).unwrap(), secret);
        assert_eq!(combine(&pick(&shares, &[2, 3, 4])).unwrap(), secret);
        assert_eq!(combine(&pick(&shares, &[0, 3, 4])).unwrap(), secret);

        let two = combine(&pick(&shares, &[1, 3])).unwrap();
        assert_eq!(two.len(), 5);
    }

    #[test]
    fn test_x_coordinates_are_unique() {
        let shares = split(b"x", 255, 2).unwrap();
        let xs: HashSet<u8> = shares.iter().map(Share::x).collect();
        assert_eq!(xs.len(), 255);
        assert!(!xs.contains(&0));
    }

    #[test]
    fn test_round_trip_parameter_grid() {
        let mut rng = ChaCha20Rng::from_seed([3u8; 32]);
        let secret: Vec<u8> = (0..=255u8).collect();
        for (parts, threshold) in [(2u8, 2u8), (3, 2), (10, 7), (20, 20), (255, 3)] {
            let shares = split_with_rng(&secret, parts, threshold, &mut rng).unwrap();
            let n = parts as usize;
            let t = threshold as usize;
            let heads: Vec<usize> = (0..t).collect();
            let tails: Vec<usize> = (n - t..n).collect();
            let strided: Vec<usize> = (0..t).map(|i| (i * n) / t).collect();
            for subset in [heads, tails, strided] {
                assert_eq!(combine(&pick(&shares, &subset)).unwrap(), secret);
            }
        }
    }

    #[test]
    fn test_deterministic_generation() {
        let secret = b"Deterministic test";

        let shares1 = split_with_rng(secret, 3, 2, &mut ChaCha20Rng::from_seed([42u8; 32])).unwrap();
        let shares2 = split_with_rng(secret, 3, 2, &mut ChaCha20Rng::from_seed([42u8; 32])).unwrap();

        assert_eq!(shares1, shares2);
    }

    #[test]
    fn test_invalid_parameters() {
        let secret = b"Test secret";

        assert!(matches!(split(secret, 3, 1), Err(ShamirError::ThresholdTooSmall)));
        assert!(matches!(split(secret, 3, 4), Err(ShamirError::ThresholdExceedsParts)));
        assert!(matches!(split(&[], 3, 2), Err(ShamirError::EmptySecret)));
    }

    #[test]
    fn test_invalid_shares() {
        let shares = split(b"abc", 3, 2).unwrap();

        assert!(matches!(combine(&shares[..1]), Err(ShamirError::NotEnoughShares)));

        let short = vec![Share::from(vec![1u8]), Share::from(vec![2u8])];
        assert!(matches!(combine(&short), Err(ShamirError::FirstShareTooShort)));

        let mut uneven = pick(&shares, &[0, 1]);
        uneven[1] = Share::from(vec![1, 2, 3]);
        assert!(matches!(
            combine(&uneven),
            Err(ShamirError::InconsistentShareLength { index: 1, expected: 4 })
        ));

        let duplicated = pick(&shares, &[0, 0]);
        assert!(matches!(combine(&duplicated), Err(ShamirError::DuplicateShares)));

        let zero_x = vec![vec![1u8, 2, 0], vec![3u8, 4, 7]];
        assert!(matches!(combine(&zero_x), Err(ShamirError::ZeroShareIdentifier)));
    }

    #[test]
    fn test_insufficient_shares() {
        let secret = b"Need more shares";

        // The math produces some other value rather than an error
        let mut matches = 0;
        for _ in 0..20 {
            let shares = split(secret, 5, 3).unwrap();
            let recovered = combine(&pick(&shares, &[0, 1])).unwrap();
            assert_eq!(recovered.len(), secret.len());
            if recovered == secret {
                matches += 1;
            }
        }
        assert_eq!(matches, 0);
    }
}
