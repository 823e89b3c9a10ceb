use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::gf256::{self, FieldError};

/// Redraws allowed for a zero leading coefficient before falling back to 1
const MAX_LEADING_ATTEMPTS: usize = 50;

/// A polynomial over GF(2^8), lowest degree first.
///
/// `coefficients[0]` is the intercept, i.e. the secret byte. The
/// coefficients are wiped when the polynomial is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Polynomial {
    coefficients: Vec<u8>,
}

impl Polynomial {
    /// Random polynomial of exactly `degree` with the given intercept.
    ///
    /// Higher coefficients come from `rng`; the leading one is never zero.
    pub fn random<R: RngCore + ?Sized>(
        intercept: u8,
        degree: u8,
        rng: &mut R,
    ) -> Result<Self, rand::Error> {
        if degree == 0 {
            return Ok(Self { coefficients: vec![intercept] });
        }

        let mut coefficients = vec![0u8; degree as usize + 1];
        coefficients[0] = intercept;
        rng.try_fill_bytes(&mut coefficients[1..])?;

        let top = degree as usize;
        if coefficients[top] == 0 {
            let mut redraw = [0u8; 1];
            for _ in 0..MAX_LEADING_ATTEMPTS {
                rng.try_fill_bytes(&mut redraw)?;
                if redraw[0] != 0 {
                    coefficients[top] = redraw[0];
                    break;
                }
            }
            if coefficients[top] == 0 {
                coefficients[top] = 1;
            }
        }

        Ok(Self { coefficients })
    }

    pub fn from_coefficients(coefficients: Vec<u8>) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[u8] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluate at `x` with Horner's method.
    pub fn evaluate(&self, x: u8) -> u8 {
        let Some((&intercept, _)) = self.coefficients.split_first() else {
            return 0;
        };
        if x == 0 {
            return intercept;
        }

        let degree = self.degree();
        let mut y = self.coefficients[degree];
        for i in (0..degree).rev() {
            let coeff = self.coefficients[i];
            if coeff == 0 && i > 0 {
                y = gf256::multiply(y, x);
            } else {
                y = gf256::add(gf256::multiply(y, x), coeff);
            }
        }
        y
    }
}

/// Lagrange interpolation of the samples, evaluated at `x`.
///
/// Sample lists of different lengths are rejected. Repeated x samples
/// surface as a division by zero.
pub fn interpolate(x_samples: &[u8], y_samples: &[u8], x: u8) -> Result<u8, FieldError> {
    if x_samples.len() != y_samples.len() {
        return Err(FieldError::SampleLengthMismatch {
            xs: x_samples.len(),
            ys: y_samples.len(),
        });
    }
    if x_samples.is_empty() {
        return Ok(0);
    }

    if let Some(i) = x_samples.iter().position(|&xi| xi == x) {
        return Ok(y_samples[i]);
    }

    let count = x_samples.len();
    let mut denominators = Vec::with_capacity(count);
    for i in 0..count {
        let mut denominator = 1u8;
        for j in (0..count).filter(|&j| j != i) {
            denominator = gf256::multiply(denominator, gf256::add(x_samples[i], x_samples[j]));
        }
        denominators.push(denominator);
    }

    let mut result = 0u8;
    for i in 0..count {
        if y_samples[i] == 0 {
            continue;
        }
        let mut basis = 1u8;
        for j in (0..count).filter(|&j| j != i) {
            basis = gf256::multiply(basis, gf256::add(x, x_samples[j]));
        }
        let term = gf256::divide(basis, denominators[i])?;
        result = gf256::add(result, gf256::multiply(y_samples[i], term));
    }

    Ok(result)
}
