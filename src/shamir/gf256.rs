//! Arithmetic in GF(2^8) over bytes.
//!
//! Elements are plain `u8` values. Addition is XOR, multiplication is
//! carry-less multiplication reduced by x^8 + x^4 + x^3 + x + 1.

use lazy_static::lazy_static;
use thiserror::Error;

/// Low byte of the irreducible polynomial x^8 + x^4 + x^3 + x + 1 (0x11B)
pub const IRREDUCIBLE_POLYNOMIAL: u8 = 0x1B;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    #[error("cannot compute inverse of 0 in GF(2^8)")]
    ZeroInverse,
    #[error("division by zero in GF(2^8)")]
    DivisionByZero,
    #[error("sample lengths differ: {xs} x values, {ys} y values")]
    SampleLengthMismatch { xs: usize, ys: usize },
}

lazy_static! {
    static ref MULTIPLICATION_TABLE: Box<[[u8; 256]; 256]> = multiplication_table();
    static ref INVERSE_TABLE: [u8; 256] = inverse_table();
}

/// Force construction of the lookup tables.
///
/// Optional: the first arithmetic call builds them anyway.
pub fn init() {
    lazy_static::initialize(&MULTIPLICATION_TABLE);
    lazy_static::initialize(&INVERSE_TABLE);
}

#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

#[inline]
pub fn subtract(a: u8, b: u8) -> u8 {
    a ^ b
}

#[inline]
pub fn multiply(a: u8, b: u8) -> u8 {
    MULTIPLICATION_TABLE[a as usize][b as usize]
}

/// Multiplicative inverse, `a^254`.
pub fn inverse(a: u8) -> Result<u8, FieldError> {
    if a == 0 {
        return Err(FieldError::ZeroInverse);
    }
    Ok(INVERSE_TABLE[a as usize])
}

/// `a / b`, which is exactly 0 whenever `a` is 0.
///
/// The zero case is selected with a mask rather than a branch so the
/// timing does not depend on the dividend.
pub fn divide(a: u8, b: u8) -> Result<u8, FieldError> {
    if b == 0 {
        return Err(FieldError::DivisionByZero);
    }
    let quotient = multiply(a, INVERSE_TABLE[b as usize]);
    // 0xFF when a == 0, 0x00 otherwise
    let zero_mask = ((a as u16).wrapping_sub(1) >> 8) as u8;
    Ok(quotient & !zero_mask)
}

/// Shift-and-add multiplication, used to build the lookup table.
pub fn multiply_slow(a: u8, b: u8) -> u8 {
    let mut product = 0u8;
    let mut temp = b;
    for i in 0..8 {
        if a & (1 << i) != 0 {
            product ^= temp;
        }
        let high_bit_set = temp & 0x80 != 0;
        temp <<= 1;
        if high_bit_set {
            temp ^= IRREDUCIBLE_POLYNOMIAL;
        }
    }
    product
}

/// Square-and-multiply over the bits of 254, used to build the lookup table.
pub fn inverse_slow(a: u8) -> Result<u8, FieldError> {
    if a == 0 {
        return Err(FieldError::ZeroInverse);
    }
    let mut result = 1u8;
    let mut base = a;
    for i in 0..8 {
        if (254u8 >> i) & 1 == 1 {
            result = multiply_slow(result, base);
        }
        base = multiply_slow(base, base);
    }
    Ok(result)
}

fn multiplication_table() -> Box<[[u8; 256]; 256]> {
    let mut table = Box::new([[0u8; 256]; 256]);
    for a in 0..=255u8 {
        for b in 0..=255u8 {
            table[a as usize][b as usize] = multiply_slow(a, b);
        }
    }
    table
}

fn inverse_table() -> [u8; 256] {
    // Zero has no inverse and keeps the 0 entry; callers check before lookup
    let mut table = [0u8; 256];
    for a in 1..=255u8 {
        table[a as usize] = inverse_slow(a).unwrap_or(0);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_subtract() {
        let cases = [
            (0u8, 0u8, 0u8),
            (1, 0, 1),
            (255, 255, 0),
            (0x0F, 0xF0, 0xFF),
            (0x53, 0xCA, 0x99),
            (0xAA, 0x55, 0xFF),
        ];
        for (a, b, expected) in cases {
            assert_eq!(add(a, b), expected);
            assert_eq!(add(b, a), expected);
            assert_eq!(subtract(a, b), expected);
        }
    }

    #[test]
    fn test_add_is_self_inverse() {
        for a in 0..=255u8 {
            assert_eq!(add(a, a), 0);
            for b in 0..=255u8 {
                assert_eq!(add(add(a, b), b), a);
            }
        }
    }

    #[test]
    fn test_multiply_known_values() {
        let cases = [
            (0u8, 0u8, 0u8),
            (0, 1, 0),
            (1, 1, 1),
            (2, 3, 6),
            (3, 7, 9),
            (0xFF, 0x01, 0xFF),
            (0x53, 0xCA, 0x01),
            (0x02, 0x02, 0x04),
            (0x02, 0x80, 0x1B),
        ];
        for (a, b, expected) in cases {
            assert_eq!(multiply(a, b), expected, "{a:#04x} * {b:#04x}");
            assert_eq!(multiply(b, a), expected, "{b:#04x} * {a:#04x}");
        }
    }

    #[test]
    fn test_multiplication_table_matches_bit_loop() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                assert_eq!(multiply(a, b), multiply_slow(a, b));
                assert_eq!(multiply(a, b), multiply(b, a));
            }
        }
    }

    #[test]
    fn test_inverse_known_values() {
        assert_eq!(inverse(1).unwrap(), 1);
        assert_eq!(inverse(0x53).unwrap(), 0xCA);
        assert_eq!(inverse(0xFF).unwrap(), 0x1C);
        assert_eq!(inverse(0x55).unwrap(), 0x24);
    }

    #[test]
    fn test_inverse_table_matches_exponentiation() {
        for a in 1..=255u8 {
            let inv = inverse(a).unwrap();
            assert_eq!(inv, inverse_slow(a).unwrap());
            assert_eq!(multiply(a, inv), 1);
        }
    }

    #[test]
    fn test_zero_has_no_inverse() {
        assert_eq!(inverse(0), Err(FieldError::ZeroInverse));
        assert_eq!(inverse_slow(0), Err(FieldError::ZeroInverse));
    }

    #[test]
    fn test_divide() {
        assert_eq!(divide(0x53, 0xCA).unwrap(), multiply(0x53, inverse(0xCA).unwrap()));
        assert_eq!(divide(multiply(0x53, 0xCA), 0x53).unwrap(), 0xCA);
        for b in 1..=255u8 {
            assert_eq!(divide(0, b).unwrap(), 0);
            for a in 0..=255u8 {
                assert_eq!(divide(multiply(a, b), b).unwrap(), a);
            }
        }
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(divide(7, 0), Err(FieldError::DivisionByZero));
        assert_eq!(divide(0, 0), Err(FieldError::DivisionByZero));
    }
}
