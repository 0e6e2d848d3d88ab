use std::ops::Shr;

use lazy_static::lazy_static;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{Signed, Zero};
use starknet_types_core::felt::NonZeroFelt;

use crate::types::errors::math_errors::MathError;
use crate::utils::CAIRO_PRIME;
use crate::Felt252;

lazy_static! {
    static ref SIGNED_FELT_MAX: BigUint = &*CAIRO_PRIME >> 1_u32;
    static ref CAIRO_PRIME_INT: BigInt = BigInt::from(CAIRO_PRIME.clone());
}

/// `2^n` as a felt. `n` must be below 252.
pub fn pow2_const(n: u32) -> Felt252 {
    Felt252::TWO.pow(n as u128)
}

/// Integer square root: the largest `x` with `x^2 <= n`.
pub fn isqrt(n: &BigUint) -> Result<BigUint, MathError> {
    // Newton iteration from above
    let mut x = n.clone();
    let mut y = (&x + 1_u32).shr(1_u32);
    while y < x {
        x = y;
        y = (&x + n.div_floor(&x)).shr(1_u32);
    }
    if !(&x * &x <= *n && *n < (&x + 1_u32) * (&x + 1_u32)) {
        return Err(MathError::FailedToGetSqrt(Box::new(n.clone())));
    }
    Ok(x)
}

/// Exact integer division of felts (as integers in `[0, P)`).
pub fn safe_div(x: &Felt252, y: &Felt252) -> Result<Felt252, MathError> {
    let divisor = NonZeroFelt::try_from(*y).map_err(|_| MathError::DividedByZero)?;
    let (q, r) = x.div_rem(&divisor);
    if r != Felt252::ZERO {
        return Err(MathError::SafeDivFail(Box::new((*x, *y))));
    }
    Ok(q)
}

pub fn safe_div_usize(x: usize, y: usize) -> Result<usize, MathError> {
    if y == 0 {
        return Err(MathError::DividedByZero);
    }
    if x % y != 0 {
        return Err(MathError::SafeDivFailUsize(Box::new((x, y))));
    }
    Ok(x / y)
}

/// Exact integer division of signed integers.
pub fn safe_div_bigint(x: &BigInt, y: &BigInt) -> Result<BigInt, MathError> {
    if y.is_zero() {
        return Err(MathError::DividedByZero);
    }
    let (q, r) = x.div_mod_floor(y);
    if !r.is_zero() {
        return Err(MathError::SafeDivFailBigInt(Box::new((x.clone(), y.clone()))));
    }
    Ok(q)
}

/// Reads a felt as a signed integer in `(-P/2, P/2]`.
pub fn signed_felt(felt: Felt252) -> BigInt {
    let value = felt.to_biguint();
    if value > *SIGNED_FELT_MAX {
        BigInt::from(value) - &*CAIRO_PRIME_INT
    } else {
        BigInt::from(value)
    }
}

/// Maps a signed integer back into the field.
pub fn felt_from_bigint(value: &BigInt) -> Felt252 {
    let reduced = value.mod_floor(&CAIRO_PRIME_INT);
    Felt252::from(reduced.magnitude())
}

/// `P + Q` on a short Weierstrass curve over the Cairo field.
/// Fails when both points share an x coordinate.
pub fn ec_add(
    point_a: (Felt252, Felt252),
    point_b: (Felt252, Felt252),
) -> Result<(Felt252, Felt252), MathError> {
    let slope = line_slope(&point_a, &point_b)?;
    let x = slope * slope - point_a.0 - point_b.0;
    let y = slope * (point_a.0 - x) - point_a.1;
    Ok((x, y))
}

/// Slope of the line through two points with different x coordinates.
pub fn line_slope(
    point_a: &(Felt252, Felt252),
    point_b: &(Felt252, Felt252),
) -> Result<Felt252, MathError> {
    let dx = NonZeroFelt::try_from(point_a.0 - point_b.0).map_err(|_| MathError::DividedByZero)?;
    Ok((point_a.1 - point_b.1).field_div(&dx))
}

/// `2P` on the curve `y^2 = x^3 + alpha * x + beta`. Fails when `y == 0`.
pub fn ec_double(
    point: (Felt252, Felt252),
    alpha: &Felt252,
) -> Result<(Felt252, Felt252), MathError> {
    let slope = ec_double_slope(&point, alpha)?;
    let x = slope * slope - Felt252::TWO * point.0;
    let y = slope * (point.0 - x) - point.1;
    Ok((x, y))
}

pub fn ec_double_slope(point: &(Felt252, Felt252), alpha: &Felt252) -> Result<Felt252, MathError> {
    let denominator =
        NonZeroFelt::try_from(Felt252::TWO * point.1).map_err(|_| MathError::DividedByZero)?;
    Ok((Felt252::THREE * point.0 * point.0 + alpha).field_div(&denominator))
}

/// Whether `value`, read as a signed felt, is negative.
pub(crate) fn is_negative(value: Felt252) -> bool {
    signed_felt(value).is_negative()
}
