use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::error::{DexError, DexResult};

/// Direction of a balance update applied to a `u64` amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
}

pub fn assert(statement: bool, err: DexError) -> DexResult {
    if !statement {
        Err(err)
    } else {
        Ok(())
    }
}

/// Applies `op` to two `u64` values, failing instead of wrapping.
pub fn execute_operation_u64(a: u64, b: u64, op: Operator) -> DexResult<u64> {
    match op {
        Operator::Add => a.checked_add(b).ok_or(DexError::OutOfRange),
        Operator::Sub => a.checked_sub(b).ok_or(DexError::OutOfRange),
    }
}

/// Same as [`execute_operation_u64`] on unbounded non-negative values.
pub fn execute_operation_big(a: &BigUint, b: &BigUint, op: Operator) -> DexResult<BigUint> {
    match op {
        Operator::Add => Ok(a + b),
        Operator::Sub => {
            if a < b {
                return Err(DexError::NotEnoughLiquidity);
            }
            Ok(a - b)
        }
    }
}

pub fn biguint_to_u64(v: &BigUint) -> DexResult<u64> {
    v.to_u64().ok_or(DexError::OutOfRange)
}

pub fn bigint_to_u64(v: &BigInt) -> DexResult<u64> {
    if v.sign() == Sign::Minus {
        return Err(DexError::OutOfRange);
    }
    v.to_u64().ok_or(DexError::OutOfRange)
}

/// Adds a signed delta to an unsigned big value. A negative result is a liquidity shortfall.
pub fn apply_signed_delta(v: &BigUint, delta: &BigInt) -> DexResult<BigUint> {
    let r = BigInt::from(v.clone()) + delta;
    r.to_biguint().ok_or(DexError::NotEnoughLiquidity)
}

/// floor(sqrt(a * b)) without intermediate overflow.
pub fn isqrt_product(a: u64, b: u64) -> DexResult<u64> {
    let p = BigUint::from(a) * BigUint::from(b);
    biguint_to_u64(&p.sqrt())
}

pub fn ceil_div(num: &BigUint, den: &BigUint) -> DexResult<BigUint> {
    if den.is_zero() {
        return Err(DexError::ArithmeticOverflow);
    }
    let q = num / den;
    if (num % den).is_zero() {
        Ok(q)
    } else {
        Ok(q + 1u32)
    }
}

/// a * b / c on u64 operands, floored, checked against the u64 range.
pub fn mul_div_u64(a: u64, b: u64, c: u64) -> DexResult<u64> {
    if c == 0 {
        return Err(DexError::ArithmeticOverflow);
    }
    let r = (a as u128) * (b as u128) / (c as u128);
    u64::try_from(r).map_err(|_| DexError::OutOfRange)
}

/// Little-endian byte form used for arbitrary-precision values in storage records.
pub fn biguint_to_bytes(v: &BigUint) -> Vec<u8> {
    v.to_bytes_le()
}
