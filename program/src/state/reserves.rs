//! Constant-product pricing over amplified virtual reserves.
//!
//! Every function in this module is pure: it only reads the reserves it is given, or mutates the
//! one [`Reserves`] value it is called on. Trades always price against the virtual reserves and
//! settle against the real ones.
use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    state::{orderbook::Order, params::BASE_AMPLIFIER, TradeDirection},
    utils::{apply_signed_delta, bigint_to_u64, biguint_to_u64, ceil_div, isqrt_product},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub token0_real: u64,
    pub token1_real: u64,
    pub token0_virtual: BigUint,
    pub token1_virtual: BigUint,
}

/// Virtual reserves for a fresh pair: `amount · amplifier / BASE_AMPLIFIER`.
pub fn virtual_amounts(amount0: u64, amount1: u64, amplifier: u32) -> (BigUint, BigUint) {
    if amplifier == BASE_AMPLIFIER {
        return (BigUint::from(amount0), BigUint::from(amount1));
    }
    let scale = |amount: u64| BigUint::from(amount) * amplifier / BASE_AMPLIFIER;
    (scale(amount0), scale(amount1))
}

/// Output of selling `sell_amount` into the pool.
///
/// The new buy-side virtual reserve is rounded up so that the virtual product never shrinks,
/// which makes the returned amount the floor of the exact curve output.
pub fn buy_amount(
    sell_amount: u64,
    _sell_real: u64,
    buy_real: u64,
    sell_virtual: &BigUint,
    buy_virtual: &BigUint,
) -> DexResult<u64> {
    let den = sell_virtual + sell_amount;
    if den.is_zero() {
        return Err(DexError::NotEnoughLiquidity);
    }
    let new_buy_virtual = ceil_div(&(sell_virtual * buy_virtual), &den)?;
    let result = buy_virtual - new_buy_virtual;
    let result = biguint_to_u64(&result)?;
    if result > buy_real {
        return Err(DexError::NotEnoughLiquidity);
    }
    Ok(result)
}

/// Input needed to buy exactly `buy_amount` out of the pool.
pub fn amount_to_sell(
    buy_amount: u64,
    _sell_real: u64,
    buy_real: u64,
    sell_virtual: &BigUint,
    buy_virtual: &BigUint,
) -> DexResult<u64> {
    if buy_amount > buy_real || BigUint::from(buy_amount) >= *buy_virtual {
        return Err(DexError::NotEnoughLiquidity);
    }
    let new_sell_virtual = ceil_div(
        &(sell_virtual * buy_virtual),
        &(buy_virtual - buy_amount),
    )?;
    biguint_to_u64(&(new_sell_virtual - sell_virtual))
}

/// Shares minted for the first contribution of a pair: `floor(sqrt(amount0 · amount1))`.
pub fn initial_share_amount(amount0: u64, amount1: u64) -> DexResult<u64> {
    isqrt_product(amount0, amount1)
}

/// Shares minted for a proportional contribution to an existing pair.
pub fn calculate_share_amount(
    token0_real: u64,
    token1_real: u64,
    amount0: u64,
    amount1: u64,
    total_shares: u64,
) -> DexResult<u64> {
    if token0_real == 0 || token1_real == 0 {
        return Err(DexError::NotEnoughLiquidity);
    }
    let by0 = (amount0 as u128) * (total_shares as u128) / (token0_real as u128);
    let by1 = (amount1 as u128) * (total_shares as u128) / (token1_real as u128);
    u64::try_from(by0.min(by1)).map_err(|_| DexError::OutOfRange)
}

impl Reserves {
    pub fn new(amount0: u64, amount1: u64, amplifier: u32) -> Self {
        let (token0_virtual, token1_virtual) = virtual_amounts(amount0, amount1, amplifier);
        Self {
            token0_real: amount0,
            token1_real: amount1,
            token0_virtual,
            token1_virtual,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token0_real == 0
            || self.token1_real == 0
            || self.token0_virtual.is_zero()
            || self.token1_virtual.is_zero()
    }

    /// Returns `(sell_real, buy_real, sell_virtual, buy_virtual)` for a trade direction.
    fn oriented(&self, direction: TradeDirection) -> (u64, u64, &BigUint, &BigUint) {
        match direction {
            TradeDirection::SellToken0 => (
                self.token0_real,
                self.token1_real,
                &self.token0_virtual,
                &self.token1_virtual,
            ),
            TradeDirection::SellToken1 => (
                self.token1_real,
                self.token0_real,
                &self.token1_virtual,
                &self.token0_virtual,
            ),
        }
    }

    pub fn buy_amount(&self, sell_amount: u64, direction: TradeDirection) -> DexResult<u64> {
        let (sr, br, sv, bv) = self.oriented(direction);
        buy_amount(sell_amount, sr, br, sv, bv)
    }

    pub fn amount_to_sell(&self, buy: u64, direction: TradeDirection) -> DexResult<u64> {
        let (sr, br, sv, bv) = self.oriented(direction);
        amount_to_sell(buy, sr, br, sv, bv)
    }

    /// Applies a swap's reserve deltas to both the real and the virtual reserves.
    ///
    /// The deltas must have strictly opposite signs, or both be zero. Nothing is written unless
    /// all four new values are valid.
    pub fn apply_reserve_changes(&mut self, change0: &BigInt, change1: &BigInt) -> DexResult {
        let opposite = (change0.is_positive() && change1.is_negative())
            || (change0.is_negative() && change1.is_positive());
        let both_zero = change0.is_zero() && change1.is_zero();
        if !opposite && !both_zero {
            return Err(DexError::InvalidReserveChangeSigns);
        }
        let real0 = checked_real(self.token0_real, change0)?;
        let real1 = checked_real(self.token1_real, change1)?;
        let virtual0 = apply_signed_delta(&self.token0_virtual, change0)?;
        let virtual1 = apply_signed_delta(&self.token1_virtual, change1)?;
        self.token0_real = real0;
        self.token1_real = real1;
        self.token0_virtual = virtual0;
        self.token1_virtual = virtual1;
        Ok(())
    }

    /// Swaps in the pool until its marginal price reaches the rate of `order`, or the whole
    /// budget if there is no order or the order's rate is further away than the budget goes.
    ///
    /// Returns `(buy_amount, sell_amount_remain, token0_change, token1_change)`. The reserves
    /// are updated on success.
    pub fn swap_to_reach_order_rate(
        &mut self,
        max_sell_amount_after_fee: u64,
        direction: TradeDirection,
        order: Option<&Order>,
    ) -> DexResult<(u64, u64, BigInt, BigInt)> {
        let max_delta_x = BigInt::from(max_sell_amount_after_fee);
        let (_, _, x_v, y_v) = self.oriented(direction);
        let x_v = BigInt::from(x_v.clone());
        let y_v = BigInt::from(y_v.clone());

        let target_delta_x = match order {
            None => None,
            Some(ord) => {
                if ord.trade_direction == direction {
                    return Err(DexError::SameDirectionOrder);
                }
                let (x_ord, y_ord) = match direction {
                    TradeDirection::SellToken0 => (ord.token0_rate, ord.token1_rate),
                    TradeDirection::SellToken1 => (ord.token1_rate, ord.token0_rate),
                };
                if y_ord == 0 {
                    return Err(DexError::InvalidInput);
                }
                let l = &x_v * &y_v;
                let target_x = (l * BigInt::from(x_ord) / BigInt::from(y_ord)).sqrt();
                Some(target_x - &x_v)
            }
        };

        let (final_sell_amount, sell_amount_remain) = match target_delta_x {
            Some(t) if t < max_delta_x => {
                if !t.is_positive() {
                    // pool price is already at or past the order's rate
                    return Ok((0, max_sell_amount_after_fee, BigInt::zero(), BigInt::zero()));
                }
                let t = bigint_to_u64(&t)?;
                (t, max_sell_amount_after_fee - t)
            }
            _ => (max_sell_amount_after_fee, 0),
        };

        let buy = self.buy_amount(final_sell_amount, direction)?;
        let (change0, change1) = match direction {
            TradeDirection::SellToken0 => {
                (BigInt::from(final_sell_amount), -BigInt::from(buy))
            }
            TradeDirection::SellToken1 => {
                (-BigInt::from(buy), BigInt::from(final_sell_amount))
            }
        };
        self.apply_reserve_changes(&change0, &change1)?;
        Ok((buy, sell_amount_remain, change0, change1))
    }
}

fn checked_real(real: u64, change: &BigInt) -> DexResult<u64> {
    let v = BigInt::from(real) + change;
    if v.is_negative() {
        return Err(DexError::NotEnoughLiquidity);
    }
    bigint_to_u64(&v)
}
