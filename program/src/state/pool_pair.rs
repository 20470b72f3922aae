//! A pool pair: reserves, liquidity shares, fee accumulators and the embedded order book.
//!
//! All the mutating methods here compute every new value before writing any of them, so a
//! returned error always leaves the pair as it was.
use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    state::{
        contribution::Contribution,
        orderbook::OrderBook,
        params::{Params, BASE_AMPLIFIER, BASE_LP_FEES_PER_SHARE},
        reserves::{calculate_share_amount, initial_share_amount, Reserves},
        share::Share,
        state_change::{changed_keys, PoolPairChange},
        Identity, TokenId,
    },
    utils::{
        biguint_to_u64, execute_operation_big, execute_operation_u64, mul_div_u64, Operator,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPair {
    pub token0_id: TokenId,
    pub token1_id: TokenId,
    /// Fixed at creation, never below [`BASE_AMPLIFIER`]
    pub amplifier: u32,
    /// Sum of every share's amount
    pub share_amount: u64,
    pub reserves: Reserves,
    pub shares: BTreeMap<Identity, Share>,
    /// Cumulative LP fee per share unit, scaled by [`BASE_LP_FEES_PER_SHARE`]
    pub lp_fees_per_share: BTreeMap<TokenId, BigUint>,
    pub protocol_fees: BTreeMap<TokenId, u64>,
    pub staking_pool_fees: BTreeMap<TokenId, u64>,
    pub order_book: OrderBook,
}

impl PoolPair {
    /// Builds a pair from two matched contributions. Token ordering is lexicographic on the ID.
    /// Returns the pair and the number of shares minted to the depositor.
    pub fn init(a: &Contribution, b: &Contribution) -> DexResult<(Self, u64)> {
        let (c0, c1) = if a.token_id < b.token_id { (a, b) } else { (b, a) };
        let mut pair = Self {
            token0_id: c0.token_id.clone(),
            token1_id: c1.token_id.clone(),
            amplifier: c0.amplifier,
            share_amount: 0,
            reserves: Reserves::new(c0.amount, c1.amount, c0.amplifier),
            shares: BTreeMap::new(),
            lp_fees_per_share: BTreeMap::new(),
            protocol_fees: BTreeMap::new(),
            staking_pool_fees: BTreeMap::new(),
            order_book: OrderBook::default(),
        };
        let share_amount = initial_share_amount(c0.amount, c1.amount)?;
        pair.update_share_value(&c0.nft_id, share_amount, Operator::Add)?;
        Ok((pair, share_amount))
    }

    /// A pair with a drained side or no shares accepts no proportional operation.
    pub fn is_empty(&self) -> bool {
        self.reserves.is_empty() || self.share_amount == 0
    }

    pub fn has_token(&self, token_id: &str) -> bool {
        self.token0_id == token_id || self.token1_id == token_id
    }

    /// Orders two contributions as `(token0 side, token1 side)` of this pair.
    pub fn contributions_by_order<'a>(
        &self,
        a: &'a Contribution,
        b: &'a Contribution,
    ) -> (&'a Contribution, &'a Contribution) {
        if a.token_id == self.token0_id {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Caps a two-sided contribution to the pair's current ratio.
    ///
    /// Returns `(actual0, returned0, actual1, returned1)`.
    pub fn compute_actual_contributed_amounts(
        &self,
        contribution0: &Contribution,
        contribution1: &Contribution,
    ) -> DexResult<(u64, u64, u64, u64)> {
        if self.is_empty() {
            return Err(DexError::NotEnoughLiquidity);
        }
        let real0 = self.reserves.token0_real;
        let real1 = self.reserves.token1_real;
        let wanted0 = (contribution1.amount as u128) * (real0 as u128) / (real1 as u128);
        let actual0 = wanted0.min(contribution0.amount as u128) as u64;
        let actual1 = mul_div_u64(actual0, real1, real0)?;
        if actual1 > contribution1.amount {
            return Err(DexError::ArithmeticOverflow);
        }
        Ok((
            actual0,
            contribution0.amount - actual0,
            actual1,
            contribution1.amount - actual1,
        ))
    }

    pub fn calculate_share_amount(&self, amount0: u64, amount1: u64) -> DexResult<u64> {
        calculate_share_amount(
            self.reserves.token0_real,
            self.reserves.token1_real,
            amount0,
            amount1,
            self.share_amount,
        )
    }

    /// Adds a proportional deposit to the reserves and returns the shares it is worth.
    /// The caller credits the shares with [`PoolPair::update_share_value`].
    pub fn add_reserve_and_calculate_share(&mut self, amount0: u64, amount1: u64) -> DexResult<u64> {
        let share_amount = self.calculate_share_amount(amount0, amount1)?;
        self.update_reserve_data(amount0, amount1, share_amount, Operator::Add)?;
        Ok(share_amount)
    }

    /// Moves both real reserves by the given amounts and rescales the virtual reserves.
    ///
    /// Amplified pairs keep `virtual / total_shares` constant, but never let a virtual reserve
    /// fall below its real one; unamplified pairs move virtual and real together.
    pub fn update_reserve_data(
        &mut self,
        amount0: u64,
        amount1: u64,
        share_amount: u64,
        op: Operator,
    ) -> DexResult {
        let new_total = execute_operation_u64(self.share_amount, share_amount, op)?;
        let real0 = execute_operation_u64(self.reserves.token0_real, amount0, op)?;
        let real1 = execute_operation_u64(self.reserves.token1_real, amount1, op)?;
        let virtual0 = self.next_virtual(&self.reserves.token0_virtual, real0, amount0, new_total, op)?;
        let virtual1 = self.next_virtual(&self.reserves.token1_virtual, real1, amount1, new_total, op)?;
        self.reserves = Reserves {
            token0_real: real0,
            token1_real: real1,
            token0_virtual: virtual0,
            token1_virtual: virtual1,
        };
        Ok(())
    }

    fn next_virtual(
        &self,
        current: &BigUint,
        new_real: u64,
        amount: u64,
        new_total: u64,
        op: Operator,
    ) -> DexResult<BigUint> {
        if self.amplifier == BASE_AMPLIFIER {
            return execute_operation_big(current, &BigUint::from(amount), op);
        }
        if self.share_amount == 0 {
            return Err(DexError::NotEnoughLiquidity);
        }
        let scaled = current * new_total / self.share_amount;
        let floor = BigUint::from(new_real);
        Ok(if scaled > floor { scaled } else { floor })
    }

    /// Fees owed to `nft_id`, including those accrued at earlier touches.
    pub fn recompute_lp_fee(&self, nft_id: &str) -> DexResult<BTreeMap<TokenId, u64>> {
        let share = self.shares.get(nft_id).ok_or(DexError::ShareNotFound)?;
        let mut result = BTreeMap::new();
        let zero = BigUint::default();
        let tokens = self
            .lp_fees_per_share
            .keys()
            .chain(share.trading_fees.keys())
            .collect::<std::collections::BTreeSet<_>>();
        for token_id in tokens {
            let current = self.lp_fees_per_share.get(token_id).unwrap_or(&zero);
            let last = share.last_lp_fees_per_share.get(token_id).unwrap_or(&zero);
            let accrued = if current > last {
                (current - last) * share.amount / BASE_LP_FEES_PER_SHARE
            } else {
                BigUint::default()
            };
            let previous = share.trading_fees.get(token_id).copied().unwrap_or_default();
            let reward = biguint_to_u64(&(accrued + previous))?;
            if reward > 0 {
                result.insert(token_id.clone(), reward);
            }
        }
        Ok(result)
    }

    /// Adds or removes share units of `nft_id`, settling its fees against the current
    /// accumulators first.
    pub fn update_share_value(&mut self, nft_id: &str, amount: u64, op: Operator) -> DexResult {
        let mut share = match self.shares.get(nft_id) {
            None if op == Operator::Sub => return Err(DexError::ShareNotFound),
            None => Share::default(),
            Some(s) => {
                let mut s = s.clone();
                s.trading_fees = self.recompute_lp_fee(nft_id)?;
                s
            }
        };
        share.last_lp_fees_per_share = self.lp_fees_per_share.clone();
        share.amount = execute_operation_u64(share.amount, amount, op)?;
        let total = execute_operation_u64(self.share_amount, amount, op)?;

        self.share_amount = total;
        if share.is_empty() {
            self.shares.remove(nft_id);
        } else {
            self.shares.insert(nft_id.to_string(), share);
        }
        Ok(())
    }

    /// Burns up to `share_amount` shares of `nft_id` and takes the matching slice of both real
    /// reserves out of the pair. Returns `(token0_amount, token1_amount, burnt_shares)`.
    pub fn deduct_share(&mut self, nft_id: &str, share_amount: u64) -> DexResult<(u64, u64, u64)> {
        let owned = self.shares.get(nft_id).map(|s| s.amount).unwrap_or_default();
        if share_amount == 0 || owned == 0 {
            return Err(DexError::ZeroAmount);
        }
        let burnt = share_amount.min(owned);
        let token0_amount = mul_div_u64(self.reserves.token0_real, burnt, self.share_amount)?;
        let token1_amount = mul_div_u64(self.reserves.token1_real, burnt, self.share_amount)?;

        let reserves = self.reserves.clone();
        self.update_reserve_data(token0_amount, token1_amount, burnt, Operator::Sub)?;
        if let Err(e) = self.update_share_value(nft_id, burnt, Operator::Sub) {
            self.reserves = reserves;
            return Err(e);
        }
        Ok((token0_amount, token1_amount, burnt))
    }

    /// Splits a collected trading fee between the protocol, the staking pools and the LPs.
    pub fn add_trading_fee(&mut self, token_id: &str, amount: u64, params: &Params) -> DexResult {
        if amount == 0 {
            return Ok(());
        }
        let mut protocol = mul_div_u64(amount, params.trading_protocol_fee_percent as u64, 100)?;
        let staking = mul_div_u64(amount, params.trading_staking_pool_reward_percent as u64, 100)?;
        let lp = amount
            .checked_sub(protocol)
            .and_then(|v| v.checked_sub(staking))
            .ok_or(DexError::InvalidParams)?;

        let mut lp_fees_per_share = None;
        if self.share_amount == 0 {
            protocol += lp;
        } else if lp > 0 {
            let increase = BigUint::from(lp) * BASE_LP_FEES_PER_SHARE / self.share_amount;
            let current = self.lp_fees_per_share.get(token_id).cloned().unwrap_or_default();
            lp_fees_per_share = Some(current + increase);
        }
        let protocol_total = add_fee(&self.protocol_fees, token_id, protocol)?;
        let staking_total = add_fee(&self.staking_pool_fees, token_id, staking)?;

        if let Some(v) = lp_fees_per_share {
            self.lp_fees_per_share.insert(token_id.to_string(), v);
        }
        if protocol > 0 {
            self.protocol_fees.insert(token_id.to_string(), protocol_total);
        }
        if staking > 0 {
            self.staking_pool_fees.insert(token_id.to_string(), staking_total);
        }
        Ok(())
    }

    /// Pays out everything `nft_id` has accrued and restarts its accrual from now.
    pub fn withdraw_lp_fee(&mut self, nft_id: &str) -> DexResult<BTreeMap<TokenId, u64>> {
        let fees = self.recompute_lp_fee(nft_id)?;
        let mut share = self.shares.get(nft_id).cloned().ok_or(DexError::ShareNotFound)?;
        share.trading_fees = BTreeMap::new();
        share.last_lp_fees_per_share = self.lp_fees_per_share.clone();
        if share.is_empty() {
            self.shares.remove(nft_id);
        } else {
            self.shares.insert(nft_id.to_string(), share);
        }
        Ok(fees)
    }

    /// Zeroes the protocol fees and returns the non-zero amounts that were held.
    pub fn withdraw_protocol_fees(&mut self) -> BTreeMap<TokenId, u64> {
        let paid: BTreeMap<TokenId, u64> = self
            .protocol_fees
            .iter()
            .filter(|(_, v)| **v > 0)
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        for token_id in paid.keys() {
            self.protocol_fees.insert(token_id.clone(), 0);
        }
        paid
    }

    pub fn check_share_conservation(&self) -> DexResult {
        let sum: u128 = self.shares.values().map(|s| s.amount as u128).sum();
        crate::utils::assert(sum == self.share_amount as u128, DexError::AssertionError)
    }

    /// Marks which sub-records of this pair differ from `previous` (a new pair marks everything).
    pub fn get_diff(&self, previous: Option<&PoolPair>) -> PoolPairChange {
        let mut change = PoolPairChange::default();
        let empty = BTreeMap::new();
        let previous_shares = previous.map(|p| &p.shares).unwrap_or(&empty);
        for (nft_id, share) in &self.shares {
            let prev_share = previous_shares.get(nft_id);
            if prev_share != Some(share) {
                change.shares.insert(nft_id.clone(), share.get_diff(prev_share));
            }
        }
        for (nft_id, prev_share) in previous_shares {
            if !self.shares.contains_key(nft_id) {
                // every sub-record of a removed share must be deleted
                change.shares.insert(nft_id.clone(), prev_share.get_diff(None));
            }
        }

        match previous {
            None => {
                change.is_changed = true;
                change.lp_fees_per_share = self.lp_fees_per_share.keys().cloned().collect();
                change.protocol_fees = self.protocol_fees.keys().cloned().collect();
                change.staking_pool_fees = self.staking_pool_fees.keys().cloned().collect();
                change.order_ids = self.order_book.orders().map(|o| o.id.clone()).collect();
            }
            Some(p) => {
                change.is_changed = self.token0_id != p.token0_id
                    || self.token1_id != p.token1_id
                    || self.amplifier != p.amplifier
                    || self.share_amount != p.share_amount
                    || self.reserves != p.reserves;
                change.lp_fees_per_share = changed_keys(&self.lp_fees_per_share, &p.lp_fees_per_share);
                change.protocol_fees = changed_keys(&self.protocol_fees, &p.protocol_fees);
                change.staking_pool_fees =
                    changed_keys(&self.staking_pool_fees, &p.staking_pool_fees);
                for order in self.order_book.orders() {
                    if p.order_book.get_order(&order.id) != Some(order) {
                        change.order_ids.insert(order.id.clone());
                    }
                }
                for order in p.order_book.orders() {
                    if !self.order_book.contains(&order.id) {
                        change.order_ids.insert(order.id.clone());
                    }
                }
            }
        }
        change
    }
}

fn add_fee(fees: &BTreeMap<TokenId, u64>, token_id: &str, amount: u64) -> DexResult<u64> {
    fees.get(token_id)
        .copied()
        .unwrap_or_default()
        .checked_add(amount)
        .ok_or(DexError::OutOfRange)
}
