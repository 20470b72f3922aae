//! Exchange-wide parameters. They are read-only for the duration of a batch except through an
//! accepted `ModifyParams` instruction.
use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    state::PoolPairId,
    utils::assert,
};

/// Amplifier value at which virtual reserves equal real reserves.
pub const BASE_AMPLIFIER: u32 = 10_000;
/// Denominator of basis-point fee rates.
pub const BPS: u64 = 10_000;
/// Highest fee rate a pool pair may be configured with.
pub const MAX_FEE_RATE_BPS: u32 = 200;
/// Fixed-point scale of the per-share LP fee accumulators (10^18).
pub const BASE_LP_FEES_PER_SHARE: u64 = 1_000_000_000_000_000_000;
pub const DEFAULT_MAX_ORDERS_PER_NFT: u32 = 20;

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Params {
    /// Fee rate for pairs without an entry in `fee_rate_bps`
    pub default_fee_rate_bps: u32,
    /// Per pool pair fee rate overrides
    pub fee_rate_bps: BTreeMap<PoolPairId, u32>,
    /// Share of every trading fee kept as protocol fee, in percent
    pub trading_protocol_fee_percent: u32,
    /// Share of every trading fee set aside for staking pools, in percent
    pub trading_staking_pool_reward_percent: u32,
    /// Maximum number of resting orders a single identity may hold in one pool pair
    pub max_orders_per_nft: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            default_fee_rate_bps: 30,
            fee_rate_bps: BTreeMap::new(),
            trading_protocol_fee_percent: 0,
            trading_staking_pool_reward_percent: 10,
            max_orders_per_nft: DEFAULT_MAX_ORDERS_PER_NFT,
        }
    }
}

impl Params {
    pub fn validate(&self) -> DexResult {
        assert(
            self.default_fee_rate_bps <= MAX_FEE_RATE_BPS,
            DexError::InvalidParams,
        )?;
        for rate in self.fee_rate_bps.values() {
            assert(*rate <= MAX_FEE_RATE_BPS, DexError::InvalidParams)?;
        }
        let fee_percent = self
            .trading_protocol_fee_percent
            .checked_add(self.trading_staking_pool_reward_percent);
        assert(
            fee_percent.map_or(false, |p| p <= 100),
            DexError::InvalidParams,
        )?;
        assert(self.max_orders_per_nft > 0, DexError::InvalidParams)
    }

    pub fn fee_rate_bps(&self, pool_pair_id: &str) -> u32 {
        self.fee_rate_bps
            .get(pool_pair_id)
            .copied()
            .unwrap_or(self.default_fee_rate_bps)
    }

    /// Minimum fee for selling `sell_amount` through `trade_path`.
    pub fn required_trading_fee(&self, sell_amount: u64, trade_path: &[PoolPairId]) -> u64 {
        let total_rate: u128 = trade_path
            .iter()
            .map(|id| self.fee_rate_bps(id) as u128)
            .sum();
        // Rates are capped so the quotient never exceeds the sell amount times the path length.
        let fee = (sell_amount as u128) * total_rate / (BPS as u128);
        u64::try_from(fee).unwrap_or(u64::MAX)
    }
}
