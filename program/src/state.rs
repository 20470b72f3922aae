use std::{collections::BTreeMap, sync::Arc};

use borsh::{BorshDeserialize, BorshSerialize};
use num_bigint::BigUint;
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    utils::assert,
};

pub use crate::state::{
    contribution::Contribution, orderbook::Order, params::Params, pool_pair::PoolPair,
    share::Share,
};
use crate::state::state_change::{changed_keys, PoolPairChange, StateChange, Storage};

pub mod contribution;
pub mod orderbook;
pub mod params;
pub mod pool_pair;
pub mod reserves;
pub mod share;
pub mod state_change;

pub type TokenId = String;
pub type PoolPairId = String;
/// Opaque liquidity provider or order owner identity, validated outside the engine
pub type Identity = String;
pub type OrderId = String;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    FromPrimitive,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[repr(u8)]
/// Which token of the pair the trader or order owner gives up
pub enum TradeDirection {
    SellToken0 = 0,
    SellToken1 = 1,
}

impl TradeDirection {
    pub fn opposite(self) -> Self {
        match self {
            TradeDirection::SellToken0 => TradeDirection::SellToken1,
            TradeDirection::SellToken1 => TradeDirection::SellToken0,
        }
    }
}

/// A version of the whole exchange state.
///
/// Cloning only copies the map spines: pool pairs are shared between versions until one of them
/// writes through [`DexState::pool_pair_mut`], which copies that single pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexState {
    pub params: Params,
    pub pool_pairs: BTreeMap<PoolPairId, Arc<PoolPair>>,
    /// First sides of liquidity contributions, keyed by pair hash
    pub waiting_contributions: BTreeMap<String, Contribution>,
}

impl DexState {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn pool_pair(&self, pool_pair_id: &str) -> DexResult<&PoolPair> {
        self.pool_pairs
            .get(pool_pair_id)
            .map(|p| p.as_ref())
            .ok_or(DexError::PoolNotFound)
    }

    pub fn pool_pair_mut(&mut self, pool_pair_id: &str) -> DexResult<&mut PoolPair> {
        self.pool_pairs
            .get_mut(pool_pair_id)
            .map(Arc::make_mut)
            .ok_or(DexError::PoolNotFound)
    }

    pub fn insert_pool_pair(&mut self, pool_pair_id: PoolPairId, pool_pair: PoolPair) {
        self.pool_pairs.insert(pool_pair_id, Arc::new(pool_pair));
    }

    /// Share conservation and `virtual >= real` on every pair.
    pub fn check_invariants(&self) -> DexResult {
        for pair in self.pool_pairs.values() {
            pair.check_share_conservation()?;
            let r = &pair.reserves;
            assert(
                r.token0_virtual >= BigUint::from(r.token0_real)
                    && r.token1_virtual >= BigUint::from(r.token1_real),
                DexError::AssertionError,
            )?;
        }
        Ok(())
    }

    /// Records that must be written for `previous` to become `self`.
    pub fn get_diff(&self, previous: &DexState) -> StateChange {
        let mut change = StateChange::default();
        for (id, pair) in &self.pool_pairs {
            let prev_pair = previous.pool_pairs.get(id);
            if prev_pair.map_or(false, |p| Arc::ptr_eq(p, pair)) {
                continue;
            }
            let pair_change = pair.get_diff(prev_pair.map(|p| p.as_ref()));
            if !pair_change.is_empty() {
                change.pool_pairs.insert(id.clone(), pair_change);
            }
        }
        for id in previous.pool_pairs.keys() {
            if !self.pool_pairs.contains_key(id) {
                change.pool_pairs.insert(
                    id.clone(),
                    PoolPairChange {
                        is_changed: true,
                        ..PoolPairChange::default()
                    },
                );
            }
        }
        change.waiting_contributions =
            changed_keys(&self.waiting_contributions, &previous.waiting_contributions);
        change.params = self.params != previous.params;
        change
    }

    pub fn store_to_db<S: Storage>(&self, change: &StateChange, db: &mut S) -> DexResult {
        state_change::store_to_db(self, change, db)
    }
}
