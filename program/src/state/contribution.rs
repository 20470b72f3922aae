use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    state::{Identity, PoolPairId, TokenId},
    utils::assert,
};

/// One side of a two-token liquidity deposit, waiting for its counterpart.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Contribution {
    /// Target pair, empty when the deposit creates a new pair
    pub pool_pair_id: PoolPairId,
    pub receiver: String,
    pub token_id: TokenId,
    pub amount: u64,
    pub amplifier: u32,
    pub nft_id: Identity,
    pub tx_req_id: String,
    pub shard_id: u8,
}

impl Contribution {
    /// Both sides of a pair hash must name different tokens and agree on everything else.
    pub fn check_compatible(&self, other: &Contribution) -> DexResult {
        assert(self.token_id != other.token_id, DexError::IncompatibleContribution)?;
        assert(self.amplifier == other.amplifier, DexError::IncompatibleContribution)?;
        assert(
            self.pool_pair_id == other.pool_pair_id,
            DexError::IncompatibleContribution,
        )?;
        assert(self.nft_id == other.nft_id, DexError::IncompatibleContribution)
    }
}

/// Identifier of a pair created from two contributions: `token0-token1-txReqID`.
pub fn generate_pool_pair_id(token_a: &str, token_b: &str, tx_req_id: &str) -> PoolPairId {
    if token_a < token_b {
        format!("{}-{}-{}", token_a, token_b, tx_req_id)
    } else {
        format!("{}-{}-{}", token_b, token_a, tx_req_id)
    }
}
