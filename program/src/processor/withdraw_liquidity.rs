use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    instruction::{DexInstruction, RejectedContent},
    state::{DexState, Identity, PoolPairId, TokenId},
    utils::assert,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub pool_pair_id: PoolPairId,
    pub nft_id: Identity,
    pub share_amount: u64,
    pub receiver: String,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedWithdrawLiquidity {
    pub pool_pair_id: PoolPairId,
    pub nft_id: Identity,
    pub token0_id: TokenId,
    pub token0_amount: u64,
    pub token1_id: TokenId,
    pub token1_amount: u64,
    /// Shares actually burnt, never more than the provider held
    pub share_amount: u64,
    pub receiver: String,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "camelCase")]
pub enum Effect {
    Accepted(AcceptedWithdrawLiquidity),
    Rejected(RejectedContent),
}

pub fn produce(state: &mut DexState, params: &Params) -> DexResult<Vec<DexInstruction>> {
    assert(params.share_amount > 0, DexError::ZeroAmount)?;
    let mut pool_pair = state.pool_pair(&params.pool_pair_id)?.clone();
    assert(
        pool_pair.shares.contains_key(&params.nft_id),
        DexError::ShareNotFound,
    )?;
    let (token0_amount, token1_amount, share_amount) =
        pool_pair.deduct_share(&params.nft_id, params.share_amount)?;

    let effect = Effect::Accepted(AcceptedWithdrawLiquidity {
        pool_pair_id: params.pool_pair_id.clone(),
        nft_id: params.nft_id.clone(),
        token0_id: pool_pair.token0_id.clone(),
        token0_amount,
        token1_id: pool_pair.token1_id.clone(),
        token1_amount,
        share_amount,
        receiver: params.receiver.clone(),
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    });
    process(state, &effect)?;
    Ok(vec![DexInstruction::WithdrawLiquidity(effect)])
}

pub fn process(state: &mut DexState, effect: &Effect) -> DexResult {
    let accepted = match effect {
        Effect::Accepted(accepted) => accepted,
        Effect::Rejected(_) => return Ok(()),
    };
    let pool_pair = state.pool_pair_mut(&accepted.pool_pair_id)?;
    let result = pool_pair.deduct_share(&accepted.nft_id, accepted.share_amount)?;
    assert(
        result
            == (
                accepted.token0_amount,
                accepted.token1_amount,
                accepted.share_amount,
            ),
        DexError::StateDivergence,
    )
}

pub fn refund(params: &Params) -> Vec<DexInstruction> {
    vec![DexInstruction::WithdrawLiquidity(Effect::Rejected(RejectedContent {
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    }))]
}
