use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    instruction::{DexInstruction, RejectedContent},
    state::{DexState, PoolPairId, TokenId},
    utils::assert,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub pool_pair_id: PoolPairId,
    pub receiver: String,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedWithdrawProtocolFee {
    pub pool_pair_id: PoolPairId,
    pub amounts: BTreeMap<TokenId, u64>,
    pub receiver: String,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "camelCase")]
pub enum Effect {
    Accepted(AcceptedWithdrawProtocolFee),
    Rejected(RejectedContent),
}

pub fn produce(state: &mut DexState, params: &Params) -> DexResult<Vec<DexInstruction>> {
    let amounts: BTreeMap<TokenId, u64> = state
        .pool_pair(&params.pool_pair_id)?
        .protocol_fees
        .iter()
        .filter(|(_, v)| **v > 0)
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    assert(!amounts.is_empty(), DexError::ZeroAmount)?;

    let effect = Effect::Accepted(AcceptedWithdrawProtocolFee {
        pool_pair_id: params.pool_pair_id.clone(),
        amounts,
        receiver: params.receiver.clone(),
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    });
    process(state, &effect)?;
    Ok(vec![DexInstruction::WithdrawProtocolFee(effect)])
}

pub fn process(state: &mut DexState, effect: &Effect) -> DexResult {
    let accepted = match effect {
        Effect::Accepted(accepted) => accepted,
        Effect::Rejected(_) => return Ok(()),
    };
    let paid = state
        .pool_pair_mut(&accepted.pool_pair_id)?
        .withdraw_protocol_fees();
    assert(paid == accepted.amounts, DexError::StateDivergence)
}

pub fn refund(params: &Params) -> Vec<DexInstruction> {
    vec![DexInstruction::WithdrawProtocolFee(Effect::Rejected(RejectedContent {
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    }))]
}
