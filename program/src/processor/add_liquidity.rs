//! Two-sided liquidity contributions.
//!
//! The first side of a pair hash waits in the state. When the second side arrives both are
//! checked against each other and either create a pair, join an existing one (the over-supplied
//! part is returned) or are refunded in full.
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    instruction::DexInstruction,
    state::{
        contribution::{generate_pool_pair_id, Contribution},
        params::BASE_AMPLIFIER,
        DexState, Identity, PoolPair, PoolPairId, TokenId,
    },
    utils::{assert, Operator},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Empty when the contribution creates a new pair
    pub pool_pair_id: PoolPairId,
    pub pair_hash: String,
    pub receiver: String,
    pub token_id: TokenId,
    pub token_amount: u64,
    pub amplifier: u32,
    pub nft_id: Identity,
    pub tx_req_id: String,
    pub shard_id: u8,
}

impl Params {
    pub fn contribution(&self) -> Contribution {
        Contribution {
            pool_pair_id: self.pool_pair_id.clone(),
            receiver: self.receiver.clone(),
            token_id: self.token_id.clone(),
            amount: self.token_amount,
            amplifier: self.amplifier,
            nft_id: self.nft_id.clone(),
            tx_req_id: self.tx_req_id.clone(),
            shard_id: self.shard_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingContent {
    pub pair_hash: String,
    pub contribution: Contribution,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedContent {
    pub pair_hash: String,
    pub pool_pair_id: PoolPairId,
    /// The side that completed the pair hash
    pub contribution: Contribution,
    pub share_amount: u64,
}

/// One side of a contribution joining an existing pair. Two of these are emitted per match,
/// token0 side first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAndReturnContent {
    pub pair_hash: String,
    pub pool_pair_id: PoolPairId,
    pub contribution: Contribution,
    pub share_amount: u64,
    pub actual_amount: u64,
    pub returned_amount: u64,
    pub existed_token_id: TokenId,
    pub existed_token_actual_amount: u64,
    pub existed_token_returned_amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundContent {
    pub pair_hash: String,
    pub contribution: Contribution,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "camelCase")]
pub enum Effect {
    Waiting(WaitingContent),
    Matched(MatchedContent),
    MatchAndReturn(MatchAndReturnContent),
    Refund(RefundContent),
}

fn check_contribution(contribution: &Contribution) -> DexResult {
    assert(contribution.amount > 0, DexError::ZeroAmount)?;
    assert(!contribution.token_id.is_empty(), DexError::InvalidInput)?;
    assert(contribution.amplifier >= BASE_AMPLIFIER, DexError::InvalidInput)
}

pub fn produce(state: &mut DexState, params: &Params) -> DexResult<Vec<DexInstruction>> {
    let incoming = params.contribution();
    check_contribution(&incoming)?;

    let effects = match state.waiting_contributions.get(&params.pair_hash) {
        None => vec![Effect::Waiting(WaitingContent {
            pair_hash: params.pair_hash.clone(),
            contribution: incoming,
        })],
        Some(waiting) => match match_contributions(state, &params.pair_hash, waiting, &incoming) {
            Ok(effects) => effects,
            Err(e) => {
                warn!("Contribution {} refunded: {}", params.pair_hash, e);
                [waiting.clone(), incoming]
                    .into_iter()
                    .map(|contribution| {
                        Effect::Refund(RefundContent {
                            pair_hash: params.pair_hash.clone(),
                            contribution,
                        })
                    })
                    .collect()
            }
        },
    };

    let mut instructions = Vec::with_capacity(effects.len());
    for effect in effects {
        process(state, &effect)?;
        instructions.push(DexInstruction::AddLiquidity(effect));
    }
    Ok(instructions)
}

fn match_contributions(
    state: &DexState,
    pair_hash: &str,
    waiting: &Contribution,
    incoming: &Contribution,
) -> DexResult<Vec<Effect>> {
    waiting.check_compatible(incoming)?;

    if waiting.pool_pair_id.is_empty() {
        let pool_pair_id =
            generate_pool_pair_id(&waiting.token_id, &incoming.token_id, &waiting.tx_req_id);
        assert(
            !state.pool_pairs.contains_key(&pool_pair_id),
            DexError::IncompatibleContribution,
        )?;
        let (_, share_amount) = PoolPair::init(waiting, incoming)?;
        assert(share_amount > 0, DexError::ZeroAmount)?;
        return Ok(vec![Effect::Matched(MatchedContent {
            pair_hash: pair_hash.to_string(),
            pool_pair_id,
            contribution: incoming.clone(),
            share_amount,
        })]);
    }

    let pool_pair = state.pool_pair(&waiting.pool_pair_id)?;
    assert(
        pool_pair.has_token(&waiting.token_id) && pool_pair.has_token(&incoming.token_id),
        DexError::IncompatibleContribution,
    )?;
    let (c0, c1) = pool_pair.contributions_by_order(waiting, incoming);
    let (actual0, returned0, actual1, returned1) =
        pool_pair.compute_actual_contributed_amounts(c0, c1)?;
    assert(actual0 > 0 && actual1 > 0, DexError::ZeroAmount)?;

    // dry run so that a failing deposit is refunded here rather than at apply time
    let mut preview = pool_pair.clone();
    let share_amount = preview.add_reserve_and_calculate_share(actual0, actual1)?;
    assert(share_amount > 0, DexError::ZeroAmount)?;
    preview.update_share_value(&c0.nft_id, share_amount, Operator::Add)?;

    let side = |c: &Contribution, actual, returned, other: &Contribution, other_actual, other_returned| {
        Effect::MatchAndReturn(MatchAndReturnContent {
            pair_hash: pair_hash.to_string(),
            pool_pair_id: waiting.pool_pair_id.clone(),
            contribution: c.clone(),
            share_amount,
            actual_amount: actual,
            returned_amount: returned,
            existed_token_id: other.token_id.clone(),
            existed_token_actual_amount: other_actual,
            existed_token_returned_amount: other_returned,
        })
    };
    Ok(vec![
        side(c0, actual0, returned0, c1, actual1, returned1),
        side(c1, actual1, returned1, c0, actual0, returned0),
    ])
}

pub fn process(state: &mut DexState, effect: &Effect) -> DexResult {
    match effect {
        Effect::Waiting(content) => {
            state
                .waiting_contributions
                .insert(content.pair_hash.clone(), content.contribution.clone());
        }
        Effect::Refund(content) => {
            // only the waiting side itself clears the pair hash
            if state.waiting_contributions.get(&content.pair_hash) == Some(&content.contribution) {
                state.waiting_contributions.remove(&content.pair_hash);
            }
        }
        Effect::Matched(content) => {
            let waiting = state
                .waiting_contributions
                .remove(&content.pair_hash)
                .ok_or(DexError::StateDivergence)?;
            let pool_pair_id = generate_pool_pair_id(
                &waiting.token_id,
                &content.contribution.token_id,
                &waiting.tx_req_id,
            );
            assert(
                pool_pair_id == content.pool_pair_id && !state.pool_pairs.contains_key(&pool_pair_id),
                DexError::StateDivergence,
            )?;
            let (pool_pair, share_amount) = PoolPair::init(&waiting, &content.contribution)?;
            assert(share_amount == content.share_amount, DexError::StateDivergence)?;
            state.insert_pool_pair(pool_pair_id, pool_pair);
        }
        Effect::MatchAndReturn(content) => {
            // the second instruction of a match only informs the refund of its side
            let waiting = match state.waiting_contributions.remove(&content.pair_hash) {
                Some(w) => w,
                None => return Ok(()),
            };
            let pool_pair = state.pool_pair_mut(&content.pool_pair_id)?;
            let (amount0, amount1) = if content.contribution.token_id == pool_pair.token0_id {
                (content.actual_amount, content.existed_token_actual_amount)
            } else {
                (content.existed_token_actual_amount, content.actual_amount)
            };
            let share_amount = pool_pair.add_reserve_and_calculate_share(amount0, amount1)?;
            assert(share_amount == content.share_amount, DexError::StateDivergence)?;
            pool_pair.update_share_value(&waiting.nft_id, share_amount, Operator::Add)?;
        }
    }
    Ok(())
}

pub fn refund(params: &Params) -> Vec<DexInstruction> {
    vec![DexInstruction::AddLiquidity(Effect::Refund(RefundContent {
        pair_hash: params.pair_hash.clone(),
        contribution: params.contribution(),
    }))]
}
