use std::collections::{BTreeMap, BTreeSet};

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    instruction::DexInstruction,
    matching::{maybe_accept_trade, Hop},
    state::{DexState, OrderId, PoolPairId, TokenId, TradeDirection},
    utils::assert,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub trade_path: Vec<PoolPairId>,
    pub token_to_sell: TokenId,
    /// Total amount put in escrow, trading fee included
    pub sell_amount: u64,
    pub min_acceptable_amount: u64,
    pub trading_fee: u64,
    pub receiver: String,
    pub refund_receiver: String,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedTrade {
    pub receiver: String,
    pub trade_path: Vec<PoolPairId>,
    pub token_to_buy: TokenId,
    pub amount: u64,
    /// `[token0_change, token1_change]` of each hop's reserves
    pub pair_changes: Vec<[BigInt; 2]>,
    /// Balance changes of the orders filled in each hop
    pub order_changes: Vec<BTreeMap<OrderId, [BigInt; 2]>>,
    pub fee_token: TokenId,
    pub trading_fee: u64,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundedTrade {
    pub receiver: String,
    pub token_to_sell: TokenId,
    pub amount: u64,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "camelCase")]
pub enum Effect {
    Accepted(AcceptedTrade),
    Refunded(RefundedTrade),
}

/// Walks the path from `token_to_sell`, returning each hop's direction and the token bought at
/// the end.
pub fn resolve_trade_path(
    state: &DexState,
    trade_path: &[PoolPairId],
    token_to_sell: &str,
) -> DexResult<(Vec<TradeDirection>, TokenId)> {
    assert(!trade_path.is_empty(), DexError::InvalidTradePath)?;
    let distinct: BTreeSet<&PoolPairId> = trade_path.iter().collect();
    assert(distinct.len() == trade_path.len(), DexError::InvalidTradePath)?;

    let mut directions = Vec::with_capacity(trade_path.len());
    let mut current = token_to_sell.to_string();
    for pool_pair_id in trade_path {
        let pool_pair = state.pool_pair(pool_pair_id)?;
        if pool_pair.token0_id == current {
            directions.push(TradeDirection::SellToken0);
            current = pool_pair.token1_id.clone();
        } else if pool_pair.token1_id == current {
            directions.push(TradeDirection::SellToken1);
            current = pool_pair.token0_id.clone();
        } else {
            return Err(DexError::InvalidTradePath);
        }
    }
    Ok((directions, current))
}

/// Splits a collected trading fee evenly over the pairs of a path, the remainder going to the
/// first one.
pub fn distribute_trading_fee(
    state: &mut DexState,
    trade_path: &[PoolPairId],
    fee_token: &str,
    fee: u64,
) -> DexResult {
    if fee == 0 || trade_path.is_empty() {
        return Ok(());
    }
    let hops = trade_path.len() as u64;
    let portion = fee / hops;
    let remainder = fee % hops;
    let params = state.params.clone();
    for (i, pool_pair_id) in trade_path.iter().enumerate() {
        let amount = if i == 0 { portion + remainder } else { portion };
        state
            .pool_pair_mut(pool_pair_id)?
            .add_trading_fee(fee_token, amount, &params)?;
    }
    Ok(())
}

pub fn produce(state: &mut DexState, params: &Params) -> DexResult<Vec<DexInstruction>> {
    assert(params.sell_amount > 0, DexError::ZeroAmount)?;
    let (directions, token_to_buy) =
        resolve_trade_path(state, &params.trade_path, &params.token_to_sell)?;
    let required_fee = state
        .params
        .required_trading_fee(params.sell_amount, &params.trade_path);
    assert(params.trading_fee >= required_fee, DexError::InsufficientFee)?;

    let mut hops = Vec::with_capacity(params.trade_path.len());
    for (pool_pair_id, direction) in params.trade_path.iter().zip(directions) {
        let pool_pair = state.pool_pair(pool_pair_id)?;
        hops.push(Hop {
            direction,
            reserves: &pool_pair.reserves,
            order_book: &pool_pair.order_book,
        });
    }
    let settlement = maybe_accept_trade(
        params.sell_amount,
        params.trading_fee,
        &hops,
        params.min_acceptable_amount,
    )?;

    let effect = Effect::Accepted(AcceptedTrade {
        receiver: params.receiver.clone(),
        trade_path: params.trade_path.clone(),
        token_to_buy,
        amount: settlement.amount,
        pair_changes: settlement.pair_changes,
        order_changes: settlement.order_changes,
        fee_token: params.token_to_sell.clone(),
        trading_fee: params.trading_fee,
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    });
    process(state, &effect)?;
    Ok(vec![DexInstruction::Trade(effect)])
}

pub fn process(state: &mut DexState, effect: &Effect) -> DexResult {
    let trade = match effect {
        Effect::Accepted(trade) => trade,
        Effect::Refunded(_) => return Ok(()),
    };
    let hops = trade.trade_path.len();
    assert(
        trade.pair_changes.len() == hops && trade.order_changes.len() == hops,
        DexError::InvalidInstructionData,
    )?;
    for (i, pool_pair_id) in trade.trade_path.iter().enumerate() {
        let pool_pair = state.pool_pair_mut(pool_pair_id)?;
        let [change0, change1] = &trade.pair_changes[i];
        pool_pair.reserves.apply_reserve_changes(change0, change1)?;
        for (order_id, [change0, change1]) in &trade.order_changes[i] {
            pool_pair
                .order_book
                .get_order_mut(order_id)
                .ok_or(DexError::OrderNotFound)?
                .apply_balance_changes(change0, change1)?;
        }
    }
    distribute_trading_fee(state, &trade.trade_path, &trade.fee_token, trade.trading_fee)
}

pub fn refund(params: &Params) -> Vec<DexInstruction> {
    vec![DexInstruction::Trade(Effect::Refunded(RefundedTrade {
        receiver: params.refund_receiver.clone(),
        token_to_sell: params.token_to_sell.clone(),
        amount: params.sell_amount,
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    }))]
}
