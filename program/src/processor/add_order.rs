use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    instruction::DexInstruction,
    processor::trade::distribute_trading_fee,
    state::{orderbook::Order, DexState, Identity, PoolPairId, TokenId, TradeDirection},
    utils::assert,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub pool_pair_id: PoolPairId,
    pub token_to_sell: TokenId,
    /// Total amount put in escrow, trading fee included
    pub sell_amount: u64,
    /// Least amount of the other token accepted for the whole order
    pub min_acceptable_amount: u64,
    pub trading_fee: u64,
    pub nft_id: Identity,
    pub receiver: String,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedOrder {
    pub pool_pair_id: PoolPairId,
    pub order: Order,
    pub fee_token: TokenId,
    pub trading_fee: u64,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundedOrder {
    pub receiver: String,
    pub token_to_sell: TokenId,
    pub amount: u64,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "camelCase")]
pub enum Effect {
    Accepted(AcceptedOrder),
    Refunded(RefundedOrder),
}

pub fn produce(state: &mut DexState, params: &Params) -> DexResult<Vec<DexInstruction>> {
    assert(
        params.sell_amount > 0 && params.min_acceptable_amount > 0,
        DexError::ZeroAmount,
    )?;
    assert(params.trading_fee < params.sell_amount, DexError::InsufficientFee)?;
    let pool_pair = state.pool_pair(&params.pool_pair_id)?;
    let direction = if params.token_to_sell == pool_pair.token0_id {
        TradeDirection::SellToken0
    } else if params.token_to_sell == pool_pair.token1_id {
        TradeDirection::SellToken1
    } else {
        return Err(DexError::InvalidInput);
    };
    let required_fee = state
        .params
        .required_trading_fee(params.sell_amount, std::slice::from_ref(&params.pool_pair_id));
    assert(params.trading_fee >= required_fee, DexError::InsufficientFee)?;
    assert(
        !pool_pair.order_book.contains(&params.tx_req_id),
        DexError::DuplicateOrder,
    )?;
    assert(
        pool_pair.order_book.count_by_nft(&params.nft_id) < state.params.max_orders_per_nft as usize,
        DexError::TooManyOrders,
    )?;

    let balance = params.sell_amount - params.trading_fee;
    let order = match direction {
        TradeDirection::SellToken0 => Order::new(
            params.tx_req_id.clone(),
            params.nft_id.clone(),
            direction,
            balance,
            params.min_acceptable_amount,
            balance,
            0,
        ),
        TradeDirection::SellToken1 => Order::new(
            params.tx_req_id.clone(),
            params.nft_id.clone(),
            direction,
            params.min_acceptable_amount,
            balance,
            0,
            balance,
        ),
    };
    let effect = Effect::Accepted(AcceptedOrder {
        pool_pair_id: params.pool_pair_id.clone(),
        order,
        fee_token: params.token_to_sell.clone(),
        trading_fee: params.trading_fee,
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    });
    process(state, &effect)?;
    Ok(vec![DexInstruction::AddOrder(effect)])
}

pub fn process(state: &mut DexState, effect: &Effect) -> DexResult {
    let accepted = match effect {
        Effect::Accepted(accepted) => accepted,
        Effect::Refunded(_) => return Ok(()),
    };
    state
        .pool_pair_mut(&accepted.pool_pair_id)?
        .order_book
        .insert_order(accepted.order.clone())?;
    distribute_trading_fee(
        state,
        std::slice::from_ref(&accepted.pool_pair_id),
        &accepted.fee_token,
        accepted.trading_fee,
    )
}

pub fn refund(params: &Params) -> Vec<DexInstruction> {
    vec![DexInstruction::AddOrder(Effect::Refunded(RefundedOrder {
        receiver: params.receiver.clone(),
        token_to_sell: params.token_to_sell.clone(),
        amount: params.sell_amount,
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    }))]
}
