//! Multi-hop trade execution against pool liquidity and resting orders.
//!
//! Every hop works on its own copy of the pair's reserves and order book. Nothing the caller
//! holds is touched: the result lists the reserve and order balance changes of each hop, and the
//! caller applies them once the whole path has been accepted.
use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::{
    error::{DexError, DexResult},
    state::{orderbook::OrderBook, reserves::Reserves, OrderId, TradeDirection},
};

/// One pool pair of a trade path, as seen by the executor.
pub struct Hop<'a> {
    pub direction: TradeDirection,
    pub reserves: &'a Reserves,
    pub order_book: &'a OrderBook,
}

/// Balance changes produced by an accepted trade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// `[token0_change, token1_change]` of each hop's reserves
    pub pair_changes: Vec<[BigInt; 2]>,
    /// `[token0_change, token1_change]` of each order filled in each hop
    pub order_changes: Vec<BTreeMap<OrderId, [BigInt; 2]>>,
    /// Output of the last hop
    pub amount: u64,
}

fn add_checked(total: u64, amount: u64) -> DexResult<u64> {
    total.checked_add(amount).ok_or(DexError::ArithmeticOverflow)
}

/// Sells `sell_amount - fee` through `hops`, alternating between swapping in the pool up to the
/// next order's rate and filling that order.
pub fn maybe_accept_trade(
    sell_amount: u64,
    fee: u64,
    hops: &[Hop],
    min_acceptable_amount: u64,
) -> DexResult<Settlement> {
    if hops.is_empty() {
        return Err(DexError::InvalidTradePath);
    }
    let mut sell_amount_remain = sell_amount
        .checked_sub(fee)
        .ok_or(DexError::InsufficientFee)?;
    let mut settlement = Settlement {
        pair_changes: Vec::with_capacity(hops.len()),
        order_changes: Vec::with_capacity(hops.len()),
        amount: 0,
    };

    let mut total_buy_amount = 0;
    for hop in hops {
        let mut reserves = hop.reserves.clone();
        let mut order_book = hop.order_book.clone();
        let mut order_changes = BTreeMap::new();
        let mut accumulated0 = BigInt::default();
        let mut accumulated1 = BigInt::default();
        total_buy_amount = 0;

        let mut cursor = 0;
        loop {
            let next = order_book.next_order(hop.direction, cursor);
            let order = next.map(|i| &order_book.get_side(hop.direction.opposite())[i]);
            let (buy, remain, change0, change1) =
                reserves.swap_to_reach_order_rate(sell_amount_remain, hop.direction, order)?;
            sell_amount_remain = remain;
            total_buy_amount = add_checked(total_buy_amount, buy)?;
            accumulated0 += change0;
            accumulated1 += change1;
            if sell_amount_remain == 0 {
                break;
            }
            let index = match next {
                Some(i) => i,
                None => break,
            };

            let order = &mut order_book.get_side_mut(hop.direction.opposite())[index];
            let (buy, remain, change0, change1) =
                order.match_trade(sell_amount_remain, hop.direction)?;
            sell_amount_remain = remain;
            total_buy_amount = add_checked(total_buy_amount, buy)?;
            if buy > 0 {
                order_changes.insert(order.id.clone(), [change0, change1]);
            }
            if sell_amount_remain == 0 {
                break;
            }
            cursor = index + 1;
        }

        settlement.pair_changes.push([accumulated0, accumulated1]);
        settlement.order_changes.push(order_changes);
        sell_amount_remain = total_buy_amount;
    }

    if total_buy_amount < min_acceptable_amount {
        return Err(DexError::MinAmountNotReached);
    }
    settlement.amount = total_buy_amount;
    Ok(settlement)
}
