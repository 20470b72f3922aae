use std::cmp::Ordering;

use borsh::{BorshDeserialize, BorshSerialize};
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    state::{Identity, OrderId, TradeDirection},
    utils::{bigint_to_u64, mul_div_u64},
};

/// A resting limit order.
///
/// `token0_rate : token1_rate` is the exchange ratio the owner accepts. The balances hold what is
/// left to sell on the order's own side and the proceeds collected on the other side.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Order {
    pub id: OrderId,
    pub nft_id: Identity,
    pub trade_direction: TradeDirection,
    pub token0_rate: u64,
    pub token1_rate: u64,
    pub token0_balance: u64,
    pub token1_balance: u64,
    /// Insertion sequence number inside the owning book
    pub seq: u64,
}

impl Order {
    pub fn new(
        id: OrderId,
        nft_id: Identity,
        trade_direction: TradeDirection,
        token0_rate: u64,
        token1_rate: u64,
        token0_balance: u64,
        token1_balance: u64,
    ) -> Self {
        Self {
            id,
            nft_id,
            trade_direction,
            token0_rate,
            token1_rate,
            token0_balance,
            token1_balance,
            seq: 0,
        }
    }

    pub fn sell_balance(&self) -> u64 {
        match self.trade_direction {
            TradeDirection::SellToken0 => self.token0_balance,
            TradeDirection::SellToken1 => self.token1_balance,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.sell_balance() == 0
    }

    /// Fills this order against a trade selling at most `max_sell_amount`.
    ///
    /// Returns `(buy_amount, sell_amount_remain, token0_change, token1_change)` where the changes
    /// are those of the order's balances. A fill that would round down to nothing leaves the
    /// order untouched and hands the whole budget back.
    pub fn match_trade(
        &mut self,
        max_sell_amount: u64,
        trade_direction: TradeDirection,
    ) -> DexResult<(u64, u64, BigInt, BigInt)> {
        if trade_direction == self.trade_direction {
            return Err(DexError::SameDirectionOrder);
        }
        // rate_in is paid by the taker, rate_out is paid by the order
        let (rate_in, rate_out, balance_out) = match trade_direction {
            TradeDirection::SellToken0 => (self.token0_rate, self.token1_rate, self.token1_balance),
            TradeDirection::SellToken1 => (self.token1_rate, self.token0_rate, self.token0_balance),
        };
        if rate_in == 0 || rate_out == 0 {
            return Err(DexError::InvalidInput);
        }
        let max_buy = (max_sell_amount as u128) * (rate_out as u128) / (rate_in as u128);
        if max_buy == 0 {
            return Ok((0, max_sell_amount, BigInt::zero(), BigInt::zero()));
        }
        let (buy, sold) = if max_buy <= balance_out as u128 {
            (max_buy as u64, max_sell_amount)
        } else {
            let exact = mul_div_u64(balance_out, rate_in, rate_out)?;
            let sold = if (balance_out as u128) * (rate_in as u128) % (rate_out as u128) == 0 {
                exact
            } else {
                exact + 1
            };
            (balance_out, sold)
        };

        let (change0, change1) = match trade_direction {
            TradeDirection::SellToken0 => (BigInt::from(sold), -BigInt::from(buy)),
            TradeDirection::SellToken1 => (-BigInt::from(buy), BigInt::from(sold)),
        };
        self.apply_balance_changes(&change0, &change1)?;
        Ok((buy, max_sell_amount - sold, change0, change1))
    }

    /// Adds signed deltas to both balances, failing without writing if either leaves `u64` range.
    pub fn apply_balance_changes(&mut self, change0: &BigInt, change1: &BigInt) -> DexResult {
        let b0 = bigint_to_u64(&(BigInt::from(self.token0_balance) + change0))?;
        let b1 = bigint_to_u64(&(BigInt::from(self.token1_balance) + change1))?;
        self.token0_balance = b0;
        self.token1_balance = b1;
        Ok(())
    }
}

/// `Less` when `a` must be offered to takers before `b`. Both orders are on the same side.
fn priority(a: &Order, b: &Order) -> Ordering {
    // takers of a sell1 order want the most token1 per token0, and vice versa
    let (a_num, a_den, b_num, b_den) = match a.trade_direction {
        TradeDirection::SellToken1 => (a.token1_rate, a.token0_rate, b.token1_rate, b.token0_rate),
        TradeDirection::SellToken0 => (a.token0_rate, a.token1_rate, b.token0_rate, b.token1_rate),
    };
    let lhs = (a_num as u128) * (b_den as u128);
    let rhs = (b_num as u128) * (a_den as u128);
    rhs.cmp(&lhs).then(a.seq.cmp(&b.seq))
}

/// The resting orders of one pool pair, one side per selling token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    sell0: Vec<Order>,
    sell1: Vec<Order>,
    next_seq: u64,
}

impl OrderBook {
    pub fn get_side(&self, side: TradeDirection) -> &Vec<Order> {
        match side {
            TradeDirection::SellToken0 => &self.sell0,
            TradeDirection::SellToken1 => &self.sell1,
        }
    }

    pub fn get_side_mut(&mut self, side: TradeDirection) -> &mut Vec<Order> {
        match side {
            TradeDirection::SellToken0 => &mut self.sell0,
            TradeDirection::SellToken1 => &mut self.sell1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sell0.is_empty() && self.sell1.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sell0.len() + self.sell1.len()
    }

    /// Inserts `order` behind every order with a better or equal rate.
    pub fn insert_order(&mut self, mut order: Order) -> DexResult {
        if self.contains(&order.id) {
            return Err(DexError::DuplicateOrder);
        }
        order.seq = self.next_seq;
        self.next_seq += 1;
        let side = self.get_side_mut(order.trade_direction);
        let index = side.partition_point(|o| priority(o, &order) == Ordering::Less);
        side.insert(index, order);
        Ok(())
    }

    /// Index, on the side opposite to `trade_direction`, of the first order at or after `from`
    /// that still has something to sell.
    pub fn next_order(&self, trade_direction: TradeDirection, from: usize) -> Option<usize> {
        let side = self.get_side(trade_direction.opposite());
        (from..side.len()).find(|&i| !side[i].is_exhausted())
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.sell0.iter().chain(self.sell1.iter())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.orders().any(|o| o.id == id)
    }

    pub fn get_order(&self, id: &str) -> Option<&Order> {
        self.orders().find(|o| o.id == id)
    }

    pub fn get_order_mut(&mut self, id: &str) -> Option<&mut Order> {
        self.sell0
            .iter_mut()
            .chain(self.sell1.iter_mut())
            .find(|o| o.id == id)
    }

    pub fn remove_order(&mut self, id: &str) -> Option<Order> {
        for side in [&mut self.sell0, &mut self.sell1] {
            if let Some(i) = side.iter().position(|o| o.id == id) {
                return Some(side.remove(i));
            }
        }
        None
    }

    pub fn count_by_nft(&self, nft_id: &str) -> usize {
        self.orders().filter(|o| o.nft_id == nft_id).count()
    }
}
