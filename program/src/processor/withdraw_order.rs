use serde::{Deserialize, Serialize};

use crate::{
    error::{DexError, DexResult},
    instruction::{DexInstruction, RejectedContent},
    state::{DexState, Identity, OrderId, PoolPairId, TokenId},
    utils::assert,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub pool_pair_id: PoolPairId,
    pub order_id: OrderId,
    pub token_id: TokenId,
    /// Zero withdraws the whole balance of `token_id`
    pub amount: u64,
    pub nft_id: Identity,
    pub receiver: String,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedWithdrawOrder {
    pub pool_pair_id: PoolPairId,
    pub order_id: OrderId,
    pub token_id: TokenId,
    pub amount: u64,
    pub receiver: String,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "camelCase")]
pub enum Effect {
    Accepted(AcceptedWithdrawOrder),
    Rejected(RejectedContent),
}

pub fn produce(state: &mut DexState, params: &Params) -> DexResult<Vec<DexInstruction>> {
    let pool_pair = state.pool_pair(&params.pool_pair_id)?;
    let order = pool_pair
        .order_book
        .get_order(&params.order_id)
        .ok_or(DexError::OrderNotFound)?;
    assert(order.nft_id == params.nft_id, DexError::InvalidInput)?;
    let balance = if params.token_id == pool_pair.token0_id {
        order.token0_balance
    } else if params.token_id == pool_pair.token1_id {
        order.token1_balance
    } else {
        return Err(DexError::InvalidInput);
    };
    assert(balance > 0, DexError::ZeroAmount)?;
    let amount = if params.amount == 0 {
        balance
    } else {
        params.amount.min(balance)
    };

    let effect = Effect::Accepted(AcceptedWithdrawOrder {
        pool_pair_id: params.pool_pair_id.clone(),
        order_id: params.order_id.clone(),
        token_id: params.token_id.clone(),
        amount,
        receiver: params.receiver.clone(),
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    });
    process(state, &effect)?;
    Ok(vec![DexInstruction::WithdrawOrder(effect)])
}

pub fn process(state: &mut DexState, effect: &Effect) -> DexResult {
    let accepted = match effect {
        Effect::Accepted(accepted) => accepted,
        Effect::Rejected(_) => return Ok(()),
    };
    let pool_pair = state.pool_pair_mut(&accepted.pool_pair_id)?;
    let is_token0 = if accepted.token_id == pool_pair.token0_id {
        true
    } else if accepted.token_id == pool_pair.token1_id {
        false
    } else {
        return Err(DexError::StateDivergence);
    };
    let order = pool_pair
        .order_book
        .get_order_mut(&accepted.order_id)
        .ok_or(DexError::OrderNotFound)?;
    let balance = if is_token0 {
        &mut order.token0_balance
    } else {
        &mut order.token1_balance
    };
    *balance = balance
        .checked_sub(accepted.amount)
        .ok_or(DexError::StateDivergence)?;
    if order.token0_balance == 0 && order.token1_balance == 0 {
        pool_pair.order_book.remove_order(&accepted.order_id);
    }
    Ok(())
}

pub fn refund(params: &Params) -> Vec<DexInstruction> {
    vec![DexInstruction::WithdrawOrder(Effect::Rejected(RejectedContent {
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    }))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        contribution::Contribution, orderbook::Order, params::BASE_AMPLIFIER, PoolPair,
        TradeDirection,
    };

    fn contribution(token: &str, amount: u64) -> Contribution {
        Contribution {
            pool_pair_id: String::new(),
            receiver: "r".to_string(),
            token_id: token.to_string(),
            amount,
            amplifier: BASE_AMPLIFIER,
            nft_id: "lp".to_string(),
            tx_req_id: "tx".to_string(),
            shard_id: 0,
        }
    }

    fn state_with_order() -> DexState {
        let mut state = DexState::default();
        let (mut pair, _) =
            PoolPair::init(&contribution("a", 1_000), &contribution("b", 1_000)).unwrap();
        pair.order_book
            .insert_order(Order::new(
                "o".to_string(),
                "maker".to_string(),
                TradeDirection::SellToken1,
                10,
                10,
                5,
                7,
            ))
            .unwrap();
        state.insert_pool_pair("a-b-tx".to_string(), pair);
        state
    }

    fn accepted(token_id: &str, amount: u64) -> Effect {
        Effect::Accepted(AcceptedWithdrawOrder {
            pool_pair_id: "a-b-tx".to_string(),
            order_id: "o".to_string(),
            token_id: token_id.to_string(),
            amount,
            receiver: "r".to_string(),
            tx_req_id: "w".to_string(),
            shard_id: 0,
        })
    }

    #[test]
    fn foreign_token_record_diverges() {
        let mut state = state_with_order();
        let before = state.clone();
        assert_eq!(
            process(&mut state, &accepted("c", 3)),
            Err(DexError::StateDivergence)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn withdraw_each_side_then_remove() {
        let mut state = state_with_order();
        process(&mut state, &accepted("a", 5)).unwrap();
        let order = state.pool_pair("a-b-tx").unwrap().order_book.get_order("o").unwrap();
        assert_eq!((order.token0_balance, order.token1_balance), (0, 7));
        assert_eq!(
            process(&mut state.clone(), &accepted("b", 8)),
            Err(DexError::StateDivergence)
        );
        process(&mut state, &accepted("b", 7)).unwrap();
        assert!(state.pool_pair("a-b-tx").unwrap().order_book.is_empty());
    }
}
