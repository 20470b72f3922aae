#![allow(dead_code)]
use lazy_static::lazy_static;
use pdex_engine::entrypoint::{process_instructions, produce_instructions};
use pdex_engine::processor::{
    add_liquidity, add_order, trade, withdraw_liquidity, withdraw_lp_fee, withdraw_order,
    withdraw_protocol_fee, Request,
};
use pdex_engine::state::{params::BASE_AMPLIFIER, DexState};

pub const POOL: &str = "a-b-seed";

lazy_static! {
    /// One unamplified pair `a-b-seed` holding 100_000 of each token, all shares owned by
    /// `alice`.
    pub static ref SEEDED_STATE: DexState = {
        let requests = vec![
            contribute("a", 100_000, "seed", "seed", "", BASE_AMPLIFIER, "alice"),
            contribute("b", 100_000, "seed", "seed-2", "", BASE_AMPLIFIER, "alice"),
        ];
        let (_, state) = produce_instructions(&DexState::default(), &requests).unwrap();
        state
    };
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Produces a batch, replays the instructions on the same starting state and checks that both
/// sides agree.
pub fn run_batch(state: &DexState, requests: &[Request]) -> (Vec<Vec<String>>, DexState) {
    let (instructions, produced) = produce_instructions(state, requests).unwrap();
    let processed = process_instructions(state, &instructions).unwrap();
    assert_eq!(produced, processed);
    assert_eq!(
        serde_json::to_string(&produced).unwrap(),
        serde_json::to_string(&processed).unwrap()
    );
    processed.check_invariants().unwrap();
    (instructions, processed)
}

/// `(metaType, status)` of every instruction.
pub fn statuses(instructions: &[Vec<String>]) -> Vec<(String, String)> {
    instructions
        .iter()
        .map(|i| (i[0].clone(), i[1].clone()))
        .collect()
}

pub fn payload(instruction: &[String]) -> serde_json::Value {
    serde_json::from_str(&instruction[2]).unwrap()
}

pub fn contribute(
    token: &str,
    amount: u64,
    pair_hash: &str,
    tx_req_id: &str,
    pool_pair_id: &str,
    amplifier: u32,
    nft_id: &str,
) -> Request {
    Request::AddLiquidity(add_liquidity::Params {
        pool_pair_id: pool_pair_id.to_string(),
        pair_hash: pair_hash.to_string(),
        receiver: format!("{}-receiver", nft_id),
        token_id: token.to_string(),
        token_amount: amount,
        amplifier,
        nft_id: nft_id.to_string(),
        tx_req_id: tx_req_id.to_string(),
        shard_id: 0,
    })
}

pub fn trade(
    path: &[&str],
    token_to_sell: &str,
    sell_amount: u64,
    trading_fee: u64,
    min_acceptable_amount: u64,
    tx_req_id: &str,
) -> Request {
    Request::Trade(trade::Params {
        trade_path: path.iter().map(|p| p.to_string()).collect(),
        token_to_sell: token_to_sell.to_string(),
        sell_amount,
        min_acceptable_amount,
        trading_fee,
        receiver: "trader".to_string(),
        refund_receiver: "trader-refund".to_string(),
        tx_req_id: tx_req_id.to_string(),
        shard_id: 1,
    })
}

pub fn add_order(
    pool_pair_id: &str,
    token_to_sell: &str,
    sell_amount: u64,
    trading_fee: u64,
    min_acceptable_amount: u64,
    nft_id: &str,
    tx_req_id: &str,
) -> Request {
    Request::AddOrder(add_order::Params {
        pool_pair_id: pool_pair_id.to_string(),
        token_to_sell: token_to_sell.to_string(),
        sell_amount,
        min_acceptable_amount,
        trading_fee,
        nft_id: nft_id.to_string(),
        receiver: format!("{}-receiver", nft_id),
        tx_req_id: tx_req_id.to_string(),
        shard_id: 0,
    })
}

pub fn withdraw_order(
    pool_pair_id: &str,
    order_id: &str,
    token_id: &str,
    amount: u64,
    nft_id: &str,
    tx_req_id: &str,
) -> Request {
    Request::WithdrawOrder(withdraw_order::Params {
        pool_pair_id: pool_pair_id.to_string(),
        order_id: order_id.to_string(),
        token_id: token_id.to_string(),
        amount,
        nft_id: nft_id.to_string(),
        receiver: format!("{}-receiver", nft_id),
        tx_req_id: tx_req_id.to_string(),
        shard_id: 0,
    })
}

pub fn withdraw_liquidity(
    pool_pair_id: &str,
    nft_id: &str,
    share_amount: u64,
    tx_req_id: &str,
) -> Request {
    Request::WithdrawLiquidity(withdraw_liquidity::Params {
        pool_pair_id: pool_pair_id.to_string(),
        nft_id: nft_id.to_string(),
        share_amount,
        receiver: format!("{}-receiver", nft_id),
        tx_req_id: tx_req_id.to_string(),
        shard_id: 0,
    })
}

pub fn withdraw_lp_fee(pool_pair_id: &str, nft_id: &str, tx_req_id: &str) -> Request {
    Request::WithdrawLpFee(withdraw_lp_fee::Params {
        pool_pair_id: pool_pair_id.to_string(),
        nft_id: nft_id.to_string(),
        receiver: format!("{}-receiver", nft_id),
        tx_req_id: tx_req_id.to_string(),
        shard_id: 0,
    })
}

pub fn withdraw_protocol_fee(pool_pair_id: &str, tx_req_id: &str) -> Request {
    Request::WithdrawProtocolFee(withdraw_protocol_fee::Params {
        pool_pair_id: pool_pair_id.to_string(),
        receiver: "protocol".to_string(),
        tx_req_id: tx_req_id.to_string(),
        shard_id: 0,
    })
}
