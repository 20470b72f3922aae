use assert_matches::assert_matches;
use pdex_engine::entrypoint::{process_instructions, produce_instructions};
use pdex_engine::error::DexError;
use pdex_engine::state::{
    params::BASE_AMPLIFIER,
    state_change::{get_record, MemoryStorage, PoolPairRecord, StorageKey, SubKey},
    DexState,
};
pub mod common;
use crate::common::utils::{
    add_order, contribute, init_logger, payload, run_batch, statuses, trade, withdraw_liquidity,
    withdraw_lp_fee, withdraw_order, withdraw_protocol_fee, POOL, SEEDED_STATE,
};

fn pair(s: &str, t: &str) -> (String, String) {
    (s.to_string(), t.to_string())
}

#[test]
fn test_new_pair_from_two_contributions() {
    init_logger();
    let requests = vec![
        contribute("b", 800, "hash", "tx1", "", BASE_AMPLIFIER, "alice"),
        contribute("a", 200, "hash", "tx2", "", BASE_AMPLIFIER, "alice"),
    ];
    let (instructions, state) = run_batch(&DexState::default(), &requests);
    assert_eq!(
        statuses(&instructions),
        vec![pair("281", "waiting"), pair("281", "matched")]
    );
    assert_eq!(payload(&instructions[1])["pool_pair_id"], "a-b-tx1");

    let pool_pair = state.pool_pair("a-b-tx1").unwrap();
    assert_eq!(pool_pair.token0_id, "a");
    assert_eq!(
        (pool_pair.reserves.token0_real, pool_pair.reserves.token1_real),
        (200, 800)
    );
    assert_eq!(pool_pair.share_amount, 400);
    assert_eq!(pool_pair.shares["alice"].amount, 400);
    assert!(state.waiting_contributions.is_empty());
}

#[test]
fn test_refund_on_amplifier_mismatch() {
    init_logger();
    let requests = vec![
        contribute("a", 200, "hash", "tx1", "", BASE_AMPLIFIER, "alice"),
        contribute("b", 800, "hash", "tx2", "", BASE_AMPLIFIER + 1, "alice"),
    ];
    let (instructions, state) = run_batch(&DexState::default(), &requests);
    assert_eq!(
        statuses(&instructions),
        vec![
            pair("281", "waiting"),
            pair("281", "refund"),
            pair("281", "refund")
        ]
    );
    assert!(state.pool_pairs.is_empty());
    assert!(state.waiting_contributions.is_empty());
}

#[test]
fn test_contribution_to_existing_pair_returns_excess() {
    init_logger();
    let setup = vec![
        contribute("a", 200, "p", "t1", "", BASE_AMPLIFIER, "alice"),
        contribute("b", 800, "p", "t2", "", BASE_AMPLIFIER, "alice"),
    ];
    let (_, state) = run_batch(&DexState::default(), &setup);

    let requests = vec![
        contribute("b", 1000, "q", "t3", "a-b-t1", BASE_AMPLIFIER, "bob"),
        contribute("a", 50, "q", "t4", "a-b-t1", BASE_AMPLIFIER, "bob"),
    ];
    let (instructions, state) = run_batch(&state, &requests);
    assert_eq!(
        statuses(&instructions),
        vec![
            pair("281", "waiting"),
            pair("281", "matchAndReturn"),
            pair("281", "matchAndReturn")
        ]
    );
    let token0_side = payload(&instructions[1]);
    assert_eq!(token0_side["contribution"]["token_id"], "a");
    assert_eq!(token0_side["actual_amount"], 50);
    assert_eq!(token0_side["returned_amount"], 0);
    assert_eq!(token0_side["existed_token_actual_amount"], 200);
    assert_eq!(token0_side["existed_token_returned_amount"], 800);
    assert_eq!(token0_side["share_amount"], 100);

    let pool_pair = state.pool_pair("a-b-t1").unwrap();
    assert_eq!(
        (pool_pair.reserves.token0_real, pool_pair.reserves.token1_real),
        (250, 1000)
    );
    assert_eq!(pool_pair.shares["bob"].amount, 100);

    // contributing then withdrawing every share gives the deposit back
    let (instructions, state) =
        run_batch(&state, &[withdraw_liquidity("a-b-t1", "bob", 100, "t5")]);
    assert_eq!(statuses(&instructions), vec![pair("283", "accepted")]);
    let accepted = payload(&instructions[0]);
    assert_eq!(accepted["token0_amount"], 50);
    assert_eq!(accepted["token1_amount"], 200);
    let pool_pair = state.pool_pair("a-b-t1").unwrap();
    assert!(!pool_pair.shares.contains_key("bob"));
    assert_eq!(pool_pair.share_amount, 400);
}

#[test]
fn test_withdraw_liquidity_rejections() {
    init_logger();
    let requests = vec![
        withdraw_liquidity(POOL, "nobody", 10, "w1"),
        withdraw_liquidity(POOL, "alice", 0, "w2"),
        withdraw_liquidity("missing", "alice", 10, "w3"),
    ];
    let (instructions, state) = run_batch(&SEEDED_STATE, &requests);
    assert!(statuses(&instructions)
        .iter()
        .all(|s| *s == pair("283", "rejected")));
    assert_eq!(state, *SEEDED_STATE);
}

#[test]
fn test_trade_and_fees() {
    init_logger();
    let (instructions, state) = run_batch(&SEEDED_STATE, &[trade(&[POOL], "a", 10_000, 30, 0, "t1")]);
    assert_eq!(statuses(&instructions), vec![pair("285", "accepted")]);
    let accepted = payload(&instructions[0]);
    assert_eq!(accepted["amount"], 9066);
    assert_eq!(accepted["token_to_buy"], "b");

    let pool_pair = state.pool_pair(POOL).unwrap();
    assert_eq!(
        (pool_pair.reserves.token0_real, pool_pair.reserves.token1_real),
        (109_970, 90_934)
    );
    assert_eq!(pool_pair.staking_pool_fees["a"], 3);

    // only the modified records are written
    let change = state.get_diff(&SEEDED_STATE);
    let mut db = MemoryStorage::default();
    state.store_to_db(&change, &mut db).unwrap();
    let record: PoolPairRecord = get_record(&db, &StorageKey::new(POOL, SubKey::PoolPair))
        .unwrap()
        .unwrap();
    assert_eq!(record.token0_real, 109_970);
    assert_eq!(
        get_record::<u64, _>(&db, &StorageKey::new(POOL, SubKey::StakingPoolFee("a".into())))
            .unwrap(),
        Some(3)
    );
    assert_eq!(
        get_record::<u64, _>(&db, &StorageKey::new(POOL, SubKey::Share("alice".into()))).unwrap(),
        None
    );

    let requests = vec![
        withdraw_lp_fee(POOL, "alice", "f1"),
        withdraw_lp_fee(POOL, "alice", "f2"),
        withdraw_protocol_fee(POOL, "f3"),
    ];
    let (instructions, state) = run_batch(&state, &requests);
    assert_eq!(
        statuses(&instructions),
        vec![
            pair("297", "accepted"),
            pair("297", "rejected"),
            pair("299", "rejected")
        ]
    );
    assert_eq!(payload(&instructions[0])["amounts"]["a"], 27);
    assert!(state.pool_pair(POOL).unwrap().recompute_lp_fee("alice").unwrap().is_empty());
}

#[test]
fn test_trade_refunds() {
    init_logger();
    let requests = vec![
        // required fee is 30
        trade(&[POOL], "a", 10_000, 29, 0, "t1"),
        trade(&[POOL], "a", 10_000, 30, 9_067, "t2"),
        trade(&[POOL, POOL], "a", 10_000, 60, 0, "t3"),
        trade(&[POOL], "c", 10_000, 30, 0, "t4"),
        trade(&["missing"], "a", 10_000, 30, 0, "t5"),
    ];
    let (instructions, state) = run_batch(&SEEDED_STATE, &requests);
    assert!(statuses(&instructions)
        .iter()
        .all(|s| *s == pair("285", "refunded")));
    let refund = payload(&instructions[0]);
    assert_eq!(refund["amount"], 10_000);
    assert_eq!(refund["receiver"], "trader-refund");
    assert_eq!(state, *SEEDED_STATE);
}

#[test]
fn test_multi_hop_trade_is_all_or_nothing() {
    init_logger();
    let setup = vec![
        contribute("b", 50_000, "bc", "bc", "", BASE_AMPLIFIER, "carol"),
        contribute("c", 50_000, "bc", "bc-2", "", BASE_AMPLIFIER, "carol"),
        add_order(POOL, "b", 10_030, 30, 10_500, "maker", "order-1"),
    ];
    let (_, state) = run_batch(&SEEDED_STATE, &setup);

    // the first hop fills the order, the output of the second hop is far below the minimum
    let (instructions, after) = run_batch(
        &state,
        &[trade(&[POOL, "b-c-bc"], "a", 20_000, 120, 1_000_000, "t1")],
    );
    assert_eq!(statuses(&instructions), vec![pair("285", "refunded")]);
    assert_eq!(payload(&instructions[0])["amount"], 20_000);
    assert_eq!(after, state);
    let order = after.pool_pair(POOL).unwrap().order_book.get_order("order-1").unwrap();
    assert_eq!((order.token0_balance, order.token1_balance), (0, 10_000));
    assert_eq!(
        after.pool_pair("b-c-bc").unwrap().reserves,
        state.pool_pair("b-c-bc").unwrap().reserves
    );

    // the same trade with a reachable minimum goes through the order
    let (instructions, after) =
        run_batch(&state, &[trade(&[POOL, "b-c-bc"], "a", 20_000, 120, 0, "t2")]);
    assert_eq!(statuses(&instructions), vec![pair("285", "accepted")]);
    let order = after.pool_pair(POOL).unwrap().order_book.get_order("order-1").unwrap();
    assert_eq!((order.token0_balance, order.token1_balance), (10_500, 0));
}

#[test]
fn test_multi_hop_trade() {
    init_logger();
    let setup = vec![
        contribute("b", 50_000, "bc", "bc", "", BASE_AMPLIFIER, "carol"),
        contribute("c", 50_000, "bc", "bc-2", "", BASE_AMPLIFIER, "carol"),
    ];
    let (_, state) = run_batch(&SEEDED_STATE, &setup);
    let (instructions, state) =
        run_batch(&state, &[trade(&[POOL, "b-c-bc"], "a", 10_000, 60, 0, "t1")]);
    let accepted = payload(&instructions[0]);
    assert_eq!(accepted["amount"], 7656);
    assert_eq!(accepted["token_to_buy"], "c");

    let first = state.pool_pair(POOL).unwrap();
    assert_eq!(first.reserves.token1_real, 100_000 - 9041);
    let second = state.pool_pair("b-c-bc").unwrap();
    assert_eq!(
        (second.reserves.token0_real, second.reserves.token1_real),
        (50_000 + 9041, 50_000 - 7656)
    );
    // the fee is paid in the sold token and split between both pairs
    assert_eq!(first.staking_pool_fees["a"], 3);
    assert_eq!(second.staking_pool_fees["a"], 3);
}

#[test]
fn test_order_lifecycle() {
    init_logger();
    let requests = vec![
        // 10_000 b for at least 10_500 a, after a 30 b fee
        add_order(POOL, "b", 10_030, 30, 10_500, "maker", "order-1"),
        add_order(POOL, "b", 10_030, 30, 10_500, "maker", "order-1"),
        add_order(POOL, "c", 10_030, 30, 10_500, "maker", "order-2"),
    ];
    let (instructions, state) = run_batch(&SEEDED_STATE, &requests);
    assert_eq!(
        statuses(&instructions),
        vec![
            pair("287", "accepted"),
            pair("287", "refunded"),
            pair("287", "refunded")
        ]
    );
    let order = state.pool_pair(POOL).unwrap().order_book.get_order("order-1").unwrap();
    assert_eq!((order.token0_rate, order.token1_rate), (10_500, 10_000));
    assert_eq!(order.token1_balance, 10_000);

    // 2469 in the pool, the whole order for 10_500, and the rest in the pool
    let (instructions, state) = run_batch(&state, &[trade(&[POOL], "a", 20_000, 60, 0, "t1")]);
    let accepted = payload(&instructions[0]);
    assert_eq!(accepted["amount"], 18_625);
    let pool_pair = state.pool_pair(POOL).unwrap();
    assert_eq!(
        (pool_pair.reserves.token0_real, pool_pair.reserves.token1_real),
        (109_440, 91_375)
    );
    let order = pool_pair.order_book.get_order("order-1").unwrap();
    assert_eq!((order.token0_balance, order.token1_balance), (10_500, 0));

    let requests = vec![
        withdraw_order(POOL, "order-1", "a", 0, "someone-else", "w1"),
        withdraw_order(POOL, "order-1", "b", 0, "maker", "w2"),
        withdraw_order(POOL, "order-1", "a", 500, "maker", "w3"),
        withdraw_order(POOL, "order-1", "a", 0, "maker", "w4"),
    ];
    let (instructions, state) = run_batch(&state, &requests);
    assert_eq!(
        statuses(&instructions),
        vec![
            pair("289", "rejected"),
            pair("289", "rejected"),
            pair("289", "accepted"),
            pair("289", "accepted")
        ]
    );
    assert_eq!(payload(&instructions[3])["amount"], 10_000);
    assert!(state.pool_pair(POOL).unwrap().order_book.is_empty());
}

#[test]
fn test_order_limit_per_identity() {
    init_logger();
    let mut state = SEEDED_STATE.clone();
    state.params.max_orders_per_nft = 2;
    let requests: Vec<_> = (0..3)
        .map(|i| add_order(POOL, "a", 1_000, 3, 900, "maker", &format!("o{}", i)))
        .collect();
    let (instructions, state) = run_batch(&state, &requests);
    assert_eq!(statuses(&instructions)[2], pair("287", "refunded"));
    assert_eq!(state.pool_pair(POOL).unwrap().order_book.len(), 2);
}

#[test]
fn test_replay_is_deterministic() {
    init_logger();
    let requests = vec![
        add_order(POOL, "b", 10_030, 30, 10_500, "maker", "order-1"),
        trade(&[POOL], "a", 20_000, 60, 0, "t1"),
        contribute("a", 1_000, "h", "c1", POOL, BASE_AMPLIFIER, "bob"),
        contribute("b", 1_000, "h", "c2", POOL, BASE_AMPLIFIER, "bob"),
        withdraw_lp_fee(POOL, "alice", "f1"),
    ];
    let (instructions, _) = produce_instructions(&SEEDED_STATE, &requests).unwrap();
    let first = process_instructions(&SEEDED_STATE, &instructions).unwrap();
    let second = process_instructions(&SEEDED_STATE, &instructions).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    let (again, _) = produce_instructions(&SEEDED_STATE, &requests).unwrap();
    assert_eq!(instructions, again);
}

#[test]
fn test_foreign_instructions_are_skipped() {
    init_logger();
    let instructions = vec![
        vec!["1".to_string()],
        vec!["not-a-number".to_string(), "accepted".to_string()],
        vec!["42".to_string(), "accepted".to_string(), "{}".to_string()],
    ];
    let state = process_instructions(&SEEDED_STATE, &instructions).unwrap();
    assert_eq!(state, *SEEDED_STATE);
}

#[test]
fn test_divergent_instruction_is_fatal() {
    init_logger();
    let (mut instructions, _) =
        produce_instructions(&SEEDED_STATE, &[withdraw_liquidity(POOL, "alice", 10, "w1")])
            .unwrap();
    let mut content = payload(&instructions[0]);
    content["token0_amount"] = serde_json::json!(11);
    instructions[0][2] = content.to_string();
    assert_matches!(
        process_instructions(&SEEDED_STATE, &instructions),
        Err(DexError::StateDivergence)
    );

    instructions[0][2] = "{".to_string();
    assert_matches!(
        process_instructions(&SEEDED_STATE, &instructions),
        Err(DexError::InvalidInstructionData)
    );
}
