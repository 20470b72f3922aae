/*!
Deterministic exchange engine combining constant-product liquidity pools with limit orders.

## Overview

The engine is the state transition of an exchange replicated across many nodes. A block proposer
runs a batch of requests through the producer, which emits an ordered list of instructions and a
new state. Every other node later replays only those instructions through the processor and must
arrive at the exact same state.

State lives in a [`DexState`][`state::DexState`] snapshot: the exchange [`Params`][`state::Params`],
the pool pairs and the liquidity contributions still waiting for their second side. Both entry
points work on a copy of the snapshot they are given.

## Pool pairs

A [`PoolPair`][`state::PoolPair`] holds the real reserves of two tokens and a pair of amplified
virtual reserves used for pricing. Liquidity providers own shares of the pair and collect trading
fees lazily through a per-share accumulator.

## Trading

A trade follows a path of pool pairs. In each pair the executor in [`matching`] swaps in the pool
until the pool price reaches the best resting order's rate, fills that order, and repeats until
the budget is spent. The output of one pair is the budget of the next.

## Instructions

Every request produces at least one [`DexInstruction`][`instruction::DexInstruction`], including
refunds, so escrowed funds are always accounted for. Instructions are encoded as lists of strings
and records that do not belong to the exchange are skipped on replay.
*/

pub mod entrypoint;
#[doc(hidden)]
pub mod error;
/// Instruction kinds and their wire encoding
pub mod instruction;
/// Multi-hop trade execution
pub mod matching;
/// Request handling and instruction replay, one module per kind
pub mod processor;
/// Describes the data structures the exchange keeps in its state
pub mod state;
/// Utility functions
pub mod utils;
