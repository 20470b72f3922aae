use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{error::DexResult, instruction::DexInstruction, state::DexState};

pub mod add_liquidity;
pub mod add_order;
pub mod modify_params;
pub mod trade;
pub mod withdraw_liquidity;
pub mod withdraw_lp_fee;
pub mod withdraw_order;
pub mod withdraw_protocol_fee;

/// A validated user request, as handed to the producer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    AddLiquidity(add_liquidity::Params),
    WithdrawLiquidity(withdraw_liquidity::Params),
    Trade(trade::Params),
    AddOrder(add_order::Params),
    WithdrawOrder(withdraw_order::Params),
    WithdrawLpFee(withdraw_lp_fee::Params),
    WithdrawProtocolFee(withdraw_protocol_fee::Params),
    ModifyParams(modify_params::Params),
}

impl Request {
    pub fn tx_req_id(&self) -> &str {
        match self {
            Request::AddLiquidity(p) => &p.tx_req_id,
            Request::WithdrawLiquidity(p) => &p.tx_req_id,
            Request::Trade(p) => &p.tx_req_id,
            Request::AddOrder(p) => &p.tx_req_id,
            Request::WithdrawOrder(p) => &p.tx_req_id,
            Request::WithdrawLpFee(p) => &p.tx_req_id,
            Request::WithdrawProtocolFee(p) => &p.tx_req_id,
            Request::ModifyParams(p) => &p.tx_req_id,
        }
    }

    /// The instructions returning everything this request put in escrow.
    fn refund(&self) -> Vec<DexInstruction> {
        match self {
            Request::AddLiquidity(p) => add_liquidity::refund(p),
            Request::WithdrawLiquidity(p) => withdraw_liquidity::refund(p),
            Request::Trade(p) => trade::refund(p),
            Request::AddOrder(p) => add_order::refund(p),
            Request::WithdrawOrder(p) => withdraw_order::refund(p),
            Request::WithdrawLpFee(p) => withdraw_lp_fee::refund(p),
            Request::WithdrawProtocolFee(p) => withdraw_protocol_fee::refund(p),
            Request::ModifyParams(p) => modify_params::refund(p),
        }
    }
}

pub struct Processor {}

impl Processor {
    /// Producer side: turns one request into its instructions and applies them to `state`.
    ///
    /// The request runs on a copy of `state`. If it fails, the copy is dropped and the request
    /// is refunded or rejected instead.
    pub fn produce(state: &mut DexState, request: &Request) -> Vec<DexInstruction> {
        let mut working = state.clone();
        let result = match request {
            Request::AddLiquidity(params) => {
                debug!("Request: Add Liquidity");
                add_liquidity::produce(&mut working, params)
            }
            Request::WithdrawLiquidity(params) => {
                debug!("Request: Withdraw Liquidity");
                withdraw_liquidity::produce(&mut working, params)
            }
            Request::Trade(params) => {
                debug!("Request: Trade");
                trade::produce(&mut working, params)
            }
            Request::AddOrder(params) => {
                debug!("Request: Add Order");
                add_order::produce(&mut working, params)
            }
            Request::WithdrawOrder(params) => {
                debug!("Request: Withdraw Order");
                withdraw_order::produce(&mut working, params)
            }
            Request::WithdrawLpFee(params) => {
                debug!("Request: Withdraw LP Fee");
                withdraw_lp_fee::produce(&mut working, params)
            }
            Request::WithdrawProtocolFee(params) => {
                debug!("Request: Withdraw Protocol Fee");
                withdraw_protocol_fee::produce(&mut working, params)
            }
            Request::ModifyParams(params) => {
                debug!("Request: Modify Params");
                modify_params::produce(&mut working, params)
            }
        };
        match result {
            Ok(instructions) => {
                *state = working;
                instructions
            }
            Err(e) => {
                warn!("Request {} refunded: {}", request.tx_req_id(), e);
                request.refund()
            }
        }
    }

    /// Processor side: applies one agreed instruction. Records that do not belong to the
    /// exchange are skipped.
    pub fn process_instruction(state: &mut DexState, fields: &[String]) -> DexResult {
        let instruction = match DexInstruction::from_string_slice(fields)? {
            Some(i) => i,
            None => {
                debug!("Skipping foreign instruction");
                return Ok(());
            }
        };
        Self::apply(state, &instruction)?;
        #[cfg(feature = "debug-asserts")]
        state.check_invariants()?;
        Ok(())
    }

    pub fn apply(state: &mut DexState, instruction: &DexInstruction) -> DexResult {
        match instruction {
            DexInstruction::AddLiquidity(effect) => {
                debug!("Instruction: Add Liquidity");
                add_liquidity::process(state, effect)
            }
            DexInstruction::WithdrawLiquidity(effect) => {
                debug!("Instruction: Withdraw Liquidity");
                withdraw_liquidity::process(state, effect)
            }
            DexInstruction::Trade(effect) => {
                debug!("Instruction: Trade");
                trade::process(state, effect)
            }
            DexInstruction::AddOrder(effect) => {
                debug!("Instruction: Add Order");
                add_order::process(state, effect)
            }
            DexInstruction::WithdrawOrder(effect) => {
                debug!("Instruction: Withdraw Order");
                withdraw_order::process(state, effect)
            }
            DexInstruction::WithdrawLpFee(effect) => {
                debug!("Instruction: Withdraw LP Fee");
                withdraw_lp_fee::process(state, effect)
            }
            DexInstruction::WithdrawProtocolFee(effect) => {
                debug!("Instruction: Withdraw Protocol Fee");
                withdraw_protocol_fee::process(state, effect)
            }
            DexInstruction::ModifyParams(effect) => {
                debug!("Instruction: Modify Params");
                modify_params::process(state, effect)
            }
        }
    }
}
