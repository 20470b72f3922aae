//! Instructions are the agreed effect records of the exchange. On the wire an instruction is a
//! list of strings: `[metaType, status, jsonPayload]`.
//!
//! The status string and the payload are the tag and the content of the per-kind effect enum,
//! so every kind round-trips through the same two functions below.
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DexError, DexResult};
pub use crate::processor::{
    add_liquidity, add_order, modify_params, trade, withdraw_liquidity, withdraw_lp_fee,
    withdraw_order, withdraw_protocol_fee,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
/// Numeric tag in the first field of an instruction
pub enum MetaType {
    ModifyParams = 280,
    AddLiquidity = 281,
    WithdrawLiquidity = 283,
    Trade = 285,
    AddOrder = 287,
    WithdrawOrder = 289,
    WithdrawLpFee = 297,
    WithdrawProtocolFee = 299,
}

/// Every status string an exchange instruction can carry
const STATUSES: [&str; 7] = [
    "waiting",
    "matched",
    "matchAndReturn",
    "refund",
    "accepted",
    "rejected",
    "refunded",
];

/// Payload of a request that was turned down without touching any state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedContent {
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Describes every effect the exchange can agree on
pub enum DexInstruction {
    /// A liquidity contribution waits, matches, is returned in part or refunded
    AddLiquidity(add_liquidity::Effect),
    /// Shares are burnt for their slice of both reserves
    WithdrawLiquidity(withdraw_liquidity::Effect),
    /// A trade settles through its path, or is refunded
    Trade(trade::Effect),
    /// A limit order rests in a pool pair's book, or is refunded
    AddOrder(add_order::Effect),
    /// An order owner takes out part of an order's balances
    WithdrawOrder(withdraw_order::Effect),
    /// A liquidity provider collects accrued trading fees
    WithdrawLpFee(withdraw_lp_fee::Effect),
    /// The protocol fees of a pair are paid out
    WithdrawProtocolFee(withdraw_protocol_fee::Effect),
    /// The exchange parameters are replaced
    ModifyParams(modify_params::Effect),
}

impl DexInstruction {
    pub fn meta_type(&self) -> MetaType {
        match self {
            DexInstruction::AddLiquidity(_) => MetaType::AddLiquidity,
            DexInstruction::WithdrawLiquidity(_) => MetaType::WithdrawLiquidity,
            DexInstruction::Trade(_) => MetaType::Trade,
            DexInstruction::AddOrder(_) => MetaType::AddOrder,
            DexInstruction::WithdrawOrder(_) => MetaType::WithdrawOrder,
            DexInstruction::WithdrawLpFee(_) => MetaType::WithdrawLpFee,
            DexInstruction::WithdrawProtocolFee(_) => MetaType::WithdrawProtocolFee,
            DexInstruction::ModifyParams(_) => MetaType::ModifyParams,
        }
    }

    pub fn to_string_slice(&self) -> DexResult<Vec<String>> {
        let meta_type = self.meta_type();
        match self {
            DexInstruction::AddLiquidity(e) => encode_effect(meta_type, e),
            DexInstruction::WithdrawLiquidity(e) => encode_effect(meta_type, e),
            DexInstruction::Trade(e) => encode_effect(meta_type, e),
            DexInstruction::AddOrder(e) => encode_effect(meta_type, e),
            DexInstruction::WithdrawOrder(e) => encode_effect(meta_type, e),
            DexInstruction::WithdrawLpFee(e) => encode_effect(meta_type, e),
            DexInstruction::WithdrawProtocolFee(e) => encode_effect(meta_type, e),
            DexInstruction::ModifyParams(e) => encode_effect(meta_type, e),
        }
    }

    /// Decodes an instruction. `Ok(None)` means the record does not belong to the exchange:
    /// it has fewer than two fields, or its first field is not a known meta type.
    pub fn from_string_slice(fields: &[String]) -> DexResult<Option<Self>> {
        if fields.len() < 2 {
            return Ok(None);
        }
        let meta_type = match fields[0].parse::<u16>().ok().and_then(MetaType::from_u16) {
            Some(m) => m,
            None => return Ok(None),
        };
        if fields.len() != 3 {
            return Err(DexError::InvalidInstructionData);
        }
        let (status, payload) = (&fields[1], &fields[2]);
        if !STATUSES.contains(&status.as_str()) {
            return Err(DexError::UnknownInstructionType);
        }
        let instruction = match meta_type {
            MetaType::AddLiquidity => DexInstruction::AddLiquidity(decode_effect(status, payload)?),
            MetaType::WithdrawLiquidity => {
                DexInstruction::WithdrawLiquidity(decode_effect(status, payload)?)
            }
            MetaType::Trade => DexInstruction::Trade(decode_effect(status, payload)?),
            MetaType::AddOrder => DexInstruction::AddOrder(decode_effect(status, payload)?),
            MetaType::WithdrawOrder => {
                DexInstruction::WithdrawOrder(decode_effect(status, payload)?)
            }
            MetaType::WithdrawLpFee => {
                DexInstruction::WithdrawLpFee(decode_effect(status, payload)?)
            }
            MetaType::WithdrawProtocolFee => {
                DexInstruction::WithdrawProtocolFee(decode_effect(status, payload)?)
            }
            MetaType::ModifyParams => {
                DexInstruction::ModifyParams(decode_effect(status, payload)?)
            }
        };
        Ok(Some(instruction))
    }
}

/// Effects are serde enums tagged with `status` and carrying their content under `payload`.
fn encode_effect<E: Serialize>(meta_type: MetaType, effect: &E) -> DexResult<Vec<String>> {
    let value = serde_json::to_value(effect)?;
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or(DexError::InvalidInstructionData)?;
    let payload = value.get("payload").ok_or(DexError::InvalidInstructionData)?;
    Ok(vec![
        (meta_type as u16).to_string(),
        status.to_string(),
        serde_json::to_string(payload)?,
    ])
}

fn decode_effect<E: DeserializeOwned>(status: &str, payload: &str) -> DexResult<E> {
    let payload: Value = serde_json::from_str(payload)?;
    let mut tagged = serde_json::Map::new();
    tagged.insert("status".to_string(), Value::String(status.to_string()));
    tagged.insert("payload".to_string(), payload);
    Ok(serde_json::from_value(Value::Object(tagged))?)
}
