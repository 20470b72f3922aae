use serde::{Deserialize, Serialize};

use crate::{
    error::DexResult,
    instruction::DexInstruction,
    state::{params::Params as DexParams, DexState},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub params: DexParams,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyParamsContent {
    pub params: DexParams,
    pub tx_req_id: String,
    pub shard_id: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "camelCase")]
pub enum Effect {
    Accepted(ModifyParamsContent),
    Rejected(ModifyParamsContent),
}

pub fn produce(state: &mut DexState, params: &Params) -> DexResult<Vec<DexInstruction>> {
    params.params.validate()?;
    let effect = Effect::Accepted(ModifyParamsContent {
        params: params.params.clone(),
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    });
    process(state, &effect)?;
    Ok(vec![DexInstruction::ModifyParams(effect)])
}

pub fn process(state: &mut DexState, effect: &Effect) -> DexResult {
    if let Effect::Accepted(content) = effect {
        content.params.validate()?;
        state.params = content.params.clone();
    }
    Ok(())
}

pub fn refund(params: &Params) -> Vec<DexInstruction> {
    vec![DexInstruction::ModifyParams(Effect::Rejected(ModifyParamsContent {
        params: params.params.clone(),
        tx_req_id: params.tx_req_id.clone(),
        shard_id: params.shard_id,
    }))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::DexError, processor::{Processor, Request}};
    use assert_matches::assert_matches;

    #[test]
    fn invalid_params_are_rejected() {
        let mut state = DexState::default();
        let mut params = DexParams::default();
        params.trading_protocol_fee_percent = 95;
        assert_eq!(
            produce(&mut state.clone(), &Params {
                params: params.clone(),
                tx_req_id: "tx".to_string(),
                shard_id: 0,
            }),
            Err(DexError::InvalidParams)
        );
        let out = Processor::produce(
            &mut state,
            &Request::ModifyParams(Params {
                params,
                tx_req_id: "tx".to_string(),
                shard_id: 0,
            }),
        );
        assert_matches!(&out[..], [DexInstruction::ModifyParams(Effect::Rejected(_))]);
        assert_eq!(state.params, DexParams::default());
    }

    #[test]
    fn overflowing_fee_percentages_are_rejected() {
        let mut state = DexState::default();
        let params = DexParams {
            trading_protocol_fee_percent: u32::MAX,
            trading_staking_pool_reward_percent: 1,
            ..DexParams::default()
        };
        let out = Processor::produce(
            &mut state,
            &Request::ModifyParams(Params {
                params: params.clone(),
                tx_req_id: "tx".to_string(),
                shard_id: 0,
            }),
        );
        assert_matches!(&out[..], [DexInstruction::ModifyParams(Effect::Rejected(_))]);
        assert_eq!(state.params, DexParams::default());

        // a forged accepted record fails on replay instead of panicking
        let forged = Effect::Accepted(ModifyParamsContent {
            params,
            tx_req_id: "tx".to_string(),
            shard_id: 0,
        });
        assert_eq!(process(&mut state, &forged), Err(DexError::InvalidParams));
    }
}
