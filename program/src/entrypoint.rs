use log::{debug, error};

use crate::{
    error::DexResult,
    processor::{Processor, Request},
    state::DexState,
};

/// Runs a batch of requests in arrival order against `state`.
///
/// Returns the encoded instructions together with the state they lead to. `state` itself is
/// never modified.
pub fn produce_instructions(
    state: &DexState,
    requests: &[Request],
) -> DexResult<(Vec<Vec<String>>, DexState)> {
    debug!("Producing instructions for {} requests", requests.len());
    let mut working = state.clone();
    let mut instructions = Vec::with_capacity(requests.len());
    for request in requests {
        for instruction in Processor::produce(&mut working, request) {
            instructions.push(instruction.to_string_slice()?);
        }
    }
    Ok((instructions, working))
}

/// Replays agreed instructions in order. Any failure aborts the whole batch, since it means this
/// node diverged from the producer.
pub fn process_instructions(state: &DexState, instructions: &[Vec<String>]) -> DexResult<DexState> {
    let mut working = state.clone();
    for (index, instruction) in instructions.iter().enumerate() {
        if let Err(e) = Processor::process_instruction(&mut working, instruction) {
            error!("Instruction {} failed: {}", index, e);
            return Err(e);
        }
    }
    Ok(working)
}
