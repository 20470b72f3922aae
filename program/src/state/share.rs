use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::state::{
    state_change::{changed_keys, ShareChange},
    TokenId,
};

/// One liquidity provider's position in a pool pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub amount: u64,
    /// Pair accumulator values observed at the last touch, per fee token
    pub last_lp_fees_per_share: BTreeMap<TokenId, BigUint>,
    /// Fees accrued at previous touches and not yet withdrawn
    pub trading_fees: BTreeMap<TokenId, u64>,
}

impl Share {
    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.trading_fees.values().all(|v| *v == 0)
    }

    pub fn get_diff(&self, previous: Option<&Share>) -> ShareChange {
        match previous {
            None => ShareChange {
                is_changed: true,
                trading_fees: self.trading_fees.keys().cloned().collect(),
                last_lp_fees_per_share: self.last_lp_fees_per_share.keys().cloned().collect(),
            },
            Some(p) => ShareChange {
                is_changed: self.amount != p.amount,
                trading_fees: changed_keys(&self.trading_fees, &p.trading_fees),
                last_lp_fees_per_share: changed_keys(
                    &self.last_lp_fees_per_share,
                    &p.last_lp_fees_per_share,
                ),
            },
        }
    }
}
