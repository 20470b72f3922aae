//! Write-sets between two snapshots and the key-value layout they are persisted under.
//!
//! A [`StateChange`] only names the records that differ. [`store_to_db`] turns it into `put` and
//! `delete` calls on a [`Storage`] backend, so an untouched share or order is never rewritten.
use std::collections::{BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    error::DexResult,
    state::{DexState, Identity, OrderId, PoolPairId, TokenId},
    utils::biguint_to_bytes,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShareChange {
    /// The share amount itself moved, or the share appeared or disappeared
    pub is_changed: bool,
    pub trading_fees: BTreeSet<TokenId>,
    pub last_lp_fees_per_share: BTreeSet<TokenId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolPairChange {
    /// Tokens, amplifier, total shares or reserves moved
    pub is_changed: bool,
    pub shares: BTreeMap<Identity, ShareChange>,
    pub lp_fees_per_share: BTreeSet<TokenId>,
    pub protocol_fees: BTreeSet<TokenId>,
    pub staking_pool_fees: BTreeSet<TokenId>,
    pub order_ids: BTreeSet<OrderId>,
}

impl PoolPairChange {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateChange {
    pub pool_pairs: BTreeMap<PoolPairId, PoolPairChange>,
    /// Pair hashes whose waiting contribution appeared or was consumed
    pub waiting_contributions: BTreeSet<String>,
    pub params: bool,
}

impl StateChange {
    pub fn is_empty(&self) -> bool {
        self.pool_pairs.is_empty() && self.waiting_contributions.is_empty() && !self.params
    }
}

/// Keys whose value differs between the two maps, including keys present in only one of them.
pub fn changed_keys<K: Ord + Clone, V: PartialEq>(
    current: &BTreeMap<K, V>,
    previous: &BTreeMap<K, V>,
) -> BTreeSet<K> {
    let mut keys: BTreeSet<K> = current
        .iter()
        .filter(|(k, v)| previous.get(*k) != Some(*v))
        .map(|(k, _)| k.clone())
        .collect();
    keys.extend(
        previous
            .keys()
            .filter(|k| !current.contains_key(*k))
            .cloned(),
    );
    keys
}

#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub enum SubKey {
    PoolPair,
    Share(Identity),
    ShareTradingFee(Identity, TokenId),
    ShareLastLpFeesPerShare(Identity, TokenId),
    LpFeesPerShare(TokenId),
    ProtocolFee(TokenId),
    StakingPoolFee(TokenId),
    Order(OrderId),
    /// Stored under an empty pool pair id
    WaitingContribution(String),
    /// Stored under an empty pool pair id
    Params,
}

#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct StorageKey {
    pub pool_pair_id: PoolPairId,
    pub sub_key: SubKey,
}

impl StorageKey {
    pub fn new(pool_pair_id: &str, sub_key: SubKey) -> Self {
        Self {
            pool_pair_id: pool_pair_id.to_string(),
            sub_key,
        }
    }

    pub fn global(sub_key: SubKey) -> Self {
        Self::new("", sub_key)
    }
}

/// The persistence engine behind the exchange. Values are borsh-encoded records.
pub trait Storage {
    fn get(&self, key: &StorageKey) -> DexResult<Option<Vec<u8>>>;
    fn put(&mut self, key: StorageKey, value: Vec<u8>) -> DexResult;
    fn delete(&mut self, key: &StorageKey) -> DexResult;
}

/// Reads and decodes one record.
pub fn get_record<T: BorshDeserialize, S: Storage>(db: &S, key: &StorageKey) -> DexResult<Option<T>> {
    match db.get(key)? {
        None => Ok(None),
        Some(bytes) => Ok(Some(T::try_from_slice(&bytes)?)),
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<StorageKey, Vec<u8>>,
}

impl MemoryStorage {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &StorageKey) -> DexResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: StorageKey, value: Vec<u8>) -> DexResult {
        self.entries.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &StorageKey) -> DexResult {
        self.entries.remove(key);
        Ok(())
    }
}

/// Core record of a pool pair. Virtual reserves are little-endian byte strings.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PoolPairRecord {
    pub token0_id: TokenId,
    pub token1_id: TokenId,
    pub amplifier: u32,
    pub share_amount: u64,
    pub token0_real: u64,
    pub token1_real: u64,
    pub token0_virtual: Vec<u8>,
    pub token1_virtual: Vec<u8>,
}

fn put_or_delete<S: Storage, T: BorshSerialize>(
    db: &mut S,
    key: StorageKey,
    value: Option<&T>,
) -> DexResult {
    match value {
        Some(v) => db.put(key, v.try_to_vec()?),
        None => db.delete(&key),
    }
}

/// Persists every record named in `change`, reading current values from `state`.
pub fn store_to_db<S: Storage>(state: &DexState, change: &StateChange, db: &mut S) -> DexResult {
    if change.params {
        db.put(StorageKey::global(SubKey::Params), state.params.try_to_vec()?)?;
    }
    for pair_hash in &change.waiting_contributions {
        put_or_delete(
            db,
            StorageKey::global(SubKey::WaitingContribution(pair_hash.clone())),
            state.waiting_contributions.get(pair_hash),
        )?;
    }

    for (pool_pair_id, pair_change) in &change.pool_pairs {
        let key = |sub_key| StorageKey::new(pool_pair_id, sub_key);
        let pair = match state.pool_pairs.get(pool_pair_id) {
            Some(p) => p,
            None => {
                db.delete(&key(SubKey::PoolPair))?;
                continue;
            }
        };

        if pair_change.is_changed {
            let record = PoolPairRecord {
                token0_id: pair.token0_id.clone(),
                token1_id: pair.token1_id.clone(),
                amplifier: pair.amplifier,
                share_amount: pair.share_amount,
                token0_real: pair.reserves.token0_real,
                token1_real: pair.reserves.token1_real,
                token0_virtual: biguint_to_bytes(&pair.reserves.token0_virtual),
                token1_virtual: biguint_to_bytes(&pair.reserves.token1_virtual),
            };
            db.put(key(SubKey::PoolPair), record.try_to_vec()?)?;
        }

        for (nft_id, share_change) in &pair_change.shares {
            let share = pair.shares.get(nft_id);
            if share_change.is_changed {
                put_or_delete(db, key(SubKey::Share(nft_id.clone())), share.map(|s| &s.amount))?;
            }
            for token_id in &share_change.trading_fees {
                put_or_delete(
                    db,
                    key(SubKey::ShareTradingFee(nft_id.clone(), token_id.clone())),
                    share.and_then(|s| s.trading_fees.get(token_id)),
                )?;
            }
            for token_id in &share_change.last_lp_fees_per_share {
                put_or_delete(
                    db,
                    key(SubKey::ShareLastLpFeesPerShare(nft_id.clone(), token_id.clone())),
                    share
                        .and_then(|s| s.last_lp_fees_per_share.get(token_id))
                        .map(biguint_to_bytes)
                        .as_ref(),
                )?;
            }
        }

        for token_id in &pair_change.lp_fees_per_share {
            put_or_delete(
                db,
                key(SubKey::LpFeesPerShare(token_id.clone())),
                pair.lp_fees_per_share
                    .get(token_id)
                    .map(biguint_to_bytes)
                    .as_ref(),
            )?;
        }
        for token_id in &pair_change.protocol_fees {
            put_or_delete(
                db,
                key(SubKey::ProtocolFee(token_id.clone())),
                pair.protocol_fees.get(token_id),
            )?;
        }
        for token_id in &pair_change.staking_pool_fees {
            put_or_delete(
                db,
                key(SubKey::StakingPoolFee(token_id.clone())),
                pair.staking_pool_fees.get(token_id),
            )?;
        }
        for order_id in &pair_change.order_ids {
            put_or_delete(
                db,
                key(SubKey::Order(order_id.clone())),
                pair.order_book.get_order(order_id),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_keys_covers_updates_inserts_and_removals() {
        let prev: BTreeMap<&str, u64> = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        let cur: BTreeMap<&str, u64> = [("a", 1), ("b", 5), ("d", 4)].into_iter().collect();
        let keys: Vec<&str> = changed_keys(&cur, &prev).into_iter().collect();
        assert_eq!(keys, vec!["b", "c", "d"]);
    }

    #[test]
    fn memory_storage_round_trip() {
        let mut db = MemoryStorage::default();
        let key = StorageKey::new("pair", SubKey::ProtocolFee("t".to_string()));
        db.put(key.clone(), 42u64.try_to_vec().unwrap()).unwrap();
        assert_eq!(get_record::<u64, _>(&db, &key).unwrap(), Some(42));
        db.delete(&key).unwrap();
        assert_eq!(get_record::<u64, _>(&db, &key).unwrap(), None);
        assert!(db.is_empty());
    }

    #[test]
    fn empty_change() {
        let mut change = StateChange::default();
        assert!(change.is_empty());
        change.params = true;
        assert!(!change.is_empty());
        assert!(PoolPairChange::default().is_empty());
    }
}
