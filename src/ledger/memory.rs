// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use ahash::HashMap;
use parking_lot::RwLock;
use serde::Serialize;

use super::{BlockStore, StateStore, Substore};

/// In-memory ordered ledger, the backing store for tests and for callers
/// that load a snapshot fully into memory.
///
/// State keys are stored as `substore prefix ++ raw key` in a single ordered
/// map, mirroring the on-disk layout of the snapshotted database.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    blocks_by_height: RwLock<BTreeMap<u64, Vec<u8>>>,
    headers: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    transactions: RwLock<HashMap<Vec<u8>, Vec<Vec<u8>>>>,
}

impl MemoryLedger {
    pub fn put(&self, substore: &Substore, key: &[u8], value: Vec<u8>) {
        debug_assert_eq!(key.len(), substore.key_len, "{} key width", substore.name);
        self.state.write().insert(prefixed(substore, key), value);
    }

    /// Encodes `value` with the store codec and inserts it.
    pub fn put_cbor<T: Serialize>(&self, substore: &Substore, key: &[u8], value: &T) {
        let encoded = serde_ipld_dagcbor::to_vec(value).expect("value must encode");
        self.put(substore, key, encoded);
    }

    pub fn put_block<T: Serialize>(&self, height: u64, id: &[u8], header: &T) {
        let encoded = serde_ipld_dagcbor::to_vec(header).expect("header must encode");
        self.blocks_by_height.write().insert(height, id.to_vec());
        self.headers.write().insert(id.to_vec(), encoded);
    }

    pub fn put_transaction<T: Serialize>(&self, block_id: &[u8], transaction: &T) {
        let encoded = serde_ipld_dagcbor::to_vec(transaction).expect("transaction must encode");
        self.transactions
            .write()
            .entry(block_id.to_vec())
            .or_default()
            .push(encoded);
    }
}

fn prefixed(substore: &Substore, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(substore.prefix.len() + key.len());
    out.extend_from_slice(substore.prefix);
    out.extend_from_slice(key);
    out
}

impl StateStore for MemoryLedger {
    fn range(
        &self,
        substore: &Substore,
        low: &[u8],
        high: &[u8],
    ) -> anyhow::Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let low = prefixed(substore, low);
        let high = prefixed(substore, high);
        Ok(self
            .state
            .read()
            .range(low..=high)
            .map(|(key, value)| (key[substore.prefix.len()..].to_vec(), value.clone()))
            .collect())
    }

    fn get(&self, substore: &Substore, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.state.read().get(&prefixed(substore, key)).cloned())
    }
}

impl BlockStore for MemoryLedger {
    fn block_ids_by_height(&self, from: u64, to: u64) -> anyhow::Result<Vec<Vec<u8>>> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .blocks_by_height
            .read()
            .range(from..=to)
            .map(|(_, id)| id.clone())
            .collect())
    }

    fn block_header(&self, id: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.headers.read().get(id).cloned())
    }

    fn transactions(&self, block_id: &[u8]) -> anyhow::Result<Vec<Vec<u8>>> {
        Ok(self
            .transactions
            .read()
            .get(block_id)
            .cloned()
            .unwrap_or_default())
    }
}
