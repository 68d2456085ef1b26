// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Read-only access to the snapshotted ledger.
//!
//! The migration never writes back: both stores are frozen for its entire
//! lifetime. Typed decoding lives in [`StateStoreExt`] so that store
//! implementations only deal in raw bytes.

mod memory;

pub use memory::MemoryLedger;

use serde::de::DeserializeOwned;

use crate::migration::MigrationError;

/// A logically distinct keyspace within the state store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Substore {
    pub name: &'static str,
    pub prefix: &'static [u8],
    /// Fixed width of every key in this substore.
    pub key_len: usize,
}

/// Substore prefixes of the snapshotted protocol state.
pub mod substores {
    use super::Substore;

    pub const LEGACY_ACCOUNTS: Substore = Substore {
        name: "legacy:accounts",
        prefix: &[0x00, 0x00, 0x80, 0x00, 0x00, 0x00],
        key_len: 8,
    };
    pub const AUTH_ACCOUNTS: Substore = Substore {
        name: "auth:accounts",
        prefix: &[0x00, 0x00, 0xa0, 0x00, 0x00, 0x00],
        key_len: 20,
    };
    /// Key: 20-byte address followed by the 8-byte token id.
    pub const TOKEN_USER: Substore = Substore {
        name: "token:user",
        prefix: &[0x00, 0x00, 0xc0, 0x00, 0x00, 0x00],
        key_len: 28,
    };
    /// Key: 4-byte escrow chain id followed by the 8-byte token id.
    pub const TOKEN_ESCROW: Substore = Substore {
        name: "token:escrow",
        prefix: &[0x00, 0x00, 0xc0, 0x00, 0x00, 0x02],
        key_len: 12,
    };
    pub const POS_VALIDATORS: Substore = Substore {
        name: "pos:validators",
        prefix: &[0x00, 0x00, 0xe0, 0x00, 0x00, 0x00],
        key_len: 20,
    };
    pub const POS_STAKERS: Substore = Substore {
        name: "pos:stakers",
        prefix: &[0x00, 0x00, 0xe0, 0x00, 0x00, 0x01],
        key_len: 20,
    };
    /// Key: 4-byte big-endian round number.
    pub const POS_VOTE_WEIGHTS: Substore = Substore {
        name: "pos:vote-weights",
        prefix: &[0x00, 0x00, 0xe0, 0x00, 0x00, 0x02],
        key_len: 4,
    };
    /// Single record under the empty key.
    pub const INTEROP_OWN_CHAIN: Substore = Substore {
        name: "interoperability:own-chain",
        prefix: &[0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
        key_len: 0,
    };
    pub const INTEROP_CHAIN_DATA: Substore = Substore {
        name: "interoperability:chain-data",
        prefix: &[0x00, 0x01, 0x00, 0x00, 0x00, 0x01],
        key_len: 4,
    };
    pub const INTEROP_CHANNEL_DATA: Substore = Substore {
        name: "interoperability:channel-data",
        prefix: &[0x00, 0x01, 0x00, 0x00, 0x00, 0x02],
        key_len: 4,
    };
    pub const INTEROP_CHAIN_VALIDATORS: Substore = Substore {
        name: "interoperability:chain-validators",
        prefix: &[0x00, 0x01, 0x00, 0x00, 0x00, 0x03],
        key_len: 4,
    };
    pub const INTEROP_TERMINATED_STATE: Substore = Substore {
        name: "interoperability:terminated-state",
        prefix: &[0x00, 0x01, 0x00, 0x00, 0x00, 0x04],
        key_len: 4,
    };
    pub const INTEROP_TERMINATED_OUTBOX: Substore = Substore {
        name: "interoperability:terminated-outbox",
        prefix: &[0x00, 0x01, 0x00, 0x00, 0x00, 0x05],
        key_len: 4,
    };
}

/// Inclusive full-width bounds covering every key of width `len`.
pub fn full_range(len: usize) -> (Vec<u8>, Vec<u8>) {
    (vec![0x00; len], vec![0xff; len])
}

/// Ordered point/range reads over the snapshotted protocol state.
pub trait StateStore {
    /// All entries with `low <= key <= high`, ascending by raw key bytes.
    fn range(&self, substore: &Substore, low: &[u8], high: &[u8])
    -> anyhow::Result<Vec<(Vec<u8>, Vec<u8>)>>;

    fn get(&self, substore: &Substore, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Schema-aware decoding on top of [`StateStore`]. Decode failures are fatal
/// for the whole migration; a partially decoded substore is never surfaced.
pub trait StateStoreExt {
    /// Full-width range scan of the substore with per-entry decoding.
    fn scan_with_schema<T: DeserializeOwned>(
        &self,
        substore: &Substore,
    ) -> Result<Vec<(Vec<u8>, T)>, MigrationError>;

    fn get_with_schema<T: DeserializeOwned>(
        &self,
        substore: &Substore,
        key: &[u8],
    ) -> Result<Option<T>, MigrationError>;

    /// Same as [`StateStoreExt::get_with_schema`], but a missing key is an
    /// [`MigrationError::AddressNotFound`] data-corruption signal.
    fn require_with_schema<T: DeserializeOwned>(
        &self,
        substore: &Substore,
        key: &[u8],
    ) -> Result<T, MigrationError>;
}

fn decode<T: DeserializeOwned>(substore: &Substore, value: &[u8]) -> Result<T, MigrationError> {
    serde_ipld_dagcbor::from_slice(value).map_err(|e| MigrationError::SchemaDecode {
        substore: substore.name,
        source: anyhow::Error::new(e),
    })
}

impl<S: ?Sized + StateStore> StateStoreExt for S {
    fn scan_with_schema<T: DeserializeOwned>(
        &self,
        substore: &Substore,
    ) -> Result<Vec<(Vec<u8>, T)>, MigrationError> {
        let (low, high) = full_range(substore.key_len);
        self.range(substore, &low, &high)?
            .into_iter()
            .map(|(key, value)| Ok((key, decode(substore, &value)?)))
            .collect()
    }

    fn get_with_schema<T: DeserializeOwned>(
        &self,
        substore: &Substore,
        key: &[u8],
    ) -> Result<Option<T>, MigrationError> {
        match self.get(substore, key)? {
            Some(value) => Ok(Some(decode(substore, &value)?)),
            None => Ok(None),
        }
    }

    fn require_with_schema<T: DeserializeOwned>(
        &self,
        substore: &Substore,
        key: &[u8],
    ) -> Result<T, MigrationError> {
        self.get_with_schema(substore, key)?
            .ok_or_else(|| MigrationError::AddressNotFound {
                context: substore.name,
                address: hex::encode(key),
            })
    }
}

/// Raw block and transaction lookups against the secondary blockchain store.
pub trait BlockStore {
    /// Block ids for heights `from..=to`, ascending by height.
    fn block_ids_by_height(&self, from: u64, to: u64) -> anyhow::Result<Vec<Vec<u8>>>;

    fn block_header(&self, id: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;

    /// Raw transaction payloads of a block, in block order.
    fn transactions(&self, block_id: &[u8]) -> anyhow::Result<Vec<Vec<u8>>>;
}
