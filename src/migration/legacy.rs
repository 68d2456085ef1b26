// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Legacy module extraction: balances still attached to old 8-byte
//! addresses whose owners never reclaimed them. No reconciliation applies.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::MigrationError;
use crate::address::LegacyAddress;
use crate::genesis::{
    GenesisAssetEntry, GenesisPayload, LegacyStoreData, LegacyStoreEntry, MODULE_NAME_LEGACY,
    SCHEMA_LEGACY,
};
use crate::ledger::{substores, StateStore, StateStoreExt as _};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::migration) struct LegacyAccountRecord {
    pub balance: u64,
}

pub fn module_entry(store: &impl StateStore) -> Result<GenesisAssetEntry, MigrationError> {
    let substore = &substores::LEGACY_ACCOUNTS;
    let mut accounts = Vec::new();
    for (key, record) in store.scan_with_schema::<LegacyAccountRecord>(substore)? {
        let address = LegacyAddress::from_bytes(&key)
            .map_err(|e| MigrationError::schema(substore.name, e))?;
        accounts.push((address, BigUint::from(record.balance)));
    }
    accounts.sort_by_key(|(address, _)| *address);

    Ok(GenesisAssetEntry {
        module: MODULE_NAME_LEGACY.to_owned(),
        data: GenesisPayload::Legacy(LegacyStoreData {
            accounts: accounts
                .into_iter()
                .map(|(address, balance)| LegacyStoreEntry {
                    address: address.to_hex(),
                    balance: balance.to_string(),
                })
                .collect(),
        }),
        schema: SCHEMA_LEGACY,
    })
}
