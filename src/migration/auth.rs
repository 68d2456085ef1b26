// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Auth module extraction: per-account nonce and multisignature
//! configuration, with the protocol-mandated bootstrap accounts appended.

use cs_serde_bytes::ByteBuf;
use serde::{Deserialize, Serialize};

use super::MigrationError;
use crate::address::Address;
use crate::genesis::{
    AuthAccountEntry, AuthStoreData, AuthStoreEntry, GenesisAssetEntry, GenesisPayload,
    MODULE_NAME_AUTH, SCHEMA_AUTH,
};
use crate::ledger::{substores, StateStore, StateStoreExt as _};
use crate::networks::NetworkConstants;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct AuthAccountRecord {
    pub nonce: u64,
    pub number_of_signatures: u32,
    pub mandatory_keys: Vec<ByteBuf>,
    pub optional_keys: Vec<ByteBuf>,
}

pub fn module_entry(
    store: &impl StateStore,
    constants: &NetworkConstants,
) -> Result<GenesisAssetEntry, MigrationError> {
    let substore = &substores::AUTH_ACCOUNTS;
    let mut accounts = Vec::new();
    for (key, record) in store.scan_with_schema::<AuthAccountRecord>(substore)? {
        let address =
            Address::from_bytes(&key).map_err(|e| MigrationError::schema(substore.name, e))?;
        accounts.push((address, record));
    }
    // Bootstrap accounts enter the auth document with a zeroed record.
    for bootstrap in &constants.bootstrap_accounts {
        accounts.push((bootstrap.address, AuthAccountRecord::default()));
    }
    accounts.sort_by_key(|(address, _)| *address);
    accounts.dedup_by_key(|(address, _)| *address);

    let prefix = constants.address_prefix.as_str();
    let auth_data_substore = accounts
        .into_iter()
        .map(|(address, record)| {
            let mut mandatory: Vec<Vec<u8>> =
                record.mandatory_keys.into_iter().map(ByteBuf::into_vec).collect();
            let mut optional: Vec<Vec<u8>> =
                record.optional_keys.into_iter().map(ByteBuf::into_vec).collect();
            mandatory.sort();
            optional.sort();
            AuthStoreEntry {
                address: address.to_canonical(prefix),
                auth_account: AuthAccountEntry {
                    nonce: record.nonce.to_string(),
                    number_of_signatures: record.number_of_signatures,
                    mandatory_keys: mandatory.iter().map(hex::encode).collect(),
                    optional_keys: optional.iter().map(hex::encode).collect(),
                },
            }
        })
        .collect();

    Ok(GenesisAssetEntry {
        module: MODULE_NAME_AUTH.to_owned(),
        data: GenesisPayload::Auth(AuthStoreData { auth_data_substore }),
        schema: SCHEMA_AUTH,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::networks::BootstrapAccount;
    use num_bigint::BigUint;
    use pretty_assertions::assert_eq;

    #[test]
    fn entries_sort_by_raw_address_and_keys_by_bytes() {
        let ledger = MemoryLedger::default();
        ledger.put_cbor(
            &substores::AUTH_ACCOUNTS,
            &[7u8; 20],
            &AuthAccountRecord {
                nonce: 42,
                number_of_signatures: 2,
                mandatory_keys: vec![ByteBuf::from(vec![0xbb; 32]), ByteBuf::from(vec![0xaa; 32])],
                optional_keys: vec![],
            },
        );
        ledger.put_cbor(&substores::AUTH_ACCOUNTS, &[1u8; 20], &AuthAccountRecord::default());

        let constants = NetworkConstants::devnet(10, 5, 2);
        let entry = module_entry(&ledger, &constants).unwrap();
        let GenesisPayload::Auth(data) = &entry.data else {
            panic!("expected auth payload");
        };
        assert_eq!(data.auth_data_substore.len(), 2);
        // [1u8; 20] sorts before [7u8; 20].
        assert_eq!(
            data.auth_data_substore[0].address,
            Address::new([1u8; 20]).to_canonical("kly")
        );
        let multisig = &data.auth_data_substore[1].auth_account;
        assert_eq!(multisig.nonce, "42");
        assert_eq!(
            multisig.mandatory_keys,
            vec![hex::encode([0xaa; 32]), hex::encode([0xbb; 32])]
        );
    }

    #[test]
    fn bootstrap_accounts_get_zeroed_records() {
        let ledger = MemoryLedger::default();
        let mut constants = NetworkConstants::devnet(10, 5, 2);
        constants.bootstrap_accounts = vec![BootstrapAccount {
            address: Address::new([3u8; 20]),
            balance: BigUint::from(1u64),
        }];
        let entry = module_entry(&ledger, &constants).unwrap();
        let GenesisPayload::Auth(data) = &entry.data else {
            panic!("expected auth payload");
        };
        assert_eq!(data.auth_data_substore.len(), 1);
        assert_eq!(data.auth_data_substore[0].auth_account.nonce, "0");
        assert_eq!(data.auth_data_substore[0].auth_account.number_of_signatures, 0);
    }
}
