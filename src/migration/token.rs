// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Token module extraction: user balances, escrow and supply accounting.

use std::collections::BTreeMap;

use ahash::HashMap;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::MigrationError;
use crate::address::{Address, ChainId, TokenId, ADDRESS_LEN};
use crate::genesis::{
    EscrowSubstoreEntry, GenesisAssetEntry, GenesisPayload, LockedBalanceEntry, SupplySubstoreEntry,
    TokenStoreData, UserSubstoreEntry, MODULE_NAME_TOKEN, SCHEMA_TOKEN,
};
use crate::ledger::{substores, StateStore, StateStoreExt as _};
use crate::networks::NetworkConstants;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct UserRecord {
    pub available_balance: u64,
    pub locked_balances: Vec<LockedBalanceRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::migration) struct LockedBalanceRecord {
    pub module: String,
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::migration) struct EscrowRecord {
    pub amount: u64,
}

/// A lock held on a balance by one module. Unique per module name within a
/// [`UserBalance`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockedBalance {
    pub module: String,
    pub amount: BigUint,
}

/// One `(address, token)` balance record, widened to arbitrary precision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserBalance {
    pub address: Address,
    pub token_id: TokenId,
    pub available_balance: BigUint,
    /// Sorted by module name.
    pub locked_balances: Vec<LockedBalance>,
}

impl UserBalance {
    pub fn locked_amount(&self, module: &str) -> BigUint {
        self.locked_balances
            .iter()
            .find(|lock| lock.module == module)
            .map(|lock| lock.amount.clone())
            .unwrap_or_default()
    }

    /// Sets a module's locked amount, inserting the entry in module-name
    /// order if it does not exist yet.
    pub fn set_locked(&mut self, module: &str, amount: BigUint) {
        match self
            .locked_balances
            .binary_search_by(|lock| lock.module.as_str().cmp(module))
        {
            Ok(i) => self.locked_balances[i].amount = amount,
            Err(i) => self.locked_balances.insert(
                i,
                LockedBalance {
                    module: module.to_owned(),
                    amount,
                },
            ),
        }
    }

    /// Available plus all locked amounts.
    pub fn total(&self) -> BigUint {
        self.locked_balances
            .iter()
            .fold(self.available_balance.clone(), |sum, lock| sum + &lock.amount)
    }
}

/// All user balance records plus an `(address, token)` index for the O(1)
/// cross-referencing the reward reconciliation engine needs.
#[derive(Debug, Default)]
pub struct TokenUsers {
    users: Vec<UserBalance>,
    index: HashMap<(Address, TokenId), usize>,
}

impl TokenUsers {
    /// Reads the token user substore and merges the protocol-mandated
    /// bootstrap accounts into it.
    pub fn extract(
        store: &impl StateStore,
        constants: &NetworkConstants,
    ) -> Result<Self, MigrationError> {
        let substore = &substores::TOKEN_USER;
        let mut users = Self::default();
        for (key, record) in store.scan_with_schema::<UserRecord>(substore)? {
            if key.len() != substore.key_len {
                return Err(MigrationError::schema(
                    substore.name,
                    anyhow::anyhow!("unexpected key width {}", key.len()),
                ));
            }
            let address = Address::from_bytes(&key[..ADDRESS_LEN])
                .map_err(|e| MigrationError::schema(substore.name, e))?;
            let token_id = TokenId::from_bytes(&key[ADDRESS_LEN..])
                .map_err(|e| MigrationError::schema(substore.name, e))?;
            let mut locked_balances: Vec<LockedBalance> = record
                .locked_balances
                .into_iter()
                .map(|lock| LockedBalance {
                    module: lock.module,
                    amount: BigUint::from(lock.amount),
                })
                .collect();
            locked_balances.sort_by(|a, b| a.module.cmp(&b.module));
            if locked_balances
                .windows(2)
                .any(|pair| pair[0].module == pair[1].module)
            {
                return Err(MigrationError::schema(
                    substore.name,
                    anyhow::anyhow!("duplicate lock module for {}", hex::encode(key)),
                ));
            }
            users.merge(UserBalance {
                address,
                token_id,
                available_balance: BigUint::from(record.available_balance),
                locked_balances,
            });
        }
        for account in &constants.bootstrap_accounts {
            users.merge(UserBalance {
                address: account.address,
                token_id: constants.token_id,
                available_balance: account.balance.clone(),
                locked_balances: Vec::new(),
            });
        }
        Ok(users)
    }

    /// Adds a record, folding it into an existing `(address, token)` entry if
    /// one exists so the output never carries duplicate keys.
    pub fn merge(&mut self, user: UserBalance) {
        match self.index.get(&(user.address, user.token_id)) {
            Some(&i) => {
                let existing = &mut self.users[i];
                existing.available_balance += user.available_balance;
                for lock in user.locked_balances {
                    let amount = existing.locked_amount(&lock.module) + lock.amount;
                    existing.set_locked(&lock.module, amount);
                }
            }
            None => {
                self.index
                    .insert((user.address, user.token_id), self.users.len());
                self.users.push(user);
            }
        }
    }

    pub fn get(&self, address: Address, token_id: TokenId) -> Option<&UserBalance> {
        self.index
            .get(&(address, token_id))
            .map(|&i| &self.users[i])
    }

    pub fn get_mut(&mut self, address: Address, token_id: TokenId) -> Option<&mut UserBalance> {
        match self.index.get(&(address, token_id)) {
            Some(&i) => Some(&mut self.users[i]),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserBalance> {
        self.users.iter()
    }

    /// Per-token sum of every available and locked amount.
    pub fn token_totals(&self) -> BTreeMap<TokenId, BigUint> {
        let mut totals = BTreeMap::new();
        for user in &self.users {
            *totals.entry(user.token_id).or_insert_with(BigUint::zero) += user.total();
        }
        totals
    }

    /// Consumes the book and returns the records in canonical
    /// `(address, token)` order.
    pub fn into_sorted(mut self) -> Vec<UserBalance> {
        self.users
            .sort_by(|a, b| (a.address, a.token_id).cmp(&(b.address, b.token_id)));
        self.users
    }
}

/// Tokens held on behalf of another chain pending cross-chain settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscrowEntry {
    pub escrow_chain_id: ChainId,
    pub token_id: TokenId,
    pub amount: BigUint,
}

pub fn extract_escrow(store: &impl StateStore) -> Result<Vec<EscrowEntry>, MigrationError> {
    let substore = &substores::TOKEN_ESCROW;
    let mut entries = Vec::new();
    for (key, record) in store.scan_with_schema::<EscrowRecord>(substore)? {
        if key.len() != substore.key_len {
            return Err(MigrationError::schema(
                substore.name,
                anyhow::anyhow!("unexpected key width {}", key.len()),
            ));
        }
        let escrow_chain_id = ChainId::from_bytes(&key[..4])
            .map_err(|e| MigrationError::schema(substore.name, e))?;
        let token_id = TokenId::from_bytes(&key[4..])
            .map_err(|e| MigrationError::schema(substore.name, e))?;
        entries.push(EscrowEntry {
            escrow_chain_id,
            token_id,
            amount: BigUint::from(record.amount),
        });
    }
    // The scan is already key-ordered; the explicit sort documents the
    // canonical `(escrow chain, token)` key and keeps it stable.
    entries.sort_by(|a, b| {
        (a.escrow_chain_id, a.token_id).cmp(&(b.escrow_chain_id, b.token_id))
    });
    Ok(entries)
}

/// Builds the token module document from the post-reconciliation balance
/// book. Total supply per token is the user totals plus that token's escrow.
pub fn module_entry(
    users: TokenUsers,
    escrow: Vec<EscrowEntry>,
    constants: &NetworkConstants,
) -> GenesisAssetEntry {
    let mut supply = users.token_totals();
    for entry in &escrow {
        *supply
            .entry(entry.token_id)
            .or_insert_with(BigUint::zero) += &entry.amount;
    }

    let prefix = constants.address_prefix.as_str();
    let user_substore = users
        .into_sorted()
        .into_iter()
        .map(|user| UserSubstoreEntry {
            address: user.address.to_canonical(prefix),
            token_id: user.token_id.to_hex(),
            available_balance: user.available_balance.to_string(),
            locked_balances: user
                .locked_balances
                .into_iter()
                .map(|lock| LockedBalanceEntry {
                    module: lock.module,
                    amount: lock.amount.to_string(),
                })
                .collect(),
        })
        .collect();

    let supply_substore = supply
        .into_iter()
        .map(|(token_id, total_supply)| SupplySubstoreEntry {
            token_id: token_id.to_hex(),
            total_supply: total_supply.to_string(),
        })
        .collect();

    let escrow_substore = escrow
        .into_iter()
        .map(|entry| EscrowSubstoreEntry {
            escrow_chain_id: entry.escrow_chain_id.to_hex(),
            token_id: entry.token_id.to_hex(),
            amount: entry.amount.to_string(),
        })
        .collect();

    GenesisAssetEntry {
        module: MODULE_NAME_TOKEN.to_owned(),
        data: GenesisPayload::Token(TokenStoreData {
            user_substore,
            supply_substore,
            escrow_substore,
            supported_tokens_substore: Vec::new(),
        }),
        schema: SCHEMA_TOKEN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::networks::BootstrapAccount;
    use pretty_assertions::assert_eq;

    fn user_key(address: [u8; 20], token: [u8; 8]) -> Vec<u8> {
        [&address[..], &token[..]].concat()
    }

    #[test]
    fn users_scan_builds_index_and_widens_amounts() {
        let ledger = MemoryLedger::default();
        ledger.put_cbor(
            &substores::TOKEN_USER,
            &user_key([2u8; 20], [0u8; 8]),
            &UserRecord {
                available_balance: 700,
                locked_balances: vec![LockedBalanceRecord {
                    module: "pos".to_owned(),
                    amount: 300,
                }],
            },
        );
        let constants = NetworkConstants::devnet(10, 5, 2);
        let users = TokenUsers::extract(&ledger, &constants).unwrap();
        let user = users
            .get(Address::new([2u8; 20]), TokenId::new([0u8; 8]))
            .unwrap();
        assert_eq!(user.available_balance, BigUint::from(700u64));
        assert_eq!(user.locked_amount("pos"), BigUint::from(300u64));
        assert_eq!(user.total(), BigUint::from(1000u64));
    }

    #[test]
    fn duplicate_lock_modules_are_rejected() {
        let ledger = MemoryLedger::default();
        ledger.put_cbor(
            &substores::TOKEN_USER,
            &user_key([2u8; 20], [0u8; 8]),
            &UserRecord {
                available_balance: 0,
                locked_balances: vec![
                    LockedBalanceRecord {
                        module: "pos".to_owned(),
                        amount: 1,
                    },
                    LockedBalanceRecord {
                        module: "pos".to_owned(),
                        amount: 2,
                    },
                ],
            },
        );
        let constants = NetworkConstants::devnet(10, 5, 2);
        assert!(matches!(
            TokenUsers::extract(&ledger, &constants),
            Err(MigrationError::SchemaDecode { .. })
        ));
    }

    #[test]
    fn bootstrap_accounts_merge_into_the_book() {
        let ledger = MemoryLedger::default();
        let mut constants = NetworkConstants::devnet(10, 5, 2);
        ledger.put_cbor(
            &substores::TOKEN_USER,
            &user_key([9u8; 20], *constants.token_id.as_bytes()),
            &UserRecord {
                available_balance: 50,
                locked_balances: vec![],
            },
        );
        constants.bootstrap_accounts = vec![
            // New account.
            BootstrapAccount {
                address: Address::new([1u8; 20]),
                balance: BigUint::from(1000u64),
            },
            // Tops up the existing record instead of duplicating the key.
            BootstrapAccount {
                address: Address::new([9u8; 20]),
                balance: BigUint::from(25u64),
            },
        ];
        let users = TokenUsers::extract(&ledger, &constants).unwrap();
        let sorted = users.into_sorted();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].address, Address::new([1u8; 20]));
        assert_eq!(sorted[1].available_balance, BigUint::from(75u64));
    }

    #[test]
    fn escrow_entries_sort_by_token_within_one_chain() {
        let ledger = MemoryLedger::default();
        let chain = [0x00, 0x00, 0x00, 0x02];
        for token in [[9u8, 0, 0, 0, 0, 0, 0, 0], [1u8, 0, 0, 0, 0, 0, 0, 0]] {
            ledger.put_cbor(
                &substores::TOKEN_ESCROW,
                &[&chain[..], &token[..]].concat(),
                &EscrowRecord { amount: 5 },
            );
        }
        let entries = extract_escrow(&ledger).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].token_id, TokenId::new([1, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(entries[1].token_id, TokenId::new([9, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(entries[0].escrow_chain_id, entries[1].escrow_chain_id);
    }

    #[test]
    fn supply_includes_escrow() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let mut users = TokenUsers::default();
        users.merge(UserBalance {
            address: Address::new([1u8; 20]),
            token_id: constants.token_id,
            available_balance: BigUint::from(40u64),
            locked_balances: vec![LockedBalance {
                module: "pos".to_owned(),
                amount: BigUint::from(10u64),
            }],
        });
        let escrow = vec![EscrowEntry {
            escrow_chain_id: ChainId::new([0, 0, 0, 2]),
            token_id: constants.token_id,
            amount: BigUint::from(7u64),
        }];
        let entry = module_entry(users, escrow, &constants);
        let GenesisPayload::Token(data) = &entry.data else {
            panic!("expected token payload");
        };
        assert_eq!(data.supply_substore.len(), 1);
        assert_eq!(data.supply_substore[0].total_supply, "57");
        assert!(data.supported_tokens_substore.is_empty());
    }
}
