// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Proof-of-stake extraction: validators, stakers, generator-key recovery
//! from the block store and the genesis active-validator selection.

use ahash::{HashMap, HashSet};
use cs_serde_bytes::ByteBuf;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::MigrationError;
use crate::address::{Address, TokenId};
use crate::genesis::{
    GenesisAssetEntry, GenesisDataEntry, GenesisPayload, PendingUnlockEntry, PosStoreData,
    SharingCoefficientEntry, StakeEntry, StakerEntry, ValidatorEntry, MODULE_NAME_POS, SCHEMA_POS,
};
use crate::ledger::{substores, BlockStore, StateStore, StateStoreExt as _};
use crate::networks::{
    NetworkConstants, RoundLookup, DUMMY_PROOF_OF_POSSESSION, INVALID_BLS_KEY, INVALID_ED25519_KEY,
};
use crate::q96::Q96;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct ValidatorRecord {
    pub name: String,
    /// Empty when the validator never generated a block.
    pub generator_key: ByteBuf,
    /// Empty when the validator never registered one.
    pub bls_key: ByteBuf,
    pub proof_of_possession: ByteBuf,
    pub last_generated_height: u64,
    pub is_banned: bool,
    pub report_misbehavior_heights: Vec<u64>,
    pub consecutive_missed_blocks: u32,
    pub commission: u32,
    pub last_commission_increase_height: u64,
    pub sharing_coefficients: Vec<SharingCoefficientRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::migration) struct SharingCoefficientRecord {
    #[serde(rename = "tokenID")]
    pub token_id: ByteBuf,
    pub coefficient: ByteBuf,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct StakerRecord {
    pub stakes: Vec<StakeRecord>,
    pub pending_unlocks: Vec<PendingUnlockRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct StakeRecord {
    pub validator_address: ByteBuf,
    pub amount: u64,
    pub sharing_coefficients: Vec<SharingCoefficientRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct PendingUnlockRecord {
    pub validator_address: ByteBuf,
    pub amount: u64,
    pub unstake_height: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::migration) struct VoteWeightsRecord {
    pub entries: Vec<VoteWeightEntryRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(in crate::migration) struct VoteWeightEntryRecord {
    pub address: ByteBuf,
    pub weight: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct BlockHeaderRecord {
    pub height: u64,
    pub generator_public_key: ByteBuf,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct TransactionRecord {
    pub sender_public_key: ByteBuf,
}

/// Cumulative reward-per-share for one token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharingCoefficient {
    pub token_id: TokenId,
    pub coefficient: Q96,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    pub address: Address,
    pub name: String,
    pub bls_key: Vec<u8>,
    pub proof_of_possession: Vec<u8>,
    pub generator_key: Vec<u8>,
    pub last_generated_height: u64,
    pub is_banned: bool,
    pub report_misbehavior_heights: Vec<u64>,
    pub consecutive_missed_blocks: u32,
    pub commission: u32,
    pub last_commission_increase_height: u64,
    /// Sorted by token id; always carries an entry for the native token.
    pub sharing_coefficients: Vec<SharingCoefficient>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stake {
    pub validator_address: Address,
    pub amount: BigUint,
    /// Coefficient snapshot at the staker's last reward claim.
    pub sharing_coefficients: Vec<SharingCoefficient>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingUnlock {
    pub validator_address: Address,
    pub amount: BigUint,
    pub unstake_height: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Staker {
    pub address: Address,
    /// Sorted by validator address bytes.
    pub stakes: Vec<Stake>,
    pub pending_unlocks: Vec<PendingUnlock>,
}

/// Genesis active-validator set, already in canonical order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisData {
    pub init_rounds: u32,
    pub init_validators: Vec<Address>,
}

fn decode_coefficients(
    substore_name: &'static str,
    records: Vec<SharingCoefficientRecord>,
    native_token: TokenId,
) -> Result<Vec<SharingCoefficient>, MigrationError> {
    let mut coefficients = records
        .into_iter()
        .map(|record| {
            Ok(SharingCoefficient {
                token_id: TokenId::from_bytes(&record.token_id)
                    .map_err(|e| MigrationError::schema(substore_name, e))?,
                coefficient: Q96::from_bytes(&record.coefficient)
                    .map_err(|e| MigrationError::schema(substore_name, e))?,
            })
        })
        .collect::<Result<Vec<_>, MigrationError>>()?;
    if !coefficients.iter().any(|c| c.token_id == native_token) {
        coefficients.push(SharingCoefficient {
            token_id: native_token,
            coefficient: Q96::zero(),
        });
    }
    coefficients.sort_by_key(|c| c.token_id);
    Ok(coefficients)
}

/// Maps generator addresses to the public keys observed in the blocks
/// between the previous snapshot and the migration snapshot. Transaction
/// sender keys count too, but only for registered validators.
fn recover_generator_keys(
    blocks: &impl BlockStore,
    registered: &HashSet<Address>,
    constants: &NetworkConstants,
) -> Result<HashMap<Address, Vec<u8>>, MigrationError> {
    let mut keys: HashMap<Address, Vec<u8>> = HashMap::default();
    let ids =
        blocks.block_ids_by_height(constants.prev_snapshot_height + 1, constants.snapshot_height)?;
    for id in ids {
        let raw = blocks
            .block_header(&id)?
            .ok_or_else(|| MigrationError::AddressNotFound {
                context: "block header lookup",
                address: hex::encode(&id),
            })?;
        let header: BlockHeaderRecord = serde_ipld_dagcbor::from_slice(&raw)
            .map_err(|e| MigrationError::schema("blocks:header", anyhow::Error::new(e)))?;
        let generator = Address::from_public_key(&header.generator_public_key);
        keys.insert(generator, header.generator_public_key.into_vec());

        for raw_tx in blocks.transactions(&id)? {
            let tx: TransactionRecord = serde_ipld_dagcbor::from_slice(&raw_tx)
                .map_err(|e| MigrationError::schema("blocks:transactions", anyhow::Error::new(e)))?;
            let sender = Address::from_public_key(&tx.sender_public_key);
            if registered.contains(&sender) {
                keys.insert(sender, tx.sender_public_key.into_vec());
            }
        }
    }
    Ok(keys)
}

/// Reads the validator substore and fills unregistered key material with the
/// protocol placeholders.
pub fn extract_validators(
    store: &impl StateStore,
    blocks: &impl BlockStore,
    constants: &NetworkConstants,
) -> Result<Vec<Validator>, MigrationError> {
    let substore = &substores::POS_VALIDATORS;
    let mut records = Vec::new();
    for (key, record) in store.scan_with_schema::<ValidatorRecord>(substore)? {
        let address =
            Address::from_bytes(&key).map_err(|e| MigrationError::schema(substore.name, e))?;
        records.push((address, record));
    }
    let registered: HashSet<Address> = records.iter().map(|(address, _)| *address).collect();
    let recovered = recover_generator_keys(blocks, &registered, constants)?;

    let mut validators = Vec::with_capacity(records.len());
    for (address, record) in records {
        let generator_key = if record.generator_key.is_empty() {
            recovered
                .get(&address)
                .cloned()
                .unwrap_or_else(|| INVALID_ED25519_KEY.to_vec())
        } else {
            record.generator_key.into_vec()
        };
        let bls_key = if record.bls_key.is_empty() {
            INVALID_BLS_KEY.to_vec()
        } else {
            record.bls_key.into_vec()
        };
        let proof_of_possession = if record.proof_of_possession.is_empty() {
            DUMMY_PROOF_OF_POSSESSION.to_vec()
        } else {
            record.proof_of_possession.into_vec()
        };
        validators.push(Validator {
            address,
            name: record.name,
            bls_key,
            proof_of_possession,
            generator_key,
            last_generated_height: record.last_generated_height,
            is_banned: record.is_banned,
            report_misbehavior_heights: record.report_misbehavior_heights,
            consecutive_missed_blocks: record.consecutive_missed_blocks,
            commission: record.commission,
            last_commission_increase_height: record.last_commission_increase_height,
            sharing_coefficients: decode_coefficients(
                substore.name,
                record.sharing_coefficients,
                constants.token_id,
            )?,
        });
    }
    validators.sort_by_key(|v| v.address);
    Ok(validators)
}

pub fn extract_stakers(
    store: &impl StateStore,
    constants: &NetworkConstants,
) -> Result<Vec<Staker>, MigrationError> {
    let substore = &substores::POS_STAKERS;
    let mut stakers = Vec::new();
    for (key, record) in store.scan_with_schema::<StakerRecord>(substore)? {
        let address =
            Address::from_bytes(&key).map_err(|e| MigrationError::schema(substore.name, e))?;
        let mut stakes = record
            .stakes
            .into_iter()
            .map(|stake| {
                Ok(Stake {
                    validator_address: Address::from_bytes(&stake.validator_address)
                        .map_err(|e| MigrationError::schema(substore.name, e))?,
                    amount: BigUint::from(stake.amount),
                    sharing_coefficients: decode_coefficients(
                        substore.name,
                        stake.sharing_coefficients,
                        constants.token_id,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, MigrationError>>()?;
        stakes.sort_by_key(|stake| stake.validator_address);
        let pending_unlocks = record
            .pending_unlocks
            .into_iter()
            .map(|unlock| {
                Ok(PendingUnlock {
                    validator_address: Address::from_bytes(&unlock.validator_address)
                        .map_err(|e| MigrationError::schema(substore.name, e))?,
                    amount: BigUint::from(unlock.amount),
                    unstake_height: unlock.unstake_height,
                })
            })
            .collect::<Result<Vec<_>, MigrationError>>()?;
        stakers.push(Staker {
            address,
            stakes,
            pending_unlocks,
        });
    }
    stakers.sort_by_key(|staker| staker.address);
    Ok(stakers)
}

pub(in crate::migration) fn ceil_div(a: u64, b: u64) -> Result<u64, MigrationError> {
    if b == 0 {
        return Err(MigrationError::Division);
    }
    Ok(a.div_ceil(b))
}

/// Picks the genesis active-validator set from the historical vote-weight
/// snapshot. The snapshot entries are assumed pre-ranked by weight; this
/// never re-ranks, it only filters banned validators and caps the count.
pub fn select_genesis_validators(
    store: &impl StateStore,
    validators: &[Validator],
    constants: &NetworkConstants,
) -> Result<GenesisData, MigrationError> {
    let height = constants
        .snapshot_height
        .checked_sub(constants.prev_snapshot_height)
        .ok_or(MigrationError::Division)?;
    let target = ceil_div(height, constants.round_length)?;
    let round = match constants.round_lookup {
        RoundLookup::Snapshot => target,
        RoundLookup::TwoRoundsBack => target
            .checked_sub(2)
            .ok_or(MigrationError::MissingSnapshot { round: target })?,
    };

    let key = u32::try_from(round)
        .map_err(|_| MigrationError::MissingSnapshot { round })?
        .to_be_bytes();
    let snapshot: Option<VoteWeightsRecord> =
        store.get_with_schema(&substores::POS_VOTE_WEIGHTS, &key)?;
    let entries = match snapshot {
        Some(record) if !record.entries.is_empty() => record.entries,
        _ => return Err(MigrationError::MissingSnapshot { round }),
    };

    let banned: HashSet<Address> = validators
        .iter()
        .filter(|v| v.is_banned)
        .map(|v| v.address)
        .collect();

    let mut selected = Vec::with_capacity(constants.active_validator_count);
    for entry in &entries {
        if selected.len() == constants.active_validator_count {
            break;
        }
        let address = Address::from_bytes(&entry.address)
            .map_err(|e| MigrationError::schema(substores::POS_VOTE_WEIGHTS.name, e))?;
        if !banned.contains(&address) {
            selected.push(address);
        }
    }
    selected.sort();

    Ok(GenesisData {
        init_rounds: constants.pos_init_rounds,
        init_validators: selected,
    })
}

fn coefficient_entries(coefficients: &[SharingCoefficient]) -> Vec<SharingCoefficientEntry> {
    coefficients
        .iter()
        .map(|c| SharingCoefficientEntry {
            token_id: c.token_id.to_hex(),
            coefficient: hex::encode(c.coefficient.to_bytes()),
        })
        .collect()
}

pub fn module_entry(
    validators: Vec<Validator>,
    stakers: Vec<Staker>,
    genesis_data: GenesisData,
    constants: &NetworkConstants,
) -> GenesisAssetEntry {
    let prefix = constants.address_prefix.as_str();
    let validators = validators
        .into_iter()
        .map(|v| ValidatorEntry {
            address: v.address.to_canonical(prefix),
            name: v.name,
            bls_key: hex::encode(&v.bls_key),
            proof_of_possession: hex::encode(&v.proof_of_possession),
            generator_key: hex::encode(&v.generator_key),
            last_generated_height: v.last_generated_height,
            is_banned: v.is_banned,
            report_misbehavior_heights: v.report_misbehavior_heights,
            consecutive_missed_blocks: v.consecutive_missed_blocks,
            commission: v.commission,
            last_commission_increase_height: v.last_commission_increase_height,
            sharing_coefficients: coefficient_entries(&v.sharing_coefficients),
        })
        .collect();

    let stakers = stakers
        .into_iter()
        .map(|staker| StakerEntry {
            address: staker.address.to_canonical(prefix),
            stakes: staker
                .stakes
                .iter()
                .map(|stake| StakeEntry {
                    validator_address: stake.validator_address.to_canonical(prefix),
                    amount: stake.amount.to_string(),
                    sharing_coefficients: coefficient_entries(&stake.sharing_coefficients),
                })
                .collect(),
            pending_unlocks: staker
                .pending_unlocks
                .iter()
                .map(|unlock| PendingUnlockEntry {
                    validator_address: unlock.validator_address.to_canonical(prefix),
                    amount: unlock.amount.to_string(),
                    unstake_height: unlock.unstake_height,
                })
                .collect(),
        })
        .collect();

    GenesisAssetEntry {
        module: MODULE_NAME_POS.to_owned(),
        data: GenesisPayload::Pos(PosStoreData {
            validators,
            stakers,
            genesis_data: GenesisDataEntry {
                init_rounds: genesis_data.init_rounds,
                init_validators: genesis_data
                    .init_validators
                    .iter()
                    .map(|address| address.to_canonical(prefix))
                    .collect(),
            },
        }),
        schema: SCHEMA_POS,
    }
}
