// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Interoperability extraction: own-chain account, partner chain accounts
//! with their channel and validator sets, and terminated accounts.

use cs_serde_bytes::ByteBuf;
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};
use serde::{Deserialize, Serialize};

use super::MigrationError;
use crate::address::ChainId;
use crate::genesis::{
    ActiveValidatorEntry, ChainDataEntry, ChainInfoEntry, ChainValidatorsEntry, ChannelDataEntry,
    GenesisAssetEntry, GenesisPayload, InteropStoreData, LastCertificateEntry, MailboxEntry,
    TerminatedOutboxAccountEntry, TerminatedOutboxEntry, TerminatedStateAccountEntry,
    TerminatedStateEntry, MODULE_NAME_INTEROPERABILITY, SCHEMA_INTEROPERABILITY,
};
use crate::ledger::{substores, StateStore, StateStoreExt as _};
use crate::networks::NetworkConstants;

/// Worker cap for the per-chain channel and validator-set lookups. The
/// lookups are independent per chain but the backing store should not be
/// hammered with unbounded concurrency.
const INTEROP_FANOUT: usize = 4;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct OwnChainRecord {
    pub name: String,
    #[serde(rename = "chainID")]
    pub chain_id: ByteBuf,
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct ChainDataRecord {
    pub name: String,
    pub last_certificate: LastCertificateRecord,
    pub status: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct LastCertificateRecord {
    pub height: u64,
    pub timestamp: u64,
    pub state_root: ByteBuf,
    pub validators_hash: ByteBuf,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct ChannelDataRecord {
    pub inbox: MailboxRecord,
    pub outbox: MailboxRecord,
    pub partner_chain_outbox_root: ByteBuf,
    #[serde(rename = "messageFeeTokenID")]
    pub message_fee_token_id: ByteBuf,
    pub min_return_fee_per_byte: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct MailboxRecord {
    pub append_path: Vec<ByteBuf>,
    pub size: u32,
    pub root: ByteBuf,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct ChainValidatorsRecord {
    pub active_validators: Vec<ActiveValidatorRecord>,
    pub certificate_threshold: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct ActiveValidatorRecord {
    pub bls_key: ByteBuf,
    pub bft_weight: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct TerminatedStateRecord {
    pub state_root: ByteBuf,
    pub mainchain_state_root: ByteBuf,
    pub initialized: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(in crate::migration) struct TerminatedOutboxRecord {
    pub outbox_root: ByteBuf,
    pub outbox_size: u32,
    pub partner_chain_inbox_size: u32,
}

fn mailbox_entry(record: MailboxRecord) -> MailboxEntry {
    MailboxEntry {
        append_path: record.append_path.iter().map(hex::encode).collect(),
        size: record.size,
        root: hex::encode(&record.root),
    }
}

fn chain_info_entry(
    chain_id: ChainId,
    chain_data: ChainDataRecord,
    channel: ChannelDataRecord,
    validators: ChainValidatorsRecord,
) -> ChainInfoEntry {
    ChainInfoEntry {
        chain_id: chain_id.to_hex(),
        chain_data: ChainDataEntry {
            name: chain_data.name,
            last_certificate: LastCertificateEntry {
                height: chain_data.last_certificate.height,
                timestamp: chain_data.last_certificate.timestamp,
                state_root: hex::encode(&chain_data.last_certificate.state_root),
                validators_hash: hex::encode(&chain_data.last_certificate.validators_hash),
            },
            status: chain_data.status,
        },
        channel_data: ChannelDataEntry {
            inbox: mailbox_entry(channel.inbox),
            outbox: mailbox_entry(channel.outbox),
            partner_chain_outbox_root: hex::encode(&channel.partner_chain_outbox_root),
            message_fee_token_id: hex::encode(&channel.message_fee_token_id),
            min_return_fee_per_byte: channel.min_return_fee_per_byte.to_string(),
        },
        chain_validators: ChainValidatorsEntry {
            active_validators: validators
                .active_validators
                .into_iter()
                .map(|v| ActiveValidatorEntry {
                    bls_key: hex::encode(&v.bls_key),
                    bft_weight: v.bft_weight.to_string(),
                })
                .collect(),
            certificate_threshold: validators.certificate_threshold.to_string(),
        },
    }
}

/// Builds the interoperability document. The channel-data and validator-set
/// lookups run on a bounded worker pool; results are collected back into the
/// ascending chain-id order of the primary scan regardless of completion
/// order.
pub fn module_entry<S: StateStore + Sync>(
    store: &S,
    constants: &NetworkConstants,
) -> Result<GenesisAssetEntry, MigrationError> {
    let own_chain: Option<OwnChainRecord> =
        store.get_with_schema(&substores::INTEROP_OWN_CHAIN, &[])?;
    let (own_chain_name, own_chain_nonce) = match own_chain {
        Some(record) => (record.name, record.nonce),
        None => (constants.chain_name.clone(), 0),
    };

    let mut chains = Vec::new();
    for (key, record) in store.scan_with_schema::<ChainDataRecord>(&substores::INTEROP_CHAIN_DATA)? {
        let chain_id = ChainId::from_bytes(&key)
            .map_err(|e| MigrationError::schema(substores::INTEROP_CHAIN_DATA.name, e))?;
        chains.push((chain_id, record));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(INTEROP_FANOUT)
        .build()
        .map_err(|e| MigrationError::Store(anyhow::Error::new(e)))?;
    let chain_infos = pool.install(|| {
        chains
            .par_iter()
            .map(|(chain_id, _)| {
                let channel: ChannelDataRecord = store
                    .require_with_schema(&substores::INTEROP_CHANNEL_DATA, chain_id.as_bytes())?;
                let validators: ChainValidatorsRecord = store.require_with_schema(
                    &substores::INTEROP_CHAIN_VALIDATORS,
                    chain_id.as_bytes(),
                )?;
                Ok((channel, validators))
            })
            .collect::<Result<Vec<_>, MigrationError>>()
    })?;
    let chain_infos = chains
        .into_iter()
        .zip(chain_infos)
        .map(|((chain_id, chain_data), (channel, validators))| {
            chain_info_entry(chain_id, chain_data, channel, validators)
        })
        .collect();

    let mut terminated_state_accounts = Vec::new();
    for (key, record) in
        store.scan_with_schema::<TerminatedStateRecord>(&substores::INTEROP_TERMINATED_STATE)?
    {
        let chain_id = ChainId::from_bytes(&key)
            .map_err(|e| MigrationError::schema(substores::INTEROP_TERMINATED_STATE.name, e))?;
        terminated_state_accounts.push(TerminatedStateAccountEntry {
            chain_id: chain_id.to_hex(),
            terminated_state_account: TerminatedStateEntry {
                state_root: hex::encode(&record.state_root),
                mainchain_state_root: hex::encode(&record.mainchain_state_root),
                initialized: record.initialized,
            },
        });
    }

    let mut terminated_outbox_accounts = Vec::new();
    for (key, record) in
        store.scan_with_schema::<TerminatedOutboxRecord>(&substores::INTEROP_TERMINATED_OUTBOX)?
    {
        let chain_id = ChainId::from_bytes(&key)
            .map_err(|e| MigrationError::schema(substores::INTEROP_TERMINATED_OUTBOX.name, e))?;
        terminated_outbox_accounts.push(TerminatedOutboxAccountEntry {
            chain_id: chain_id.to_hex(),
            terminated_outbox_account: TerminatedOutboxEntry {
                outbox_root: hex::encode(&record.outbox_root),
                outbox_size: record.outbox_size,
                partner_chain_inbox_size: record.partner_chain_inbox_size,
            },
        });
    }

    Ok(GenesisAssetEntry {
        module: MODULE_NAME_INTEROPERABILITY.to_owned(),
        data: GenesisPayload::Interoperability(InteropStoreData {
            own_chain_name,
            own_chain_nonce: own_chain_nonce.to_string(),
            chain_infos,
            terminated_state_accounts,
            terminated_outbox_accounts,
        }),
        schema: SCHEMA_INTEROPERABILITY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use pretty_assertions::assert_eq;

    fn seed_chain(ledger: &MemoryLedger, chain_id: [u8; 4], name: &str) {
        ledger.put_cbor(
            &substores::INTEROP_CHAIN_DATA,
            &chain_id,
            &ChainDataRecord {
                name: name.to_owned(),
                last_certificate: LastCertificateRecord {
                    height: 7,
                    timestamp: 170,
                    state_root: ByteBuf::from(vec![0xaa; 32]),
                    validators_hash: ByteBuf::from(vec![0xbb; 32]),
                },
                status: 0,
            },
        );
        ledger.put_cbor(
            &substores::INTEROP_CHANNEL_DATA,
            &chain_id,
            &ChannelDataRecord {
                inbox: MailboxRecord {
                    append_path: vec![],
                    size: 1,
                    root: ByteBuf::from(vec![0x01; 32]),
                },
                outbox: MailboxRecord {
                    append_path: vec![ByteBuf::from(vec![0x02; 32])],
                    size: 2,
                    root: ByteBuf::from(vec![0x03; 32]),
                },
                partner_chain_outbox_root: ByteBuf::from(vec![0x04; 32]),
                message_fee_token_id: ByteBuf::from(vec![0, 0, 0, 0, 0, 0, 0, 0]),
                min_return_fee_per_byte: 1000,
            },
        );
        ledger.put_cbor(
            &substores::INTEROP_CHAIN_VALIDATORS,
            &chain_id,
            &ChainValidatorsRecord {
                active_validators: vec![ActiveValidatorRecord {
                    bls_key: ByteBuf::from(vec![0x05; 48]),
                    bft_weight: 1,
                }],
                certificate_threshold: 68,
            },
        );
    }

    #[test]
    fn chain_infos_keep_ascending_chain_id_order() {
        let ledger = MemoryLedger::default();
        for (chain_id, name) in [
            ([0u8, 0, 0, 3], "gamma"),
            ([0u8, 0, 0, 1], "alpha"),
            ([0u8, 0, 0, 2], "beta"),
        ] {
            seed_chain(&ledger, chain_id, name);
        }
        let constants = NetworkConstants::devnet(10, 5, 2);
        let entry = module_entry(&ledger, &constants).unwrap();
        let GenesisPayload::Interoperability(data) = &entry.data else {
            panic!("expected interoperability payload");
        };
        let ids: Vec<&str> = data.chain_infos.iter().map(|c| c.chain_id.as_str()).collect();
        assert_eq!(ids, vec!["00000001", "00000002", "00000003"]);
        assert_eq!(data.chain_infos[0].chain_data.name, "alpha");
        assert_eq!(
            data.chain_infos[0].channel_data.outbox.append_path,
            vec![hex::encode([0x02; 32])]
        );
        assert_eq!(
            data.chain_infos[0].chain_validators.certificate_threshold,
            "68"
        );
    }

    #[test]
    fn own_chain_account_falls_back_to_configuration() {
        let ledger = MemoryLedger::default();
        let constants = NetworkConstants::devnet(10, 5, 2);
        let entry = module_entry(&ledger, &constants).unwrap();
        let GenesisPayload::Interoperability(data) = &entry.data else {
            panic!("expected interoperability payload");
        };
        assert_eq!(data.own_chain_name, constants.chain_name);
        assert_eq!(data.own_chain_nonce, "0");
        assert!(data.chain_infos.is_empty());
    }

    #[test]
    fn missing_channel_data_is_fatal() {
        let ledger = MemoryLedger::default();
        seed_chain(&ledger, [0u8, 0, 0, 1], "alpha");
        ledger.put_cbor(
            &substores::INTEROP_CHAIN_DATA,
            &[0u8, 0, 0, 9],
            &ChainDataRecord {
                name: "orphan".to_owned(),
                last_certificate: LastCertificateRecord {
                    height: 0,
                    timestamp: 0,
                    state_root: ByteBuf::from(vec![0; 32]),
                    validators_hash: ByteBuf::from(vec![0; 32]),
                },
                status: 0,
            },
        );
        let constants = NetworkConstants::devnet(10, 5, 2);
        assert!(matches!(
            module_entry(&ledger, &constants),
            Err(MigrationError::AddressNotFound { .. })
        ));
    }
}
