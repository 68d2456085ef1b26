// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Per-network migration constants.
//!
//! Everything the pipeline needs beyond the two stores is carried in an
//! immutable [`NetworkConstants`] value threaded by reference into every
//! component. There is no process-wide mutable network state.

use num_bigint::BigUint;

use crate::address::{Address, TokenId};

/// Placeholder BLS key for validators that never registered one.
pub const INVALID_BLS_KEY: [u8; 48] = [0u8; 48];
/// Placeholder generator key for validators with no recoverable key.
pub const INVALID_ED25519_KEY: [u8; 32] = [0xff; 32];
/// Placeholder proof of possession matching [`INVALID_BLS_KEY`].
pub const DUMMY_PROOF_OF_POSSESSION: [u8; 96] = [0u8; 96];

/// Commission assigned to every migrated validator, in basis points.
pub const MAX_COMMISSION: u32 = 10_000;

/// Lock-owner module name of staking locks.
pub const POS_MODULE_NAME: &str = "pos";

/// Which historical vote-weight round the genesis validator selector reads.
///
/// Two protocol releases disagreed here; the behavior is an explicit switch
/// rather than a silent reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoundLookup {
    /// Read the snapshot for the target round exactly. Canonical.
    #[default]
    Snapshot,
    /// Read the snapshot two rounds back, as the first release did.
    TwoRoundsBack,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapAccount {
    pub address: Address,
    pub balance: BigUint,
}

/// Immutable migration configuration for one network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConstants {
    /// Own chain name placed into the interoperability document.
    pub chain_name: String,
    /// Canonical address prefix, e.g. `kly`.
    pub address_prefix: String,
    /// Native token of the chain; staking locks and rewards use it.
    pub token_id: TokenId,
    /// Height of the frozen snapshot this migration reads. Must be > 0.
    pub snapshot_height: u64,
    /// Height of the previous protocol-upgrade snapshot block.
    pub prev_snapshot_height: u64,
    /// Blocks per round. Must be > 0.
    pub round_length: u64,
    /// Maximum size of the genesis active-validator set.
    pub active_validator_count: usize,
    /// `initRounds` constant of the genesis proof-of-stake document.
    pub pos_init_rounds: u32,
    /// Protocol-mandated accounts merged into the token and auth documents.
    pub bootstrap_accounts: Vec<BootstrapAccount>,
    pub round_lookup: RoundLookup,
}

impl NetworkConstants {
    pub fn mainnet(snapshot_height: u64) -> Self {
        Self {
            chain_name: "klayr_mainchain".to_owned(),
            address_prefix: "kly".to_owned(),
            token_id: TokenId::new([0, 0, 0, 0, 0, 0, 0, 0]),
            snapshot_height,
            prev_snapshot_height: 16_270_293,
            round_length: 103,
            active_validator_count: 101,
            pos_init_rounds: 60_480,
            bootstrap_accounts: Vec::new(),
            round_lookup: RoundLookup::default(),
        }
    }

    pub fn testnet(snapshot_height: u64) -> Self {
        Self {
            chain_name: "klayr_mainchain".to_owned(),
            address_prefix: "kly".to_owned(),
            token_id: TokenId::new([1, 0, 0, 0, 0, 0, 0, 0]),
            snapshot_height,
            prev_snapshot_height: 14_075_260,
            round_length: 103,
            active_validator_count: 101,
            pos_init_rounds: 60_480,
            bootstrap_accounts: Vec::new(),
            round_lookup: RoundLookup::default(),
        }
    }

    /// Small, fully explicit configuration for tests.
    pub fn devnet(snapshot_height: u64, round_length: u64, active_validator_count: usize) -> Self {
        Self {
            chain_name: "devnet_mainchain".to_owned(),
            address_prefix: "kly".to_owned(),
            token_id: TokenId::new([4, 0, 0, 0, 0, 0, 0, 0]),
            snapshot_height,
            prev_snapshot_height: 0,
            round_length,
            active_validator_count,
            pos_init_rounds: 3,
            bootstrap_accounts: Vec::new(),
            round_lookup: RoundLookup::default(),
        }
    }
}
