// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The migration pipeline: module extractors, reward reconciliation, genesis
//! validator selection and final document assembly.
//!
//! Stages run strictly in sequence over a read-only snapshot; nothing is
//! written back. Assembly is all or nothing: the first failing stage aborts
//! the run and no partial document list is ever returned.

use std::time::Instant;

use tracing::info;

pub mod auth;
mod errors;
pub mod interoperability;
pub mod legacy;
pub mod pos;
pub mod rewards;
pub mod token;

pub use errors::MigrationError;

use crate::genesis::GenesisAssetEntry;
use crate::ledger::{BlockStore, StateStore};
use crate::networks::NetworkConstants;

/// Runs the full migration over one frozen snapshot and returns the five
/// module documents sorted by module name.
pub fn assemble_genesis<S, B>(
    state: &S,
    blocks: &B,
    constants: &NetworkConstants,
) -> Result<Vec<GenesisAssetEntry>, MigrationError>
where
    S: StateStore + Sync,
    B: BlockStore,
{
    if constants.snapshot_height == 0
        || constants.round_length == 0
        || constants.snapshot_height < constants.prev_snapshot_height
    {
        return Err(MigrationError::Division);
    }
    let started = Instant::now();
    info!(
        chain = %constants.chain_name,
        height = constants.snapshot_height,
        "starting genesis assembly"
    );

    let legacy = legacy::module_entry(state)?;
    let auth = auth::module_entry(state, constants)?;

    let mut users = token::TokenUsers::extract(state, constants)?;
    let escrow = token::extract_escrow(state)?;
    let validators = pos::extract_validators(state, blocks, constants)?;
    let mut stakers = pos::extract_stakers(state, constants)?;
    info!(
        validators = validators.len(),
        stakers = stakers.len(),
        elapsed = ?started.elapsed(),
        "extraction complete, reconciling rewards"
    );

    rewards::reconcile(&mut users, &validators, &mut stakers, constants)?;

    let genesis_data = pos::select_genesis_validators(state, &validators, constants)?;
    info!(
        selected = genesis_data.init_validators.len(),
        "genesis validator set selected"
    );

    let token = token::module_entry(users, escrow, constants);
    let pos = pos::module_entry(validators, stakers, genesis_data, constants);
    let interoperability = interoperability::module_entry(state, constants)?;

    let mut entries = vec![legacy, auth, token, pos, interoperability];
    entries.sort_by(|a, b| a.module.cmp(&b.module));
    info!(elapsed = ?started.elapsed(), "genesis assembly complete");
    Ok(entries)
}
