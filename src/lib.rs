// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Deterministic transformation of a snapshotted key-value ledger into the
//! genesis state of the successor protocol version.
//!
//! The pipeline reads the frozen substores of the old chain (accounts,
//! validators, stakers, token balances, cross-chain state), brings every
//! staker's reward accounting up to date as of the snapshot height, resolves
//! the genesis active-validator set from historical vote-weight data and
//! assembles five schema-tagged module documents. Replaying the pipeline on
//! identical input yields byte-identical output.
//!
//! Snapshot acquisition, configuration files and process orchestration are
//! the caller's concern; this crate only consumes a [`ledger::StateStore`],
//! a [`ledger::BlockStore`] and a set of [`networks::NetworkConstants`].

pub mod address;
pub mod genesis;
pub mod ledger;
pub mod migration;
pub mod networks;
pub mod q96;
