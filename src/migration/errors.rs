// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

use crate::q96::Q96Error;

/// Migration failures. Every variant is terminal: a deterministic snapshot
/// transform has no meaningful partial-success state, so the pipeline aborts
/// on the first error and never emits a partial document set.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Malformed or unexpected binary record in a substore.
    #[error("malformed record in {substore} substore")]
    SchemaDecode {
        substore: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Required historical vote-weight data is absent or empty.
    #[error("vote-weight snapshot for round {round} is missing or empty")]
    MissingSnapshot { round: u64 },

    /// Applying a reward transfer would drive a locked balance negative.
    /// Signals inconsistency in the source ledger.
    #[error("reconciliation would drive the locked balance of {address} negative")]
    NegativeBalance { address: String },

    /// A stake's stored coefficient exceeds its validator's current one.
    #[error("reward coefficient underflow for validator {address}")]
    Underflow {
        address: String,
        #[source]
        source: Q96Error,
    },

    /// Degenerate configuration: zero round length or zero snapshot height.
    #[error("degenerate configuration: snapshot height and round length must be positive")]
    Division,

    /// A reconciliation step references an address missing from the expected
    /// index. Signals data corruption in the source ledger.
    #[error("{context} references unknown key {address}")]
    AddressNotFound {
        context: &'static str,
        address: String,
    },

    /// Post-reconciliation totals differ from the pre-migration supply.
    #[error("token {token} supply changed during reconciliation: {before} -> {after}")]
    ConservationViolation {
        token: String,
        before: String,
        after: String,
    },

    /// Backend store failure.
    #[error("ledger store failure")]
    Store(#[from] anyhow::Error),
}

impl MigrationError {
    pub(crate) fn schema(
        substore: &'static str,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::SchemaDecode {
            substore,
            source: source.into(),
        }
    }
}
