// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Output documents of the migration.
//!
//! These are the five module-scoped genesis assets. All binary values are
//! rendered as lowercase hex, account addresses in canonical form and every
//! amount as a decimal string; the structures carry no raw bytes so a
//! serialized document is locale- and platform-independent.

use serde::Serialize;

pub const MODULE_NAME_LEGACY: &str = "legacy";
pub const MODULE_NAME_AUTH: &str = "auth";
pub const MODULE_NAME_TOKEN: &str = "token";
pub const MODULE_NAME_POS: &str = "pos";
pub const MODULE_NAME_INTEROPERABILITY: &str = "interoperability";

pub const SCHEMA_LEGACY: &str = "/legacy/store/genesis";
pub const SCHEMA_AUTH: &str = "/auth/store/genesis";
pub const SCHEMA_TOKEN: &str = "/token/store/genesis";
pub const SCHEMA_POS: &str = "/pos/store/genesis";
pub const SCHEMA_INTEROPERABILITY: &str = "/interoperability/store/genesis";

/// One module-scoped genesis document. The final result is the list of five,
/// sorted by `module` ascending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenesisAssetEntry {
    pub module: String,
    pub data: GenesisPayload,
    pub schema: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GenesisPayload {
    Legacy(LegacyStoreData),
    Auth(AuthStoreData),
    Token(TokenStoreData),
    Pos(PosStoreData),
    Interoperability(InteropStoreData),
}

// Legacy module.

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LegacyStoreData {
    pub accounts: Vec<LegacyStoreEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LegacyStoreEntry {
    /// Hex of the 8-byte legacy address.
    pub address: String,
    pub balance: String,
}

// Auth module.

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStoreData {
    pub auth_data_substore: Vec<AuthStoreEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStoreEntry {
    pub address: String,
    pub auth_account: AuthAccountEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthAccountEntry {
    pub nonce: String,
    pub number_of_signatures: u32,
    pub mandatory_keys: Vec<String>,
    pub optional_keys: Vec<String>,
}

// Token module.

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStoreData {
    pub user_substore: Vec<UserSubstoreEntry>,
    pub supply_substore: Vec<SupplySubstoreEntry>,
    pub escrow_substore: Vec<EscrowSubstoreEntry>,
    pub supported_tokens_substore: Vec<SupportedTokensSubstoreEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubstoreEntry {
    pub address: String,
    #[serde(rename = "tokenID")]
    pub token_id: String,
    pub available_balance: String,
    pub locked_balances: Vec<LockedBalanceEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LockedBalanceEntry {
    pub module: String,
    pub amount: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplySubstoreEntry {
    #[serde(rename = "tokenID")]
    pub token_id: String,
    pub total_supply: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowSubstoreEntry {
    #[serde(rename = "escrowChainID")]
    pub escrow_chain_id: String,
    #[serde(rename = "tokenID")]
    pub token_id: String,
    pub amount: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedTokensSubstoreEntry {
    #[serde(rename = "chainID")]
    pub chain_id: String,
    #[serde(rename = "supportedTokenIDs")]
    pub supported_token_ids: Vec<String>,
}

// Proof-of-stake module.

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosStoreData {
    pub validators: Vec<ValidatorEntry>,
    pub stakers: Vec<StakerEntry>,
    pub genesis_data: GenesisDataEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorEntry {
    pub address: String,
    pub name: String,
    pub bls_key: String,
    pub proof_of_possession: String,
    pub generator_key: String,
    pub last_generated_height: u64,
    pub is_banned: bool,
    pub report_misbehavior_heights: Vec<u64>,
    pub consecutive_missed_blocks: u32,
    pub commission: u32,
    pub last_commission_increase_height: u64,
    pub sharing_coefficients: Vec<SharingCoefficientEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingCoefficientEntry {
    #[serde(rename = "tokenID")]
    pub token_id: String,
    /// Hex of the big-endian coefficient; empty for zero.
    pub coefficient: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakerEntry {
    pub address: String,
    pub stakes: Vec<StakeEntry>,
    pub pending_unlocks: Vec<PendingUnlockEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeEntry {
    pub validator_address: String,
    pub amount: String,
    pub sharing_coefficients: Vec<SharingCoefficientEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUnlockEntry {
    pub validator_address: String,
    pub amount: String,
    pub unstake_height: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisDataEntry {
    pub init_rounds: u32,
    pub init_validators: Vec<String>,
}

// Interoperability module.

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteropStoreData {
    pub own_chain_name: String,
    pub own_chain_nonce: String,
    pub chain_infos: Vec<ChainInfoEntry>,
    pub terminated_state_accounts: Vec<TerminatedStateAccountEntry>,
    pub terminated_outbox_accounts: Vec<TerminatedOutboxAccountEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfoEntry {
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub chain_data: ChainDataEntry,
    pub channel_data: ChannelDataEntry,
    pub chain_validators: ChainValidatorsEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDataEntry {
    pub name: String,
    pub last_certificate: LastCertificateEntry,
    pub status: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCertificateEntry {
    pub height: u64,
    pub timestamp: u64,
    pub state_root: String,
    pub validators_hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDataEntry {
    pub inbox: MailboxEntry,
    pub outbox: MailboxEntry,
    pub partner_chain_outbox_root: String,
    #[serde(rename = "messageFeeTokenID")]
    pub message_fee_token_id: String,
    pub min_return_fee_per_byte: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxEntry {
    pub append_path: Vec<String>,
    pub size: u32,
    pub root: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValidatorsEntry {
    pub active_validators: Vec<ActiveValidatorEntry>,
    pub certificate_threshold: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveValidatorEntry {
    pub bls_key: String,
    pub bft_weight: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedStateAccountEntry {
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub terminated_state_account: TerminatedStateEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedStateEntry {
    pub state_root: String,
    pub mainchain_state_root: String,
    pub initialized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedOutboxAccountEntry {
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub terminated_outbox_account: TerminatedOutboxEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedOutboxEntry {
    pub outbox_root: String,
    pub outbox_size: u32,
    pub partner_chain_inbox_size: u32,
}
