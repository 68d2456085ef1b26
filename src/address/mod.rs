// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Raw ledger addresses and their canonical human-readable encoding.
//!
//! Every internal join and sort in the migration operates on the raw
//! fixed-length byte form; the checksummed base32 string form is produced
//! only at the serialization boundary, right before a value is placed into a
//! genesis document.

mod errors;

pub use self::errors::AddressError;

use data_encoding::Encoding;
use data_encoding_macro::new_encoding;
use sha2::{Digest, Sha256};

/// Base32 encoder over the chain's address alphabet, no padding.
const ADDRESS_ENCODER: Encoding = new_encoding! {
    symbols: "zxvcpmbn3465o978uyrtkqew2adsjhfg",
    padding: None,
};

const CHARSET: &[u8; 32] = b"zxvcpmbn3465o978uyrtkqew2adsjhfg";

/// BCH generator constants for the address checksum polymod.
const GENERATOR: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];

pub const ADDRESS_LEN: usize = 20;
pub const LEGACY_ADDRESS_LEN: usize = 8;
pub const CHAIN_ID_LEN: usize = 4;
pub const TOKEN_ID_LEN: usize = 8;

/// Number of base32 groups carrying the 160-bit payload.
const DATA_GROUPS: usize = 32;
/// Number of base32 groups carrying the checksum.
const CHECKSUM_GROUPS: usize = 6;

/// 20-byte account address. Ordered by unsigned lexicographic byte order,
/// which is the canonical sort key everywhere in the migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Validates the payload length and copies the raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let payload: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidPayloadLength(bytes.len()))?;
        Ok(Self(payload))
    }

    /// Derives the account address owned by a public key.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = Sha256::digest(public_key);
        let mut payload = [0u8; ADDRESS_LEN];
        payload.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(payload)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Renders the canonical checksummed base32 string, e.g.
    /// `kly24cd35u4jdq8szo3pnsqe5dsxwrnazyqqqg5eu`.
    pub fn to_canonical(&self, prefix: &str) -> String {
        let data = ADDRESS_ENCODER.encode(&self.0);
        let checksum = create_checksum(&to_groups(&self.0));
        let mut out = String::with_capacity(prefix.len() + DATA_GROUPS + CHECKSUM_GROUPS);
        out.push_str(prefix);
        out.push_str(&data);
        for value in checksum {
            out.push(CHARSET[value as usize] as char);
        }
        out
    }

    /// Parses and validates a canonical address string.
    pub fn from_canonical(s: &str, prefix: &str) -> Result<Self, AddressError> {
        let rest = s.strip_prefix(prefix).ok_or_else(|| AddressError::UnknownPrefix {
            expected: prefix.to_owned(),
        })?;
        if rest.len() != DATA_GROUPS + CHECKSUM_GROUPS {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let (data, checksum) = rest.split_at(DATA_GROUPS);
        let payload = ADDRESS_ENCODER.decode(data.as_bytes())?;
        let address = Self::from_bytes(&payload)?;

        let mut groups = to_groups(address.as_bytes()).to_vec();
        for c in checksum.bytes() {
            groups.push(char_value(c).ok_or(AddressError::InvalidCharacter(c as char))?);
        }
        if polymod(&groups) != 1 {
            return Err(AddressError::InvalidChecksum);
        }
        Ok(address)
    }
}

/// 8-byte account address of the pre-rebrand protocol. Rendered as hex in
/// genesis documents; never canonicalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LegacyAddress([u8; LEGACY_ADDRESS_LEN]);

impl LegacyAddress {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let payload: [u8; LEGACY_ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidPayloadLength(bytes.len()))?;
        Ok(Self(payload))
    }

    pub fn as_bytes(&self) -> &[u8; LEGACY_ADDRESS_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// 4-byte chain identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainId([u8; CHAIN_ID_LEN]);

impl ChainId {
    pub fn new(bytes: [u8; CHAIN_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let payload: [u8; CHAIN_ID_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidPayloadLength(bytes.len()))?;
        Ok(Self(payload))
    }

    pub fn as_bytes(&self) -> &[u8; CHAIN_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// 8-byte token identifier: 4-byte issuing chain id followed by a 4-byte
/// local id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId([u8; TOKEN_ID_LEN]);

impl TokenId {
    pub fn new(bytes: [u8; TOKEN_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let payload: [u8; TOKEN_ID_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidPayloadLength(bytes.len()))?;
        Ok(Self(payload))
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Regroups the 160-bit payload into 32 five-bit values, most significant
/// bits first.
fn to_groups(bytes: &[u8; ADDRESS_LEN]) -> [u8; DATA_GROUPS] {
    let mut out = [0u8; DATA_GROUPS];
    let mut accumulator: u32 = 0;
    let mut bits: u32 = 0;
    let mut i = 0;
    for &byte in bytes {
        accumulator = (accumulator << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out[i] = ((accumulator >> bits) & 0x1f) as u8;
            i += 1;
        }
    }
    out
}

fn char_value(c: u8) -> Option<u8> {
    CHARSET.iter().position(|&x| x == c).map(|i| i as u8)
}

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for &value in values {
        let top = chk >> 25;
        chk = ((chk & 0x1ff_ffff) << 5) ^ u32::from(value);
        for (i, generator) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

fn create_checksum(data: &[u8; DATA_GROUPS]) -> [u8; CHECKSUM_GROUPS] {
    let mut values = data.to_vec();
    values.extend_from_slice(&[0u8; CHECKSUM_GROUPS]);
    let m = polymod(&values) ^ 1;
    let mut out = [0u8; CHECKSUM_GROUPS];
    for (p, slot) in out.iter_mut().enumerate() {
        *slot = ((m >> (5 * (5 - p))) & 0x1f) as u8;
    }
    out
}
