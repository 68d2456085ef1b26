// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use data_encoding::DecodeError;
use thiserror::Error;

/// Address encoding/decoding errors.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Raw payload does not match the fixed address width.
    #[error("invalid address payload length: {0}")]
    InvalidPayloadLength(usize),
    /// Canonical string has the wrong overall length.
    #[error("invalid canonical address length: {0}")]
    InvalidLength(usize),
    /// Canonical string does not start with the expected network prefix.
    #[error("unknown address prefix, expected {expected:?}")]
    UnknownPrefix { expected: String },
    /// Character outside the address alphabet.
    #[error("invalid address character {0:?}")]
    InvalidCharacter(char),
    /// Invalid address checksum.
    #[error("invalid address checksum")]
    InvalidChecksum,
    /// Base32 payload failed to decode.
    #[error(transparent)]
    Base32(#[from] DecodeError),
}
