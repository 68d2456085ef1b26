// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Fixed-point reward-per-share arithmetic.
//!
//! A sharing coefficient is an unsigned big integer scaled by an implicit
//! `2^96` denominator. All operations are exact; rewards are paid out with a
//! truncating multiply-then-shift so a claim can never round up.

use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

/// Fractional precision of a sharing coefficient, in bits.
pub const Q96_PRECISION: u32 = 96;

/// Maximum encoded width of a coefficient on the wire.
pub const MAX_Q96_BYTES: usize = 24;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum Q96Error {
    /// `sub` would produce a negative coefficient.
    #[error("reward coefficient underflow")]
    Underflow,
    /// Encoded coefficient exceeds the protocol width.
    #[error("coefficient encoding of {0} bytes exceeds the maximum of {MAX_Q96_BYTES}")]
    Oversized(usize),
}

/// Reward-per-share coefficient with 96 fractional bits.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Q96(BigUint);

impl Q96 {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Decodes a big-endian coefficient. The empty slice is the zero
    /// coefficient.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Q96Error> {
        if bytes.len() > MAX_Q96_BYTES {
            return Err(Q96Error::Oversized(bytes.len()));
        }
        Ok(Self(BigUint::from_bytes_be(bytes)))
    }

    /// Minimal big-endian encoding; zero encodes to the empty byte string.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.0.is_zero() {
            Vec::new()
        } else {
            self.0.to_bytes_be()
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: &Self) -> Self {
        Self(&self.0 + &other.0)
    }

    /// Exact subtraction; underflows are fatal because coefficients are
    /// monotonically non-decreasing.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, Q96Error> {
        if self.0 < other.0 {
            return Err(Q96Error::Underflow);
        }
        Ok(Self(&self.0 - &other.0))
    }

    /// Whole-unit reward for `stake` units at this coefficient, truncating
    /// the fractional part.
    pub fn mul_share(&self, stake: &BigUint) -> BigUint {
        (&self.0 * stake) >> Q96_PRECISION
    }

    /// Raw scaled integer, for tests and debugging.
    pub fn into_raw(self) -> BigUint {
        self.0
    }

    pub fn from_raw(raw: BigUint) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn whole(n: u64) -> Q96 {
        Q96::from_raw(BigUint::from(n) << Q96_PRECISION)
    }

    #[test]
    fn empty_bytes_is_zero_and_identity_for_add() {
        let zero = Q96::from_bytes(&[]).unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero.to_bytes(), Vec::<u8>::new());
        let c = whole(17);
        assert_eq!(c.add(&zero), c);
    }

    #[test]
    fn oversized_encoding_is_rejected() {
        assert_eq!(
            Q96::from_bytes(&[1u8; MAX_Q96_BYTES + 1]),
            Err(Q96Error::Oversized(MAX_Q96_BYTES + 1))
        );
    }

    #[test]
    fn sub_underflow_is_fatal() {
        assert_eq!(whole(3).checked_sub(&whole(8)), Err(Q96Error::Underflow));
    }

    #[test]
    fn mul_share_truncates_fractional_part() {
        // coefficient = 2 + epsilon; the epsilon part must never round up.
        let c = Q96::from_raw((BigUint::from(2u64) << Q96_PRECISION) + BigUint::from(1u64));
        assert_eq!(c.mul_share(&BigUint::from(1000u64)), BigUint::from(2000u64));
    }

    #[quickcheck]
    fn add_then_sub_round_trips(a: u64, b: u64) -> bool {
        let (a, b) = (whole(a), whole(b));
        a.add(&b).checked_sub(&b).unwrap() == a
    }

    #[quickcheck]
    fn whole_coefficients_multiply_exactly(c: u32, stake: u32) -> bool {
        whole(u64::from(c)).mul_share(&BigUint::from(stake))
            == BigUint::from(u64::from(c) * u64::from(stake))
    }

    #[quickcheck]
    fn byte_encoding_round_trips(c: u64) -> bool {
        let q = whole(c);
        Q96::from_bytes(&q.to_bytes()).unwrap() == q
    }
}
