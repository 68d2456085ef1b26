// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Reward reconciliation: brings every staker's claimable reward up to date
//! as of the snapshot height and resynchronizes each validator's locked
//! staking balance, all in memory. The source ledger is never written.

use ahash::HashMap;
use num_bigint::BigUint;
use num_traits::{CheckedSub, Zero};

use super::pos::{Staker, Validator};
use super::token::TokenUsers;
use super::MigrationError;
use crate::address::Address;
use crate::networks::{NetworkConstants, POS_MODULE_NAME};
use crate::q96::Q96;

/// Applies all pending reward claims and locked-balance corrections.
///
/// Per validator and token, a staker's claimable reward is the coefficient
/// delta since their last claim times the stake, truncated. The transfer
/// moves value from the validator's locked staking balance into the staker's
/// available balance, so ledger-wide totals are unchanged. Afterwards every
/// validator's locked staking balance is pinned to exactly the stakes plus
/// pending unlocks referencing it, with any surplus released into the
/// validator's own available balance.
///
/// Fails fast on any inconsistency in the source data; the balance book may
/// be partially updated on error and must be discarded by the caller.
pub fn reconcile(
    users: &mut TokenUsers,
    validators: &[Validator],
    stakers: &mut [Staker],
    constants: &NetworkConstants,
) -> Result<(), MigrationError> {
    let totals_before = users.token_totals();

    let by_address: HashMap<Address, &Validator> =
        validators.iter().map(|v| (v.address, v)).collect();

    // Stakes plus pending unlocks per validator, gathered up front so the
    // resync below sees amounts untouched by the transfers.
    let mut expected_locked: HashMap<Address, BigUint> = HashMap::default();
    for staker in stakers.iter() {
        for stake in &staker.stakes {
            *expected_locked
                .entry(stake.validator_address)
                .or_insert_with(BigUint::zero) += &stake.amount;
        }
        for unlock in &staker.pending_unlocks {
            *expected_locked
                .entry(unlock.validator_address)
                .or_insert_with(BigUint::zero) += &unlock.amount;
        }
    }

    for staker in stakers.iter_mut() {
        for stake in &mut staker.stakes {
            let validator = by_address.get(&stake.validator_address).ok_or_else(|| {
                MigrationError::AddressNotFound {
                    context: "stake validator lookup",
                    address: hex::encode(stake.validator_address.as_bytes()),
                }
            })?;
            for current in &validator.sharing_coefficients {
                let claimed = stake
                    .sharing_coefficients
                    .iter()
                    .find(|c| c.token_id == current.token_id)
                    .map(|c| c.coefficient.clone())
                    .unwrap_or_else(Q96::zero);
                let delta = current
                    .coefficient
                    .checked_sub(&claimed)
                    .map_err(|e| MigrationError::Underflow {
                        address: hex::encode(validator.address.as_bytes()),
                        source: e,
                    })?
                    .mul_share(&stake.amount);
                // A validator's self-stake earns no claimable transfer.
                if !delta.is_zero() && staker.address != validator.address {
                    transfer_reward(users, validator.address, staker.address, current, &delta)?;
                }
            }
            // Full catch-up, no partial claims.
            stake.sharing_coefficients = validator.sharing_coefficients.clone();
        }
    }

    for validator in validators {
        let expected = expected_locked
            .remove(&validator.address)
            .unwrap_or_default();
        let Some(record) = users.get_mut(validator.address, constants.token_id) else {
            if expected.is_zero() {
                continue;
            }
            return Err(MigrationError::AddressNotFound {
                context: "validator locked-balance resync",
                address: hex::encode(validator.address.as_bytes()),
            });
        };
        let locked = record.locked_amount(POS_MODULE_NAME);
        let surplus = locked
            .checked_sub(&expected)
            .ok_or_else(|| MigrationError::NegativeBalance {
                address: hex::encode(validator.address.as_bytes()),
            })?;
        record.set_locked(POS_MODULE_NAME, expected);
        record.available_balance += surplus;
    }
    // Stakes on unknown validators fail above; anything left here can only
    // be a pending unlock referencing a validator with no record.
    if let Some(address) = expected_locked.keys().min() {
        return Err(MigrationError::AddressNotFound {
            context: "pending unlock validator lookup",
            address: hex::encode(address.as_bytes()),
        });
    }

    let totals_after = users.token_totals();
    for (token, before) in &totals_before {
        let after = totals_after.get(token).cloned().unwrap_or_default();
        if *before != after {
            return Err(MigrationError::ConservationViolation {
                token: token.to_hex(),
                before: before.to_string(),
                after: after.to_string(),
            });
        }
    }
    Ok(())
}

fn transfer_reward(
    users: &mut TokenUsers,
    validator: Address,
    staker: Address,
    coefficient: &super::pos::SharingCoefficient,
    delta: &BigUint,
) -> Result<(), MigrationError> {
    let source = users
        .get_mut(validator, coefficient.token_id)
        .ok_or_else(|| MigrationError::AddressNotFound {
            context: "reward transfer source",
            address: hex::encode(validator.as_bytes()),
        })?;
    let locked = source.locked_amount(POS_MODULE_NAME);
    let remaining = locked
        .checked_sub(delta)
        .ok_or_else(|| MigrationError::NegativeBalance {
            address: hex::encode(validator.as_bytes()),
        })?;
    source.set_locked(POS_MODULE_NAME, remaining);

    let target = users
        .get_mut(staker, coefficient.token_id)
        .ok_or_else(|| MigrationError::AddressNotFound {
            context: "reward transfer target",
            address: hex::encode(staker.as_bytes()),
        })?;
    target.available_balance += delta;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::TokenId;
    use crate::migration::pos::{PendingUnlock, SharingCoefficient, Stake};
    use crate::migration::token::{LockedBalance, UserBalance};
    use pretty_assertions::assert_eq;

    fn whole(n: u64) -> Q96 {
        Q96::from_raw(BigUint::from(n) << 96)
    }

    fn validator_with_coefficient(address: [u8; 20], token: TokenId, n: u64) -> Validator {
        Validator {
            address: Address::new(address),
            name: format!("validator_{}", address[0]),
            bls_key: vec![],
            proof_of_possession: vec![],
            generator_key: vec![],
            last_generated_height: 0,
            is_banned: false,
            report_misbehavior_heights: vec![],
            consecutive_missed_blocks: 0,
            commission: 10_000,
            last_commission_increase_height: 0,
            sharing_coefficients: vec![SharingCoefficient {
                token_id: token,
                coefficient: whole(n),
            }],
        }
    }

    fn book_entry(
        users: &mut TokenUsers,
        address: [u8; 20],
        token: TokenId,
        available: u64,
        locked_pos: u64,
    ) {
        let locked_balances = if locked_pos > 0 {
            vec![LockedBalance {
                module: POS_MODULE_NAME.to_owned(),
                amount: BigUint::from(locked_pos),
            }]
        } else {
            vec![]
        };
        users.merge(UserBalance {
            address: Address::new(address),
            token_id: token,
            available_balance: BigUint::from(available),
            locked_balances,
        });
    }

    #[test]
    fn coefficient_delta_moves_locked_to_available() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let token = constants.token_id;
        let (v, s) = ([1u8; 20], [2u8; 20]);

        let validators = vec![validator_with_coefficient(v, token, 8)];
        let mut stakers = vec![Staker {
            address: Address::new(s),
            stakes: vec![Stake {
                validator_address: Address::new(v),
                amount: BigUint::from(1000u64),
                sharing_coefficients: vec![SharingCoefficient {
                    token_id: token,
                    coefficient: whole(5),
                }],
            }],
            pending_unlocks: vec![],
        }];

        // Locked covers the stake (1000) plus the pending claim (3000).
        let mut users = TokenUsers::default();
        book_entry(&mut users, v, token, 0, 4000);
        book_entry(&mut users, s, token, 100, 0);
        let totals_before = users.token_totals();

        reconcile(&mut users, &validators, &mut stakers, &constants).unwrap();

        let staker = users.get(Address::new(s), token).unwrap();
        assert_eq!(staker.available_balance, BigUint::from(3100u64));
        let validator = users.get(Address::new(v), token).unwrap();
        assert_eq!(validator.locked_amount("pos"), BigUint::from(1000u64));
        assert_eq!(validator.available_balance, BigUint::zero());
        assert_eq!(stakers[0].stakes[0].sharing_coefficients[0].coefficient, whole(8));
        assert_eq!(users.token_totals(), totals_before);
    }

    #[test]
    fn self_stake_earns_no_transfer() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let token = constants.token_id;
        let v = [1u8; 20];

        let validators = vec![validator_with_coefficient(v, token, 8)];
        let mut stakers = vec![Staker {
            address: Address::new(v),
            stakes: vec![Stake {
                validator_address: Address::new(v),
                amount: BigUint::from(1000u64),
                sharing_coefficients: vec![SharingCoefficient {
                    token_id: token,
                    coefficient: whole(5),
                }],
            }],
            pending_unlocks: vec![],
        }];
        let mut users = TokenUsers::default();
        book_entry(&mut users, v, token, 7, 1000);

        reconcile(&mut users, &validators, &mut stakers, &constants).unwrap();

        let record = users.get(Address::new(v), token).unwrap();
        assert_eq!(record.available_balance, BigUint::from(7u64));
        assert_eq!(record.locked_amount("pos"), BigUint::from(1000u64));
        // The coefficient still catches up.
        assert_eq!(stakers[0].stakes[0].sharing_coefficients[0].coefficient, whole(8));
    }

    #[test]
    fn unreferenced_locked_balance_is_released() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let token = constants.token_id;
        let v = [1u8; 20];

        let validators = vec![validator_with_coefficient(v, token, 0)];
        let mut users = TokenUsers::default();
        book_entry(&mut users, v, token, 10, 500);

        reconcile(&mut users, &validators, &mut [], &constants).unwrap();

        let record = users.get(Address::new(v), token).unwrap();
        assert_eq!(record.available_balance, BigUint::from(510u64));
        assert_eq!(record.locked_amount("pos"), BigUint::zero());
    }

    #[test]
    fn pending_unlocks_stay_locked() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let token = constants.token_id;
        let (v, s) = ([1u8; 20], [2u8; 20]);

        let validators = vec![validator_with_coefficient(v, token, 0)];
        let mut stakers = vec![Staker {
            address: Address::new(s),
            stakes: vec![],
            pending_unlocks: vec![PendingUnlock {
                validator_address: Address::new(v),
                amount: BigUint::from(300u64),
                unstake_height: 9,
            }],
        }];
        let mut users = TokenUsers::default();
        book_entry(&mut users, v, token, 0, 450);

        reconcile(&mut users, &validators, &mut stakers, &constants).unwrap();

        let record = users.get(Address::new(v), token).unwrap();
        assert_eq!(record.locked_amount("pos"), BigUint::from(300u64));
        assert_eq!(record.available_balance, BigUint::from(150u64));
    }

    #[test]
    fn short_locked_balance_is_fatal() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let token = constants.token_id;
        let (v, s) = ([1u8; 20], [2u8; 20]);

        let validators = vec![validator_with_coefficient(v, token, 8)];
        let mut stakers = vec![Staker {
            address: Address::new(s),
            stakes: vec![Stake {
                validator_address: Address::new(v),
                amount: BigUint::from(1000u64),
                sharing_coefficients: vec![],
            }],
            pending_unlocks: vec![],
        }];
        // Reward due is 8000 but only 100 is locked.
        let mut users = TokenUsers::default();
        book_entry(&mut users, v, token, 0, 100);
        book_entry(&mut users, s, token, 0, 0);

        assert!(matches!(
            reconcile(&mut users, &validators, &mut stakers, &constants),
            Err(MigrationError::NegativeBalance { .. })
        ));
    }

    #[test]
    fn stale_coefficient_above_current_is_fatal() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let token = constants.token_id;
        let (v, s) = ([1u8; 20], [2u8; 20]);

        let validators = vec![validator_with_coefficient(v, token, 5)];
        let mut stakers = vec![Staker {
            address: Address::new(s),
            stakes: vec![Stake {
                validator_address: Address::new(v),
                amount: BigUint::from(1u64),
                sharing_coefficients: vec![SharingCoefficient {
                    token_id: token,
                    coefficient: whole(8),
                }],
            }],
            pending_unlocks: vec![],
        }];
        let mut users = TokenUsers::default();
        book_entry(&mut users, v, token, 0, 10);
        book_entry(&mut users, s, token, 0, 0);

        assert!(matches!(
            reconcile(&mut users, &validators, &mut stakers, &constants),
            Err(MigrationError::Underflow { .. })
        ));
    }

    #[test]
    fn rewards_transfer_per_token() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let native = constants.token_id;
        let other = TokenId::new([9, 0, 0, 0, 0, 0, 0, 0]);
        let (v, s) = ([1u8; 20], [2u8; 20]);

        let mut validator = validator_with_coefficient(v, native, 8);
        validator.sharing_coefficients.push(SharingCoefficient {
            token_id: other,
            coefficient: whole(2),
        });
        let validators = vec![validator];
        let mut stakers = vec![Staker {
            address: Address::new(s),
            stakes: vec![Stake {
                validator_address: Address::new(v),
                amount: BigUint::from(1000u64),
                // Native claimed up to 5; the other token never claimed.
                sharing_coefficients: vec![SharingCoefficient {
                    token_id: native,
                    coefficient: whole(5),
                }],
            }],
            pending_unlocks: vec![],
        }];
        let mut users = TokenUsers::default();
        book_entry(&mut users, v, native, 0, 4000);
        book_entry(&mut users, v, other, 0, 2000);
        book_entry(&mut users, s, native, 100, 0);
        book_entry(&mut users, s, other, 0, 0);

        reconcile(&mut users, &validators, &mut stakers, &constants).unwrap();

        // Native delta 3 * 1000, other-token delta 2 * 1000.
        assert_eq!(
            users.get(Address::new(s), native).unwrap().available_balance,
            BigUint::from(3100u64)
        );
        assert_eq!(
            users.get(Address::new(s), other).unwrap().available_balance,
            BigUint::from(2000u64)
        );
        let validator_native = users.get(Address::new(v), native).unwrap();
        assert_eq!(validator_native.locked_amount("pos"), BigUint::from(1000u64));
        let validator_other = users.get(Address::new(v), other).unwrap();
        assert_eq!(validator_other.locked_amount("pos"), BigUint::zero());
        // Both coefficient snapshots caught up.
        assert_eq!(
            stakers[0].stakes[0].sharing_coefficients,
            validators[0].sharing_coefficients
        );
    }

    #[test]
    fn pending_unlock_on_unknown_validator_is_fatal() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let token = constants.token_id;
        let s = [2u8; 20];

        let mut stakers = vec![Staker {
            address: Address::new(s),
            stakes: vec![],
            pending_unlocks: vec![PendingUnlock {
                validator_address: Address::new([0xeeu8; 20]),
                amount: BigUint::from(300u64),
                unstake_height: 9,
            }],
        }];
        let mut users = TokenUsers::default();
        book_entry(&mut users, s, token, 0, 0);

        assert!(matches!(
            reconcile(&mut users, &[], &mut stakers, &constants),
            Err(MigrationError::AddressNotFound { .. })
        ));
    }

    #[test]
    fn missing_validator_balance_record_is_fatal() {
        let constants = NetworkConstants::devnet(10, 5, 2);
        let token = constants.token_id;
        let (v, s) = ([1u8; 20], [2u8; 20]);

        let validators = vec![validator_with_coefficient(v, token, 8)];
        let mut stakers = vec![Staker {
            address: Address::new(s),
            stakes: vec![Stake {
                validator_address: Address::new(v),
                amount: BigUint::from(10u64),
                sharing_coefficients: vec![],
            }],
            pending_unlocks: vec![],
        }];
        let mut users = TokenUsers::default();
        book_entry(&mut users, s, token, 0, 0);

        assert!(matches!(
            reconcile(&mut users, &validators, &mut stakers, &constants),
            Err(MigrationError::AddressNotFound { .. })
        ));
    }
}
