//! # Withdrawal Validation
//!
//! Checks run in this order, none of them touching state:
//!
//! 0. The transaction's blocks: submitted no later than included, included
//!    no earlier than the last applied transition, and at most
//!    `max_submission_lag` blocks between the two.
//! 1. `root` is one of the last `K` roots (`UnknownRoot`).
//! 2. `nullifier` is unspent (`NullifierAlreadySpent`).
//! 3. `amount > 0`, `fee ≤ amount`, and `fee` equals the fee the schedule
//!    in force at the submitting block charges for `amount`.
//! 4. The proof verifies against the public inputs (`InvalidProof`).
//! 5. The pool holds at least `amount`.
//!
//! Only then is the withdrawal committed: the nullifier is marked spent,
//! the recipient is credited `amount - fee`, the fee recipient `fee`, and
//! the event is logged. The state lock is held from the first check to the
//! last write.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shadow_core::{Address, Amount, BlockNumber};
use shadow_crypto::NullifierHash;
use shadow_zkp::{ProofBackend, PublicInputs, WithdrawPublicInputs};

use crate::error::PoolError;
use crate::fee::compute_fee;
use crate::ledger::{PoolEvent, ShadowPool, TxContext};

/// Result of an accepted withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub nullifier_hash: NullifierHash,
    pub recipient: Address,
    pub amount: Amount,
    pub fee: Amount,
    /// Credited to the recipient.
    pub net_amount: Amount,
    /// Fee schedule version the fee was checked against.
    pub fee_version: u32,
    pub block: BlockNumber,
}

impl<B: ProofBackend> ShadowPool<B> {
    pub(crate) fn process_withdrawal(
        &self,
        proof: &B::Proof,
        inputs: &WithdrawPublicInputs,
        ctx: &TxContext,
    ) -> Result<WithdrawalReceipt, PoolError> {
        let mut state = self.state.lock();
        ctx.check_timing(state.last_block, self.config.max_submission_lag)?;

        if !state.tree.is_known_root(&inputs.root) {
            return Err(PoolError::UnknownRoot(inputs.root));
        }
        if state.nullifiers.is_spent(&inputs.nullifier_hash) {
            return Err(PoolError::NullifierAlreadySpent(inputs.nullifier_hash));
        }

        if inputs.amount.is_zero() {
            return Err(PoolError::InvalidAmount {
                amount: inputs.amount,
                reason: "withdrawal amount must be positive".to_string(),
            });
        }
        let net_amount = inputs
            .amount
            .checked_sub(inputs.fee)
            .ok_or(PoolError::FeeExceedsAmount {
                fee: inputs.fee,
                amount: inputs.amount,
            })?;
        let version = *self.registry.read().version_at(ctx.submitted_at);
        let required = compute_fee(inputs.amount, &version.params)?;
        if inputs.fee != required {
            return Err(PoolError::FeeMismatch {
                provided: inputs.fee,
                required,
                block: ctx.submitted_at,
            });
        }

        let public = PublicInputs::Withdraw(*inputs);
        if !self.backend.verify(&self.verifying_key, proof, &public)? {
            return Err(PoolError::InvalidProof(
                "withdrawal proof rejected".to_string(),
            ));
        }

        let remaining = state.total_value_locked.checked_sub(inputs.amount).ok_or(
            PoolError::InsufficientPoolBalance {
                available: state.total_value_locked,
                requested: inputs.amount,
            },
        )?;

        // Compute every new balance first so the writes below cannot fail.
        let mut credits: BTreeMap<Address, Amount> = BTreeMap::new();
        for (account, credit) in [
            (inputs.recipient, net_amount),
            (self.config.fee_recipient, inputs.fee),
        ] {
            if credit.is_zero() {
                continue;
            }
            let current = match credits.get(&account) {
                Some(pending) => *pending,
                None => state.balances.get(&account).copied().unwrap_or(Amount::ZERO),
            };
            let updated = current
                .checked_add(credit)
                .ok_or(PoolError::BalanceOverflow(account))?;
            credits.insert(account, updated);
        }

        state.nullifiers.insert(inputs.nullifier_hash);
        state.balances.extend(credits);
        state.total_value_locked = remaining;
        state.last_block = ctx.included_at;
        state.events.push(PoolEvent::Withdrawal {
            nullifier_hash: inputs.nullifier_hash,
            recipient: inputs.recipient,
            amount: inputs.amount,
            fee: inputs.fee,
            block: ctx.included_at,
        });
        tracing::info!(
            nullifier = %inputs.nullifier_hash,
            recipient = %inputs.recipient,
            amount = %inputs.amount,
            fee = %inputs.fee,
            fee_version = version.version,
            "withdrawal accepted"
        );

        Ok(WithdrawalReceipt {
            nullifier_hash: inputs.nullifier_hash,
            recipient: inputs.recipient,
            amount: inputs.amount,
            fee: inputs.fee,
            net_amount,
            fee_version: version.version,
            block: ctx.included_at,
        })
    }
}
