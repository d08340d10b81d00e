//! # shadow-pool — Pool Ledger and DAO Wiring
//!
//! The stateful half of the protocol. Commitments go into the Merkle
//! accumulator on deposit; nullifiers go into the spent set on withdrawal;
//! fees are priced from the versioned registry governance writes to.
//!
//! ## Modules
//!
//! - **Fee** (`fee.rs`): `compute_fee`, checked basis-point arithmetic.
//! - **Nullifier** (`nullifier.rs`): [`SpentNullifiers`].
//! - **Ledger** (`ledger.rs`): the [`PoolLedger`] trait and [`ShadowPool`],
//!   with proof-backed and legacy deposits and the event log.
//! - **Withdraw** (`withdraw.rs`): the ordered, side-effect-free withdrawal
//!   checks followed by one atomic commit.
//! - **Stats** (`stats.rs`): [`PoolStats`], [`AnonymityLevel`], utilization.
//! - **Snapshot** (`snapshot.rs`): JSON persistence with integrity checks
//!   on restore.
//! - **Protocol** (`protocol.rs`): [`ShadowProtocol`], the DAO facade.
//!
//! ## Design
//!
//! Every entry point is a single transition under one lock. Checks come
//! first and touch nothing; state is written only after all of them pass,
//! so a rejected call leaves the pool exactly as it was.

pub mod error;
pub mod fee;
pub mod ledger;
pub mod nullifier;
pub mod protocol;
pub mod snapshot;
pub mod stats;
pub mod withdraw;

// ─── Re-exports ─────────────────────────────────────────────────────

pub use error::PoolError;
pub use fee::{compute_fee, FeeError};
pub use ledger::{DepositReceipt, PoolEvent, PoolLedger, ShadowPool, TxContext};
pub use nullifier::SpentNullifiers;
pub use protocol::ShadowProtocol;
pub use snapshot::PoolSnapshot;
pub use stats::{AnonymityLevel, PoolStats};
pub use withdraw::WithdrawalReceipt;
