//! # shadow-client — Async Caller Boundary
//!
//! Everything that waits lives here, outside the protocol core: proof
//! generation, transaction submission, and backoff between resubmissions.
//!
//! ## Modules
//!
//! - **Config** (`config.rs`): [`ClientConfig`], timeouts and attempt count
//!   from `SHADOW_*` environment variables.
//! - **Retry** (`retry.rs`): [`RetryPolicy`], capped exponential backoff.
//! - **Withdraw** (`withdraw.rs`): [`WithdrawalClient`], which resubmits
//!   with a fresh root when the ledger reports the old one stale.
//! - **Telemetry** (`telemetry.rs`): [`init_tracing`].
//!
//! ## Crate Policy
//!
//! - Ledger and prover calls run on blocking threads; the async side only
//!   awaits them under a timeout.
//! - Only `Retry`-disposition errors are retried. Double spends and
//!   invalid proofs are returned immediately.

pub mod config;
pub mod error;
pub mod retry;
pub mod telemetry;
pub mod withdraw;

pub use config::ClientConfig;
pub use error::ClientError;
pub use retry::RetryPolicy;
pub use telemetry::{init_tracing, LogFormat};
pub use withdraw::{WithdrawalClient, WithdrawalRequest};
