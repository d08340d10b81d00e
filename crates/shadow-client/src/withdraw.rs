//! # Withdrawal Client
//!
//! Proof generation is slow and happens outside the ledger's atomic
//! region, against a root observed beforehand. If deposits land in the
//! meantime the root may fall out of the ledger's window; the ledger then
//! answers `UnknownRoot` and the client observes a fresh root, proves
//! again, and resubmits after a backoff delay.
//!
//! Each attempt:
//!
//! 1. Observe the current root and the note's path, and price the fee at
//!    the submission block.
//! 2. Generate the proof on a blocking thread under `proof_timeout`.
//! 3. Submit under `submit_timeout`.
//!
//! Only errors whose kind has the `Retry` disposition are retried.
//! Dropping the returned future cancels the withdrawal between steps.
//!
//! A submission that outlives `submit_timeout` is not cancelled: the
//! ledger call keeps running on its blocking thread and may still spend
//! the nullifier. The client reports `SubmitTimeout` without retrying, and
//! the caller should consult [`WithdrawalClient::is_spent`] before trying
//! the note again.

use std::sync::Arc;

use shadow_core::{Address, BlockNumber, Disposition};
use shadow_crypto::DepositNote;
use shadow_pool::{compute_fee, PoolLedger, TxContext, WithdrawalReceipt};
use shadow_zkp::{CircuitInputs, ProofBackend, PublicInputs, WithdrawPublicInputs};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// What to withdraw and where to send it.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub note: DepositNote,
    /// Leaf index the note's commitment was inserted at.
    pub leaf_index: u64,
    pub recipient: Address,
    /// Account submitting the transaction (the recipient or a relayer).
    pub sender: Address,
    /// Block the withdrawal is submitted at; selects the fee schedule.
    pub submitted_at: BlockNumber,
}

/// Drives withdrawals against a ledger `L` with proofs from backend `B`.
pub struct WithdrawalClient<L, B: ProofBackend> {
    ledger: Arc<L>,
    backend: Arc<B>,
    proving_key: Arc<B::ProvingKey>,
    config: ClientConfig,
}

impl<L, B> WithdrawalClient<L, B>
where
    L: PoolLedger<Proof = B::Proof> + 'static,
    B: ProofBackend + 'static,
    B::Proof: 'static,
    B::ProvingKey: 'static,
{
    pub fn new(ledger: Arc<L>, backend: Arc<B>, proving_key: B::ProvingKey, config: ClientConfig) -> Self {
        Self {
            ledger,
            backend,
            proving_key: Arc::new(proving_key),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether the ledger has already spent `note`.
    pub fn is_spent(&self, note: &DepositNote) -> Result<bool, ClientError> {
        Ok(self.ledger.is_spent(&note.nullifier_hash()?))
    }

    /// Withdraw `request.note`, resubmitting with a fresh root on staleness.
    pub async fn withdraw(&self, request: WithdrawalRequest) -> Result<WithdrawalReceipt, ClientError> {
        let policy = self.config.retry;
        let mut attempt = 0u32;
        loop {
            let err = match self.attempt(&request).await {
                Ok(receipt) => return Ok(receipt),
                Err(ClientError::Rejected(err)) => err,
                Err(other) => return Err(other),
            };
            if err.kind().disposition() != Disposition::Retry {
                return Err(ClientError::Rejected(err));
            }
            let Some(delay) = policy.delay_after(attempt) else {
                return Err(ClientError::Exhausted {
                    attempts: attempt + 1,
                    last: err,
                });
            };
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                "withdrawal rejected, retrying in {delay:?}: {err}"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, request: &WithdrawalRequest) -> Result<WithdrawalReceipt, ClientError> {
        let path = self.ledger.merkle_path(request.leaf_index)?;
        let params = self.ledger.fee_parameters_at(request.submitted_at);
        let fee = compute_fee(request.note.amount(), &params)?;
        tracing::debug!(
            leaf_index = request.leaf_index,
            root = %path.root,
            fee = %fee,
            "proving withdrawal"
        );

        let inputs = CircuitInputs::Withdraw {
            note: request.note.clone(),
            path,
            recipient: request.recipient,
            fee,
        };
        let (proof, public) = self.prove(inputs).await?;

        let ledger = Arc::clone(&self.ledger);
        let ctx = TxContext::new(request.sender, request.submitted_at);
        let nullifier_hash = public.nullifier_hash;
        let submit = tokio::task::spawn_blocking(move || ledger.withdraw(&proof, &public, &ctx));
        let receipt = tokio::time::timeout(self.config.submit_timeout, submit)
            .await
            .map_err(|_| {
                tracing::warn!(nullifier = %nullifier_hash, "submission timed out, may still commit");
                ClientError::SubmitTimeout {
                    timeout: self.config.submit_timeout,
                    nullifier_hash,
                }
            })???;
        Ok(receipt)
    }

    async fn prove(
        &self,
        inputs: CircuitInputs,
    ) -> Result<(B::Proof, WithdrawPublicInputs), ClientError> {
        let backend = Arc::clone(&self.backend);
        let pk = Arc::clone(&self.proving_key);
        let task = tokio::task::spawn_blocking(move || backend.generate_proof(&pk, &inputs));
        let (proof, public) = tokio::time::timeout(self.config.proof_timeout, task)
            .await
            .map_err(|_| ClientError::ProofTimeout(self.config.proof_timeout))???;
        match public {
            PublicInputs::Withdraw(w) => Ok((proof, w)),
            PublicInputs::Deposit(_) => Err(ClientError::UnexpectedPublicInputs("deposit")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use shadow_core::{Amount, ErrorKind, FeeParameters, FieldElement, PoolConfig};
    use shadow_crypto::{Commitment, MerkleProof, NullifierHash, RecipientBinding};
    use shadow_pool::{
        AnonymityLevel, DepositReceipt, PoolError, PoolStats, ShadowPool,
    };
    use shadow_zkp::{
        DepositPublicInputs, MockProof, MockProofBackend, MockProvingKey, MockVerifyingKey,
        ProofError, VerifyError,
    };

    use crate::retry::RetryPolicy;

    const DEPOSITOR: Address = Address::new([0xd0; 20]);
    const RECIPIENT: Address = Address::new([0x7e; 20]);

    /// Pool whose first withdrawals race against a competing deposit.
    struct RacingLedger {
        inner: ShadowPool<MockProofBackend>,
        races: AtomicU32,
        next_filler: AtomicU32,
        submit_delay: Duration,
    }

    impl PoolLedger for RacingLedger {
        type Proof = MockProof;

        fn deposit(&self, c: Commitment, ctx: &TxContext) -> Result<DepositReceipt, PoolError> {
            self.inner.deposit(c, ctx)
        }

        fn deposit_with_proof(
            &self,
            proof: &MockProof,
            inputs: &DepositPublicInputs,
            ctx: &TxContext,
        ) -> Result<DepositReceipt, PoolError> {
            self.inner.deposit_with_proof(proof, inputs, ctx)
        }

        fn withdraw(
            &self,
            proof: &MockProof,
            inputs: &WithdrawPublicInputs,
            ctx: &TxContext,
        ) -> Result<WithdrawalReceipt, PoolError> {
            std::thread::sleep(self.submit_delay);
            if self.races.load(Ordering::SeqCst) > 0 {
                self.races.fetch_sub(1, Ordering::SeqCst);
                let v = 1_000 + u64::from(self.next_filler.fetch_add(1, Ordering::SeqCst));
                let filler = TxContext::new(DEPOSITOR, ctx.submitted_at).with_value(Amount(1));
                self.inner
                    .deposit(Commitment(FieldElement::from_u64(v)), &filler)?;
            }
            self.inner.withdraw(proof, inputs, ctx)
        }

        fn current_root(&self) -> FieldElement {
            self.inner.current_root()
        }

        fn merkle_path(&self, index: u64) -> Result<MerkleProof, PoolError> {
            self.inner.merkle_path(index)
        }

        fn fee_parameters_at(&self, block: BlockNumber) -> FeeParameters {
            self.inner.fee_parameters_at(block)
        }

        fn is_spent(&self, nullifier: &NullifierHash) -> bool {
            self.inner.is_spent(nullifier)
        }

        fn get_pool_stats(&self) -> PoolStats {
            self.inner.get_pool_stats()
        }

        fn get_anonymity_level(&self) -> AnonymityLevel {
            self.inner.get_anonymity_level()
        }

        fn get_pool_utilization(&self) -> f64 {
            self.inner.get_pool_utilization()
        }
    }

    /// Backend that takes longer than any test timeout.
    struct SlowBackend;

    impl ProofBackend for SlowBackend {
        type Proof = MockProof;
        type VerifyingKey = MockVerifyingKey;
        type ProvingKey = MockProvingKey;

        fn generate_proof(
            &self,
            pk: &MockProvingKey,
            inputs: &CircuitInputs,
        ) -> Result<(MockProof, PublicInputs), ProofError> {
            std::thread::sleep(Duration::from_millis(300));
            MockProofBackend::new().generate_proof(pk, inputs)
        }

        fn verify(
            &self,
            vk: &MockVerifyingKey,
            proof: &MockProof,
            public_inputs: &PublicInputs,
        ) -> Result<bool, VerifyError> {
            MockProofBackend::new().verify(vk, proof, public_inputs)
        }
    }

    fn fast_config(max_attempts: u32) -> ClientConfig {
        ClientConfig {
            proof_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(10),
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
        }
    }

    fn racing(races: u32) -> (Arc<RacingLedger>, MockProvingKey, WithdrawalRequest) {
        let (pk, vk) = MockProofBackend::setup(b"client-tests");
        let config = PoolConfig {
            tree_depth: 5,
            root_history_size: 1,
            initial_fee: FeeParameters::new(5, Amount(1_000)),
            allow_legacy_deposits: true,
            fee_recipient: Address::new([0xfe; 20]),
            ..PoolConfig::default()
        };
        let inner = ShadowPool::new(config, MockProofBackend::new(), vk).unwrap();
        let note = DepositNote::generate(
            &mut rand_core::OsRng,
            Amount(1_000_000),
            RecipientBinding::bound_to(&RECIPIENT),
        );
        let ctx = TxContext::new(DEPOSITOR, 1).with_value(note.amount());
        let leaf_index = inner
            .deposit(note.commitment().unwrap(), &ctx)
            .unwrap()
            .leaf_index;
        let ledger = Arc::new(RacingLedger {
            inner,
            races: AtomicU32::new(races),
            next_filler: AtomicU32::new(0),
            submit_delay: Duration::ZERO,
        });
        let request = WithdrawalRequest {
            note,
            leaf_index,
            recipient: RECIPIENT,
            sender: RECIPIENT,
            submitted_at: 2,
        };
        (ledger, pk, request)
    }

    #[tokio::test]
    async fn withdraws_on_first_attempt() {
        let (ledger, pk, request) = racing(0);
        let client = WithdrawalClient::new(
            Arc::clone(&ledger),
            Arc::new(MockProofBackend::new()),
            pk,
            fast_config(3),
        );
        let receipt = client.withdraw(request).await.unwrap();
        // 5 bps of 1_000_000 is 500, plus the fixed 1_000.
        assert_eq!(receipt.fee, Amount(1_500));
        assert_eq!(receipt.net_amount, Amount(998_500));
        assert_eq!(ledger.inner.balance_of(&RECIPIENT), Amount(998_500));
    }

    #[tokio::test]
    async fn stale_root_is_refreshed_and_resubmitted() {
        let (ledger, pk, request) = racing(2);
        let client = WithdrawalClient::new(
            Arc::clone(&ledger),
            Arc::new(MockProofBackend::new()),
            pk,
            fast_config(3),
        );
        let receipt = client.withdraw(request).await.unwrap();
        assert_eq!(receipt.recipient, RECIPIENT);
        assert_eq!(ledger.inner.leaf_count(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (ledger, pk, request) = racing(5);
        let client = WithdrawalClient::new(
            Arc::clone(&ledger),
            Arc::new(MockProofBackend::new()),
            pk,
            fast_config(2),
        );
        let err = client.withdraw(request).await.unwrap_err();
        assert!(matches!(err, ClientError::Exhausted { attempts: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::UnknownRoot);
    }

    #[tokio::test]
    async fn double_spend_is_not_retried() {
        let (ledger, pk, request) = racing(0);
        let client = WithdrawalClient::new(
            Arc::clone(&ledger),
            Arc::new(MockProofBackend::new()),
            pk,
            fast_config(3),
        );
        client.withdraw(request.clone()).await.unwrap();
        let err = client.withdraw(request).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
        assert_eq!(err.kind(), ErrorKind::NullifierAlreadySpent);
    }

    #[tokio::test]
    async fn wrong_recipient_fails_in_prover() {
        let (ledger, pk, mut request) = racing(0);
        request.recipient = DEPOSITOR;
        let client = WithdrawalClient::new(
            Arc::clone(&ledger),
            Arc::new(MockProofBackend::new()),
            pk,
            fast_config(3),
        );
        let err = client.withdraw(request).await.unwrap_err();
        assert!(matches!(err, ClientError::Proof(_)));
    }

    #[tokio::test]
    async fn slow_prover_times_out() {
        let (ledger, pk, request) = racing(0);
        let config = ClientConfig {
            proof_timeout: Duration::from_millis(20),
            ..fast_config(3)
        };
        let client = WithdrawalClient::new(Arc::clone(&ledger), Arc::new(SlowBackend), pk, config);
        let err = client.withdraw(request).await.unwrap_err();
        assert!(matches!(err, ClientError::ProofTimeout(_)));
        assert_eq!(ledger.inner.events_since(0).1, 1);
    }

    #[tokio::test]
    async fn timed_out_submission_may_still_commit() {
        let (ledger, pk, request) = racing(0);
        let ledger = Arc::new(RacingLedger {
            submit_delay: Duration::from_millis(200),
            ..Arc::into_inner(ledger).unwrap()
        });
        let config = ClientConfig {
            submit_timeout: Duration::from_millis(20),
            ..fast_config(3)
        };
        let client = WithdrawalClient::new(
            Arc::clone(&ledger),
            Arc::new(MockProofBackend::new()),
            pk,
            config,
        );
        let expected = request.note.nullifier_hash().unwrap();
        let err = client.withdraw(request.clone()).await.unwrap_err();
        match err {
            ClientError::SubmitTimeout { nullifier_hash, .. } => {
                assert_eq!(nullifier_hash, expected)
            }
            other => panic!("expected submit timeout, got {other:?}"),
        }

        // The abandoned call still lands.
        let mut spent = false;
        for _ in 0..50 {
            if client.is_spent(&request.note).unwrap() {
                spent = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(spent);
        assert_eq!(ledger.inner.get_pool_stats().total_withdrawals, 1);
    }
}
