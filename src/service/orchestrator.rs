//! Vote submission orchestrator.
//!
//! One state machine per [`VoteRequest`]:
//!
//! ```text
//! Received → DuplicateChecked → Verifying → Verified → Submitting → Confirmed
//!                 │                  │                      │
//!                 ↓                  ↓                      ↓
//!               Failed            Rejected               Failed
//! ```
//!
//! The ordering is load-bearing: verification is never skipped and never
//! attempted for a tag known to have voted, and no write is issued without
//! an immediately preceding positive verification for the same request.
//!
//! The duplicate pre-check is advisory only. It and the write are not
//! atomic, so two concurrent requests for one tag can both pass it; the
//! ledger itself rejects the loser during the write, which surfaces as a
//! [`VoteError::LedgerWrite`] rather than [`VoteError::Duplicate`].
//!
//! There is no automatic retry anywhere. A failed request leaves no
//! resumable state: re-submitting means a brand-new request, including
//! re-verification.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::errors::VoteError;
use crate::domain::types::{VoteRequest, WriteReceipt};
use crate::ports::{LedgerGateway, TagVerifier};

/// States of one vote submission, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStage {
    Received,
    DuplicateChecked,
    Verifying,
    Verified,
    Submitting,
    Confirmed,
}

/// Sequences duplicate check, verification, ledger write, and
/// confirmation for incoming vote requests.
pub struct VoteOrchestrator {
    ledger: Arc<dyn LedgerGateway>,
    verifier: Arc<dyn TagVerifier>,
}

impl VoteOrchestrator {
    pub fn new(ledger: Arc<dyn LedgerGateway>, verifier: Arc<dyn TagVerifier>) -> Self {
        Self { ledger, verifier }
    }

    /// Run one vote request to a terminal state.
    ///
    /// Returns the confirmation receipt on the single success path; every
    /// failure is a distinct [`VoteError`] kind. Once the write has been
    /// issued the request runs to completion rather than being abandoned,
    /// since an abandoned write may still land on the ledger.
    pub async fn cast(&self, request: VoteRequest) -> Result<WriteReceipt, VoteError> {
        // Received: validate before any external call.
        request.validate()?;
        let tag_id = request.tag_id.as_str();
        info!(
            tag_id,
            choice_id = request.choice_id,
            stage = ?VoteStage::Received,
            "vote request received"
        );

        // DuplicateChecked: advisory pre-check to avoid pointless
        // verification work. The ledger remains the final arbiter.
        let already_voted = self
            .ledger
            .has_voted(tag_id)
            .await
            .map_err(VoteError::LedgerQuery)?;
        if already_voted {
            warn!(
                tag_id,
                stage = ?VoteStage::DuplicateChecked,
                "tag has already voted, rejecting before verification"
            );
            return Err(VoteError::Duplicate {
                tag_id: tag_id.to_string(),
            });
        }

        // Verifying: exactly one attempt; the gateway reduces every
        // process-level failure to false.
        info!(tag_id, stage = ?VoteStage::Verifying, "starting verification");
        if !self.verifier.verify(tag_id).await {
            warn!(tag_id, "verification failed");
            return Err(VoteError::Verification {
                tag_id: tag_id.to_string(),
            });
        }
        info!(tag_id, stage = ?VoteStage::Verified, "verification passed");

        // Submitting: write, then block until the ledger confirms
        // inclusion. A rejection here (e.g. a lost duplicate race) is a
        // ledger-write error, deliberately distinct from the pre-check
        // duplicate error.
        info!(tag_id, stage = ?VoteStage::Submitting, "issuing ledger write");
        let pending = self
            .ledger
            .cast_vote(tag_id, request.choice_id)
            .await
            .map_err(VoteError::LedgerWrite)?;
        let receipt = self
            .ledger
            .wait_for_confirmation(&pending)
            .await
            .map_err(VoteError::LedgerWrite)?;

        info!(
            tag_id,
            choice_id = request.choice_id,
            stage = ?VoteStage::Confirmed,
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            gas_used = %receipt.gas_used,
            "vote confirmed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::LedgerError;
    use crate::testing::{MockLedger, ScriptedVerifier};

    fn request(tag_id: &str) -> VoteRequest {
        VoteRequest {
            tag_id: tag_id.to_string(),
            choice_id: 2,
        }
    }

    fn orchestrator(
        ledger: Arc<MockLedger>,
        verifier: Arc<ScriptedVerifier>,
    ) -> VoteOrchestrator {
        VoteOrchestrator::new(ledger, verifier)
    }

    #[tokio::test]
    async fn test_happy_path_yields_receipt() {
        let ledger = Arc::new(MockLedger::new());
        let verifier = Arc::new(ScriptedVerifier::passing());
        let orchestrator = orchestrator(Arc::clone(&ledger), Arc::clone(&verifier));

        let receipt = orchestrator.cast(request("TAG001")).await.unwrap();

        assert_eq!(receipt.tx_hash, "0xabc");
        assert_eq!(receipt.block_number, 12_345);
        assert_eq!(verifier.calls(), 1);
        assert_eq!(ledger.cast_calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_request_makes_no_external_calls() {
        let ledger = Arc::new(MockLedger::new());
        let verifier = Arc::new(ScriptedVerifier::passing());
        let orchestrator = orchestrator(Arc::clone(&ledger), Arc::clone(&verifier));

        let err = orchestrator
            .cast(VoteRequest {
                tag_id: "".into(),
                choice_id: 2,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, VoteError::Validation(_)));
        assert_eq!(verifier.calls(), 0);
        assert_eq!(ledger.cast_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_tag_skips_verification_and_write() {
        let ledger = Arc::new(MockLedger::new());
        ledger.mark_voted("TAG001");
        let verifier = Arc::new(ScriptedVerifier::passing());
        let orchestrator = orchestrator(Arc::clone(&ledger), Arc::clone(&verifier));

        let err = orchestrator.cast(request("TAG001")).await.unwrap_err();

        assert!(matches!(err, VoteError::Duplicate { .. }));
        assert_eq!(verifier.calls(), 0);
        assert_eq!(ledger.cast_calls(), 0);
    }

    #[tokio::test]
    async fn test_verification_failure_prevents_any_write() {
        let ledger = Arc::new(MockLedger::new());
        let verifier = Arc::new(ScriptedVerifier::failing());
        let orchestrator = orchestrator(Arc::clone(&ledger), Arc::clone(&verifier));

        let err = orchestrator.cast(request("TAG001")).await.unwrap_err();

        assert!(matches!(err, VoteError::Verification { .. }));
        assert_eq!(verifier.calls(), 1);
        assert_eq!(ledger.cast_calls(), 0, "ledger write must not be attempted");
    }

    #[tokio::test]
    async fn test_second_vote_for_same_tag_never_confirms() {
        let ledger = Arc::new(MockLedger::new());
        let verifier = Arc::new(ScriptedVerifier::passing());
        let orchestrator = orchestrator(Arc::clone(&ledger), Arc::clone(&verifier));

        orchestrator.cast(request("TAG001")).await.unwrap();
        let err = orchestrator.cast(request("TAG001")).await.unwrap_err();

        assert!(matches!(err, VoteError::Duplicate { .. }));
        assert_eq!(ledger.cast_calls(), 1);
    }

    #[tokio::test]
    async fn test_ledger_rejection_is_distinct_from_precheck_duplicate() {
        // Simulate losing the pre-check/write race: the pre-check passes
        // but the ledger reverts the write.
        let ledger = Arc::new(MockLedger::new());
        ledger.fail_writes_with(LedgerError::Reverted {
            tx_hash: "0xrace".into(),
        });
        let verifier = Arc::new(ScriptedVerifier::passing());
        let orchestrator = orchestrator(Arc::clone(&ledger), Arc::clone(&verifier));

        let err = orchestrator.cast(request("TAG001")).await.unwrap_err();

        assert!(matches!(
            err,
            VoteError::LedgerWrite(LedgerError::Reverted { .. })
        ));
        assert_eq!(err.kind(), "ledger_write");
    }

    #[tokio::test]
    async fn test_transport_failure_during_write_is_not_retried() {
        let ledger = Arc::new(MockLedger::new());
        ledger.fail_writes_with(LedgerError::Transport("connection reset".into()));
        let verifier = Arc::new(ScriptedVerifier::passing());
        let orchestrator = orchestrator(Arc::clone(&ledger), Arc::clone(&verifier));

        let err = orchestrator.cast(request("TAG001")).await.unwrap_err();

        assert!(matches!(err, VoteError::LedgerWrite(_)));
        assert_eq!(ledger.cast_calls(), 1);
    }

    #[tokio::test]
    async fn test_reverification_required_per_request() {
        let ledger = Arc::new(MockLedger::new());
        let verifier = Arc::new(ScriptedVerifier::passing());
        let orchestrator = orchestrator(Arc::clone(&ledger), Arc::clone(&verifier));

        orchestrator.cast(request("TAG001")).await.unwrap();
        orchestrator.cast(request("TAG002")).await.unwrap();

        // One verification per request; outcomes are never reused.
        assert_eq!(verifier.calls(), 2);
    }
}
