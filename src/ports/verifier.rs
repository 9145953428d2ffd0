//! Outbound port for the external biometric verifier.

use async_trait::async_trait;

/// Pass/fail determination of a voter's right to cast this vote.
///
/// Keyed only by tag id: the verifier never sees the chosen option, so it
/// cannot act as a proxy for choice-based logic. Implementations must not
/// error: any process-level failure (spawn failure, bad exit, timeout)
/// reduces to `false`. One call per vote request; callers wanting a retry
/// must issue a brand-new request.
#[async_trait]
pub trait TagVerifier: Send + Sync {
    async fn verify(&self, tag_id: &str) -> bool;
}
