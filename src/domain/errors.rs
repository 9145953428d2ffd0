//! Error taxonomy for vote submission and ledger access.
//!
//! Two layers: `LedgerError` is what the ledger gateway reports
//! (transport, RPC, revert, confirmation timeout), `VoteError` is what the
//! orchestrator surfaces to callers. Every terminal failure carries a
//! distinguishable kind plus a human-readable cause.

use thiserror::Error;

use crate::domain::decoder::DecodeError;

/// Failures reported by the ledger gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The RPC endpoint could not be reached or the request did not
    /// complete.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// The RPC endpoint answered with a JSON-RPC error object. Reverts on
    /// `eth_call`/`eth_estimateGas` land here with the node's revert
    /// message.
    #[error("ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The RPC endpoint answered 200 but the payload was not what the
    /// method contract promises.
    #[error("malformed ledger response: {0}")]
    Response(String),

    /// The write was included but the ledger reverted it. For a vote this
    /// usually means the tag won a race to the pre-check but lost it on
    /// chain.
    #[error("ledger rejected transaction {tx_hash}")]
    Reverted { tx_hash: String },

    /// No receipt appeared within the configured confirmation window. The
    /// write may still land later; callers must re-check has-voted before
    /// retrying.
    #[error("timed out waiting for confirmation of {tx_hash}")]
    ConfirmationTimeout { tx_hash: String },

    /// Local signing failed before anything was sent.
    #[error("transaction signing failed: {0}")]
    Signer(String),
}

impl LedgerError {
    /// True when the ledger itself refused the write (as opposed to the
    /// write never reaching it or its outcome being unknown).
    pub fn is_rejection(&self) -> bool {
        matches!(self, LedgerError::Reverted { .. } | LedgerError::Rpc { .. })
    }
}

/// Terminal failures of one vote submission.
#[derive(Debug, Error)]
pub enum VoteError {
    /// Malformed request; no external call was made.
    #[error("invalid vote request: {0}")]
    Validation(String),

    /// The advisory pre-check found an existing vote for this tag.
    /// Distinct from [`VoteError::LedgerWrite`] with a rejection cause,
    /// which is the ledger's own refusal during the write.
    #[error("tag {tag_id} has already voted")]
    Duplicate { tag_id: String },

    /// The external verifier did not confirm the voter. Covers a negative
    /// answer, verifier process failure, and verifier timeout alike: all
    /// reduce to "not verified". A brand-new request (with re-verification)
    /// is the only retry path.
    #[error("verification failed for tag {tag_id}")]
    Verification { tag_id: String },

    /// The ledger write or its confirmation failed. Not retried
    /// automatically: the outcome of the write may be unknown, so the
    /// caller must re-check has-voted first.
    #[error("vote was not accepted by the ledger")]
    LedgerWrite(#[source] LedgerError),

    /// A read the submission depends on (the duplicate pre-check) failed.
    #[error("ledger query failed")]
    LedgerQuery(#[source] LedgerError),

    /// A single ledger record failed to parse. Only produced by read
    /// paths that expose individual records; listings replace this with a
    /// placeholder entry instead.
    #[error("vote record failed to decode")]
    Decode(#[from] DecodeError),
}

impl VoteError {
    /// Stable machine-readable kind, used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            VoteError::Validation(_) => "validation",
            VoteError::Duplicate { .. } => "duplicate_vote",
            VoteError::Verification { .. } => "verification_failed",
            VoteError::LedgerWrite(_) => "ledger_write",
            VoteError::LedgerQuery(_) => "ledger_query",
            VoteError::Decode(_) => "decode",
        }
    }
}
