//! Outbound port for the external vote ledger.

use async_trait::async_trait;

use crate::domain::errors::LedgerError;
use crate::domain::types::{PendingWrite, WinningChoice, WriteReceipt};

/// The external, append-only vote ledger.
///
/// All reads are pure queries with no side effects. The ledger is the
/// single source of truth for per-tag vote status: callers must not treat
/// a `has_voted` answer as a lock, since a concurrent write can land
/// between the read and any subsequent `cast_vote`.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Whether a tag already has a recorded vote.
    async fn has_voted(&self, tag_id: &str) -> Result<bool, LedgerError>;

    /// Submit a vote write. Returns once the ledger has accepted the
    /// transaction for inclusion, not once it is confirmed.
    async fn cast_vote(&self, tag_id: &str, choice_id: u64) -> Result<PendingWrite, LedgerError>;

    /// Block until the pending write is included and confirmed, or the
    /// configured confirmation window expires.
    async fn wait_for_confirmation(
        &self,
        pending: &PendingWrite,
    ) -> Result<WriteReceipt, LedgerError>;

    /// Total number of records on the ledger.
    async fn vote_count(&self) -> Result<u64, LedgerError>;

    /// Raw bytes of the record at `index`, exactly as the ledger returns
    /// them. Decoding is the caller's concern (`domain::decoder`).
    async fn record_bytes(&self, index: u64) -> Result<Vec<u8>, LedgerError>;

    /// The ledger's own per-choice vote counter.
    async fn votes_for(&self, choice_id: u64) -> Result<u64, LedgerError>;

    /// The currently winning choice and its vote total.
    async fn winning_choice(&self) -> Result<WinningChoice, LedgerError>;

    /// Run the contract's one-time setup write. Idempotence and
    /// authorization are the ledger's concern; a repeat call gets a
    /// rejection.
    async fn initialize(&self) -> Result<PendingWrite, LedgerError>;

    /// Clear a tag's voted status. Authorization is enforced by the ledger
    /// itself; unauthorized callers get a rejection.
    async fn reset_vote(&self, tag_id: &str) -> Result<PendingWrite, LedgerError>;

    /// Address of the ledger contract's owner account.
    async fn owner(&self) -> Result<String, LedgerError>;
}
