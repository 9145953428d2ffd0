//! Read-side queries against the vote ledger.
//!
//! Listing is a linear scan over record indices and is per-index fault
//! tolerant: one corrupt or unfetchable record yields a placeholder entry
//! and the scan continues, so a single bad index can never hide the rest
//! of the ledger. None of these operations have side effects.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::decoder::{self, DecodedRecord};
use crate::domain::errors::{LedgerError, VoteError};
use crate::domain::types::{VoteListEntry, VoteRecord, WinningChoice};
use crate::ports::LedgerGateway;

/// Pre-allocation ceiling for listings; the claimed total is not
/// trusted for sizing.
const MAX_LISTING_PREALLOC: usize = 1024;

/// Pure queries over the external ledger, using the record decoder to
/// interpret raw payloads.
pub struct LedgerQueryService {
    ledger: Arc<dyn LedgerGateway>,
}

impl LedgerQueryService {
    pub fn new(ledger: Arc<dyn LedgerGateway>) -> Self {
        Self { ledger }
    }

    /// Total number of records on the ledger.
    pub async fn count(&self) -> Result<u64, LedgerError> {
        self.ledger.vote_count().await
    }

    /// Whether a tag already has a recorded vote.
    pub async fn has_voted(&self, tag_id: &str) -> Result<bool, LedgerError> {
        self.ledger.has_voted(tag_id).await
    }

    /// The ledger's own per-choice vote counter.
    pub async fn votes_for(&self, choice_id: u64) -> Result<u64, LedgerError> {
        self.ledger.votes_for(choice_id).await
    }

    /// The currently winning choice and its vote total.
    pub async fn winning_choice(&self) -> Result<WinningChoice, LedgerError> {
        self.ledger.winning_choice().await
    }

    /// The decoded record at `index`. Decode failures surface as
    /// [`VoteError::Decode`] here; callers building a listing want
    /// [`LedgerQueryService::record_at`] instead, which degrades to a
    /// placeholder.
    pub async fn record(&self, index: u64) -> Result<DecodedRecord, VoteError> {
        let payload = self
            .ledger
            .record_bytes(index)
            .await
            .map_err(VoteError::LedgerQuery)?;
        Ok(decoder::decode_record(&payload)?)
    }

    /// The listing entry at `index`: a decoded record, or a placeholder
    /// if the record cannot be fetched or decoded. Fetch and decode
    /// failures are deliberately collapsed; a listing caller only needs
    /// to know the index is unusable.
    pub async fn record_at(&self, index: u64) -> VoteListEntry {
        match self.record(index).await {
            Ok(record) => match record.tag_id {
                Some(tag_id) => VoteListEntry::decoded(
                    index,
                    VoteRecord {
                        tag_id,
                        choice_id: record.choice_id,
                        cast_at: record.cast_at,
                    },
                ),
                None => {
                    debug!(index, "record has an empty tag, substituting placeholder");
                    VoteListEntry::synthetic(index, record.choice_id, record.cast_at)
                }
            },
            Err(error) => {
                warn!(index, %error, "unusable vote record");
                VoteListEntry::failed(index)
            }
        }
    }

    /// All records in index order, with placeholders for unusable indices.
    /// Returns the ledger's total alongside the entries.
    pub async fn list_all(&self) -> Result<(u64, Vec<VoteListEntry>), LedgerError> {
        let total = self.ledger.vote_count().await?;
        // The count is the endpoint's claim, not ours: cap the
        // pre-allocation and let the vector grow against real fetches.
        let mut entries = Vec::with_capacity((total as usize).min(MAX_LISTING_PREALLOC));
        for index in 0..total {
            entries.push(self.record_at(index).await);
        }

        let unusable = entries.iter().filter(|e| !e.has_real_tag()).count();
        if unusable > 0 {
            warn!(total, unusable, "listing contains placeholder entries");
        }
        Ok((total, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::EntryStatus;
    use crate::testing::{corrupt_record_payload, encode_record_payload, MockLedger};

    fn service(ledger: Arc<MockLedger>) -> LedgerQueryService {
        LedgerQueryService::new(ledger)
    }

    #[tokio::test]
    async fn test_record_at_decodes_valid_record() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_record(encode_record_payload("TAG007", 3, 1_700_000_000));
        let query = service(ledger);

        let entry = query.record_at(0).await;

        assert_eq!(entry.tag_id, "TAG007");
        assert_eq!(entry.choice_id, 3);
        assert_eq!(entry.cast_at, 1_700_000_000);
        assert_eq!(entry.status, EntryStatus::Decoded);
    }

    #[tokio::test]
    async fn test_empty_tag_becomes_synthetic_placeholder() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_record(encode_record_payload("", 2, 1_700_000_000));
        let query = service(ledger);

        let entry = query.record_at(0).await;

        assert_eq!(entry.tag_id, "Vote_0");
        assert_eq!(entry.status, EntryStatus::SyntheticTag);
        assert!(!entry.has_real_tag(), "placeholder must not look like real data");
    }

    #[tokio::test]
    async fn test_corrupt_record_does_not_truncate_listing() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_record(encode_record_payload("TAG001", 1, 1_700_000_000));
        ledger.push_record(corrupt_record_payload());
        ledger.push_record(encode_record_payload("TAG003", 2, 1_700_000_100));
        let query = service(ledger);

        let (total, entries) = query.list_all().await.unwrap();

        assert_eq!(total, 3);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].tag_id, "TAG001");
        assert_eq!(entries[1].status, EntryStatus::DecodeFailed);
        assert_eq!(entries[1].tag_id, "Error_1");
        assert_eq!(entries[2].tag_id, "TAG003");
    }

    #[tokio::test]
    async fn test_record_surfaces_decode_error() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_record(corrupt_record_payload());
        let query = service(ledger);

        let err = query.record(0).await.unwrap_err();

        assert!(matches!(err, VoteError::Decode(_)));
        assert_eq!(err.kind(), "decode");
    }

    #[tokio::test]
    async fn test_record_surfaces_fetch_error() {
        let ledger = Arc::new(MockLedger::new());
        let query = service(ledger);

        let err = query.record(4).await.unwrap_err();

        assert!(matches!(err, VoteError::LedgerQuery(_)));
    }

    #[tokio::test]
    async fn test_unfetchable_index_yields_placeholder() {
        let ledger = Arc::new(MockLedger::new());
        let query = service(ledger);

        let entry = query.record_at(7).await;

        assert_eq!(entry.status, EntryStatus::DecodeFailed);
        assert_eq!(entry.tag_id, "Error_7");
    }

    #[tokio::test]
    async fn test_empty_ledger_lists_nothing() {
        let ledger = Arc::new(MockLedger::new());
        let query = service(ledger);

        let (total, entries) = query.list_all().await.unwrap();

        assert_eq!(total, 0);
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_overreported_count_lists_placeholders_beyond_records() {
        // A count far past the stored records (and past the
        // pre-allocation ceiling) must still produce one entry per
        // claimed index, not an allocation sized on trust.
        let ledger = Arc::new(MockLedger::new());
        ledger.push_record(encode_record_payload("TAG001", 1, 1_700_000_000));
        ledger.report_count(MAX_LISTING_PREALLOC as u64 + 200);
        let query = service(ledger);

        let (total, entries) = query.list_all().await.unwrap();

        assert_eq!(total, MAX_LISTING_PREALLOC as u64 + 200);
        assert_eq!(entries.len(), total as usize);
        assert_eq!(entries[0].tag_id, "TAG001");
        assert_eq!(entries[1].status, EntryStatus::DecodeFailed);
        assert_eq!(entries.last().unwrap().status, EntryStatus::DecodeFailed);
    }

    #[tokio::test]
    async fn test_per_choice_counter_matches_scan() {
        let ledger = Arc::new(MockLedger::new());
        ledger.push_record(encode_record_payload("TAG001", 2, 1));
        ledger.push_record(encode_record_payload("TAG002", 1, 2));
        ledger.push_record(encode_record_payload("TAG003", 2, 3));
        ledger.set_choice_votes(2, 2);
        let query = service(ledger);

        let (_, entries) = query.list_all().await.unwrap();
        let scanned = entries.iter().filter(|e| e.choice_id == 2).count() as u64;

        assert_eq!(query.votes_for(2).await.unwrap(), scanned);
    }

    #[tokio::test]
    async fn test_winning_choice_reports_ledger_answer() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_choice_votes(1, 4);
        ledger.set_choice_votes(3, 9);
        let query = service(ledger);

        let winner = query.winning_choice().await.unwrap();

        assert_eq!(winner.choice_id, 3);
        assert_eq!(winner.votes, 9);
    }
}
