//! Core vote entities.
//!
//! A `VoteRequest` exists only for the duration of one submission attempt.
//! A `VoteRecord` is immutable once the ledger has produced it; this service
//! only ever appends new ones through the write path.

use serde::{Deserialize, Serialize};

use crate::domain::errors::VoteError;

/// One incoming vote submission: which tag wants to vote for which choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// Identifier read from the physical tag. Used as the voter identity.
    pub tag_id: String,
    /// Identifier of the option being voted for. Choices start at 1.
    pub choice_id: u64,
}

impl VoteRequest {
    /// Check the request is well-formed before any external call is made.
    pub fn validate(&self) -> Result<(), VoteError> {
        if self.tag_id.trim().is_empty() {
            return Err(VoteError::Validation("tagId must not be empty".into()));
        }
        if self.choice_id == 0 {
            return Err(VoteError::Validation(
                "choiceId must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

/// One persisted vote entry as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub tag_id: String,
    pub choice_id: u64,
    /// Unix seconds at which the ledger recorded the vote.
    pub cast_at: u64,
}

/// Handle for a write that has been accepted by the ledger's mempool but
/// not yet included in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub tx_hash: String,
}

/// Proof that a write was included and confirmed by the ledger.
///
/// Absence of a receipt means the vote did not take effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    /// Gas consumed by the write, as a decimal string (may exceed u64 on
    /// some ledgers, and callers only display it).
    pub gas_used: String,
}

/// How a listing entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Record decoded cleanly with a real tag id.
    Decoded,
    /// Record decoded but its stored tag was empty; `tag_id` holds a
    /// synthetic `Vote_<index>` placeholder, not real data.
    SyntheticTag,
    /// Record could not be fetched or decoded; `tag_id` holds an
    /// `Error_<index>` placeholder and the numeric fields are zero.
    DecodeFailed,
}

/// One entry in a vote listing.
///
/// Listings are index-ordered and per-index fault tolerant: a corrupt
/// record yields a `DecodeFailed` entry instead of aborting the scan, so
/// `status` is the only reliable way to tell real data from placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteListEntry {
    pub index: u64,
    pub tag_id: String,
    pub choice_id: u64,
    pub cast_at: u64,
    pub status: EntryStatus,
}

impl VoteListEntry {
    /// Entry for a record that decoded cleanly.
    pub fn decoded(index: u64, record: VoteRecord) -> Self {
        Self {
            index,
            tag_id: record.tag_id,
            choice_id: record.choice_id,
            cast_at: record.cast_at,
            status: EntryStatus::Decoded,
        }
    }

    /// Entry for a record whose stored tag was empty.
    pub fn synthetic(index: u64, choice_id: u64, cast_at: u64) -> Self {
        Self {
            index,
            tag_id: format!("Vote_{index}"),
            choice_id,
            cast_at,
            status: EntryStatus::SyntheticTag,
        }
    }

    /// Placeholder for a record that could not be fetched or decoded.
    pub fn failed(index: u64) -> Self {
        Self {
            index,
            tag_id: format!("Error_{index}"),
            choice_id: 0,
            cast_at: 0,
            status: EntryStatus::DecodeFailed,
        }
    }

    /// True only for entries carrying a real, ledger-stored tag id.
    pub fn has_real_tag(&self) -> bool {
        self.status == EntryStatus::Decoded
    }
}

/// The winning choice and its vote total, as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinningChoice {
    pub choice_id: u64,
    pub votes: u64,
}
