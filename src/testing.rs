//! Test support: scripted implementations of the outbound ports.
//!
//! Used by the unit tests beside the services and by the end-to-end tests
//! in `tests/`. It is available with the `test-utils` feature flag and is
//! never part of the service's runtime wiring.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::LedgerError;
use crate::domain::types::{PendingWrite, WinningChoice, WriteReceipt};
use crate::ports::{LedgerGateway, TagVerifier};

/// A verifier that returns a fixed outcome and counts invocations.
pub struct ScriptedVerifier {
    outcome: bool,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn passing() -> Self {
        Self {
            outcome: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of verification attempts issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagVerifier for ScriptedVerifier {
    async fn verify(&self, _tag_id: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }
}

/// In-memory ledger with scriptable records and invocation counters.
///
/// Records are raw payloads, exactly as `record_bytes` would return them,
/// so decode-failure paths can be exercised with corrupt entries.
pub struct MockLedger {
    records: Mutex<Vec<Vec<u8>>>,
    voted: Mutex<HashSet<String>>,
    /// When set, `cast_vote` fails with this error instead of writing.
    write_failure: Mutex<Option<LedgerError>>,
    /// When set, `vote_count` reports this instead of the record total.
    reported_count: Mutex<Option<u64>>,
    cast_calls: AtomicUsize,
    initialize_calls: AtomicUsize,
    per_choice: Mutex<Vec<(u64, u64)>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            voted: Mutex::new(HashSet::new()),
            write_failure: Mutex::new(None),
            reported_count: Mutex::new(None),
            cast_calls: AtomicUsize::new(0),
            initialize_calls: AtomicUsize::new(0),
            per_choice: Mutex::new(Vec::new()),
        }
    }

    /// Mark a tag as already voted without adding a record payload.
    pub fn mark_voted(&self, tag_id: &str) {
        self.voted.lock().unwrap().insert(tag_id.to_string());
    }

    /// Append a raw record payload.
    pub fn push_record(&self, payload: Vec<u8>) {
        self.records.lock().unwrap().push(payload);
    }

    /// Script the next write to fail.
    pub fn fail_writes_with(&self, error: LedgerError) {
        *self.write_failure.lock().unwrap() = Some(error);
    }

    /// Set the ledger-side per-choice counter.
    pub fn set_choice_votes(&self, choice_id: u64, votes: u64) {
        let mut counters = self.per_choice.lock().unwrap();
        if let Some(entry) = counters.iter_mut().find(|(c, _)| *c == choice_id) {
            entry.1 = votes;
        } else {
            counters.push((choice_id, votes));
        }
    }

    /// Make `vote_count` claim a total unrelated to the stored records.
    pub fn report_count(&self, total: u64) {
        *self.reported_count.lock().unwrap() = Some(total);
    }

    /// Number of `cast_vote` invocations observed.
    pub fn cast_calls(&self) -> usize {
        self.cast_calls.load(Ordering::SeqCst)
    }

    /// Number of `initialize` invocations observed.
    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn has_voted(&self, tag_id: &str) -> Result<bool, LedgerError> {
        Ok(self.voted.lock().unwrap().contains(tag_id))
    }

    async fn cast_vote(&self, tag_id: &str, choice_id: u64) -> Result<PendingWrite, LedgerError> {
        self.cast_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.write_failure.lock().unwrap().clone() {
            return Err(error);
        }

        // The ledger, not the pre-check, is the final arbiter.
        if !self.voted.lock().unwrap().insert(tag_id.to_string()) {
            return Err(LedgerError::Reverted {
                tx_hash: "0xduplicate".into(),
            });
        }

        self.push_record(encode_record_payload(tag_id, choice_id, 1_700_000_000));
        Ok(PendingWrite {
            tx_hash: "0xabc".into(),
        })
    }

    async fn wait_for_confirmation(
        &self,
        pending: &PendingWrite,
    ) -> Result<WriteReceipt, LedgerError> {
        Ok(WriteReceipt {
            tx_hash: pending.tx_hash.clone(),
            block_number: 12_345,
            gas_used: "21000".into(),
        })
    }

    async fn vote_count(&self) -> Result<u64, LedgerError> {
        if let Some(total) = *self.reported_count.lock().unwrap() {
            return Ok(total);
        }
        Ok(self.records.lock().unwrap().len() as u64)
    }

    async fn record_bytes(&self, index: u64) -> Result<Vec<u8>, LedgerError> {
        self.records
            .lock()
            .unwrap()
            .get(index as usize)
            .cloned()
            .ok_or_else(|| LedgerError::Response(format!("no record at index {index}")))
    }

    async fn votes_for(&self, choice_id: u64) -> Result<u64, LedgerError> {
        Ok(self
            .per_choice
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| *c == choice_id)
            .map(|(_, v)| *v)
            .unwrap_or(0))
    }

    async fn winning_choice(&self) -> Result<WinningChoice, LedgerError> {
        let counters = self.per_choice.lock().unwrap();
        let (choice_id, votes) = counters
            .iter()
            .max_by_key(|(_, v)| *v)
            .copied()
            .unwrap_or((0, 0));
        Ok(WinningChoice { choice_id, votes })
    }

    async fn initialize(&self) -> Result<PendingWrite, LedgerError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PendingWrite {
            tx_hash: "0xinit".into(),
        })
    }

    async fn reset_vote(&self, tag_id: &str) -> Result<PendingWrite, LedgerError> {
        self.voted.lock().unwrap().remove(tag_id);
        Ok(PendingWrite {
            tx_hash: "0xreset".into(),
        })
    }

    async fn owner(&self) -> Result<String, LedgerError> {
        Ok("0x0000000000000000000000000000000000000001".into())
    }
}

/// Build a well-formed packed record payload for the given fields.
pub fn encode_record_payload(tag_id: &str, choice_id: u64, cast_at: u64) -> Vec<u8> {
    let tag = tag_id.as_bytes();
    let mut payload = Vec::new();
    for value in [0x20u64, 0x60, choice_id, cast_at, tag.len() as u64] {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&value.to_be_bytes());
        payload.extend_from_slice(&word);
    }
    let mut data = tag.to_vec();
    while data.len() % 32 != 0 {
        data.push(0);
    }
    payload.extend_from_slice(&data);
    payload
}

/// A payload no decoder should accept: the declared tag length is far past
/// the plausibility limit.
pub fn corrupt_record_payload() -> Vec<u8> {
    encode_record_payload_with_length(250)
}

fn encode_record_payload_with_length(declared_len: u64) -> Vec<u8> {
    let mut payload = Vec::new();
    for value in [0x20u64, 0x60, 1, 1, declared_len] {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&value.to_be_bytes());
        payload.extend_from_slice(&word);
    }
    payload
}
