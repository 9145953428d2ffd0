//! # Tagvote Gateway
//!
//! Backend service letting a physical RFID tag cast one vote for one of
//! several choices, gated by a biometric verification step, with the
//! authoritative vote ledger held by an external append-only contract.
//!
//! ## Architecture
//!
//! The crate follows hexagonal architecture:
//! - **Domain** (`domain/`): vote types, the packed-record decoder, the
//!   error taxonomy, and configuration. No I/O.
//! - **Ports** (`ports/`): trait definitions for the external
//!   collaborators (ledger, verifier).
//! - **Services** (`service/`): the vote-submission orchestrator and the
//!   ledger query service.
//! - **Adapters** (`adapters/`): the JSON-RPC ledger client and the
//!   subprocess verifier.
//! - **HTTP** (`http/`): thin axum routes over the services.
//!
//! ## Invariants
//!
//! - A tag that already holds a vote record never produces a second one;
//!   the orchestrator pre-checks, and the ledger itself rejects races.
//! - No ledger write happens without an immediately preceding positive
//!   verification for the same request.
//! - Placeholder listing entries (empty or undecodable records) are always
//!   distinguishable from real data.

pub mod adapters;
pub mod domain;
pub mod http;
pub mod ports;
pub mod service;

/// Scripted port implementations for tests.
///
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use domain::config::AppConfig;
pub use domain::decoder::{decode_record, decode_record_hex, DecodeError, DecodedRecord};
pub use domain::errors::{LedgerError, VoteError};
pub use domain::types::{
    EntryStatus, PendingWrite, VoteListEntry, VoteRecord, VoteRequest, WinningChoice, WriteReceipt,
};
pub use ports::{LedgerGateway, TagVerifier};
pub use service::{LedgerQueryService, VoteOrchestrator};
