//! Service layer: wires the domain logic to the outbound ports.
//!
//! `VoteOrchestrator` runs the per-request submission state machine;
//! `LedgerQueryService` answers the read paths.

pub mod orchestrator;
pub mod query;

pub use orchestrator::{VoteOrchestrator, VoteStage};
pub use query::LedgerQueryService;
