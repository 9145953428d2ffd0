//! Ports layer: trait definitions for the external collaborators the
//! services drive. Production adapters live in `adapters/`; tests
//! substitute scripted implementations.

pub mod ledger;
pub mod verifier;

pub use ledger::LedgerGateway;
pub use verifier::TagVerifier;
