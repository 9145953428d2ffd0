//! Production adapters behind the outbound ports: the JSON-RPC ledger
//! client (with ABI encoding and transaction signing) and the subprocess
//! verifier.

pub mod abi;
pub mod face_verifier;
pub mod rpc_ledger;
pub mod signer;

pub use face_verifier::FaceVerifier;
pub use rpc_ledger::RpcLedger;
