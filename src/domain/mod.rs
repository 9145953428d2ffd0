//! Domain layer: pure vote types, the packed-record decoder, error
//! taxonomy, and service configuration. No I/O lives here.

pub mod config;
pub mod decoder;
pub mod errors;
pub mod types;
