//! Cache of signed OCSP responses.
//!
//! Responses are keyed by (issuer id, serial, signature algorithm, cert-hash
//! algorithm). Issuers get a small integer id so that keys stay compact; the
//! id table is written only by the master replica and read by everyone.
//!
//! Backends:
//! - [`InMemoryCacheBackend`]: process-local, for single instances and tests
//! - [`PgCacheBackend`]: shared PostgreSQL tables for replicated deployments

pub mod backend;
pub mod cache;
pub mod error;
pub mod memory;
pub mod postgres;

pub use backend::*;
pub use cache::*;
pub use error::*;
pub use memory::*;
pub use postgres::*;
