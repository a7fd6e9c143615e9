//! Shared contract between the OCSP responder and its certificate-status stores.
//!
//! A status store answers "what is the status of serial S issued by CA X" for
//! the issuers it knows about. The responder consults one or more stores in a
//! configured order and turns their answers into signed OCSP responses.
//!
//! This crate holds:
//! - hash algorithms and issuer/serial query types
//! - certificate-status answers and revocation details
//! - the [`StatusStore`] trait and its per-store settings
//! - a registry of [`StoreFactory`] implementations keyed by type name
//! - the built-in in-memory store

pub mod certificate;
pub mod certprofile;
pub mod error;
pub mod hash;
pub mod memory;
pub mod query;
pub mod registry;
pub mod serial;
pub mod status;
pub mod store;

pub use certificate::*;
pub use certprofile::*;
pub use error::*;
pub use hash::*;
pub use memory::*;
pub use query::*;
pub use registry::*;
pub use serial::*;
pub use status::*;
pub use store::*;
