//! Audit trail for the OCSP responder.
//!
//! Every answered request produces one audit event, plus one child event per
//! queried certificate. Server start and shutdown are audited as well.
//!
//! - [`AuditEvent`]: a single record with typed level and status plus free
//!   form key/value data
//! - [`AuditSink`]: where finished events go ([`TracingAuditSink`] in
//!   production, [`MemoryAuditSink`] in tests)
//! - [`AuditScope`]: guard that stamps the duration and hands the event to
//!   the sink exactly once when dropped
//!
//! # Example
//!
//! ```rust
//! use audit_engine::{AuditLevel, AuditScope, AuditStatus, MemoryAuditSink};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemoryAuditSink::new());
//! {
//!     let mut scope = AuditScope::new(sink.clone(), "ocsp", "responder1");
//!     scope.add("serial", "0A");
//!     scope.fill(AuditLevel::Info, AuditStatus::Successful, None);
//! }
//! assert_eq!(sink.events().len(), 1);
//! ```

pub mod entry;
pub mod scope;
pub mod sink;

pub use entry::*;
pub use scope::*;
pub use sink::*;
