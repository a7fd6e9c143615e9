//! # OCSP Responder
//!
//! Answers certificate-status requests on behalf of one or more configured
//! responders. Each request is validated against its responder's request
//! policy, resolved against an ordered list of status stores, signed, and
//! optionally cached so that identical nonce-free requests are served
//! byte-for-byte from the response cache.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ocsp_responder::{DeliveryMode, JsonCodec, OcspServer, OcspServerConf};
//! use ocsp_api::StoreFactoryRegistry;
//! use std::sync::Arc;
//!
//! # async fn run(request: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let conf = OcspServerConf::load("ocsp-responder.yaml")?;
//! let server = OcspServer::start(
//!     &conf,
//!     &StoreFactoryRegistry::with_builtin(),
//!     Arc::new(JsonCodec::new()),
//!     Some(Arc::new(audit_engine::TracingAuditSink::new())),
//! )
//! .await?;
//!
//! if let Some(answer) = server.answer("/ocsp", &request, DeliveryMode::Post).await {
//!     println!("{} response bytes", answer.response.len());
//! }
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod options;
pub mod resolve;
pub mod responder;
pub mod routing;
pub mod server;
pub mod signer;
pub mod trust;
pub mod wiring;

pub use codec::{JsonCodec, OcspCodec, OcspRequest, OcspResponse, OcspResponseStatus};
pub use config::OcspServerConf;
pub use engine::{DeliveryMode, OcspEngine, OcspRespWithCacheInfo, ResponseCacheInfo};
pub use error::{CodecError, ResponderError, Result, SignerError};
pub use options::{OcspMode, RequestOption, ResponderOption, ResponseOption};
pub use responder::{HealthCheckResult, Responder};
pub use server::OcspServer;
pub use signer::{ConcurrentSigner, ResponderSigner, SignatureAlgorithm};
