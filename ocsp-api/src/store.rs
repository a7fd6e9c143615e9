use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::certificate::Certificate;
use crate::certprofile::CertprofileOption;
use crate::error::StoreResult;
use crate::hash::HashAlgorithm;
use crate::query::{IssuerHash, StatusQuery};
use crate::status::{CertStatusInfo, RevocationInfo};

/// Keep revocation history forever.
pub const RETENTION_FOREVER: i32 = -1;

/// Per-store behaviour switches, shared by every store implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub name: String,
    /// Days of revocation history kept; `-1` keeps it forever.
    pub retention_interval_days: i32,
    pub unknown_serial_as_good: bool,
    pub include_archive_cutoff: bool,
    pub include_crl_id: bool,
    pub ignore_expired_cert: bool,
    pub ignore_not_yet_valid_cert: bool,
    /// Algorithms the store must be able to produce certificate hashes with.
    pub cert_hash_algorithms: BTreeSet<HashAlgorithm>,
}

impl StoreSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            retention_interval_days: RETENTION_FOREVER,
            unknown_serial_as_good: false,
            include_archive_cutoff: true,
            include_crl_id: true,
            ignore_expired_cert: true,
            ignore_not_yet_valid_cert: true,
            cert_hash_algorithms: BTreeSet::new(),
        }
    }
}

/// Per-request hints passed to a store along with the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOptions<'a> {
    pub include_cert_hash: bool,
    /// Overrides the CertID hash algorithm for certificate hashes.
    pub cert_hash_algorithm: Option<HashAlgorithm>,
    pub certprofile_option: Option<&'a CertprofileOption>,
}

/// A source of certificate-status answers.
///
/// Implementations must be safe for concurrent queries. Returning
/// `Ok(None)` or an ISSUER_UNKNOWN answer lets the next store vote.
#[async_trait]
pub trait StatusStore: Send + Sync {
    fn name(&self) -> &str;

    fn settings(&self) -> &StoreSettings;

    /// # Errors
    /// Returns an error when the backend could not be consulted.
    async fn cert_status(
        &self,
        now: DateTime<Utc>,
        query: &StatusQuery,
        options: &StatusOptions<'_>,
    ) -> StoreResult<Option<CertStatusInfo>>;

    /// Revocation of the issuing CA itself, if the store tracks it.
    ///
    /// # Errors
    /// Returns an error when the backend could not be consulted.
    async fn ca_revocation_info(&self, issuer: &IssuerHash) -> StoreResult<Option<RevocationInfo>>;

    /// Certificate of a known issuer, used to populate the response cache.
    ///
    /// # Errors
    /// Returns an error when the backend could not be consulted.
    async fn issuer_certificate(&self, issuer: &IssuerHash) -> StoreResult<Option<Certificate>>;

    async fn is_healthy(&self) -> bool;

    async fn shutdown(&self) {}
}
