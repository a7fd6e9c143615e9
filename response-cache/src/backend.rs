use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ocsp_api::{Certificate, SerialNumber};

use crate::error::CacheResult;

pub type IssuerId = i32;

/// Identity of a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub issuer_id: IssuerId,
    pub serial: SerialNumber,
    pub signature_algorithm: u8,
    pub cert_hash_algorithm: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub key: CacheKey,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub encoded: Vec<u8>,
}

impl CachedResponse {
    /// A response is served until its nextUpdate, or until
    /// `this_update + validity` when it has none.
    pub fn is_fresh(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        match self.next_update {
            Some(next_update) => now < next_update,
            None => now < self.this_update + validity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuerRecord {
    pub id: IssuerId,
    pub certificate: Certificate,
}

/// Storage behind [`crate::ResponseCache`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// Returns an error when the backend is unreachable or holds bad data.
    async fn load_issuers(&self) -> CacheResult<Vec<IssuerRecord>>;

    /// Stores the certificate and returns its id. Idempotent per certificate.
    ///
    /// # Errors
    /// Returns an error when the backend is unreachable.
    async fn store_issuer(&self, certificate: &Certificate) -> CacheResult<IssuerId>;

    /// # Errors
    /// Returns an error when the backend is unreachable.
    async fn get_response(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>>;

    /// Inserts or replaces the response stored under its key.
    ///
    /// # Errors
    /// Returns an error when the backend is unreachable.
    async fn put_response(&self, response: CachedResponse) -> CacheResult<()>;

    /// Removes responses that can no longer be served.
    ///
    /// # Errors
    /// Returns an error when the backend is unreachable.
    async fn purge_expired(&self, now: DateTime<Utc>, validity: Duration) -> CacheResult<u64>;

    async fn is_healthy(&self) -> bool;
}
