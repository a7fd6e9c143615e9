use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ocsp_api::{Certificate, HashAlgorithm};
use parking_lot::Mutex;

use crate::backend::{CacheBackend, CacheKey, CachedResponse, IssuerId, IssuerRecord};
use crate::error::{CacheError, CacheResult};

/// Process-local cache backend.
#[derive(Default)]
pub struct InMemoryCacheBackend {
    issuers: Mutex<Vec<(Vec<u8>, IssuerRecord)>>,
    responses: DashMap<CacheKey, CachedResponse>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response_count(&self) -> usize {
        self.responses.len()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_issuers(&self) -> CacheResult<Vec<IssuerRecord>> {
        Ok(self
            .issuers
            .lock()
            .iter()
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn store_issuer(&self, certificate: &Certificate) -> CacheResult<IssuerId> {
        let fingerprint = certificate.fingerprint(HashAlgorithm::Sha1);
        let mut issuers = self.issuers.lock();
        if let Some((_, record)) = issuers.iter().find(|(fp, _)| *fp == fingerprint) {
            return Ok(record.id);
        }

        let id = IssuerId::try_from(issuers.len() + 1)
            .map_err(|_| CacheError::InvalidData("issuer id overflow".to_string()))?;
        issuers.push((
            fingerprint,
            IssuerRecord {
                id,
                certificate: certificate.clone(),
            },
        ));
        Ok(id)
    }

    async fn get_response(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        Ok(self.responses.get(key).map(|entry| entry.value().clone()))
    }

    async fn put_response(&self, response: CachedResponse) -> CacheResult<()> {
        self.responses.insert(response.key.clone(), response);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>, validity: Duration) -> CacheResult<u64> {
        let before = self.responses.len();
        self.responses.retain(|_, response| response.is_fresh(now, validity));
        Ok(u64::try_from(before.saturating_sub(self.responses.len())).unwrap_or(u64::MAX))
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
