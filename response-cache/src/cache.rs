use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ocsp_api::{Certificate, HashAlgorithm, IssuerHash};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{CacheBackend, CacheKey, CachedResponse, IssuerId};
use crate::error::{CacheError, CacheResult};

/// Default lifetime of a cached response without nextUpdate.
pub const DEFAULT_CACHE_VALIDITY_SECS: i64 = 86_400;
/// Default period of the maintenance task.
pub const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 300;

/// Response cache shared by all responders of one server.
///
/// The cache is "on service" once its issuer table has been loaded. Until
/// then every lookup misses and nothing is stored.
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    master: bool,
    validity: Duration,
    on_service: AtomicBool,
    issuers: DashMap<IssuerHash, IssuerId>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>, master: bool, validity: Duration) -> Self {
        Self {
            backend,
            master,
            validity,
            on_service: AtomicBool::new(false),
            issuers: DashMap::new(),
            maintenance: Mutex::new(None),
        }
    }

    /// Loads the issuer table and puts the cache on service.
    ///
    /// # Errors
    /// Returns the backend error; the cache then stays off service until a
    /// later maintenance run succeeds.
    pub async fn init(&self) -> CacheResult<()> {
        match self.reload_issuers().await {
            Ok(count) => {
                self.on_service.store(true, Ordering::Release);
                info!(backend = %self.backend.name(), issuers = count, master = self.master, "Response cache on service");
                Ok(())
            }
            Err(e) => {
                self.on_service.store(false, Ordering::Release);
                error!(backend = %self.backend.name(), error = %e, "Response cache could not be initialized");
                Err(e)
            }
        }
    }

    pub fn is_on_service(&self) -> bool {
        self.on_service.load(Ordering::Acquire)
    }

    pub fn is_master(&self) -> bool {
        self.master
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    pub fn issuer_id(&self, issuer: &IssuerHash) -> Option<IssuerId> {
        self.issuers.get(issuer).map(|entry| *entry.value())
    }

    /// Registers an issuer certificate and returns its id.
    ///
    /// # Errors
    /// Returns [`CacheError::NotMaster`] on replicas, or the backend error.
    pub async fn register_issuer(&self, certificate: &Certificate) -> CacheResult<IssuerId> {
        if !self.master {
            return Err(CacheError::NotMaster);
        }
        let id = self.backend.store_issuer(certificate).await?;
        self.index_issuer(id, certificate);
        info!(issuer = %certificate.subject(), id, "Registered issuer in response cache");
        Ok(id)
    }

    /// Returns the cached response for `key` if it is still servable.
    ///
    /// # Errors
    /// Returns [`CacheError::OffService`] or the backend error.
    pub async fn get(
        &self,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> CacheResult<Option<CachedResponse>> {
        if !self.is_on_service() {
            return Err(CacheError::OffService);
        }
        let cached = self.backend.get_response(key).await?;
        Ok(cached.filter(|response| response.is_fresh(now, self.validity)))
    }

    /// # Errors
    /// Returns [`CacheError::OffService`] or the backend error.
    pub async fn put(&self, response: CachedResponse) -> CacheResult<()> {
        if !self.is_on_service() {
            return Err(CacheError::OffService);
        }
        debug!(issuer_id = response.key.issuer_id, serial = %response.key.serial, "Caching response");
        self.backend.put_response(response).await
    }

    /// One maintenance round: purge unservable responses and, on replicas,
    /// pick up issuers registered by the master.
    ///
    /// # Errors
    /// Returns the first backend error encountered.
    pub async fn run_maintenance(&self, now: DateTime<Utc>) -> CacheResult<u64> {
        if !self.master || !self.is_on_service() {
            self.reload_issuers().await?;
            self.on_service.store(true, Ordering::Release);
        }
        let purged = self.backend.purge_expired(now, self.validity).await?;
        if purged > 0 {
            debug!(purged, "Purged expired cached responses");
        }
        Ok(purged)
    }

    /// Spawns the periodic maintenance task; a previous task is replaced.
    ///
    /// A zero interval spawns nothing.
    pub fn spawn_maintenance(self: &Arc<Self>, interval: std::time::Duration) {
        if interval.is_zero() {
            warn!("Response cache maintenance interval is zero, maintenance not started");
            return;
        }
        let cache = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = cache.run_maintenance(Utc::now()).await {
                    warn!(error = %e, "Response cache maintenance failed");
                }
            }
        });
        if let Some(previous) = self.maintenance.lock().replace(handle) {
            previous.abort();
        }
    }

    pub async fn is_healthy(&self) -> bool {
        self.is_on_service() && self.backend.is_healthy().await
    }

    pub fn shutdown(&self) {
        if let Some(handle) = self.maintenance.lock().take() {
            handle.abort();
        }
        self.on_service.store(false, Ordering::Release);
    }

    async fn reload_issuers(&self) -> CacheResult<usize> {
        let records = self.backend.load_issuers().await?;
        let count = records.len();
        for record in records {
            self.index_issuer(record.id, &record.certificate);
        }
        Ok(count)
    }

    fn index_issuer(&self, id: IssuerId, certificate: &Certificate) {
        for algo in HashAlgorithm::ALL {
            self.issuers.insert(certificate.issuer_hash(algo), id);
        }
    }
}

impl Drop for ResponseCache {
    fn drop(&mut self) {
        if let Some(handle) = self.maintenance.get_mut().take() {
            handle.abort();
        }
    }
}
