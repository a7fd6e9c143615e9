//! Built-in status store that keeps issuers and certificates in memory.
//!
//! Useful for small deployments, tests and as the reference behaviour for
//! the store settings flags. Entries come from configuration or are added
//! at runtime.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::certificate::Certificate;
use crate::error::{StoreError, StoreResult};
use crate::hash::HashAlgorithm;
use crate::query::{IssuerHash, StatusQuery};
use crate::registry::{StoreContext, StoreFactory};
use crate::serial::SerialNumber;
use crate::status::{CertStatusInfo, CrlId, RevocationInfo};
use crate::store::{StatusOptions, StatusStore, StoreSettings};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStoreConf {
    #[serde(default)]
    pub issuers: Vec<MemoryIssuerConf>,
    /// Announced as nextUpdate = thisUpdate + interval when set.
    #[serde(default)]
    pub update_interval_seconds: Option<u64>,
    /// CRL the data set was loaded from, announced when `include_crl_id` is set.
    #[serde(default)]
    pub crl_id: Option<CrlId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryIssuerConf {
    pub cert_file: PathBuf,
    #[serde(default)]
    pub revocation: Option<RevocationInfo>,
    #[serde(default)]
    pub certs: Vec<MemoryCertConf>,
}

/// One certificate entry; either `serial` or `cert_file` must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCertConf {
    #[serde(default)]
    pub serial: Option<SerialNumber>,
    #[serde(default)]
    pub cert_file: Option<PathBuf>,
    #[serde(default)]
    pub revocation: Option<RevocationInfo>,
    #[serde(default)]
    pub certprofile: Option<String>,
    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub not_after: Option<DateTime<Utc>>,
}

// ============================================================================
// Entries
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryCertEntry {
    pub revocation: Option<RevocationInfo>,
    pub certprofile: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    /// Full certificate, needed for certificate hashes.
    pub certificate: Option<Certificate>,
}

impl MemoryCertEntry {
    pub fn good() -> Self {
        Self::default()
    }

    pub fn revoked(revocation: RevocationInfo) -> Self {
        Self {
            revocation: Some(revocation),
            ..Self::default()
        }
    }

    /// Entry whose validity period comes from the certificate itself.
    pub fn from_certificate(certificate: Certificate) -> Self {
        Self {
            not_before: Some(certificate.not_before()),
            not_after: Some(certificate.not_after()),
            certificate: Some(certificate),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_certprofile(mut self, certprofile: impl Into<String>) -> Self {
        self.certprofile = Some(certprofile.into());
        self
    }

    #[must_use]
    pub fn with_revocation(mut self, revocation: RevocationInfo) -> Self {
        self.revocation = Some(revocation);
        self
    }
}

struct StoredCert {
    entry: MemoryCertEntry,
    cert_hashes: HashMap<HashAlgorithm, Vec<u8>>,
}

struct IssuerEntry {
    certificate: Certificate,
    hashes: Vec<IssuerHash>,
    revocation: Option<RevocationInfo>,
    certs: HashMap<SerialNumber, StoredCert>,
}

impl IssuerEntry {
    fn matches(&self, issuer: &IssuerHash) -> bool {
        self.hashes.iter().any(|hash| hash == issuer)
    }
}

struct MemoryState {
    this_update: DateTime<Utc>,
    issuers: Vec<IssuerEntry>,
}

// ============================================================================
// Store
// ============================================================================

pub struct MemoryStatusStore {
    settings: StoreSettings,
    update_interval: Option<Duration>,
    crl_id: Option<CrlId>,
    state: RwLock<MemoryState>,
    healthy: AtomicBool,
}

impl MemoryStatusStore {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            settings,
            update_interval: None,
            crl_id: None,
            state: RwLock::new(MemoryState {
                this_update: Utc::now(),
                issuers: Vec::new(),
            }),
            healthy: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn with_crl_id(mut self, crl_id: CrlId) -> Self {
        self.crl_id = Some(crl_id);
        self
    }

    /// Builds a store from its configuration block, loading certificate files.
    ///
    /// # Errors
    /// Returns an error when a referenced file cannot be read or an entry is
    /// incomplete.
    pub async fn from_conf(settings: StoreSettings, conf: MemoryStoreConf) -> StoreResult<Self> {
        let mut store = Self::new(settings);
        if let Some(seconds) = conf.update_interval_seconds {
            let seconds = i64::try_from(seconds)
                .map_err(|_| StoreError::Configuration("update interval too large".to_string()))?;
            store = store.with_update_interval(Duration::seconds(seconds));
        }
        if let Some(crl_id) = conf.crl_id {
            store = store.with_crl_id(crl_id);
        }

        for issuer_conf in conf.issuers {
            let issuer_cert = Certificate::load(&issuer_conf.cert_file)?;
            store
                .add_issuer(issuer_cert.clone(), issuer_conf.revocation)
                .await;

            for cert_conf in issuer_conf.certs {
                let (serial, mut entry) = match (&cert_conf.cert_file, &cert_conf.serial) {
                    (Some(path), _) => {
                        let cert = Certificate::load(path)?;
                        (cert.serial().clone(), MemoryCertEntry::from_certificate(cert))
                    }
                    (None, Some(serial)) => (serial.clone(), MemoryCertEntry::good()),
                    (None, None) => {
                        return Err(StoreError::Configuration(format!(
                            "certificate entry under {} needs serial or cert_file",
                            issuer_cert.subject()
                        )))
                    }
                };
                entry.revocation = cert_conf.revocation;
                entry.certprofile = cert_conf.certprofile;
                if cert_conf.not_before.is_some() {
                    entry.not_before = cert_conf.not_before;
                }
                if cert_conf.not_after.is_some() {
                    entry.not_after = cert_conf.not_after;
                }
                store.add_certificate(&issuer_cert, serial, entry).await?;
            }
        }

        Ok(store)
    }

    /// Adds an issuer, replacing any previous entry for the same certificate.
    pub async fn add_issuer(&self, certificate: Certificate, revocation: Option<RevocationInfo>) {
        let hashes = HashAlgorithm::ALL
            .into_iter()
            .map(|algo| certificate.issuer_hash(algo))
            .collect();
        let mut state = self.state.write().await;
        state.issuers.retain(|issuer| issuer.certificate != certificate);
        info!(store = %self.settings.name, issuer = %certificate.subject(), "Added issuer");
        state.issuers.push(IssuerEntry {
            certificate,
            hashes,
            revocation,
            certs: HashMap::new(),
        });
    }

    /// # Errors
    /// Returns [`StoreError::InvalidData`] when the issuer is not known.
    pub async fn revoke_issuer(
        &self,
        issuer: &Certificate,
        revocation: RevocationInfo,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let entry = find_issuer_mut(&mut state.issuers, issuer)?;
        entry.revocation = Some(revocation);
        Ok(())
    }

    /// # Errors
    /// Returns [`StoreError::InvalidData`] when the issuer is not known.
    pub async fn add_certificate(
        &self,
        issuer: &Certificate,
        serial: SerialNumber,
        entry: MemoryCertEntry,
    ) -> StoreResult<()> {
        let cert_hashes = entry
            .certificate
            .as_ref()
            .map(|cert| {
                self.settings
                    .cert_hash_algorithms
                    .iter()
                    .map(|algo| (*algo, cert.fingerprint(*algo)))
                    .collect()
            })
            .unwrap_or_default();

        let mut state = self.state.write().await;
        let issuer_entry = find_issuer_mut(&mut state.issuers, issuer)?;
        debug!(store = %self.settings.name, serial = %serial, "Added certificate entry");
        issuer_entry
            .certs
            .insert(serial, StoredCert { entry, cert_hashes });
        Ok(())
    }

    /// Marks a newly loaded data set; thisUpdate of later answers becomes `now`.
    pub async fn refresh(&self, now: DateTime<Utc>) {
        self.state.write().await.this_update = now;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    fn archive_cutoff(&self, issuer: &Certificate, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.settings.include_archive_cutoff {
            return None;
        }
        match self.settings.retention_interval_days {
            days if days < 0 => Some(issuer.not_before()),
            0 => None,
            // Beyond chrono's range there is simply no cutoff.
            days => now.checked_sub_signed(Duration::days(i64::from(days))),
        }
    }
}

fn find_issuer_mut<'a>(
    issuers: &'a mut [IssuerEntry],
    certificate: &Certificate,
) -> StoreResult<&'a mut IssuerEntry> {
    issuers
        .iter_mut()
        .find(|issuer| issuer.certificate == *certificate)
        .ok_or_else(|| StoreError::InvalidData(format!("unknown issuer {}", certificate.subject())))
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    async fn cert_status(
        &self,
        now: DateTime<Utc>,
        query: &StatusQuery,
        options: &StatusOptions<'_>,
    ) -> StoreResult<Option<CertStatusInfo>> {
        let state = self.state.read().await;
        let Some(issuer) = state.issuers.iter().find(|issuer| issuer.matches(&query.issuer)) else {
            return Ok(Some(CertStatusInfo::issuer_unknown(Some(now), None)));
        };

        let this_update = Some(state.this_update);
        let next_update = self.update_interval.map(|interval| state.this_update + interval);

        let mut info = match issuer.certs.get(&query.serial) {
            None if self.settings.unknown_serial_as_good => {
                CertStatusInfo::good(this_update, next_update)
            }
            None => CertStatusInfo::unknown(this_update, next_update),
            Some(stored) => {
                let entry = &stored.entry;
                let expired = entry.not_after.is_some_and(|t| t < now);
                let not_yet_valid = entry.not_before.is_some_and(|t| t > now);
                let filtered = match (&entry.certprofile, options.certprofile_option) {
                    (Some(profile), Some(filter)) => !filter.include(profile),
                    _ => false,
                };

                if (expired && self.settings.ignore_expired_cert)
                    || (not_yet_valid && self.settings.ignore_not_yet_valid_cert)
                    || filtered
                {
                    return Ok(Some(CertStatusInfo::ignore(this_update, next_update)));
                }

                let mut info = match &entry.revocation {
                    Some(revocation) => {
                        CertStatusInfo::revoked(revocation.clone(), this_update, next_update)
                    }
                    None => CertStatusInfo::good(this_update, next_update),
                };

                if options.include_cert_hash {
                    let algo = options
                        .cert_hash_algorithm
                        .unwrap_or(query.issuer.algorithm);
                    if let Some(hash) = stored.cert_hashes.get(&algo) {
                        info = info.with_cert_hash(algo, hash.clone());
                    }
                }
                if let Some(profile) = &entry.certprofile {
                    info = info.with_certprofile(profile.clone());
                }
                info
            }
        };

        if let Some(cutoff) = self.archive_cutoff(&issuer.certificate, now) {
            info = info.with_archive_cutoff(cutoff);
        }
        if let Some(crl_id) = self.crl_id.as_ref().filter(|_| self.settings.include_crl_id) {
            info = info.with_crl_id(crl_id.clone());
        }
        Ok(Some(info))
    }

    async fn ca_revocation_info(&self, issuer: &IssuerHash) -> StoreResult<Option<RevocationInfo>> {
        let state = self.state.read().await;
        Ok(state
            .issuers
            .iter()
            .find(|entry| entry.matches(issuer))
            .and_then(|entry| entry.revocation.clone()))
    }

    async fn issuer_certificate(&self, issuer: &IssuerHash) -> StoreResult<Option<Certificate>> {
        let state = self.state.read().await;
        Ok(state
            .issuers
            .iter()
            .find(|entry| entry.matches(issuer))
            .map(|entry| entry.certificate.clone()))
    }

    async fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

/// Factory for the `memory` store type.
pub struct MemoryStoreFactory;

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    fn type_name(&self) -> &str {
        "memory"
    }

    async fn create(&self, context: StoreContext) -> StoreResult<Arc<dyn StatusStore>> {
        let conf: MemoryStoreConf = if context.conf.is_null() {
            MemoryStoreConf::default()
        } else {
            serde_json::from_value(context.conf)?
        };
        let store = MemoryStatusStore::from_conf(context.settings, conf).await?;
        Ok(Arc::new(store))
    }
}
