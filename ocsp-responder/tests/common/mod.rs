//! Shared fixtures for the responder integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use audit_engine::{AuditSink, MemoryAuditSink};
use chrono::{DateTime, Duration, Utc};
use ocsp_api::{
    CertStatusInfo, Certificate, HashAlgorithm, IssuerHash, MemoryCertEntry, MemoryStatusStore,
    RevocationInfo, SerialNumber, StatusOptions, StatusQuery, StatusStore, StoreError,
    StoreResult, StoreSettings,
};
use ocsp_responder::codec::{CertId, Extension, OcspRequest, Request, RequestSignature, TbsRequest};
use ocsp_responder::{
    ConcurrentSigner, JsonCodec, OcspCodec, OcspEngine, OcspResponse, RequestOption,
    Responder, ResponderOption, ResponderSigner, ResponseOption, SignatureAlgorithm,
};
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use response_cache::{InMemoryCacheBackend, ResponseCache};
use ring::signature::Ed25519KeyPair;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// A certificate together with the rcgen material needed to issue or sign with it.
pub struct Identity {
    pub cert: Certificate,
    pub rc: rcgen::Certificate,
    pub key: KeyPair,
}

impl Identity {
    pub fn pkcs8(&self) -> Vec<u8> {
        self.key.serialize_der()
    }
}

fn params(cn: &str, ca: bool) -> CertificateParams {
    let mut params = CertificateParams::new(vec![]).unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    if ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    }
    params
}

pub fn self_signed(cn: &str, ca: bool) -> Identity {
    let key = KeyPair::generate_for(&rcgen::PKCS_ED25519).unwrap();
    let rc = params(cn, ca).self_signed(&key).unwrap();
    Identity {
        cert: Certificate::from_der(rc.der()).unwrap(),
        rc,
        key,
    }
}

pub fn issued(cn: &str, issuer: &Identity) -> Identity {
    let key = KeyPair::generate_for(&rcgen::PKCS_ED25519).unwrap();
    let rc = params(cn, false).signed_by(&key, &issuer.rc, &issuer.key).unwrap();
    Identity {
        cert: Certificate::from_der(rc.der()).unwrap(),
        rc,
        key,
    }
}

pub fn responder_signer() -> Arc<ResponderSigner> {
    let identity = self_signed("OCSP Responder", false);
    let key = Arc::new(
        ConcurrentSigner::new(SignatureAlgorithm::Ed25519, &identity.pkcs8(), 4).unwrap(),
    );
    Arc::new(ResponderSigner::new("signer1", vec![key], Some(identity.cert), vec![]).unwrap())
}

/// Memory store knowing `ca`, announcing nextUpdate one hour after thisUpdate.
pub async fn memory_store(name: &str, ca: &Certificate, settings: Option<StoreSettings>) -> Arc<MemoryStatusStore> {
    let settings = settings.unwrap_or_else(|| StoreSettings::new(name));
    let store = MemoryStatusStore::new(settings).with_update_interval(Duration::hours(1));
    store.add_issuer(ca.clone(), None).await;
    Arc::new(store)
}

pub async fn add_good(store: &MemoryStatusStore, ca: &Certificate, serial: u64) {
    store
        .add_certificate(ca, SerialNumber::from_u64(serial), MemoryCertEntry::good())
        .await
        .unwrap();
}

pub async fn add_revoked(store: &MemoryStatusStore, ca: &Certificate, serial: u64, revocation: RevocationInfo) {
    store
        .add_certificate(ca, SerialNumber::from_u64(serial), MemoryCertEntry::revoked(revocation))
        .await
        .unwrap();
}

pub fn responder(
    stores: Vec<Arc<dyn StatusStore>>,
    request_option: RequestOption,
    response_option: ResponseOption,
    option: ResponderOption,
) -> Responder {
    Responder::new(
        "responder1",
        option,
        Arc::new(request_option),
        Arc::new(response_option),
        responder_signer(),
        stores,
        None,
        None,
        vec!["/ocsp".to_string()],
    )
    .unwrap()
}

pub fn engine(cache: Option<Arc<ResponseCache>>, audit: &Arc<MemoryAuditSink>) -> OcspEngine {
    let sink: Arc<dyn AuditSink> = audit.clone();
    OcspEngine::new(Arc::new(JsonCodec::new()), cache, Some(sink), STORE_TIMEOUT).unwrap()
}

/// On-service master cache over an in-memory backend.
pub async fn master_cache() -> (Arc<ResponseCache>, Arc<InMemoryCacheBackend>) {
    let backend = Arc::new(InMemoryCacheBackend::new());
    let cache = Arc::new(ResponseCache::new(backend.clone(), true, Duration::days(1)));
    cache.init().await.unwrap();
    (cache, backend)
}

pub fn cert_id(issuer: &Certificate, serial: u64, algorithm: HashAlgorithm) -> CertId {
    let hash = issuer.issuer_hash(algorithm);
    CertId::new(algorithm, hash.name_hash, hash.key_hash, SerialNumber::from_u64(serial))
}

pub fn request(cert_ids: Vec<CertId>, extensions: Vec<Extension>) -> OcspRequest {
    OcspRequest {
        tbs_request: TbsRequest {
            version: 0,
            requestor_name: None,
            requests: cert_ids
                .into_iter()
                .map(|cert_id| Request {
                    cert_id,
                    extensions: vec![],
                })
                .collect(),
            extensions,
        },
        signature: None,
    }
}

/// Signs the request with `requestor`; `tamper` signs different bytes.
pub fn sign(request: &mut OcspRequest, requestor: &Identity, tamper: bool) {
    let codec = JsonCodec::new();
    let mut data = codec.request_signed_data(&request.tbs_request).unwrap();
    if tamper {
        data.push(0);
    }
    let key = Ed25519KeyPair::from_pkcs8_maybe_unchecked(&requestor.pkcs8()).unwrap();
    request.signature = Some(RequestSignature {
        algorithm: "Ed25519".to_string(),
        signature: key.sign(&data).as_ref().to_vec(),
        certs: vec![requestor.cert.encoded().to_vec()],
    });
}

pub fn encode(request: &OcspRequest) -> Vec<u8> {
    JsonCodec::new().encode_request(request).unwrap()
}

pub fn decode(bytes: &[u8]) -> OcspResponse {
    JsonCodec::new().decode_response(bytes).unwrap()
}

// ============================================================================
// Store doubles
// ============================================================================

/// Delegates to another store and counts status lookups.
pub struct CountingStore {
    inner: Arc<dyn StatusStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn StatusStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusStore for CountingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn settings(&self) -> &StoreSettings {
        self.inner.settings()
    }

    async fn cert_status(
        &self,
        now: DateTime<Utc>,
        query: &StatusQuery,
        options: &StatusOptions<'_>,
    ) -> StoreResult<Option<CertStatusInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.cert_status(now, query, options).await
    }

    async fn ca_revocation_info(&self, issuer: &IssuerHash) -> StoreResult<Option<RevocationInfo>> {
        self.inner.ca_revocation_info(issuer).await
    }

    async fn issuer_certificate(&self, issuer: &IssuerHash) -> StoreResult<Option<Certificate>> {
        self.inner.issuer_certificate(issuer).await
    }

    async fn is_healthy(&self) -> bool {
        self.inner.is_healthy().await
    }
}

/// Backend that is always down.
pub struct FailingStore {
    settings: StoreSettings,
}

impl FailingStore {
    pub fn new(name: &str) -> Self {
        Self {
            settings: StoreSettings::new(name),
        }
    }
}

#[async_trait]
impl StatusStore for FailingStore {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    async fn cert_status(
        &self,
        _now: DateTime<Utc>,
        _query: &StatusQuery,
        _options: &StatusOptions<'_>,
    ) -> StoreResult<Option<CertStatusInfo>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn ca_revocation_info(&self, _issuer: &IssuerHash) -> StoreResult<Option<RevocationInfo>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn issuer_certificate(&self, _issuer: &IssuerHash) -> StoreResult<Option<Certificate>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn is_healthy(&self) -> bool {
        false
    }
}

/// Store whose status lookup panics.
pub struct PanickingStore {
    settings: StoreSettings,
}

impl PanickingStore {
    pub fn new() -> Self {
        Self {
            settings: StoreSettings::new("panicking"),
        }
    }
}

#[async_trait]
impl StatusStore for PanickingStore {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    async fn cert_status(
        &self,
        _now: DateTime<Utc>,
        _query: &StatusQuery,
        _options: &StatusOptions<'_>,
    ) -> StoreResult<Option<CertStatusInfo>> {
        panic!("corrupted index")
    }

    async fn ca_revocation_info(&self, _issuer: &IssuerHash) -> StoreResult<Option<RevocationInfo>> {
        Ok(None)
    }

    async fn issuer_certificate(&self, _issuer: &IssuerHash) -> StoreResult<Option<Certificate>> {
        Ok(None)
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
