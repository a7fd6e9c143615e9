//! The request-answering state machine.
//!
//! [`OcspEngine::answer`] never fails: every rejection, store outage,
//! signing problem or panic ends up as an encoded OCSP failure response,
//! with the detail written to the audit trail instead.

use audit_engine::{
    new_message_id, AuditLevel, AuditScope, AuditSink, AuditStatus, APPLICATION_NAME,
    KEY_MESSAGE_ID, KEY_SERIAL, KEY_STATUS, KEY_TYPE,
};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use ocsp_api::{
    CertStatus, Certificate, CrlReason, HashAlgorithm, IssuerHash, StatusOptions, StatusQuery,
};
use response_cache::{CacheKey, CachedResponse, IssuerId, ResponseCache};
use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::codec::{
    find_extension, oid, BasicOcspResponse, CertId, CertStatusValue, Extension, OcspCodec,
    OcspRequest, OcspResponse, OcspResponseStatus, Request, ResponseData, SingleResponse,
    DER_NULL,
};
use crate::error::{Result, SignerError};
use crate::options::{EmbedCertsMode, RequestOption};
use crate::resolve::{inherit_ca_revocation, resolve_status};
use crate::responder::{Responder, UNKNOWN_CERT_TYPE};
use crate::trust::verify_signature;

/// How the transport received the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Cacheable transport; freshness metadata is returned with the bytes.
    Get,
    Post,
}

/// Validity window of a cacheable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCacheInfo {
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspRespWithCacheInfo {
    pub response: Vec<u8>,
    pub cache_info: Option<ResponseCacheInfo>,
}

/// Why a request was not answered with a successful response.
#[derive(Debug)]
struct Rejection {
    status: OcspResponseStatus,
    level: AuditLevel,
    message: String,
}

impl Rejection {
    fn new(status: OcspResponseStatus, level: AuditLevel, message: impl Into<String>) -> Self {
        Self {
            status,
            level,
            message: message.into(),
        }
    }

    fn malformed(message: impl Into<String>) -> Self {
        Self::new(OcspResponseStatus::MalformedRequest, AuditLevel::Info, message)
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(OcspResponseStatus::Unauthorized, AuditLevel::Info, message)
    }

    fn sig_required(message: impl Into<String>) -> Self {
        Self::new(OcspResponseStatus::SigRequired, AuditLevel::Info, message)
    }

    fn try_later(message: impl Into<String>) -> Self {
        Self::new(OcspResponseStatus::TryLater, AuditLevel::Warn, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(OcspResponseStatus::InternalError, AuditLevel::Error, message)
    }
}

type Outcome<T> = std::result::Result<T, Rejection>;

/// Per-request state accumulated while building the single responses.
struct ResponseControl {
    can_cache: bool,
    include_extended_revoke: bool,
    this_update: Option<DateTime<Utc>>,
    next_update: Option<DateTime<Utc>>,
}

impl ResponseControl {
    fn new(can_cache: bool) -> Self {
        Self {
            can_cache,
            include_extended_revoke: false,
            this_update: None,
            next_update: None,
        }
    }

    /// Latest thisUpdate and earliest nextUpdate over all entries.
    fn merge_window(&mut self, this_update: DateTime<Utc>, next_update: Option<DateTime<Utc>>) {
        self.this_update = Some(self.this_update.map_or(this_update, |t| t.max(this_update)));
        if let Some(next_update) = next_update {
            self.next_update = Some(self.next_update.map_or(next_update, |t| t.min(next_update)));
        }
    }
}

pub struct OcspEngine {
    codec: Arc<dyn OcspCodec>,
    cache: Option<Arc<ResponseCache>>,
    audit: Option<Arc<dyn AuditSink>>,
    store_timeout: Duration,
    failures: HashMap<OcspResponseStatus, Vec<u8>>,
}

impl OcspEngine {
    /// Failure responses are encoded once here.
    ///
    /// # Errors
    /// Returns an error when the codec cannot encode a failure response.
    pub fn new(
        codec: Arc<dyn OcspCodec>,
        cache: Option<Arc<ResponseCache>>,
        audit: Option<Arc<dyn AuditSink>>,
        store_timeout: Duration,
    ) -> Result<Self> {
        let mut failures = HashMap::new();
        for status in OcspResponseStatus::FAILURES {
            failures.insert(status, codec.encode_response(&OcspResponse::failure(status))?);
        }
        Ok(Self {
            codec,
            cache,
            audit,
            store_timeout,
            failures,
        })
    }

    pub fn codec(&self) -> &Arc<dyn OcspCodec> {
        &self.codec
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    pub fn audit_sink(&self) -> Option<&Arc<dyn AuditSink>> {
        self.audit.as_ref()
    }

    fn failure_response(&self, status: OcspResponseStatus) -> OcspRespWithCacheInfo {
        OcspRespWithCacheInfo {
            response: self.failures.get(&status).cloned().unwrap_or_default(),
            cache_info: None,
        }
    }

    /// Answers one raw request on behalf of `responder`.
    pub async fn answer(
        &self,
        responder: &Responder,
        request: &[u8],
        delivery: DeliveryMode,
    ) -> OcspRespWithCacheInfo {
        let mut audit = match &self.audit {
            Some(sink) => AuditScope::new(Arc::clone(sink), APPLICATION_NAME, responder.name()),
            None => AuditScope::disabled(),
        };
        audit.add(KEY_MESSAGE_ID, new_message_id());

        let outcome = AssertUnwindSafe(self.process(responder, request, delivery, &mut audit))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(response)) => {
                audit.fill(AuditLevel::Info, AuditStatus::Successful, None);
                response
            }
            Ok(Err(rejection)) => {
                if rejection.level == AuditLevel::Error {
                    error!(responder = %responder.name(), status = ?rejection.status, reason = %rejection.message, "Could not answer OCSP request");
                } else {
                    warn!(responder = %responder.name(), status = ?rejection.status, reason = %rejection.message, "Rejected OCSP request");
                }
                audit.fill(rejection.level, AuditStatus::Failed, Some(&rejection.message));
                self.failure_response(rejection.status)
            }
            Err(_) => {
                error!(responder = %responder.name(), "Panic while answering OCSP request");
                audit.fill(AuditLevel::Error, AuditStatus::Failed, Some("internal error"));
                self.failure_response(OcspResponseStatus::InternalError)
            }
        }
    }

    async fn process(
        &self,
        responder: &Responder,
        raw: &[u8],
        delivery: DeliveryMode,
        audit: &mut AuditScope,
    ) -> Outcome<OcspRespWithCacheInfo> {
        let now = Utc::now();
        let request_option = responder.request_option();
        let response_option = responder.response_option();

        let request = self
            .codec
            .decode_request(raw)
            .map_err(|e| Rejection::malformed(format!("could not parse the request: {e}")))?;
        let tbs = &request.tbs_request;

        if !request_option.is_version_allowed(tbs.version) {
            return Err(Rejection::malformed(format!(
                "invalid request version {}",
                tbs.version
            )));
        }

        self.check_signature(&request, request_option, now)?;

        if tbs.requests.is_empty() {
            return Err(Rejection::malformed("request contains no entries"));
        }
        if tbs.requests.len() > request_option.max_request_list_count {
            return Err(Rejection::malformed(format!(
                "{} entries in request, at most {} allowed",
                tbs.requests.len(),
                request_option.max_request_list_count
            )));
        }

        let mut unprocessed_critical: BTreeSet<&str> = tbs
            .extensions
            .iter()
            .filter(|extension| extension.critical)
            .map(|extension| extension.oid.as_str())
            .collect();

        let nonce = find_extension(&tbs.extensions, oid::NONCE);
        unprocessed_critical.remove(oid::NONCE);
        request_option
            .nonce
            .check(nonce.map(|extension| extension.value.as_slice()))
            .map_err(Rejection::malformed)?;

        let mut signer = responder.signer().default_signer();
        if responder.option().negotiates_signature_algorithm() {
            unprocessed_critical.remove(oid::PREFERRED_SIGNATURE_ALGORITHMS);
            if let Some(extension) =
                find_extension(&tbs.extensions, oid::PREFERRED_SIGNATURE_ALGORITHMS)
            {
                let preferred = self
                    .codec
                    .decode_preferred_algorithms(&extension.value)
                    .map_err(|e| {
                        Rejection::malformed(format!("invalid preferred signature algorithms: {e}"))
                    })?;
                match responder.signer().signer_for_preferred(&preferred) {
                    Some(preferred_signer) => signer = preferred_signer,
                    None => debug!(responder = %responder.name(), ?preferred, "No key for the preferred algorithms, using the default"),
                }
            }
        }

        if !unprocessed_critical.is_empty() {
            let oids: Vec<&str> = unprocessed_critical.into_iter().collect();
            return Err(Rejection::malformed(format!(
                "could not process critical request extensions: {}",
                oids.join(", ")
            )));
        }

        // Cache short-circuit for single, nonce-free requests.
        let mut cache_slot: Option<(&Arc<ResponseCache>, CacheKey)> = None;
        if let (None, [entry]) = (nonce, tbs.requests.as_slice()) {
            if let Some(cache) = self.cache.as_ref().filter(|cache| cache.is_on_service()) {
                let hash_algorithm = accepted_hash_algorithm(request_option, &entry.cert_id)?;
                let cert_hash_algorithm = response_option
                    .cert_hash_algorithm
                    .unwrap_or(hash_algorithm);
                let issuer = issuer_hash(&entry.cert_id, hash_algorithm);

                match self.cached_issuer_id(cache, responder, &issuer).await {
                    Some(issuer_id) => {
                        let key = CacheKey {
                            issuer_id,
                            serial: entry.cert_id.serial_number.clone(),
                            signature_algorithm: signer.algorithm().code(),
                            cert_hash_algorithm: cert_hash_algorithm.code(),
                        };
                        match timeout(self.store_timeout, cache.get(&key, now)).await {
                            Ok(Ok(Some(cached))) => {
                                debug!(responder = %responder.name(), serial = %key.serial, "Response cache hit");
                                audit.add(KEY_SERIAL, key.serial.to_hex());
                                audit.add(KEY_STATUS, "cached");
                                let cache_info = (delivery == DeliveryMode::Get).then_some(
                                    ResponseCacheInfo {
                                        this_update: cached.this_update,
                                        next_update: cached.next_update,
                                    },
                                );
                                return Ok(OcspRespWithCacheInfo {
                                    response: cached.encoded,
                                    cache_info,
                                });
                            }
                            Ok(Ok(None)) => {
                                debug!(responder = %responder.name(), serial = %key.serial, "Response cache miss");
                            }
                            Ok(Err(e)) => {
                                warn!(responder = %responder.name(), error = %e, "Response cache lookup failed");
                            }
                            Err(_) => {
                                warn!(responder = %responder.name(), "Response cache lookup timed out");
                            }
                        }
                        cache_slot = Some((cache, key));
                    }
                    None => {
                        debug!(responder = %responder.name(), "Issuer not in response cache, caching disabled for this request");
                    }
                }
            }
        }

        let mut control = ResponseControl::new(nonce.is_none());
        let mut responses = Vec::with_capacity(tbs.requests.len());
        for entry in &tbs.requests {
            let mut entry_audit = audit.child("entry");
            let single = self
                .single_response(responder, entry, now, &mut control, &mut entry_audit)
                .await;
            match single {
                Ok(single) => responses.push(single),
                Err(rejection) => {
                    entry_audit.fill(
                        rejection.level,
                        AuditStatus::Failed,
                        Some(&rejection.message),
                    );
                    return Err(rejection);
                }
            }
        }

        let mut extensions = Vec::new();
        if let Some(nonce) = nonce {
            extensions.push(Extension::new(oid::NONCE, false, nonce.value.clone()));
        }
        if control.include_extended_revoke {
            extensions.push(Extension::new(oid::EXTENDED_REVOKE, true, DER_NULL.to_vec()));
        }

        let responder_signer = responder.signer();
        let tbs_response = ResponseData {
            version: 0,
            responder_id: responder_signer.responder_id(response_option.responder_id_by_name),
            produced_at: now,
            responses,
            extensions,
        };
        let signed_data = self
            .codec
            .response_signed_data(&tbs_response)
            .map_err(|e| Rejection::internal(format!("could not encode response data: {e}")))?;
        let signature = signer.sign(&signed_data).map_err(|e| match e {
            SignerError::NoIdleSigner => Rejection::try_later("no idle signer available"),
            other => Rejection::internal(format!("could not sign the response: {other}")),
        })?;

        let certs = embedded_certs(
            response_option.embed_certs_mode,
            responder_signer.certificate(),
            responder_signer.chain(),
        );
        let response = OcspResponse::successful(BasicOcspResponse {
            tbs_response_data: tbs_response,
            signature_algorithm: signer.algorithm().name().to_string(),
            signature,
            certs,
        });
        let encoded = self
            .codec
            .encode_response(&response)
            .map_err(|e| Rejection::internal(format!("could not encode the response: {e}")))?;

        let window = ResponseCacheInfo {
            this_update: control.this_update.unwrap_or(now),
            next_update: control.next_update,
        };
        if let (true, Some((cache, key))) = (control.can_cache, cache_slot) {
            let cached = CachedResponse {
                key,
                this_update: window.this_update,
                next_update: window.next_update,
                encoded: encoded.clone(),
            };
            match timeout(self.store_timeout, cache.put(cached)).await {
                Ok(Ok(())) => debug!(responder = %responder.name(), "Stored response in cache"),
                Ok(Err(e)) => warn!(responder = %responder.name(), error = %e, "Could not store response in cache"),
                Err(_) => warn!(responder = %responder.name(), "Storing response in cache timed out"),
            }
        }

        let cache_info = (delivery == DeliveryMode::Get && control.can_cache).then_some(window);
        Ok(OcspRespWithCacheInfo {
            response: encoded,
            cache_info,
        })
    }

    fn check_signature(
        &self,
        request: &OcspRequest,
        option: &RequestOption,
        now: DateTime<Utc>,
    ) -> Outcome<()> {
        let Some(signature) = &request.signature else {
            return if option.signature_required {
                Err(Rejection::sig_required("signature in request required"))
            } else {
                Ok(())
            };
        };
        if !option.validate_signature {
            return Ok(());
        }

        let mut certs = signature.certs.iter();
        let Some(first) = certs.next() else {
            return Err(Rejection::unauthorized(
                "no certificate found in request to verify the signature",
            ));
        };
        let requestor = Certificate::from_der(first).map_err(|e| {
            Rejection::unauthorized(format!("could not parse the requestor certificate: {e}"))
        })?;

        let signed_data = self
            .codec
            .request_signed_data(&request.tbs_request)
            .map_err(|e| Rejection::internal(format!("could not encode request data: {e}")))?;
        if !verify_signature(&signature.algorithm, &requestor, &signed_data, &signature.signature) {
            return Err(Rejection::unauthorized("request signature is invalid"));
        }

        let extra: Vec<Certificate> = certs
            .filter_map(|der| Certificate::from_der(der).ok())
            .collect();
        if !option.trust.can_build_certpath(&requestor, &extra, now) {
            return Err(Rejection::unauthorized(
                "could not build the certpath for the request's signer certificate",
            ));
        }
        Ok(())
    }

    /// Issuer id for the cache, registering the issuer when this replica is master.
    async fn cached_issuer_id(
        &self,
        cache: &ResponseCache,
        responder: &Responder,
        issuer: &IssuerHash,
    ) -> Option<IssuerId> {
        if let Some(id) = cache.issuer_id(issuer) {
            return Some(id);
        }
        if !cache.is_master() {
            return None;
        }

        for store in responder.stores() {
            match timeout(self.store_timeout, store.issuer_certificate(issuer)).await {
                Ok(Ok(Some(certificate))) => {
                    let registered =
                        timeout(self.store_timeout, cache.register_issuer(&certificate)).await;
                    return match registered {
                        Ok(Ok(id)) => Some(id),
                        Ok(Err(e)) => {
                            warn!(store = %store.name(), error = %e, "Could not register issuer in response cache");
                            None
                        }
                        Err(_) => {
                            warn!(store = %store.name(), "Registering issuer in response cache timed out");
                            None
                        }
                    };
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    warn!(store = %store.name(), error = %e, "Could not look up issuer certificate");
                }
                Err(_) => {
                    warn!(store = %store.name(), "Issuer certificate lookup timed out");
                }
            }
        }
        None
    }

    async fn single_response(
        &self,
        responder: &Responder,
        entry: &Request,
        now: DateTime<Utc>,
        control: &mut ResponseControl,
        audit: &mut AuditScope,
    ) -> Outcome<SingleResponse> {
        let response_option = responder.response_option();
        let serial = &entry.cert_id.serial_number;
        audit.add(KEY_SERIAL, serial.to_hex());

        let hash_algorithm = accepted_hash_algorithm(responder.request_option(), &entry.cert_id)?;
        let query = StatusQuery::new(issuer_hash(&entry.cert_id, hash_algorithm), serial.clone());
        let options = StatusOptions {
            include_cert_hash: response_option.include_cert_hash,
            cert_hash_algorithm: response_option.cert_hash_algorithm,
            certprofile_option: responder.certprofile_option(),
        };

        let resolved = resolve_status(responder.stores(), now, &query, &options, self.store_timeout)
            .await
            .ok_or_else(|| Rejection::try_later("no status store could answer the request"))?;
        let mut info = resolved.info;

        if let (Some(store), true) = (resolved.store, responder.option().inherit_ca_revocation) {
            match timeout(self.store_timeout, store.ca_revocation_info(&query.issuer)).await {
                Ok(Ok(Some(ca_revocation))) => info = inherit_ca_revocation(info, &ca_revocation),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    return Err(Rejection::try_later(format!(
                        "could not get the CA revocation from store {}: {e}",
                        store.name()
                    )))
                }
                Err(_) => {
                    return Err(Rejection::try_later(format!(
                        "CA revocation lookup in store {} timed out",
                        store.name()
                    )))
                }
            }
        }

        let cert_type = match responder.audit_option() {
            Some(option) => option.cert_type(info.certprofile()),
            None => info.certprofile().unwrap_or(UNKNOWN_CERT_TYPE).to_string(),
        };
        audit.add(KEY_TYPE, cert_type);

        let mut extensions = Vec::new();
        let (cert_status, status_text) = match info.status() {
            CertStatus::Good => (CertStatusValue::Good, "good"),
            CertStatus::Revoked => {
                let revocation = info.revocation().ok_or_else(|| {
                    Rejection::internal("revoked status without revocation information")
                })?;
                if response_option.include_invalidity_date {
                    if let Some(invalidity) = revocation
                        .invalidity_time
                        .filter(|time| *time != revocation.revocation_time)
                    {
                        let value = self.codec.encode_time(invalidity).map_err(|e| {
                            Rejection::internal(format!("could not encode invalidity date: {e}"))
                        })?;
                        extensions.push(Extension::new(oid::INVALIDITY_DATE, false, value));
                    }
                }
                let reason = response_option
                    .include_rev_reason
                    .then_some(revocation.reason.code());
                (
                    CertStatusValue::Revoked {
                        revocation_time: revocation.revocation_time,
                        reason,
                    },
                    "revoked",
                )
            }
            CertStatus::IssuerUnknown => {
                control.can_cache = false;
                (CertStatusValue::Unknown, "issuer_unknown")
            }
            status @ (CertStatus::Unknown | CertStatus::Ignore) => {
                control.can_cache = false;
                let text = if status == CertStatus::Unknown { "unknown" } else { "ignore" };
                if responder.option().uses_extended_revoke() {
                    control.include_extended_revoke = true;
                    (
                        CertStatusValue::Revoked {
                            revocation_time: DateTime::<Utc>::from(std::time::UNIX_EPOCH),
                            reason: Some(CrlReason::CertificateHold.code()),
                        },
                        text,
                    )
                } else {
                    (CertStatusValue::Unknown, text)
                }
            }
        };

        if response_option.include_cert_hash {
            if let Some(cert_hash) = info.cert_hash() {
                let value = self
                    .codec
                    .encode_cert_hash(cert_hash.algorithm, &cert_hash.value)
                    .map_err(|e| Rejection::internal(format!("could not encode cert hash: {e}")))?;
                extensions.push(Extension::new(oid::CERT_HASH, false, value));
            }
        }
        if let Some(cutoff) = info.archive_cutoff() {
            let value = self
                .codec
                .encode_time(cutoff)
                .map_err(|e| Rejection::internal(format!("could not encode archive cutoff: {e}")))?;
            extensions.push(Extension::new(oid::ARCHIVE_CUTOFF, false, value));
        }
        if let Some(crl_id) = info.crl_id() {
            let value = self
                .codec
                .encode_crl_id(crl_id)
                .map_err(|e| Rejection::internal(format!("could not encode CRL id: {e}")))?;
            extensions.push(Extension::new(oid::CRL_ID, false, value));
        }

        let this_update = info.this_update().unwrap_or(now);
        let next_update = info.next_update();
        control.merge_window(this_update, next_update);

        audit.add(KEY_STATUS, status_text);
        debug!(responder = %responder.name(), serial = %serial, status = status_text, "Resolved certificate status");

        Ok(SingleResponse {
            cert_id: entry.cert_id.clone(),
            cert_status,
            this_update,
            next_update,
            extensions,
        })
    }
}

fn accepted_hash_algorithm(option: &RequestOption, cert_id: &CertId) -> Outcome<HashAlgorithm> {
    let algorithm: HashAlgorithm = cert_id.hash_algorithm.parse().map_err(|_| {
        Rejection::malformed(format!(
            "unknown CertID.hashAlgorithm {}",
            cert_id.hash_algorithm
        ))
    })?;
    if !option.allows_hash_algorithm(algorithm) {
        return Err(Rejection::malformed(format!(
            "CertID.hashAlgorithm {algorithm} not allowed"
        )));
    }
    Ok(algorithm)
}

fn issuer_hash(cert_id: &CertId, algorithm: HashAlgorithm) -> IssuerHash {
    IssuerHash::new(
        algorithm,
        cert_id.issuer_name_hash.clone(),
        cert_id.issuer_key_hash.clone(),
    )
}

fn embedded_certs(
    mode: EmbedCertsMode,
    certificate: Option<&Certificate>,
    chain: &[Certificate],
) -> Vec<Vec<u8>> {
    let Some(certificate) = certificate else {
        return Vec::new();
    };
    match mode {
        EmbedCertsMode::None => Vec::new(),
        EmbedCertsMode::Signer => vec![certificate.encoded().to_vec()],
        EmbedCertsMode::SignerAndChain => std::iter::once(certificate)
            .chain(chain.iter())
            .map(|cert| cert.encoded().to_vec())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_window_takes_latest_this_update_and_earliest_next_update() {
        let now = Utc::now();
        let mut control = ResponseControl::new(true);
        control.merge_window(now - ChronoDuration::hours(2), Some(now + ChronoDuration::hours(3)));
        control.merge_window(now - ChronoDuration::hours(1), None);
        control.merge_window(now - ChronoDuration::hours(3), Some(now + ChronoDuration::hours(1)));

        assert_eq!(control.this_update, Some(now - ChronoDuration::hours(1)));
        assert_eq!(control.next_update, Some(now + ChronoDuration::hours(1)));
    }

    #[test]
    fn test_hash_algorithm_must_be_known_and_allowed() {
        let mut option = RequestOption::new("req");
        option.hash_algorithms = [HashAlgorithm::Sha256].into_iter().collect();
        let mut cert_id = CertId::new(
            HashAlgorithm::Sha1,
            vec![0; 20],
            vec![0; 20],
            ocsp_api::SerialNumber::from_u64(1),
        );
        assert_eq!(
            accepted_hash_algorithm(&option, &cert_id).unwrap_err().status,
            OcspResponseStatus::MalformedRequest
        );

        cert_id.hash_algorithm = "MD5".to_string();
        assert!(accepted_hash_algorithm(&option, &cert_id).is_err());

        cert_id.hash_algorithm = HashAlgorithm::Sha256.oid().to_string();
        assert_eq!(accepted_hash_algorithm(&option, &cert_id).unwrap(), HashAlgorithm::Sha256);
    }
}
