//! End-to-end scenarios for the request-answering engine.
//!
//! Every test goes through `OcspEngine::answer` with encoded requests and
//! decodes the bytes it returns, the way a transport would.

mod common;

use audit_engine::{AuditStatus, MemoryAuditSink, KEY_STATUS};
use chrono::{Duration, Utc};
use common::*;
use ocsp_api::{CrlReason, HashAlgorithm, RevocationInfo, StatusStore, StoreSettings};
use ocsp_responder::codec::{oid, CertStatusValue, Extension, DER_NULL};
use ocsp_responder::options::NonceOccurrence;
use ocsp_responder::trust::{CertpathValidationModel, TrustPolicy};
use ocsp_responder::{
    DeliveryMode, JsonCodec, OcspCodec, OcspMode, OcspResponseStatus, RequestOption,
    ResponderOption, ResponseOption,
};
use std::sync::Arc;

fn rfc6960() -> ResponderOption {
    ResponderOption {
        mode: OcspMode::Rfc6960,
        ..ResponderOption::default()
    }
}

#[tokio::test]
async fn test_scenario_a_too_many_entries_is_malformed() {
    let ca = self_signed("Scenario A CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    add_good(&store, &ca.cert, 1).await;
    add_good(&store, &ca.cert, 2).await;

    let mut request_option = RequestOption::new("req");
    request_option.max_request_list_count = 1;
    let responder = responder(vec![store], request_option, ResponseOption::default(), rfc6960());
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = engine(None, &audit);

    let request = request(
        vec![
            cert_id(&ca.cert, 1, HashAlgorithm::Sha256),
            cert_id(&ca.cert, 2, HashAlgorithm::Sha256),
        ],
        vec![],
    );
    let answer = engine.answer(&responder, &encode(&request), DeliveryMode::Post).await;

    let response = decode(&answer.response);
    assert_eq!(response.status, OcspResponseStatus::MalformedRequest);
    assert!(response.basic.is_none());
    assert!(answer.cache_info.is_none());

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, AuditStatus::Failed);
}

#[tokio::test]
async fn test_scenario_b_invalid_signature_is_unauthorized_unless_validation_disabled() {
    let ca = self_signed("Scenario B CA", true);
    let requestor = self_signed("Requestor", false);
    let store = memory_store("mem", &ca.cert, None).await;
    add_good(&store, &ca.cert, 7).await;

    let mut request = request(vec![cert_id(&ca.cert, 7, HashAlgorithm::Sha256)], vec![]);
    sign(&mut request, &requestor, true);
    let bytes = encode(&request);

    let mut validating = RequestOption::new("req");
    validating.trust = TrustPolicy::new(vec![requestor.cert.clone()], vec![], CertpathValidationModel::Pkix);
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = engine(None, &audit);

    let strict = responder(vec![store.clone()], validating.clone(), ResponseOption::default(), rfc6960());
    let answer = engine.answer(&strict, &bytes, DeliveryMode::Post).await;
    assert_eq!(decode(&answer.response).status, OcspResponseStatus::Unauthorized);

    let mut lenient_option = validating;
    lenient_option.validate_signature = false;
    let lenient = responder(vec![store], lenient_option, ResponseOption::default(), rfc6960());
    let answer = engine.answer(&lenient, &bytes, DeliveryMode::Post).await;
    let response = decode(&answer.response);
    assert_eq!(response.status, OcspResponseStatus::Successful);
    let basic = response.basic.unwrap();
    assert_eq!(basic.tbs_response_data.responses[0].cert_status, CertStatusValue::Good);
}

#[tokio::test]
async fn test_valid_signature_needs_trusted_certpath() {
    let ca = self_signed("Signed CA", true);
    let requestor = self_signed("Requestor", false);
    let stranger = self_signed("Stranger", false);
    let store = memory_store("mem", &ca.cert, None).await;
    add_good(&store, &ca.cert, 7).await;

    let mut request = request(vec![cert_id(&ca.cert, 7, HashAlgorithm::Sha256)], vec![]);
    sign(&mut request, &requestor, false);
    let bytes = encode(&request);
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));

    let mut trusted = RequestOption::new("req");
    trusted.trust = TrustPolicy::new(vec![requestor.cert.clone()], vec![], CertpathValidationModel::Pkix);
    let ok = responder(vec![store.clone()], trusted, ResponseOption::default(), rfc6960());
    let answer = engine.answer(&ok, &bytes, DeliveryMode::Post).await;
    assert_eq!(decode(&answer.response).status, OcspResponseStatus::Successful);

    let mut untrusted = RequestOption::new("req");
    untrusted.trust = TrustPolicy::new(vec![stranger.cert], vec![], CertpathValidationModel::Pkix);
    let rejecting = responder(vec![store], untrusted, ResponseOption::default(), rfc6960());
    let answer = engine.answer(&rejecting, &bytes, DeliveryMode::Post).await;
    assert_eq!(decode(&answer.response).status, OcspResponseStatus::Unauthorized);
}

#[tokio::test]
async fn test_requestor_from_same_name_impostor_ca_is_unauthorized() {
    let ca = self_signed("Signed CA", true);
    let root = self_signed("Requestor Root", true);
    let impostor = self_signed("Requestor Root", true);
    let store = memory_store("mem", &ca.cert, None).await;
    add_good(&store, &ca.cert, 7).await;

    let mut option = RequestOption::new("req");
    option.trust = TrustPolicy::new(vec![root.cert.clone()], vec![], CertpathValidationModel::Pkix);
    let responder = responder(vec![store], option, ResponseOption::default(), rfc6960());
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));

    let genuine = issued("Requestor", &root);
    let mut request_by_genuine = request(vec![cert_id(&ca.cert, 7, HashAlgorithm::Sha256)], vec![]);
    sign(&mut request_by_genuine, &genuine, false);
    let answer = engine.answer(&responder, &encode(&request_by_genuine), DeliveryMode::Post).await;
    assert_eq!(decode(&answer.response).status, OcspResponseStatus::Successful);

    let forged = issued("Requestor", &impostor);
    let mut request_by_forged = request(vec![cert_id(&ca.cert, 7, HashAlgorithm::Sha256)], vec![]);
    sign(&mut request_by_forged, &forged, false);
    let answer = engine.answer(&responder, &encode(&request_by_forged), DeliveryMode::Post).await;
    assert_eq!(decode(&answer.response).status, OcspResponseStatus::Unauthorized);
}

#[tokio::test]
async fn test_missing_required_signature() {
    let ca = self_signed("Sig CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    let mut option = RequestOption::new("req");
    option.signature_required = true;
    let responder = responder(vec![store], option, ResponseOption::default(), rfc6960());
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));

    let request = request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![]);
    let answer = engine.answer(&responder, &encode(&request), DeliveryMode::Post).await;
    assert_eq!(decode(&answer.response).status, OcspResponseStatus::SigRequired);
}

#[tokio::test]
async fn test_scenario_c_cached_response_is_served_without_stores() {
    let ca = self_signed("Scenario C CA", true);
    let memory = memory_store("mem", &ca.cert, None).await;
    add_good(&memory, &ca.cert, 42).await;
    let counting = Arc::new(CountingStore::new(memory));

    let (cache, backend) = master_cache().await;
    let responder = responder(
        vec![counting.clone()],
        RequestOption::new("req"),
        ResponseOption::default(),
        rfc6960(),
    );
    let engine = engine(Some(cache), &Arc::new(MemoryAuditSink::new()));
    let bytes = encode(&request(vec![cert_id(&ca.cert, 42, HashAlgorithm::Sha1)], vec![]));

    let first = engine.answer(&responder, &bytes, DeliveryMode::Get).await;
    let response = decode(&first.response);
    assert_eq!(response.status, OcspResponseStatus::Successful);
    let single = &response.basic.as_ref().unwrap().tbs_response_data.responses[0];
    let next_update = single.next_update.unwrap();
    assert_eq!(next_update - single.this_update, Duration::hours(1));

    let cache_info = first.cache_info.unwrap();
    assert_eq!(cache_info.this_update, single.this_update);
    assert_eq!(cache_info.next_update, Some(next_update));
    assert_eq!(counting.calls(), 1);
    assert_eq!(backend.response_count(), 1);

    let second = engine.answer(&responder, &bytes, DeliveryMode::Get).await;
    assert_eq!(second.response, first.response);
    assert_eq!(second.cache_info, first.cache_info);
    assert_eq!(counting.calls(), 1, "cache hit must not consult the stores");

    // POST gets the same bytes but no freshness metadata.
    let posted = engine.answer(&responder, &bytes, DeliveryMode::Post).await;
    assert_eq!(posted.response, first.response);
    assert!(posted.cache_info.is_none());
}

#[tokio::test]
async fn test_scenario_d_unknown_issuer_is_not_cached() {
    let ca = self_signed("Known CA", true);
    let foreign = self_signed("Foreign CA", true);
    let store = memory_store("mem", &ca.cert, None).await;

    let (cache, backend) = master_cache().await;
    let responder = responder(vec![store], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let engine = engine(Some(cache.clone()), &Arc::new(MemoryAuditSink::new()));
    let query = cert_id(&foreign.cert, 5, HashAlgorithm::Sha256);
    let bytes = encode(&request(vec![query], vec![]));

    let answer = engine.answer(&responder, &bytes, DeliveryMode::Get).await;
    let response = decode(&answer.response);
    assert_eq!(response.status, OcspResponseStatus::Successful);
    let basic = response.basic.unwrap();
    assert_eq!(basic.tbs_response_data.responses[0].cert_status, CertStatusValue::Unknown);
    assert!(basic.tbs_response_data.extensions.is_empty());

    assert!(answer.cache_info.is_none());
    assert_eq!(backend.response_count(), 0);
    assert!(cache.issuer_id(&foreign.cert.issuer_hash(HashAlgorithm::Sha256)).is_none());
}

#[tokio::test]
async fn test_scenario_e_all_stores_failing_is_try_later() {
    let ca = self_signed("Scenario E CA", true);
    let responder = responder(
        vec![Arc::new(FailingStore::new("db1")), Arc::new(FailingStore::new("db2"))],
        RequestOption::new("req"),
        ResponseOption::default(),
        rfc6960(),
    );
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = engine(None, &audit);
    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![]));

    let answer = engine.answer(&responder, &bytes, DeliveryMode::Post).await;
    let response = decode(&answer.response);
    assert_eq!(response.status, OcspResponseStatus::TryLater);
    assert!(response.basic.is_none());

    let events = audit.events();
    assert_eq!(events[0].status, AuditStatus::Failed);
    assert_eq!(events[0].children.len(), 1);
    assert_eq!(events[0].children[0].status, AuditStatus::Failed);
}

#[tokio::test]
async fn test_failing_store_is_outvoted_by_a_later_store() {
    let ca = self_signed("Vote CA", true);
    let memory = memory_store("mem", &ca.cert, None).await;
    add_good(&memory, &ca.cert, 3).await;
    let stores: Vec<Arc<dyn StatusStore>> = vec![Arc::new(FailingStore::new("db1")), memory];
    let responder = responder(stores, RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));

    let bytes = encode(&request(vec![cert_id(&ca.cert, 3, HashAlgorithm::Sha256)], vec![]));
    let response = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response);
    assert_eq!(response.status, OcspResponseStatus::Successful);
    assert_eq!(
        response.basic.unwrap().tbs_response_data.responses[0].cert_status,
        CertStatusValue::Good
    );
}

#[tokio::test]
async fn test_nonce_is_echoed_and_disables_caching() {
    let ca = self_signed("Nonce CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    add_good(&store, &ca.cert, 9).await;
    let (cache, backend) = master_cache().await;
    let responder = responder(vec![store], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let engine = engine(Some(cache), &Arc::new(MemoryAuditSink::new()));

    let nonce = Extension::new(oid::NONCE, false, vec![0xAB; 16]);
    let bytes = encode(&request(vec![cert_id(&ca.cert, 9, HashAlgorithm::Sha256)], vec![nonce.clone()]));
    let answer = engine.answer(&responder, &bytes, DeliveryMode::Get).await;

    let response = decode(&answer.response);
    assert_eq!(response.status, OcspResponseStatus::Successful);
    assert_eq!(response.basic.unwrap().tbs_response_data.extensions, vec![nonce]);
    assert!(answer.cache_info.is_none());
    assert_eq!(backend.response_count(), 0);
}

#[tokio::test]
async fn test_nonce_policy_violations_are_malformed() {
    let ca = self_signed("Nonce Policy CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));
    let entry = || cert_id(&ca.cert, 1, HashAlgorithm::Sha256);

    let optional = responder(vec![store.clone()], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    for len in [1, 3, 33, 64] {
        let nonce = Extension::new(oid::NONCE, false, vec![1; len]);
        let bytes = encode(&request(vec![entry()], vec![nonce]));
        let status = decode(&engine.answer(&optional, &bytes, DeliveryMode::Post).await.response).status;
        assert_eq!(status, OcspResponseStatus::MalformedRequest, "nonce of {len} bytes");
    }

    let mut required_option = RequestOption::new("req");
    required_option.nonce.occurrence = NonceOccurrence::Required;
    let required = responder(vec![store.clone()], required_option, ResponseOption::default(), rfc6960());
    let bytes = encode(&request(vec![entry()], vec![]));
    let status = decode(&engine.answer(&required, &bytes, DeliveryMode::Post).await.response).status;
    assert_eq!(status, OcspResponseStatus::MalformedRequest);

    let mut forbidden_option = RequestOption::new("req");
    forbidden_option.nonce.occurrence = NonceOccurrence::Forbidden;
    let forbidden = responder(vec![store], forbidden_option, ResponseOption::default(), rfc6960());
    let nonce = Extension::new(oid::NONCE, false, vec![1; 8]);
    let bytes = encode(&request(vec![entry()], vec![nonce]));
    let status = decode(&engine.answer(&forbidden, &bytes, DeliveryMode::Post).await.response).status;
    assert_eq!(status, OcspResponseStatus::MalformedRequest);
}

#[tokio::test]
async fn test_unknown_serial_uses_extended_revoke_and_is_not_cached() {
    let ca = self_signed("Unknown Serial CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    let (cache, backend) = master_cache().await;
    let engine = engine(Some(cache), &Arc::new(MemoryAuditSink::new()));
    let bytes = encode(&request(vec![cert_id(&ca.cert, 404, HashAlgorithm::Sha256)], vec![]));

    let extended = responder(vec![store.clone()], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let answer = engine.answer(&extended, &bytes, DeliveryMode::Get).await;
    let basic = decode(&answer.response).basic.unwrap();
    assert_eq!(
        basic.tbs_response_data.responses[0].cert_status,
        CertStatusValue::Revoked {
            revocation_time: chrono::DateTime::<Utc>::from(std::time::UNIX_EPOCH),
            reason: Some(CrlReason::CertificateHold.code()),
        }
    );
    assert_eq!(
        basic.tbs_response_data.extensions,
        vec![Extension::new(oid::EXTENDED_REVOKE, true, DER_NULL.to_vec())]
    );
    assert!(answer.cache_info.is_none());

    let legacy = responder(
        vec![store],
        RequestOption::new("req"),
        ResponseOption::default(),
        ResponderOption {
            mode: OcspMode::Rfc2560,
            ..ResponderOption::default()
        },
    );
    let answer = engine.answer(&legacy, &bytes, DeliveryMode::Get).await;
    let basic = decode(&answer.response).basic.unwrap();
    assert_eq!(basic.tbs_response_data.responses[0].cert_status, CertStatusValue::Unknown);
    assert!(basic.tbs_response_data.extensions.is_empty());

    assert_eq!(backend.response_count(), 0);
}

#[tokio::test]
async fn test_unknown_serial_as_good() {
    let ca = self_signed("Lenient CA", true);
    let mut settings = StoreSettings::new("mem");
    settings.unknown_serial_as_good = true;
    let store = memory_store("mem", &ca.cert, Some(settings)).await;
    let responder = responder(vec![store], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));

    let bytes = encode(&request(vec![cert_id(&ca.cert, 404, HashAlgorithm::Sha256)], vec![]));
    let basic = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response)
        .basic
        .unwrap();
    assert_eq!(basic.tbs_response_data.responses[0].cert_status, CertStatusValue::Good);
}

#[tokio::test]
async fn test_cache_entries_are_per_cert_hash_algorithm() {
    let ca = self_signed("Cert Hash CA", true);
    let leaf = issued("leaf.example", &ca);
    let mut settings = StoreSettings::new("mem");
    settings.cert_hash_algorithms = [HashAlgorithm::Sha1, HashAlgorithm::Sha256].into_iter().collect();
    let store = memory_store("mem", &ca.cert, Some(settings)).await;
    let serial = leaf.cert.serial();
    store
        .add_certificate(&ca.cert, serial.clone(), ocsp_api::MemoryCertEntry::from_certificate(leaf.cert.clone()))
        .await
        .unwrap();

    let (cache, backend) = master_cache().await;
    let response_option = ResponseOption {
        include_cert_hash: true,
        ..ResponseOption::default()
    };
    let responder = responder(vec![store], RequestOption::new("req"), response_option, rfc6960());
    let engine = engine(Some(cache), &Arc::new(MemoryAuditSink::new()));

    let mut answers = Vec::new();
    for algorithm in [HashAlgorithm::Sha1, HashAlgorithm::Sha256] {
        let hash = ca.cert.issuer_hash(algorithm);
        let id = ocsp_responder::codec::CertId::new(algorithm, hash.name_hash, hash.key_hash, serial.clone());
        let bytes = encode(&request(vec![id], vec![]));
        let answer = engine.answer(&responder, &bytes, DeliveryMode::Get).await;
        let basic = decode(&answer.response).basic.unwrap();
        let single = &basic.tbs_response_data.responses[0];
        assert_eq!(single.cert_status, CertStatusValue::Good);
        let cert_hash = single
            .extensions
            .iter()
            .find(|extension| extension.oid == oid::CERT_HASH)
            .unwrap();
        assert_eq!(
            cert_hash.value,
            JsonCodec::new()
                .encode_cert_hash(algorithm, &leaf.cert.fingerprint(algorithm))
                .unwrap()
        );
        answers.push(answer.response);
    }

    assert_eq!(backend.response_count(), 2);
    assert_ne!(answers[0], answers[1]);
}

#[tokio::test]
async fn test_revoked_entry_reports_reason_and_invalidity_date() {
    let ca = self_signed("Revoking CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    let revoked_at = Utc::now() - Duration::days(2);
    let invalid_since = revoked_at - Duration::days(5);
    add_revoked(
        &store,
        &ca.cert,
        11,
        RevocationInfo::new(CrlReason::KeyCompromise, revoked_at).with_invalidity_time(invalid_since),
    )
    .await;

    let response_option = ResponseOption {
        include_invalidity_date: true,
        ..ResponseOption::default()
    };
    let responder = responder(vec![store], RequestOption::new("req"), response_option, rfc6960());
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));
    let bytes = encode(&request(vec![cert_id(&ca.cert, 11, HashAlgorithm::Sha256)], vec![]));

    let basic = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response)
        .basic
        .unwrap();
    let single = &basic.tbs_response_data.responses[0];
    assert_eq!(
        single.cert_status,
        CertStatusValue::Revoked {
            revocation_time: revoked_at,
            reason: Some(CrlReason::KeyCompromise.code()),
        }
    );
    let invalidity = single
        .extensions
        .iter()
        .find(|extension| extension.oid == oid::INVALIDITY_DATE)
        .unwrap();
    assert_eq!(invalidity.value, JsonCodec::new().encode_time(invalid_since).unwrap());
}

#[tokio::test]
async fn test_ca_revocation_is_inherited() {
    let ca = self_signed("Compromised CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    add_good(&store, &ca.cert, 1).await;
    let ca_revoked_at = Utc::now() - Duration::days(1);
    store
        .revoke_issuer(&ca.cert, RevocationInfo::new(CrlReason::CaCompromise, ca_revoked_at))
        .await
        .unwrap();

    let option = ResponderOption {
        inherit_ca_revocation: true,
        ..rfc6960()
    };
    let responder = responder(vec![store], RequestOption::new("req"), ResponseOption::default(), option);
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));
    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![]));

    let basic = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response)
        .basic
        .unwrap();
    assert_eq!(
        basic.tbs_response_data.responses[0].cert_status,
        CertStatusValue::Revoked {
            revocation_time: ca_revoked_at,
            reason: Some(CrlReason::CaCompromise.code()),
        }
    );
}

#[tokio::test]
async fn test_unrecognized_critical_extension_is_malformed() {
    let ca = self_signed("Critical CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    let responder = responder(vec![store], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));

    let unknown = Extension::new("1.2.3.4.5", true, vec![1]);
    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![unknown]));
    let status = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response).status;
    assert_eq!(status, OcspResponseStatus::MalformedRequest);

    let harmless = Extension::new("1.2.3.4.5", false, vec![1]);
    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![harmless]));
    let status = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response).status;
    assert_eq!(status, OcspResponseStatus::Successful);
}

#[tokio::test]
async fn test_preferred_algorithms_fall_back_to_default_key() {
    let ca = self_signed("Preference CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    add_good(&store, &ca.cert, 1).await;
    let responder = responder(vec![store], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));
    let codec = JsonCodec::new();

    let unsupported = codec
        .encode_preferred_algorithms(&["SHA256withECDSA".to_string()])
        .unwrap();
    let preference = Extension::new(oid::PREFERRED_SIGNATURE_ALGORITHMS, true, unsupported);
    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![preference]));
    let response = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response);
    assert_eq!(response.status, OcspResponseStatus::Successful);
    assert_eq!(response.basic.unwrap().signature_algorithm, "Ed25519");

    let garbage = Extension::new(oid::PREFERRED_SIGNATURE_ALGORITHMS, false, b"not json".to_vec());
    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![garbage]));
    let status = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response).status;
    assert_eq!(status, OcspResponseStatus::MalformedRequest);
}

#[tokio::test]
async fn test_disallowed_cert_id_hash_is_malformed() {
    let ca = self_signed("Hash CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    let mut option = RequestOption::new("req");
    option.hash_algorithms = [HashAlgorithm::Sha256].into_iter().collect();
    let responder = responder(vec![store], option, ResponseOption::default(), rfc6960());
    let engine = engine(None, &Arc::new(MemoryAuditSink::new()));

    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha1)], vec![]));
    let status = decode(&engine.answer(&responder, &bytes, DeliveryMode::Post).await.response).status;
    assert_eq!(status, OcspResponseStatus::MalformedRequest);
}

#[tokio::test]
async fn test_garbage_and_panics_never_escape() {
    let ca = self_signed("Panic CA", true);
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = engine(None, &audit);

    let store = memory_store("mem", &ca.cert, None).await;
    let healthy = responder(vec![store], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let status = decode(&engine.answer(&healthy, b"\x30\x03garbage", DeliveryMode::Post).await.response).status;
    assert_eq!(status, OcspResponseStatus::MalformedRequest);

    let broken = responder(
        vec![Arc::new(PanickingStore::new())],
        RequestOption::new("req"),
        ResponseOption::default(),
        rfc6960(),
    );
    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![]));
    let status = decode(&engine.answer(&broken, &bytes, DeliveryMode::Post).await.response).status;
    assert_eq!(status, OcspResponseStatus::InternalError);
}

#[tokio::test]
async fn test_multi_entry_window_and_audit_children() {
    let ca = self_signed("Multi CA", true);
    let store = memory_store("mem", &ca.cert, None).await;
    add_good(&store, &ca.cert, 1).await;
    add_revoked(&store, &ca.cert, 2, RevocationInfo::new(CrlReason::Superseded, Utc::now())).await;

    let (cache, backend) = master_cache().await;
    let responder = responder(vec![store], RequestOption::new("req"), ResponseOption::default(), rfc6960());
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = engine(Some(cache), &audit);
    let bytes = encode(&request(
        vec![
            cert_id(&ca.cert, 1, HashAlgorithm::Sha256),
            cert_id(&ca.cert, 2, HashAlgorithm::Sha256),
        ],
        vec![],
    ));

    let answer = engine.answer(&responder, &bytes, DeliveryMode::Get).await;
    let basic = decode(&answer.response).basic.unwrap();
    assert_eq!(basic.tbs_response_data.responses.len(), 2);
    // Multi-entry requests bypass the cache entirely.
    assert_eq!(backend.response_count(), 0);

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, AuditStatus::Successful);
    let statuses: Vec<_> = events[0]
        .children
        .iter()
        .map(|child| child.data_str(KEY_STATUS).unwrap_or_default().to_string())
        .collect();
    assert_eq!(statuses, vec!["good".to_string(), "revoked".to_string()]);
}
