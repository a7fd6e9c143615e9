//! Start-up from a configuration file, path routing, health and shutdown.

mod common;

use audit_engine::{AuditSink, AuditStatus, MemoryAuditSink, EVENT_SHUTDOWN, EVENT_START};
use common::*;
use ocsp_api::{HashAlgorithm, StoreFactoryRegistry};
use ocsp_responder::codec::CertStatusValue;
use ocsp_responder::{DeliveryMode, JsonCodec, OcspResponseStatus, OcspServer, OcspServerConf, ResponderError};
use std::path::Path;
use std::sync::Arc;

fn write_conf(dir: &Path, ca_file: &Path, with_cache: bool) -> std::path::PathBuf {
    let cache = if with_cache {
        r#""response_cache": {"backend": "memory", "maintenance_interval_seconds": 3600},"#
    } else {
        ""
    };
    let conf = format!(
        r#"{{
            "master": true,
            {cache}
            "responders": [
                {{
                    "name": "primary",
                    "servlet_paths": ["/ocsp"],
                    "signer": "mac",
                    "request_option": "default",
                    "response_option": "plain",
                    "stores": ["ca1"],
                    "audit_option": "labels"
                }},
                {{
                    "name": "legacy",
                    "servlet_paths": ["/ocsp/legacy"],
                    "mode": "RFC2560",
                    "signer": "mac",
                    "request_option": "default",
                    "response_option": "plain",
                    "stores": ["ca1"]
                }}
            ],
            "signers": [{{
                "name": "mac",
                "keys": [{{"algorithm": "HmacSHA256", "key": {{"value": "c2hhcmVkLXNlY3JldA=="}}}}]
            }}],
            "request_options": [{{"name": "default", "nonce": {{"occurrence": "optional"}}}}],
            "response_options": [{{"name": "plain", "embed_certs_mode": "none"}}],
            "audit_options": [{{"name": "labels", "certprofile_mapping": {{"tls": "TLS server"}}}}],
            "stores": [{{
                "name": "ca1",
                "type": "memory",
                "conf": {{
                    "update_interval_seconds": 3600,
                    "issuers": [{{
                        "cert_file": "{ca}",
                        "certs": [
                            {{"serial": "01", "certprofile": "tls"}},
                            {{"serial": "02", "revocation": {{"reason": "keyCompromise", "revocation_time": "2024-01-01T00:00:00Z"}}}}
                        ]
                    }}]
                }}
            }}]
        }}"#,
        ca = ca_file.display()
    );
    let path = dir.join("ocsp-responder.json");
    std::fs::write(&path, conf).unwrap();
    path
}

fn ca_file(dir: &Path, ca: &Identity) -> std::path::PathBuf {
    let path = dir.join("ca.der");
    std::fs::write(&path, ca.cert.encoded()).unwrap();
    path
}

async fn start(conf_path: &Path, audit: &Arc<MemoryAuditSink>) -> OcspServer {
    let conf = OcspServerConf::load(conf_path).unwrap();
    let sink: Arc<dyn AuditSink> = audit.clone();
    OcspServer::start(
        &conf,
        &StoreFactoryRegistry::with_builtin(),
        Arc::new(JsonCodec::new()),
        Some(sink),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_start_answer_and_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let ca = self_signed("Configured CA", true);
    let conf_path = write_conf(dir.path(), &ca_file(dir.path(), &ca), false);
    let audit = Arc::new(MemoryAuditSink::new());
    let server = start(&conf_path, &audit).await;

    assert_eq!(server.responders().len(), 2);
    assert_eq!(server.responder_for_path("/ocsp/legacy/xyz").map(|r| r.name()), Some("legacy"));
    assert_eq!(server.responder_for_path("/ocsp/xyz").map(|r| r.name()), Some("primary"));
    assert!(server.responder_for_path("/other").is_none());

    let good = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha256)], vec![]));
    let answer = server.answer("/ocsp", &good, DeliveryMode::Post).await.unwrap();
    let response = decode(&answer.response);
    assert_eq!(response.status, OcspResponseStatus::Successful);
    let basic = response.basic.unwrap();
    assert_eq!(basic.signature_algorithm, "HmacSHA256");
    assert!(basic.certs.is_empty());
    assert_eq!(basic.tbs_response_data.responses[0].cert_status, CertStatusValue::Good);

    let revoked = encode(&request(vec![cert_id(&ca.cert, 2, HashAlgorithm::Sha256)], vec![]));
    let answer = server.answer("/ocsp/legacy", &revoked, DeliveryMode::Post).await.unwrap();
    let basic = decode(&answer.response).basic.unwrap();
    assert!(matches!(
        basic.tbs_response_data.responses[0].cert_status,
        CertStatusValue::Revoked { .. }
    ));

    assert!(server.answer("/nowhere", &good, DeliveryMode::Post).await.is_none());

    let health = server.health().await;
    assert!(health.healthy);
    assert_eq!(health.children.len(), 2);

    server.shutdown().await;

    let events = audit.events();
    assert_eq!(events.first().map(|e| e.name.as_str()), Some(EVENT_START));
    assert_eq!(events.last().map(|e| e.name.as_str()), Some(EVENT_SHUTDOWN));
    let primary = events.iter().find(|e| e.name == "primary").unwrap();
    assert_eq!(primary.children[0].data_str(audit_engine::KEY_TYPE), Some("TLS server"));
}

#[tokio::test]
async fn test_cache_configured_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let ca = self_signed("Cached CA", true);
    let conf_path = write_conf(dir.path(), &ca_file(dir.path(), &ca), true);
    let server = start(&conf_path, &Arc::new(MemoryAuditSink::new())).await;

    let cache = server.engine().cache().unwrap();
    assert!(cache.is_on_service());
    assert!(cache.is_master());

    let bytes = encode(&request(vec![cert_id(&ca.cert, 1, HashAlgorithm::Sha1)], vec![]));
    let first = server.answer("/ocsp", &bytes, DeliveryMode::Get).await.unwrap();
    assert!(first.cache_info.is_some());
    assert!(cache.issuer_id(&ca.cert.issuer_hash(HashAlgorithm::Sha1)).is_some());

    let second = server.answer("/ocsp", &bytes, DeliveryMode::Get).await.unwrap();
    assert_eq!(first.response, second.response);

    let health = server.health().await;
    assert_eq!(health.children.len(), 3);
    server.shutdown().await;
}

#[tokio::test]
async fn test_start_fails_on_missing_certificate_file() {
    let dir = tempfile::tempdir().unwrap();
    let conf_path = write_conf(dir.path(), &dir.path().join("missing.der"), false);
    let conf = OcspServerConf::load(&conf_path).unwrap();
    let audit = Arc::new(MemoryAuditSink::new());
    let sink: Arc<dyn AuditSink> = audit.clone();

    let result = OcspServer::start(
        &conf,
        &StoreFactoryRegistry::with_builtin(),
        Arc::new(JsonCodec::new()),
        Some(sink),
    )
    .await;
    assert!(matches!(result, Err(ResponderError::Store(_))));

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, EVENT_START);
    assert_eq!(events[0].status, AuditStatus::Failed);
}
