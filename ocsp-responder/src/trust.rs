//! Requestor signature verification and certification path validation.

use chrono::{DateTime, Utc};
use ocsp_api::Certificate;
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Longest path ever built from a requestor certificate.
const MAX_PATH_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertpathValidationModel {
    /// Every certificate on the path must be valid now.
    #[default]
    Pkix,
    /// Only the shape of the chain is checked.
    Chain,
}

#[derive(Debug, Clone, Default)]
pub struct TrustPolicy {
    pub trust_anchors: Vec<Certificate>,
    /// Intermediates used for path building besides those in the request.
    pub certs: Vec<Certificate>,
    pub model: CertpathValidationModel,
}

impl TrustPolicy {
    pub fn new(
        trust_anchors: Vec<Certificate>,
        certs: Vec<Certificate>,
        model: CertpathValidationModel,
    ) -> Self {
        Self {
            trust_anchors,
            certs,
            model,
        }
    }

    /// Whether `target` chains up to a configured trust anchor.
    ///
    /// `request_certs` are the extra certificates shipped with the request.
    pub fn can_build_certpath(
        &self,
        target: &Certificate,
        request_certs: &[Certificate],
        now: DateTime<Utc>,
    ) -> bool {
        let pool: Vec<&Certificate> = request_certs
            .iter()
            .chain(self.certs.iter())
            .chain(self.trust_anchors.iter())
            .collect();
        let path = build_cert_path(target, &pool);

        if self.model == CertpathValidationModel::Pkix
            && !path.iter().all(|cert| cert.is_valid_at(now))
        {
            debug!(subject = %target.subject(), "Certificate path contains a certificate outside its validity period");
            return false;
        }

        let anchored = path
            .iter()
            .rev()
            .any(|cert| self.trust_anchors.iter().any(|anchor| anchor == cert));
        if !anchored {
            debug!(subject = %target.subject(), path_len = path.len(), "Certificate path does not end at a trust anchor");
        }
        anchored
    }
}

/// Builds the path from `target` towards a root.
///
/// A pool certificate becomes the next link only when its key verifies the
/// signature of the current one.
pub fn build_cert_path(target: &Certificate, pool: &[&Certificate]) -> Vec<Certificate> {
    let mut path = vec![target.clone()];
    while path.len() < MAX_PATH_LEN {
        let Some(current) = path.last() else {
            break;
        };
        if current.is_self_issued() {
            break;
        }
        let issuer = pool
            .iter()
            .copied()
            .find(|candidate| current.is_issued_by(candidate) && !path.contains(*candidate))
            .cloned();
        match issuer {
            Some(issuer) => path.push(issuer),
            None => break,
        }
    }
    path
}

fn verification_algorithm(name: &str) -> Option<&'static dyn VerificationAlgorithm> {
    let normalized: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_uppercase();
    match normalized.as_str() {
        "ED25519" => Some(&signature::ED25519),
        "SHA256WITHECDSA" | "ECDSAP256SHA256" => Some(&signature::ECDSA_P256_SHA256_ASN1),
        "SHA384WITHECDSA" | "ECDSAP384SHA384" => Some(&signature::ECDSA_P384_SHA384_ASN1),
        "SHA256WITHRSA" => Some(&signature::RSA_PKCS1_2048_8192_SHA256),
        "SHA384WITHRSA" => Some(&signature::RSA_PKCS1_2048_8192_SHA384),
        "SHA512WITHRSA" => Some(&signature::RSA_PKCS1_2048_8192_SHA512),
        _ => None,
    }
}

/// Verifies `signature` over `data` with the public key of `signer`.
pub fn verify_signature(
    algorithm: &str,
    signer: &Certificate,
    data: &[u8],
    signature: &[u8],
) -> bool {
    let Some(algorithm) = verification_algorithm(algorithm) else {
        debug!(algorithm = %algorithm, "Unsupported request signature algorithm");
        return false;
    };
    UnparsedPublicKey::new(algorithm, signer.public_key())
        .verify(data, signature)
        .is_ok()
}
