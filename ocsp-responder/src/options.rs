use ocsp_api::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::trust::TrustPolicy;

pub const DEFAULT_NONCE_MIN_LEN: usize = 4;
pub const DEFAULT_NONCE_MAX_LEN: usize = 32;
pub const DEFAULT_MAX_REQUEST_LIST_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceOccurrence {
    Forbidden,
    #[default]
    Optional,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoncePolicy {
    #[serde(default)]
    pub occurrence: NonceOccurrence,
    #[serde(default = "default_nonce_min_len")]
    pub min_len: usize,
    #[serde(default = "default_nonce_max_len")]
    pub max_len: usize,
}

fn default_nonce_min_len() -> usize {
    DEFAULT_NONCE_MIN_LEN
}

fn default_nonce_max_len() -> usize {
    DEFAULT_NONCE_MAX_LEN
}

impl Default for NoncePolicy {
    fn default() -> Self {
        Self {
            occurrence: NonceOccurrence::Optional,
            min_len: DEFAULT_NONCE_MIN_LEN,
            max_len: DEFAULT_NONCE_MAX_LEN,
        }
    }
}

impl NoncePolicy {
    /// Checks the nonce of a request, returning the rejection reason.
    ///
    /// # Errors
    /// Returns a human-readable reason when the nonce violates the policy.
    pub fn check(&self, nonce: Option<&[u8]>) -> Result<(), String> {
        match (nonce, self.occurrence) {
            (Some(_), NonceOccurrence::Forbidden) => {
                Err("nonce forbidden, but is present in the request".to_string())
            }
            (None, NonceOccurrence::Required) => {
                Err("nonce required, but is not present in the request".to_string())
            }
            (Some(value), _) if value.len() < self.min_len || value.len() > self.max_len => {
                Err(format!(
                    "length of nonce {} not within [{}, {}]",
                    value.len(),
                    self.min_len,
                    self.max_len
                ))
            }
            _ => Ok(()),
        }
    }
}

/// How a request is validated before it is answered.
#[derive(Debug, Clone)]
pub struct RequestOption {
    pub name: String,
    pub versions: BTreeSet<u8>,
    pub nonce: NoncePolicy,
    pub max_request_list_count: usize,
    pub hash_algorithms: BTreeSet<HashAlgorithm>,
    pub signature_required: bool,
    pub validate_signature: bool,
    pub trust: TrustPolicy,
}

impl RequestOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: [0].into_iter().collect(),
            nonce: NoncePolicy::default(),
            max_request_list_count: DEFAULT_MAX_REQUEST_LIST_COUNT,
            hash_algorithms: HashAlgorithm::DEFAULT_REQUEST.into_iter().collect(),
            signature_required: false,
            validate_signature: true,
            trust: TrustPolicy::default(),
        }
    }

    pub fn is_version_allowed(&self, version: u8) -> bool {
        self.versions.contains(&version)
    }

    pub fn allows_hash_algorithm(&self, algorithm: HashAlgorithm) -> bool {
        self.hash_algorithms.contains(&algorithm)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedCertsMode {
    None,
    #[default]
    Signer,
    SignerAndChain,
}

/// How a response is shaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOption {
    #[serde(default)]
    pub responder_id_by_name: bool,
    #[serde(default)]
    pub embed_certs_mode: EmbedCertsMode,
    #[serde(default)]
    pub include_cert_hash: bool,
    /// Fixed cert-hash algorithm; the CertID algorithm is used when absent.
    #[serde(default)]
    pub cert_hash_algorithm: Option<HashAlgorithm>,
    #[serde(default = "default_true")]
    pub include_rev_reason: bool,
    #[serde(default)]
    pub include_invalidity_date: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ResponseOption {
    fn default() -> Self {
        Self {
            responder_id_by_name: false,
            embed_certs_mode: EmbedCertsMode::Signer,
            include_cert_hash: false,
            cert_hash_algorithm: None,
            include_rev_reason: true,
            include_invalidity_date: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcspMode {
    #[serde(rename = "RFC2560", alias = "rfc2560")]
    Rfc2560,
    #[default]
    #[serde(rename = "RFC6960", alias = "rfc6960")]
    Rfc6960,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponderOption {
    pub mode: OcspMode,
    pub inherit_ca_revocation: bool,
    /// Overrides the mode's default for preferred-signature-algorithm handling.
    pub negotiate_signature_algorithm: Option<bool>,
}

impl ResponderOption {
    pub fn negotiates_signature_algorithm(&self) -> bool {
        self.negotiate_signature_algorithm
            .unwrap_or(self.mode != OcspMode::Rfc2560)
    }

    /// Whether UNKNOWN answers are sent as revoked plus the extended-revoke marker.
    pub fn uses_extended_revoke(&self) -> bool {
        self.mode != OcspMode::Rfc2560
    }
}
