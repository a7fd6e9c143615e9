//! Response signing keys.
//!
//! A [`ConcurrentSigner`] wraps one key together with a fixed number of
//! signing slots. Slots are taken without waiting: when all are busy the
//! caller gets [`SignerError::NoIdleSigner`] and answers TRY_LATER instead of
//! queueing.

use ocsp_api::{Certificate, HashAlgorithm};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, Ed25519KeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use ring::hmac;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::codec::ResponderIdValue;
use crate::error::SignerError;

pub const DEFAULT_SIGNER_PARALLELISM: usize = 16;

const HEALTH_CHECK_DATA: &[u8] = b"ocsp-responder health check";
const MAC_KEY_ID_LABEL: &[u8] = b"ocsp-responder key id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignatureAlgorithm {
    Ed25519,
    EcdsaP256Sha256,
    HmacSha256,
}

impl SignatureAlgorithm {
    /// Stable numeric code, part of response-cache keys.
    pub fn code(self) -> u8 {
        match self {
            SignatureAlgorithm::Ed25519 => 1,
            SignatureAlgorithm::EcdsaP256Sha256 => 2,
            SignatureAlgorithm::HmacSha256 => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SignatureAlgorithm::Ed25519 => "Ed25519",
            SignatureAlgorithm::EcdsaP256Sha256 => "SHA256withECDSA",
            SignatureAlgorithm::HmacSha256 => "HmacSHA256",
        }
    }

    pub fn is_mac(self) -> bool {
        self == SignatureAlgorithm::HmacSha256
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "ED25519" => Ok(SignatureAlgorithm::Ed25519),
            "SHA256WITHECDSA" | "ECDSAP256SHA256" => Ok(SignatureAlgorithm::EcdsaP256Sha256),
            "HMACSHA256" => Ok(SignatureAlgorithm::HmacSha256),
            _ => Err(format!("unsupported signature algorithm: {s}")),
        }
    }
}

impl TryFrom<String> for SignatureAlgorithm {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignatureAlgorithm> for String {
    fn from(value: SignatureAlgorithm) -> Self {
        value.name().to_string()
    }
}

enum KeyMaterial {
    Ed25519(Ed25519KeyPair),
    EcdsaP256(EcdsaKeyPair),
    Hmac(hmac::Key),
}

/// One signing key with bounded parallelism.
pub struct ConcurrentSigner {
    algorithm: SignatureAlgorithm,
    key: KeyMaterial,
    rng: SystemRandom,
    permits: Semaphore,
    parallelism: usize,
}

impl ConcurrentSigner {
    /// Builds a signer from PKCS#8 key bytes, or a raw secret for HMAC.
    ///
    /// # Errors
    /// Returns an error when the key does not match the algorithm or
    /// `parallelism` is zero.
    pub fn new(
        algorithm: SignatureAlgorithm,
        key_bytes: &[u8],
        parallelism: usize,
    ) -> Result<Self, SignerError> {
        if parallelism == 0 {
            return Err(SignerError::Configuration("parallelism must be at least 1".to_string()));
        }
        let rng = SystemRandom::new();
        let key = match algorithm {
            SignatureAlgorithm::Ed25519 => KeyMaterial::Ed25519(
                Ed25519KeyPair::from_pkcs8_maybe_unchecked(key_bytes)
                    .map_err(|e| SignerError::InvalidKey(e.to_string()))?,
            ),
            SignatureAlgorithm::EcdsaP256Sha256 => KeyMaterial::EcdsaP256(
                EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, key_bytes, &rng)
                    .map_err(|e| SignerError::InvalidKey(e.to_string()))?,
            ),
            SignatureAlgorithm::HmacSha256 => {
                if key_bytes.is_empty() {
                    return Err(SignerError::InvalidKey("empty HMAC secret".to_string()));
                }
                KeyMaterial::Hmac(hmac::Key::new(hmac::HMAC_SHA256, key_bytes))
            }
        };
        Ok(Self {
            algorithm,
            key,
            rng,
            permits: Semaphore::new(parallelism),
            parallelism,
        })
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Raw public key, `None` for MAC keys.
    pub fn public_key(&self) -> Option<&[u8]> {
        match &self.key {
            KeyMaterial::Ed25519(key) => Some(key.public_key().as_ref()),
            KeyMaterial::EcdsaP256(key) => Some(key.public_key().as_ref()),
            KeyMaterial::Hmac(_) => None,
        }
    }

    /// Bytes identifying the key without revealing secret material.
    pub fn key_identifier(&self) -> Vec<u8> {
        match &self.key {
            KeyMaterial::Hmac(key) => hmac::sign(key, MAC_KEY_ID_LABEL).as_ref().to_vec(),
            _ => self.public_key().map(<[u8]>::to_vec).unwrap_or_default(),
        }
    }

    /// # Errors
    /// Returns [`SignerError::NoIdleSigner`] when every slot is busy.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignerError> {
        let _permit = self
            .permits
            .try_acquire()
            .map_err(|_| SignerError::NoIdleSigner)?;
        match &self.key {
            KeyMaterial::Ed25519(key) => Ok(key.sign(data).as_ref().to_vec()),
            KeyMaterial::EcdsaP256(key) => key
                .sign(&self.rng, data)
                .map(|signature| signature.as_ref().to_vec())
                .map_err(|e| SignerError::SigningFailed(e.to_string())),
            KeyMaterial::Hmac(key) => Ok(hmac::sign(key, data).as_ref().to_vec()),
        }
    }

    /// A key is healthy when it can sign; being busy is not a failure.
    pub fn is_healthy(&self) -> bool {
        matches!(self.sign(HEALTH_CHECK_DATA), Ok(_) | Err(SignerError::NoIdleSigner))
    }
}

impl fmt::Debug for ConcurrentSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentSigner")
            .field("algorithm", &self.algorithm)
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

/// All keys of one responder plus the certificate they certify.
#[derive(Debug)]
pub struct ResponderSigner {
    name: String,
    default_signer: Arc<ConcurrentSigner>,
    signers: Vec<Arc<ConcurrentSigner>>,
    certificate: Option<Certificate>,
    chain: Vec<Certificate>,
    key_hash: Vec<u8>,
}

impl ResponderSigner {
    /// The first signer is the default.
    ///
    /// # Errors
    /// Returns an error for an empty key list, a mix of MAC and public-key
    /// signers, a public-key signer without certificate, a MAC signer with
    /// one, or a key that does not match the certificate.
    pub fn new(
        name: impl Into<String>,
        signers: Vec<Arc<ConcurrentSigner>>,
        certificate: Option<Certificate>,
        chain: Vec<Certificate>,
    ) -> Result<Self, SignerError> {
        let name = name.into();
        let default_signer = signers
            .first()
            .cloned()
            .ok_or_else(|| SignerError::Configuration(format!("signer {name} has no keys")))?;

        let mac = default_signer.algorithm().is_mac();
        if signers.iter().any(|signer| signer.algorithm().is_mac() != mac) {
            return Err(SignerError::Configuration(format!(
                "signer {name} mixes MAC and public-key algorithms"
            )));
        }

        let key_hash = match (&certificate, mac) {
            (Some(_), true) => {
                return Err(SignerError::Configuration(format!(
                    "MAC signer {name} cannot carry a certificate"
                )))
            }
            (None, false) => {
                return Err(SignerError::Configuration(format!(
                    "signer {name} needs a certificate"
                )))
            }
            (Some(cert), false) => {
                if let Some(signer) = signers
                    .iter()
                    .find(|signer| signer.public_key() != Some(cert.public_key()))
                {
                    return Err(SignerError::InvalidKey(format!(
                        "{} key of signer {name} does not match certificate {}",
                        signer.algorithm(),
                        cert.subject()
                    )));
                }
                HashAlgorithm::Sha1.digest(cert.public_key())
            }
            (None, true) => HashAlgorithm::Sha1.digest(&default_signer.key_identifier()),
        };

        Ok(Self {
            name,
            default_signer,
            signers,
            certificate,
            chain,
            key_hash,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_signer(&self) -> &Arc<ConcurrentSigner> {
        &self.default_signer
    }

    /// First preference this signer holds a key for.
    pub fn signer_for_preferred(&self, preferences: &[String]) -> Option<&Arc<ConcurrentSigner>> {
        preferences
            .iter()
            .filter_map(|name| name.parse::<SignatureAlgorithm>().ok())
            .find_map(|algorithm| {
                self.signers
                    .iter()
                    .find(|signer| signer.algorithm() == algorithm)
            })
    }

    pub fn responder_id(&self, by_name: bool) -> ResponderIdValue {
        match (&self.certificate, by_name) {
            (Some(cert), true) => ResponderIdValue::ByName(cert.subject_der().to_vec()),
            _ => ResponderIdValue::ByKey(self.key_hash.clone()),
        }
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }

    pub fn is_mac(&self) -> bool {
        self.default_signer.algorithm().is_mac()
    }

    pub fn is_healthy(&self) -> bool {
        self.signers.iter().all(|signer| signer.is_healthy())
    }
}
