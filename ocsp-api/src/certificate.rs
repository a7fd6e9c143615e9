use chrono::{DateTime, TimeZone, Utc};
use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::error::CertificateError;
use crate::hash::HashAlgorithm;
use crate::query::IssuerHash;
use crate::serial::SerialNumber;

/// Parsed X.509 certificate.
///
/// Only the pieces the responder needs are kept; equality is defined on the
/// full DER encoding.
#[derive(Clone)]
pub struct Certificate {
    inner: Arc<Parsed>,
}

struct Parsed {
    encoded: Vec<u8>,
    subject_der: Vec<u8>,
    issuer_der: Vec<u8>,
    subject: String,
    issuer: String,
    serial: SerialNumber,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    public_key_algorithm: String,
    public_key: Vec<u8>,
    tbs_der: Vec<u8>,
    signature_algorithm: String,
    signature: Vec<u8>,
}

impl Certificate {
    /// # Errors
    /// Returns an error when `der` is not a single well-formed certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| CertificateError::Parse(e.to_string()))?;
        let tbs = &cert.tbs_certificate;
        let tbs_der: &[u8] = tbs.as_ref();

        let parsed = Parsed {
            encoded: der.to_vec(),
            subject_der: tbs.subject.as_raw().to_vec(),
            issuer_der: tbs.issuer.as_raw().to_vec(),
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            serial: SerialNumber::from_bytes(tbs.raw_serial()),
            not_before: to_utc(tbs.validity.not_before.timestamp())?,
            not_after: to_utc(tbs.validity.not_after.timestamp())?,
            public_key_algorithm: tbs.subject_pki.algorithm.algorithm.to_id_string(),
            public_key: tbs.subject_pki.subject_public_key.data.to_vec(),
            tbs_der: tbs_der.to_vec(),
            signature_algorithm: cert.signature_algorithm.algorithm.to_id_string(),
            signature: cert.signature_value.data.to_vec(),
        };
        Ok(Self {
            inner: Arc::new(parsed),
        })
    }

    /// # Errors
    /// Returns an error when the PEM block or the certificate inside is invalid.
    pub fn from_pem(pem: &[u8]) -> Result<Self, CertificateError> {
        let (_, block) = x509_parser::pem::parse_x509_pem(pem)
            .map_err(|e| CertificateError::Pem(e.to_string()))?;
        Self::from_der(&block.contents)
    }

    /// Accepts either PEM or DER input.
    ///
    /// # Errors
    /// Returns an error when neither encoding yields a certificate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CertificateError> {
        if bytes.starts_with(b"-----BEGIN") {
            Self::from_pem(bytes)
        } else {
            Self::from_der(bytes)
        }
    }

    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: {e}", path.as_ref().display()),
            )
        })
    }

    pub fn encoded(&self) -> &[u8] {
        &self.inner.encoded
    }

    pub fn subject_der(&self) -> &[u8] {
        &self.inner.subject_der
    }

    pub fn issuer_der(&self) -> &[u8] {
        &self.inner.issuer_der
    }

    pub fn subject(&self) -> &str {
        &self.inner.subject
    }

    pub fn issuer(&self) -> &str {
        &self.inner.issuer
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.inner.serial
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.inner.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.inner.not_after
    }

    /// Dotted OID of the subject public key algorithm.
    pub fn public_key_algorithm(&self) -> &str {
        &self.inner.public_key_algorithm
    }

    /// Contents of the subjectPublicKey BIT STRING.
    pub fn public_key(&self) -> &[u8] {
        &self.inner.public_key
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.inner.not_before <= at && at <= self.inner.not_after
    }

    pub fn is_self_issued(&self) -> bool {
        self.inner.subject_der == self.inner.issuer_der
    }

    /// Whether `issuer`'s public key verifies this certificate's signature.
    ///
    /// Names alone never link two certificates of a path.
    pub fn is_issued_by(&self, issuer: &Certificate) -> bool {
        if self.inner.issuer_der != issuer.inner.subject_der {
            return false;
        }
        let Some(algorithm) =
            certificate_verification_algorithm(&self.inner.signature_algorithm, issuer.public_key())
        else {
            return false;
        };
        UnparsedPublicKey::new(algorithm, issuer.public_key())
            .verify(&self.inner.tbs_der, &self.inner.signature)
            .is_ok()
    }

    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Vec<u8> {
        algorithm.digest(&self.inner.encoded)
    }

    /// CertID issuer fields this certificate answers to when acting as a CA.
    pub fn issuer_hash(&self, algorithm: HashAlgorithm) -> IssuerHash {
        IssuerHash {
            algorithm,
            name_hash: algorithm.digest(&self.inner.subject_der),
            key_hash: algorithm.digest(&self.inner.public_key),
        }
    }
}

const P256_POINT_LEN: usize = 65;

/// Maps a certificate signature algorithm OID to ring, using the issuer key
/// size to tell the ECDSA curves apart.
fn certificate_verification_algorithm(
    oid: &str,
    issuer_key: &[u8],
) -> Option<&'static dyn VerificationAlgorithm> {
    let p256 = issuer_key.len() == P256_POINT_LEN;
    match oid {
        "1.3.101.112" => Some(&signature::ED25519),
        "1.2.840.10045.4.3.2" if p256 => Some(&signature::ECDSA_P256_SHA256_ASN1),
        "1.2.840.10045.4.3.2" => Some(&signature::ECDSA_P384_SHA256_ASN1),
        "1.2.840.10045.4.3.3" if p256 => Some(&signature::ECDSA_P256_SHA384_ASN1),
        "1.2.840.10045.4.3.3" => Some(&signature::ECDSA_P384_SHA384_ASN1),
        "1.2.840.113549.1.1.11" => Some(&signature::RSA_PKCS1_2048_8192_SHA256),
        "1.2.840.113549.1.1.12" => Some(&signature::RSA_PKCS1_2048_8192_SHA384),
        "1.2.840.113549.1.1.13" => Some(&signature::RSA_PKCS1_2048_8192_SHA512),
        _ => None,
    }
}

fn to_utc(timestamp: i64) -> Result<DateTime<Utc>, CertificateError> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .ok_or(CertificateError::Validity(timestamp))
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.inner.encoded == other.inner.encoded
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.encoded.hash(state);
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.inner.subject)
            .field("issuer", &self.inner.issuer)
            .field("serial", &self.inner.serial)
            .finish()
    }
}
