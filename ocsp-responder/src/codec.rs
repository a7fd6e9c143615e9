//! Wire model of OCSP requests and responses, and the codec seam.
//!
//! The engine never touches bytes directly: decoding requests, producing the
//! bytes to verify or sign, and encoding responses all go through an
//! [`OcspCodec`]. [`JsonCodec`] is a deterministic JSON rendition of the
//! RFC 6960 structures; an ASN.1 DER codec plugs in at the same seam.

use chrono::{DateTime, Utc};
use ocsp_api::{CrlId, HashAlgorithm, SerialNumber};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Object identifiers of the extensions the engine understands.
pub mod oid {
    pub const NONCE: &str = "1.3.6.1.5.5.7.48.1.2";
    pub const CRL_ID: &str = "1.3.6.1.5.5.7.48.1.3";
    pub const ARCHIVE_CUTOFF: &str = "1.3.6.1.5.5.7.48.1.6";
    pub const PREFERRED_SIGNATURE_ALGORITHMS: &str = "1.3.6.1.5.5.7.48.1.8";
    pub const EXTENDED_REVOKE: &str = "1.3.6.1.5.5.7.48.1.9";
    pub const INVALIDITY_DATE: &str = "2.5.29.24";
    pub const CERT_HASH: &str = "1.3.36.8.3.13";
}

/// DER encoding of NULL, the value of the extended-revoke extension.
pub const DER_NULL: [u8; 2] = [0x05, 0x00];

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub oid: String,
    #[serde(default)]
    pub critical: bool,
    #[serde(with = "b64")]
    pub value: Vec<u8>,
}

impl Extension {
    pub fn new(oid: impl Into<String>, critical: bool, value: Vec<u8>) -> Self {
        Self {
            oid: oid.into(),
            critical,
            value,
        }
    }
}

pub fn find_extension<'a>(extensions: &'a [Extension], oid: &str) -> Option<&'a Extension> {
    extensions.iter().find(|extension| extension.oid == oid)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertId {
    /// Hash algorithm name or OID, validated by the engine.
    pub hash_algorithm: String,
    #[serde(with = "b64")]
    pub issuer_name_hash: Vec<u8>,
    #[serde(with = "b64")]
    pub issuer_key_hash: Vec<u8>,
    pub serial_number: SerialNumber,
}

impl CertId {
    pub fn new(
        hash_algorithm: HashAlgorithm,
        issuer_name_hash: Vec<u8>,
        issuer_key_hash: Vec<u8>,
        serial_number: SerialNumber,
    ) -> Self {
        Self {
            hash_algorithm: hash_algorithm.oid().to_string(),
            issuer_name_hash,
            issuer_key_hash,
            serial_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub cert_id: CertId,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TbsRequest {
    #[serde(default)]
    pub version: u8,
    #[serde(default)]
    pub requestor_name: Option<String>,
    pub requests: Vec<Request>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSignature {
    /// Signature algorithm name, e.g. `Ed25519` or `SHA256withECDSA`.
    pub algorithm: String,
    #[serde(with = "b64")]
    pub signature: Vec<u8>,
    /// DER certificates, signer first.
    #[serde(default, with = "b64_list")]
    pub certs: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcspRequest {
    pub tbs_request: TbsRequest,
    #[serde(default)]
    pub signature: Option<RequestSignature>,
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcspResponseStatus {
    Successful,
    MalformedRequest,
    InternalError,
    TryLater,
    SigRequired,
    Unauthorized,
}

impl OcspResponseStatus {
    pub const FAILURES: [OcspResponseStatus; 5] = [
        OcspResponseStatus::MalformedRequest,
        OcspResponseStatus::InternalError,
        OcspResponseStatus::TryLater,
        OcspResponseStatus::SigRequired,
        OcspResponseStatus::Unauthorized,
    ];

    pub fn code(self) -> u8 {
        match self {
            OcspResponseStatus::Successful => 0,
            OcspResponseStatus::MalformedRequest => 1,
            OcspResponseStatus::InternalError => 2,
            OcspResponseStatus::TryLater => 3,
            OcspResponseStatus::SigRequired => 5,
            OcspResponseStatus::Unauthorized => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderIdValue {
    /// DER of the signer certificate's subject.
    ByName(#[serde(with = "b64")] Vec<u8>),
    /// SHA-1 of the signer's public key.
    ByKey(#[serde(with = "b64")] Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CertStatusValue {
    Good,
    Revoked {
        revocation_time: DateTime<Utc>,
        #[serde(default)]
        reason: Option<u8>,
    },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleResponse {
    pub cert_id: CertId,
    pub cert_status: CertStatusValue,
    pub this_update: DateTime<Utc>,
    #[serde(default)]
    pub next_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub version: u8,
    pub responder_id: ResponderIdValue,
    pub produced_at: DateTime<Utc>,
    pub responses: Vec<SingleResponse>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicOcspResponse {
    pub tbs_response_data: ResponseData,
    pub signature_algorithm: String,
    #[serde(with = "b64")]
    pub signature: Vec<u8>,
    #[serde(default, with = "b64_list")]
    pub certs: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcspResponse {
    pub status: OcspResponseStatus,
    #[serde(default)]
    pub basic: Option<BasicOcspResponse>,
}

impl OcspResponse {
    pub fn failure(status: OcspResponseStatus) -> Self {
        Self {
            status,
            basic: None,
        }
    }

    pub fn successful(basic: BasicOcspResponse) -> Self {
        Self {
            status: OcspResponseStatus::Successful,
            basic: Some(basic),
        }
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Converts between the wire model and bytes.
///
/// Encodings must be deterministic: the same value always yields the same
/// bytes, since signatures are computed over them.
pub trait OcspCodec: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// Returns [`CodecError::Decode`] for anything that is not a request.
    fn decode_request(&self, bytes: &[u8]) -> Result<OcspRequest, CodecError>;

    /// # Errors
    /// Returns [`CodecError::Encode`] when the request cannot be encoded.
    fn encode_request(&self, request: &OcspRequest) -> Result<Vec<u8>, CodecError>;

    /// Bytes a requestor signature covers.
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] when the value cannot be encoded.
    fn request_signed_data(&self, tbs: &TbsRequest) -> Result<Vec<u8>, CodecError>;

    /// Bytes the responder signature covers.
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] when the value cannot be encoded.
    fn response_signed_data(&self, tbs: &ResponseData) -> Result<Vec<u8>, CodecError>;

    /// # Errors
    /// Returns [`CodecError::Encode`] when the value cannot be encoded.
    fn encode_response(&self, response: &OcspResponse) -> Result<Vec<u8>, CodecError>;

    /// # Errors
    /// Returns [`CodecError::Decode`] for anything that is not a response.
    fn decode_response(&self, bytes: &[u8]) -> Result<OcspResponse, CodecError>;

    /// Parses the value of a preferred-signature-algorithms extension.
    ///
    /// # Errors
    /// Returns [`CodecError::Decode`] for a malformed value.
    fn decode_preferred_algorithms(&self, value: &[u8]) -> Result<Vec<String>, CodecError>;

    /// # Errors
    /// Returns [`CodecError::Encode`] when the value cannot be encoded.
    fn encode_preferred_algorithms(&self, algorithms: &[String]) -> Result<Vec<u8>, CodecError>;

    /// # Errors
    /// Returns [`CodecError::Encode`] when the value cannot be encoded.
    fn encode_cert_hash(
        &self,
        algorithm: HashAlgorithm,
        hash: &[u8],
    ) -> Result<Vec<u8>, CodecError>;

    /// Encodes a GeneralizedTime extension value.
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] when the value cannot be encoded.
    fn encode_time(&self, time: DateTime<Utc>) -> Result<Vec<u8>, CodecError>;

    /// # Errors
    /// Returns [`CodecError::Encode`] when the value cannot be encoded.
    fn encode_crl_id(&self, crl_id: &CrlId) -> Result<Vec<u8>, CodecError>;
}

/// JSON wire format with base64 byte strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct CertHashValue<'a> {
    algorithm: &'a str,
    #[serde(with = "b64")]
    hash: Vec<u8>,
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
}

fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

impl OcspCodec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn decode_request(&self, bytes: &[u8]) -> Result<OcspRequest, CodecError> {
        decode(bytes)
    }

    fn encode_request(&self, request: &OcspRequest) -> Result<Vec<u8>, CodecError> {
        encode(request)
    }

    fn request_signed_data(&self, tbs: &TbsRequest) -> Result<Vec<u8>, CodecError> {
        encode(tbs)
    }

    fn response_signed_data(&self, tbs: &ResponseData) -> Result<Vec<u8>, CodecError> {
        encode(tbs)
    }

    fn encode_response(&self, response: &OcspResponse) -> Result<Vec<u8>, CodecError> {
        encode(response)
    }

    fn decode_response(&self, bytes: &[u8]) -> Result<OcspResponse, CodecError> {
        decode(bytes)
    }

    fn decode_preferred_algorithms(&self, value: &[u8]) -> Result<Vec<String>, CodecError> {
        decode(value)
    }

    fn encode_preferred_algorithms(&self, algorithms: &[String]) -> Result<Vec<u8>, CodecError> {
        encode(algorithms)
    }

    fn encode_cert_hash(
        &self,
        algorithm: HashAlgorithm,
        hash: &[u8],
    ) -> Result<Vec<u8>, CodecError> {
        encode(&CertHashValue {
            algorithm: algorithm.oid(),
            hash: hash.to_vec(),
        })
    }

    fn encode_time(&self, time: DateTime<Utc>) -> Result<Vec<u8>, CodecError> {
        encode(&time)
    }

    fn encode_crl_id(&self, crl_id: &CrlId) -> Result<Vec<u8>, CodecError> {
        encode(crl_id)
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

mod b64_list {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&STANDARD.encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .into_iter()
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .collect()
    }
}
