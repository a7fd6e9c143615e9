use serde::{Deserialize, Serialize};

use crate::hash::HashAlgorithm;
use crate::serial::SerialNumber;

/// Issuer identification carried in a CertID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssuerHash {
    pub algorithm: HashAlgorithm,
    #[serde(with = "hex_bytes")]
    pub name_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub key_hash: Vec<u8>,
}

impl IssuerHash {
    pub fn new(algorithm: HashAlgorithm, name_hash: Vec<u8>, key_hash: Vec<u8>) -> Self {
        Self {
            algorithm,
            name_hash,
            key_hash,
        }
    }
}

/// A single certificate-status question posed to a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusQuery {
    pub issuer: IssuerHash,
    pub serial: SerialNumber,
}

impl StatusQuery {
    pub fn new(issuer: IssuerHash, serial: SerialNumber) -> Self {
        Self { issuer, serial }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
