//! Configuration model and loader.
//!
//! The model is plain `serde` data; turning it into live responders happens
//! in [`crate::wiring`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ocsp_api::{Certificate, CertprofileOption, DatasourceConf, HashAlgorithm, RETENTION_FOREVER};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ResponderError, Result};
use crate::options::{
    NoncePolicy, OcspMode, RequestOption, ResponseOption, DEFAULT_MAX_REQUEST_LIST_COUNT,
};
use crate::responder::AuditOption;
use crate::signer::{SignatureAlgorithm, DEFAULT_SIGNER_PARALLELISM};
use crate::trust::{CertpathValidationModel, TrustPolicy};

pub const ENV_PREFIX: &str = "OCSP";
pub const ENV_SEPARATOR: &str = "__";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 10_000;

/// PKCS#8, the only key encoding the signers accept.
const PRIVATE_KEY_PEM_TAG: &str = "PRIVATE KEY";

/// Root of the responder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcspServerConf {
    /// Only the master replica writes issuers into the response cache.
    #[serde(default = "default_true")]
    pub master: bool,
    #[serde(default)]
    pub response_cache: Option<ResponseCacheConf>,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default)]
    pub responders: Vec<ResponderConf>,
    #[serde(default)]
    pub signers: Vec<SignerConf>,
    #[serde(default)]
    pub request_options: Vec<RequestOptionConf>,
    #[serde(default)]
    pub response_options: Vec<ResponseOptionConf>,
    #[serde(default)]
    pub audit_options: Vec<AuditOptionConf>,
    #[serde(default)]
    pub certprofile_options: Vec<CertprofileOptionConf>,
    #[serde(default)]
    pub stores: Vec<StoreConf>,
    #[serde(default)]
    pub datasources: Vec<DatasourceConf>,
}

fn default_true() -> bool {
    true
}

fn default_store_timeout_ms() -> u64 {
    DEFAULT_STORE_TIMEOUT_MS
}

impl OcspServerConf {
    /// Loads the configuration file, then applies `OCSP__`-prefixed
    /// environment overrides (e.g. `OCSP__MASTER=false`).
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or does not match the model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conf: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        info!(
            path = %path.display(),
            responders = conf.responders.len(),
            stores = conf.stores.len(),
            signers = conf.signers.len(),
            "Loaded OCSP configuration"
        );
        Ok(conf)
    }

    /// Parses a JSON document, without environment overrides.
    ///
    /// # Errors
    /// Returns an error when the document does not match the model.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ResponderError::InvalidConf(format!("invalid configuration: {e}")))
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.store_timeout_ms)
    }
}

// ============================================================================
// Binary material
// ============================================================================

/// Binary content given either as a file or inline as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOrValue {
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Base64 of the raw bytes.
    #[serde(default)]
    pub value: Option<String>,
}

impl FileOrValue {
    pub fn from_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            value: None,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            file: None,
            value: Some(STANDARD.encode(bytes)),
        }
    }

    /// # Errors
    /// Returns an error when neither or both of `file` and `value` are set,
    /// the file cannot be read or the value is not base64.
    pub fn read(&self) -> Result<Vec<u8>> {
        match (&self.file, &self.value) {
            (Some(file), None) => std::fs::read(file).map_err(|e| {
                ResponderError::InvalidConf(format!("could not read {}: {e}", file.display()))
            }),
            (None, Some(value)) => STANDARD
                .decode(value.trim())
                .map_err(|e| ResponderError::InvalidConf(format!("invalid base64 value: {e}"))),
            _ => Err(ResponderError::InvalidConf(
                "exactly one of file and value must be set".to_string(),
            )),
        }
    }

    /// Reads a certificate in PEM or DER form.
    ///
    /// # Errors
    /// Returns an error when the content cannot be read or parsed.
    pub fn read_certificate(&self) -> Result<Certificate> {
        let bytes = self.read()?;
        Certificate::from_bytes(&bytes)
            .map_err(|e| ResponderError::InvalidConf(format!("invalid certificate: {e}")))
    }

    /// Reads key material: a single PEM `PRIVATE KEY` block is unwrapped,
    /// DER and raw secrets pass through.
    ///
    /// # Errors
    /// Returns an error when the content cannot be read, or is PEM holding
    /// anything but exactly one private key block.
    pub fn read_key(&self) -> Result<Vec<u8>> {
        let bytes = self.read()?;
        if !bytes.starts_with(b"-----BEGIN") {
            return Ok(bytes);
        }
        let blocks = pem::parse_many(&bytes)
            .map_err(|e| ResponderError::InvalidConf(format!("invalid PEM key: {e}")))?;
        match blocks.as_slice() {
            [block] if block.tag() == PRIVATE_KEY_PEM_TAG => Ok(block.contents().to_vec()),
            [block] => Err(ResponderError::InvalidConf(format!(
                "expected a PEM {PRIVATE_KEY_PEM_TAG} block, found {}",
                block.tag()
            ))),
            _ => Err(ResponderError::InvalidConf(format!(
                "expected exactly one PEM block in key material, found {}",
                blocks.len()
            ))),
        }
    }
}

// ============================================================================
// Named objects
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConf {
    pub name: String,
    /// Mount paths the responder answers under.
    #[serde(default)]
    pub servlet_paths: Vec<String>,
    #[serde(default)]
    pub mode: OcspMode,
    #[serde(default)]
    pub inherit_ca_revocation: bool,
    #[serde(default)]
    pub negotiate_signature_algorithm: Option<bool>,
    pub signer: String,
    pub request_option: String,
    pub response_option: String,
    /// Consulted in this order.
    pub stores: Vec<String>,
    #[serde(default)]
    pub audit_option: Option<String>,
    #[serde(default)]
    pub certprofile_option: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerKeyConf {
    pub algorithm: SignatureAlgorithm,
    pub key: FileOrValue,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_parallelism() -> usize {
    DEFAULT_SIGNER_PARALLELISM
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConf {
    pub name: String,
    /// The first key is the default one.
    pub keys: Vec<SignerKeyConf>,
    #[serde(default)]
    pub cert: Option<FileOrValue>,
    /// Chain embedded after the signer certificate.
    #[serde(default)]
    pub ca_certs: Vec<FileOrValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertpathConf {
    #[serde(default)]
    pub validation_model: CertpathValidationModel,
    #[serde(default)]
    pub trust_anchors: Vec<FileOrValue>,
    #[serde(default)]
    pub certs: Vec<FileOrValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOptionConf {
    pub name: String,
    #[serde(default = "default_versions")]
    pub versions: BTreeSet<u8>,
    #[serde(default)]
    pub nonce: NoncePolicy,
    #[serde(default = "default_max_request_list_count")]
    pub max_request_list_count: usize,
    #[serde(default)]
    pub hash_algorithms: Option<BTreeSet<HashAlgorithm>>,
    #[serde(default)]
    pub signature_required: bool,
    #[serde(default = "default_true")]
    pub validate_signature: bool,
    #[serde(default)]
    pub certpath: Option<CertpathConf>,
}

fn default_versions() -> BTreeSet<u8> {
    [0].into_iter().collect()
}

fn default_max_request_list_count() -> usize {
    DEFAULT_MAX_REQUEST_LIST_COUNT
}

impl RequestOptionConf {
    /// # Errors
    /// Returns an error when a trust certificate cannot be loaded or a list is empty.
    pub fn build(&self) -> Result<RequestOption> {
        if self.versions.is_empty() {
            return Err(ResponderError::InvalidConf(format!(
                "request option {} allows no version",
                self.name
            )));
        }
        if self.max_request_list_count == 0 {
            return Err(ResponderError::InvalidConf(format!(
                "request option {} allows no entries",
                self.name
            )));
        }
        if self.nonce.min_len > self.nonce.max_len {
            return Err(ResponderError::InvalidConf(format!(
                "request option {} has nonce min_len > max_len",
                self.name
            )));
        }

        let mut option = RequestOption::new(self.name.clone());
        option.versions = self.versions.clone();
        option.nonce = self.nonce;
        option.max_request_list_count = self.max_request_list_count;
        if let Some(algorithms) = &self.hash_algorithms {
            option.hash_algorithms = algorithms.clone();
        }
        option.signature_required = self.signature_required;
        option.validate_signature = self.validate_signature;

        if let Some(certpath) = &self.certpath {
            let anchors = certpath
                .trust_anchors
                .iter()
                .map(FileOrValue::read_certificate)
                .collect::<Result<Vec<_>>>()?;
            let certs = certpath
                .certs
                .iter()
                .map(FileOrValue::read_certificate)
                .collect::<Result<Vec<_>>>()?;
            option.trust = TrustPolicy::new(anchors, certs, certpath.validation_model);
        }
        Ok(option)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseOptionConf {
    pub name: String,
    #[serde(flatten)]
    pub option: ResponseOption,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOptionConf {
    pub name: String,
    #[serde(default)]
    pub certprofile_mapping: HashMap<String, String>,
}

impl AuditOptionConf {
    pub fn build(&self) -> AuditOption {
        AuditOption {
            certprofile_mapping: self.certprofile_mapping.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertprofileOptionConf {
    pub name: String,
    #[serde(flatten)]
    pub option: CertprofileOption,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConf {
    pub name: String,
    #[serde(rename = "type")]
    pub store_type: String,
    #[serde(default = "default_retention")]
    pub retention_interval_days: i32,
    #[serde(default)]
    pub unknown_serial_as_good: bool,
    #[serde(default = "default_true")]
    pub include_archive_cutoff: bool,
    #[serde(default = "default_true")]
    pub include_crl_id: bool,
    #[serde(default = "default_true")]
    pub ignore_expired_cert: bool,
    #[serde(default = "default_true")]
    pub ignore_not_yet_valid_cert: bool,
    #[serde(default)]
    pub datasource: Option<String>,
    /// Passed to the store factory as is.
    #[serde(default)]
    pub conf: serde_json::Value,
}

fn default_retention() -> i32 {
    RETENTION_FOREVER
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCacheConf {
    #[serde(default)]
    pub backend: CacheBackendKind,
    /// Required for the `postgres` backend.
    #[serde(default)]
    pub datasource: Option<String>,
    #[serde(default = "default_cache_validity")]
    pub validity_seconds: i64,
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_seconds: u64,
}

impl ResponseCacheConf {
    /// # Errors
    /// Returns an error when the validity or the maintenance interval is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.validity_seconds <= 0 {
            return Err(ResponderError::InvalidConf(format!(
                "response cache validity must be positive, got {}s",
                self.validity_seconds
            )));
        }
        if self.maintenance_interval_seconds == 0 {
            return Err(ResponderError::InvalidConf(
                "response cache maintenance interval must be at least 1s".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_cache_validity() -> i64 {
    response_cache::DEFAULT_CACHE_VALIDITY_SECS
}

fn default_maintenance_interval() -> u64 {
    response_cache::DEFAULT_MAINTENANCE_INTERVAL_SECS
}
