use thiserror::Error;

/// Start-up, configuration and wiring failures.
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Invalid configuration: {0}")]
    InvalidConf(String),

    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{kind} '{name}' referenced by responder '{responder}' is not defined")]
    UndefinedReference {
        kind: &'static str,
        name: String,
        responder: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] ocsp_api::StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] response_cache::CacheError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config loading error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ResponderError>;

#[derive(Error, Debug)]
pub enum SignerError {
    /// Every signing slot of the key is busy.
    #[error("No idle signer available")]
    NoIdleSigner,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid signer configuration: {0}")]
    Configuration(String),
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}
