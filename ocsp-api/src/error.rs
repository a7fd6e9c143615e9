use thiserror::Error;

/// Errors raised by status stores and their factories.
///
/// A store error counts as a single failed vote; the responder only gives up
/// on a request when every configured store fails.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store timeout: {0}")]
    Timeout(String),

    #[error("Invalid store configuration: {0}")]
    Configuration(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unknown store type: {0}")]
    UnknownType(String),

    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    #[error("Could not parse certificate: {0}")]
    Parse(String),

    #[error("Invalid PEM: {0}")]
    Pem(String),

    #[error("Invalid validity time: {0}")]
    Validity(i64),
}
