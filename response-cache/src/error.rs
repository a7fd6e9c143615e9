use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid cached data: {0}")]
    InvalidData(String),

    #[error("Only the master replica may register issuers")]
    NotMaster,

    #[error("Response cache is not on service")]
    OffService,

    #[error("Certificate error: {0}")]
    Certificate(#[from] ocsp_api::CertificateError),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
