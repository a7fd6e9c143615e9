use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ocsp_api::{Certificate, HashAlgorithm};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::backend::{CacheBackend, CacheKey, CachedResponse, IssuerId, IssuerRecord};
use crate::error::{CacheError, CacheResult};

const CREATE_ISSUER_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS ocsp_cache_issuer (
        id SERIAL PRIMARY KEY,
        fingerprint TEXT NOT NULL UNIQUE,
        cert BYTEA NOT NULL
    )
"#;

const CREATE_RESPONSE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS ocsp_cache_response (
        issuer_id INTEGER NOT NULL REFERENCES ocsp_cache_issuer (id),
        serial TEXT NOT NULL,
        sig_alg SMALLINT NOT NULL,
        cert_hash_alg SMALLINT NOT NULL,
        this_update TIMESTAMPTZ NOT NULL,
        next_update TIMESTAMPTZ,
        response BYTEA NOT NULL,
        PRIMARY KEY (issuer_id, serial, sig_alg, cert_hash_alg)
    )
"#;

/// Cache backend on shared PostgreSQL tables.
#[derive(Clone)]
pub struct PgCacheBackend {
    pool: PgPool,
}

impl PgCacheBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    /// Returns an error when the database cannot be reached.
    pub async fn connect(url: &str, max_connections: u32) -> CacheResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Creates the cache tables if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error when the statements fail.
    pub async fn migrate(&self) -> CacheResult<()> {
        sqlx::query(CREATE_ISSUER_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_RESPONSE_TABLE).execute(&self.pool).await?;
        info!("Response cache tables ready");
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for PgCacheBackend {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn load_issuers(&self) -> CacheResult<Vec<IssuerRecord>> {
        let rows = sqlx::query_as::<_, (i32, Vec<u8>)>("SELECT id, cert FROM ocsp_cache_issuer")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(id, cert)| {
                Ok(IssuerRecord {
                    id,
                    certificate: Certificate::from_der(&cert)?,
                })
            })
            .collect()
    }

    async fn store_issuer(&self, certificate: &Certificate) -> CacheResult<IssuerId> {
        let fingerprint = hex::encode_upper(certificate.fingerprint(HashAlgorithm::Sha1));
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO ocsp_cache_issuer (fingerprint, cert)
            VALUES ($1, $2)
            ON CONFLICT (fingerprint) DO UPDATE SET fingerprint = EXCLUDED.fingerprint
            RETURNING id
            "#,
        )
        .bind(fingerprint)
        .bind(certificate.encoded())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_response(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        let row = sqlx::query_as::<_, (DateTime<Utc>, Option<DateTime<Utc>>, Vec<u8>)>(
            r#"
            SELECT this_update, next_update, response
            FROM ocsp_cache_response
            WHERE issuer_id = $1 AND serial = $2 AND sig_alg = $3 AND cert_hash_alg = $4
            "#,
        )
        .bind(key.issuer_id)
        .bind(key.serial.to_hex())
        .bind(i16::from(key.signature_algorithm))
        .bind(i16::from(key.cert_hash_algorithm))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(this_update, next_update, encoded)| CachedResponse {
            key: key.clone(),
            this_update,
            next_update,
            encoded,
        }))
    }

    async fn put_response(&self, response: CachedResponse) -> CacheResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ocsp_cache_response (
                issuer_id, serial, sig_alg, cert_hash_alg, this_update, next_update, response
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (issuer_id, serial, sig_alg, cert_hash_alg) DO UPDATE SET
                this_update = EXCLUDED.this_update,
                next_update = EXCLUDED.next_update,
                response = EXCLUDED.response
            "#,
        )
        .bind(response.key.issuer_id)
        .bind(response.key.serial.to_hex())
        .bind(i16::from(response.key.signature_algorithm))
        .bind(i16::from(response.key.cert_hash_algorithm))
        .bind(response.this_update)
        .bind(response.next_update)
        .bind(response.encoded)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>, validity: Duration) -> CacheResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM ocsp_cache_response
            WHERE next_update <= $1 OR (next_update IS NULL AND this_update <= $2)
            "#,
        )
        .bind(now)
        .bind(now - validity)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
