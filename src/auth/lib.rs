use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Auth;
use crate::db::Database;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    /// Unique per issued token, so revoking one session leaves the others alone.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(cfg: &Auth) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        TokenService {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            ttl: Duration::hours(cfg.token_ttl_hours),
        }
    }

    pub fn issue(&self, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            email: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }

    /// Checks signature and expiry. Revocation is checked separately since it
    /// needs the store.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// Hex SHA-256 of the raw token; the token itself is never stored.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct Revocations<'a> {
    db: &'a Database,
}

impl<'a> Revocations<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn revoke(&self, token: &str, claims: &Claims) -> Result<()> {
        let query = r#"
            INSERT INTO revoked_tokens (token_digest, email, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(token_digest) DO NOTHING
        "#;

        let _guard = self.db.write_lock().await;
        self.db
            .connection()
            .execute(
                query,
                libsql::params![token_digest(token), claims.email.clone(), claims.exp],
            )
            .await?;
        Ok(())
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool> {
        let _guard = self.db.read_lock().await;
        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT 1 FROM revoked_tokens WHERE token_digest = ?",
                libsql::params![token_digest(token)],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Drops revocations for tokens that have expired on their own by `now`
    /// (unix seconds).
    pub async fn purge_expired(&self, now: i64) -> Result<u64> {
        let _guard = self.db.write_lock().await;
        let removed = self
            .db
            .connection()
            .execute(
                "DELETE FROM revoked_tokens WHERE expires_at <= ?",
                libsql::params![now],
            )
            .await?;
        Ok(removed)
    }
}
