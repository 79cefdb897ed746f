/// Refresh token revocation (blacklist) storage
///
/// Logout works by blacklisting the refresh token's `jti`; access tokens
/// stay stateless and simply age out. The storage backend is abstracted
/// behind [`RevocationStore`] so the token service can run against an
/// in-memory store in tests and Postgres in production.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Error type for revocation store operations
#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    /// Underlying storage failure
    #[error("Revocation store error: {0}")]
    StorageError(String),
}

impl From<sqlx::Error> for RevocationError {
    fn from(e: sqlx::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

/// Storage for blacklisted refresh token identifiers
///
/// Both operations are idempotent: revoking the same `jti` twice succeeds,
/// and a revoked token stays revoked.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Records a token identifier as revoked
    async fn revoke(&self, jti: Uuid, at: DateTime<Utc>) -> Result<(), RevocationError>;

    /// Checks whether a token identifier has been revoked
    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError>;
}

/// In-memory revocation store
///
/// Suitable for tests and single-process deployments. Entries live until
/// process exit; there is no expiry sweep.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, jti: Uuid, at: DateTime<Utc>) -> Result<(), RevocationError> {
        let mut entries = self.entries.write().await;
        entries.entry(jti).or_insert(at);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError> {
        let entries = self.entries.read().await;
        Ok(entries.contains_key(&jti))
    }
}

/// Postgres-backed revocation store
///
/// Persists blacklist entries in the `revoked_tokens` table so revocation
/// survives restarts and is shared across instances.
#[derive(Debug, Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn revoke(&self, jti: Uuid, at: DateTime<Utc>) -> Result<(), RevocationError> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, revoked_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(at)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Revoked refresh token jti={}", jti);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_jti_is_not_revoked() {
        let store = InMemoryRevocationStore::new();
        assert!(!store.is_revoked(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_then_check() {
        let store = InMemoryRevocationStore::new();
        let jti = Uuid::new_v4();

        store.revoke(jti, Utc::now()).await.unwrap();
        assert!(store.is_revoked(jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = InMemoryRevocationStore::new();
        let jti = Uuid::new_v4();

        store.revoke(jti, Utc::now()).await.unwrap();
        store.revoke(jti, Utc::now()).await.unwrap();
        assert!(store.is_revoked(jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_revocations_are_independent() {
        let store = InMemoryRevocationStore::new();
        let revoked = Uuid::new_v4();
        let untouched = Uuid::new_v4();

        store.revoke(revoked, Utc::now()).await.unwrap();
        assert!(store.is_revoked(revoked).await.unwrap());
        assert!(!store.is_revoked(untouched).await.unwrap());
    }
}
