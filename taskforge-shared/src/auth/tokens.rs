/// Token service - the single entry point for issuing, validating,
/// refreshing, and revoking tokens
///
/// Wraps the raw JWT functions from [`super::jwt`] with the revocation
/// check from [`super::revocation`], so callers never have to remember
/// which checks apply to which token type.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use taskforge_shared::auth::revocation::InMemoryRevocationStore;
/// use taskforge_shared::auth::tokens::TokenService;
///
/// let service = TokenService::new(
///     "a-secret-of-at-least-32-bytes-long!!".to_string(),
///     15,
///     7,
///     Arc::new(InMemoryRevocationStore::new()),
/// );
/// ```

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::jwt::{
    create_access_token, create_refresh_token, decode_refresh_token, validate_access_token,
    AccessClaims, JwtError, RefreshClaims, UserIdentity,
};
use super::revocation::{RevocationError, RevocationStore};
use crate::models::user::User;

/// Error type for token service operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Token could not be parsed or its signature is wrong
    #[error("Malformed or forged token")]
    Malformed,

    /// Token is authentic but no longer usable
    #[error("Token is expired or revoked")]
    Rejected,

    /// Revocation store failure
    #[error(transparent)]
    Storage(#[from] RevocationError),
}

impl From<JwtError> for TokenError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => TokenError::Rejected,
            _ => TokenError::Malformed,
        }
    }
}

/// An access/refresh token pair issued at login or registration
#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and checks tokens against a shared secret and revocation store
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    revocations: Arc<dyn RevocationStore>,
}

impl TokenService {
    /// Creates a token service
    ///
    /// `access_ttl_minutes` and `refresh_ttl_days` set the lifetimes of
    /// newly issued tokens.
    pub fn new(
        secret: String,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            secret,
            access_ttl: Duration::minutes(access_ttl_minutes),
            refresh_ttl: Duration::days(refresh_ttl_days),
            revocations,
        }
    }

    /// Issues a fresh access/refresh pair for a user
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let identity = UserIdentity {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        };

        let access = create_access_token(&AccessClaims::new(&identity, self.access_ttl), &self.secret)?;
        let refresh =
            create_refresh_token(&RefreshClaims::new(user.id, self.refresh_ttl), &self.secret)?;

        Ok(TokenPair { access, refresh })
    }

    /// Validates an access token and returns its claims
    pub fn validate_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        Ok(validate_access_token(token, &self.secret)?)
    }

    /// Checks a refresh token and returns the user it belongs to
    ///
    /// Fails if the token is malformed, forged, expired, or revoked. The
    /// refresh token itself is not rotated; it stays usable until it
    /// expires or is revoked. The caller re-reads the user and mints a new
    /// access token with [`TokenService::issue_access`], since the refresh
    /// token carries no profile claims.
    pub async fn check_refresh(&self, refresh_token: &str) -> Result<uuid::Uuid, TokenError> {
        let claims = decode_refresh_token(refresh_token, &self.secret, false)?;

        if self.revocations.is_revoked(claims.jti).await? {
            return Err(TokenError::Rejected);
        }

        Ok(claims.sub)
    }

    /// Issues a new access token for a user
    pub fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        let identity = UserIdentity {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        };

        Ok(create_access_token(
            &AccessClaims::new(&identity, self.access_ttl),
            &self.secret,
        )?)
    }

    /// Revokes a refresh token
    ///
    /// Accepts expired tokens: an authentic token that happens to have
    /// aged out is still blacklisted and the call succeeds. Only tokens
    /// that fail signature or structural checks are rejected.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), TokenError> {
        let claims = decode_refresh_token(refresh_token, &self.secret, true)
            .map_err(|_| TokenError::Malformed)?;

        self.revocations.revoke(claims.jti, Utc::now()).await?;
        tracing::info!("Refresh token revoked for user {}", claims.sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::revocation::InMemoryRevocationStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn service() -> TokenService {
        TokenService::new(
            "test-secret-key-at-least-32-bytes-long".to_string(),
            15,
            7,
            Arc::new(InMemoryRevocationStore::new()),
        )
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password_hash: "x".to_string(),
            first_name: None,
            last_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[tokio::test]
    async fn test_issue_and_validate() {
        let service = service();
        let user = user();

        let pair = service.issue_pair(&user).unwrap();
        let claims = service.validate_access(&pair.access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "bob");
    }

    #[tokio::test]
    async fn test_refresh_identifies_subject() {
        let service = service();
        let user = user();
        let pair = service.issue_pair(&user).unwrap();

        let subject = service.check_refresh(&pair.refresh).await.unwrap();
        assert_eq!(subject, user.id);

        let access = service.issue_access(&user).unwrap();
        assert!(service.validate_access(&access).is_ok());
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let service = service();
        let pair = service.issue_pair(&user()).unwrap();

        assert!(service.check_refresh(&pair.access).await.is_err());
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_refresh() {
        let service = service();
        let pair = service.issue_pair(&user()).unwrap();

        service.revoke(&pair.refresh).await.unwrap();
        let result = service.check_refresh(&pair.refresh).await;
        assert!(matches!(result, Err(TokenError::Rejected)));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let service = service();
        let pair = service.issue_pair(&user()).unwrap();

        service.revoke(&pair.refresh).await.unwrap();
        service.revoke(&pair.refresh).await.unwrap();
    }

    #[tokio::test]
    async fn test_revoking_garbage_fails() {
        let service = service();
        let result = service.revoke("definitely-not-a-jwt").await;
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[tokio::test]
    async fn test_revoking_one_token_leaves_others_valid() {
        let service = service();
        let user = user();
        let first = service.issue_pair(&user).unwrap();
        let second = service.issue_pair(&user).unwrap();

        service.revoke(&first.refresh).await.unwrap();
        assert!(service.check_refresh(&first.refresh).await.is_err());
        assert!(service.check_refresh(&second.refresh).await.is_ok());
    }
}
