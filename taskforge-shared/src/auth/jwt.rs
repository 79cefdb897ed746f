/// JWT claims, signing, and validation primitives
///
/// Tokens are signed with HS256 (HMAC-SHA256) using a server-held secret of
/// at least 32 bytes. Tampering is detected by signature mismatch, not by a
/// store lookup.
///
/// # Token Types
///
/// - **Access token**: short-lived, stateless, self-verifying. Carries the
///   user's identity plus minimal profile claims so request handling never
///   needs a user lookup.
/// - **Refresh token**: longer-lived, exchangeable for a new access token.
///   Carries a unique `jti` so it can be individually blacklisted; the
///   revocation check happens in [`super::tokens`], not here.
///
/// Validation never tells callers whether a bad token was expired or
/// forged beyond the error variant; HTTP responses collapse both to the
/// same 401.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token issuer claim value
pub const ISSUER: &str = "taskforge";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived)
    Access,

    /// Refresh token (long-lived)
    Refresh,
}

/// Claims carried by an access token
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus the minimal
/// profile fields endpoints need to describe the caller without a database
/// round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Issuer - always "taskforge"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token type discriminator
    pub token_type: TokenType,

    /// Login name of the subject
    pub username: String,

    /// Email of the subject
    pub email: String,

    /// Given name, if set
    pub first_name: Option<String>,

    /// Family name, if set
    pub last_name: Option<String>,
}

/// Claims carried by a refresh token
///
/// The `jti` is the revocation key: blacklisting a refresh token means
/// recording its `jti`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Issuer - always "taskforge"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token type discriminator
    pub token_type: TokenType,

    /// Unique token identifier (revocation key)
    pub jti: Uuid,
}

/// Identity and profile fields stamped into an access token
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl AccessClaims {
    /// Creates access claims for a user, expiring after `ttl`
    pub fn new(identity: &UserIdentity, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: identity.id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            token_type: TokenType::Access,
            username: identity.username.clone(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
        }
    }
}

impl RefreshClaims {
    /// Creates refresh claims for a user with a fresh `jti`
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            token_type: TokenType::Refresh,
            jti: Uuid::new_v4(),
        }
    }
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

fn verification(validate_exp: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = validate_exp;
    validation.validate_nbf = true;
    validation
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> JwtError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    }
}

/// Signs an access token
pub fn create_access_token(claims: &AccessClaims, secret: &str) -> Result<String, JwtError> {
    sign(claims, secret)
}

/// Signs a refresh token
pub fn create_refresh_token(claims: &RefreshClaims, secret: &str) -> Result<String, JwtError> {
    sign(claims, secret)
}

/// Validates an access token and extracts its claims
///
/// Verifies the signature, expiration, nbf, issuer, and that the token is
/// actually an access token (a refresh token presented as a credential is
/// rejected).
pub fn validate_access_token(token: &str, secret: &str) -> Result<AccessClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let token_data =
        decode::<AccessClaims>(token, &key, &verification(true)).map_err(map_decode_error)?;

    if token_data.claims.token_type != TokenType::Access {
        return Err(JwtError::ValidationError(
            "Expected access token".to_string(),
        ));
    }

    Ok(token_data.claims)
}

/// Decodes a refresh token and extracts its claims
///
/// With `allow_expired` the expiry check is skipped while the signature,
/// nbf, and issuer checks still apply. Revocation needs this: logging out
/// with an expired-but-authentic token must still parse the `jti`.
pub fn decode_refresh_token(
    token: &str,
    secret: &str,
    allow_expired: bool,
) -> Result<RefreshClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let token_data = decode::<RefreshClaims>(token, &key, &verification(!allow_expired))
        .map_err(map_decode_error)?;

    if token_data.claims.token_type != TokenType::Refresh {
        return Err(JwtError::ValidationError(
            "Expected refresh token".to_string(),
        ));
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn identity() -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let identity = identity();
        let claims = AccessClaims::new(&identity, Duration::minutes(15));
        let token = create_access_token(&claims, SECRET).expect("Should create token");

        let validated = validate_access_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, identity.id);
        assert_eq!(validated.username, "alice");
        assert_eq!(validated.email, "alice@example.com");
        assert_eq!(validated.first_name.as_deref(), Some("Alice"));
        assert_eq!(validated.iss, ISSUER);
    }

    #[test]
    fn test_refresh_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let claims = RefreshClaims::new(user_id, Duration::days(7));
        let token = create_refresh_token(&claims, SECRET).unwrap();

        let decoded = decode_refresh_token(&token, SECRET, false).unwrap();
        assert_eq!(decoded.sub, user_id);
        assert_eq!(decoded.jti, claims.jti);
    }

    #[test]
    fn test_each_refresh_token_gets_unique_jti() {
        let user_id = Uuid::new_v4();
        let a = RefreshClaims::new(user_id, Duration::days(7));
        let b = RefreshClaims::new(user_id, Duration::days(7));
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = AccessClaims::new(&identity(), Duration::minutes(15));
        let token = create_access_token(&claims, SECRET).unwrap();

        assert!(validate_access_token(&token, "another-secret-also-32-bytes-long!").is_err());
    }

    #[test]
    fn test_expired_access_token_rejected() {
        let claims = AccessClaims::new(&identity(), Duration::seconds(-3600));
        let token = create_access_token(&claims, SECRET).unwrap();

        let result = validate_access_token(&token, SECRET);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let claims = RefreshClaims::new(Uuid::new_v4(), Duration::days(7));
        let token = create_refresh_token(&claims, SECRET).unwrap();

        assert!(validate_access_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let claims = AccessClaims::new(&identity(), Duration::minutes(15));
        let token = create_access_token(&claims, SECRET).unwrap();

        assert!(decode_refresh_token(&token, SECRET, false).is_err());
    }

    #[test]
    fn test_expired_refresh_decodes_when_allowed() {
        let claims = RefreshClaims::new(Uuid::new_v4(), Duration::seconds(-3600));
        let token = create_refresh_token(&claims, SECRET).unwrap();

        assert!(matches!(
            decode_refresh_token(&token, SECRET, false),
            Err(JwtError::Expired)
        ));

        let decoded = decode_refresh_token(&token, SECRET, true).unwrap();
        assert_eq!(decoded.jti, claims.jti);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validate_access_token("not-a-token", SECRET).is_err());
        assert!(decode_refresh_token("not.a.token", SECRET, true).is_err());
    }
}
