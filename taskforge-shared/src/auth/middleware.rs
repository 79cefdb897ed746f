/// Authentication middleware for Axum
///
/// Extracts the Bearer token from the Authorization header, validates it
/// through the [`TokenService`], and adds an [`AuthContext`] to request
/// extensions for handlers to extract.
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Router, routing::get, middleware};
/// use std::sync::Arc;
/// use taskforge_shared::auth::middleware::{create_jwt_middleware, AuthContext};
/// use taskforge_shared::auth::revocation::InMemoryRevocationStore;
/// use taskforge_shared::auth::tokens::TokenService;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.username)
/// }
///
/// let tokens = TokenService::new(
///     "a-secret-of-at-least-32-bytes-long!!".to_string(),
///     15,
///     7,
///     Arc::new(InMemoryRevocationStore::new()),
/// );
/// let app: Router = Router::new()
///     .route("/protected", get(handler))
///     .layer(middleware::from_fn(create_jwt_middleware(tokens)));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::AccessClaims;
use super::tokens::TokenService;

/// Authentication context added to request extensions
///
/// Populated from access token claims, so handlers can identify and
/// describe the caller without a user lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Login name of the caller
    pub username: String,

    /// Email of the caller
    pub email: String,

    /// Given name, if set
    pub first_name: Option<String>,

    /// Family name, if set
    pub last_name: Option<String>,
}

impl AuthContext {
    /// Creates auth context from validated access token claims
    pub fn from_claims(claims: &AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username.clone(),
            email: claims.email.clone(),
            first_name: claims.first_name.clone(),
            last_name: claims.last_name.clone(),
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
        };

        let body = Json(json!({
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// JWT authentication middleware
///
/// # Errors
///
/// Returns 401 Unauthorized if the Authorization header is missing or the
/// token fails validation (forged, expired, or wrong type), and 400 if the
/// header is not a Bearer credential.
pub async fn jwt_auth_middleware(
    tokens: TokenService,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = tokens
        .validate_access(token)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    req.extensions_mut().insert(AuthContext::from_claims(&claims));

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
///
/// Captures the token service and returns a function usable with
/// `axum::middleware::from_fn`.
pub fn create_jwt_middleware(
    tokens: TokenService,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    move |req, next| {
        let tokens = tokens.clone();
        Box::pin(jwt_auth_middleware(tokens, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{AccessClaims, UserIdentity};
    use chrono::Duration;

    #[test]
    fn test_auth_context_from_claims() {
        let identity = UserIdentity {
            id: Uuid::new_v4(),
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            first_name: None,
            last_name: Some("Jones".to_string()),
        };
        let claims = AccessClaims::new(&identity, Duration::minutes(15));

        let context = AuthContext::from_claims(&claims);
        assert_eq!(context.user_id, identity.id);
        assert_eq!(context.username, "carol");
        assert_eq!(context.email, "carol@example.com");
        assert!(context.first_name.is_none());
        assert_eq!(context.last_name.as_deref(), Some("Jones"));
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::InvalidToken("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
