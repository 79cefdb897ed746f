/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register new user
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Refresh access token
/// - `POST /api/auth/logout` - Revoke a refresh token
/// - `GET /api/auth/profile` - Current user's profile
/// - `PUT /api/auth/profile` - Update current user's profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskforge_shared::{
    auth::{middleware::AuthContext, password, tokens::TokenError},
    models::user::{CreateUser, UpdateUser, User},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Unique login name
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Password confirmation, must match `password`
    pub password2: String,

    /// Optional given name
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    /// Optional family name
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,
}

/// Public view of a user account
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserResponse {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// The newly created account
    pub user: UserResponse,

    /// Access token
    pub access: String,

    /// Refresh token
    pub refresh: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name
    pub username: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Access token
    pub access: String,

    /// Refresh token
    pub refresh: String,

    /// Summary of the authenticated user
    pub user: UserResponse,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token
    pub access: String,
}

/// Logout request
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    /// Refresh token to revoke
    pub refresh: Option<String>,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New username
    #[validate(length(
        min = 1,
        max = 150,
        message = "Username must be between 1 and 150 characters"
    ))]
    pub username: Option<String>,

    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New given name
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    /// New family name
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,
}

/// Collects `validator` failures into the common error shape
fn validation_errors(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "SecureP@ss123",
///   "password2": "SecureP@ss123",
///   "first_name": "Alice"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, passwords do not match, or the
///   username or email is already taken
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate().map_err(validation_errors)?;

    if req.password != req.password2 {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "password2",
            "Passwords do not match",
        )]));
    }

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new("password", e)])
    })?;

    // Friendly pre-checks; the unique indexes still catch races and the
    // sqlx::Error conversion maps those to the same response
    if User::find_by_username(&state.db, &req.username).await?.is_some() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "username",
            "A user with that username already exists",
        )]));
    }
    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "email",
            "A user with that email already exists",
        )]));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
        },
    )
    .await?;

    let pair = state.tokens.issue_pair(&user)?;

    tracing::info!("Registered user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from_user(&user),
            access: pair.access,
            refresh: pair.refresh,
        }),
    ))
}

/// Login endpoint
///
/// Authenticates by username and password and returns a token pair.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials (same response whether the
///   username or the password was wrong)
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    User::update_last_login(&state.db, user.id).await?;

    let pair = state.tokens.issue_pair(&user)?;

    Ok(Json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
        user: UserResponse::from_user(&user),
    }))
}

/// Token refresh endpoint
///
/// Exchanges a valid, unrevoked refresh token for a new access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Expired, revoked, or malformed refresh token; the
///   response never says which
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let user_id = state
        .tokens
        .check_refresh(&req.refresh)
        .await
        .map_err(|e| match e {
            TokenError::Malformed => ApiError::Unauthorized("Invalid refresh token".to_string()),
            e => ApiError::from(e),
        })?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    let access = state.tokens.issue_access(&user)?;

    Ok(Json(RefreshResponse { access }))
}

/// Logout endpoint
///
/// Revokes the supplied refresh token so it can no longer mint access
/// tokens. Succeeds even when the token has already expired or was
/// revoked before; only unparseable tokens are rejected.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or unparseable refresh token
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<LogoutRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let refresh = req
        .refresh
        .ok_or_else(|| ApiError::BadRequest("Refresh token is required".to_string()))?;

    state.tokens.revoke(&refresh).await?;

    tracing::info!("User {} logged out", auth.user_id);

    Ok(Json(serde_json::json!({
        "message": "Successfully logged out"
    })))
}

/// Returns the authenticated user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// Updates the authenticated user's profile
///
/// Username, email, first name, and last name may change; username and
/// email stay unique across users.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate().map_err(validation_errors)?;

    if let Some(ref username) = req.username {
        if let Some(existing) = User::find_by_username(&state.db, username).await? {
            if existing.id != auth.user_id {
                return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
                    "username",
                    "A user with that username already exists",
                )]));
            }
        }
    }

    if let Some(ref email) = req.email {
        if let Some(existing) = User::find_by_email(&state.db, email).await? {
            if existing.id != auth.user_id {
                return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
                    "email",
                    "A user with that email already exists",
                )]));
            }
        }
    }

    let update = UpdateUser {
        username: req.username,
        email: req.email,
        first_name: req.first_name.map(Some),
        last_name: req.last_name.map(Some),
        ..Default::default()
    };

    let user = User::update(&state.db, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from_user(&user)))
}
