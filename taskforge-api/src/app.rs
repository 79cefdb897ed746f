/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskforge_api::{app::AppState, config::Config};
/// use taskforge_shared::auth::revocation::PgRevocationStore;
/// use taskforge_shared::auth::tokens::TokenService;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let tokens = TokenService::new(
///     config.jwt.secret.clone(),
///     config.jwt.access_ttl_minutes,
///     config.jwt.refresh_ttl_days,
///     Arc::new(PgRevocationStore::new(pool.clone())),
/// );
/// let state = AppState::new(pool, config, tokens);
/// let app = taskforge_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskforge_shared::auth::middleware::create_jwt_middleware;
use taskforge_shared::auth::tokens::TokenService;
use tower::Layer as _;
use tower_http::{
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token issuance and validation
    pub tokens: TokenService,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, tokens: TokenService) -> Self {
        Self {
            db,
            config: Arc::new(config),
            tokens,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                    # Health check (public)
/// └── /api/                      # API surface
///     ├── /auth/                 # Authentication endpoints
///     │   ├── POST /register     # (public)
///     │   ├── POST /login        # (public)
///     │   ├── POST /refresh      # (public)
///     │   ├── POST /logout       # (authenticated)
///     │   ├── GET  /profile      # (authenticated)
///     │   └── PUT  /profile      # (authenticated)
///     └── /tasks/                # Task management (authenticated)
///         ├── GET    /           # List with filters and pagination
///         ├── POST   /           # Create
///         ├── GET    /:id        # Retrieve
///         ├── PUT    /:id        # Full update
///         ├── PATCH  /:id        # Partial update
///         └── DELETE /:id        # Delete
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes reachable without a valid access token
    let auth_public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Auth routes that require an authenticated caller
    let auth_protected = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route(
            "/profile",
            get(routes::auth::get_profile).put(routes::auth::update_profile),
        )
        .layer(axum::middleware::from_fn(create_jwt_middleware(
            state.tokens.clone(),
        )));

    // Task routes (require JWT authentication)
    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::replace_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(axum::middleware::from_fn(create_jwt_middleware(
            state.tokens.clone(),
        )));

    let api_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_protected))
        .nest("/tasks", task_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Wraps the router so paths with and without a trailing slash hit the
/// same route (`/api/tasks/` and `/api/tasks` are the same resource).
///
/// Path normalization must run before routing, so the layer wraps the
/// finished router instead of being added with `Router::layer`. Serve it
/// with `axum::ServiceExt::into_make_service`.
pub fn build_app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}
