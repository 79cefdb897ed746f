/// API route handlers
///
/// # Modules
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, logout, profile
/// - `tasks`: Task CRUD, filtering, search, and pagination

pub mod auth;
pub mod health;
pub mod tasks;
