/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength policy
/// - [`jwt`]: JWT claims, signing, and validation primitives
/// - [`revocation`]: Refresh-token revocation store interface
/// - [`tokens`]: Token service tying issuance, refresh, and revocation together
/// - [`middleware`]: Request authentication context for the HTTP layer
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **Revocation**: blacklist-on-logout keyed by the refresh token's jti

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod revocation;
pub mod tokens;
