//! # Taskforge Shared Library
//!
//! This crate contains the types, auth primitives, and business logic shared
//! between the Taskforge API server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Token issuance, password hashing, revocation, middleware context
//! - `pagination`: Cursor and page-number pagination strategies
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod pagination;

/// Current version of the Taskforge shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
