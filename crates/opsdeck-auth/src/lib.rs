//! Authentication Service client library
//!
//! Provides the raw auth endpoint calls (login, register, refresh, current
//! user) and file-backed storage for the access/refresh token pair. This
//! crate is a standalone library with no dependency on the gateway or the
//! CLI — it can be tested and used independently.
//!
//! Credential flow:
//! 1. Gateway calls `endpoints::login()` or `endpoints::register()`
//! 2. Pair stored via `credentials::CredentialStore::store()`
//! 3. A request later gets a 401; gateway calls `endpoints::refresh()`
//! 4. Rotated pair saved via `credentials::CredentialStore::store()`
//! 5. On refresh rejection or logout: `credentials::CredentialStore::clear()`

pub mod credentials;
pub mod endpoints;
pub mod error;

pub use credentials::CredentialStore;
pub use endpoints::{TokenPair, UserProfile, current_user, login, refresh, register};
pub use error::{Error, Result};
