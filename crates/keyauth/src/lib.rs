//! API key and shared secret request-signature authentication.
//!
//! A client holds an API key and a shared secret. Every request carries the
//! key, a timestamp and a signature over a canonical form of
//! `(api_key, timestamp, request_method, request_uri)`. The server looks up the
//! secret belonging to the key's owner, recomputes the signature and accepts
//! the request only on an exact match.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use keyauth::gate::{AuthDecision, AuthGate, GateConfig};
//! use keyauth::signature::{SignatureScheme, sign_request_headers};
//! use keyauth::store::InMemoryCredentialStore;
//! use keyauth::types::UserId;
//!
//! let store = InMemoryCredentialStore::new();
//! let user = UserId::new("42");
//! store
//!     .save(&user, "JRKAA::ABCDEFGHIJKL", "JRKSS::0123456789ABCDEF0123456789ABCDEF")
//!     .unwrap();
//! let gate = AuthGate::new(Arc::new(store), GateConfig::default());
//!
//! // Client side: sign the request.
//! let headers = sign_request_headers(
//!     "JRKAA::ABCDEFGHIJKL",
//!     "JRKSS::0123456789ABCDEF0123456789ABCDEF",
//!     SignatureScheme::HmacSha256,
//!     &http::Method::GET,
//!     "/wp-json/wp/v2/posts",
//!     "1610000000",
//! )
//! .unwrap();
//!
//! // Server side: run it through the gate.
//! let (mut parts, ()) = http::Request::get("/wp-json/wp/v2/posts")
//!     .body(())
//!     .unwrap()
//!     .into_parts();
//! parts.headers = headers;
//! assert_eq!(
//!     gate.authenticate(None, &parts).unwrap(),
//!     AuthDecision::Authenticated(user)
//! );
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical signed context and its encoding
//! - [`config`] - Environment-driven configuration
//! - [`credential`] - Validated API key and shared secret values
//! - [`error`] - Error types
//! - [`gate`] - The authentication gate
//! - [`generator`] - Random credential generation
//! - [`signature`] - Signature computation and verification
//! - [`store`] - Credential store trait and in-memory implementation
//! - [`types`] - Shared type definitions

pub mod canonical;
pub mod config;
pub mod credential;
pub mod error;
pub mod gate;
pub mod generator;
pub mod signature;
pub mod store;
pub mod types;

pub use config::KeyAuthConfig;
pub use credential::{Credential, CredentialKind};
pub use error::{AuthError, ConfigError, CredentialError, StoreError};
pub use gate::{AuthDecision, AuthGate, GateConfig};
pub use generator::{generate, generate_pair};
pub use signature::{SignatureScheme, sign_request_headers};
pub use store::{CredentialStore, InMemoryCredentialStore};
pub use types::UserId;
