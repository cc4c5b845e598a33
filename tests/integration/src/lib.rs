//! Integration tests for KeyAuth server.
//!
//! These tests require a running server at `localhost:8080` loaded with
//! `fixtures/credentials.json`. They are marked `#[ignore]` so they don't run
//! during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! KEYAUTH_CREDENTIALS_FILE=tests/integration/fixtures/credentials.json \
//!     cargo run -p keyauth-server &
//! cargo test -p keyauth-integration -- --ignored
//! ```

use std::sync::Once;

use keyauth::SignatureScheme;
use keyauth::signature::unix_timestamp_now;

static INIT: Once = Once::new();

/// API key of user `7` in the fixture file.
pub const TEST_API_KEY: &str = "JRKAA::ABCDEFGHIJKL";

/// Shared secret of user `7` in the fixture file.
pub const TEST_SECRET: &str = "JRKSS::0123456789ABCDEF0123456789ABCDEF";

/// API key of user `8`, who has no shared secret.
pub const SECRETLESS_API_KEY: &str = "JRKAA::MNOPQRSTWXYZ";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("KEYAUTH_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8080".to_owned())
}

/// Signature scheme the server under test expects.
#[must_use]
pub fn scheme() -> SignatureScheme {
    std::env::var("KEYAUTH_SIGNATURE_SCHEME")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

/// Create an HTTP client for the server.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Send a `GET` for `path_and_query`, signed with the given credentials.
///
/// # Panics
///
/// Panics if the request cannot be signed or sent.
pub async fn signed_get(api_key: &str, secret: &str, path_and_query: &str) -> reqwest::Response {
    let headers = keyauth::sign_request_headers(
        api_key,
        secret,
        scheme(),
        &reqwest::Method::GET,
        path_and_query,
        &unix_timestamp_now(),
    )
    .expect("credentials should be valid header values");

    client()
        .get(format!("{}{path_and_query}", endpoint_url()))
        .headers(headers)
        .send()
        .await
        .expect("server should be reachable")
}

#[cfg(test)]
mod test_auth;
