//! HTTP service that puts the authentication gate in front of an identity
//! endpoint.
//!
//! - `GET /health` answers without authentication.
//! - Every other request is run through [`AuthGate`]; authenticated requests
//!   receive `{"user": "<id>"}`, everything else a JSON error.
//!
//! Clients only ever see a generic failure message; the precise rejection
//! reason is logged by the gate.

use std::convert::Infallible;
use std::future::{Ready, ready};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::Service;
use serde_json::json;
use tracing::error;

use keyauth::{AuthDecision, AuthGate};

/// Response body type of the service.
pub type ResponseBody = Full<Bytes>;

/// Hyper service wrapping an [`AuthGate`].
#[derive(Debug, Clone)]
pub struct KeyAuthService {
    gate: Arc<AuthGate>,
}

impl KeyAuthService {
    /// Create a service around `gate`.
    pub fn new(gate: AuthGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }

    /// Produce the response for a request. The body is never read.
    pub fn handle(&self, parts: &http::request::Parts) -> http::Response<ResponseBody> {
        if is_health_check(&parts.method, parts.uri.path()) {
            return json_response(http::StatusCode::OK, &json!({ "status": "running" }));
        }

        match self.gate.authenticate(None, parts) {
            Ok(AuthDecision::Authenticated(user)) => {
                json_response(http::StatusCode::OK, &json!({ "user": user }))
            }
            Ok(AuthDecision::PassThrough(_)) => error_response(
                http::StatusCode::UNAUTHORIZED,
                "MissingCredentials",
                "X-Api-Key, X-Api-Timestamp and X-Api-Signature headers are required",
            ),
            Ok(AuthDecision::Rejected(_)) => error_response(
                http::StatusCode::UNAUTHORIZED,
                "AuthenticationFailed",
                "The request signature could not be verified",
            ),
            Err(e) => {
                error!(error = %e, "credential store failure");
                error_response(
                    http::StatusCode::SERVICE_UNAVAILABLE,
                    "ServiceUnavailable",
                    "Authentication backend is unavailable",
                )
            }
        }
    }
}

impl Service<http::Request<Incoming>> for KeyAuthService {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let (parts, _body) = req.into_parts();
        ready(Ok(self.handle(&parts)))
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && path == "/health"
}

fn error_response(
    status: http::StatusCode,
    code: &str,
    message: &str,
) -> http::Response<ResponseBody> {
    json_response(status, &json!({ "error": code, "message": message }))
}

fn json_response(
    status: http::StatusCode,
    body: &serde_json::Value,
) -> http::Response<ResponseBody> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response parts should be valid")
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use keyauth::signature::SIGNATURE_HEADER;
    use keyauth::{
        CredentialStore, GateConfig, InMemoryCredentialStore, SignatureScheme, StoreError,
        UserId, sign_request_headers,
    };

    use super::*;

    const TEST_API_KEY: &str = "JRKAA::ABCDEFGHIJKL";
    const TEST_SECRET: &str = "JRKSS::0123456789ABCDEF0123456789ABCDEF";

    fn test_service() -> KeyAuthService {
        let store = InMemoryCredentialStore::new();
        store
            .save(&UserId::new("7"), TEST_API_KEY, TEST_SECRET)
            .unwrap();
        KeyAuthService::new(AuthGate::new(Arc::new(store), GateConfig::default()))
    }

    fn request(method: &str, uri: &str, headers: http::HeaderMap) -> http::request::Parts {
        let (mut parts, ()) = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        parts.headers = headers;
        parts
    }

    fn signed(uri: &str) -> http::HeaderMap {
        sign_request_headers(
            TEST_API_KEY,
            TEST_SECRET,
            SignatureScheme::HmacSha256,
            &http::Method::GET,
            uri,
            "1610000000",
        )
        .unwrap()
    }

    async fn body_json(response: http::Response<ResponseBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_should_answer_health_check_without_credentials() {
        let response = test_service().handle(&request("GET", "/health", http::HeaderMap::new()));
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "running");
    }

    #[tokio::test]
    async fn test_should_return_user_for_signed_request() {
        let uri = "/whoami?verbose=1";
        let response = test_service().handle(&request("GET", uri, signed(uri)));
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(body_json(response).await["user"], "7");
    }

    #[tokio::test]
    async fn test_should_reject_tampered_signature() {
        let mut headers = signed("/whoami");
        headers.insert(SIGNATURE_HEADER, "0".repeat(64).parse().unwrap());

        let response = test_service().handle(&request("GET", "/whoami", headers));
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "AuthenticationFailed");
    }

    #[tokio::test]
    async fn test_should_require_credentials() {
        let response = test_service().handle(&request("GET", "/whoami", http::HeaderMap::new()));
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "MissingCredentials");
    }

    struct UnavailableStore;

    impl CredentialStore for UnavailableStore {
        fn find_identity_by_api_key(&self, _api_key: &str) -> Result<Option<UserId>, StoreError> {
            Err(StoreError::Unavailable("timeout".to_owned()))
        }

        fn shared_secret(
            &self,
            _user: &UserId,
        ) -> Result<Option<keyauth::Credential>, StoreError> {
            Err(StoreError::Unavailable("timeout".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_should_report_store_failure_as_unavailable() {
        let service = KeyAuthService::new(AuthGate::new(
            Arc::new(UnavailableStore),
            GateConfig::default(),
        ));
        let response = service.handle(&request("GET", "/whoami", signed("/whoami")));
        assert_eq!(response.status(), http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_should_detect_health_check_paths() {
        assert!(is_health_check(&http::Method::GET, "/health"));
        assert!(!is_health_check(&http::Method::GET, "/_health"));
        assert!(!is_health_check(&http::Method::POST, "/health"));
        assert!(!is_health_check(&http::Method::GET, "/whoami"));
    }
}
