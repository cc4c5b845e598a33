//! Request-signature authentication integration tests.

#[cfg(test)]
mod tests {
    use keyauth::signature::{API_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};

    use crate::{SECRETLESS_API_KEY, TEST_API_KEY, TEST_SECRET, client, endpoint_url, signed_get};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health_without_credentials() {
        let resp = client()
            .get(format!("{}/health", endpoint_url()))
            .send()
            .await
            .expect("health request");

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_authenticate_signed_request() {
        let resp = signed_get(TEST_API_KEY, TEST_SECRET, "/wp-json/wp/v2/posts?page=2").await;

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body["user"], "7");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_signature_for_other_uri() {
        let headers = keyauth::sign_request_headers(
            TEST_API_KEY,
            TEST_SECRET,
            crate::scheme(),
            &reqwest::Method::GET,
            "/wp-json/wp/v2/posts",
            &keyauth::signature::unix_timestamp_now(),
        )
        .expect("headers");

        let resp = client()
            .get(format!("{}/wp-json/wp/v2/users", endpoint_url()))
            .headers(headers)
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body["error"], "AuthenticationFailed");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_wrong_secret() {
        let resp = signed_get(
            TEST_API_KEY,
            "JRKSS::FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
            "/whoami",
        )
        .await;
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_user_without_shared_secret() {
        let resp = signed_get(SECRETLESS_API_KEY, TEST_SECRET, "/whoami").await;
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unknown_api_key() {
        let resp = signed_get("JRKAA::ZZZZZZZZZZZZ", TEST_SECRET, "/whoami").await;
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_require_all_three_headers() {
        let resp = client()
            .get(format!("{}/whoami", endpoint_url()))
            .header(API_KEY_HEADER, TEST_API_KEY)
            .header(TIMESTAMP_HEADER, "1610000000")
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body["error"], "MissingCredentials");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_malformed_signature_header() {
        let resp = client()
            .get(format!("{}/whoami", endpoint_url()))
            .header(API_KEY_HEADER, TEST_API_KEY)
            .header(TIMESTAMP_HEADER, "1610000000")
            .header(SIGNATURE_HEADER, "not-a-signature")
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body["error"], "AuthenticationFailed");
    }
}
