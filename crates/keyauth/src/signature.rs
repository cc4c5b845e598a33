//! Signature computation and verification.
//!
//! Two constructions are supported:
//!
//! - [`SignatureScheme::HmacSha256`] (default): `hex(HMAC-SHA256(secret, canonical))`
//! - [`SignatureScheme::LegacyMd5`]: `hex(MD5(canonical + secret))`, kept only for
//!   wire compatibility with existing clients
//!
//! `canonical` is [`SignatureContext::canonical_string`]. Verification always
//! compares in constant time.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, KeyInit, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::canonical::SignatureContext;
use crate::error::ConfigError;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the client timestamp.
pub const TIMESTAMP_HEADER: &str = "x-api-timestamp";

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-api-signature";

type HmacSha256 = Hmac<Sha256>;

/// The signature construction used by a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureScheme {
    /// Keyed MAC with the shared secret as key.
    #[default]
    HmacSha256,
    /// MD5 over the canonical context with the secret appended.
    LegacyMd5,
}

impl SignatureScheme {
    /// Compute the hex signature of `context` under `secret`.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyauth::canonical::SignatureContext;
    /// use keyauth::signature::SignatureScheme;
    ///
    /// let ctx = SignatureContext::new("JRKAA::ABCDEFGHIJKL", "1610000000", "GET", "/");
    /// assert_eq!(SignatureScheme::HmacSha256.sign(&ctx, "secret").len(), 64);
    /// assert_eq!(SignatureScheme::LegacyMd5.sign(&ctx, "secret").len(), 32);
    /// ```
    #[must_use]
    pub fn sign(self, context: &SignatureContext, secret: &str) -> String {
        let canonical = context.canonical_string();
        match self {
            Self::HmacSha256 => hmac_sha256_hex(secret.as_bytes(), canonical.as_bytes()),
            Self::LegacyMd5 => {
                let mut hasher = Md5::new();
                hasher.update(canonical.as_bytes());
                hasher.update(secret.as_bytes());
                hex::encode(hasher.finalize())
            }
        }
    }

    /// Check `presented` against the signature of `context` under `secret`.
    ///
    /// The comparison does not short-circuit on the first differing byte.
    #[must_use]
    pub fn verify(self, context: &SignatureContext, presented: &str, secret: &str) -> bool {
        let expected = self.sign(context, secret);
        presented.as_bytes().ct_eq(expected.as_bytes()).into()
    }

    /// The configuration name of the scheme.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::LegacyMd5 => "legacy-md5",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmac-sha256" | "hmac" => Ok(Self::HmacSha256),
            "legacy-md5" | "md5" => Ok(Self::LegacyMd5),
            _ => Err(ConfigError::InvalidValue {
                name: "KEYAUTH_SIGNATURE_SCHEME",
                value: s.to_owned(),
            }),
        }
    }
}

/// Build the three authentication headers for an outgoing request.
///
/// This is the client half of the protocol: it signs `method` and `uri` exactly
/// as the server will observe them.
///
/// # Errors
///
/// Returns [`http::header::InvalidHeaderValue`] if `api_key` or `timestamp`
/// cannot be carried in a header.
///
/// # Examples
///
/// ```
/// use keyauth::signature::{SIGNATURE_HEADER, SignatureScheme, sign_request_headers};
///
/// let headers = sign_request_headers(
///     "JRKAA::ABCDEFGHIJKL",
///     "JRKSS::0123456789ABCDEF0123456789ABCDEF",
///     SignatureScheme::HmacSha256,
///     &http::Method::GET,
///     "/wp-json/wp/v2/posts",
///     "1610000000",
/// )
/// .unwrap();
/// assert_eq!(headers.len(), 3);
/// assert!(headers.contains_key(SIGNATURE_HEADER));
/// ```
pub fn sign_request_headers(
    api_key: &str,
    secret: &str,
    scheme: SignatureScheme,
    method: &http::Method,
    uri: &str,
    timestamp: &str,
) -> Result<http::HeaderMap, http::header::InvalidHeaderValue> {
    let context = SignatureContext::new(api_key, timestamp, method.as_str(), uri);
    let signature = scheme.sign(&context, secret);

    let mut headers = http::HeaderMap::with_capacity(3);
    headers.insert(API_KEY_HEADER, http::HeaderValue::from_str(api_key)?);
    headers.insert(TIMESTAMP_HEADER, http::HeaderValue::from_str(timestamp)?);
    headers.insert(SIGNATURE_HEADER, http::HeaderValue::from_str(&signature)?);
    Ok(headers)
}

/// The current time as whole seconds since the Unix epoch, for use as a
/// request timestamp.
#[must_use]
pub fn unix_timestamp_now() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Compute HMAC-SHA256 and return it hex-encoded.
fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}
