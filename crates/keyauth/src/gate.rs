//! The authentication gate.
//!
//! [`AuthGate::authenticate`] is the single entry point a host calls from its
//! authentication pipeline. The flow is:
//!
//! 1. An already-authenticated principal passes through untouched.
//! 2. Requests lacking any of `X-Api-Key`, `X-Api-Timestamp` or
//!    `X-Api-Signature` pass through untouched, leaving room for other schemes.
//! 3. If a freshness window is configured, the timestamp must fall inside it.
//! 4. The API key is resolved to a user and the user's shared secret.
//! 5. The expected signature over the server-observed request is compared to
//!    the presented one in constant time.
//!
//! Unknown keys still pay for a full signature computation against a dummy
//! secret before being rejected, so lookups do not leak through timing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::canonical::SignatureContext;
use crate::credential::Credential;
use crate::error::{AuthError, StoreError};
use crate::signature::{API_KEY_HEADER, SIGNATURE_HEADER, SignatureScheme, TIMESTAMP_HEADER};
use crate::store::CredentialStore;
use crate::types::UserId;

/// Secret used to keep the work constant when an API key does not resolve.
const DUMMY_SECRET: &str = "JRKSS::00000000000000000000000000000000";

/// Settings for an [`AuthGate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateConfig {
    /// Signature construction expected from clients.
    pub scheme: SignatureScheme,
    /// Maximum distance between the request timestamp and the server clock.
    /// `None` accepts any timestamp value.
    pub timestamp_tolerance: Option<Duration>,
}

/// The outcome of running a request through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// The request carried a valid signature for this user.
    Authenticated(UserId),
    /// The scheme was not attempted; the caller's identity is returned as is.
    PassThrough(Option<UserId>),
    /// A signature was presented and did not verify.
    Rejected(AuthError),
}

impl AuthDecision {
    /// The identity the host should continue with, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::PassThrough(user) => user.as_ref(),
            Self::Rejected(_) => None,
        }
    }

    /// Whether the request must be refused.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Values of the three authentication headers.
#[derive(Debug, Clone, Copy)]
struct Presented<'a> {
    api_key: &'a str,
    timestamp: &'a str,
    signature: &'a str,
}

/// Request-signature authentication gate.
///
/// The gate holds no per-request state; one instance can serve any number of
/// concurrent requests.
#[derive(Clone)]
pub struct AuthGate {
    store: Arc<dyn CredentialStore>,
    config: GateConfig,
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("store", &"...")
            .field("config", &self.config)
            .finish()
    }
}

impl AuthGate {
    /// Create a gate backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, config: GateConfig) -> Self {
        Self { store, config }
    }

    /// The gate's configuration.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Decide who the request is from.
    ///
    /// `current` is the identity established by earlier stages of the host's
    /// pipeline; a non-empty value is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] only when the credential store fails. Every
    /// authentication failure is reported as [`AuthDecision::Rejected`].
    pub fn authenticate(
        &self,
        current: Option<&UserId>,
        parts: &http::request::Parts,
    ) -> Result<AuthDecision, StoreError> {
        self.authenticate_at(current, parts, Utc::now())
    }

    /// [`AuthGate::authenticate`] against an explicit server clock.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] only when the credential store fails.
    pub fn authenticate_at(
        &self,
        current: Option<&UserId>,
        parts: &http::request::Parts,
        now: DateTime<Utc>,
    ) -> Result<AuthDecision, StoreError> {
        if let Some(user) = current.filter(|u| !u.as_str().is_empty()) {
            return Ok(AuthDecision::PassThrough(Some(user.clone())));
        }

        let presented = match extract_presented(&parts.headers) {
            None => {
                debug!("no key authentication headers, deferring");
                return Ok(AuthDecision::PassThrough(current.cloned()));
            }
            Some(Err(err)) => return Ok(reject(None, err)),
            Some(Ok(presented)) => presented,
        };

        if let Some(tolerance) = self.config.timestamp_tolerance {
            if let Err(err) = check_freshness(presented.timestamp, now, tolerance) {
                return Ok(reject(Some(presented.api_key), err));
            }
        }

        let user = self.store.find_identity_by_api_key(presented.api_key)?;
        let secret = match &user {
            Some(user) => self.store.shared_secret(user)?,
            None => None,
        };

        debug!(
            api_key = presented.api_key,
            resolved = user.is_some(),
            scheme = %self.config.scheme,
            "verifying request signature"
        );

        let context = SignatureContext::from_request(presented.api_key, presented.timestamp, parts);
        let matched = self.config.scheme.verify(
            &context,
            presented.signature,
            secret.as_ref().map_or(DUMMY_SECRET, Credential::as_str),
        );

        let decision = match (user, secret) {
            (None, _) => reject(
                Some(presented.api_key),
                AuthError::UnknownApiKey(presented.api_key.to_owned()),
            ),
            (Some(_), None) => reject(
                Some(presented.api_key),
                AuthError::MissingSharedSecret(presented.api_key.to_owned()),
            ),
            (Some(user), Some(_)) if matched => {
                info!(api_key = presented.api_key, %user, "request authenticated");
                AuthDecision::Authenticated(user)
            }
            (Some(_), Some(_)) => reject(Some(presented.api_key), AuthError::SignatureMismatch),
        };

        Ok(decision)
    }
}

/// Read the three authentication headers.
///
/// Returns `None` when any of them is absent.
fn extract_presented(headers: &http::HeaderMap) -> Option<Result<Presented<'_>, AuthError>> {
    let api_key = headers.get(API_KEY_HEADER)?;
    let timestamp = headers.get(TIMESTAMP_HEADER)?;
    let signature = headers.get(SIGNATURE_HEADER)?;

    let presented = header_str(api_key, API_KEY_HEADER).and_then(|api_key| {
        Ok(Presented {
            api_key,
            timestamp: header_str(timestamp, TIMESTAMP_HEADER)?,
            signature: header_str(signature, SIGNATURE_HEADER)?,
        })
    });
    Some(presented)
}

fn header_str<'a>(value: &'a http::HeaderValue, name: &'static str) -> Result<&'a str, AuthError> {
    value.to_str().map_err(|_| AuthError::MalformedHeader(name))
}

/// Check that `timestamp` (Unix seconds) lies within `tolerance` of `now`.
fn check_freshness(timestamp: &str, now: DateTime<Utc>, tolerance: Duration) -> Result<(), AuthError> {
    let seconds: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| AuthError::InvalidTimestamp(timestamp.to_owned()))?;

    if seconds.abs_diff(now.timestamp()) > tolerance.as_secs() {
        return Err(AuthError::StaleTimestamp);
    }
    Ok(())
}

/// Log a rejection and wrap it into a decision.
fn reject(api_key: Option<&str>, err: AuthError) -> AuthDecision {
    warn!(api_key, reason = %err, "request rejected");
    AuthDecision::Rejected(err)
}
