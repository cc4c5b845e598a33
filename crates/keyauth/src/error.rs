//! Error types for key authentication.
//!
//! Rejections of an attempted signature are represented by [`AuthError`].
//! Infrastructure failures of the credential store are kept apart in
//! [`StoreError`] so that hosts can tell "access denied" from "backend down".

use crate::credential::CredentialKind;

/// Reasons an attempted signature authentication was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The presented API key is not associated with any user.
    #[error("Unknown API key: {0}")]
    UnknownApiKey(String),

    /// The user owning the API key has no shared secret on record.
    #[error("No shared secret configured for API key: {0}")]
    MissingSharedSecret(String),

    /// The computed signature does not match the presented signature.
    #[error("Signature does not match")]
    SignatureMismatch,

    /// A required header carried a value that is not valid visible ASCII.
    #[error("Malformed header: {0}")]
    MalformedHeader(&'static str),

    /// The timestamp is not an integer number of seconds since the Unix epoch.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The timestamp falls outside the configured freshness window.
    #[error("Request timestamp is outside the allowed window")]
    StaleTimestamp,
}

/// Errors raised when a credential value violates its format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The value does not start with the `<TAG>::` prefix of its kind.
    #[error("{kind} must start with {expected:?}")]
    InvalidPrefix {
        /// The credential kind being validated.
        kind: CredentialKind,
        /// The expected prefix including separator.
        expected: &'static str,
    },

    /// The random suffix has the wrong number of characters.
    #[error("{kind} suffix must be {expected} characters, got {actual}")]
    InvalidLength {
        /// The credential kind being validated.
        kind: CredentialKind,
        /// Required suffix length.
        expected: usize,
        /// Observed suffix length.
        actual: usize,
    },

    /// The suffix contains a character outside the credential alphabet.
    #[error("{kind} contains invalid character {ch:?}")]
    InvalidCharacter {
        /// The credential kind being validated.
        kind: CredentialKind,
        /// The offending character.
        ch: char,
    },
}

/// Errors surfaced by a [`CredentialStore`](crate::store::CredentialStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or failed internally.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    /// The API key is already assigned to a different user.
    #[error("API key is already assigned to another user")]
    DuplicateApiKey,

    /// A credential submitted for storage is malformed.
    #[error(transparent)]
    InvalidCredential(#[from] CredentialError),

    /// A credential of the wrong kind was submitted for a slot.
    #[error("expected {expected}, got {actual}")]
    WrongKind {
        /// The kind the slot accepts.
        expected: CredentialKind,
        /// The kind that was submitted.
        actual: CredentialKind,
    },

    /// A stored-associations document could not be read or parsed.
    #[error("failed to load stored credentials: {0}")]
    Load(String),
}

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be interpreted.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// The environment variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}
