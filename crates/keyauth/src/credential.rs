//! Strongly typed API key and shared secret values.
//!
//! Every credential has the shape `<TAG>::<SUFFIX>`:
//!
//! | Kind          | Tag     | Suffix length |
//! |---------------|---------|---------------|
//! | API key       | `JRKAA` | 12            |
//! | Shared secret | `JRKSS` | 32            |
//!
//! The tag lets an auditor tell the kind of a credential from its value alone.
//! [`Credential::parse`] enforces the tag, length and alphabet, so a value held
//! in a [`Credential`] is always well formed.

use std::fmt;

use subtle::ConstantTimeEq;

use crate::error::CredentialError;

/// Alphabet the generator draws suffix characters from (66 characters).
pub const CHARACTER_POOL: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!*-~";

/// Symbols emitted by older generators that validation still accepts.
const LEGACY_SYMBOLS: &[u8] = b"^`";

/// The two kinds of credential a user can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Public-ish identifier sent with every request.
    ApiKey,
    /// Private keying material, never transmitted.
    SharedSecret,
}

impl CredentialKind {
    /// Tag plus separator, e.g. `JRKAA::`.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::ApiKey => "JRKAA::",
            Self::SharedSecret => "JRKSS::",
        }
    }

    /// Number of random characters following the prefix.
    #[must_use]
    pub const fn suffix_len(self) -> usize {
        match self {
            Self::ApiKey => 12,
            Self::SharedSecret => 32,
        }
    }

    /// Detect the kind of a credential from its tag.
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        [Self::ApiKey, Self::SharedSecret]
            .into_iter()
            .find(|kind| value.starts_with(kind.prefix()))
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey => f.write_str("API key"),
            Self::SharedSecret => f.write_str("shared secret"),
        }
    }
}

/// A validated credential value.
///
/// Shared secrets are redacted from `Debug` output and compare in constant time.
#[derive(Clone)]
pub struct Credential {
    kind: CredentialKind,
    value: String,
}

impl Credential {
    /// Validate `value` as a credential of the given kind.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] when the prefix, suffix length or suffix
    /// alphabet does not match the kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyauth::credential::{Credential, CredentialKind};
    ///
    /// let key = Credential::parse(CredentialKind::ApiKey, "JRKAA::ABCDEFGHIJKL").unwrap();
    /// assert_eq!(key.suffix(), "ABCDEFGHIJKL");
    /// assert!(Credential::parse(CredentialKind::ApiKey, "JRKSS::ABCDEFGHIJKL").is_err());
    /// ```
    pub fn parse(kind: CredentialKind, value: impl Into<String>) -> Result<Self, CredentialError> {
        let value = value.into();
        let suffix = value
            .strip_prefix(kind.prefix())
            .ok_or(CredentialError::InvalidPrefix {
                kind,
                expected: kind.prefix(),
            })?;

        let actual = suffix.chars().count();
        if actual != kind.suffix_len() {
            return Err(CredentialError::InvalidLength {
                kind,
                expected: kind.suffix_len(),
                actual,
            });
        }

        if let Some(ch) = suffix.chars().find(|c| !is_suffix_char(*c)) {
            return Err(CredentialError::InvalidCharacter { kind, ch });
        }

        Ok(Self { kind, value })
    }

    /// Build a credential from a generated suffix without re-validating.
    pub(crate) fn from_suffix(kind: CredentialKind, suffix: &str) -> Self {
        Self {
            kind,
            value: format!("{}{suffix}", kind.prefix()),
        }
    }

    /// The kind of this credential.
    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// The full credential value, prefix included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The random part after the prefix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.value[self.kind.prefix().len()..]
    }

    /// Consume the credential and return the raw value.
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && bool::from(self.value.as_bytes().ct_eq(other.value.as_bytes()))
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self.kind {
            CredentialKind::ApiKey => self.value.as_str(),
            CredentialKind::SharedSecret => "[REDACTED]",
        };
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("value", &value)
            .finish()
    }
}

/// Whether `c` may appear in a credential suffix.
fn is_suffix_char(c: char) -> bool {
    u8::try_from(c).is_ok_and(|b| CHARACTER_POOL.contains(&b) || LEGACY_SYMBOLS.contains(&b))
}
