//! Credential store trait and an in-memory implementation.
//!
//! [`CredentialStore`] is the only thing the authentication gate needs from the
//! host: resolve an API key to its owner, and a user to their shared secret.
//! [`InMemoryCredentialStore`] keeps one API key and one shared secret per user
//! with a unique index on the API key.

use std::collections::HashMap;
use std::io::Read;

use parking_lot::RwLock;
use tracing::debug;

use crate::credential::{Credential, CredentialKind};
use crate::error::StoreError;
use crate::types::UserId;

/// Lookups the authentication gate performs against the host's user records.
///
/// Implementations must index API keys and keep them unique across users.
pub trait CredentialStore: Send + Sync {
    /// Resolve the user that owns `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backing store cannot be queried.
    fn find_identity_by_api_key(&self, api_key: &str) -> Result<Option<UserId>, StoreError>;

    /// Fetch the shared secret of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backing store cannot be queried.
    fn shared_secret(&self, user: &UserId) -> Result<Option<Credential>, StoreError>;
}

/// The credentials a single user owns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredAssociation {
    /// The user's API key, if any.
    pub api_key: Option<Credential>,
    /// The user's shared secret, if any.
    pub shared_secret: Option<Credential>,
}

impl StoredAssociation {
    fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.shared_secret.is_none()
    }
}

/// Serialized form of a stored association, as found in credential files.
///
/// ```json
/// [{"user": "42", "api_key": "JRKAA::…", "shared_secret": "JRKSS::…"}]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredRecord {
    /// Owner of the credentials.
    pub user: UserId,
    /// API key value; absent or empty means none.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Shared secret value; absent or empty means none.
    #[serde(default)]
    pub shared_secret: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    by_api_key: HashMap<String, UserId>,
    associations: HashMap<UserId, StoredAssociation>,
}

impl Inner {
    fn set_api_key(&mut self, user: &UserId, api_key: Option<Credential>) -> Result<(), StoreError> {
        if let Some(ref key) = api_key {
            if let Some(owner) = self.by_api_key.get(key.as_str()) {
                if owner != user {
                    return Err(StoreError::DuplicateApiKey);
                }
            }
        }

        let association = self.associations.entry(user.clone()).or_default();
        if let Some(old) = association.api_key.take() {
            self.by_api_key.remove(old.as_str());
        }
        if let Some(ref key) = api_key {
            self.by_api_key.insert(key.as_str().to_owned(), user.clone());
        }
        association.api_key = api_key;
        self.prune(user);
        Ok(())
    }

    fn set_shared_secret(&mut self, user: &UserId, secret: Option<Credential>) {
        self.associations
            .entry(user.clone())
            .or_default()
            .shared_secret = secret;
        self.prune(user);
    }

    fn prune(&mut self, user: &UserId) {
        if self.associations.get(user).is_some_and(StoredAssociation::is_empty) {
            self.associations.remove(user);
        }
    }
}

/// Thread-safe in-memory credential store.
///
/// Reads take a shared lock, so concurrent authentications never block each
/// other; writes are serialized to keep the API key index consistent.
///
/// # Examples
///
/// ```
/// use keyauth::store::{CredentialStore, InMemoryCredentialStore};
/// use keyauth::types::UserId;
///
/// let store = InMemoryCredentialStore::new();
/// let user = UserId::new("42");
/// store
///     .save(&user, "JRKAA::ABCDEFGHIJKL", "JRKSS::0123456789ABCDEF0123456789ABCDEF")
///     .unwrap();
///
/// assert_eq!(
///     store.find_identity_by_api_key("JRKAA::ABCDEFGHIJKL").unwrap(),
///     Some(user)
/// );
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<Inner>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from serialized records, validating every credential.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidCredential`] for malformed values and
    /// [`StoreError::DuplicateApiKey`] if two users share an API key.
    pub fn from_records(records: impl IntoIterator<Item = StoredRecord>) -> Result<Self, StoreError> {
        let store = Self::new();
        for record in records {
            store.save(
                &record.user,
                record.api_key.as_deref().unwrap_or_default(),
                record.shared_secret.as_deref().unwrap_or_default(),
            )?;
        }
        Ok(store)
    }

    /// Load a store from a JSON array of [`StoredRecord`]s.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Load`] if the document cannot be read or parsed,
    /// or any error of [`InMemoryCredentialStore::from_records`].
    pub fn from_json_reader(reader: impl Read) -> Result<Self, StoreError> {
        let records: Vec<StoredRecord> =
            serde_json::from_reader(reader).map_err(|e| StoreError::Load(e.to_string()))?;
        debug!(records = records.len(), "loaded stored credential records");
        Self::from_records(records)
    }

    /// Set both credentials of `user`, replacing any previous ones.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WrongKind`] if the arguments are swapped and
    /// [`StoreError::DuplicateApiKey`] if another user owns the API key.
    pub fn assign(
        &self,
        user: &UserId,
        api_key: Credential,
        shared_secret: Credential,
    ) -> Result<(), StoreError> {
        expect_kind(&api_key, CredentialKind::ApiKey)?;
        expect_kind(&shared_secret, CredentialKind::SharedSecret)?;

        let mut inner = self.inner.write();
        inner.set_api_key(user, Some(api_key))?;
        inner.set_shared_secret(user, Some(shared_secret));
        Ok(())
    }

    /// Apply submitted form values for `user`.
    ///
    /// Each value is stored after validation; an empty (or whitespace-only)
    /// value clears that credential. Nothing is written unless both values are
    /// acceptable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidCredential`] for malformed values and
    /// [`StoreError::DuplicateApiKey`] if another user owns the API key.
    pub fn save(&self, user: &UserId, api_key: &str, shared_secret: &str) -> Result<(), StoreError> {
        let api_key = parse_submitted(CredentialKind::ApiKey, api_key)?;
        let shared_secret = parse_submitted(CredentialKind::SharedSecret, shared_secret)?;

        let mut inner = self.inner.write();
        inner.set_api_key(user, api_key)?;
        inner.set_shared_secret(user, shared_secret);
        debug!(%user, "saved credentials");
        Ok(())
    }

    /// Remove every credential of `user`.
    pub fn clear(&self, user: &UserId) {
        let mut inner = self.inner.write();
        if let Some(association) = inner.associations.remove(user) {
            if let Some(key) = association.api_key {
                inner.by_api_key.remove(key.as_str());
            }
        }
    }

    /// The credentials currently held for `user`.
    #[must_use]
    pub fn association(&self, user: &UserId) -> Option<StoredAssociation> {
        self.inner.read().associations.get(user).cloned()
    }

    /// Number of users holding at least one credential.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().associations.len()
    }

    /// Whether no user holds any credential.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().associations.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_identity_by_api_key(&self, api_key: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.inner.read().by_api_key.get(api_key).cloned())
    }

    fn shared_secret(&self, user: &UserId) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .inner
            .read()
            .associations
            .get(user)
            .and_then(|a| a.shared_secret.clone()))
    }
}

fn expect_kind(credential: &Credential, expected: CredentialKind) -> Result<(), StoreError> {
    if credential.kind() == expected {
        Ok(())
    } else {
        Err(StoreError::WrongKind {
            expected,
            actual: credential.kind(),
        })
    }
}

fn parse_submitted(kind: CredentialKind, value: &str) -> Result<Option<Credential>, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(Credential::parse(kind, value)?))
}
