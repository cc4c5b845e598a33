//! Random credential generation.
//!
//! Suffix characters are drawn uniformly from [`CHARACTER_POOL`] using the
//! thread-local generator behind `rand::random_range`, a CSPRNG seeded from the
//! operating system. Each thread owns its generator, so concurrent calls need
//! no coordination.

use crate::credential::{CHARACTER_POOL, Credential, CredentialKind};

/// Generate a fresh credential of the given kind.
///
/// # Examples
///
/// ```
/// use keyauth::credential::CredentialKind;
/// use keyauth::generator::generate;
///
/// let key = generate(CredentialKind::ApiKey);
/// assert!(key.as_str().starts_with("JRKAA::"));
/// assert_eq!(key.suffix().len(), 12);
/// ```
#[must_use]
pub fn generate(kind: CredentialKind) -> Credential {
    let suffix: String = (0..kind.suffix_len())
        .map(|_| char::from(CHARACTER_POOL[rand::random_range(0..CHARACTER_POOL.len())]))
        .collect();
    Credential::from_suffix(kind, &suffix)
}

/// Generate a matching API key and shared secret.
#[must_use]
pub fn generate_pair() -> (Credential, Credential) {
    (
        generate(CredentialKind::ApiKey),
        generate(CredentialKind::SharedSecret),
    )
}
