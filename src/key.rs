//! # Key Material
//!
//! Everything needed to encrypt or decrypt files of one disk.
//!
//! ## Lifecycle
//!
//! 1. The caller creates a [`KeyMaterial`], usually holding only a password
//! 2. [`KeyResolver::resolve`] fetches the disk's server-held key and decrypts it with the password
//! 3. The transfer builds its key ring from the resolved material and drops everything at the end
//!
//! Key material is never written to disk or shared between transfers. Secret fields are zeroed
//! when the value is dropped.
//!
//! ## Resolution rules
//!
//! | Input                        | Outcome                                      |
//! |------------------------------|----------------------------------------------|
//! | raw key present              | returned unchanged, no network call          |
//! | no raw key, no password      | [`KtError::MissingCredentials`]              |
//! | password only                | `disks.get`, then decrypt `crypto_key`       |
//! | disk has no `crypto_key`     | [`KtError::IncompleteKeyData`]               |

use std::fmt;

use zeroize::Zeroizing;

use crate::api::{self, ApiGateway};
use crate::error::{KtError, Result};
use crate::gpg::{self, DecryptCapability, EncryptCapability, KeyRing};

/// Password, server-held key, decrypted key and public key of one disk.
#[derive(Clone, Default)]
pub struct KeyMaterial {
    encrypted_key: Option<Vec<u8>>,
    raw_key: Option<Zeroizing<Vec<u8>>>,
    public_key: Option<String>,
    password: Option<Zeroizing<String>>,
}

impl KeyMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Material holding only a password. An empty password counts as absent.
    pub fn with_password(password: impl Into<String>) -> Self {
        Self::new().password(password)
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then(|| Zeroizing::new(password));
        self
    }

    /// Set the decrypted (armored) private key.
    pub fn raw_key(mut self, raw_key: impl Into<Vec<u8>>) -> Self {
        let raw_key = raw_key.into();
        self.raw_key = (!raw_key.is_empty()).then(|| Zeroizing::new(raw_key));
        self
    }

    pub fn public_key(mut self, public_key: impl Into<String>) -> Self {
        let public_key = public_key.into();
        self.public_key = (!public_key.trim().is_empty()).then_some(public_key);
        self
    }

    pub fn encrypted_key(mut self, encrypted_key: impl Into<Vec<u8>>) -> Self {
        let encrypted_key = encrypted_key.into();
        self.encrypted_key = (!encrypted_key.is_empty()).then_some(encrypted_key);
        self
    }

    /// Ready for encryption and decryption once the raw key is known.
    pub fn is_ready(&self) -> bool {
        self.raw_key.is_some()
    }

    pub fn password_str(&self) -> Option<&str> {
        self.password.as_deref().map(String::as_str)
    }

    pub fn raw_key_bytes(&self) -> Option<&[u8]> {
        self.raw_key.as_deref().map(Vec::as_slice)
    }

    pub fn public_key_str(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub fn encrypted_key_bytes(&self) -> Option<&[u8]> {
        self.encrypted_key.as_deref()
    }

    /// Build the encrypt/decrypt pair for this material.
    ///
    /// `disk` only labels the error when the public key is missing.
    pub fn key_ring(&self, disk: &str) -> Result<(EncryptCapability, DecryptCapability)> {
        let (Some(raw_key), Some(public_key)) = (self.raw_key_bytes(), self.public_key_str())
        else {
            return Err(KtError::IncompleteKeyData {
                disk: disk.to_string(),
            });
        };

        let private_key = std::str::from_utf8(raw_key)
            .map_err(|_| KtError::KeyParse("private key is not armored text".into()))?;

        KeyRing::build(public_key, private_key, self.password_str().unwrap_or_default())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("encrypted_key", &self.encrypted_key.as_ref().map(|_| "<set>"))
            .field("raw_key", &self.raw_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key.as_ref().map(|_| "<set>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolves key material against the remote API on behalf of one token.
pub struct KeyResolver<'a> {
    gateway: &'a dyn ApiGateway,
    token: &'a str,
}

impl<'a> KeyResolver<'a> {
    pub fn new(gateway: &'a dyn ApiGateway, token: &'a str) -> Self {
        Self { gateway, token }
    }

    /// Return `material` unchanged when ready, otherwise a newly resolved value for `disk`
    /// (empty `disk` selects the user's default disk).
    pub fn resolve(&self, material: KeyMaterial, disk: &str) -> Result<KeyMaterial> {
        if material.is_ready() {
            return Ok(material);
        }

        let Some(password) = material.password.clone() else {
            return Err(KtError::MissingCredentials);
        };

        let record = api::user_disk(self.gateway, self.token, disk)?;
        if record.crypto_key.trim().is_empty() {
            return Err(KtError::IncompleteKeyData {
                disk: if record.id.is_empty() {
                    disk.to_string()
                } else {
                    record.id
                },
            });
        }

        tracing::debug!(disk = %record.id, "decrypting server-held key");
        let raw_key = gpg::decrypt_with_password(&record.crypto_key, &password)?;

        Ok(KeyMaterial {
            encrypted_key: Some(record.crypto_key.into_bytes()),
            raw_key: Some(raw_key),
            public_key: (!record.public_key.trim().is_empty()).then_some(record.public_key),
            password: Some(password),
        })
    }
}
