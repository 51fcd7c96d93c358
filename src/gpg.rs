//! # OpenPGP Key Rings
//!
//! Turns armored key text into the two capabilities a transfer needs:
//!
//! - [`EncryptCapability`] wraps a public key and encrypts byte streams to it
//! - [`DecryptCapability`] wraps a private key together with its passphrase
//!
//! Both are built fresh for every transfer by [`KeyRing::build`] and dropped when the transfer
//! ends. The passphrase held by a [`DecryptCapability`] is wiped when the capability is dropped,
//! so every exit path of the owning scope releases it.
//!
//! Messages are produced as binary OpenPGP: one PKESK for the recipient key, then a SEIPD v1
//! (AES-256) packet holding ZLIB compressed literal data that carries the file name and the time
//! of encryption. See [`crate::packet`] for the framing.

use std::io::{self, Read, Write};

use chrono::Utc;
use pgp::{
    composed::{Deserializable, Message, SignedPublicKey, SignedPublicSubKey, SignedSecretKey},
    crypto::sym::SymmetricKeyAlgorithm,
    errors::Error as PgpError,
    packet::{KeyFlags, PacketTrait, PublicKey, PublicKeyEncryptedSessionKey, PublicSubkey},
    types::Password,
};
use rand::rngs::OsRng;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{KtError, Result};
use crate::packet;

const SESSION_CIPHER: SymmetricKeyAlgorithm = SymmetricKeyAlgorithm::AES256;

/// Builder for per-transfer key pairs.
pub struct KeyRing;

impl KeyRing {
    /// Parse both armored keys and unlock the private one with `passphrase`.
    pub fn build(
        public_armored: &str,
        private_armored: &str,
        passphrase: &str,
    ) -> Result<(EncryptCapability, DecryptCapability)> {
        let encryptor = EncryptCapability::from_armored(public_armored)?;
        let decryptor = DecryptCapability::unlock(private_armored, passphrase)?;
        Ok((encryptor, decryptor))
    }
}

/// Public-key encryption bound to one recipient key.
pub struct EncryptCapability {
    key: SignedPublicKey,
}

impl EncryptCapability {
    pub fn from_armored(armored: &str) -> Result<Self> {
        let (key, _headers) =
            SignedPublicKey::from_armor_single(armored.trim().as_bytes()).map_err(map_parse_err)?;
        Ok(Self { key })
    }

    /// Whether the key (or one of its subkeys) is flagged for encryption.
    pub fn can_encrypt(&self) -> bool {
        select_recipient_key(&self.key).is_some()
    }

    /// Encrypt everything read from `input` into `output`.
    ///
    /// The message trailer is written before this returns, so `output` holds a complete
    /// message once the call succeeds.
    pub fn encrypt_stream<R: Read>(
        &self,
        file_name: &str,
        input: R,
        output: &mut dyn Write,
    ) -> Result<()> {
        let recipient = select_recipient_key(&self.key).ok_or(KtError::KeyNotEncryptionCapable)?;

        let mut rng = OsRng;
        let session_key = SESSION_CIPHER.new_session_key(&mut rng);
        let esk = match recipient {
            RecipientKey::Primary(pk) => PublicKeyEncryptedSessionKey::from_session_key_v3(
                &mut rng,
                &session_key,
                SESSION_CIPHER,
                pk,
            ),
            RecipientKey::Subkey(subkey) => PublicKeyEncryptedSessionKey::from_session_key_v3(
                &mut rng,
                &session_key,
                SESSION_CIPHER,
                subkey,
            ),
        }
        .map_err(map_encrypt_err)?;
        let mut esk_packet = Vec::new();
        esk.to_writer_with_header(&mut esk_packet).map_err(map_encrypt_err)?;
        output.write_all(&esk_packet)?;

        let plaintext = packet::compressed(packet::literal(file_name, Utc::now(), input));
        let encrypted = SESSION_CIPHER
            .stream_encryptor(&mut rng, session_key.as_ref(), plaintext)
            .map_err(map_encrypt_err)?;
        io::copy(&mut packet::seipd_v1(encrypted), output)?;
        Ok(())
    }

    pub fn encrypt_bytes(&self, file_name: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut encrypted = Vec::new();
        self.encrypt_stream(file_name, plaintext, &mut encrypted)?;
        Ok(encrypted)
    }
}

/// Private-key decryption. The passphrase is zeroed when this value is dropped.
pub struct DecryptCapability {
    key: SignedSecretKey,
    passphrase: Zeroizing<String>,
}

impl DecryptCapability {
    /// Parse `armored` and check that `passphrase` unlocks it.
    pub fn unlock(armored: &str, passphrase: &str) -> Result<Self> {
        let (key, _headers) =
            SignedSecretKey::from_armor_single(armored.trim().as_bytes()).map_err(map_parse_err)?;

        let password = Password::from(passphrase);
        key.primary_key
            .unlock(&password, |_, _| Ok(()))
            .map_err(|_| KtError::UnlockFailed)?
            .map_err(|_| KtError::UnlockFailed)?;

        Ok(Self {
            key,
            passphrase: Zeroizing::new(passphrase.to_string()),
        })
    }

    /// Decrypt a complete binary message. Nothing is returned unless the integrity check passed.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let message = Message::from_bytes(ciphertext).map_err(map_decrypt_err)?;
        let password = Password::from(self.passphrase.as_str());
        let message = message.decrypt(&password, &self.key).map_err(map_decrypt_err)?;
        read_literal(message)
    }
}

impl Drop for DecryptCapability {
    fn drop(&mut self) {
        self.passphrase.zeroize();
        tracing::trace!("private key capability released");
    }
}

/// Decrypt an armored, passphrase-encrypted message (the server-held key).
pub fn decrypt_with_password(armored: &str, password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let (message, _headers) =
        Message::from_armor(armored.trim().as_bytes()).map_err(map_decrypt_err)?;
    let message = message
        .decrypt_with_password(&Password::from(password))
        .map_err(map_decrypt_err)?;
    read_literal(message)
}

fn read_literal(mut message: Message<'_>) -> Result<Zeroizing<Vec<u8>>> {
    if message.is_compressed() {
        message = message.decompress().map_err(map_decrypt_err)?;
    }
    let data = message.as_data_vec().map_err(PgpError::from).map_err(map_decrypt_err)?;
    Ok(Zeroizing::new(data))
}

enum RecipientKey<'a> {
    Primary(&'a PublicKey),
    Subkey(&'a PublicSubkey),
}

fn select_recipient_key(signed_key: &SignedPublicKey) -> Option<RecipientKey<'_>> {
    signed_key
        .public_subkeys
        .iter()
        .find(|subkey| subkey_supports_encryption(subkey))
        .map(|subkey| RecipientKey::Subkey(&subkey.key))
        .or_else(|| {
            primary_supports_encryption(signed_key)
                .then_some(RecipientKey::Primary(&signed_key.primary_key))
        })
}

fn subkey_supports_encryption(subkey: &SignedPublicSubKey) -> bool {
    subkey
        .signatures
        .iter()
        .any(|sig| key_flags_allow_encryption(&sig.key_flags()))
}

fn primary_supports_encryption(signed_key: &SignedPublicKey) -> bool {
    let details = &signed_key.details;
    details
        .direct_signatures
        .iter()
        .chain(details.users.iter().flat_map(|user| user.signatures.iter()))
        .any(|sig| key_flags_allow_encryption(&sig.key_flags()))
}

fn key_flags_allow_encryption(flags: &KeyFlags) -> bool {
    flags.encrypt_comms() || flags.encrypt_storage()
}

fn map_parse_err(err: PgpError) -> KtError {
    KtError::KeyParse(err.to_string())
}

fn map_encrypt_err(err: PgpError) -> KtError {
    KtError::Io(io::Error::other(format!("encryption failed: {err}")))
}

fn map_decrypt_err(err: PgpError) -> KtError {
    KtError::DecryptionFailed(err.to_string())
}
