//! Reversible cipher for shared streaming credentials.
//!
//! Stored form: `v1.` followed by standard base64 of `nonce || ciphertext || tag`.
//! The key is derived from the server secret with
//! [`contexts::CREDENTIAL_ENCRYPTION_KEY`](crate::blake3::contexts::CREDENTIAL_ENCRYPTION_KEY),
//! so the raw secret is never used as a cipher key directly.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::chacha20::{self, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::{blake3, CryptoError, Result};

/// Prefix identifying the stored ciphertext format.
const FORMAT_PREFIX: &str = "v1.";

/// Authenticated data bound into every credential ciphertext.
const CREDENTIAL_AAD: &[u8] = b"sharepool-credential";

/// Minimum length of a server secret in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Symmetric, keyed, reversible text cipher.
///
/// `decrypt(encrypt(x)) == x` for every string, including the empty string.
pub trait CredentialCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// ChaCha20-Poly1305 implementation of [`CredentialCipher`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AeadCredentialCipher {
    key: [u8; KEY_SIZE],
}

impl AeadCredentialCipher {
    /// Build a cipher from raw secret bytes.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::InvalidKeyLength`] if the secret is shorter than [`MIN_SECRET_LEN`]
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }
        Ok(Self {
            key: blake3::derive_key(blake3::contexts::CREDENTIAL_ENCRYPTION_KEY, secret),
        })
    }

    /// Build a cipher from a hex-encoded secret, as carried in config files.
    pub fn from_hex_secret(secret_hex: &str) -> Result<Self> {
        let mut secret = hex::decode(secret_hex.trim())
            .map_err(|e| CryptoError::Encoding(format!("credential secret: {e}")))?;
        let cipher = Self::from_secret(&secret);
        secret.zeroize();
        cipher
    }
}

impl std::fmt::Debug for AeadCredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadCredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher for AeadCredentialCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = chacha20::random_nonce();
        let sealed = chacha20::encrypt(&self.key, &nonce, plaintext.as_bytes(), CREDENTIAL_AAD)?;

        let mut framed = Vec::with_capacity(NONCE_SIZE + sealed.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&sealed);
        Ok(format!("{FORMAT_PREFIX}{}", STANDARD.encode(framed)))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let body = ciphertext
            .strip_prefix(FORMAT_PREFIX)
            .ok_or_else(|| CryptoError::Encoding("unknown credential format".into()))?;
        let framed = STANDARD
            .decode(body)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        if framed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Encoding("credential ciphertext truncated".into()));
        }

        let (nonce_bytes, sealed) = framed.split_at(NONCE_SIZE);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);

        let plaintext = chacha20::decrypt(&self.key, &nonce, sealed, CREDENTIAL_AAD)?;
        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::InvalidInput("credential is not valid UTF-8".into()))
    }
}
