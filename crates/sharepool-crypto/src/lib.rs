//! # sharepool-crypto
//!
//! Cryptographic primitives for the SharePool marketplace.
//!
//! Shared streaming credentials are stored encrypted under a server-held
//! secret and are only decrypted for a buyer holding a live access grant.
//! User passwords are stored as Argon2id PHC strings.
//!
//! ## Modules
//!
//! - [`blake3`]: Domain-separated key derivation
//! - [`chacha20`]: ChaCha20-Poly1305 AEAD encryption (RFC 8439)
//! - [`credentials`]: The reversible credential cipher used by the market
//! - [`password`]: Argon2id password hashing and verification

pub mod blake3;
pub mod chacha20;
pub mod credentials;
pub mod password;

pub use credentials::{AeadCredentialCipher, CredentialCipher};

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    AeadEncryption,

    /// Invalid key length.
    #[error("invalid key length: expected at least {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Argon2id hashing failed.
    #[error("argon2id error: {0}")]
    Argon2(String),

    /// Stored ciphertext or key material is malformed.
    #[error("invalid encoding: {0}")]
    Encoding(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
