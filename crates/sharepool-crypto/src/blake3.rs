//! Domain-separated BLAKE3 key derivation.
//!
//! Every derived key uses a registered context string so keys for different
//! purposes can never collide even when derived from the same secret.

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const CREDENTIAL_ENCRYPTION_KEY: &str = "SharePool v1 credential-encryption-key";

    /// All registered context strings. Used for validation.
    pub const ALL_CONTEXTS: &[&str] = &[CREDENTIAL_ENCRYPTION_KEY];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a 32-byte key using BLAKE3's key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string from [`contexts`]
/// * `key_material` - The input key material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    ::blake3::derive_key(context, key_material)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_prefixed() {
        for ctx in contexts::ALL_CONTEXTS {
            assert!(ctx.starts_with("SharePool v1 "), "bad context {ctx}");
        }
    }

    #[test]
    fn test_derive_key_domain_separated() {
        let a = derive_key(contexts::CREDENTIAL_ENCRYPTION_KEY, b"secret");
        let b = derive_key("SharePool v1 other", b"secret");
        assert_ne!(a, b);
        assert_ne!(a, hash(b"secret"));
    }

    #[test]
    fn test_derive_key_deterministic() {
        let a = derive_key(contexts::CREDENTIAL_ENCRYPTION_KEY, b"secret");
        let b = derive_key(contexts::CREDENTIAL_ENCRYPTION_KEY, b"secret");
        assert_eq!(a, b);
    }
}
