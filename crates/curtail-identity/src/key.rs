use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;

/// Symmetric key material for the identity service.
///
/// The key is an explicit dependency injected at construction, never a
/// process global: tests isolate themselves with throwaway keys, and a
/// deployment rotates keys by restarting with new material, which
/// invalidates all outstanding anonymous tokens.
#[derive(Clone)]
pub struct IdentityKey([u8; 32]);

impl IdentityKey {
    /// Wraps existing 32-byte key material.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random key from the OS entropy source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("IdentityKey(..)")
    }
}
