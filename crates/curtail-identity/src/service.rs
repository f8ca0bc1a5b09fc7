use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jiff::Timestamp;

use crate::error::IdentityError;
use crate::key::IdentityKey;

/// AES-256-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// A freshly issued identity: the generated user ID and the opaque
/// bearer token that encodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: String,
    pub token: String,
}

/// Issues and validates anonymous user tokens.
///
/// CPU-only: no I/O, no interior state beyond the cipher, safe to
/// share across request handlers.
#[derive(Clone)]
pub struct IdentityService {
    cipher: Aes256Gcm,
}

impl IdentityService {
    /// Creates a service sealing tokens under the given key.
    pub fn new(key: &IdentityKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
        }
    }

    /// Issues a fresh identity.
    ///
    /// The user ID is the current timestamp in nanoseconds, unique
    /// with overwhelming probability for a single issuing process. The
    /// token is `base64url(nonce || ciphertext)` with a random nonce
    /// drawn per call, so repeated issues never reuse a nonce under
    /// the same key.
    pub fn issue(&self) -> Result<Credential, IdentityError> {
        let user_id = generate_user_id();

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, user_id.as_bytes())
            .map_err(|e| IdentityError::Crypto(e.to_string()))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);

        Ok(Credential {
            user_id,
            token: URL_SAFE_NO_PAD.encode(envelope),
        })
    }

    /// Validates a presented token, returning the embedded user ID.
    ///
    /// Fails closed: any decoding, authentication, or corruption
    /// failure yields `None`, and the caller treats it exactly like a
    /// missing credential (issue a new identity, never reject).
    pub fn validate(&self, token: &str) -> Option<String> {
        let envelope = URL_SAFE_NO_PAD.decode(token).ok()?;
        if envelope.len() <= NONCE_LEN {
            return None;
        }

        let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;

        String::from_utf8(plaintext).ok()
    }
}

/// Time-derived user ID: nanoseconds since the Unix epoch.
fn generate_user_id() -> String {
    Timestamp::now().as_nanosecond().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IdentityService {
        IdentityService::new(&IdentityKey::generate())
    }

    #[test]
    fn issue_then_validate_round_trips() {
        let svc = service();
        let cred = svc.issue().unwrap();

        assert_eq!(svc.validate(&cred.token), Some(cred.user_id));
    }

    #[test]
    fn issued_user_ids_are_distinct() {
        let svc = service();
        let a = svc.issue().unwrap();
        let b = svc.issue().unwrap();
        assert_ne!(a.user_id, b.user_id);
    }

    #[test]
    fn tokens_for_one_user_never_share_a_nonce_prefix() {
        // Fresh nonce per issue: even the same plaintext seals to a
        // different envelope every time.
        let svc = service();
        let a = svc.issue().unwrap();
        let b = svc.issue().unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn any_mutated_byte_fails_validation() {
        let svc = service();
        let cred = svc.issue().unwrap();
        let raw = URL_SAFE_NO_PAD.decode(&cred.token).unwrap();

        for i in 0..raw.len() {
            let mut mutated = raw.clone();
            mutated[i] ^= 0x01;
            let token = URL_SAFE_NO_PAD.encode(&mutated);
            assert_eq!(svc.validate(&token), None, "byte {} accepted", i);
        }
    }

    #[test]
    fn foreign_key_tokens_fail_closed() {
        let issuer = service();
        let other = service();
        let cred = issuer.issue().unwrap();

        assert_eq!(other.validate(&cred.token), None);
    }

    #[test]
    fn garbage_tokens_fail_closed() {
        let svc = service();
        assert_eq!(svc.validate(""), None);
        assert_eq!(svc.validate("not base64 at all!!"), None);
        // Valid base64 but too short to hold a nonce.
        assert_eq!(svc.validate(&URL_SAFE_NO_PAD.encode(b"tiny")), None);
    }

    #[test]
    fn same_key_material_validates_across_instances() {
        let key = IdentityKey::new([42u8; 32]);
        let a = IdentityService::new(&key);
        let b = IdentityService::new(&key);

        let cred = a.issue().unwrap();
        assert_eq!(b.validate(&cred.token), Some(cred.user_id));
    }
}
