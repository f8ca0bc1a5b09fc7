//! Anonymous identity tokens for the Curtail URL shortener.
//!
//! Instead of a server-side session table, each anonymous user carries
//! a bearer token: their generated user ID sealed with AES-256-GCM
//! under a process-wide key. Validating a token re-derives the user ID
//! from the token itself, so the identity layer holds no state and
//! needs no coordination between requests.
//!
//! Every issued token uses a fresh random nonce, transmitted alongside
//! the ciphertext in the token envelope. Rotating the key invalidates
//! all outstanding tokens; holders are silently re-issued a new
//! identity, which is acceptable for anonymous users.

pub mod error;
pub mod key;
pub mod service;

pub use error::IdentityError;
pub use key::IdentityKey;
pub use service::{Credential, IdentityService};
