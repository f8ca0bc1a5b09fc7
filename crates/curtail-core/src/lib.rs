//! Core types and traits for the Curtail URL shortener.
//!
//! This crate provides the shared vocabulary used by the identity,
//! storage, and shortening crates: the validated short key type, the
//! deterministic codec, the mapping data model, the store traits, and
//! the error taxonomy.

pub mod codec;
pub mod error;
pub mod mapping;
pub mod short_key;
pub mod store;

pub use error::{CoreError, StoreError};
pub use mapping::{BatchEntry, OwnedMapping};
pub use short_key::ShortKey;
pub use store::{DeleteStore, UserStore};
