//! Persistence backends for the Curtail URL shortener.
//!
//! Two independent backends with no cross-backend transaction:
//! - [`FileLog`]: an in-memory map fronted by a durable append-only
//!   log, for deployments without a relational backend.
//! - [`PostgresStore`]: the authoritative owned-mapping store with
//!   uniqueness and soft-delete semantics.
//!
//! A crash between the two writes in a create can leave them out of
//! sync; the relational store wins for resolution, and the file log
//! reconciles itself through compaction on the next startup.
//!
//! [`InMemoryStore`] implements the same store traits without I/O,
//! for tests and storage-less setups.

pub mod file_log;
pub mod memory;
pub mod postgres;

pub use file_log::FileLog;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
