//! URL shortening service for Curtail.
//!
//! This crate orchestrates the codec and the dual persistence
//! backends into the operations the boundary layer calls: create,
//! batch create, per-user listing, and resolution, plus the
//! asynchronous deletion pipeline that applies bulk soft-deletes
//! through a fixed worker pool. Core types are re-exported from
//! `curtail_core`.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;

pub use config::Config;
pub use error::ShortenError;
pub use pipeline::{DeletionPipeline, SubmitError};
pub use service::{BatchCreated, BatchRequestItem, Created, ShortenService, UserLink};
