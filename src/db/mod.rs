//! Durable server-side storage.
//!
//! One JSON document on disk is the source of truth for the server.

mod repository;

pub use repository::*;
