//! Repository implementations using `SQLite`.
//!
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod sqlite_location_repository;

pub use sqlite_location_repository::SqliteLocationRepository;
