//! `SQLite` persistence for medialoft.
//!
//! Provides the durable asset id → location token store used by the asset
//! manager to remember completed downloads across restarts.

#![deny(unsafe_code)]

pub mod repositories;
pub mod setup;

pub use repositories::SqliteLocationRepository;

// Re-export setup functions for convenient access
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
