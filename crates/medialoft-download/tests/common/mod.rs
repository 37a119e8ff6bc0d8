//! Common test utilities.
//!
//! Shared infrastructure for driving an `AssetManager` against a scripted
//! transport and a real (in-memory or file-backed) `SQLite` location store.

#![allow(dead_code)]

pub mod fixtures;
pub mod transport;
