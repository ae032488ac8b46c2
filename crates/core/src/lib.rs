//! Shipline Core - Shared types library.
//!
//! This crate provides common types used across all Shipline components:
//! - `worker` - Event-driven persistence worker (broker → `PostgreSQL`)
//! - `cli` - Command-line tools for migrations and manual event re-publishing
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no broker clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, tracking numbers, and event kinds
//! - [`payload`] - Wire shapes of the JSON events published by upstream services

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod payload;
pub mod types;

pub use types::*;
