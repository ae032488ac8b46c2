//! Shipline Worker library.
//!
//! Bridges the event bus to `PostgreSQL`: one consumer loop per event queue
//! decodes each message, expands it into relational rows and commits them.
//! Exposed as a library so the loops can be driven against an in-memory
//! store in tests.
//!
//! # Delivery semantics
//!
//! By default messages are acknowledged on receipt, so a message whose
//! persistence fails is dropped, not redelivered. Recovery is manual
//! (re-publish with `shipline publish`).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod broker;
pub mod config;
pub mod consumer;
pub mod db;
pub mod decode;
pub mod error;
pub mod models;
pub mod state;
pub mod telemetry;
