//! Core types for Shipline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod event;
pub mod id;
pub mod tracking;

pub use event::{EventKind, UnknownEventKind};
pub use id::*;
pub use tracking::TrackingNumber;
