//! roomcast core: transport-agnostic wire contracts and the shared error type.
//!
//! This crate defines the inbound action envelope, the outbound payload shapes,
//! the history role tag, and the persisted session record shared by the gateway
//! and any tooling that reads its snapshot file. It carries no transport or
//! runtime dependencies so it can be reused in multiple contexts.
//!
//! # Panic-free guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `RoomcastError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, RoomcastError};
