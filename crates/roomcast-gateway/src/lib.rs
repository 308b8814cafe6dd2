//! roomcast gateway library entry.
//!
//! This crate wires the transport, dispatcher, session-routing core, and
//! built-in services into a cohesive gateway stack. It is intended to be
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod history;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod services;
pub mod transport;
