//! Realtime runtime for roomcast gateway.
//!
//! Session registry + room index + snapshot persistence.

pub mod core;

pub use self::core::{
    Connection, ConnectionPeer, RoomIndex, Session, SessionCtx, SessionRegistry, SessionState,
    SnapshotError,
};
