//! Session-routing core for the gateway runtime.
//!
//! Room index, sessions, the session registry that owns them, and the
//! snapshot format the registry persists across restarts.

mod ctx;
mod room_index;
mod session;
mod session_registry;
pub mod snapshot;

pub use ctx::SessionCtx;
pub use room_index::RoomIndex;
pub use session::{Connection, ConnectionPeer, Session, SessionState};
pub use session_registry::SessionRegistry;
pub use snapshot::SnapshotError;
