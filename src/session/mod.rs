//! Realtime session: wire types and the WebSocket transport.

pub mod live;
pub mod wire;

pub use live::{LiveSession, RealtimeSender, SessionEvent};
