//! WebSocket support for streaming sync progress.

mod protocol;

pub use protocol::*;
