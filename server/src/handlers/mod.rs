//! Request handlers for sync and maintenance operations.

mod maintenance;
mod sync;
mod websocket;

pub use maintenance::*;
pub use sync::*;
pub use websocket::*;
