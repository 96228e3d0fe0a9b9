//! SQLite persistence for the on-device directory store.

mod pool;
mod records;
mod state;

pub use pool::*;
pub use records::*;
pub use state::*;

/// Convert a database failure into the engine's local-store error.
fn local_error(e: sqlx::Error) -> migrator_engine::Error {
    migrator_engine::Error::Local(e.to_string())
}
