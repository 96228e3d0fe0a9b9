//! # Migrator Engine
//!
//! Bidirectional synchronization between the directory app's on-device store
//! and its remote document database.
//!
//! The directory holds three collections (employees, municipalities and
//! regional office sheets). Records are created and edited locally and
//! mirrored to remote documents; other devices pull those documents back.
//!
//! ## Components
//!
//! - [`LocalStore`], [`RemoteStore`], [`BlobStore`], [`StateStore`]: the
//!   collaborator traits. [`memory`] has in-memory implementations of each.
//! - [`identity`]: maps local keys and UUIDs to remote document IDs and back,
//!   with secondary-key matching for documents written by older clients.
//! - [`AttachmentPipeline`]: uploads employee photos and downloads them
//!   through an on-disk cache.
//! - [`SyncEngine`]: push-all, push-one, pull-all, delete propagation and
//!   duplicate removal.
//! - [`ResetEngine`]: development-only wipe and reseed.
//!
//! ## Quick Start
//!
//! ```rust
//! use migrator_engine::{
//!     memory::{MemoryBlobStore, MemoryLocalStore, MemoryRemoteStore, MemoryStateStore},
//!     Employee, EngineConfig, EntityKind, LocalStore, Stores, SyncEngine,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test_block_on(async {
//! let local = Arc::new(MemoryLocalStore::new());
//! let engine = SyncEngine::new(
//!     Stores {
//!         local: local.clone(),
//!         remote: Arc::new(MemoryRemoteStore::new()),
//!         blobs: Arc::new(MemoryBlobStore::new()),
//!         state: Arc::new(MemoryStateStore::new()),
//!     },
//!     &EngineConfig::default(),
//! );
//!
//! local.insert(Employee::new("Maria Souza").into()).await.unwrap();
//! assert_eq!(engine.push_all(EntityKind::Employee).await, Ok(1));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod attachment;
pub mod config;
pub mod document;
pub mod error;
pub mod identity;
pub mod locks;
pub mod memory;
pub mod record;
pub mod remote;
pub mod reset;
pub mod seed;
pub mod state;
pub mod store;
pub mod sync;

// Re-export main types at crate root
pub use attachment::AttachmentPipeline;
pub use config::{EngineConfig, RuntimeEnvironment};
pub use document::RemoteDocument;
pub use error::Error;
pub use identity::{remote_id_for, IdentityResolver, RegionalKey};
pub use record::{
    Employee, Entity, EntityKind, LocalKey, LocalRecord, Municipality, Project, ProjectStatus,
    RegionalInfo,
};
pub use remote::{BlobStore, RemoteStore};
pub use reset::{ResetEngine, ResetReport};
pub use state::StateStore;
pub use store::{ChangeSet, CommitSummary, LocalStore};
pub use sync::{
    MigrationOutcome, Stores, SyncEngine, SyncEvent, SyncOperation, SyncPhase, SyncTask,
};

/// Row number assigned by the local store.
pub type RowId = i64;
