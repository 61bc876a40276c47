//! Snapshot persistence for nogan stores.
//!
//! Provides the [`SnapshotStore`] trait defining the storage contract that all
//! backends implement, plus the [`InMemoryStore`] and [`SqliteStore`]
//! backends.
//!
//! A snapshot is the store's JSON text together with a label and a blake3
//! digest of that text. Loading re-hashes the body and refuses to hand back a
//! snapshot whose digest no longer matches.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: SnapshotId, SnapshotSummary storage-layer types
//! - [`traits`]: SnapshotStore trait definition
//! - [`hash`]: blake3 snapshot digests
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: the `snapshots` table and connection setup
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod hash;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use hash::{digest, digest_hex};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::SnapshotStore;
pub use types::{SnapshotId, SnapshotSummary};
