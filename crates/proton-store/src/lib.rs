//! Block storage for the proton layer.
//!
//! Storage is the persistence backend below the nest and the journal. It is a
//! key-value store from [`Address`] to encoded [`Block`], with one rule the
//! backends may not relax: overwriting an address goes through
//! [`arbitrate`], which rejects rewrites of immutable blocks and accepts a
//! mutable block only if it derives the stored revision (or wins the
//! deterministic tie-break at equal revisions).
//!
//! # Backends
//!
//! All backends implement the [`Storage`] trait:
//!
//! - [`InMemoryStorage`]: `HashMap`-based store for tests and embedding
//! - [`DirectoryStorage`]: one file per address under a fan-out directory
//!
//! # Rules
//!
//! 1. `load`/`exist` are safe to call concurrently.
//! 2. `store`/`erase` on the same address are serialized by the backend.
//! 3. Every stored block validates against the address it is stored under.
//! 4. Loaded blocks are freshly decoded and therefore clean.
//! 5. No retries: the first failure is returned.
//!
//! [`Address`]: proton_types::Address
//! [`Block`]: proton_block::Block

pub mod config;
pub mod conflict;
pub mod directory;
pub mod error;
pub mod memory;
pub mod traits;

pub use config::{StorageBackend, StorageConfig};
pub use conflict::{arbitrate, winner, Verdict};
pub use directory::DirectoryStorage;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStorage;
pub use traits::Storage;
