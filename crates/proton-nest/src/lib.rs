//! In-memory block cache for the proton layer.
//!
//! A [`Nest`] owns every block a higher-level operation is working on. Callers
//! never hold blocks directly: they hold [`Handle`]s, which resolve to an
//! [`Egg`] (the nest's descriptor of one block) and borrow its payload only
//! between [`Nest::load`] and [`Nest::unload`].
//!
//! Unused blocks sit on an LRU queue. Once the sum of their footprints passes
//! the configured threshold, the least recently used ones are sealed, written
//! through to [`Storage`] and dropped from memory. At the end of an operation
//! [`Nest::transcribe`] seals whatever is still dirty and hands back a
//! [`Transcript`]: every push, then every wipe.
//!
//! The nest is single-threaded. Handles share eggs through `Rc<RefCell<_>>`
//! and are therefore neither `Send` nor `Sync`.
//!
//! [`Storage`]: proton_store::Storage

pub mod clef;
pub mod config;
pub mod egg;
pub mod error;
pub mod handle;
pub mod nest;
pub mod pod;
pub mod stats;
pub mod transcript;

pub use clef::Clef;
pub use config::NestConfig;
pub use egg::{Egg, EggId, EggKind};
pub use error::{NestError, NestResult};
pub use handle::Handle;
pub use nest::Nest;
pub use stats::NestStatistics;
pub use transcript::{Action, Transcript};
