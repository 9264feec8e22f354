//! Transcript journal for the proton layer.
//!
//! A [`Journal`] takes the transcripts a nest produces and applies them to
//! storage in order, either before `record` returns or on a background
//! tokio task. Until a transcript is applied its pushes and wipes stay
//! visible through [`Journal::retrieve`], so a reader never falls behind a
//! writer. An optional [`WriteAheadLog`] keeps unprocessed transcripts
//! across restarts.

pub mod config;
pub mod error;
pub mod journal;
pub mod wal;

pub use config::{JournalConfig, JournalMode, SyncMode};
pub use error::{JournalError, JournalResult};
pub use journal::{ActionFailure, Journal, ProcessReport};
pub use wal::{WalEntry, WriteAheadLog};
