//! High-level SDK for the proton layer.
//!
//! [`ProtonConfig`] describes storage, journal and nest settings and loads
//! from TOML. [`Depot`] wires them together: nests opened from a depot read
//! through the journal and commit their transcripts to it.

pub mod config;
pub mod depot;
pub mod error;
pub mod logging;

pub use config::{LogConfig, ProtonConfig, DEFAULT_NETWORK};
pub use depot::{open_storage, Depot};
pub use error::{SdkError, SdkResult};
pub use logging::{init_tracing, LogFormat};

pub use proton_block::{Block, State};
pub use proton_crypto::{Secret, SigningKey};
pub use proton_nest::{Clef, Handle, Nest, Transcript};
pub use proton_types::{Address, Component, Network, Revision};
