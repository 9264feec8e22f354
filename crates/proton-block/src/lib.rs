//! Block model for the proton layer.
//!
//! A [`Block`] is the unit every higher-level structure (files, directories,
//! access lists, tree nodes) is cut into before it reaches storage. Blocks
//! come in two flavours:
//!
//! - **Immutable**: [`ContentHashBlock`], write-once, addressed by a hash of
//!   its content.
//! - **Mutable**: [`OwnerKeyBlock`], [`ImprintBlock`] and [`PublicKeyBlock`],
//!   addressed by a hash of identifying key material, advancing through signed
//!   revisions linked by fingerprints of their predecessors.
//!
//! # Operations
//!
//! - [`Block::bind`] computes the address; a pure function of serialized fields.
//! - [`Block::validate`] recomputes the address and checks every signature.
//! - [`Block::derives`] decides whether one revision legitimately succeeds another.
//! - [`Block::encrypt`] / [`Block::decrypt`] seal a block under a [`Secret`]
//!   into a content-hash envelope and back.
//! - [`Block::encode`] / [`Block::decode`] are the versioned wire codec.
//!
//! [`Secret`]: proton_crypto::Secret

pub mod block;
pub mod codec;
pub mod error;
pub mod header;
pub mod mutable;
pub mod seal;

pub use block::{Block, ContentHashBlock, ImprintBlock, OwnerKeyBlock, PublicKeyBlock};
pub use codec::FORMAT_V1;
pub use error::{BlockError, BlockResult};
pub use header::{BlockHeader, State};
pub use mutable::MutableBody;
