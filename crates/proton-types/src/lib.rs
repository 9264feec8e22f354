//! Foundation types for the proton block layer.
//!
//! Every other proton crate depends on `proton-types`. The types here are pure
//! values: they hash, compare and serialize, and carry no behavior beyond that.
//!
//! # Key Types
//!
//! - [`Digest`]: 32-byte BLAKE3 digest
//! - [`Address`]: Typed, content-derived block identifier (network, family, component, digest)
//! - [`Revision`]: Revision selector for mutable blocks (`Last` or a specific number)
//! - [`Timestamp`]: Wall-clock creation time in milliseconds
//! - [`ErrorClass`]: Recoverability classification shared by all proton error types

pub mod address;
pub mod digest;
pub mod error;
pub mod revision;
pub mod temporal;

pub use address::{Address, Component, Family, Network};
pub use digest::Digest;
pub use error::{ErrorClass, TypeError};
pub use revision::Revision;
pub use temporal::Timestamp;
