//! Cryptographic primitives for the proton block layer.
//!
//! Provides domain-separated BLAKE3 hashing, Ed25519 signing/verification, and
//! AES-256-GCM sealing of block contents under per-block secrets.
//!
//! All operations wrap established libraries; nothing here is custom cryptography.

pub mod cipher;
pub mod hasher;
pub mod signer;

pub use cipher::{decrypt, encrypt, CipherError, Secret};
pub use hasher::ContentHasher;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
