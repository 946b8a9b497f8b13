//! Cryptographic utilities
//!
//! Provides SHA-256 content digests for uploaded media and consent documents.

mod hash;

pub use hash::*;
