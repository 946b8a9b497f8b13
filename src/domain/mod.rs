//! Domain models for the compliance pipeline
//!
//! Verdicts, consent metadata, flag sources and audit events.

mod audit;
mod consent;
mod flags;
mod verdict;

pub use audit::*;
pub use consent::*;
pub use flags::*;
pub use verdict::*;
