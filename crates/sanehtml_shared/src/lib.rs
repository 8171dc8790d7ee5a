//! Shared functionality
//!
//! Node identifiers, source locations and the error types used by every sanehtml crate.

pub mod location;
pub mod node;
pub mod types;
