//! Test infrastructure for the facet index.
//!
//! Provides a recording backend that captures every statement instead of
//! executing it, plus fixture items, terms and filter configurations.

pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use fixtures::*;
pub use harness::*;
