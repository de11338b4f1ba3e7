//! Test utilities for CLI testing
//!
//! Provides shared output buffers, in-memory configuration sources and
//! helpers that dispatch against the full command tree.

pub mod mocks;

pub use mocks::{
    dispatch_from, dispatch_with, dispatch_with_input, shared_streams, MemorySource, SharedBuffer,
    TestState,
};
