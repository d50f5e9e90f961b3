//! `hookpipe` crate (library surface).
//!
//! The primary entrypoint for end users is the `hookpipe` binary. This library module
//! re-exports the core and HTTP crates so embedders can reuse them without depending on
//! the internal crate layout, and hosts the stdin reader the binary uses.

pub mod input;

pub use hookpipe_core as core;
pub use hookpipe_local as local;
