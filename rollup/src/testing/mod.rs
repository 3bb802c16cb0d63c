//! Test doubles for the remote execution seam.
//!
//! Available to the crate's own tests and to downstream integration
//! tests; nothing here performs real I/O.

mod mocks;

pub use mocks::{respond, Invocation, ScriptedExecutor};
