//! # fileops-process
//!
//! Low-level process operations for the Pebble test fixture.
//!
//! This crate provides Unix primitives for:
//! - Resolving and spawning the daemon and the test command
//! - Process existence verification
//! - Signal based termination

pub mod check;
pub mod execute;
pub mod terminate;
pub mod validation;

// Re-export main types
pub use check::*;
pub use execute::*;
pub use terminate::*;
pub use validation::*;
