//! # fileops-fixture
//!
//! Runs a test command against a throwaway Pebble daemon:
//!
//! 1. create the working directory (no-op if it exists)
//! 2. start `pebble run --http <addr> --create-dirs` and record its PID
//! 3. wait a fixed settle delay, optionally probe `/v1/health`
//! 4. run the test command with `PEBBLE` and `RUN_REAL_PEBBLE_TESTS=1` set
//! 5. kill the daemon by its recorded PID, whatever step 4 returned
//!
//! The test command's exit code is the result of the run.

pub mod config;
pub mod lifecycle;

pub use config::{FixtureConfig, ReadinessProbeConfig, PEBBLE_ENV};
pub use lifecycle::{FixturePhase, FixtureRunner, SETUP_FAILURE_EXIT_CODE};
