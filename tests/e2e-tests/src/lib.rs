// E2E test framework for the Pebble fixture.
//
// The binaries under test are looked up next to the test executable, so
// build the workspace (`cargo build --workspace`) before running these.

pub mod assertions;
pub mod fixture;

pub use fixture::{FixtureInvocation, FixtureOutcome};

use std::env;
use std::path::PathBuf;

fn binary_path(name: &str) -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }
    path.push(name);

    if !path.exists() {
        panic!("{} binary not found at: {}", name, path.display());
    }
    path
}

/// Get the path to the pebble-fixture binary
pub fn get_fixture_path() -> PathBuf {
    binary_path("pebble-fixture")
}

/// Get the path to the fakepebble binary
pub fn get_fakepebble_path() -> PathBuf {
    binary_path("fakepebble")
}

/// Create a fresh directory for one test under target/tmp
pub fn create_test_dir(test_name: &str) -> PathBuf {
    let workspace_root = env::current_exe()
        .expect("Failed to get current exe path")
        .parent().expect("Failed to get parent")
        .parent().expect("Failed to get parent")
        .parent().expect("Failed to get workspace root")
        .to_path_buf();

    let temp_dir = workspace_root.join("target").join("tmp").join(format!("e2e-test-{}", test_name));

    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).ok();
    }
    std::fs::create_dir_all(&temp_dir).expect("Failed to create test directory");
    temp_dir
}

/// Clean up test directory
pub fn cleanup_test_dir(dir: &PathBuf) {
    if dir.exists() {
        std::fs::remove_dir_all(dir).ok();
    }
}
