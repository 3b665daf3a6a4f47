//! The fixture must fail visibly, without running the tests, when the
//! daemon cannot be started.

use e2e_tests::assertions::{assert_exit_code, assert_log_contains};
use e2e_tests::{cleanup_test_dir, create_test_dir, get_fakepebble_path, get_fixture_path, FixtureInvocation};
use std::net::TcpListener;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(30);

#[test]
fn test_missing_binary_fails_without_running_tests() {
    let test_dir = create_test_dir("missing-binary");
    let marker = test_dir.join("tests-ran");
    let outcome = FixtureInvocation::new("/nonexistent/pebble", test_dir.join("pebble"), 47421)
        .shell(format!("touch '{}'", marker.display()))
        .run(&get_fixture_path(), &test_dir, TIMEOUT)
        .unwrap();

    assert_exit_code(&outcome, 1).unwrap();
    assert_log_contains(&outcome, "Process spawn failed").unwrap();
    assert!(!marker.exists());

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_occupied_port_fails_without_running_tests() {
    let test_dir = create_test_dir("occupied-port");
    let marker = test_dir.join("tests-ran");
    let _occupied = TcpListener::bind("127.0.0.1:47422").unwrap();

    let outcome = FixtureInvocation::new(get_fakepebble_path(), test_dir.join("pebble"), 47422)
        .shell(format!("touch '{}'", marker.display()))
        .run(&get_fixture_path(), &test_dir, TIMEOUT)
        .unwrap();

    assert_exit_code(&outcome, 1).unwrap();
    assert_log_contains(&outcome, "Process start failed").unwrap();
    assert!(!marker.exists());

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_missing_command_is_an_error() {
    let test_dir = create_test_dir("missing-command");
    let outcome = FixtureInvocation::new(get_fakepebble_path(), test_dir.join("pebble"), 47423)
        .run(&get_fixture_path(), &test_dir, TIMEOUT)
        .unwrap();

    assert_exit_code(&outcome, 1).unwrap();
    assert!(!test_dir.join("pebble").join("pebble.pid").exists());

    cleanup_test_dir(&test_dir);
}
