//! Fixture flow against the fakepebble daemon: working directory, PID
//! file, exit status and teardown.

use e2e_tests::assertions::{assert_exit_code, assert_pid_not_running, read_saved_pid};
use e2e_tests::{cleanup_test_dir, create_test_dir, get_fakepebble_path, get_fixture_path, FixtureInvocation};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(30);

#[test]
fn test_workdir_created_and_reused() {
    let test_dir = create_test_dir("workdir-created");
    let workdir = test_dir.join("nested").join("pebble");
    let invocation = FixtureInvocation::new(get_fakepebble_path(), &workdir, 47411)
        .shell("touch \"$PEBBLE/keep\"");

    let first = invocation.run(&get_fixture_path(), &test_dir, TIMEOUT).unwrap();
    assert_exit_code(&first, 0).unwrap();
    assert!(workdir.is_dir());

    let second = invocation
        .clone()
        .shell("test -f \"$PEBBLE/keep\"")
        .run(&get_fixture_path(), &test_dir, TIMEOUT)
        .unwrap();
    assert_exit_code(&second, 0).unwrap();
    assert!(!workdir.join("pebble.pid").exists());

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_exit_status_propagated_and_daemon_killed() {
    let test_dir = create_test_dir("exit-status");
    let workdir = test_dir.join("pebble");
    let saved = test_dir.join("saved.pid");
    let outcome = FixtureInvocation::new(get_fakepebble_path(), &workdir, 47412)
        .shell(format!("cp \"$PEBBLE/pebble.pid\" '{}'; exit 3", saved.display()))
        .run(&get_fixture_path(), &test_dir, TIMEOUT)
        .unwrap();

    assert_exit_code(&outcome, 3).unwrap();
    let pid = read_saved_pid(&saved).unwrap();
    assert_pid_not_running(pid).unwrap();

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_teardown_runs_when_tests_fail() {
    let test_dir = create_test_dir("teardown-on-failure");
    let workdir = test_dir.join("pebble");
    let saved = test_dir.join("saved.pid");
    let outcome = FixtureInvocation::new(get_fakepebble_path(), &workdir, 47413)
        .shell(format!("cp \"$PEBBLE/pebble.pid\" '{}'; kill -9 $$", saved.display()))
        .run(&get_fixture_path(), &test_dir, TIMEOUT)
        .unwrap();

    // killed by SIGKILL: 128 + 9
    assert_exit_code(&outcome, 137).unwrap();
    assert_pid_not_running(read_saved_pid(&saved).unwrap()).unwrap();

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_test_command_environment() {
    let test_dir = create_test_dir("environment");
    let workdir = test_dir.join("pebble");
    let outcome = FixtureInvocation::new(get_fakepebble_path(), &workdir, 47414)
        .shell(format!(
            "test \"$PEBBLE\" = '{}' && test \"$RUN_REAL_PEBBLE_TESTS\" = 1",
            workdir.display()
        ))
        .run(&get_fixture_path(), &test_dir, TIMEOUT)
        .unwrap();

    assert_exit_code(&outcome, 0).unwrap();
    cleanup_test_dir(&test_dir);
}

#[test]
fn test_readiness_probe_passes() {
    let test_dir = create_test_dir("probe");
    let workdir = test_dir.join("pebble");
    let outcome = FixtureInvocation::new(get_fakepebble_path(), &workdir, 47415)
        .probe("http://127.0.0.1:47415/v1/health")
        .shell("exit 0")
        .run(&get_fixture_path(), &test_dir, TIMEOUT)
        .unwrap();

    assert_exit_code(&outcome, 0).unwrap();
    cleanup_test_dir(&test_dir);
}
