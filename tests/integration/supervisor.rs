#[path = "common/mod.rs"]
mod common;

use std::{fs, thread, time::Duration};

use common::{Fixture, record_term, send_signal, wait_for_exit, wait_for_path};
use nix::sys::signal::Signal;
use tempfile::tempdir;

#[test]
fn dependent_crash_fails_and_terminates_independent() {
    let temp = tempdir().expect("failed to create tempdir");
    let term_marker = temp.path().join("independent.term");
    // The short delay lets the independent script install its trap first.
    let fixture = Fixture::new(temp.path(), &record_term(&term_marker), "sleep 0.5\nexit 1");
    let _listener = fixture.bind_endpoint();

    let mut supervisor = fixture.spawn_supervisor();
    let status = wait_for_exit(&mut supervisor, Duration::from_secs(10));

    assert_eq!(status.code(), Some(1));
    wait_for_path(&term_marker);
    assert_eq!(fs::read_to_string(&term_marker).unwrap().trim(), "terminated");
}

#[test]
fn dependent_waits_for_endpoint() {
    let temp = tempdir().expect("failed to create tempdir");
    let started = temp.path().join("dependent.started");
    let fixture = Fixture::new(
        temp.path(),
        "while true; do sleep 0.1; done",
        &format!("touch {}\nwhile true; do sleep 0.1; done", started.display()),
    );

    let mut supervisor = fixture.spawn_supervisor();

    // Several probe intervals pass with nothing listening.
    thread::sleep(Duration::from_millis(800));
    assert!(fixture.path("app.conf").exists());
    assert!(!started.exists(), "dependent started before the endpoint was reachable");

    let _listener = fixture.bind_endpoint();
    wait_for_path(&started);

    send_signal(&supervisor, Signal::SIGINT);
    let status = wait_for_exit(&mut supervisor, Duration::from_secs(10));
    assert_eq!(status.code(), Some(0));
}

#[test]
fn interrupt_exits_successfully_and_terminates_both() {
    let temp = tempdir().expect("failed to create tempdir");
    let independent_marker = temp.path().join("independent.term");
    let dependent_marker = temp.path().join("dependent.term");
    let fixture = Fixture::new(
        temp.path(),
        &record_term(&independent_marker),
        &record_term(&dependent_marker),
    );
    let _listener = fixture.bind_endpoint();

    let mut supervisor = fixture.spawn_supervisor();
    thread::sleep(Duration::from_millis(800));

    send_signal(&supervisor, Signal::SIGINT);
    let status = wait_for_exit(&mut supervisor, Duration::from_secs(10));

    assert_eq!(status.code(), Some(0));
    wait_for_path(&independent_marker);
    wait_for_path(&dependent_marker);
}

#[test]
fn terminate_exits_with_failure() {
    let temp = tempdir().expect("failed to create tempdir");
    let independent_marker = temp.path().join("independent.term");
    let dependent_marker = temp.path().join("dependent.term");
    let fixture = Fixture::new(
        temp.path(),
        &record_term(&independent_marker),
        &record_term(&dependent_marker),
    );
    let _listener = fixture.bind_endpoint();

    let mut supervisor = fixture.spawn_supervisor();
    thread::sleep(Duration::from_millis(800));

    send_signal(&supervisor, Signal::SIGTERM);
    let status = wait_for_exit(&mut supervisor, Duration::from_secs(10));

    assert_eq!(status.code(), Some(1));
    wait_for_path(&independent_marker);
    wait_for_path(&dependent_marker);
}

#[test]
fn interrupt_while_probing_never_starts_dependent() {
    let temp = tempdir().expect("failed to create tempdir");
    let started = temp.path().join("dependent.started");
    let independent_marker = temp.path().join("independent.term");
    let fixture = Fixture::new(
        temp.path(),
        &record_term(&independent_marker),
        &format!("touch {}", started.display()),
    );

    let mut supervisor = fixture.spawn_supervisor();
    thread::sleep(Duration::from_millis(500));

    send_signal(&supervisor, Signal::SIGINT);
    let status = wait_for_exit(&mut supervisor, Duration::from_secs(10));

    assert_eq!(status.code(), Some(0));
    wait_for_path(&independent_marker);
    assert!(!started.exists());
}
