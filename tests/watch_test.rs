use serial_test::serial;
use std::fs;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use customui::{Compiler, Invalidation, InvalidationKind};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

fn wait_for(events: &Receiver<Invalidation>, kind: InvalidationKind) -> Option<Invalidation> {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(remaining) {
            Ok(invalidation) if invalidation.kind == kind => return Some(invalidation),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

#[test]
#[serial]
fn test_modification_invalidates_cache() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("menu.html");
    fs::write(&path, "<p>one</p>").unwrap();

    let compiler = Compiler::new();
    let first = compiler.parse_file(&path).unwrap();
    assert_eq!(first.build(), r#"Label { Text: "one"; }"#);

    let events = compiler.subscribe();
    compiler.watch_file_changes(&path).unwrap();
    fs::write(&path, "<p>two</p>").unwrap();

    let invalidation = wait_for(&events, InvalidationKind::Modified)
        .expect("modification should invalidate the cached template");
    assert_eq!(invalidation.path, path.canonicalize().unwrap());

    let second = compiler.parse_file(&path).unwrap();
    assert_eq!(second.build(), r#"Label { Text: "two"; }"#);
    assert!(compiler.is_watching(&path));
}

#[test]
#[serial]
fn test_removal_drops_watch() {
    let temp_dir = TempDir::new().unwrap();
    let kept = temp_dir.path().join("kept.html");
    let removed = temp_dir.path().join("removed.html");
    fs::write(&kept, "<div/>").unwrap();
    fs::write(&removed, "<div/>").unwrap();

    let compiler = Compiler::new();
    compiler.parse_file(&removed).unwrap();
    compiler.watch_file_changes(&kept).unwrap();
    compiler.watch_file_changes(&removed).unwrap();
    let events = compiler.subscribe();

    let canonical = removed.canonicalize().unwrap();
    fs::remove_file(&removed).unwrap();

    let invalidation = wait_for(&events, InvalidationKind::Removed)
        .expect("removal should be reported");
    assert_eq!(invalidation.path, canonical);
    assert!(!compiler.is_watching(&canonical));
    assert!(!compiler.cache().contains(&canonical));

    // Siblings in the same directory stay registered
    assert!(compiler.is_watching(&kept));
}

#[test]
#[serial]
fn test_unwatched_siblings_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let watched = temp_dir.path().join("watched.html");
    let other = temp_dir.path().join("other.html");
    fs::write(&watched, "<div/>").unwrap();
    fs::write(&other, "<div/>").unwrap();

    let compiler = Compiler::new();
    compiler.parse_file(&other).unwrap();
    let events = compiler.subscribe();
    compiler.watch_file_changes(&watched).unwrap();

    fs::write(&other, "<span>x</span>").unwrap();
    assert!(events.recv_timeout(Duration::from_millis(500)).is_err());
    assert!(compiler.cache().contains(&other));
}

#[test]
#[serial]
fn test_stop_all_watches_keeps_cache() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("menu.html");
    fs::write(&path, "<p>one</p>").unwrap();

    let compiler = Compiler::new();
    compiler.parse_file(&path).unwrap();
    compiler.watch_file_changes(&path).unwrap();
    let events = compiler.subscribe();

    let start = Instant::now();
    compiler.stop_all_watches();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!compiler.is_watching(&path));

    fs::write(&path, "<p>two</p>").unwrap();
    assert!(events.recv_timeout(Duration::from_millis(500)).is_err());
    assert_eq!(
        compiler.parse_file(&path).unwrap().build(),
        r#"Label { Text: "one"; }"#
    );
}

#[test]
fn test_watch_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = Compiler::new()
        .watch_file_changes(&temp_dir.path().join("missing.html"))
        .unwrap_err();
    assert!(matches!(err, customui::Error::NotFound(_)));
}
