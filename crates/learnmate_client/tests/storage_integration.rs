//! File-backed storage: one file per key, created on demand, removable.

use learnmate_client::{FileStorage, Storage};
use predicates::prelude::*;

#[test]
fn set_creates_directory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("state");
    let mut storage = FileStorage::new(&store_dir);

    storage.set("chat-history", r#"[{"id":"a"}]"#);

    let exists = predicate::path::exists();
    assert!(exists.eval(&store_dir.join("chat-history.json")));
    assert_eq!(storage.get("chat-history").as_deref(), Some(r#"[{"id":"a"}]"#));
}

#[test]
fn get_missing_key_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());

    assert!(storage.get("nothing-here").is_none());
}

#[test]
fn set_overwrites_previous_value() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FileStorage::new(dir.path());

    storage.set("slot", "one");
    storage.set("slot", "two");

    assert_eq!(storage.get("slot").as_deref(), Some("two"));
}

#[test]
fn remove_deletes_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FileStorage::new(dir.path());

    storage.set("slot", "value");
    storage.remove("slot");

    assert!(storage.get("slot").is_none());
    // Removing again is harmless.
    storage.remove("slot");
}
