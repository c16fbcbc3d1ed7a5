// tests/processed_store.rs
use std::fs;

use feed_thread_relay::store::{FileProcessedStore, ProcessedStore};

#[test]
fn commit_appends_one_line_per_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("processed_posts.txt");
    let store = FileProcessedStore::new(&path);

    store.commit("https://papers.example/1").unwrap();
    store.commit("paper-2").unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "https://papers.example/1\npaper-2\n"
    );
    let set = store.load().unwrap();
    assert!(set.contains("https://papers.example/1"));
    assert!(set.contains("paper-2"));
}

#[test]
fn duplicate_commit_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileProcessedStore::new(dir.path().join("processed_posts.txt"));

    store.commit("a").unwrap();
    store.commit("a").unwrap();

    let set = store.load().unwrap();
    assert!(set.contains("a"));
    assert_eq!(set.len(), 1);
}

#[test]
fn state_survives_a_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("processed_posts.txt");
    FileProcessedStore::new(&path).commit("a").unwrap();

    let reopened = FileProcessedStore::new(&path);
    assert!(reopened.load().unwrap().contains("a"));
}

#[test]
fn existing_file_from_older_runs_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("processed_posts.txt");
    // Written by hand, without a trailing newline.
    fs::write(&path, "old-1\nold-2").unwrap();

    let store = FileProcessedStore::new(&path);
    store.commit("new-3").unwrap();
    let set = store.load().unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(fs::read_to_string(&path).unwrap(), "old-1\nold-2\nnew-3\n");
    assert!(set.contains("old-2"));
    assert!(set.contains("new-3"));
}
