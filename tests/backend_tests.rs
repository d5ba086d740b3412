//! Tests for the in-memory reference backend
//!
//! These tests verify the transactional contract the store relies on:
//! staging between begin() and commit(), del() existence reporting, and
//! bracket misuse detection.

use driftkv::{Backend, DriftError, MemoryBackend};

fn setup_backend() -> MemoryBackend {
    MemoryBackend::new()
}

// =============================================================================
// Transaction Bracket Tests
// =============================================================================

#[test]
fn test_commit_makes_writes_visible() {
    let mut backend = setup_backend();

    backend.begin().unwrap();
    backend.set("key", "value".into()).unwrap();

    // Staged writes are invisible until commit.
    assert_eq!(backend.get("key"), None);

    backend.commit().unwrap();
    assert_eq!(backend.get("key").as_deref(), Some(b"value".as_ref()));
}

#[test]
fn test_set_is_idempotent_upsert() {
    let mut backend = setup_backend();

    backend.begin().unwrap();
    backend.set("key", "v1".into()).unwrap();
    backend.commit().unwrap();

    backend.begin().unwrap();
    backend.set("key", "v2".into()).unwrap();
    backend.commit().unwrap();

    assert_eq!(backend.get("key").as_deref(), Some(b"v2".as_ref()));
    assert_eq!(backend.len(), 1);
}

#[test]
fn test_del_reports_existence() {
    let mut backend = setup_backend();

    backend.begin().unwrap();
    backend.set("key", "value".into()).unwrap();
    backend.commit().unwrap();

    backend.begin().unwrap();
    assert!(backend.del("key").unwrap());
    assert!(!backend.del("key").unwrap());
    assert!(!backend.del("never-existed").unwrap());
    backend.commit().unwrap();

    assert!(!backend.contains("key"));
}

#[test]
fn test_del_sees_writes_staged_in_same_transaction() {
    let mut backend = setup_backend();

    backend.begin().unwrap();
    backend.set("key", "value".into()).unwrap();
    // The staged set overrides the (empty) committed view.
    assert!(backend.del("key").unwrap());
    backend.commit().unwrap();

    assert!(!backend.contains("key"));
}

#[test]
fn test_deletes_then_sets_apply_in_order() {
    let mut backend = setup_backend();

    backend.begin().unwrap();
    backend.set("key", "old".into()).unwrap();
    backend.commit().unwrap();

    // The flush cycle applies deletes first, then sets; a key both
    // deleted and re-set in one bracket must survive with the new value.
    backend.begin().unwrap();
    backend.del("key").unwrap();
    backend.set("key", "new".into()).unwrap();
    backend.commit().unwrap();

    assert_eq!(backend.get("key").as_deref(), Some(b"new".as_ref()));
}

// =============================================================================
// Misuse Detection Tests
// =============================================================================

#[test]
fn test_set_outside_transaction_fails() {
    let mut backend = setup_backend();

    let err = backend.set("key", "value".into()).unwrap_err();
    assert!(matches!(err, DriftError::Transaction(_)));
}

#[test]
fn test_del_outside_transaction_fails() {
    let mut backend = setup_backend();

    let err = backend.del("key").unwrap_err();
    assert!(matches!(err, DriftError::Transaction(_)));
}

#[test]
fn test_commit_without_begin_fails() {
    let mut backend = setup_backend();

    let err = backend.commit().unwrap_err();
    assert!(matches!(err, DriftError::Transaction(_)));
}

#[test]
fn test_nested_begin_fails() {
    let mut backend = setup_backend();

    backend.begin().unwrap();
    let err = backend.begin().unwrap_err();
    assert!(matches!(err, DriftError::Transaction(_)));
}

// =============================================================================
// Reset / Handle Tests
// =============================================================================

#[test]
fn test_reset_wipes_state_and_open_transaction() {
    let mut backend = setup_backend();

    backend.begin().unwrap();
    backend.set("committed", "value".into()).unwrap();
    backend.commit().unwrap();

    backend.begin().unwrap();
    backend.set("staged", "value".into()).unwrap();

    backend.reset().unwrap();

    assert!(backend.is_empty());
    // The open transaction was discarded; a fresh bracket works.
    backend.begin().unwrap();
    backend.commit().unwrap();
}

#[test]
fn test_clones_share_state() {
    let backend = setup_backend();
    let mut writer = backend.clone();

    writer.begin().unwrap();
    writer.set("key", "value".into()).unwrap();
    writer.commit().unwrap();

    assert_eq!(backend.get("key").as_deref(), Some(b"value".as_ref()));
    assert_eq!(backend.len(), 1);
}
