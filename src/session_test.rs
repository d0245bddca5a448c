use super::*;
use crate::storage::MemoryStore;
use crate::test_helpers::ReadOnlyRemovals;
use serde_json::json;

fn user(value: Value) -> User {
    User::from_value(value).unwrap()
}

fn store_with(entries: &[(&str, &str)]) -> (Arc<MemoryStore>, SessionStore) {
    let storage = Arc::new(MemoryStore::with_entries(entries));
    let session = SessionStore::new(storage.clone());
    (storage, session)
}

fn assert_paired(storage: &MemoryStore) {
    let snapshot = storage.snapshot();
    assert_eq!(
        snapshot.contains_key(TOKEN_KEY),
        snapshot.contains_key(USER_KEY),
        "token and user must be persisted together: {snapshot:?}"
    );
}

// =============================================================================
// User
// =============================================================================

#[test]
fn user_from_value_rejects_non_objects() {
    assert!(User::from_value(json!("alice")).is_none());
    assert!(User::from_value(json!([1, 2])).is_none());
    assert!(User::from_value(Value::Null).is_none());
}

#[test]
fn user_probes_known_fields() {
    let u = user(json!({ "id": "1", "email": "a@b.com", "name": "Alice", "role": "admin" }));
    assert_eq!(u.id().as_deref(), Some("1"));
    assert_eq!(u.email(), Some("a@b.com"));
    assert_eq!(u.name(), Some("Alice"));
    assert_eq!(u.get("role"), Some(&json!("admin")));
}

#[test]
fn user_numeric_id_is_rendered() {
    let u = user(json!({ "id": 42 }));
    assert_eq!(u.id().as_deref(), Some("42"));
}

#[test]
fn user_missing_fields_are_none() {
    let u = User::new();
    assert_eq!(u.id(), None);
    assert_eq!(u.email(), None);
    assert_eq!(u.name(), None);
}

// =============================================================================
// login / logout
// =============================================================================

#[test]
fn login_persists_token_and_user() {
    let (storage, session) = store_with(&[]);
    session
        .login(user(json!({ "id": "1", "email": "a@b.com" })), "tok123")
        .unwrap();

    let snapshot = storage.snapshot();
    assert_eq!(snapshot.get(TOKEN_KEY).map(String::as_str), Some("tok123"));
    let stored: Value = serde_json::from_str(&snapshot[USER_KEY]).unwrap();
    assert_eq!(stored, json!({ "id": "1", "email": "a@b.com" }));
    assert!(session.is_authenticated());
    assert_eq!(session.token().as_deref(), Some("tok123"));
}

#[test]
fn logout_clears_storage_and_memory() {
    let (storage, session) = store_with(&[]);
    session.login(user(json!({ "id": "1" })), "tok").unwrap();

    session.logout().unwrap();

    assert!(storage.snapshot().is_empty());
    assert!(!session.is_authenticated());
    assert_eq!(session.user(), None);
    assert_eq!(session.token(), None);
}

#[test]
fn logout_twice_is_a_no_op() {
    let (storage, session) = store_with(&[]);
    session.login(user(json!({ "id": "1" })), "tok").unwrap();

    session.logout().unwrap();
    let after_once = storage.snapshot();
    session.logout().unwrap();

    assert_eq!(storage.snapshot(), after_once);
    assert!(!session.is_authenticated());
}

#[test]
fn expire_clears_storage_and_memory() {
    let (storage, session) = store_with(&[]);
    session.login(user(json!({ "id": "1" })), "tok").unwrap();

    session.expire().unwrap();

    assert!(storage.snapshot().is_empty());
    assert!(!session.is_authenticated());
}

#[test]
fn expire_clears_memory_when_storage_fails() {
    let storage = Arc::new(ReadOnlyRemovals::default());
    let session = SessionStore::new(storage.clone());
    session.login(user(json!({ "id": "1" })), "tok").unwrap();

    assert!(matches!(session.expire(), Err(StorageError::Io(_))));
    assert!(!session.is_authenticated());
    assert_eq!(session.token(), None);
    assert_eq!(storage.inner.snapshot().get(TOKEN_KEY).map(String::as_str), Some("tok"));
}

#[test]
fn logout_keeps_session_when_storage_fails() {
    let storage = Arc::new(ReadOnlyRemovals::default());
    let session = SessionStore::new(storage);
    session.login(user(json!({ "id": "1" })), "tok").unwrap();

    assert!(session.logout().is_err());
    assert!(session.is_authenticated());
}

#[test]
fn logout_without_session_is_ok() {
    let (_storage, session) = store_with(&[]);
    assert!(session.logout().is_ok());
    assert!(!session.is_authenticated());
}

#[test]
fn login_logout_sequences_keep_pair_invariant() {
    let (storage, session) = store_with(&[]);
    for i in 0..5 {
        session
            .login(user(json!({ "id": i.to_string() })), format!("tok{i}"))
            .unwrap();
        assert_paired(&storage);
        if i % 2 == 0 {
            session.logout().unwrap();
            assert_paired(&storage);
        }
    }
    assert_eq!(storage.snapshot().get(TOKEN_KEY).map(String::as_str), Some("tok4"));
}

#[test]
fn user_snapshot_is_stale_after_logout() {
    let (_storage, session) = store_with(&[]);
    session.login(user(json!({ "id": "1" })), "tok").unwrap();
    let snapshot = session.user();

    session.logout().unwrap();

    assert!(snapshot.is_some());
    assert!(session.user().is_none());
}

// =============================================================================
// load
// =============================================================================

#[test]
fn load_restores_persisted_session() {
    let (_storage, session) = store_with(&[(TOKEN_KEY, "tok"), (USER_KEY, r#"{"id":"7","name":"Bo"}"#)]);
    session.load();

    assert!(session.is_authenticated());
    assert_eq!(session.token().as_deref(), Some("tok"));
    assert_eq!(session.user().unwrap().name(), Some("Bo"));
}

#[test]
fn load_with_empty_storage_is_logged_out() {
    let (storage, session) = store_with(&[]);
    session.load();
    assert!(!session.is_authenticated());
    assert!(storage.snapshot().is_empty());
}

#[test]
fn load_corrupt_user_self_heals() {
    let (storage, session) = store_with(&[(TOKEN_KEY, "tok"), (USER_KEY, "{not json")]);
    session.load();

    assert!(!session.is_authenticated());
    assert!(storage.snapshot().is_empty());
}

#[test]
fn load_non_object_user_self_heals() {
    let (storage, session) = store_with(&[(TOKEN_KEY, "tok"), (USER_KEY, "\"alice\"")]);
    session.load();

    assert!(!session.is_authenticated());
    assert!(storage.snapshot().is_empty());
}

#[test]
fn load_token_without_user_clears_token() {
    let (storage, session) = store_with(&[(TOKEN_KEY, "tok")]);
    session.load();

    assert!(!session.is_authenticated());
    assert!(storage.snapshot().is_empty());
}

#[test]
fn load_user_without_token_clears_user() {
    let (storage, session) = store_with(&[(USER_KEY, "{}")]);
    session.load();

    assert!(!session.is_authenticated());
    assert!(storage.snapshot().is_empty());
}

#[test]
fn load_leaves_unrelated_keys_alone() {
    let (storage, session) = store_with(&[(TOKEN_KEY, "tok"), ("theme", "dark")]);
    session.load();
    assert_eq!(storage.snapshot().get("theme").map(String::as_str), Some("dark"));
}

// =============================================================================
// FileStore-backed
// =============================================================================

#[test]
fn session_survives_reload_from_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    let first = SessionStore::new(Arc::new(crate::storage::FileStore::new(&path)));
    first.login(user(json!({ "id": "1" })), "tok").unwrap();

    let second = SessionStore::new(Arc::new(crate::storage::FileStore::new(&path)));
    assert!(!second.is_authenticated());
    second.load();
    assert!(second.is_authenticated());
    assert_eq!(second.token().as_deref(), Some("tok"));
}

#[test]
fn unreadable_file_store_loads_logged_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "garbage").unwrap();

    let session = SessionStore::new(Arc::new(crate::storage::FileStore::new(&path)));
    session.load();

    assert!(!session.is_authenticated());
    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&raw).unwrap(), json!({}));
}
