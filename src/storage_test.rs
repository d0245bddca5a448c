use super::*;

// =============================================================================
// MemoryStore
// =============================================================================

#[test]
fn memory_store_get_missing_is_none() {
    let store = MemoryStore::new();
    assert_eq!(store.get("authToken").unwrap(), None);
}

#[test]
fn memory_store_set_all_writes_every_entry() {
    let store = MemoryStore::new();
    store.set_all(&[("a", "1"), ("b", "2")]).unwrap();
    assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
}

#[test]
fn memory_store_remove_all_ignores_missing_keys() {
    let store = MemoryStore::with_entries(&[("a", "1")]);
    store.remove_all(&["a", "never-set"]).unwrap();
    assert!(store.snapshot().is_empty());
}

// =============================================================================
// FileStore
// =============================================================================

#[test]
fn file_store_missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("storage.json"));
    assert_eq!(store.get("authToken").unwrap(), None);
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("storage.json");

    FileStore::new(&path)
        .set_all(&[("authToken", "tok"), ("user", "{}")])
        .unwrap();

    let reopened = FileStore::new(&path);
    assert_eq!(reopened.get("authToken").unwrap().as_deref(), Some("tok"));
    assert_eq!(reopened.get("user").unwrap().as_deref(), Some("{}"));
}

#[test]
fn file_store_remove_all_keeps_unrelated_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("storage.json"));
    store
        .set_all(&[("authToken", "tok"), ("user", "{}"), ("theme", "dark")])
        .unwrap();

    store.remove_all(&["authToken", "user"]).unwrap();

    assert_eq!(store.get("authToken").unwrap(), None);
    assert_eq!(store.get("user").unwrap(), None);
    assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
}

#[test]
fn file_store_remove_all_without_file_does_not_create_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    FileStore::new(&path).remove_all(&["authToken"]).unwrap();
    assert!(!path.exists());
}

#[test]
fn file_store_corrupt_document_errors_on_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "not json").unwrap();

    let err = FileStore::new(&path).get("authToken").unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[test]
fn file_store_corrupt_document_is_replaced_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "not json").unwrap();
    let store = FileStore::new(&path);

    store.remove_all(&["authToken", "user"]).unwrap();

    assert_eq!(store.get("authToken").unwrap(), None);
    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&raw).unwrap(), serde_json::json!({}));
}

#[test]
fn file_store_concurrent_writers_never_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    std::thread::scope(|scope| {
        for writer in 0..4 {
            let store = FileStore::new(&path);
            scope.spawn(move || {
                for round in 0..25 {
                    let token = format!("tok-{writer}-{round}");
                    store.set_all(&[("authToken", token.as_str()), ("user", "{}")]).unwrap();
                }
            });
        }
    });

    let token = FileStore::new(&path).get("authToken").unwrap().unwrap();
    assert!(token.starts_with("tok-"));
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name != "storage.json")
        .collect();
    assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
}
