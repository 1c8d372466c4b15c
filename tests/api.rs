use json_store::{into_document, Error, JsonStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;

fn temp_store() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    (dir, path)
}

// ---- get / set --------------------------------------------------------------

#[test]
fn set_then_get_returns_value() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();

    assert_eq!(db.set("n", 1).unwrap(), None);
    assert_eq!(db.set("s", "text").unwrap(), None);
    assert_eq!(db.set("nested", json!({"a": [1, {"b": null}]})).unwrap(), None);

    assert_eq!(db.get("n").unwrap(), json!(1));
    assert_eq!(db.get("s").unwrap(), json!("text"));
    assert_eq!(db.get("nested").unwrap()["a"][1]["b"], json!(null));
}

#[test]
fn set_returns_previous_value() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    db.set("k", 1).unwrap();
    assert_eq!(db.set("k", 2).unwrap(), Some(json!(1)));
    assert_eq!(db.get("k").unwrap(), json!(2));
}

#[test]
fn get_missing_key_is_key_not_found() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    assert_eq!(db.get("ghost"), Err(Error::KeyNotFound("ghost".into())));
}

// ---- delete -----------------------------------------------------------------

#[test]
fn delete_returns_removed_value() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    db.set("a", json!([1, 2])).unwrap();
    assert_eq!(db.delete("a").unwrap(), json!([1, 2]));
    assert!(!db.contains_key("a"));
    assert!(db.get("a").unwrap_err().is_key_not_found());
}

#[test]
fn delete_missing_key_is_key_not_found() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    assert_eq!(db.delete("ghost"), Err(Error::KeyNotFound("ghost".into())));
}

#[test]
fn set_and_delete_do_not_touch_disk_by_default() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    db.set("a", 1).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    db.flush().unwrap();
    db.delete("a").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"a":1}"#);
}

// ---- introspection ----------------------------------------------------------

#[test]
fn len_contains_key_is_empty() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();

    assert!(db.is_empty());
    assert_eq!(db.len(), 0);
    assert!(!db.contains_key("a"));

    db.set("a", 1).unwrap();
    db.set("b", 2).unwrap();
    assert!(!db.is_empty());
    assert_eq!(db.len(), 2);
    assert!(db.contains_key("a"));
    assert!(!db.contains_key("z"));
}

#[test]
fn iter_keys_values_snapshots() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    db.set("y", 20).unwrap();
    db.set("x", 10).unwrap();

    let mut entries = db.iter();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(entries, vec![("x".into(), json!(10)), ("y".into(), json!(20))]);

    let mut keys = db.keys();
    keys.sort();
    assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);

    let mut vals: Vec<i64> = db.values().iter().filter_map(|v| v.as_i64()).collect();
    vals.sort();
    assert_eq!(vals, vec![10, 20]);
}

#[test]
fn snapshot_is_detached_from_store() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    db.set("a", 1).unwrap();
    let mut snap = db.snapshot();
    snap.insert("b".into(), json!(2));
    assert!(!db.contains_key("b"));
}

// ---- typed helpers ----------------------------------------------------------

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Settings {
    theme: String,
    retries: u32,
}

#[test]
fn typed_values_round_trip() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    let settings = Settings {
        theme: "dark".into(),
        retries: 3,
    };
    db.set_serialized("settings", &settings).unwrap();
    assert_eq!(db.get("settings").unwrap(), json!({"theme": "dark", "retries": 3}));
    assert_eq!(db.get_as::<Settings>("settings").unwrap(), settings);
}

#[test]
fn get_as_wrong_shape_is_format_error() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    db.set("settings", "not a struct").unwrap();
    assert!(matches!(db.get_as::<Settings>("settings"), Err(Error::Format(_))));
    assert!(db.get_as::<Settings>("missing").unwrap_err().is_key_not_found());
}

// ---- into_document ----------------------------------------------------------

#[test]
fn into_document_accepts_only_objects() {
    assert_eq!(into_document(json!({"a": 1})).unwrap().len(), 1);
    assert!(matches!(into_document(json!([1])), Err(Error::Format(_))));
}

// ---- formatting -------------------------------------------------------------

#[test]
fn debug_and_display() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    db.set("a", 1).unwrap();

    let dbg_store = format!("{:?}", *db);
    assert!(dbg_store.contains("JsonStore"));
    assert!(dbg_store.contains("path"));
    assert!(format!("{db:?}").contains("JsonStore"));
    assert_eq!(db.to_string(), r#"{"a":1}"#);

    let builder = JsonStore::builder(&path);
    assert!(format!("{builder:?}").contains("JsonStoreBuilder"));

    let guard = db.lock();
    assert!(format!("{guard:?}").contains("ScopeGuard"));
}

#[test]
fn path_accessor() {
    let (_dir, path) = temp_store();
    let db = JsonStore::open(&path).unwrap();
    assert_eq!(db.path(), path.as_path());
}
