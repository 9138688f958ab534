use kzattend::models::Record;
use kzattend::store::{Collection, CollectionStore, PACKED_FORMAT};
use serde_json::{json, Value};
use tempfile::tempdir;

fn rec(v: Value) -> Record {
    v.as_object().cloned().expect("object")
}

#[test]
fn missing_and_malformed_files_read_as_empty() {
    let dir = tempdir().expect("tempdir");
    let store = CollectionStore::open(dir.path()).expect("open store");
    assert!(store.read(Collection::Classes).is_empty());

    std::fs::write(store.path_for(Collection::Students), b"{not json").expect("write garbage");
    assert!(store.read(Collection::Students).is_empty());

    std::fs::write(store.path_for(Collection::Classes), b"42").expect("write scalar");
    assert!(store.read(Collection::Classes).is_empty());
}

#[test]
fn packed_collections_are_written_with_format_marker() {
    let dir = tempdir().expect("tempdir");
    let store = CollectionStore::open(dir.path()).expect("open store");
    let records = vec![rec(json!({
        "id": "r1", "activityId": "A1", "studentId": "SV001", "timestamp": "2024-09-01T08:00:00Z"
    }))];
    store.write(Collection::Attendance, &records).expect("write");

    let raw: Value = serde_json::from_slice(
        &std::fs::read(store.path_for(Collection::Attendance)).expect("read file"),
    )
    .expect("parse file");
    assert_eq!(raw["format"], json!(PACKED_FORMAT));
    assert_eq!(raw["fields"], json!(["id", "activityId", "studentId", "timestamp"]));
    assert_eq!(raw["rows"], json!([["r1", "A1", "SV001", "2024-09-01T08:00:00Z"]]));
    assert_eq!(store.read(Collection::Attendance), records);
}

#[test]
fn schemaless_collections_keep_their_input_form() {
    let dir = tempdir().expect("tempdir");
    let store = CollectionStore::open(dir.path()).expect("open store");
    let users = vec![rec(json!({"username": "mon1", "password": "pw", "name": "M", "role": "monitor"}))];
    store.write(Collection::Users, &users).expect("write");
    let raw: Value = serde_json::from_slice(
        &std::fs::read(store.path_for(Collection::Users)).expect("read file"),
    )
    .expect("parse file");
    assert_eq!(raw, json!([{"username": "mon1", "password": "pw", "name": "M", "role": "monitor"}]));
    assert_eq!(store.read(Collection::Users), users);
}

#[test]
fn legacy_bare_files_are_read() {
    let dir = tempdir().expect("tempdir");
    let store = CollectionStore::open(dir.path()).expect("open store");
    std::fs::write(
        store.path_for(Collection::Students),
        br#"[["SV001","Nguyen","An","2004-01-01","K1"],["SV002","Tran","Binh","2004-02-02","K2"]]"#,
    )
    .expect("write packed legacy");
    let students = store.read(Collection::Students);
    assert_eq!(students.len(), 2);
    assert_eq!(students[1]["classId"], json!("K2"));

    std::fs::write(
        store.path_for(Collection::Attendance),
        br#"[{"id":"r1","activityId":"A1","studentId":"SV001","timestamp":"t"}]"#,
    )
    .expect("write unpacked legacy");
    assert_eq!(store.read(Collection::Attendance)[0]["studentId"], json!("SV001"));
}

#[test]
fn writes_leave_no_temp_files_behind() {
    let dir = tempdir().expect("tempdir");
    let store = CollectionStore::open(dir.path()).expect("open store");
    for i in 0..3 {
        store
            .write(Collection::Classes, &[rec(json!({"id": format!("K{i}"), "name": "x"}))])
            .expect("write");
    }
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["classes.json".to_string()]);
    assert_eq!(store.read(Collection::Classes).len(), 1);
}
