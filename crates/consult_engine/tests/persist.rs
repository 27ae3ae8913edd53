use std::fs;

use consult_core::{CrawlState, Record};
use consult_engine::{ensure_output_dir, AtomicFileWriter, RonStateStore, StateStore, StoreError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("attachments");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path());

    let first = writer.write("state.ron", "hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "state.ron");
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write_bytes("state.ron", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");

    let leftovers: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1, "temp files must not linger");
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("state.ron", "data").is_err());
    assert!(!file_path.with_file_name("state.ron").exists());
}

fn sample_state() -> CrawlState {
    let mut clustered = Record::new("https://host/c/reactie/1")
        .with_field("Datum", "1 mei 2020")
        .with_field("Woonplaats", "Utrecht")
        .with_inline_text("eerste antwoord\n###\ntweede antwoord");
    clustered.attachments = vec!["https://host/c/reactie/1/bijlage/9/download".to_string()];
    clustered.attachment_text = Some("tekst uit bijlage".to_string());
    clustered.canonical_text = Some("tekst uit bijlage".to_string());
    clustered.cluster_id = Some(0);

    let mut failed = Record::new("https://host/c/reactie/2");
    failed.attachment_error = Some("9: no text extraction for application/pdf".to_string());
    failed.cluster_id = Some(1);

    CrawlState::from_records(vec![clustered, failed]).unwrap()
}

#[test]
fn missing_state_file_is_an_empty_start() {
    let temp = TempDir::new().unwrap();
    let store = RonStateStore::new(temp.path().join("state.ron"));
    assert!(store.load().unwrap().is_none());
}

#[test]
fn state_round_trips_every_persisted_field() {
    let temp = TempDir::new().unwrap();
    let store = RonStateStore::new(temp.path().join("state.ron"));
    let state = sample_state();

    store.save(&state).unwrap();
    let loaded = store.load().unwrap().expect("state was saved");

    assert_eq!(loaded, state);
    assert_eq!(loaded.records()[0].cluster_id, Some(0));
    assert!(loaded.contains("https://host/c/reactie/2"));
}

#[test]
fn save_overwrites_previous_checkpoint() {
    let temp = TempDir::new().unwrap();
    let store = RonStateStore::new(temp.path().join("state.ron"));

    store.save(&sample_state()).unwrap();
    let mut smaller = CrawlState::new();
    smaller.insert(Record::new("only"));
    store.save(&smaller).unwrap();

    assert_eq!(store.load().unwrap().unwrap().len(), 1);
}

#[test]
fn unparsable_state_is_corrupt_and_left_untouched() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.ron");
    fs::write(&path, "(version: 1, records: [oops").unwrap();
    let store = RonStateStore::new(&path);

    let err = store.load().unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }), "got {err:?}");
    assert_eq!(fs::read_to_string(&path).unwrap(), "(version: 1, records: [oops");
}

#[test]
fn duplicate_identifiers_make_state_corrupt() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.ron");
    fs::write(
        &path,
        r#"(version: 1, records: [(identifier: "a"), (identifier: "a")])"#,
    )
    .unwrap();

    let err = RonStateStore::new(&path).load().unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }), "got {err:?}");
}

#[test]
fn unknown_version_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.ron");
    fs::write(&path, "(version: 99, records: [])").unwrap();

    let err = RonStateStore::new(&path).load().unwrap_err();
    assert!(matches!(err, StoreError::Version { found: 99, .. }), "got {err:?}");
}
