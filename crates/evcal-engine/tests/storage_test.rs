use chrono::NaiveDate;
use evcal_engine::event::EventRecord;
use evcal_engine::storage::{SnapshotStore, StorageError, VALIDATED_PREFIX};

fn event(name: &str) -> EventRecord {
    EventRecord {
        name: Some(name.into()),
        date_time: NaiveDate::from_ymd_opt(2025, 5, 9)
            .and_then(|d| d.and_hms_opt(22, 0, 0)),
        organizer: Some("@host".into()),
        location: Some("Club Orbit".into()),
        hashtags: vec!["#VRChat".into()],
        ..EventRecord::default()
    }
}

#[tokio::test]
async fn saved_snapshot_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("validated"));
    let events = vec![event("Jazz Night"), event("Techno Friday")];

    let path = store.save(VALIDATED_PREFIX, &events).await.unwrap();
    let loaded: Vec<EventRecord> = store.load(&path).await.unwrap();

    assert_eq!(loaded, events);
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("validated_events_"));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"event_name\": \"Jazz Night\""));
}

#[tokio::test]
async fn missing_and_blank_files_are_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());

    let missing: Vec<EventRecord> = store.load(&dir.path().join("nope.json")).await.unwrap();
    assert!(missing.is_empty());

    let blank = dir.path().join("blank.json");
    std::fs::write(&blank, "  \n").unwrap();
    let loaded: Vec<EventRecord> = store.load(&blank).await.unwrap();
    assert!(loaded.is_empty());

    let latest: Vec<EventRecord> = store.load_latest(VALIDATED_PREFIX).await.unwrap();
    assert!(latest.is_empty());
}

#[tokio::test]
async fn malformed_snapshot_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    let path = dir.path().join("validated_events_20250101_000000.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = store.load::<EventRecord>(&path).await.unwrap_err();

    assert!(matches!(err, StorageError::Json { .. }));
}

#[tokio::test]
async fn snapshots_list_oldest_first_and_latest_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    let older = dir.path().join("validated_events_20250101_090000.json");
    let newer = dir.path().join("validated_events_20250102_090000.json");
    store.save_to(&newer, &[event("Newer")]).await.unwrap();
    store.save_to(&older, &[event("Older")]).await.unwrap();
    std::fs::write(dir.path().join("integrated_events_20250103_090000.json"), "[]").unwrap();

    assert_eq!(store.list(VALIDATED_PREFIX).unwrap(), vec![older, newer.clone()]);
    assert_eq!(store.latest(VALIDATED_PREFIX).unwrap(), Some(newer));

    let latest: Vec<EventRecord> = store.load_latest(VALIDATED_PREFIX).await.unwrap();
    assert_eq!(latest[0].name.as_deref(), Some("Newer"));

    let all: Vec<EventRecord> = store.load_all(VALIDATED_PREFIX).await.unwrap();
    let names: Vec<_> = all.iter().filter_map(|e| e.name.as_deref()).collect();
    assert_eq!(names, vec!["Older", "Newer"]);
}
