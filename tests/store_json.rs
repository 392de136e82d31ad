// tests/store_json.rs
//
// JSON history file: missing, corrupt and legacy-format files all load,
// saves create parent directories and replace the file whole.

use std::fs;

use flight_price_alert::store::{BaselineStore, JsonFileStore};
use flight_price_alert::tracker::{Baseline, ItineraryKind, MonitoredDate};

fn d(s: &str) -> MonitoredDate {
    MonitoredDate::parse(s).unwrap()
}

#[tokio::test]
async fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nope.json"));
    assert_eq!(store.load().await, Baseline::default());
}

#[tokio::test]
async fn corrupt_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("price_history.json");
    fs::write(&path, "{ this is not json").unwrap();

    let store = JsonFileStore::new(&path);
    assert_eq!(store.load().await, Baseline::default());
}

#[tokio::test]
async fn legacy_layout_is_understood() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("price_history.json");
    fs::write(
        &path,
        r#"{"target_prices": {"20250101": 820}, "no_target_prices": {"20250101": 640, "20250102": 0}}"#,
    )
    .unwrap();

    let b = JsonFileStore::new(&path).load().await;
    assert_eq!(b.get(&d("20250101"), ItineraryKind::Direct), 820);
    assert_eq!(b.get(&d("20250101"), ItineraryKind::Connecting), 640);
    assert_eq!(b.get(&d("20250102"), ItineraryKind::Connecting), 0);
}

#[tokio::test]
async fn save_then_load_in_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("deep").join("history.json");
    let store = JsonFileStore::new(&path);

    let mut b = Baseline::default();
    b.set(&d("20250101"), ItineraryKind::Direct, 1000);
    b.set(&d("20250101"), ItineraryKind::Connecting, 750);
    store.save(&b).await.expect("save");

    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists(), "temp file left behind");

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["direct"]["20250101"], 1000);
    assert_eq!(raw["connecting"]["20250101"], 750);

    assert_eq!(store.load().await, b);
}

#[tokio::test]
async fn save_overwrites_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let store = JsonFileStore::new(&path);

    let mut first = Baseline::default();
    first.set(&d("20250101"), ItineraryKind::Direct, 1000);
    first.set(&d("20250102"), ItineraryKind::Direct, 1200);
    store.save(&first).await.unwrap();

    let second = first.for_dates(&[d("20250102")]);
    store.save(&second).await.unwrap();

    let loaded = store.load().await;
    assert!(!loaded.direct.contains_key("20250101"));
    assert_eq!(loaded.get(&d("20250102"), ItineraryKind::Direct), 1200);
}

#[tokio::test]
async fn unwritable_target_reports_an_error() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where a directory is expected.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "x").unwrap();

    let store = JsonFileStore::new(blocker.join("history.json"));
    assert!(store.save(&Baseline::default()).await.is_err());
}
