//! Integration tests for config file loading, reload, and repair.

use adsb_relay::config::model::{FilterMode, OutputMode, Settings, EXAMPLE_ICAO_LIST};
use adsb_relay::config::source::write_settings;
use adsb_relay::config::{self, ConfigSource, ConfigStore, IniFileSource};

const EDITOR_FILE: &str = "\
[Dump1090]
host = 192.168.1.20
sbs1_port = 30003
json_port = 8080

[Output]
format = json_to_sbs1

[Filter]
mode = all
icao_list =
altitude_filter_enabled = True
max_altitude = 8000

[Endpoints]
count = 1
endpoint_0_name = Ground station
endpoint_0_ip = 10.1.1.5
endpoint_0_port = 40001
";

#[tokio::test]
async fn missing_file_is_created_with_starter_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("adsb_server_config.conf");

    let loaded = config::load_startup(&IniFileSource::new(&path)).await.unwrap();
    assert!(path.exists());
    assert_eq!(loaded.settings, Settings::starter());
    assert_eq!(loaded.settings.filter.mode, FilterMode::Allowlist);
    assert_eq!(loaded.settings.filter.allow.len(), EXAMPLE_ICAO_LIST.len());
    assert!(loaded.settings.endpoints.is_empty());
    assert!(loaded.warnings.is_empty());
}

#[tokio::test]
async fn editor_written_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.conf");
    std::fs::write(&path, EDITOR_FILE).unwrap();

    let loaded = IniFileSource::new(&path).load().await.unwrap();
    let settings = &loaded.settings;
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
    assert_eq!(settings.decoder.host, "192.168.1.20");
    assert_eq!(
        settings.decoder.json_url(),
        "http://192.168.1.20:8080/data/aircraft.json"
    );
    assert_eq!(settings.output, OutputMode::JsonToSbs1);
    assert_eq!(settings.filter.mode, FilterMode::All);
    assert!(settings.filter.altitude.enabled);
    assert_eq!(settings.filter.altitude.ceiling, 8000);
    assert_eq!(settings.endpoints[0].name, "Ground station");
    assert_eq!(settings.endpoints[0].key(), "10.1.1.5:40001");
}

#[tokio::test]
async fn written_settings_read_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.conf");
    std::fs::write(&path, EDITOR_FILE).unwrap();
    let source = IniFileSource::new(&path);
    let original = source.load().await.unwrap();

    let copy = dir.path().join("copy.conf");
    write_settings(&copy, &original.settings).await.unwrap();
    let reread = IniFileSource::new(&copy).load().await.unwrap();
    assert_eq!(reread.settings, original.settings);
}

#[tokio::test]
async fn reload_picks_up_edits_and_keeps_snapshot_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.conf");
    std::fs::write(&path, EDITOR_FILE).unwrap();

    let store = ConfigStore::open(Box::new(IniFileSource::new(&path)))
        .await
        .unwrap();
    let first = store.snapshot().version.clone();

    let unchanged = store.reload().await.unwrap();
    assert!(!unchanged.changed);

    std::fs::write(&path, EDITOR_FILE.replace("max_altitude = 8000", "max_altitude = 9000"))
        .unwrap();
    let outcome = store.reload().await.unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.kept, 1);
    assert_eq!(store.snapshot().filter.altitude.ceiling, 9000);
    assert_ne!(store.snapshot().version, first);

    std::fs::write(&path, "[Filter\nmode").unwrap();
    assert!(store.reload().await.is_err());
    assert_eq!(store.snapshot().filter.altitude.ceiling, 9000);
    assert_eq!(store.snapshot().endpoints.len(), 1);
}

#[tokio::test]
async fn file_deleted_while_running_comes_back_as_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.conf");
    std::fs::write(&path, EDITOR_FILE).unwrap();
    let store = ConfigStore::open(Box::new(IniFileSource::new(&path)))
        .await
        .unwrap();
    let removed_slot = std::sync::Arc::clone(&store.snapshot().endpoints[0].slot);

    std::fs::remove_file(&path).unwrap();
    let outcome = store.reload().await.unwrap();

    assert!(path.exists());
    assert!(outcome.changed);
    assert_eq!(outcome.removed, vec!["10.1.1.5:40001".to_string()]);
    assert!(removed_slot.is_retired());
    assert_eq!(store.snapshot().filter.mode, FilterMode::Allowlist);
    // Output mode stays as started
    assert_eq!(store.output(), OutputMode::JsonToSbs1);
}

#[tokio::test]
async fn output_format_change_needs_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.conf");
    std::fs::write(&path, EDITOR_FILE).unwrap();

    let store = ConfigStore::open(Box::new(IniFileSource::new(&path)))
        .await
        .unwrap();
    std::fs::write(&path, EDITOR_FILE.replace("json_to_sbs1", "sbs1")).unwrap();
    store.reload().await.unwrap();

    assert_eq!(store.output(), OutputMode::JsonToSbs1);
    assert_eq!(store.snapshot().output, OutputMode::JsonToSbs1);
}
